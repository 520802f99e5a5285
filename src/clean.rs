//! Literal and URI canonicalization.
//!
//! User-supplied values arrive in several spellings: bare strings, quoted
//! RDF literals with optional `@lang` or `^^datatype` suffixes, bare
//! `http(s)://` URIs, prefixed names, or `<>`-wrapped IRIs. These helpers
//! normalize each into the single token form the assembler splices into
//! query text.
//!
//! `clean_property_literal` is a best-effort sanitizer, not a full RDF
//! literal grammar: interior double quotes are downgraded to single quotes
//! and newlines are escaped, which is lossy on pathological input.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ValidationError;

/// Matches a complete quoted literal: `"..."` with an optional `@lang`
/// or `^^datatype` suffix.
fn quoted_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^"(?s:.*)"(@[A-Za-z][A-Za-z0-9-]*|\^\^\S+)?$"#)
            .unwrap_or_else(|e| unreachable!("literal regex is static: {e}"))
    })
}

/// Canonicalizes a URI token.
///
/// `None` passes through. A prefixed name (`props:height`) or an already
/// `<>`-wrapped IRI is returned unchanged; a bare `http://`/`https://` URI
/// is wrapped in angle brackets. Idempotent:
/// `clean_uri(clean_uri(x)) == clean_uri(x)`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidUri`] for anything else.
pub fn clean_uri(uri: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(raw) = uri else { return Ok(None) };
    let u = raw.trim();
    if u.is_empty() {
        return Err(ValidationError::InvalidUri {
            value: raw.to_string(),
        });
    }
    if u.starts_with('<') && u.ends_with('>') {
        return Ok(Some(u.to_string()));
    }
    if u.starts_with("http://") || u.starts_with("https://") {
        return Ok(Some(format!("<{u}>")));
    }
    // Prefixed name: word characters up to a single colon, no scheme slashes.
    if is_prefixed_name(u) {
        return Ok(Some(u.to_string()));
    }
    Err(ValidationError::InvalidUri {
        value: raw.to_string(),
    })
}

fn is_prefixed_name(s: &str) -> bool {
    let Some((prefix, local)) = s.split_once(':') else {
        return false;
    };
    !prefix.is_empty()
        && prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !local.is_empty()
        && !local.contains('/')
        && !local.contains(' ')
}

/// Canonicalizes a literal token: an already-quoted literal is returned
/// unchanged, a raw string is wrapped in double quotes. Never double-wraps.
#[must_use]
pub fn clean_literal(value: &str) -> String {
    let v = value.trim();
    if quoted_literal_re().is_match(v) {
        v.to_string()
    } else {
        format!("\"{v}\"")
    }
}

/// Like [`clean_literal`], additionally escaping embedded newlines and
/// replacing interior double quotes with single quotes so the outer
/// literal stays well-formed. Lossy on input that legitimately contains
/// double quotes.
#[must_use]
pub fn clean_property_literal(value: &str) -> String {
    let quoted = clean_literal(value);
    // Split off any @lang / ^^type suffix so only the quoted span is touched.
    let close = quoted.rfind('"').unwrap_or(quoted.len() - 1);
    let (span, suffix) = quoted.split_at(close + 1);
    let inner = &span[1..span.len() - 1];
    let sanitized = inner.replace('"', "'").replace('\n', "\\n");
    format!("\"{sanitized}\"{suffix}")
}
