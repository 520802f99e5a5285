//! Token scanners for query text.
//!
//! Two small, explicitly specified scanners replace ad hoc regex matching:
//!
//! - variable tokens: `?` followed by one or more ASCII alphanumerics
//!   (numeric-suffixed names like `?v1` are accepted; `_` is outside the
//!   class, which keeps compiler-generated helper variables out of band);
//! - namespace prefixes: one or more word characters followed by `:`,
//!   excluding spans inside `<...>` IRI brackets or quoted literals, and
//!   excluding `scheme://` colons. Without those exclusions every absolute
//!   IRI in a query body would register a phantom `https` prefix.
//!
//! Both return de-duplicated matches in first-seen order and advance the
//! scan position by at least one character per iteration, so zero-width
//! or adjacent candidates can never loop.

/// Extracts SPARQL variable names (without the leading `?`) from free text,
/// de-duplicated, in first-seen order.
#[must_use]
pub fn extract_variables(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut out: Vec<String> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'?' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_alphanumeric() {
                end += 1;
            }
            if end > start {
                let name = &text[start..end];
                if !out.iter().any(|v| v == name) {
                    out.push(name.to_string());
                }
                i = end;
                continue;
            }
        }
        i += 1;
    }
    out
}

/// Extracts namespace prefix names (without the trailing `:`) referenced in
/// query text, de-duplicated, in first-seen order.
///
/// Skips `<...>` IRI spans and `"..."` literal spans, and ignores a
/// candidate whose colon is immediately followed by `//`.
#[must_use]
pub fn extract_namespace_prefixes(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut out: Vec<String> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => {
                // Skip to the closing bracket; an unterminated span consumes
                // the rest of the text.
                while i < bytes.len() && bytes[i] != b'>' {
                    i += 1;
                }
                i += 1;
            }
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            c if c.is_ascii_alphanumeric() || c == b'_' => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                if i < bytes.len() && bytes[i] == b':' && !bytes[i + 1..].starts_with(b"//") {
                    let name = &text[start..i];
                    if !out.iter().any(|p| p == name) {
                        out.push(name.to_string());
                    }
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    out
}
