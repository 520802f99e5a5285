//! Triple-pattern path normalization.
//!
//! Caller-supplied paths arrive with arbitrary subject variables and
//! inconsistent punctuation. Normalization rewrites the leading subject
//! variable to the canonical `?foi`, guarantees a terminating `.`, and
//! breaks lines at `.` and `;` so multi-predicate patterns stay readable
//! in the emitted query.
//!
//! Argument paths (calculation inputs) additionally isolate the trailing
//! object variable as the argument's bound variable.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::extract::extract_variables;

/// The canonical subject variable every normalized path starts from.
pub const CANONICAL_SUBJECT: &str = "?foi";

/// Normalized argument paths with their bound variables, index-aligned:
/// `variables[i]` is the variable bound by `paths[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentPaths {
    /// Cleaned triple patterns, one per argument, in input order.
    pub paths: Vec<String>,
    /// The variable each path binds (without the leading `?`), in the
    /// same order as `paths`.
    pub variables: Vec<String>,
}

/// Canonicalizes a triple-pattern path.
///
/// Trims, rewrites the leading subject variable to [`CANONICAL_SUBJECT`],
/// guarantees a trailing `.`, and inserts a newline after every `.`/`;`
/// separator.
#[must_use]
pub fn clean_path(path: &str) -> String {
    let mut p = path.trim().to_string();
    if !p.ends_with('.') {
        p.push_str(" .");
    }
    p = rewrite_subject(&p);
    break_lines(&p)
}

/// Normalizes calculation argument paths.
///
/// For each path, the leading subject variable is rewritten to
/// [`CANONICAL_SUBJECT`] and the trailing variable is extracted as the
/// argument's bound variable. If the final variable token is followed by
/// trailing text, that text is stripped from the path and the variable
/// before it is taken instead.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyArgumentPaths`] if `paths` is empty, and
/// [`ValidationError::MissingField`] if a path contains no object variable.
pub fn clean_argument_paths(paths: &[String]) -> Result<ArgumentPaths, ValidationError> {
    if paths.is_empty() {
        return Err(ValidationError::EmptyArgumentPaths);
    }
    let mut cleaned = Vec::with_capacity(paths.len());
    let mut variables = Vec::with_capacity(paths.len());
    for path in paths {
        let mut p = path.trim().trim_end_matches('.').trim_end().to_string();
        p = rewrite_subject(&p);

        // Locate the final `?var` token; anything after it is stripped.
        let Some(pos) = p.rfind('?') else {
            return Err(ValidationError::MissingField {
                field: "argument path object variable".to_string(),
            });
        };
        let tail = &p[pos + 1..];
        let var: String = tail
            .chars()
            .take_while(char::is_ascii_alphanumeric)
            .collect();
        if var.is_empty() || pos == 0 {
            // `pos == 0` means the only variable left is the subject itself.
            return Err(ValidationError::MissingField {
                field: "argument path object variable".to_string(),
            });
        }
        p.truncate(pos + 1 + var.len());
        p.push_str(" .");
        cleaned.push(break_lines(&p));
        variables.push(var);
    }
    Ok(ArgumentPaths {
        paths: cleaned,
        variables,
    })
}

/// Rewrites the path's leading subject variable to the canonical one.
fn rewrite_subject(path: &str) -> String {
    if !path.starts_with('?') {
        return path.to_string();
    }
    let vars = extract_variables(path);
    let Some(subject) = vars.first() else {
        return path.to_string();
    };
    // Only the leading occurrence and its repeats are renamed; a distinct
    // object variable keeps its name.
    let token = format!("?{subject}");
    replace_variable_token(path, &token, CANONICAL_SUBJECT)
}

/// Replaces whole-token occurrences of `from` (a `?var` token) with `to`.
/// A match followed by another alphanumeric is a longer variable and is
/// left alone.
pub(crate) fn replace_variable_token(text: &str, from: &str, to: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        if text[i..].starts_with(from) {
            let end = i + from.len();
            let next = bytes.get(end).copied();
            if next.map_or(true, |c| !c.is_ascii_alphanumeric()) {
                out.push_str(to);
                i = end;
                continue;
            }
        }
        let c = text[i..]
            .chars()
            .next()
            .unwrap_or_else(|| unreachable!("i is a char boundary"));
        out.push(c);
        i += c.len_utf8();
    }
    out
}

/// Inserts a newline after each `.` / `;` separator (outside of nothing:
/// paths never contain literals with separators by the time they get here).
fn break_lines(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if (c == '.' || c == ';') && chars.peek().is_some() {
            // Swallow the following space so the break is clean.
            if chars.peek() == Some(&' ') {
                chars.next();
            }
            if chars.peek().is_some() {
                out.push('\n');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path_rewrites_subject() {
        assert_eq!(clean_path("?x a bot:Element"), "?foi a bot:Element .");
    }

    #[test]
    fn test_clean_path_keeps_canonical_subject() {
        assert_eq!(clean_path("?foi a bot:Element ."), "?foi a bot:Element .");
    }

    #[test]
    fn test_clean_path_terminates() {
        assert!(clean_path("?x a bot:Element").ends_with('.'));
    }

    #[test]
    fn test_clean_path_breaks_at_semicolon() {
        let p = clean_path("?x a bot:Element ; rdfs:label ?l");
        assert_eq!(p, "?foi a bot:Element ;\nrdfs:label ?l .");
    }

    #[test]
    fn test_clean_path_subject_repeat_renamed_object_kept() {
        let p = clean_path("?e props:height ?h");
        assert_eq!(p, "?foi props:height ?h .");
    }

    #[test]
    fn test_clean_path_no_partial_token_rename() {
        // `?e` must not rewrite the prefix of `?elevation`.
        let p = clean_path("?e props:height ?elevation");
        assert_eq!(p, "?foi props:height ?elevation .");
    }

    #[test]
    fn test_argument_paths_basic() {
        let args = clean_argument_paths(&[
            "?x props:height ?h".to_string(),
            "?y props:width ?w .".to_string(),
        ])
        .unwrap();
        assert_eq!(args.paths[0], "?foi props:height ?h .");
        assert_eq!(args.paths[1], "?foi props:width ?w .");
        assert_eq!(args.variables, vec!["h", "w"]);
    }

    #[test]
    fn test_argument_paths_strips_trailing_text() {
        let args =
            clean_argument_paths(&["?x props:height ?h extra tail".to_string()]).unwrap();
        assert_eq!(args.paths, vec!["?foi props:height ?h ."]);
        assert_eq!(args.variables, vec!["h"]);
    }

    #[test]
    fn test_argument_paths_empty_is_error() {
        assert_eq!(
            clean_argument_paths(&[]).unwrap_err(),
            ValidationError::EmptyArgumentPaths
        );
    }

    #[test]
    fn test_argument_paths_missing_object_variable() {
        let err = clean_argument_paths(&["?x a bot:Element".to_string()]).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { .. }));
    }

    #[test]
    fn test_argument_paths_order_alignment() {
        let args = clean_argument_paths(&[
            "?a props:b ?second".to_string(),
            "?a props:a ?first".to_string(),
        ])
        .unwrap();
        assert_eq!(args.variables, vec!["second", "first"]);
    }
}
