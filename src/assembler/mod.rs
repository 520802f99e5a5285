//! Query assembly.
//!
//! [`QueryAssembler`] is the orchestrator: it combines the prefix registry,
//! the cleaners, the path normalizer, and the reliability rules into one
//! emitted SPARQL program per operation. Operations are grouped into
//! property operations ([`property`]) and calculation operations
//! ([`calculation`]).
//!
//! Two rules hold for every emitted program:
//!
//! - **Atomic co-location**: every guard (existence, "not deleted", "value
//!   differs") is part of the same WHERE clause as the data-producing
//!   pattern of the same program. No operation ever requires two
//!   round-trips to be correct.
//! - **Exact prefixes**: the `PREFIX` header lists precisely the namespaces
//!   the body references, in first-use order, resolved against the
//!   registry.
//!
//! New state URIs are minted inside the query so that one program stays one
//! transaction: `?guid` is a SHA256 over the anchor entity and `?now`,
//! which keeps the minted URI stable across the multiple solution rows a
//! copy-forward operation produces for one property.

pub mod calculation;
pub mod property;

use serde::{Deserialize, Serialize};

use crate::error::{OpmResult, ValidationError};
use crate::extract::extract_namespace_prefixes;
use crate::prefix::{Prefix, PrefixRegistry};

/// Configuration for a [`QueryAssembler`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// URI base under which new property/state/calculation URIs are minted.
    pub host: String,
    /// Project-specific namespace prefixes, merged first-wins over the
    /// base vocabulary.
    #[serde(default)]
    pub prefixes: Vec<Prefix>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            host: "https://example.org/".to_string(),
            prefixes: Vec::new(),
        }
    }
}

/// Compiles domain operations into SPARQL query/update text.
///
/// Purely functional: construction loads the prefix registry once, after
/// which every operation is a pure transform from input payload to query
/// text (or a validation error). No I/O, no shared mutable state.
#[derive(Debug, Clone)]
pub struct QueryAssembler {
    registry: PrefixRegistry,
    host: String,
}

impl QueryAssembler {
    /// Creates an assembler from configuration.
    ///
    /// # Errors
    ///
    /// [`ValidationError::MissingField`] if the host is empty.
    pub fn new(config: AssemblerConfig) -> OpmResult<Self> {
        if config.host.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "host".to_string(),
            }
            .into());
        }
        let mut host = config.host.trim().to_string();
        if !host.ends_with('/') && !host.ends_with('#') {
            host.push('/');
        }
        let mut registry = PrefixRegistry::new();
        registry.register(config.prefixes);
        Ok(Self { registry, host })
    }

    /// Creates an assembler with default configuration.
    ///
    /// # Errors
    ///
    /// Never fails for the default configuration; kept fallible for parity
    /// with [`QueryAssembler::new`].
    pub fn with_defaults() -> OpmResult<Self> {
        Self::new(AssemblerConfig::default())
    }

    /// The registered prefixes (base vocabulary plus configuration).
    #[must_use]
    pub fn registry(&self) -> &PrefixRegistry {
        &self.registry
    }

    /// The URI base used for minted URIs.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Prepends the `PREFIX` declarations the body actually references.
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnknownNamespacePrefix`] when the body references
    /// an unregistered namespace.
    pub(crate) fn finalize(&self, body: &str) -> OpmResult<String> {
        let names = extract_namespace_prefixes(body);
        let header = self.registry.declarations(&names)?;
        if header.is_empty() {
            return Ok(body.to_string());
        }
        Ok(format!("{header}\n{body}"))
    }

    /// Renders the `BIND` block minting `?now`, `?guid`, and the new state
    /// URI (plus a new property URI when `mint_property` is set), anchored
    /// on `anchor_var` so the minted URIs are stable across the solution
    /// rows of one entity.
    pub(crate) fn mint_bindings(&self, anchor_var: &str, mint_property: bool) -> String {
        let host = &self.host;
        let mut out = String::new();
        out.push_str("BIND( now() AS ?now )\n");
        out.push_str(&format!(
            "BIND( SHA256( CONCAT( STR(?{anchor_var}), STR(?now) ) ) AS ?guid )\n"
        ));
        if mint_property {
            out.push_str(&format!(
                "BIND( URI( CONCAT( \"{host}\", \"property_\", ?guid ) ) AS ?propertyURI )\n"
            ));
        }
        out.push_str(&format!(
            "BIND( URI( CONCAT( \"{host}\", \"state_\", ?guid ) ) AS ?stateURI )"
        ));
        out
    }

    /// Renders the optional attribution and comment triples for a freshly
    /// minted state, or an empty string.
    pub(crate) fn provenance_triples(
        state_var: &str,
        user_uri: Option<&str>,
        comment: Option<&str>,
    ) -> OpmResult<String> {
        use crate::clean::{clean_property_literal, clean_uri};

        let mut out = String::new();
        if let Some(user) = clean_uri(user_uri)? {
            out.push_str(&format!("?{state_var} prov:wasAttributedTo {user} .\n"));
        }
        if let Some(comment) = comment {
            let literal = clean_property_literal(comment);
            out.push_str(&format!("?{state_var} rdfs:comment {literal} .\n"));
        }
        Ok(out)
    }
}

/// Indents every non-empty line by one tab. Used when splicing a block
/// inside `{ ... }` braces.
pub(crate) fn indent(block: &str) -> String {
    block
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("\t{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Joins non-empty blocks with newlines, so optional fragments do not
/// leave blank lines in the emitted text.
pub(crate) fn join_blocks<'a>(blocks: impl IntoIterator<Item = &'a str>) -> String {
    blocks
        .into_iter()
        .filter(|b| !b.trim().is_empty())
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_host() {
        let asm = QueryAssembler::new(AssemblerConfig {
            host: "https://example.org/project".to_string(),
            prefixes: Vec::new(),
        })
        .unwrap();
        assert_eq!(asm.host(), "https://example.org/project/");
    }

    #[test]
    fn test_new_keeps_hash_host() {
        let asm = QueryAssembler::new(AssemblerConfig {
            host: "https://example.org/ns#".to_string(),
            prefixes: Vec::new(),
        })
        .unwrap();
        assert_eq!(asm.host(), "https://example.org/ns#");
    }

    #[test]
    fn test_new_rejects_empty_host() {
        let err = QueryAssembler::new(AssemblerConfig {
            host: "  ".to_string(),
            prefixes: Vec::new(),
        })
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_finalize_emits_only_used_prefixes() {
        let asm = QueryAssembler::with_defaults().unwrap();
        let out = asm.finalize("?foi a opm:Calculation .").unwrap();
        assert!(out.starts_with("PREFIX opm: <https://w3id.org/opm#>\n"));
        assert!(!out.contains("PREFIX prov:"));
        assert!(!out.contains("PREFIX seas:"));
    }

    #[test]
    fn test_finalize_unknown_prefix() {
        let asm = QueryAssembler::with_defaults().unwrap();
        let err = asm.finalize("?foi a nope:Thing .").unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownNamespacePrefix {
                prefix: "nope".to_string()
            }
            .into()
        );
    }

    #[test]
    fn test_finalize_registers_config_prefixes() {
        let asm = QueryAssembler::new(AssemblerConfig {
            host: "https://example.org/".to_string(),
            prefixes: vec![Prefix::new("bot", "https://w3id.org/bot#")],
        })
        .unwrap();
        let out = asm.finalize("?foi a bot:Element .").unwrap();
        assert!(out.contains("PREFIX bot: <https://w3id.org/bot#>"));
    }

    #[test]
    fn test_mint_bindings_anchor_and_property() {
        let asm = QueryAssembler::with_defaults().unwrap();
        let text = asm.mint_bindings("foi", true);
        assert!(text.contains("BIND( now() AS ?now )"));
        assert!(text.contains("STR(?foi)"));
        assert!(text.contains("AS ?propertyURI"));
        assert!(text.contains("AS ?stateURI"));

        let no_prop = asm.mint_bindings("propertyURI", false);
        assert!(!no_prop.contains("AS ?propertyURI )"));
    }

    #[test]
    fn test_provenance_triples() {
        let text = QueryAssembler::provenance_triples(
            "stateURI",
            Some("https://example.org/user/1"),
            Some("checked on site"),
        )
        .unwrap();
        assert!(text.contains("prov:wasAttributedTo <https://example.org/user/1>"));
        assert!(text.contains("rdfs:comment \"checked on site\""));
    }

    #[test]
    fn test_join_blocks_skips_empty() {
        assert_eq!(join_blocks(["a", "", "b"]), "a\nb");
    }
}
