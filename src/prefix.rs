//! Namespace prefix registry.
//!
//! Every emitted query carries exactly the `PREFIX` declarations its body
//! references, resolved against this registry. The base OPM/PROV vocabulary
//! is always registered; callers may add project-specific namespaces.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A `prefix -> namespace URI` pair. Identity is the prefix string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefix {
    /// The short prefix name, without the trailing colon.
    pub prefix: String,
    /// The namespace URI the prefix expands to.
    pub uri: String,
}

impl Prefix {
    /// Creates a new prefix pair.
    #[must_use]
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }
}

/// Registry of known namespace prefixes.
///
/// Registration is first-wins: a later registration of an already-known
/// prefix name is ignored, so the base vocabulary can never be silently
/// shadowed and re-registration stays idempotent.
#[derive(Debug, Clone)]
pub struct PrefixRegistry {
    known: Vec<Prefix>,
}

impl PrefixRegistry {
    /// Creates a registry seeded with the base vocabulary
    /// (OPM, PROV, RDF, RDFS, XSD, SD, SEAS).
    #[must_use]
    pub fn new() -> Self {
        let known = vec![
            Prefix::new("opm", "https://w3id.org/opm#"),
            Prefix::new("prov", "http://www.w3.org/ns/prov#"),
            Prefix::new("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
            Prefix::new("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
            Prefix::new("xsd", "http://www.w3.org/2001/XMLSchema#"),
            Prefix::new("sd", "http://www.w3.org/ns/sparql-service-description#"),
            Prefix::new("seas", "https://w3id.org/seas/"),
        ];
        Self { known }
    }

    /// Merges caller-supplied prefixes into the known set, first-wins on
    /// duplicate prefix names.
    pub fn register(&mut self, prefixes: impl IntoIterator<Item = Prefix>) {
        for p in prefixes {
            if !self.contains(&p.prefix) {
                self.known.push(p);
            }
        }
    }

    /// Returns true if a prefix name is registered.
    #[must_use]
    pub fn contains(&self, prefix: &str) -> bool {
        self.known.iter().any(|p| p.prefix == prefix)
    }

    /// Looks up a registered prefix by name.
    #[must_use]
    pub fn get(&self, prefix: &str) -> Option<&Prefix> {
        self.known.iter().find(|p| p.prefix == prefix)
    }

    /// Resolves an ordered list of referenced prefix names to their
    /// registrations, preserving input order.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownNamespacePrefix`] naming the first
    /// referenced prefix that is not registered.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<&Prefix>, ValidationError> {
        names
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| ValidationError::UnknownNamespacePrefix {
                        prefix: name.clone(),
                    })
            })
            .collect()
    }

    /// Renders the `PREFIX` declaration block for the referenced names,
    /// one line per prefix, in reference order.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownNamespacePrefix`] for an
    /// unregistered name.
    pub fn declarations(&self, names: &[String]) -> Result<String, ValidationError> {
        let resolved = self.resolve(names)?;
        let mut out = String::new();
        for p in resolved {
            out.push_str(&format!("PREFIX {}: <{}>\n", p.prefix, p.uri));
        }
        Ok(out)
    }
}

impl Default for PrefixRegistry {
    fn default() -> Self {
        Self::new()
    }
}
