//! Graph scoping configuration.
//!
//! Every emitted pattern is wrapped according to the caller's graph
//! configuration. With `main_graph = true` nothing is wrapped; otherwise
//! read-side patterns go inside `GRAPH ?g { … }` and write-side triples go
//! inside `GRAPH <inferenceGraphURI> { … }`. Named graphs add
//! `FROM NAMED` (queries) or `USING NAMED` (updates) dataset clauses.
//!
//! One pure wrapping function serves every operation, so the scoping rules
//! cannot drift between them.

use serde::{Deserialize, Serialize};

use crate::clean::clean_uri;
use crate::error::ValidationError;

/// Where a pattern sits in the emitted program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// WHERE-clause patterns and deleted triples: they act where the data
    /// was found, so they bind the graph as `?g`.
    Read,
    /// Inserted or constructed triples: they land in the configured
    /// inference graph.
    Write,
}

/// Graph scoping for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// When true, no graph wrapping is emitted at all.
    #[serde(default = "default_main_graph")]
    pub main_graph: bool,

    /// Graph receiving inserted triples when `main_graph` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_graph: Option<String>,

    /// Named graphs added as dataset clauses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub named_graphs: Vec<String>,
}

fn default_main_graph() -> bool {
    true
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            main_graph: true,
            inference_graph: None,
            named_graphs: Vec::new(),
        }
    }
}

impl GraphConfig {
    /// Configuration targeting the main (default) graph.
    #[must_use]
    pub fn main() -> Self {
        Self::default()
    }

    /// Configuration routing writes into a dedicated inference graph.
    #[must_use]
    pub fn inference(graph_uri: impl Into<String>) -> Self {
        Self {
            main_graph: false,
            inference_graph: Some(graph_uri.into()),
            named_graphs: Vec::new(),
        }
    }

    /// Adds a named graph to the dataset clauses.
    #[must_use]
    pub fn with_named_graph(mut self, graph_uri: impl Into<String>) -> Self {
        self.named_graphs.push(graph_uri.into());
        self
    }

    /// Checks the configuration and canonicalizes its graph URIs.
    ///
    /// # Errors
    ///
    /// [`ValidationError::MissingField`] when `main_graph` is false but no
    /// inference graph is given; [`ValidationError::InvalidUri`] for a
    /// malformed graph URI.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.main_graph && self.inference_graph.is_none() {
            return Err(ValidationError::MissingField {
                field: "inference_graph".to_string(),
            });
        }
        clean_uri(self.inference_graph.as_deref())?;
        for g in &self.named_graphs {
            clean_uri(Some(g))?;
        }
        Ok(())
    }
}

/// Wraps a pattern block per the graph configuration and its role.
///
/// The body is indented one level inside the `GRAPH` braces so emitted
/// programs stay diffable.
///
/// # Errors
///
/// Propagates [`ValidationError`] from [`GraphConfig::validate`].
pub fn wrap_in_graph_scope(
    body: &str,
    config: &GraphConfig,
    role: Role,
) -> Result<String, ValidationError> {
    config.validate()?;
    if config.main_graph {
        return Ok(body.to_string());
    }
    let opened = match role {
        Role::Read => "GRAPH ?g {".to_string(),
        Role::Write => {
            let uri = clean_uri(config.inference_graph.as_deref())?
                .unwrap_or_else(|| unreachable!("validate() requires an inference graph"));
            format!("GRAPH {uri} {{")
        }
    };
    let mut out = String::new();
    out.push_str(&opened);
    out.push('\n');
    for line in body.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push('\t');
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push('}');
    Ok(out)
}

/// Renders the dataset clauses for a read query (`FROM NAMED`) or an
/// update (`USING NAMED`), one per named graph, or an empty string.
///
/// # Errors
///
/// [`ValidationError::InvalidUri`] for a malformed graph URI.
pub fn dataset_clauses(config: &GraphConfig, update: bool) -> Result<String, ValidationError> {
    let keyword = if update { "USING NAMED" } else { "FROM NAMED" };
    let mut out = String::new();
    for g in &config.named_graphs {
        let uri = clean_uri(Some(g))?
            .unwrap_or_else(|| unreachable!("clean_uri(Some(_)) returns Some"));
        out.push_str(&format!("{keyword} {uri}\n"));
    }
    Ok(out)
}
