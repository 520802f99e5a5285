//! Operation input payloads.
//!
//! Each public operation of the assembler takes one serde-derived payload
//! struct with a `validate()` method. Builders of query text never see an
//! unvalidated payload: validation failures return before any text is
//! assembled, and partially emitted programs do not exist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::extract::extract_variables;
use crate::graph::GraphConfig;
use crate::reliability::Reliability;

/// Variable names minted by the compiler. Caller-supplied patterns,
/// argument paths, and expressions must not bind them (the canonical
/// subject `?foi` is the one exception: pattern subjects are rewritten to
/// it, so it is permitted in subject position).
pub const RESERVED_VARIABLES: &[&str] = &[
    "foi",
    "propertyURI",
    "stateURI",
    "previousState",
    "previousValue",
    "calculationURI",
    "now",
    "val",
    "res",
    "guid",
    "g",
    "tmax",
    // guard / copy-forward / projection variables
    "existing",
    "reliability",
    "property",
    "key",
    "value",
    "timestamp",
    "st",
    "restoreState",
    "t",
    "sourceState",
    "dependentState",
    "dependentProperty",
];

/// Returns the variable names reserved by the compiler, so callers can
/// pre-validate their own input.
#[must_use]
pub fn reserved_variables() -> &'static [&'static str] {
    RESERVED_VARIABLES
}

/// The textual form an operation emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// A `DELETE/INSERT` (or plain `INSERT`) update program.
    #[default]
    Update,
    /// A `CONSTRUCT` preview of the triples an update would insert, or a
    /// triple-shaped read result.
    Construct,
    /// A `SELECT` projection (read operations only).
    Select,
}

/// Validate a required, non-empty string field.
pub(crate) fn validate_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Checks caller text for reserved variable bindings. When
/// `allow_subject` is set, `foi` is permitted (pattern subjects are
/// rewritten to the canonical subject anyway).
pub(crate) fn check_reserved(text: &str, allow_subject: bool) -> Result<(), ValidationError> {
    for var in extract_variables(text) {
        if allow_subject && var == "foi" {
            continue;
        }
        if RESERVED_VARIABLES.contains(&var.as_str()) {
            return Err(ValidationError::ReservedVariable { name: var });
        }
    }
    Ok(())
}

/// Enforces that exactly one of the listed optional selectors is present.
pub(crate) fn exactly_one(
    expected: &'static str,
    given: &[(&'static str, bool)],
) -> Result<(), ValidationError> {
    let present: Vec<&str> = given
        .iter()
        .filter_map(|(name, set)| set.then_some(*name))
        .collect();
    if present.len() == 1 {
        return Ok(());
    }
    let description = if present.is_empty() {
        "none".to_string()
    } else {
        present.join(" + ")
    };
    Err(ValidationError::AmbiguousInput {
        expected: expected.to_string(),
        given: description,
    })
}

/// Input for `post_prop`: assign a property to one or more subjects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostPropInput {
    /// URI of the subject to attach the property to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_uri: Option<String>,
    /// Alternative: a triple pattern matching the subjects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Property predicate (prefixed name or URI).
    pub predicate: String,
    /// Literal value for the new state.
    pub value: String,
    /// Initial reliability key (`assumed` / `confirmed`); omitted = untagged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability: Option<String>,
    /// Attributed user URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_uri: Option<String>,
    /// Free-text comment stored on the state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Update (default) or construct preview.
    #[serde(default)]
    pub query_type: QueryType,
    /// Graph scoping.
    #[serde(default)]
    pub graph: GraphConfig,
}

impl PostPropInput {
    /// Validates this payload.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        exactly_one(
            "subject_uri | pattern",
            &[
                ("subject_uri", self.subject_uri.is_some()),
                ("pattern", self.pattern.is_some()),
            ],
        )?;
        validate_non_empty("predicate", &self.predicate)?;
        validate_non_empty("value", &self.value)?;
        if let Some(key) = &self.reliability {
            let class = Reliability::settable(key)?;
            if class.requires_attribution() {
                let user = self.user_uri.as_deref().unwrap_or("");
                validate_non_empty("user_uri", user)?;
            }
        }
        if let Some(pattern) = &self.pattern {
            validate_non_empty("pattern", pattern)?;
            check_reserved(pattern, true)?;
        }
        self.graph.validate()
    }
}

/// Input for `put_prop`: update the value of an existing property.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PutPropInput {
    /// Subject URI (paired with `predicate`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_uri: Option<String>,
    /// Property predicate, required with `subject_uri`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    /// Alternative: the property URI itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_uri: Option<String>,
    /// Alternative: a pattern matching the affected properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// New literal value.
    pub value: String,
    /// Attributed user URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_uri: Option<String>,
    /// Free-text comment stored on the state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Update (default) or construct preview.
    #[serde(default)]
    pub query_type: QueryType,
    /// Graph scoping.
    #[serde(default)]
    pub graph: GraphConfig,
}

impl PutPropInput {
    /// Validates this payload.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        exactly_one(
            "subject_uri + predicate | property_uri | pattern",
            &[
                ("subject_uri", self.subject_uri.is_some()),
                ("property_uri", self.property_uri.is_some()),
                ("pattern", self.pattern.is_some()),
            ],
        )?;
        if self.subject_uri.is_some() {
            let predicate = self.predicate.as_deref().unwrap_or("");
            validate_non_empty("predicate", predicate)?;
        }
        validate_non_empty("value", &self.value)?;
        if let Some(pattern) = &self.pattern {
            check_reserved(pattern, true)?;
        }
        self.graph.validate()
    }
}

/// Input for `set_reliability`: transition the current state's class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetReliabilityInput {
    /// Subject URI (paired with `predicate`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_uri: Option<String>,
    /// Property predicate, required with `subject_uri`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    /// Alternative: the property URI itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_uri: Option<String>,
    /// Target reliability key (`assumed` / `confirmed` / `deleted`).
    pub reliability: String,
    /// Attributed user URI; required for `confirmed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_uri: Option<String>,
    /// Free-text comment stored on the state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Update (default) or construct preview.
    #[serde(default)]
    pub query_type: QueryType,
    /// Graph scoping.
    #[serde(default)]
    pub graph: GraphConfig,
}

impl SetReliabilityInput {
    /// Validates this payload and returns the parsed target class.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn validate(&self) -> Result<Reliability, ValidationError> {
        exactly_one(
            "subject_uri + predicate | property_uri",
            &[
                ("subject_uri", self.subject_uri.is_some()),
                ("property_uri", self.property_uri.is_some()),
            ],
        )?;
        if self.subject_uri.is_some() {
            let predicate = self.predicate.as_deref().unwrap_or("");
            validate_non_empty("predicate", predicate)?;
        }
        let class = Reliability::settable(&self.reliability)?;
        if class.requires_attribution() {
            let user = self.user_uri.as_deref().unwrap_or("");
            validate_non_empty("user_uri", user)?;
        }
        self.graph.validate()?;
        Ok(class)
    }
}

/// Input for `restore_prop`: bring back the latest non-deleted state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestorePropInput {
    /// Restrict the restore to one property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_uri: Option<String>,
    /// Restrict the restore to properties of one subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_uri: Option<String>,
    /// Attributed user URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_uri: Option<String>,
    /// Free-text comment stored on the state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Update (default) or construct preview.
    #[serde(default)]
    pub query_type: QueryType,
    /// Graph scoping.
    #[serde(default)]
    pub graph: GraphConfig,
}

impl RestorePropInput {
    /// Validates this payload.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.graph.validate()
    }
}

/// Input for `get_props`: read property states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPropsInput {
    /// Restrict to one subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_uri: Option<String>,
    /// Restrict to one predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    /// Restrict to one property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_uri: Option<String>,
    /// When true (default) only current states are returned, excluding
    /// deleted ones unless `restriction` asks for them.
    #[serde(default = "default_latest")]
    pub latest: bool,
    /// Restrict to states of one reliability class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restriction: Option<Reliability>,
    /// Construct (default) or select.
    #[serde(default = "default_construct")]
    pub query_type: QueryType,
    /// Graph scoping.
    #[serde(default)]
    pub graph: GraphConfig,
}

fn default_latest() -> bool {
    true
}

fn default_construct() -> QueryType {
    QueryType::Construct
}

impl Default for GetPropsInput {
    fn default() -> Self {
        Self {
            subject_uri: None,
            predicate: None,
            property_uri: None,
            latest: true,
            restriction: None,
            query_type: QueryType::Construct,
            graph: GraphConfig::default(),
        }
    }
}

impl GetPropsInput {
    /// Validates this payload.
    ///
    /// # Errors
    ///
    /// [`ValidationError::AmbiguousInput`] when asked for an update form;
    /// graph errors per [`GraphConfig::validate`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.query_type == QueryType::Update {
            return Err(ValidationError::AmbiguousInput {
                expected: "construct | select".to_string(),
                given: "update".to_string(),
            });
        }
        self.graph.validate()
    }
}

/// Input shared by calculation operations: the calculation itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalcInput {
    /// Calculation URI; minted from the host config when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_uri: Option<String>,
    /// Human-readable label (required for definitions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Expression over `?var` placeholders, e.g. `(?h * ?w)`.
    pub expression: String,
    /// Ordered argument paths, each ending in a bound variable.
    pub argument_paths: Vec<String>,
    /// Predicate of the property the calculation infers.
    pub inferred_property: String,
    /// Restrict evaluation to one feature of interest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foi_restriction: Option<String>,
    /// Restrict evaluation to subjects matching a pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_restriction: Option<String>,
    /// Attributed user URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_uri: Option<String>,
    /// Free-text comment stored on derived states.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Definition metadata timestamp; defaults to now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    /// Update (default) or construct preview.
    #[serde(default)]
    pub query_type: QueryType,
    /// Graph scoping.
    #[serde(default)]
    pub graph: GraphConfig,
}

impl CalcInput {
    /// Validates the fields every calculation operation needs.
    ///
    /// The expression/argument-path variable reconciliation happens in the
    /// assembler, after path normalization.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_non_empty("expression", &self.expression)?;
        validate_non_empty("inferred_property", &self.inferred_property)?;
        if self.argument_paths.is_empty() {
            return Err(ValidationError::EmptyArgumentPaths);
        }
        check_reserved(&self.expression, false)?;
        for path in &self.argument_paths {
            check_reserved(path, true)?;
        }
        if let Some(p) = &self.path_restriction {
            check_reserved(p, true)?;
        }
        self.graph.validate()
    }

    /// Additional checks for `post_calc_definition`.
    ///
    /// # Errors
    ///
    /// [`ValidationError::MissingField`] when the label is absent.
    pub fn validate_definition(&self) -> Result<(), ValidationError> {
        self.validate()?;
        let label = self.label.as_deref().unwrap_or("");
        validate_non_empty("label", label)
    }
}

/// Input for `get_outdated`: find derived states with superseded arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetOutdatedInput {
    /// Restrict to one subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_uri: Option<String>,
    /// Restrict to one property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_uri: Option<String>,
    /// Graph scoping.
    #[serde(default)]
    pub graph: GraphConfig,
}

impl GetOutdatedInput {
    /// Validates this payload.
    ///
    /// # Errors
    ///
    /// See [`GraphConfig::validate`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.graph.validate()
    }
}

/// Input for `get_subscribers`: reverse dependency lookup for a property.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetSubscribersInput {
    /// The property whose dependents are wanted.
    pub property_uri: String,
    /// Graph scoping.
    #[serde(default)]
    pub graph: GraphConfig,
}

impl GetSubscribersInput {
    /// Validates this payload.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_non_empty("property_uri", &self.property_uri)?;
        self.graph.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_prop_requires_exactly_one_subject() {
        let mut input = PostPropInput {
            predicate: "props:height".to_string(),
            value: "1.2".to_string(),
            ..PostPropInput::default()
        };
        assert!(matches!(
            input.validate().unwrap_err(),
            ValidationError::AmbiguousInput { .. }
        ));

        input.subject_uri = Some("https://example.org/foi/1".to_string());
        assert!(input.validate().is_ok());

        input.pattern = Some("?x a bot:Element".to_string());
        let err = input.validate().unwrap_err();
        assert!(matches!(err, ValidationError::AmbiguousInput { given, .. } if given.contains('+')));
    }

    #[test]
    fn test_post_prop_confirmed_requires_user() {
        let input = PostPropInput {
            subject_uri: Some("https://example.org/foi/1".to_string()),
            predicate: "props:height".to_string(),
            value: "1.2".to_string(),
            reliability: Some("confirmed".to_string()),
            ..PostPropInput::default()
        };
        assert_eq!(
            input.validate().unwrap_err(),
            ValidationError::MissingField {
                field: "user_uri".to_string()
            }
        );
    }

    #[test]
    fn test_post_prop_rejects_derived() {
        let input = PostPropInput {
            subject_uri: Some("https://example.org/foi/1".to_string()),
            predicate: "props:height".to_string(),
            value: "1.2".to_string(),
            reliability: Some("derived".to_string()),
            ..PostPropInput::default()
        };
        assert_eq!(
            input.validate().unwrap_err(),
            ValidationError::DerivedNotSettable
        );
    }

    #[test]
    fn test_pattern_reserved_variables_rejected() {
        let input = PostPropInput {
            pattern: Some("?foi a bot:Element ; bot:hasValue ?val".to_string()),
            predicate: "props:height".to_string(),
            value: "1.2".to_string(),
            ..PostPropInput::default()
        };
        // `?foi` is allowed in subject position, `?val` is not allowed at all.
        assert_eq!(
            input.validate().unwrap_err(),
            ValidationError::ReservedVariable {
                name: "val".to_string()
            }
        );
    }

    #[test]
    fn test_pattern_cannot_bind_guard_variable() {
        // `?existing` is the idempotence-guard variable: a caller pattern
        // binding it would join into the MINUS guard.
        let input = PostPropInput {
            pattern: Some("?foi props:adjacentTo ?existing".to_string()),
            predicate: "props:height".to_string(),
            value: "1.2".to_string(),
            ..PostPropInput::default()
        };
        assert_eq!(
            input.validate().unwrap_err(),
            ValidationError::ReservedVariable {
                name: "existing".to_string()
            }
        );
    }

    #[test]
    fn test_calc_expression_cannot_bind_reliability() {
        // `?reliability` is assigned by a generated BIND; a caller variable
        // of the same name would make the emitted query illegal.
        let input = CalcInput {
            expression: "( ?reliability * 2 )".to_string(),
            inferred_property: "props:area".to_string(),
            argument_paths: vec!["?x props:factor ?reliability".to_string()],
            ..CalcInput::default()
        };
        assert_eq!(
            input.validate().unwrap_err(),
            ValidationError::ReservedVariable {
                name: "reliability".to_string()
            }
        );
    }

    #[test]
    fn test_put_prop_subject_needs_predicate() {
        let input = PutPropInput {
            subject_uri: Some("https://example.org/foi/1".to_string()),
            value: "1.2".to_string(),
            ..PutPropInput::default()
        };
        assert_eq!(
            input.validate().unwrap_err(),
            ValidationError::MissingField {
                field: "predicate".to_string()
            }
        );
    }

    #[test]
    fn test_set_reliability_parses_class() {
        let input = SetReliabilityInput {
            property_uri: Some("https://example.org/prop/1".to_string()),
            reliability: "deleted".to_string(),
            ..SetReliabilityInput::default()
        };
        assert_eq!(input.validate().unwrap(), Reliability::Deleted);
    }

    #[test]
    fn test_get_props_rejects_update_form() {
        let input = GetPropsInput {
            query_type: QueryType::Update,
            ..GetPropsInput::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_calc_input_requires_paths() {
        let input = CalcInput {
            expression: "(?h * ?w)".to_string(),
            inferred_property: "props:area".to_string(),
            ..CalcInput::default()
        };
        assert_eq!(
            input.validate().unwrap_err(),
            ValidationError::EmptyArgumentPaths
        );
    }

    #[test]
    fn test_calc_definition_requires_label() {
        let input = CalcInput {
            expression: "(?h * ?w)".to_string(),
            inferred_property: "props:area".to_string(),
            argument_paths: vec![
                "?x props:height ?h".to_string(),
                "?x props:width ?w".to_string(),
            ],
            ..CalcInput::default()
        };
        assert!(input.validate().is_ok());
        assert_eq!(
            input.validate_definition().unwrap_err(),
            ValidationError::MissingField {
                field: "label".to_string()
            }
        );
    }

    #[test]
    fn test_calc_expression_reserved_variable() {
        let input = CalcInput {
            expression: "(?now * 2)".to_string(),
            inferred_property: "props:area".to_string(),
            argument_paths: vec!["?x props:height ?h".to_string()],
            ..CalcInput::default()
        };
        assert_eq!(
            input.validate().unwrap_err(),
            ValidationError::ReservedVariable {
                name: "now".to_string()
            }
        );
    }

    #[test]
    fn test_payloads_deserialize_from_json() {
        let input: PostPropInput = serde_json::from_str(
            r#"{
                "subject_uri": "https://example.org/foi/1",
                "predicate": "props:height",
                "value": "1.2",
                "reliability": "assumed"
            }"#,
        )
        .unwrap();
        assert!(input.validate().is_ok());
        assert_eq!(input.query_type, QueryType::Update);
        assert!(input.graph.main_graph);
    }

    #[test]
    fn test_reserved_variables_accessor() {
        assert!(reserved_variables().contains(&"foi"));
        assert!(reserved_variables().contains(&"guid"));
    }
}
