//! Property operations.
//!
//! Each operation compiles one input payload into one SPARQL program:
//! a `DELETE { … } INSERT { … } WHERE { … }` update (default) or a
//! `CONSTRUCT` preview rendering the same inserted triples over the same
//! WHERE clause. Reads emit `CONSTRUCT` or `SELECT`.
//!
//! Vocabulary: a property hangs off its feature of interest via the caller's
//! predicate, owns states via `opm:hasPropertyState`, and each state carries
//! `opm:valueAtState`, `prov:generatedAtTime`, reliability class tags, and
//! optional `prov:wasAttributedTo` / `rdfs:comment`. Exactly one state per
//! property is tagged `opm:CurrentPropertyState`; mutations move the tag and
//! append, they never remove history.

use crate::assembler::{indent, join_blocks, QueryAssembler};
use crate::clean::{clean_property_literal, clean_uri};
use crate::error::{OpmResult, ValidationError};
use crate::graph::{dataset_clauses, wrap_in_graph_scope, GraphConfig, Role};
use crate::input::{
    GetPropsInput, PostPropInput, PutPropInput, QueryType, RestorePropInput, SetReliabilityInput,
};
use crate::path::{clean_argument_paths, clean_path, replace_variable_token};
use crate::reliability::{minus_classes, Reliability};

impl QueryAssembler {
    /// Compiles a `post_prop`: create a new property (and its first state)
    /// on every matched subject that does not already carry the predicate.
    ///
    /// The negative existence guard shares the WHERE clause with the
    /// subject match, which is what makes re-application yield zero new
    /// triples.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn post_prop(&self, input: &PostPropInput) -> OpmResult<String> {
        input.validate()?;

        let predicate = required_uri("predicate", &input.predicate)?;
        let value = clean_property_literal(&input.value);

        let subject_block = match (&input.subject_uri, &input.pattern) {
            (Some(uri), None) => {
                let uri = required_uri("subject_uri", uri)?;
                format!("BIND( {uri} AS ?foi )")
            }
            (None, Some(pattern)) => clean_path(pattern),
            // validate() enforced exactly-one.
            _ => unreachable!("validated: exactly one of subject_uri | pattern"),
        };

        let mut class_tags = "opm:CurrentPropertyState , opm:PropertyState".to_string();
        if let Some(key) = &input.reliability {
            let class = Reliability::settable(key)?;
            class_tags.push_str(&format!(" , {}", class.class_token()));
        }

        let new_state = join_blocks([
            format!("?foi {predicate} ?propertyURI .").as_str(),
            "?propertyURI opm:hasPropertyState ?stateURI .",
            format!(
                "?stateURI a {class_tags} ;\n\topm:valueAtState {value} ;\n\tprov:generatedAtTime ?now ."
            )
            .as_str(),
            Self::provenance_triples(
                "stateURI",
                input.user_uri.as_deref(),
                input.comment.as_deref(),
            )?
            .as_str(),
        ]);

        let where_body = join_blocks([
            subject_block.as_str(),
            format!("MINUS {{ ?foi {predicate} ?existing . }}").as_str(),
            self.mint_bindings("foi", true).as_str(),
        ]);

        self.emit_mutation(
            input.query_type,
            &input.graph,
            None,
            &new_state,
            &where_body,
        )
    }

    /// Compiles a `put_prop`: append a new current state with a changed
    /// value.
    ///
    /// In-query guards: a current state exists, it is not Deleted /
    /// Confirmed / Derived, and the new value differs from the previous one
    /// (string inequality). Any guard failing makes the update a no-op.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn put_prop(&self, input: &PutPropInput) -> OpmResult<String> {
        input.validate()?;

        let value = clean_property_literal(&input.value);
        let target = self.property_target(
            input.subject_uri.as_deref(),
            input.predicate.as_deref(),
            input.property_uri.as_deref(),
            input.pattern.as_deref(),
        )?;

        let where_body = join_blocks([
            target.as_str(),
            "?propertyURI opm:hasPropertyState ?previousState .",
            "?previousState a opm:CurrentPropertyState ;\n\topm:valueAtState ?previousValue .",
            minus_classes("previousState", &Reliability::update_blockers()).as_str(),
            format!("FILTER ( STR(?previousValue) != STR({value}) )").as_str(),
            self.mint_bindings("propertyURI", false).as_str(),
        ]);

        let new_state = join_blocks([
            "?previousState a opm:PropertyState .",
            "?propertyURI opm:hasPropertyState ?stateURI .",
            format!(
                "?stateURI a opm:CurrentPropertyState , opm:PropertyState ;\n\topm:valueAtState {value} ;\n\tprov:generatedAtTime ?now ."
            )
            .as_str(),
            Self::provenance_triples(
                "stateURI",
                input.user_uri.as_deref(),
                input.comment.as_deref(),
            )?
            .as_str(),
        ]);

        self.emit_mutation(
            input.query_type,
            &input.graph,
            Some("?previousState a opm:CurrentPropertyState ."),
            &new_state,
            &where_body,
        )
    }

    /// Compiles a `set_reliability`: append a new current state carrying the
    /// target class, copying the previous state's predicate/value pairs
    /// forward (excluding its generation time and prior class tags; a
    /// Deleted state also drops the value).
    ///
    /// The copy rows are an `OPTIONAL` group: a state carrying nothing
    /// beyond its class tags, value, and timestamp still transitions, it
    /// just has nothing to copy.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn set_reliability(&self, input: &SetReliabilityInput) -> OpmResult<String> {
        let class = input.validate()?;

        let target = self.property_target(
            input.subject_uri.as_deref(),
            input.predicate.as_deref(),
            input.property_uri.as_deref(),
            None,
        )?;

        let mut copy_filters = vec![
            "FILTER ( ?key != prov:generatedAtTime )".to_string(),
            "FILTER ( ?key != rdf:type )".to_string(),
        ];
        if !class.carries_value() {
            copy_filters.push("FILTER ( ?key != opm:valueAtState )".to_string());
        }
        let copy_forward = format!(
            "OPTIONAL {{\n{}\n}}",
            indent(&join_blocks([
                "?previousState ?key ?value .",
                copy_filters.join("\n").as_str(),
            ]))
        );

        let where_body = join_blocks([
            target.as_str(),
            "?propertyURI opm:hasPropertyState ?previousState .",
            "?previousState a opm:CurrentPropertyState .",
            minus_classes("previousState", class.transition_blockers()).as_str(),
            copy_forward.as_str(),
            self.mint_bindings("propertyURI", false).as_str(),
        ]);

        let new_state = join_blocks([
            "?previousState a opm:PropertyState .",
            "?propertyURI opm:hasPropertyState ?stateURI .",
            format!(
                "?stateURI a opm:CurrentPropertyState , opm:PropertyState , {} ;\n\tprov:generatedAtTime ?now .",
                class.class_token()
            )
            .as_str(),
            "?stateURI ?key ?value .",
            Self::provenance_triples(
                "stateURI",
                input.user_uri.as_deref(),
                input.comment.as_deref(),
            )?
            .as_str(),
        ]);

        self.emit_mutation(
            input.query_type,
            &input.graph,
            Some("?previousState a opm:CurrentPropertyState ."),
            &new_state,
            &where_body,
        )
    }

    /// Compiles a `restore_prop`: per matched property, find the most recent
    /// non-Deleted historical state and replay its predicate/value pairs
    /// (excluding generation time and class tags) into a new current state,
    /// retagging the prior current state as historical.
    ///
    /// Restoring a property whose current state is not Deleted is a
    /// query-level no-op: the replayed state is required to differ from the
    /// current one.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn restore_prop(&self, input: &RestorePropInput) -> OpmResult<String> {
        input.validate()?;

        let mut restriction = String::new();
        if let Some(prop) = clean_uri(input.property_uri.as_deref())? {
            restriction.push_str(&format!("BIND( {prop} AS ?propertyURI )\n"));
        }
        if let Some(subject) = clean_uri(input.subject_uri.as_deref())? {
            restriction.push_str(&format!("BIND( {subject} AS ?foi )\n?foi ?property ?propertyURI .\n"));
        }

        let latest_non_deleted = join_blocks([
            "{ SELECT ?propertyURI ( MAX(?t) AS ?tmax ) WHERE {",
            "\t?propertyURI opm:hasPropertyState ?st .",
            "\t?st prov:generatedAtTime ?t .",
            "\tMINUS { ?st a opm:Deleted . }",
            "} GROUP BY ?propertyURI }",
        ]);

        let where_body = join_blocks([
            restriction.as_str(),
            "?propertyURI opm:hasPropertyState ?previousState .",
            "?previousState a opm:CurrentPropertyState .",
            latest_non_deleted.as_str(),
            "?propertyURI opm:hasPropertyState ?restoreState .",
            "?restoreState prov:generatedAtTime ?tmax .",
            "FILTER ( ?restoreState != ?previousState )",
            "?restoreState ?key ?value .",
            "FILTER ( ?key != prov:generatedAtTime )",
            "FILTER ( !( ?key = rdf:type && ( ?value = opm:CurrentPropertyState || ?value = opm:Deleted ) ) )",
            self.mint_bindings("propertyURI", false).as_str(),
        ]);

        let new_state = join_blocks([
            "?previousState a opm:PropertyState .",
            "?propertyURI opm:hasPropertyState ?stateURI .",
            "?stateURI a opm:CurrentPropertyState ;\n\tprov:generatedAtTime ?now .",
            "?stateURI ?key ?value .",
            Self::provenance_triples(
                "stateURI",
                input.user_uri.as_deref(),
                input.comment.as_deref(),
            )?
            .as_str(),
        ]);

        self.emit_mutation(
            input.query_type,
            &input.graph,
            Some("?previousState a opm:CurrentPropertyState ."),
            &new_state,
            &where_body,
        )
    }

    /// Compiles a `get_props` read: property states filtered by subject,
    /// predicate, or property URI.
    ///
    /// `latest = true` restricts to current states and excludes Deleted
    /// ones unless `restriction` explicitly asks for deleted states;
    /// `latest = false` returns the full history. Never mutates.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn get_props(&self, input: &GetPropsInput) -> OpmResult<String> {
        input.validate()?;

        let mut restriction = String::new();
        if let Some(subject) = clean_uri(input.subject_uri.as_deref())? {
            restriction.push_str(&format!("BIND( {subject} AS ?foi )\n"));
        }
        if let Some(predicate) = clean_uri(input.predicate.as_deref())? {
            restriction.push_str(&format!("BIND( {predicate} AS ?property )\n"));
        }
        if let Some(prop) = clean_uri(input.property_uri.as_deref())? {
            restriction.push_str(&format!("BIND( {prop} AS ?propertyURI )\n"));
        }

        let mut state_filters = Vec::new();
        if input.latest {
            state_filters.push("?stateURI a opm:CurrentPropertyState .".to_string());
            if input.restriction != Some(Reliability::Deleted) {
                state_filters.push("MINUS { ?stateURI a opm:Deleted . }".to_string());
            }
        }
        if let Some(class) = input.restriction {
            state_filters.push(format!("?stateURI a {} .", class.class_token()));
        }

        let where_body = join_blocks([
            restriction.as_str(),
            "?foi ?property ?propertyURI .",
            "?propertyURI opm:hasPropertyState ?stateURI .",
            "?stateURI prov:generatedAtTime ?timestamp .",
            "OPTIONAL { ?stateURI opm:valueAtState ?value . }",
            state_filters.join("\n").as_str(),
        ]);
        let wrapped_where = wrap_in_graph_scope(&where_body, &input.graph, Role::Read)?;
        let datasets = dataset_clauses(&input.graph, false)?;

        let body = match input.query_type {
            QueryType::Select => {
                let projection =
                    "SELECT ?foi ?property ?propertyURI ?stateURI ?value ?timestamp";
                format!("{projection}\n{datasets}WHERE {{\n{}\n}}", indent(&wrapped_where))
            }
            QueryType::Construct => {
                let template = join_blocks([
                    "?foi ?property ?propertyURI .",
                    "?propertyURI opm:hasPropertyState ?stateURI .",
                    "?stateURI opm:valueAtState ?value ;\n\tprov:generatedAtTime ?timestamp .",
                ]);
                format!(
                    "CONSTRUCT {{\n{}\n}}\n{datasets}WHERE {{\n{}\n}}",
                    indent(&template),
                    indent(&wrapped_where)
                )
            }
            QueryType::Update => {
                unreachable!("validated: get_props is never an update")
            }
        };
        self.finalize(&body)
    }

    /// Renders the target block selecting the affected property: either a
    /// subject/predicate pair, a property URI, or (where the operation
    /// supports it) a pattern whose trailing variable designates the
    /// property.
    fn property_target(
        &self,
        subject_uri: Option<&str>,
        predicate: Option<&str>,
        property_uri: Option<&str>,
        pattern: Option<&str>,
    ) -> OpmResult<String> {
        if let Some(subject) = subject_uri {
            let subject = required_uri("subject_uri", subject)?;
            let predicate = required_uri("predicate", predicate.unwrap_or(""))?;
            return Ok(format!(
                "BIND( {subject} AS ?foi )\n?foi {predicate} ?propertyURI ."
            ));
        }
        if let Some(prop) = property_uri {
            let prop = required_uri("property_uri", prop)?;
            return Ok(format!("BIND( {prop} AS ?propertyURI )"));
        }
        if let Some(pattern) = pattern {
            let owned = [pattern.to_string()];
            let args = clean_argument_paths(&owned)?;
            let var = format!("?{}", args.variables[0]);
            return Ok(replace_variable_token(&args.paths[0], &var, "?propertyURI"));
        }
        // Input validation enforced exactly-one beforehand.
        Err(ValidationError::AmbiguousInput {
            expected: "subject_uri + predicate | property_uri | pattern".to_string(),
            given: "none".to_string(),
        }
        .into())
    }

    /// Emits a mutation in update or construct-preview form: the same
    /// WHERE clause either drives a `DELETE`/`INSERT` or a `CONSTRUCT` of
    /// the would-be-inserted triples.
    pub(crate) fn emit_mutation(
        &self,
        query_type: QueryType,
        graph: &GraphConfig,
        delete_block: Option<&str>,
        insert_block: &str,
        where_body: &str,
    ) -> OpmResult<String> {
        let wrapped_where = wrap_in_graph_scope(where_body, graph, Role::Read)?;
        let body = match query_type {
            QueryType::Update => {
                let wrapped_insert = wrap_in_graph_scope(insert_block, graph, Role::Write)?;
                let datasets = dataset_clauses(graph, true)?;
                let mut out = String::new();
                if let Some(delete) = delete_block {
                    let wrapped_delete = wrap_in_graph_scope(delete, graph, Role::Read)?;
                    out.push_str(&format!("DELETE {{\n{}\n}}\n", indent(&wrapped_delete)));
                }
                out.push_str(&format!("INSERT {{\n{}\n}}\n", indent(&wrapped_insert)));
                out.push_str(&format!("{datasets}WHERE {{\n{}\n}}", indent(&wrapped_where)));
                out
            }
            QueryType::Construct => {
                // CONSTRUCT templates are triple patterns; graph wrapping
                // applies to the WHERE side only.
                let datasets = dataset_clauses(graph, false)?;
                format!(
                    "CONSTRUCT {{\n{}\n}}\n{datasets}WHERE {{\n{}\n}}",
                    indent(insert_block),
                    indent(&wrapped_where)
                )
            }
            QueryType::Select => {
                return Err(ValidationError::AmbiguousInput {
                    expected: "update | construct".to_string(),
                    given: "select".to_string(),
                }
                .into())
            }
        };
        self.finalize(&body)
    }
}

/// Cleans a URI-valued field, mapping an absent/blank value to
/// `MissingField`.
fn required_uri(field: &'static str, value: &str) -> OpmResult<String> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
        }
        .into());
    }
    let cleaned = clean_uri(Some(value))?
        .unwrap_or_else(|| unreachable!("clean_uri(Some(_)) returns Some"));
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::AssemblerConfig;
    use crate::prefix::Prefix;

    fn assembler() -> QueryAssembler {
        QueryAssembler::new(AssemblerConfig {
            host: "https://example.org/".to_string(),
            prefixes: vec![
                Prefix::new("bot", "https://w3id.org/bot#"),
                Prefix::new("props", "https://w3id.org/props#"),
            ],
        })
        .unwrap()
    }

    #[test]
    fn test_post_prop_insert_form() {
        let asm = assembler();
        let query = asm
            .post_prop(&PostPropInput {
                subject_uri: Some("https://example.org/foi/1".to_string()),
                predicate: "props:designAmbientTemperature".to_string(),
                value: "70 Cel".to_string(),
                reliability: Some("assumed".to_string()),
                ..PostPropInput::default()
            })
            .unwrap();

        assert!(query.starts_with("PREFIX "));
        assert!(query.contains("INSERT {"));
        assert!(query.contains("MINUS { ?foi props:designAmbientTemperature ?existing . }"));
        assert!(query.contains("opm:Assumed"));
        assert!(query.contains("opm:valueAtState \"70 Cel\""));
        assert!(query.contains("BIND( now() AS ?now )"));
        // Guard and data pattern share one WHERE clause.
        assert_eq!(query.matches("WHERE {").count(), 1);
    }

    #[test]
    fn test_post_prop_prefix_header_is_exact() {
        let asm = assembler();
        let query = asm
            .post_prop(&PostPropInput {
                pattern: Some("?x a bot:Element".to_string()),
                predicate: "props:height".to_string(),
                value: "1.2".to_string(),
                ..PostPropInput::default()
            })
            .unwrap();
        assert!(query.contains("PREFIX bot: <https://w3id.org/bot#>"));
        assert!(query.contains("PREFIX props: <https://w3id.org/props#>"));
        assert!(query.contains("PREFIX opm: <https://w3id.org/opm#>"));
        // seas/sd registered but unused: never emitted.
        assert!(!query.contains("PREFIX seas:"));
        assert!(!query.contains("PREFIX sd:"));
    }

    #[test]
    fn test_post_prop_pattern_subject_rewritten() {
        let asm = assembler();
        let query = asm
            .post_prop(&PostPropInput {
                pattern: Some("?elem a bot:Element".to_string()),
                predicate: "props:height".to_string(),
                value: "1.2".to_string(),
                ..PostPropInput::default()
            })
            .unwrap();
        assert!(query.contains("?foi a bot:Element ."));
        assert!(!query.contains("?elem"));
    }

    #[test]
    fn test_post_prop_construct_preview() {
        let asm = assembler();
        let query = asm
            .post_prop(&PostPropInput {
                subject_uri: Some("https://example.org/foi/1".to_string()),
                predicate: "props:height".to_string(),
                value: "1.2".to_string(),
                query_type: QueryType::Construct,
                ..PostPropInput::default()
            })
            .unwrap();
        assert!(query.contains("CONSTRUCT {"));
        assert!(!query.contains("INSERT"));
        assert!(query.contains("MINUS { ?foi props:height ?existing . }"));
    }

    #[test]
    fn test_put_prop_guards() {
        let asm = assembler();
        let query = asm
            .put_prop(&PutPropInput {
                subject_uri: Some("https://example.org/foi/1".to_string()),
                predicate: Some("props:height".to_string()),
                value: "65 Cel".to_string(),
                ..PutPropInput::default()
            })
            .unwrap();

        assert!(query.contains("DELETE {"));
        assert!(query.contains("?previousState a opm:CurrentPropertyState ."));
        assert!(query.contains("MINUS { ?previousState a opm:Deleted . }"));
        assert!(query.contains("MINUS { ?previousState a opm:Confirmed . }"));
        assert!(query.contains("MINUS { ?previousState a opm:Derived . }"));
        assert!(query.contains("FILTER ( STR(?previousValue) != STR(\"65 Cel\") )"));
        assert!(query.contains("?previousState a opm:PropertyState ."));
    }

    #[test]
    fn test_put_prop_by_property_uri() {
        let asm = assembler();
        let query = asm
            .put_prop(&PutPropInput {
                property_uri: Some("https://example.org/property_1".to_string()),
                value: "65 Cel".to_string(),
                ..PutPropInput::default()
            })
            .unwrap();
        assert!(query.contains("BIND( <https://example.org/property_1> AS ?propertyURI )"));
    }

    #[test]
    fn test_put_prop_by_pattern_binds_property() {
        let asm = assembler();
        let query = asm
            .put_prop(&PutPropInput {
                pattern: Some("?x props:height ?h".to_string()),
                value: "2.4".to_string(),
                ..PutPropInput::default()
            })
            .unwrap();
        assert!(query.contains("?foi props:height ?propertyURI ."));
        assert!(!query.contains("?h"));
    }

    #[test]
    fn test_set_reliability_deleted_drops_value() {
        let asm = assembler();
        let query = asm
            .set_reliability(&SetReliabilityInput {
                property_uri: Some("https://example.org/property_1".to_string()),
                reliability: "deleted".to_string(),
                ..SetReliabilityInput::default()
            })
            .unwrap();
        assert!(query.contains("FILTER ( ?key != opm:valueAtState )"));
        assert!(query.contains("MINUS { ?previousState a opm:Confirmed . }"));
        // Delete is blocked only by Confirmed.
        assert!(!query.contains("MINUS { ?previousState a opm:Deleted . }"));
        assert!(query.contains("opm:Deleted ;"));
    }

    #[test]
    fn test_set_reliability_copies_forward_optionally() {
        let asm = assembler();
        let query = asm
            .set_reliability(&SetReliabilityInput {
                property_uri: Some("https://example.org/property_1".to_string()),
                reliability: "deleted".to_string(),
                ..SetReliabilityInput::default()
            })
            .unwrap();

        // A state created by post_prop/put_prop with no comment or
        // attribution carries only rdf:type, opm:valueAtState, and
        // prov:generatedAtTime. All three are excluded from the copy, so
        // the copy rows must be optional or such a state could never
        // transition.
        assert!(query.contains(
            "OPTIONAL {\n\t\t?previousState ?key ?value .\n\t\tFILTER ( ?key != prov:generatedAtTime )\n\t\tFILTER ( ?key != rdf:type )\n\t\tFILTER ( ?key != opm:valueAtState )\n\t}"
        ));
        // The new state's own triples stay unconditional.
        assert!(query.contains(
            "?stateURI a opm:CurrentPropertyState , opm:PropertyState , opm:Deleted ;"
        ));
    }

    #[test]
    fn test_set_reliability_confirmed_attribution() {
        let asm = assembler();
        let query = asm
            .set_reliability(&SetReliabilityInput {
                property_uri: Some("https://example.org/property_1".to_string()),
                reliability: "confirmed".to_string(),
                user_uri: Some("https://example.org/user/alice".to_string()),
                ..SetReliabilityInput::default()
            })
            .unwrap();
        assert!(query.contains("prov:wasAttributedTo <https://example.org/user/alice>"));
        assert!(query.contains("MINUS { ?previousState a opm:Derived . }"));
        // Copy-forward keeps the value for confirmed states.
        assert!(!query.contains("FILTER ( ?key != opm:valueAtState )"));
    }

    #[test]
    fn test_set_reliability_confirmed_without_user_is_error() {
        let asm = assembler();
        let err = asm
            .set_reliability(&SetReliabilityInput {
                property_uri: Some("https://example.org/property_1".to_string()),
                reliability: "confirmed".to_string(),
                ..SetReliabilityInput::default()
            })
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_restore_prop_latest_non_deleted() {
        let asm = assembler();
        let query = asm
            .restore_prop(&RestorePropInput {
                property_uri: Some("https://example.org/property_1".to_string()),
                ..RestorePropInput::default()
            })
            .unwrap();
        assert!(query.contains("SELECT ?propertyURI ( MAX(?t) AS ?tmax )"));
        assert!(query.contains("MINUS { ?st a opm:Deleted . }"));
        assert!(query.contains("GROUP BY ?propertyURI"));
        assert!(query.contains("FILTER ( ?restoreState != ?previousState )"));
        assert!(query.contains("FILTER ( ?key != prov:generatedAtTime )"));
        assert!(query.contains("?stateURI ?key ?value ."));
    }

    #[test]
    fn test_get_props_latest_construct() {
        let asm = assembler();
        let query = asm
            .get_props(&GetPropsInput {
                subject_uri: Some("https://example.org/foi/1".to_string()),
                ..GetPropsInput::default()
            })
            .unwrap();
        assert!(query.contains("CONSTRUCT {"));
        assert!(query.contains("?stateURI a opm:CurrentPropertyState ."));
        assert!(query.contains("MINUS { ?stateURI a opm:Deleted . }"));
    }

    #[test]
    fn test_get_props_deleted_restriction_keeps_deleted() {
        let asm = assembler();
        let query = asm
            .get_props(&GetPropsInput {
                restriction: Some(Reliability::Deleted),
                ..GetPropsInput::default()
            })
            .unwrap();
        assert!(query.contains("?stateURI a opm:Deleted ."));
        assert!(!query.contains("MINUS { ?stateURI a opm:Deleted . }"));
    }

    #[test]
    fn test_get_props_history_select() {
        let asm = assembler();
        let query = asm
            .get_props(&GetPropsInput {
                latest: false,
                query_type: QueryType::Select,
                ..GetPropsInput::default()
            })
            .unwrap();
        assert!(query.contains("SELECT ?foi ?property ?propertyURI ?stateURI ?value ?timestamp"));
        assert!(!query.contains("opm:CurrentPropertyState ."));
    }

    #[test]
    fn test_graph_scoping_update() {
        let asm = assembler();
        let query = asm
            .put_prop(&PutPropInput {
                property_uri: Some("https://example.org/property_1".to_string()),
                value: "1".to_string(),
                graph: GraphConfig::inference("https://example.org/inf")
                    .with_named_graph("https://example.org/g1"),
                ..PutPropInput::default()
            })
            .unwrap();
        assert!(query.contains("GRAPH ?g {"));
        assert!(query.contains("GRAPH <https://example.org/inf> {"));
        assert!(query.contains("USING NAMED <https://example.org/g1>"));
    }

    #[test]
    fn test_graph_scoping_read() {
        let asm = assembler();
        let query = asm
            .get_props(&GetPropsInput {
                graph: GraphConfig::inference("https://example.org/inf")
                    .with_named_graph("https://example.org/g1"),
                ..GetPropsInput::default()
            })
            .unwrap();
        assert!(query.contains("GRAPH ?g {"));
        assert!(query.contains("FROM NAMED <https://example.org/g1>"));
        // Construct templates carry plain triples.
        assert!(!query.contains("CONSTRUCT {\n\tGRAPH"));
    }

    #[test]
    fn test_main_graph_emits_no_graph_keyword() {
        let asm = assembler();
        let query = asm
            .post_prop(&PostPropInput {
                subject_uri: Some("https://example.org/foi/1".to_string()),
                predicate: "props:height".to_string(),
                value: "1.2".to_string(),
                ..PostPropInput::default()
            })
            .unwrap();
        assert!(!query.contains("GRAPH"));
    }
}
