//! Calculation operations.
//!
//! A calculation derives one property from others: its expression names
//! `?var` placeholders, each bound by an argument path ending in that
//! variable. Defining a calculation stores its metadata as a graph node;
//! evaluating it (`post_calc` / `put_calc`) walks each argument path to the
//! property's current state, binds the state's value to the expression
//! variable, and materializes a `opm:Derived` state whose
//! `prov:wasDerivedFrom` links record the exact contributing states.
//!
//! Aggregate expressions (`sum`, `count`, `min`, `max`, `avg`) are lowered
//! to a `GROUP BY ?foi` sub-select instead of a flat `BIND`.

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use crate::assembler::{indent, join_blocks, QueryAssembler};
use crate::clean::{clean_property_literal, clean_uri};
use crate::error::{OpmResult, ValidationError};
use crate::extract::extract_variables;
use crate::graph::{dataset_clauses, wrap_in_graph_scope, Role};
use crate::input::{CalcInput, GetOutdatedInput, GetSubscribersInput, QueryType};
use crate::path::{clean_argument_paths, clean_path, replace_variable_token, ArgumentPaths};

/// Aggregate keywords recognized inside calculation expressions.
const AGGREGATE_KEYWORDS: &[&str] = &["sum", "count", "min", "max", "avg"];

/// The analyzed form of a calculation expression.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExpressionInfo {
    /// Free variables, first-seen order.
    variables: Vec<String>,
    /// The single aggregate keyword, if the expression is an aggregation.
    aggregate: Option<String>,
}

/// Scans an expression for free variables and aggregate keywords.
///
/// At most one aggregate keyword may occur; a second occurrence (same
/// keyword or not) is a validation error.
fn analyze_expression(expression: &str) -> Result<ExpressionInfo, ValidationError> {
    let variables = extract_variables(expression);
    let mut found: Vec<String> = Vec::new();
    let bytes = expression.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'?' {
            // Skip the variable token so `?summand` never reads as `sum`.
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
                i += 1;
            }
            continue;
        }
        if bytes[i].is_ascii_alphabetic() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
                i += 1;
            }
            let word = expression[start..i].to_ascii_lowercase();
            if AGGREGATE_KEYWORDS.contains(&word.as_str()) {
                let mut j = i;
                while j < bytes.len() && bytes[j] == b' ' {
                    j += 1;
                }
                if j < bytes.len() && bytes[j] == b'(' {
                    found.push(word);
                }
            }
            continue;
        }
        i += 1;
    }
    if found.len() > 1 {
        return Err(ValidationError::ConflictingAggregateKeywords {
            first: found[0].clone(),
            second: found[1].clone(),
        });
    }
    Ok(ExpressionInfo {
        variables,
        aggregate: found.into_iter().next(),
    })
}

/// Checks that the expression's free variables equal, as a set, the
/// variables bound by the argument paths, and that the counts line up
/// positionally.
fn reconcile_variables(
    info: &ExpressionInfo,
    args: &ArgumentPaths,
) -> Result<(), ValidationError> {
    let mismatch = || ValidationError::VariableSetMismatch {
        expression_vars: info.variables.clone(),
        argument_vars: args.variables.clone(),
    };
    if info.variables.len() != args.variables.len() {
        return Err(mismatch());
    }
    for var in &info.variables {
        if !args.variables.contains(var) {
            return Err(mismatch());
        }
    }
    Ok(())
}

/// Rejects caller variables that collide with the `?propertyN` /
/// `?stateN` helpers the evaluation body generates.
fn check_generated_collisions(vars: &[String]) -> Result<(), ValidationError> {
    for var in vars {
        for stem in ["property", "state"] {
            if let Some(rest) = var.strip_prefix(stem) {
                if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(ValidationError::ReservedVariable { name: var.clone() });
                }
            }
        }
    }
    Ok(())
}

impl QueryAssembler {
    /// Compiles a `post_calc_definition`: store the calculation's metadata
    /// (label, expression, ordered argument paths, restrictions, inferred
    /// property) as its own graph node, separate from any evaluation.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`]; in particular the expression's variable set
    /// must equal the argument paths' bound-variable set.
    pub fn post_calc_definition(&self, input: &CalcInput) -> OpmResult<String> {
        input.validate_definition()?;
        let (args, _info) = self.reconciled(input)?;

        let calc_uri = self.calculation_uri(input)?;
        let label = clean_property_literal(input.label.as_deref().unwrap_or(""));
        let expression = clean_property_literal(&input.expression);
        let inferred = required_predicate(&input.inferred_property)?;
        let generated_at = input
            .generated_at
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        let path_list = args
            .paths
            .iter()
            .map(|p| clean_property_literal(p))
            .collect::<Vec<_>>()
            .join(" ");

        let mut node = format!(
            "{calc_uri} a opm:Calculation ;\n\trdfs:label {label} ;\n\topm:expression {expression} ;\n\topm:inferredProperty {inferred} ;\n\topm:argumentPaths ( {path_list} ) ;\n\tprov:generatedAtTime \"{generated_at}\"^^xsd:dateTime ."
        );
        if let Some(foi) = clean_uri(input.foi_restriction.as_deref())? {
            node.push_str(&format!("\n{calc_uri} opm:foiRestriction {foi} ."));
        }
        if let Some(path) = &input.path_restriction {
            let literal = clean_property_literal(&clean_path(path));
            node.push_str(&format!("\n{calc_uri} opm:pathRestriction {literal} ."));
        }
        if let Some(user) = clean_uri(input.user_uri.as_deref())? {
            node.push_str(&format!("\n{calc_uri} prov:wasAttributedTo {user} ."));
        }

        let body = match input.query_type {
            QueryType::Construct => {
                format!("CONSTRUCT {{\n{}\n}}\nWHERE {{ }}", indent(&node))
            }
            _ => {
                let wrapped = wrap_in_graph_scope(&node, &input.graph, Role::Write)?;
                format!("INSERT DATA {{\n{}\n}}", indent(&wrapped))
            }
        };
        self.finalize(&body)
    }

    /// Compiles a `post_calc`: evaluate the calculation and create the
    /// inferred property, with its first `opm:Derived` state, on every
    /// matched subject that does not already carry it.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn post_calc(&self, input: &CalcInput) -> OpmResult<String> {
        input.validate()?;
        let (args, info) = self.reconciled(input)?;
        let inferred = required_predicate(&input.inferred_property)?;

        let patterns = argument_patterns(&args);
        let state_vars = state_variables(&args);

        let where_body = join_blocks([
            self.evaluation_restrictions(input)?.as_str(),
            patterns.as_str(),
            format!("MINUS {{ ?foi {inferred} ?existing . }}").as_str(),
            result_binding(&input.expression, &info, &patterns).as_str(),
            reliability_binding(&state_vars).as_str(),
            self.mint_bindings("foi", true).as_str(),
        ]);

        let new_state = join_blocks([
            format!("?foi {inferred} ?propertyURI .").as_str(),
            "?propertyURI opm:hasPropertyState ?stateURI .",
            derived_state_triples(&state_vars, self.generated_by(input)?.as_deref()).as_str(),
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
            None,
            &new_state,
            &where_body,
        )
    }

    /// Compiles a `put_calc`: re-evaluate the calculation over the current
    /// argument states and append a new `opm:Derived` state where the
    /// result differs from the previous one, or where either side lost its
    /// value to a deletion.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn put_calc(&self, input: &CalcInput) -> OpmResult<String> {
        input.validate()?;
        let (args, info) = self.reconciled(input)?;
        let inferred = required_predicate(&input.inferred_property)?;

        let patterns = argument_patterns(&args);
        let state_vars = state_variables(&args);

        let where_body = join_blocks([
            self.evaluation_restrictions(input)?.as_str(),
            patterns.as_str(),
            format!("?foi {inferred} ?propertyURI .").as_str(),
            "?propertyURI opm:hasPropertyState ?previousState .",
            "?previousState a opm:CurrentPropertyState , opm:Derived .",
            "OPTIONAL { ?previousState opm:valueAtState ?previousValue . }",
            result_binding(&input.expression, &info, &patterns).as_str(),
            "FILTER ( !BOUND(?res) || !BOUND(?previousValue) || STR(?res) != STR(?previousValue) )",
            reliability_binding(&state_vars).as_str(),
            self.mint_bindings("propertyURI", false).as_str(),
        ]);

        let new_state = join_blocks([
            "?previousState a opm:PropertyState .",
            "?propertyURI opm:hasPropertyState ?stateURI .",
            derived_state_triples(&state_vars, self.generated_by(input)?.as_deref()).as_str(),
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

    /// Compiles a `get_outdated` read: current Derived states one of whose
    /// `prov:wasDerivedFrom` sources has since been superseded, meaning a
    /// `put_calc` re-run is warranted. Diagnostic only, never mutates.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn get_outdated(&self, input: &GetOutdatedInput) -> OpmResult<String> {
        input.validate()?;

        let mut restriction = String::new();
        if let Some(subject) = clean_uri(input.subject_uri.as_deref())? {
            restriction.push_str(&format!("BIND( {subject} AS ?foi )\n"));
        }
        if let Some(prop) = clean_uri(input.property_uri.as_deref())? {
            restriction.push_str(&format!("BIND( {prop} AS ?propertyURI )\n"));
        }

        let where_body = join_blocks([
            restriction.as_str(),
            "?foi ?property ?propertyURI .",
            "?propertyURI opm:hasPropertyState ?stateURI .",
            "?stateURI a opm:CurrentPropertyState , opm:Derived ;\n\tprov:wasDerivedFrom ?sourceState .",
            "MINUS { ?sourceState a opm:CurrentPropertyState . }",
        ]);
        let wrapped = wrap_in_graph_scope(&where_body, &input.graph, Role::Read)?;
        let datasets = dataset_clauses(&input.graph, false)?;

        let body = format!(
            "SELECT DISTINCT ?foi ?propertyURI ?stateURI ?sourceState\n{datasets}WHERE {{\n{}\n}}",
            indent(&wrapped)
        );
        self.finalize(&body)
    }

    /// Compiles a `get_subscribers` read: the properties whose Derived
    /// state depends (via `prov:wasDerivedFrom`) on any state of the given
    /// property. Reverse dependency lookup, never mutates.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn get_subscribers(&self, input: &GetSubscribersInput) -> OpmResult<String> {
        input.validate()?;
        let prop = required_predicate(&input.property_uri)?;

        let where_body = join_blocks([
            format!("{prop} opm:hasPropertyState ?stateURI .").as_str(),
            "?dependentState a opm:Derived ;\n\tprov:wasDerivedFrom ?stateURI .",
            "?dependentProperty opm:hasPropertyState ?dependentState .",
            "?foi ?property ?dependentProperty .",
        ]);
        let wrapped = wrap_in_graph_scope(&where_body, &input.graph, Role::Read)?;
        let datasets = dataset_clauses(&input.graph, false)?;

        let body = format!(
            "SELECT DISTINCT ?foi ?dependentProperty\n{datasets}WHERE {{\n{}\n}}",
            indent(&wrapped)
        );
        self.finalize(&body)
    }

    /// Normalizes the argument paths and reconciles them against the
    /// expression, returning both analyses.
    fn reconciled(&self, input: &CalcInput) -> OpmResult<(ArgumentPaths, ExpressionInfo)> {
        let args = clean_argument_paths(&input.argument_paths)?;
        let info = analyze_expression(&input.expression)?;
        reconcile_variables(&info, &args)?;
        check_generated_collisions(&info.variables)?;
        check_generated_collisions(&args.variables)?;
        Ok((args, info))
    }

    /// The FoI / path restriction block prepended to evaluation bodies.
    fn evaluation_restrictions(&self, input: &CalcInput) -> OpmResult<String> {
        let mut out = String::new();
        if let Some(foi) = clean_uri(input.foi_restriction.as_deref())? {
            out.push_str(&format!("BIND( {foi} AS ?foi )\n"));
        }
        if let Some(path) = &input.path_restriction {
            out.push_str(&clean_path(path));
            out.push('\n');
        }
        Ok(out)
    }

    /// The calculation URI for an evaluation's `prov:wasGeneratedBy` link,
    /// if the caller supplied one.
    fn generated_by(&self, input: &CalcInput) -> OpmResult<Option<String>> {
        Ok(clean_uri(input.calculation_uri.as_deref())?)
    }

    /// The calculation URI for a definition: caller-supplied, or minted
    /// under the host base.
    fn calculation_uri(&self, input: &CalcInput) -> OpmResult<String> {
        if let Some(uri) = clean_uri(input.calculation_uri.as_deref())? {
            return Ok(uri);
        }
        Ok(format!("<{}calculation_{}>", self.host(), Uuid::new_v4()))
    }
}

/// The per-argument state-hop patterns: each path's trailing variable is
/// renamed to `?propertyN`, and the current state's value is bound to the
/// original expression variable.
///
/// The value hop is an `OPTIONAL` group: a Deleted current state carries
/// no value, and such an argument must still match so the derived state
/// inherits the `Deleted` tag. The expression then evaluates over an
/// unbound variable, `?res` stays unbound, and the inserted state carries
/// no `opm:valueAtState` triple, which is exactly a Deleted state's shape.
fn argument_patterns(args: &ArgumentPaths) -> String {
    let mut out = Vec::new();
    for (i, (path, var)) in args.paths.iter().zip(&args.variables).enumerate() {
        let n = i + 1;
        let renamed = replace_variable_token(path, &format!("?{var}"), &format!("?property{n}"));
        out.push(renamed);
        out.push(format!("?property{n} opm:hasPropertyState ?state{n} ."));
        out.push(format!("?state{n} a opm:CurrentPropertyState ."));
        out.push(format!(
            "OPTIONAL {{ ?state{n} opm:valueAtState ?{var} . }}"
        ));
    }
    out.join("\n")
}

/// The state variables (`state1`, `state2`, …) feeding `wasDerivedFrom`.
fn state_variables(args: &ArgumentPaths) -> Vec<String> {
    (1..=args.variables.len()).map(|n| format!("state{n}")).collect()
}

/// Binds `?res`: a plain `BIND` of the expression, or a `GROUP BY ?foi`
/// sub-select when the expression aggregates. The sub-select repeats the
/// argument patterns so the outer clause keeps the per-state rows that
/// feed `wasDerivedFrom`.
fn result_binding(expression: &str, info: &ExpressionInfo, patterns: &str) -> String {
    let expression = expression.trim();
    match &info.aggregate {
        None => format!("BIND( ( {expression} ) AS ?res )"),
        Some(keyword) => {
            let rewritten = rewrite_aggregate(expression, keyword);
            format!(
                "{{ SELECT ?foi ( {rewritten} AS ?res ) WHERE {{\n{}\n}} GROUP BY ?foi }}",
                indent(patterns)
            )
        }
    }
}

/// Uppercases the single aggregate keyword so the sub-select projection
/// uses the SPARQL aggregate function directly. Variable tokens are copied
/// untouched, so `?summand` survives a `sum` rewrite.
fn rewrite_aggregate(expression: &str, keyword: &str) -> String {
    let mut out = String::with_capacity(expression.len());
    let mut chars = expression.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '?' || c.is_ascii_alphabetic() {
            let mut end = i + c.len_utf8();
            while let Some(&(j, n)) = chars.peek() {
                if n.is_ascii_alphanumeric() {
                    end = j + n.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let word = &expression[i..end];
            if c != '?' && word.eq_ignore_ascii_case(keyword) {
                out.push_str(&word.to_ascii_uppercase());
            } else {
                out.push_str(word);
            }
            continue;
        }
        out.push(c);
    }
    out
}

/// Cleans a required URI/predicate field, mapping an absent value to
/// `MissingField`.
fn required_predicate(value: &str) -> OpmResult<String> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: "predicate".to_string(),
        }
        .into());
    }
    let cleaned = clean_uri(Some(value))?
        .unwrap_or_else(|| unreachable!("clean_uri(Some(_)) returns Some"));
    Ok(cleaned)
}

/// The new Derived state's triples, shared by post and put forms.
fn derived_state_triples(state_vars: &[String], generated_by: Option<&str>) -> String {
    let derived_from = state_vars
        .iter()
        .map(|s| format!("?{s}"))
        .collect::<Vec<_>>()
        .join(" , ");
    let mut out = format!(
        "?stateURI a opm:CurrentPropertyState , opm:PropertyState , opm:Derived , ?reliability ;\n\topm:valueAtState ?res ;\n\tprov:generatedAtTime ?now ;\n\tprov:wasDerivedFrom {derived_from} ."
    );
    if let Some(calc) = generated_by {
        out.push_str(&format!("\n?stateURI prov:wasGeneratedBy {calc} ."));
    }
    out
}

/// Binds `?reliability` to the most restrictive class inherited from the
/// contributing argument states: Deleted beats Assumed beats plain
/// Derived.
fn reliability_binding(state_vars: &[String]) -> String {
    let exists = |class: &str| {
        state_vars
            .iter()
            .map(|s| format!("EXISTS {{ ?{s} a {class} . }}"))
            .collect::<Vec<_>>()
            .join(" || ")
    };
    format!(
        "BIND( IF( {deleted}, opm:Deleted, IF( {assumed}, opm:Assumed, opm:Derived ) ) AS ?reliability )",
        deleted = exists("opm:Deleted"),
        assumed = exists("opm:Assumed"),
    )
}
