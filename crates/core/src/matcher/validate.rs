//! Typedef validation.
//!
//! A value is checked against every level of its typedef's base chain. At
//! each level the nearest validation procedure (the level's own, or the
//! one it inherits) runs against that level's constraints. The canonical
//! results are intersected, so a derived type can only narrow what its
//! base accepts; [`Validated::Accept`] leaves the running result unchanged.

use crate::error::{CommandError, ValidationError};
use crate::registry::{Registry, Validated, ValidationCall};
use crate::store::ObjectStore;
use sdnsh_grammar_tables::{FieldNode, TypeDef};
use serde_json::Value;

/// Accepted interpretations of a value: stored value plus the full token.
pub type Interpretations = Vec<(Value, String)>;

/// Outcome of validating one value: a grammar defect in the outer
/// `Result`, a rejected value in the inner one.
pub type Outcome = Result<Result<Interpretations, ValidationError>, CommandError>;

/// What validation procedures may consult besides the value.
#[derive(Clone, Copy)]
pub struct ValidationEnv<'a> {
    /// Object store.
    pub store: &'a dyn ObjectStore,
    /// Object type in scope at the field.
    pub obj_type: Option<&'a str>,
}

/// Validate `input` for a field, honoring any inline refinement of its
/// type.
pub fn validate_field(
    registry: &Registry,
    env: ValidationEnv<'_>,
    field: &FieldNode,
    help_name: Option<&str>,
    input: &str,
) -> Outcome {
    if field.refines_type() {
        let base = registry.typedef(&field.type_name)?;
        let mut derived = TypeDef::derived(
            field.field.clone(),
            field.type_name.clone(),
            field.constraints.clone(),
            field.validation.clone(),
        );
        derived.help_name = Some(help_name.unwrap_or(base.display_name()).to_string());
        validate_type(registry, env, &derived, input)
    } else {
        validate_type(registry, env, registry.typedef(&field.type_name)?, input)
    }
}

/// Validate `input` against `typedef` and its base chain.
pub fn validate_type(
    registry: &Registry,
    env: ValidationEnv<'_>,
    typedef: &TypeDef,
    input: &str,
) -> Outcome {
    let chain = registry.typedef_chain(typedef)?;
    let mut combined: Option<Interpretations> = None;

    for (level, current) in chain.iter().enumerate() {
        let Some(proc) = chain[level..].iter().find_map(|t| t.validation.as_ref()) else {
            continue;
        };
        let validator = registry.validator(proc.name())?;
        let call = ValidationCall {
            typedef: current,
            value: input,
            params: proc.params(),
            obj_type: env.obj_type,
            store: env.store,
            registry,
        };
        let accepted = match validator.validate(&call) {
            Ok(accepted) => accepted,
            Err(e) => return Ok(Err(reword(typedef, input, e))),
        };
        let Some(found) = canonical(accepted) else {
            continue;
        };
        let narrowed = match combined.take() {
            None => found,
            Some(previous) => previous.into_iter().filter(|p| found.contains(p)).collect(),
        };
        if narrowed.is_empty() {
            let e = ValidationError::new("value does not satisfy every base type");
            return Ok(Err(reword(typedef, input, e)));
        }
        combined = Some(narrowed);
    }

    Ok(Ok(combined.unwrap_or_else(|| {
        vec![(Value::String(input.to_string()), input.to_string())]
    })))
}

fn canonical(accepted: Validated) -> Option<Interpretations> {
    match accepted {
        Validated::Accept => None,
        Validated::Value(value) => {
            let token = token_of(&value);
            Some(vec![(value, token)])
        }
        Validated::Pair(value, token) => Some(vec![(value, token)]),
        Validated::List(list) => Some(list),
    }
}

/// Text form of a stored value, as an operator would type it.
pub fn token_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Rephrase a rejection as `Invalid <type>: <value>; <reason>`, or with the
/// typedef's own error format. Expected-token lists pass through unchanged
/// so they can be merged with sibling alternatives.
fn reword(typedef: &TypeDef, input: &str, e: ValidationError) -> ValidationError {
    if !e.expected.is_empty() {
        return e;
    }
    let context = ctx!(
        "typedef" => typedef.display_name(),
        "value" => input,
        "detail" => e.message.as_str(),
    );
    let template = typedef
        .validation_error_format
        .as_deref()
        .or_else(|| {
            sdnsh_diagnostics::message_template_for(sdnsh_diagnostics::codes::INVALID_ARGUMENT, "default")
        })
        .unwrap_or("Invalid {typedef}: {value}; {detail}");
    ValidationError::new(sdnsh_diagnostics::render_template(template, &context))
}
