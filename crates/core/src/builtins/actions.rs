//! Standard actions: mode changes and object store edits.

use super::{key_field, param_str, param_strings};
use crate::error::CommandError;
use crate::matcher::validate::token_of;
use crate::mode::{CONFIG, ENABLE, ModeEntry};
use crate::registry::{ActionCall, ActionContext, ActionOutput};
use sdnsh_diagnostics::codes;
use sdnsh_grammar_tables::FieldValues;
use serde_json::Value;

type ActionResult = Result<ActionOutput, CommandError>;

// ── Modes ───────────────────────────────────────────────────────────────────

/// Enter `mode`, or return to it if it is already on the stack.
fn enter_top_level(call: &ActionCall<'_>, ctx: &mut ActionContext<'_>, mode: &str) -> ActionResult {
    if ctx.modes.entries().iter().any(|e| e.mode == mode) {
        while ctx.modes.current_mode() != mode {
            if ctx.pop_mode(call)?.is_none() {
                break;
            }
        }
    } else {
        ctx.modes.push(ModeEntry::new(mode));
    }
    Ok(ActionOutput::Nothing)
}

pub(crate) fn enable_mode(call: &ActionCall<'_>, ctx: &mut ActionContext<'_>) -> ActionResult {
    enter_top_level(call, ctx, ENABLE)
}

pub(crate) fn config_mode(call: &ActionCall<'_>, ctx: &mut ActionContext<'_>) -> ActionResult {
    enter_top_level(call, ctx, CONFIG)
}

/// Enter a config submode bound to an object, creating the object when it
/// does not exist yet (unless `create` is false).
///
/// Params: `mode` (default `config-<objType>`), `key` (the field holding
/// the object key, default `id`), `create`, and `parentField` (a field set
/// to the key of the object the current mode edits).
pub(crate) fn push_mode_stack(call: &ActionCall<'_>, ctx: &mut ActionContext<'_>) -> ActionResult {
    let mode = match (param_str(call.params, "mode"), call.obj_type) {
        (Some(mode), _) => mode.to_string(),
        (None, Some(obj_type)) => format!("{CONFIG}-{obj_type}"),
        (None, None) => {
            return Err(CommandError::description(
                codes::INVALID_USE,
                "push-mode-stack needs a mode or an object type",
            ));
        }
    };

    while ctx.modes.is_sibling_of_current(&mode) {
        if ctx.pop_mode(call)?.is_none() {
            break;
        }
    }

    // The parent is whatever object the mode we nest in edits, which is
    // only known once siblings are gone.
    let mut fields = call.values.clone();
    if let Some(parent_field) = param_str(call.params, "parentField") {
        let parent = ctx
            .modes
            .current_object()
            .and_then(|entry| entry.obj_id.clone())
            .ok_or_else(|| {
                CommandError::description(
                    codes::INVALID_USE,
                    format!("parentField '{parent_field}' used outside an object submode"),
                )
            })?;
        fields.insert(parent_field.to_string(), Value::String(parent));
    }

    let entry = match call.obj_type {
        Some(obj_type) => {
            let key_name = key_field(call.params);
            let key = fields
                .get(key_name)
                .map(token_of)
                .ok_or_else(|| missing_key(key_name))?;
            if !ctx.store.exists(obj_type, &key)? {
                let create = call
                    .params
                    .get("create")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                if !create {
                    return Err(CommandError::Semantic(format!(
                        "Object not found; type = {obj_type}"
                    )));
                }
                log::debug!("creating {obj_type} {key}");
                ctx.store.create(obj_type, &key, fields)?;
            }
            ModeEntry::for_object(mode, obj_type, key)
        }
        None => ModeEntry::new(mode),
    };
    ctx.modes.push(entry.with_on_exit(call.on_exit.cloned()));
    Ok(ActionOutput::Nothing)
}

pub(crate) fn pop_mode_stack(call: &ActionCall<'_>, ctx: &mut ActionContext<'_>) -> ActionResult {
    ctx.pop_mode(call)?;
    Ok(ActionOutput::Nothing)
}

/// Leave config mode and every submode.
pub(crate) fn end_mode(call: &ActionCall<'_>, ctx: &mut ActionContext<'_>) -> ActionResult {
    while ctx.modes.current_mode().starts_with(CONFIG) {
        if ctx.pop_mode(call)?.is_none() {
            break;
        }
    }
    Ok(ActionOutput::Nothing)
}

// ── Object edits ────────────────────────────────────────────────────────────

fn missing_key(key_name: &str) -> CommandError {
    CommandError::description(
        codes::INVALID_USE,
        format!("no '{key_name}' value identifies the object"),
    )
}

fn require_obj_type<'a>(call: &ActionCall<'a>) -> Result<&'a str, CommandError> {
    call.obj_type.ok_or_else(|| {
        CommandError::description(codes::INVALID_USE, "no object type in scope (missing objType)")
    })
}

/// The object a field edit applies to: the one the current submode edits,
/// unless the command names an object of another type by key.
fn target(call: &ActionCall<'_>) -> Result<(String, String), CommandError> {
    if let Some(entry) = call.mode_object
        && let Some((obj_type, key)) = entry.object()
        && call.obj_type.is_none_or(|t| t == obj_type)
    {
        return Ok((obj_type.to_string(), key.to_string()));
    }
    let obj_type = require_obj_type(call)?;
    let key_name = key_field(call.params);
    let key = call
        .values
        .get(key_name)
        .map(token_of)
        .ok_or_else(|| missing_key(key_name))?;
    Ok((obj_type.to_string(), key))
}

/// Field names an edit touches: `fields` from params, or every collected
/// value except the key.
fn edited_fields(call: &ActionCall<'_>) -> Vec<String> {
    let listed = param_strings(call.params, "fields");
    if !listed.is_empty() {
        return listed;
    }
    let key_name = key_field(call.params);
    call.values
        .keys()
        .filter(|name| name.as_str() != key_name)
        .cloned()
        .collect()
}

/// Update fields of the target object with the collected values.
pub(crate) fn write_fields(call: &ActionCall<'_>, ctx: &mut ActionContext<'_>) -> ActionResult {
    let (obj_type, key) = target(call)?;
    let fields: FieldValues = edited_fields(call)
        .into_iter()
        .filter_map(|name| call.values.get(&name).map(|v| (name, v.clone())))
        .collect();
    if fields.is_empty() {
        return Err(CommandError::description(
            codes::INVALID_USE,
            format!("no fields to write for {obj_type}"),
        ));
    }
    log::debug!("write-fields {obj_type} {key}: {fields:?}");
    ctx.store.update(&obj_type, &key, fields)?;
    Ok(ActionOutput::Nothing)
}

/// Remove fields from the target object, restoring their defaults.
pub(crate) fn reset_fields(call: &ActionCall<'_>, ctx: &mut ActionContext<'_>) -> ActionResult {
    let (obj_type, key) = target(call)?;
    let names = edited_fields(call);
    if names.is_empty() {
        return Err(CommandError::description(
            codes::INVALID_USE,
            format!("no fields to reset for {obj_type}"),
        ));
    }
    if let Some(verify) = param_str(call.params, "matchForNo")
        && let Some(given) = call.values.get(verify)
    {
        let current = ctx.store.get(&obj_type, &key)?;
        if current.get(verify) != Some(given) {
            return Err(CommandError::Semantic(format!(
                "{obj_type}: {verify} is not set to '{}'",
                token_of(given)
            )));
        }
    }
    let fields: FieldValues = names.into_iter().map(|name| (name, Value::Null)).collect();
    log::debug!("reset-fields {obj_type} {key}: {:?}", fields.keys());
    ctx.store.update(&obj_type, &key, fields)?;
    Ok(ActionOutput::Nothing)
}

/// Create (or update) the object keyed by the key field.
pub(crate) fn write_object(call: &ActionCall<'_>, ctx: &mut ActionContext<'_>) -> ActionResult {
    let obj_type = require_obj_type(call)?;
    let key_name = key_field(call.params);
    let key = call
        .values
        .get(key_name)
        .map(token_of)
        .ok_or_else(|| missing_key(key_name))?;
    let mut fields = call.values.clone();
    if let Some(parent_field) = param_str(call.params, "parentField")
        && let Some(parent) = call.mode_object.and_then(|e| e.obj_id.clone())
    {
        fields.insert(parent_field.to_string(), Value::String(parent));
    }
    if ctx.store.exists(obj_type, &key)? {
        ctx.store.update(obj_type, &key, fields)?;
    } else {
        ctx.store.create(obj_type, &key, fields)?;
    }
    Ok(ActionOutput::Nothing)
}

/// Delete the object keyed by the key field, or every object whose fields
/// equal the collected values.
pub(crate) fn delete_objects(call: &ActionCall<'_>, ctx: &mut ActionContext<'_>) -> ActionResult {
    let obj_type = require_obj_type(call)?;
    let key_name = key_field(call.params);
    if let Some(key) = call.values.get(key_name) {
        ctx.store.delete(obj_type, &token_of(key))?;
        return Ok(ActionOutput::Nothing);
    }
    let matches = ctx.store.query(obj_type, call.values)?;
    log::debug!("delete-objects {obj_type}: {} match(es)", matches.len());
    for (key, _) in matches {
        ctx.store.delete(obj_type, &key)?;
    }
    Ok(ActionOutput::Nothing)
}

// ── Display ─────────────────────────────────────────────────────────────────

fn display_obj_type<'a>(call: &ActionCall<'a>) -> Result<&'a str, CommandError> {
    match (call.values.get("obj").and_then(Value::as_str), call.obj_type) {
        (Some(obj_type), _) | (None, Some(obj_type)) => Ok(obj_type),
        (None, None) => require_obj_type(call),
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(value) => token_of(value),
    }
}

fn wants_detail(values: &FieldValues) -> bool {
    match values.get("detail") {
        Some(Value::Bool(detail)) => *detail,
        Some(Value::String(s)) => s.starts_with("detail"),
        _ => false,
    }
}

/// List objects of a type as a table, or field by field with `detail`.
///
/// The key field (when collected) selects one object, and any field named
/// in the `filter` param narrows the listing. `fields` picks the columns;
/// by default every field any listed object has is shown.
pub(crate) fn display_table(call: &ActionCall<'_>, ctx: &mut ActionContext<'_>) -> ActionResult {
    let obj_type = display_obj_type(call)?;
    let key_name = key_field(call.params);

    let filter: FieldValues = param_strings(call.params, "filter")
        .into_iter()
        .filter_map(|name| call.values.get(&name).map(|v| (name, v.clone())))
        .collect();
    let mut rows = ctx.store.query(obj_type, &filter)?;
    if let Some(key) = call.values.get(key_name) {
        let key = token_of(key);
        rows.retain(|(k, _)| *k == key);
    }
    if rows.is_empty() {
        return Ok(ActionOutput::lines(["None.".to_string()]));
    }

    let mut columns = param_strings(call.params, "fields");
    if columns.is_empty() {
        let mut seen = std::collections::BTreeSet::new();
        for (_, fields) in &rows {
            seen.extend(fields.keys().filter(|k| k.as_str() != key_name).cloned());
        }
        columns = seen.into_iter().collect();
    }

    if wants_detail(call.values) {
        return Ok(ActionOutput::lines(detail_lines(obj_type, key_name, &rows, &columns)));
    }

    let mut table: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
    let mut header = vec!["#".to_string(), key_name.to_string()];
    header.extend(columns.iter().cloned());
    table.push(header);
    for (i, (key, fields)) in rows.iter().enumerate() {
        let mut row = vec![(i + 1).to_string(), key.clone()];
        row.extend(columns.iter().map(|c| cell(fields.get(c))));
        table.push(row);
    }
    Ok(ActionOutput::lines(render_table(table)))
}

/// Rows are formatted as the output is consumed; only the column widths
/// are computed up front.
fn render_table(table: Vec<Vec<String>>) -> impl Iterator<Item = String> {
    let widths: Vec<usize> = (0..table[0].len())
        .map(|c| table.iter().map(|row| row[c].chars().count()).max().unwrap_or(0))
        .collect();
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("|");
    let mut rows = table.into_iter();
    let header = rows.next().map(|row| table_line(&row, &widths));
    header
        .into_iter()
        .chain(std::iter::once(rule))
        .chain(rows.map(move |row| table_line(&row, &widths)))
}

fn table_line(row: &[String], widths: &[usize]) -> String {
    row.iter()
        .zip(widths)
        .map(|(text, &width)| format!("{text:<width$}"))
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end()
        .to_string()
}

fn detail_lines(
    obj_type: &str,
    key_name: &str,
    rows: &[(String, FieldValues)],
    columns: &[String],
) -> Vec<String> {
    let width = columns
        .iter()
        .map(String::len)
        .chain([key_name.len()])
        .max()
        .unwrap_or(0);
    let mut out = Vec::new();
    for (i, (key, fields)) in rows.iter().enumerate() {
        if i > 0 {
            out.push(String::new());
        }
        out.push(format!("{obj_type} {key}"));
        out.push(format!("  {key_name:<width$} : {key}"));
        for column in columns {
            let value = cell(fields.get(column));
            out.push(format!("  {column:<width$} : {value}").trim_end().to_string());
        }
    }
    out
}

/// Show one object field by field: the one named by the key field, or the
/// one the current submode edits.
pub(crate) fn display_object(call: &ActionCall<'_>, ctx: &mut ActionContext<'_>) -> ActionResult {
    let (obj_type, key) = match call.values.get(key_field(call.params)) {
        Some(key) => (display_obj_type(call)?.to_string(), token_of(key)),
        None => target(call)?,
    };
    let fields = ctx.store.get(&obj_type, &key)?;
    let key_name = key_field(call.params);
    let columns: Vec<String> = fields
        .keys()
        .filter(|k| k.as_str() != key_name)
        .cloned()
        .collect();
    Ok(ActionOutput::lines(detail_lines(
        &obj_type,
        key_name,
        &[(key, fields)],
        &columns,
    )))
}
