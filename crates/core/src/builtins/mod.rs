//! Built-in procedures and the base grammar.
//!
//! [`install`] registers every standard validation, action, completion and
//! data-handler procedure, then loads the embedded base grammar holding
//! the standard typedefs and command types.

mod actions;
mod completions;
mod handlers;
mod validations;

use crate::registry::{GrammarLoadError, Params, Procedure, Registry};
use serde_json::Value;

/// Standard typedefs and command types.
pub const BASE_GRAMMAR: &str = include_str!("base.jsonc");

/// Register the standard procedures and load [`BASE_GRAMMAR`].
pub fn install(registry: &mut Registry) -> Result<(), GrammarLoadError> {
    use Procedure as P;

    registry.register("validate-string", P::validation(validations::validate_string));
    registry.register("validate-integer", P::validation(validations::validate_integer));
    registry.register(
        "validate-hex-or-dec-integer",
        P::validation(validations::validate_hex_or_dec_integer),
    );
    registry.register("validate-enum", P::validation(validations::validate_enum));
    registry.register("validate-identifier", P::validation(validations::validate_identifier));
    registry.register("validate-mac-address", P::validation(validations::validate_mac_address));
    registry.register("validate-ip-address", P::validation(validations::validate_ip_address));
    registry.register("validate-netmask", P::validation(validations::validate_netmask));
    registry.register(
        "validate-inverse-netmask",
        P::validation(validations::validate_inverse_netmask),
    );
    registry.register("validate-cidr-range", P::validation(validations::validate_cidr_range));
    registry.register("validate-dpid", P::validation(validations::validate_dpid));
    registry.register("validate-duration", P::validation(validations::validate_duration));
    registry.register("validate-existing-obj", P::validation(validations::validate_existing_obj));

    registry.register("enable-mode", P::action(actions::enable_mode));
    registry.register("config-mode", P::action(actions::config_mode));
    registry.register("push-mode-stack", P::action(actions::push_mode_stack));
    registry.register("pop-mode-stack", P::action(actions::pop_mode_stack));
    registry.register("end-mode", P::action(actions::end_mode));
    registry.register("write-fields", P::action(actions::write_fields));
    registry.register("reset-fields", P::action(actions::reset_fields));
    registry.register("write-object", P::action(actions::write_object));
    registry.register("delete-objects", P::action(actions::delete_objects));
    registry.register("display-table", P::action(actions::display_table));
    registry.register("display-object", P::action(actions::display_object));

    registry.register("complete-object-key", P::completion(completions::complete_object_key));

    registry.register("split-cidr", P::data_handler(handlers::split_cidr));
    registry.register(
        "enable-disable-to-boolean",
        P::data_handler(handlers::enable_disable_to_boolean),
    );
    registry.register("hex-to-integer", P::data_handler(handlers::hex_to_integer));
    registry.register("rename-field", P::data_handler(handlers::rename_field));

    registry.load_jsonc(BASE_GRAMMAR)
}

// ── Parameter helpers ───────────────────────────────────────────────────────

fn param_str<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
    params.get(name).and_then(Value::as_str)
}

/// A string-list param; a single string counts as a list of one.
fn param_strings(params: &Params, name: &str) -> Vec<String> {
    match params.get(name) {
        Some(Value::String(one)) => vec![one.clone()],
        Some(Value::Array(many)) => many
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

/// Field holding the object key: the `key` param, default `id`.
fn key_field(params: &Params) -> &str {
    param_str(params, "key").unwrap_or("id")
}
