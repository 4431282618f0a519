//! Standard data handlers.

use super::param_str;
use crate::error::ValidationError;
use crate::registry::DataHandlerCall;
use serde_json::{Value, json};
use std::net::Ipv4Addr;

/// Split `a.b.c.d/len` into an address field (`ipField`, default the
/// field itself) and a dotted netmask field (`maskField`, default
/// `netmask`).
pub(crate) fn split_cidr(
    call: &DataHandlerCall<'_>,
    values: &mut sdnsh_grammar_tables::FieldValues,
) -> Result<(), ValidationError> {
    let text = call.value.as_str().unwrap_or_default();
    let parsed = text
        .split_once('/')
        .and_then(|(ip, len)| Some((ip.parse::<Ipv4Addr>().ok()?, len.parse::<u32>().ok()?)))
        .filter(|(_, len)| *len <= 32);
    let Some((ip, len)) = parsed else {
        return Err(ValidationError::new(format!("'{text}' is not address/length")));
    };
    let mask = Ipv4Addr::from(u32::MAX.checked_shl(32 - len).unwrap_or(0));
    let ip_field = param_str(call.params, "ipField").unwrap_or(call.field);
    let mask_field = param_str(call.params, "maskField").unwrap_or("netmask");
    values.insert(ip_field.to_string(), json!(ip.to_string()));
    values.insert(mask_field.to_string(), json!(mask.to_string()));
    Ok(())
}

/// Store `enable` as `true` and `disable` as `false`.
pub(crate) fn enable_disable_to_boolean(
    call: &DataHandlerCall<'_>,
    values: &mut sdnsh_grammar_tables::FieldValues,
) -> Result<(), ValidationError> {
    let flag = match call.value {
        Value::Bool(flag) => *flag,
        Value::String(s) if s == "enable" => true,
        Value::String(s) if s == "disable" => false,
        other => {
            return Err(ValidationError::expecting(
                format!("Unexpected argument \"{other}\""),
                vec!["disable".into(), "enable".into()],
            ));
        }
    };
    values.insert(call.field.to_string(), Value::Bool(flag));
    Ok(())
}

/// Store a `0x`-prefixed hex or decimal string as a number.
pub(crate) fn hex_to_integer(
    call: &DataHandlerCall<'_>,
    values: &mut sdnsh_grammar_tables::FieldValues,
) -> Result<(), ValidationError> {
    let n = match call.value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => i64::from_str_radix(hex, 16).ok(),
            None => s.parse().ok(),
        },
        _ => None,
    };
    let n = n.ok_or_else(|| ValidationError::new(format!("'{}' is not an integer", call.value)))?;
    values.insert(call.field.to_string(), json!(n));
    Ok(())
}

/// Store the value under the field named by the `name` param.
pub(crate) fn rename_field(
    call: &DataHandlerCall<'_>,
    values: &mut sdnsh_grammar_tables::FieldValues,
) -> Result<(), ValidationError> {
    let name = param_str(call.params, "name").unwrap_or(call.field);
    values.insert(name.to_string(), call.value.clone());
    Ok(())
}
