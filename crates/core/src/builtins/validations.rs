//! Standard validation procedures.
//!
//! Each one checks the raw word against the constraints of the typedef it
//! is called with, and either accepts it as typed or returns the value to
//! store.

use crate::error::ValidationError;
use crate::lexer::is_prefix_of;
use crate::registry::{Validated, ValidationCall};
use sdnsh_grammar_tables::RangeSpec;
use serde_json::{Value, json};
use std::net::Ipv4Addr;

fn ranges(specs: &[RangeSpec]) -> String {
    specs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_range(specs: &[RangeSpec], n: i64) -> Result<(), ValidationError> {
    if specs.is_empty() || specs.iter().any(|r| r.contains(n)) {
        Ok(())
    } else {
        Err(ValidationError::new(format!("not in range {}", ranges(specs))))
    }
}

/// Patterns (any may match, whole word) and lengths (in characters).
pub(crate) fn validate_string(call: &ValidationCall<'_>) -> Result<Validated, ValidationError> {
    let constraints = &call.typedef.constraints;
    if !constraints.pattern.is_empty() {
        let mut matched = false;
        for pattern in &constraints.pattern {
            matched |= call
                .registry
                .full_match(pattern, call.value)
                .map_err(|e| ValidationError::new(e.to_string()))?;
        }
        if !matched {
            return Err(ValidationError::new(format!(
                "does not match {}",
                constraints.pattern.join(" or ")
            )));
        }
    }
    let length = call.value.chars().count();
    if !constraints.length.is_empty()
        && !constraints
            .length
            .iter()
            .any(|r| i64::try_from(length).is_ok_and(|n| r.contains(n)))
    {
        return Err(ValidationError::new(format!(
            "length must be {}",
            ranges(&constraints.length)
        )));
    }
    Ok(Validated::Accept)
}

/// A decimal integer within the typedef's ranges, stored as a number.
pub(crate) fn validate_integer(call: &ValidationCall<'_>) -> Result<Validated, ValidationError> {
    let n: i64 = call
        .value
        .parse()
        .map_err(|_| ValidationError::new("not an integer"))?;
    check_range(&call.typedef.constraints.range, n)?;
    Ok(Validated::Value(json!(n)))
}

/// Like `validate-integer`, also accepting `0x`-prefixed hex.
pub(crate) fn validate_hex_or_dec_integer(
    call: &ValidationCall<'_>,
) -> Result<Validated, ValidationError> {
    let value = call.value;
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    let n = parsed.map_err(|_| ValidationError::new("not a decimal or hex integer"))?;
    check_range(&call.typedef.constraints.range, n)?;
    // Keep the word as typed so a hex value is not mistaken for an
    // abbreviation of its decimal form.
    Ok(Validated::Pair(json!(n), value.to_string()))
}

/// One of the typedef's keywords. An exact match wins; otherwise every
/// keyword the word abbreviates is a separate interpretation.
pub(crate) fn validate_enum(call: &ValidationCall<'_>) -> Result<Validated, ValidationError> {
    let values = &call.typedef.constraints.values;
    if values.is_empty() {
        return Ok(Validated::Accept);
    }
    if let Some(exact) = values.iter().find(|v| v.key().eq_ignore_ascii_case(call.value)) {
        return Ok(Validated::Pair(exact.stored(), exact.key().to_string()));
    }
    let prefixed: Vec<(Value, String)> = values
        .iter()
        .filter(|v| is_prefix_of(call.value, v.key()))
        .map(|v| (v.stored(), v.key().to_string()))
        .collect();
    if prefixed.is_empty() {
        return Err(ValidationError::expecting(
            format!("Unexpected argument \"{}\"", call.value),
            values.iter().map(|v| v.key().to_string()).collect(),
        ));
    }
    Ok(Validated::List(prefixed))
}

/// Letters, digits, `-` and `_`; never one of the `reserved` words.
pub(crate) fn validate_identifier(call: &ValidationCall<'_>) -> Result<Validated, ValidationError> {
    let value = call.value;
    if value.is_empty()
        || !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::new(
            "only letters, digits, '-' and '_' are allowed",
        ));
    }
    let reserved = call
        .params
        .get("reserved")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);
    for word in reserved {
        if word.eq_ignore_ascii_case(value) {
            return Err(ValidationError::new(format!("'{word}' is a reserved word")));
        }
    }
    Ok(Validated::Accept)
}

fn hex_octets(value: &str, count: usize) -> Option<String> {
    let parts: Vec<&str> = value.split(':').collect();
    let valid = parts.len() == count
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()));
    valid.then(|| value.to_ascii_lowercase())
}

/// Six colon-separated hex octets, stored in lower case.
pub(crate) fn validate_mac_address(call: &ValidationCall<'_>) -> Result<Validated, ValidationError> {
    hex_octets(call.value, 6)
        .map(|mac| Validated::Pair(Value::String(mac), call.value.to_string()))
        .ok_or_else(|| ValidationError::new("must be six hex octets, like 00:11:22:aa:bb:cc"))
}

/// Eight colon-separated hex octets, stored in lower case.
pub(crate) fn validate_dpid(call: &ValidationCall<'_>) -> Result<Validated, ValidationError> {
    hex_octets(call.value, 8)
        .map(|dpid| Validated::Pair(Value::String(dpid), call.value.to_string()))
        .ok_or_else(|| ValidationError::new("must be eight hex octets"))
}

fn ipv4(value: &str) -> Result<Ipv4Addr, ValidationError> {
    value
        .parse()
        .map_err(|_| ValidationError::new("must be a dotted quad, like 10.0.0.1"))
}

/// A dotted-quad IPv4 address.
pub(crate) fn validate_ip_address(call: &ValidationCall<'_>) -> Result<Validated, ValidationError> {
    ipv4(call.value)?;
    Ok(Validated::Accept)
}

/// A dotted-quad netmask: ones, then zeros.
pub(crate) fn validate_netmask(call: &ValidationCall<'_>) -> Result<Validated, ValidationError> {
    let bits = u32::from(ipv4(call.value)?);
    if bits.leading_ones() + bits.trailing_zeros() != 32 {
        return Err(ValidationError::new("not a contiguous netmask"));
    }
    Ok(Validated::Accept)
}

/// A dotted-quad inverse netmask: zeros, then ones.
pub(crate) fn validate_inverse_netmask(
    call: &ValidationCall<'_>,
) -> Result<Validated, ValidationError> {
    let bits = u32::from(ipv4(call.value)?);
    if bits.leading_zeros() + bits.trailing_ones() != 32 {
        return Err(ValidationError::new("not a contiguous inverse netmask"));
    }
    Ok(Validated::Accept)
}

/// `a.b.c.d/len` with `len` at most 32.
pub(crate) fn validate_cidr_range(call: &ValidationCall<'_>) -> Result<Validated, ValidationError> {
    let Some((address, len)) = call.value.split_once('/') else {
        return Err(ValidationError::new("must be address/length, like 10.0.0.0/8"));
    };
    ipv4(address)?;
    match len.parse::<u8>() {
        Ok(len) if len <= 32 => Ok(Validated::Accept),
        _ => Err(ValidationError::new("prefix length must be 0..32")),
    }
}

/// `<n>[smhdw]`, stored as seconds.
pub(crate) fn validate_duration(call: &ValidationCall<'_>) -> Result<Validated, ValidationError> {
    let value = call.value;
    let (digits, unit) = match value.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&value[..i], c.to_ascii_lowercase()),
        _ => (value, 's'),
    };
    let scale = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86_400,
        'w' => 604_800,
        _ => return Err(ValidationError::new("unit must be one of s, m, h, d, w")),
    };
    let n: i64 = digits
        .parse()
        .map_err(|_| ValidationError::new("must be a number with an optional unit, like 30s"))?;
    let seconds = n
        .checked_mul(scale)
        .ok_or_else(|| ValidationError::new("too large"))?;
    check_range(&call.typedef.constraints.range, seconds)?;
    Ok(Validated::Pair(json!(seconds), value.to_string()))
}

/// The key of an existing object of the type in scope (or `objType` from
/// params).
pub(crate) fn validate_existing_obj(
    call: &ValidationCall<'_>,
) -> Result<Validated, ValidationError> {
    let obj_type = call
        .params
        .get("objType")
        .and_then(Value::as_str)
        .or(call.obj_type)
        .ok_or_else(|| ValidationError::new("no object type to look the key up in"))?;
    match call.store.exists(obj_type, call.value) {
        Ok(true) => Ok(Validated::Accept),
        Ok(false) => Err(ValidationError::new(format!("{obj_type} does not exist"))),
        Err(e) => Err(ValidationError::new(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Params, Registry};
    use crate::store::{MemoryStore, ObjectStore};
    use sdnsh_grammar_tables::TypeDef;

    fn typedef(json: Value) -> TypeDef {
        serde_json::from_value(json).unwrap()
    }

    fn run(
        f: fn(&ValidationCall<'_>) -> Result<Validated, ValidationError>,
        t: &TypeDef,
        params: &Params,
        store: &dyn ObjectStore,
        value: &str,
    ) -> Result<Validated, ValidationError> {
        let registry = Registry::new();
        f(&ValidationCall {
            typedef: t,
            value,
            params,
            obj_type: Some("switch"),
            store,
            registry: &registry,
        })
    }

    fn plain(
        f: fn(&ValidationCall<'_>) -> Result<Validated, ValidationError>,
        t: &TypeDef,
        value: &str,
    ) -> Result<Validated, ValidationError> {
        run(f, t, &Params::new(), &MemoryStore::new(), value)
    }

    #[test]
    fn strings_check_patterns_and_lengths() {
        let t = typedef(json!({ "name": "label", "pattern": ["^[a-z]+$", "^[0-9]+$"], "length": [[1, 4]] }));
        assert_eq!(plain(validate_string, &t, "abc").unwrap(), Validated::Accept);
        assert_eq!(plain(validate_string, &t, "123").unwrap(), Validated::Accept);
        assert!(plain(validate_string, &t, "a1").is_err());
        let e = plain(validate_string, &t, "abcde").unwrap_err();
        assert_eq!(e.message, "length must be 1..4");
        let any = typedef(json!({ "name": "string" }));
        assert_eq!(plain(validate_string, &any, "x y").unwrap(), Validated::Accept);
    }

    #[test]
    fn integers_and_ranges() {
        let t = typedef(json!({ "name": "port", "range": [[1, 10], 42, [100, "max"]] }));
        assert_eq!(plain(validate_integer, &t, "42").unwrap(), Validated::Value(json!(42)));
        assert_eq!(plain(validate_integer, &t, "+7").unwrap(), Validated::Value(json!(7)));
        let e = plain(validate_integer, &t, "50").unwrap_err();
        assert_eq!(e.message, "not in range 1..10, 42, 100..max");
        assert_eq!(plain(validate_integer, &t, "x").unwrap_err().message, "not an integer");
    }

    #[test]
    fn hex_integers_keep_the_typed_token() {
        let t = typedef(json!({ "name": "h" }));
        assert_eq!(
            plain(validate_hex_or_dec_integer, &t, "0x1f").unwrap(),
            Validated::Pair(json!(31), "0x1f".into())
        );
        assert_eq!(
            plain(validate_hex_or_dec_integer, &t, "31").unwrap(),
            Validated::Pair(json!(31), "31".into())
        );
        assert!(plain(validate_hex_or_dec_integer, &t, "0xzz").is_err());
    }

    #[test]
    fn enums_without_values_pass_through() {
        let t = typedef(json!({ "name": "enum" }));
        assert_eq!(plain(validate_enum, &t, "anything").unwrap(), Validated::Accept);
        let t = typedef(json!({ "name": "flag", "values": ["enable", "disable", "detail", "details"] }));
        assert_eq!(
            plain(validate_enum, &t, "DETAIL").unwrap(),
            Validated::Pair(json!("detail"), "detail".into())
        );
        let Validated::List(found) = plain(validate_enum, &t, "d").unwrap() else {
            panic!("expected several interpretations");
        };
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn identifiers_reject_reserved_words() {
        let t = typedef(json!({ "name": "identifier" }));
        let mut params = Params::new();
        params.insert("reserved".into(), json!(["all", "default"]));
        let store = MemoryStore::new();
        assert!(run(validate_identifier, &t, &params, &store, "vns_1-a").is_ok());
        let e = run(validate_identifier, &t, &params, &store, "Default").unwrap_err();
        assert_eq!(e.message, "'default' is a reserved word");
        assert!(run(validate_identifier, &t, &params, &store, "a b").is_err());
    }

    #[test]
    fn addresses() {
        let t = typedef(json!({ "name": "t" }));
        assert_eq!(
            plain(validate_mac_address, &t, "00:1A:2b:3c:4d:5e").unwrap(),
            Validated::Pair(json!("00:1a:2b:3c:4d:5e"), "00:1A:2b:3c:4d:5e".into())
        );
        assert!(plain(validate_mac_address, &t, "00:1a:2b:3c:4d").is_err());
        assert!(plain(validate_dpid, &t, "00:00:00:00:00:00:00:01").is_ok());
        assert!(plain(validate_ip_address, &t, "10.0.0.1").is_ok());
        assert!(plain(validate_ip_address, &t, "10.0.0.256").is_err());
        assert!(plain(validate_netmask, &t, "255.255.240.0").is_ok());
        assert!(plain(validate_netmask, &t, "255.0.255.0").is_err());
        assert!(plain(validate_inverse_netmask, &t, "0.0.15.255").is_ok());
        assert!(plain(validate_inverse_netmask, &t, "255.255.0.0").is_err());
        assert!(plain(validate_cidr_range, &t, "10.0.0.0/8").is_ok());
        assert!(plain(validate_cidr_range, &t, "10.0.0.0/33").is_err());
        assert!(plain(validate_cidr_range, &t, "10.0.0.0").is_err());
    }

    #[test]
    fn durations_are_seconds() {
        let t = typedef(json!({ "name": "duration" }));
        assert_eq!(
            plain(validate_duration, &t, "5m").unwrap(),
            Validated::Pair(json!(300), "5m".into())
        );
        assert_eq!(
            plain(validate_duration, &t, "2W").unwrap(),
            Validated::Pair(json!(1_209_600), "2W".into())
        );
        assert_eq!(
            plain(validate_duration, &t, "30").unwrap(),
            Validated::Pair(json!(30), "30".into())
        );
        assert!(plain(validate_duration, &t, "5y").is_err());
        assert!(plain(validate_duration, &t, "m").is_err());
    }

    #[test]
    fn existing_objects() {
        let t = typedef(json!({ "name": "obj-key" }));
        let store = MemoryStore::new().with_object("switch", "s1", Default::default());
        assert_eq!(
            run(validate_existing_obj, &t, &Params::new(), &store, "s1").unwrap(),
            Validated::Accept
        );
        let e = run(validate_existing_obj, &t, &Params::new(), &store, "s2").unwrap_err();
        assert_eq!(e.message, "switch does not exist");
    }
}
