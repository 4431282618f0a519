//! Typed fields as seen from the command line: builtin typedefs, derived
//! typedefs, and enumerations.

mod common;

use sdnsh_core::{MemoryStore, codes};
use serde_json::json;

fn error_for(mode: &str, line: &str) -> String {
    let registry = common::registry();
    let session = common::session_in(&registry, mode, MemoryStore::new());
    session.parse(line).unwrap_err().to_string()
}

#[test]
fn derived_types_check_their_own_constraints() {
    assert_eq!(
        error_for("config", "vlan 5000"),
        "Invalid vlan: 5000; not in range 1..4095"
    );
    assert_eq!(
        error_for("config", "switch bad/name"),
        "Invalid label: bad/name; does not match ^[A-Za-z0-9_.:-]+$"
    );
}

#[test]
fn reserved_identifiers_are_refused() {
    assert_eq!(
        error_for("config", "tenant all"),
        "Invalid identifier: all; 'all' is a reserved word"
    );
    assert_eq!(
        error_for("config", "tenant a.b"),
        "Invalid identifier: a.b; only letters, digits, '-' and '_' are allowed"
    );
}

#[test]
fn addresses_are_checked() {
    assert_eq!(
        error_for("login", "connect 10.0.0"),
        "Invalid ip address: 10.0.0; must be a dotted quad, like 10.0.0.1"
    );
}

#[test]
fn enumerations_store_their_values() {
    let registry = common::registry();
    let session = common::session_in(&registry, "config-switch", MemoryStore::new());
    assert_eq!(session.parse("lldp enable").unwrap().values["lldp"], true);
    assert_eq!(session.parse("lldp DIS").unwrap().values["lldp"], false);

    let e = session.parse("lldp maybe").unwrap_err();
    assert_eq!(e.code(), codes::UNEXPECTED_TOKEN);
    assert_eq!(
        e.to_string(),
        "Unexpected argument \"maybe\"; expected one of (\"disable\", \"enable\")"
    );
}

#[test]
fn integers_are_stored_as_numbers() {
    let registry = common::registry();
    let session = common::session_in(&registry, "config", MemoryStore::new());
    assert_eq!(session.parse("vlan 4095").unwrap().values["id"], json!(4095));
    assert_eq!(
        error_for("config", "vlan ten"),
        "Invalid vlan: ten; not an integer"
    );
}
