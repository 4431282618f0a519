//! Argument matching through `Session::parse`: optional nodes, choices,
//! tags, defaults, and order independence.

mod common;

use sdnsh_core::{CommandError, MemoryStore, codes};
use serde_json::json;

#[test]
fn optional_arguments_may_all_be_left_out() {
    let registry = common::registry();
    let session = common::session_in(&registry, "login", MemoryStore::new());
    let parsed = session.parse("show switch").unwrap();
    assert_eq!(parsed.command.title(), "show");
    assert_eq!(parsed.values["obj"], "switch");
    assert!(!parsed.values.contains_key("id"));
    assert!(!parsed.values.contains_key("detail"));
    assert!(!parsed.is_no_command);
}

#[test]
fn optional_arguments_fill_in_when_typed() {
    let registry = common::registry();
    let session = common::session_in(&registry, "login", MemoryStore::new());
    let parsed = session.parse("sh sw s1 det").unwrap();
    assert_eq!(parsed.values["id"], "s1");
    assert_eq!(parsed.values["detail"], "detail");
}

#[test]
fn choice_alternatives_are_tried_in_turn() {
    let registry = common::registry();
    let session = common::session_in(&registry, "config-switch-interface", MemoryStore::new());
    assert_eq!(session.parse("speed auto").unwrap().values["speed"], "auto");
    assert_eq!(session.parse("speed 1000").unwrap().values["speed"], json!(1000));
    assert_eq!(session.parse("speed a").unwrap().values["speed"], "auto");
}

#[test]
fn no_form_skips_arguments_optional_for_no() {
    let registry = common::registry();
    let session = common::session_in(&registry, "config-switch-interface", MemoryStore::new());
    let parsed = session.parse("no speed").unwrap();
    assert!(parsed.is_no_command);
    assert_eq!(parsed.actions.len(), 1);
    assert_eq!(parsed.actions[0].proc.name(), "reset-fields");
    // Outside the no form the argument is required.
    let e = session.parse("speed").unwrap_err();
    assert_eq!(e.code(), codes::UNEXPECTED_END);
}

#[test]
fn command_data_and_tags_are_collected() {
    let registry = common::registry();
    let session = common::session_in(&registry, "config", MemoryStore::new());
    let parsed = session.parse("vlan 10 na blue").unwrap();
    assert_eq!(parsed.values["id"], json!(10));
    assert_eq!(parsed.values["name"], "blue");

    let session = common::session_in(&registry, "config-switch-interface", MemoryStore::new());
    assert_eq!(session.parse("shutdown").unwrap().values["shutdown"], true);
}

#[test]
fn mode_gates_what_can_be_matched() {
    let registry = common::registry();
    let session = common::session_in(&registry, "login", MemoryStore::new());
    assert_eq!(
        session.parse("configure").unwrap_err(),
        CommandError::UnknownCommand {
            word: "configure".into()
        }
    );
    let session = common::session_in(&registry, "config", MemoryStore::new());
    // login commands stay usable in every mode
    assert!(session.parse("show tenant").is_ok());
    assert!(session.parse("speed auto").is_err());
}

#[test]
fn registration_order_does_not_change_the_result() {
    for reversed in [false, true] {
        let registry = common::registry_from(common::SHELL_GRAMMAR, reversed);
        let session = common::session_in(&registry, "enable", MemoryStore::new());
        let e = session.parse("con").unwrap_err();
        assert_eq!(
            e.to_string(),
            "Ambiguous command word \"con\"; matches [\"configure\", \"connect\"]"
        );
        let parsed = session.parse("sh sw").unwrap();
        assert_eq!(parsed.values["obj"], "switch");
        assert_eq!(session.parse("conf").unwrap().command.title(), "configure");
    }
}

#[test]
fn no_form_fills_missing_values_from_its_own_default() {
    let mut registry = common::registry();
    registry
        .load_jsonc(
            r#"{ "commands": [
                { "name": "mtu", "modes": ["config*"], "commandType": "config",
                  "args": [{ "kind": "field", "field": "mtu", "type": "integer",
                             "default": "9000", "defaultForNo": "1500" }] },
                { "name": "holdtime", "modes": ["config*"], "commandType": "config",
                  "args": [{ "kind": "field", "field": "holdtime", "type": "integer", "default": "30" }] }
            ] }"#,
        )
        .unwrap();
    let session = common::session_in(&registry, "config", MemoryStore::new());

    assert_eq!(session.parse("mtu").unwrap().values["mtu"], json!(9000));
    let parsed = session.parse("no mtu").unwrap();
    assert!(parsed.is_no_command);
    assert_eq!(parsed.values["mtu"], json!(1500));
    assert_eq!(session.parse("no mtu 2000").unwrap().values["mtu"], json!(2000));

    assert_eq!(session.parse("no holdtime").unwrap().values["holdtime"], json!(30));
}
