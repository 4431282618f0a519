//! Running lines end to end: mode changes, object edits, and the submode
//! pruning that follows a deletion.

mod common;

use sdnsh_core::{CommandError, MemoryStore, codes};
use serde_json::json;

#[test]
fn walks_down_to_an_object_submode() {
    let registry = common::registry();
    let mut session = common::session_in(&registry, "login", MemoryStore::new());
    assert_eq!(session.prompt(), "sdnsh>");
    session.execute("enable").unwrap();
    assert_eq!(session.prompt(), "sdnsh#");
    session.execute("conf").unwrap();
    assert_eq!(session.prompt(), "sdnsh(config)#");
    let out = session.execute("switch s1").unwrap();
    assert!(out.output.is_none());
    assert_eq!(session.prompt(), "sdnsh(config-switch)#");
    assert!(session.store().exists("switch", "s1").unwrap());
    let entry = session.modes().current_object().unwrap();
    assert_eq!(entry.object(), Some(("switch", "s1")));
}

#[test]
fn config_commands_edit_the_submode_object() {
    let registry = common::registry();
    let mut session = common::session_in(&registry, "config", MemoryStore::new());
    common::run_all(&mut session, &["switch s1", r#"description "core uplink""#, "lldp dis"]);
    let s1 = session.store().get("switch", "s1").unwrap();
    assert_eq!(s1["description"], "core uplink");
    assert_eq!(s1["lldp"], false);

    common::run_all(&mut session, &["no description", "no lldp"]);
    let s1 = session.store().get("switch", "s1").unwrap();
    assert!(!s1.contains_key("description"));
    assert!(!s1.contains_key("lldp"));
}

#[test]
fn nested_submodes_record_their_parent() {
    let registry = common::registry();
    let mut session = common::session_in(&registry, "config", MemoryStore::new());
    common::run_all(&mut session, &["switch s1", "interface eth1", "speed auto", "shutdown"]);
    assert_eq!(session.current_mode(), "config-switch-interface");
    let eth1 = session.store().get("switch-interface", "eth1").unwrap();
    assert_eq!(eth1["switch"], "s1");
    assert_eq!(eth1["speed"], "auto");
    assert_eq!(eth1["shutdown"], true);

    common::run_all(&mut session, &["speed 1000", "no shutdown"]);
    let eth1 = session.store().get("switch-interface", "eth1").unwrap();
    assert_eq!(eth1["speed"], json!(1000));
    assert!(!eth1.contains_key("shutdown"));
}

#[test]
fn sibling_submodes_replace_each_other() {
    let registry = common::registry();
    let mut session = common::session_in(&registry, "config", MemoryStore::new());
    common::run_all(&mut session, &["switch s1", "interface eth1", "interface eth2"]);
    assert_eq!(session.modes().depth(), 5);
    let eth2 = session.store().get("switch-interface", "eth2").unwrap();
    assert_eq!(eth2["switch"], "s1");

    session.execute("switch s2").unwrap();
    assert_eq!(session.modes().depth(), 4);
    assert_eq!(
        session.modes().current().object(),
        Some(("switch", "s2"))
    );
}

#[test]
fn exit_and_end_leave_modes() {
    let registry = common::registry();
    let mut session = common::session_in(&registry, "config", MemoryStore::new());
    common::run_all(&mut session, &["switch s1", "interface eth1", "exit"]);
    assert_eq!(session.current_mode(), "config-switch");
    common::run_all(&mut session, &["interface eth1", "end"]);
    assert_eq!(session.prompt(), "sdnsh#");
}

#[test]
fn deleting_the_edited_object_leaves_its_submode() {
    let registry = common::registry();
    let mut session = common::session_in(&registry, "config", MemoryStore::new());
    common::run_all(&mut session, &["switch s1", "interface eth1"]);

    let out = session.execute("no interface eth1").unwrap();
    assert!(!session.store().exists("switch-interface", "eth1").unwrap());
    assert_eq!(session.current_mode(), "config-switch");
    assert_eq!(session.modes().current().object(), Some(("switch", "s1")));
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.warnings[0].id, codes::SUBMODE_EXITED);
}

#[test]
fn deleting_a_parent_object_keeps_surviving_submodes() {
    let registry = common::registry();
    let mut session = common::session_in(&registry, "config", MemoryStore::new());
    common::run_all(&mut session, &["switch s1", "interface eth1"]);

    let out = session.execute("no switch s1").unwrap();
    assert!(!session.store().exists("switch", "s1").unwrap());
    assert!(session.store().exists("switch-interface", "eth1").unwrap());
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.warnings[0].id, codes::SUBMODE_EXITED);
    let modes: Vec<&str> = session.modes().entries().iter().map(|e| e.mode.as_str()).collect();
    assert_eq!(modes, ["login", "enable", "config", "config-switch-interface"]);
    assert_eq!(session.modes().current().object(), Some(("switch-interface", "eth1")));
}

#[test]
fn deleting_another_object_keeps_the_mode() {
    let registry = common::registry();
    let mut session = common::session_in(&registry, "config", MemoryStore::new());
    common::run_all(&mut session, &["switch s1", "exit", "switch s2"]);
    let out = session.execute("no switch s1").unwrap();
    assert!(out.warnings.is_empty());
    assert_eq!(session.current_mode(), "config-switch");
}

#[test]
fn config_objects_are_created_and_deleted_by_key() {
    let registry = common::registry();
    let mut session = common::session_in(&registry, "config", MemoryStore::new());
    session.execute("vlan 010 name blue").unwrap();
    let vlan = session.store().get("vlan", "10").unwrap();
    assert_eq!(vlan["name"], "blue");
    assert_eq!(session.current_mode(), "config");

    session.execute("no vlan 10").unwrap();
    assert!(!session.store().exists("vlan", "10").unwrap());
}

#[test]
fn show_renders_a_table_or_detail() {
    let registry = common::registry();
    let mut session = common::session_in(&registry, "login", common::two_switches());
    let out = session.execute("show switch").unwrap().output.unwrap();
    let dashes = "-".repeat(23);
    assert_eq!(
        out,
        format!(
            "# id dpid\n-|--|{dashes}\n1 s1 00:00:00:00:00:00:00:01\n2 s2 00:00:00:00:00:00:00:02\n"
        )
    );

    let out = session.execute("show switch s2 detail").unwrap().output.unwrap();
    assert_eq!(out, "switch s2\n  id   : s2\n  dpid : 00:00:00:00:00:00:00:02\n");

    let out = session.execute("show tenant").unwrap().output.unwrap();
    assert_eq!(out, "None.\n");
}

#[test]
fn actions_see_collected_values() {
    let registry = common::registry();
    let mut session = common::session_in(&registry, "login", MemoryStore::new());
    let out = session.execute("connect 10.0.0.1").unwrap();
    assert_eq!(out.output.as_deref(), Some("connect host=10.0.0.1\n"));
}

#[test]
fn failed_lines_leave_the_session_alone() {
    let registry = common::registry();
    let mut session = common::session_in(&registry, "config", MemoryStore::new());
    session.execute("switch s1").unwrap();
    assert!(session.execute("interface").is_err());
    assert!(session.execute("speed auto").is_err());
    assert_eq!(session.current_mode(), "config-switch");
    assert_eq!(
        session.execute("").unwrap_err(),
        CommandError::NoCommand
    );
}
