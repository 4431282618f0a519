//! Build script generating the diagnostic code tables.
//!
//! Reads `spec/diagnostics.jsonc` and writes into `OUT_DIR`:
//! - `generated_codes.rs`: one `pub const NAME: &str = "SDNxxxx";` per entry,
//!   plus `ALL`, the ordered list of every code
//! - `generated_explain.rs`: id → long description
//! - `generated_severity.rs`: id → default severity
//! - `generated_templates.rs`: (id, variant) → message template

use std::collections::HashSet;
use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use sdnsh_jsonc_strip::strip_jsonc;

const HEADER: &str = "// Generated from spec/diagnostics.jsonc by build.rs. Do not edit.\n\n";

fn main() {
    let spec_path = Path::new("spec/diagnostics.jsonc");
    println!("cargo:rerun-if-changed={}", spec_path.display());

    let raw = fs::read_to_string(spec_path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", spec_path.display()));
    let table: serde_json::Value = serde_json::from_str(&strip_jsonc(&raw))
        .unwrap_or_else(|e| panic!("{}: {e}", spec_path.display()));
    let entries = table["diagnostics"]
        .as_array()
        .expect("diagnostics.jsonc: expected `diagnostics` array");

    let entries: Vec<Entry<'_>> = entries
        .iter()
        .enumerate()
        .map(|(i, value)| Entry::read(i, value))
        .collect();
    check_unique(&entries);

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let out = Path::new(&out_dir);

    write(out, "generated_codes.rs", &codes_source(&entries));
    write(out, "generated_explain.rs", &explain_source(&entries));
    write(out, "generated_severity.rs", &severity_source(&entries));
    write(out, "generated_templates.rs", &templates_source(&entries));
}

struct Entry<'a> {
    id: &'a str,
    const_name: &'a str,
    summary: &'a str,
    description: &'a str,
    severity: &'static str,
    templates: Vec<(&'a str, &'a str)>,
}

impl<'a> Entry<'a> {
    fn read(i: usize, value: &'a serde_json::Value) -> Self {
        let field = move |key: &str| {
            value[key]
                .as_str()
                .unwrap_or_else(|| panic!("diagnostics[{i}] missing string `{key}`"))
        };
        let id = field("id");
        let const_name = field("constName");
        assert!(
            id.starts_with("SDN") && id.len() == 7 && id[3..].bytes().all(|b| b.is_ascii_digit()),
            "diagnostics[{i}]: id '{id}' must look like SDN1234"
        );
        assert!(
            !const_name.is_empty()
                && const_name.as_bytes()[0].is_ascii_uppercase()
                && const_name
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_'),
            "diagnostics[{i}] ({id}): constName '{const_name}' is not SCREAMING_SNAKE_CASE"
        );
        let severity = match field("severity") {
            "error" => "Severity::Error",
            "warn" => "Severity::Warn",
            "info" => "Severity::Info",
            other => panic!("diagnostics[{i}] ({id}): invalid severity '{other}'"),
        };

        let context_keys: HashSet<&str> = value["contextKeys"]
            .as_array()
            .unwrap_or_else(|| panic!("diagnostics[{i}] ({id}) missing `contextKeys`"))
            .iter()
            .map(|k| {
                k.as_str()
                    .unwrap_or_else(|| panic!("diagnostics[{i}] ({id}) contextKeys must be strings"))
            })
            .collect();

        let mut templates = Vec::new();
        if let Some(map) = value["messageTemplates"].as_object() {
            for (variant, template) in map {
                let template = template.as_str().unwrap_or_else(|| {
                    panic!("diagnostics[{i}] ({id}) messageTemplates.{variant} must be a string")
                });
                for placeholder in placeholders(template) {
                    assert!(
                        context_keys.contains(placeholder),
                        "diagnostics[{i}] ({id}) template '{variant}' uses '{{{placeholder}}}' which is not a context key"
                    );
                }
                templates.push((variant.as_str(), template));
            }
        }

        Self {
            id,
            const_name,
            summary: field("summary"),
            description: field("description"),
            severity,
            templates,
        }
    }
}

fn check_unique(entries: &[Entry<'_>]) {
    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for e in entries {
        assert!(ids.insert(e.id), "duplicate diagnostic id '{}'", e.id);
        assert!(
            names.insert(e.const_name),
            "duplicate diagnostic constName '{}'",
            e.const_name
        );
    }
}

fn codes_source(entries: &[Entry<'_>]) -> String {
    let mut src = String::from(HEADER);
    for e in entries {
        let _ = writeln!(src, "/// {}", e.summary);
        let _ = writeln!(src, "pub const {}: &str = \"{}\";\n", e.const_name, e.id);
    }
    src.push_str("/// Every diagnostic code, in catalogue order.\n");
    src.push_str("pub const ALL: &[&str] = &[\n");
    for e in entries {
        let _ = writeln!(src, "    {},", e.const_name);
    }
    src.push_str("];\n");
    src
}

fn explain_source(entries: &[Entry<'_>]) -> String {
    let mut src = String::from("match id {\n");
    for e in entries {
        let _ = writeln!(src, "    \"{}\" => Some(\"{}\"),", e.id, escape(e.description));
    }
    src.push_str("    _ => None,\n}\n");
    src
}

fn severity_source(entries: &[Entry<'_>]) -> String {
    let mut src = String::from("match id {\n");
    for e in entries {
        let _ = writeln!(src, "    \"{}\" => Some({}),", e.id, e.severity);
    }
    src.push_str("    _ => None,\n}\n");
    src
}

fn templates_source(entries: &[Entry<'_>]) -> String {
    let mut src = String::from("match (id, variant) {\n");
    for e in entries {
        for (variant, template) in &e.templates {
            let _ = writeln!(
                src,
                "    (\"{}\", \"{variant}\") => Some(\"{}\"),",
                e.id,
                escape(template)
            );
        }
    }
    src.push_str("    _ => None,\n}\n");
    src
}

fn write(out: &Path, name: &str, contents: &str) {
    fs::write(out.join(name), contents).unwrap_or_else(|e| panic!("failed to write {name}: {e}"));
}

fn escape(value: &str) -> String {
    value.chars().flat_map(char::escape_default).collect()
}

fn placeholders(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else { break };
        let key = after[..close].trim();
        if !key.is_empty() {
            found.push(key);
        }
        rest = &after[close + 1..];
    }
    found
}
