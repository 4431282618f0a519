//! Build script for the `sdnsh` binary.
//!
//! Embeds a default grammar so `sdnsh run` works without any `--grammar`
//! flag.
//!
//! Grammar resolution order:
//!   1. `$SDNSH_DEFAULT_GRAMMAR`: a site grammar chosen at build time
//!   2. `data/sdn.jsonc`: the demo grammar committed with the crate
//!
//! If neither exists the binary is built without a default grammar and
//! only `--grammar` files (plus the base typedefs) are loaded.

use std::path::{Path, PathBuf};

fn main() {
    println!("cargo::rustc-check-cfg=cfg(has_embedded_grammar)");
    println!("cargo:rerun-if-env-changed=SDNSH_DEFAULT_GRAMMAR");
    println!("cargo:rerun-if-changed=data/sdn.jsonc");

    let site = std::env::var_os("SDNSH_DEFAULT_GRAMMAR").map(PathBuf::from);
    if let Some(site) = &site {
        println!("cargo:rerun-if-changed={}", site.display());
    }
    let in_crate = Path::new("data/sdn.jsonc");

    let grammar_path = match site.as_deref() {
        Some(site) if site.exists() => site,
        _ if in_crate.exists() => in_crate,
        _ => return,
    };

    println!("cargo:rustc-cfg=has_embedded_grammar");

    // Copy into OUT_DIR so include_str! has a stable, absolute path.
    let out_dir = std::env::var("OUT_DIR").expect("OUT_DIR not set");
    let dest = Path::new(&out_dir).join("default_grammar.jsonc");
    std::fs::copy(grammar_path, &dest).expect("failed to copy the default grammar to OUT_DIR");
}
