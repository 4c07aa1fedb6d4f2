// Build script for the flutter_rust_bridge glue
//
// Dart bindings and src/frb_generated.rs come from the codegen CLI, driven by
// flutter_rust_bridge.yaml:
//   cargo install flutter_rust_bridge_codegen --version 2.11.1
//   flutter_rust_bridge_codegen generate
//
// The glue is only compiled with the `bridge` feature, so plain cargo builds
// and tests work without running codegen first.

use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=src/api.rs");
    println!("cargo:rerun-if-changed=src/api");
    println!("cargo:rerun-if-changed=src/frb_generated.rs");

    if std::env::var_os("CARGO_FEATURE_BRIDGE").is_some()
        && !Path::new("src/frb_generated.rs").exists()
    {
        println!(
            "cargo:warning=feature `bridge` needs src/frb_generated.rs; run `flutter_rust_bridge_codegen generate` first"
        );
    }
}
