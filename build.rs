// build.rs - Build metadata for QUARRY
//
// Exposes build provenance to src/lib.rs (`build_info`) through rustc-env
// variables. Nothing here is required for compilation; every variable is read
// with `option_env!` on the library side.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-changed=build.rs");

    set_build_env_vars();
}

/// Set build environment variables that the library reports
fn set_build_env_vars() {
    println!(
        "cargo:rustc-env=QUARRY_BUILD_TIMESTAMP={}",
        chrono::Utc::now().to_rfc3339()
    );

    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let rustc_version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=QUARRY_RUST_VERSION={}", rustc_version);

    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=QUARRY_TARGET={}", target);

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=QUARRY_PROFILE={}", profile);

    // Only set when we are inside a git checkout
    if let Ok(output) = Command::new("git").args(["rev-parse", "HEAD"]).output() {
        if output.status.success() {
            if let Ok(git_hash) = String::from_utf8(output.stdout) {
                println!("cargo:rustc-env=QUARRY_GIT_HASH={}", git_hash.trim());
            }
        }
    }
}
