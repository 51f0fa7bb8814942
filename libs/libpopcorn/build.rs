//! Build script for libpopcorn
//!
//! When the `popcorn` feature is enabled, links the Popcorn runtime that
//! provides `migrate()`. The runtime ships as static archives under the
//! Popcorn install prefix, one directory per architecture.

use std::env;
use std::path::PathBuf;

const DEFAULT_PREFIX: &str = "/usr/local/popcorn";
const DEFAULT_LIBS: &str = "migrate,stack-transform,elf";

fn main() {
    println!("cargo:rerun-if-env-changed=POPCORN_LIB_DIR");
    println!("cargo:rerun-if-env-changed=POPCORN_LIBS");

    // Only link the runtime if the kernel backend is requested
    if env::var_os("CARGO_FEATURE_POPCORN").is_none() {
        return;
    }

    let lib_dir = match env::var("POPCORN_LIB_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => default_lib_dir(),
    };

    if !lib_dir.exists() {
        println!(
            "cargo:warning=Popcorn runtime not found at {}, linking may fail",
            lib_dir.display()
        );
    }

    println!("cargo:rustc-link-search=native={}", lib_dir.display());

    let libs = env::var("POPCORN_LIBS").unwrap_or_else(|_| DEFAULT_LIBS.to_string());
    for lib in libs.split(',').map(str::trim).filter(|l| !l.is_empty()) {
        // libelf comes from the system, the rest from the Popcorn prefix
        if lib == "elf" {
            println!("cargo:rustc-link-lib=dylib={}", lib);
        } else {
            println!("cargo:rustc-link-lib=static={}", lib);
        }
    }
}

/// `/usr/local/popcorn/<arch>/lib` for the target being built
fn default_lib_dir() -> PathBuf {
    let arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_else(|_| "x86_64".to_string());
    let mut dir = PathBuf::from(DEFAULT_PREFIX);
    dir.push(arch);
    dir.push("lib");
    dir
}
