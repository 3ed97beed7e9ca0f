//! Build script for Larder
//!
//! Stamps the binary with a build number, the cargo profile and the build time.
//! `LARDER_BUILD_NUMBER` in the environment pins the number (release builds);
//! otherwise a local counter in `build_number.txt` is bumped.

use std::env;
use std::fs;
use std::path::Path;

const COUNTER_FILE: &str = "build_number.txt";

fn read_counter(path: &Path) -> u64 {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

fn next_build_number() -> u64 {
    if let Some(pinned) = env::var("LARDER_BUILD_NUMBER").ok().and_then(|v| v.trim().parse().ok()) {
        return pinned;
    }

    let path = Path::new(COUNTER_FILE);
    let next = read_counter(path) + 1;
    if let Err(e) = fs::write(path, next.to_string()) {
        println!("cargo:warning=could not update {}: {}", COUNTER_FILE, e);
    }
    next
}

fn main() {
    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-env-changed=LARDER_BUILD_NUMBER");

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");

    println!("cargo:rustc-env=LARDER_BUILD_NUMBER={}", next_build_number());
    println!("cargo:rustc-env=LARDER_BUILD_PROFILE={}", profile);
    println!("cargo:rustc-env=LARDER_BUILD_TIMESTAMP={}", timestamp);
}
