//! Build script: embeds the release version for `linux-setup version`.
#![allow(clippy::print_stdout)]

use std::process::Command;

fn main() {
    // Prefer LINUX_SETUP_VERSION env var if set (e.g., by CI release workflow),
    // otherwise fall back to git describe for local development builds.
    if let Ok(version) = std::env::var("LINUX_SETUP_VERSION") {
        println!("cargo:rustc-env=LINUX_SETUP_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=LINUX_SETUP_VERSION={version}");
    }

    // Re-run if git HEAD, the embedded presets, or the env var change
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-changed=presets/");
    println!("cargo:rerun-if-env-changed=LINUX_SETUP_VERSION");
}
