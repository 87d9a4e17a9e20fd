//! Build script: embeds the `QUACK_VERSION` used by the CLI.

use std::process::Command;

fn main() {
    // QUACK_VERSION from the environment wins (release builds); otherwise use
    // git describe for local development builds.
    if let Ok(version) = std::env::var("QUACK_VERSION") {
        println!("cargo:rustc-env=QUACK_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=QUACK_VERSION={version}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=QUACK_VERSION");
}
