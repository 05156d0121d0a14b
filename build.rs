use std::process::Command;

/// Short hash of HEAD when this is not a tagged checkout
fn dev_commit() -> Option<String> {
    let tagged = Command::new("git")
        .args(["describe", "--exact-match", "--tags", "HEAD"])
        .output()
        .is_ok_and(|output| output.status.success());
    if tagged {
        return None;
    }
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())?;
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string())
}

fn main() {
    let version = env!("CARGO_PKG_VERSION");
    match dev_commit() {
        Some(hash) => println!("cargo:rustc-env=DITTO_VERSION={version}+{hash}"),
        None => println!("cargo:rustc-env=DITTO_VERSION={version}"),
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
}
