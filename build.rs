fn main() {
    // Commit hash for `mlpipe version -v`; CI can pin it through GIT_SHA
    let git_sha = std::env::var("GIT_SHA").unwrap_or_else(|_| {
        std::process::Command::new("git")
            .args(["rev-parse", "--short", "HEAD"])
            .output()
            .ok()
            .filter(|output| output.status.success())
            .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    });

    println!("cargo:rustc-env=GIT_SHA={}", git_sha);

    // Build date, overridable through BUILD_DATE for reproducible builds
    let build_date = std::env::var("BUILD_DATE")
        .unwrap_or_else(|_| date_from_shell().unwrap_or_else(|| "unknown".to_string()));

    println!("cargo:rustc-env=BUILD_DATE={}", build_date);
}

fn date_from_shell() -> Option<String> {
    let output = std::process::Command::new("date")
        .arg("+%Y-%m-%d")
        .output()
        .ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}
