use std::process::Command;

fn main() {
    let commit = run("git", &["rev-parse", "--short", "HEAD"]);
    let build_date = run("date", &["-u", "+%Y-%m-%d"]);
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=HTMLTRIM_GIT_COMMIT={commit}");
    println!("cargo:rustc-env=HTMLTRIM_BUILD_DATE={build_date}");
    println!("cargo:rustc-env=HTMLTRIM_BUILD_TARGET={target}");

    println!("cargo:rerun-if-changed=.git/HEAD");
}

/// 执行外部命令并取 stdout，失败时返回 "unknown"
fn run(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
