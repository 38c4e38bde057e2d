/*
[INPUT]:  finlink binary, demo listener config, fixed environment
[OUTPUT]: Exit status and output checks for each subcommand
[POS]:    Integration test layer - binary entry point
[UPDATE]: When CLI flags or exit behavior change
*/

use std::io::Write;
use std::process::Command;

fn finlink() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_finlink"));
    command
        .env_remove("ACCESS_KEY")
        .env_remove("SECRET_KEY")
        .env_remove("BASE_URL")
        .env_remove("SANDBOX")
        .env_remove("FINLINK_PROFILE")
        .env("FINLINK_CREDENTIALS_FILE", "/nonexistent/finlink/credentials")
        .env("RUST_LOG", "error");
    command
}

#[test]
fn listen_dry_run_validates_config() {
    let config_path = format!("{}/demos/listener.yaml", env!("CARGO_MANIFEST_DIR"));

    let output = finlink()
        .args(["listen", "--config", &config_path, "--dry-run"])
        .env("FINLINK_WEBHOOK_SECRET", "whsec_cli_test")
        .output()
        .expect("Failed to start finlink binary");

    assert!(
        output.status.success(),
        "Process exited with non-zero status: {}\nStdout: {}\nStderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn listen_without_secret_fails() {
    let config_path = format!("{}/demos/listener.yaml", env!("CARGO_MANIFEST_DIR"));

    let output = finlink()
        .args(["listen", "--config", &config_path, "--dry-run"])
        .env_remove("FINLINK_WEBHOOK_SECRET")
        .output()
        .expect("Failed to start finlink binary");

    assert!(!output.status.success());
}

#[test]
fn check_credentials_from_env() {
    let output = finlink()
        .arg("check-credentials")
        .env("ACCESS_KEY", "abcdef123")
        .env("SECRET_KEY", "xyz")
        .output()
        .expect("Failed to start finlink binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("credentials resolved from env"), "{stdout}");
    assert!(!stdout.contains("abcdef123"), "{stdout}");
    assert!(!stdout.contains("xyz"), "{stdout}");
}

#[test]
fn check_credentials_from_file_profile() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[default]\naccess_key = a\nsecret_key = b\n\n[dev]\naccess_key = devkey\nsandbox = true").unwrap();

    let output = finlink()
        .arg("check-credentials")
        .arg("--profile")
        .arg("dev")
        .arg("--credentials-file")
        .arg(file.path())
        .output()
        .expect("Failed to start finlink binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("from file"), "{stdout}");
    assert!(stdout.contains("sandbox"), "{stdout}");
}

#[test]
fn check_credentials_without_any_source_fails() {
    let output = finlink()
        .arg("check-credentials")
        .output()
        .expect("Failed to start finlink binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no valid credentials found"), "{stderr}");
}
