use std::process::Command;

#[test]
fn test_glmctl_version() {
    let output = Command::new("cargo")
        .args(["run", "--bin", "glmctl", "--", "--version"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0.1.0"));
}

#[test]
fn test_glmctl_help() {
    let output = Command::new("cargo")
        .args(["run", "--bin", "glmctl", "--", "--help"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ask"));
    assert!(stdout.contains("stream"));
}

#[test]
fn test_glmctl_init_writes_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("glmctl.toml");

    let output = Command::new("cargo")
        .args(["run", "--bin", "glmctl", "--", "init"])
        .arg(&path)
        .output()
        .unwrap();

    assert!(output.status.success());
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("[provider]"));
    assert!(content.contains("glm-4-flash"));
}

#[test]
fn test_glmctl_ask_without_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("glmctl.toml");
    std::fs::write(&path, "[provider]\napi_key_env = \"GLMCTL_TEST_UNSET_KEY\"\n").unwrap();

    let output = Command::new("cargo")
        .args(["run", "--bin", "glmctl", "--", "--config"])
        .arg(&path)
        .args(["ask", "hello"])
        .env_remove("GLMCTL_TEST_UNSET_KEY")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GLMCTL_TEST_UNSET_KEY"));
}
