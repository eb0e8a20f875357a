use std::process::Command;

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn chatbar_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_chatbar").expect("chatbar test binary not built")
}

#[test]
fn chatbar_help_mentions_name() {
    let output = Command::new(chatbar_bin())
        .arg("--help")
        .output()
        .expect("run chatbar --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("ChatBar"));
    assert!(combined.contains("--server-url"));
}

#[test]
fn chatbar_doctor_prints_diagnostics() {
    let output = Command::new(chatbar_bin())
        .arg("--doctor")
        .output()
        .expect("run chatbar --doctor");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("chatbar doctor"));
    assert!(combined.contains("[Server]"));
    assert!(combined.contains("server_url"));
}

#[test]
fn chatbar_rejects_invalid_temperature() {
    let output = Command::new(chatbar_bin())
        .args(["--doctor", "--temperature", "9.5"])
        .output()
        .expect("run chatbar with bad temperature");
    assert!(!output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("--temperature"));
}

#[test]
fn chatbar_doctor_reflects_overrides() {
    let output = Command::new(chatbar_bin())
        .args(["--doctor", "--model", "test-model-name", "--width", "120"])
        .output()
        .expect("run chatbar --doctor with overrides");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("test-model-name"));
    assert!(combined.contains("120"));
}
