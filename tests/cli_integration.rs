use serde_json::Value;
use std::process::{Command, Output};

fn run_cli(args: &[&str]) -> Output {
    Command::new(assert_cmd::cargo::cargo_bin!("sheets-cli"))
        .args(args)
        .env_remove("GOOGLE_SERVICE_ACCOUNT_JSON")
        .env_remove("SHEETS_BRIDGE_CREDENTIALS_FILE")
        .env_remove("SHEETS_BRIDGE_API_BASE_URL")
        .output()
        .expect("run sheets-cli")
}

fn parse_json(bytes: &[u8]) -> Value {
    let text = String::from_utf8(bytes.to_vec()).expect("utf8");
    serde_json::from_str(&text).expect("valid json")
}

#[test]
fn unconfirmed_delete_fails_without_credentials() {
    let output = run_cli(&["--compact", "delete", "sheet-1", "People", "2-3"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());

    let envelope = parse_json(&output.stderr);
    assert_eq!(envelope["metadata"]["status"], "error");
    assert_eq!(
        envelope["data"]["error"],
        "You must confirm the deletion by checking the confirmation box"
    );
}

#[test]
fn malformed_upsert_payload_is_reported() {
    let output = run_cli(&[
        "--compact", "upsert", "sheet-1", "People", "id", "{not json", "--yes",
    ]);
    assert!(!output.status.success());
    let envelope = parse_json(&output.stderr);
    let message = envelope["data"]["error"].as_str().expect("error text");
    assert!(message.starts_with("Invalid data to upsert"), "{message}");
}

#[test]
fn missing_credentials_fail_the_backend_connection() {
    let output = run_cli(&["--compact", "read", "sheet-1", "People"]);
    assert!(!output.status.success());
    let envelope = parse_json(&output.stderr);
    let message = envelope["data"]["error"].as_str().expect("error text");
    assert!(
        message.starts_with("Failed to create Google Sheets service"),
        "{message}"
    );
}
