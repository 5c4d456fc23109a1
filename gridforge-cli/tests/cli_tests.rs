//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;

/// Build command for the gridforge-cli binary (finds it in target/debug when run via cargo test).
fn gridforge_cli() -> Command {
    let mut cmd = cargo_bin_cmd!("gridforge-cli");
    cmd.env_remove("RUST_LOG")
        .env_remove("GRIDFORGE_WIFI_PASSWORD")
        .env_remove("GRIDFORGE_IDENTITY_SECRET");
    cmd
}

#[test]
fn test_cli_help() {
    let mut cmd = gridforge_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("MQTT firmware"));
}

#[test]
fn test_cli_version() {
    let mut cmd = gridforge_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_boards() {
    let mut cmd = gridforge_cli();

    cmd.arg("boards");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("esp32-devkit-v1"))
        .stdout(predicate::str::contains("esp8266-nodemcu"))
        .stdout(predicate::str::contains("Input Only").not());
}

#[test]
fn test_cli_boards_verbose_shows_restrictions() {
    let mut cmd = gridforge_cli();

    cmd.arg("boards").arg("--verbose");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("restricted: Input Only"));
}

#[test]
fn test_cli_modules_by_category() {
    let mut cmd = gridforge_cli();

    cmd.arg("modules").arg("--category").arg("display");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("ssd1306-i2c"))
        .stdout(predicate::str::contains("dht22").not());
}

#[test]
fn test_cli_modules_bad_category() {
    let mut cmd = gridforge_cli();

    cmd.arg("modules").arg("--category").arg("kitchen");
    cmd.assert().failure();
}

#[test]
fn test_cli_plan_human() {
    let mut cmd = gridforge_cli();

    cmd.arg("plan")
        .arg("--board")
        .arg("esp32-devkit-v1")
        .arg("--module")
        .arg("hc-sr04");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("PIN_0  -> D32 (GPIO32)"))
        .stdout(predicate::str::contains("PIN_1  -> D33 (GPIO33)"));
}

#[test]
fn test_cli_plan_json() {
    let mut cmd = gridforge_cli();

    cmd.arg("plan")
        .arg("-m")
        .arg("bme280")
        .arg("-m")
        .arg("ssd1306-i2c")
        .arg("--format")
        .arg("json");
    let output = cmd.assert().success().get_output().stdout.clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");
    assert_eq!(json["board"], "esp32-devkit-v1");
    let modules = json["modules"].as_array().unwrap();
    assert_eq!(modules.len(), 2);
    for module in modules {
        assert_eq!(module["pins"][0]["gpio"], 21);
        assert_eq!(module["pins"][1]["gpio"], 22);
    }
}

#[test]
fn test_cli_plan_exhaustion_exits_1() {
    let mut cmd = gridforge_cli();

    cmd.arg("plan")
        .arg("--board")
        .arg("esp8266-nodemcu")
        .arg("--module")
        .arg("ldr")
        .arg("--module")
        .arg("rain-sensor");
    cmd.assert()
        .code(1)
        .stderr(predicate::str::starts_with("Error:"))
        .stderr(predicate::str::contains("analog-in"));
}

#[test]
fn test_cli_plan_unknown_module() {
    let mut cmd = gridforge_cli();

    cmd.arg("plan").arg("--module").arg("flux-capacitor");
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("flux-capacitor"));
}

#[test]
fn test_cli_generate_to_stdout() {
    let mut cmd = gridforge_cli();

    cmd.arg("generate")
        .arg("--module")
        .arg("dht22")
        .arg("--ssid")
        .arg("greenhouse")
        .arg("--device-id")
        .arg("node_a");
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("/** GRIDS-IOT-V1 Auto-Generated Code */"))
        .stdout(predicate::str::contains("const char* ssid = \"greenhouse\";"))
        .stdout(predicate::str::contains("const char* device_id = \"node_a\";"))
        .stdout(predicate::str::contains("UNREGISTERED-DEV-KEY"));
}

#[test]
fn test_cli_generate_password_from_env() {
    let mut cmd = gridforge_cli();

    cmd.env("GRIDFORGE_WIFI_PASSWORD", "from-env")
        .arg("generate")
        .arg("--device-id")
        .arg("node_env");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("const char* password = \"from-env\";"));
}

#[test]
fn test_cli_generate_into_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = gridforge_cli();

    cmd.arg("generate")
        .arg("--board")
        .arg("esp8266-nodemcu")
        .arg("--module")
        .arg("relay-1ch")
        .arg("--device-id")
        .arg("pump-house")
        .arg("--output")
        .arg(dir.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("pump_house.ino"))
        .stdout(predicate::str::contains("PubSubClient"));

    let source = std::fs::read_to_string(dir.path().join("pump_house.ino")).unwrap();
    assert!(source.contains("#include <ESP8266WiFi.h>"));
    assert!(source.contains("mod == \"relay-1ch\""));
}

#[test]
fn test_cli_generate_json_with_signed_identity() {
    let mut cmd = gridforge_cli();

    cmd.arg("generate")
        .arg("--module")
        .arg("relay-1ch")
        .arg("--device-id")
        .arg("node_b")
        .arg("--identity-secret")
        .arg("s3cret")
        .arg("--format")
        .arg("json");
    let output = cmd.assert().success().get_output().stdout.clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");
    assert_eq!(json["filename"], "node_b.ino");
    assert!(json["path"].is_null());
    assert_eq!(json["libraries"][0]["id"], "pubsubclient");
    assert_eq!(json["allocation"][0]["definition_id"], "relay-1ch");

    let source = json["source"].as_str().unwrap();
    assert!(!source.contains("UNREGISTERED-DEV-KEY"));
    let token_line = source
        .lines()
        .find(|l| l.starts_with("const char* ghost_identity"))
        .unwrap();
    assert_eq!(token_line.matches('-').count(), 11);
}

#[test]
fn test_cli_identity_flags_conflict() {
    let mut cmd = gridforge_cli();

    cmd.arg("generate")
        .arg("--identity")
        .arg("abc")
        .arg("--identity-secret")
        .arg("s3cret");
    cmd.assert().failure();
}

#[test]
fn test_cli_user_catalog_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("float.json"),
        r#"{
  "id": "float-switch",
  "name": "Float Switch",
  "category": "environmental",
  "requires": ["digital-in"],
  "constructor": "const int float_{{ID}} = {{PIN_0}};",
  "topic_type": "telemetry",
  "telemetry_field": "tank_full",
  "telemetry_read": "    sendTelemetry(\"{{FIELD}}\", digitalRead(float_{{ID}}));"
}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("broken.json"), "{").unwrap();

    let mut cmd = gridforge_cli();
    cmd.arg("generate")
        .arg("--module")
        .arg("float-switch")
        .arg("--catalog-dir")
        .arg(dir.path());
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Warning:"))
        .stdout(predicate::str::contains("sendTelemetry(\"tank_full\""));
}

#[test]
fn test_cli_output_formats_are_different() {
    let mut human = gridforge_cli();
    human.arg("plan").arg("--module").arg("relay-1ch");
    let human_out = human.assert().success().get_output().stdout.clone();

    let mut json = gridforge_cli();
    json.arg("plan")
        .arg("--module")
        .arg("relay-1ch")
        .arg("--format")
        .arg("json");
    let json_out = json.assert().success().get_output().stdout.clone();

    assert_ne!(human_out, json_out);
}
