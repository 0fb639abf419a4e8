use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

#[test]
fn check_config_reports_missing_credentials() -> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempdir()?;
    let config_path = tempdir.path().join("config.ini");
    fs::write(&config_path, "# nothing configured yet\nPORT=8080\n")?;

    let output = cargo_bin_cmd!("catalog-bridge")
        .env_clear()
        .arg("check-config")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("missing required values"))
        .get_output()
        .stdout
        .clone();

    let json: Value = serde_json::from_slice(&output)?;
    assert_eq!(json["missing"][0], "WHATSAPP_TOKEN");
    assert_eq!(json["missing"][1], "PHONE_NUMBER_ID");
    Ok(())
}

#[test]
fn check_config_prefers_file_over_environment_and_hides_secrets()
-> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempdir()?;
    let config_path = tempdir.path().join("bridge.ini");
    fs::write(
        &config_path,
        "WHATSAPP_TOKEN = \"EAAG token \"\nPHONE_NUMBER_ID=123456\nAPI_VERSION=v21.0\n",
    )?;

    let output = cargo_bin_cmd!("catalog-bridge")
        .env_clear()
        .current_dir(tempdir.path())
        .env("PHONE_NUMBER_ID", "999")
        .env("PORT", "4100")
        .env("HTTP_MODE", "mock")
        .arg("check-config")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("EAAG").not())
        .get_output()
        .stdout
        .clone();

    let json: Value = serde_json::from_slice(&output)?;
    let config = &json["config"];
    assert_eq!(config["phone_number_id"], "123456");
    assert_eq!(config["api_version"], "v21.0");
    assert_eq!(config["port"], 4100);
    assert_eq!(config["http_mode"], "mock");
    assert_eq!(json["catalog_present"], false);
    Ok(())
}

#[test]
fn invalid_port_is_a_load_error() -> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempdir()?;
    let config_path = tempdir.path().join("config.ini");
    fs::write(&config_path, "PORT=eighty\n")?;

    cargo_bin_cmd!("catalog-bridge")
        .env_clear()
        .arg("check-config")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid PORT value 'eighty'"));
    Ok(())
}
