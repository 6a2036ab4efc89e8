use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[cfg(not(feature = "http-gateway"))]
#[test]
fn test_http_gateway_fallback_warning() {
    let mut cmd = Command::new(cargo_bin!("paysettle"));
    cmd.arg("tests/fixtures/card_challenge.json")
        .arg("--gateway-url")
        .arg("https://gateway.example/api");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARNING: Live gateway requested via --gateway-url, but 'http-gateway' feature is not enabled. Falling back to the scripted gateway."))
        .stdout(predicate::str::contains(r#""outcome":"approved""#));
}

#[test]
fn test_no_warning_without_gateway_url() {
    let mut cmd = Command::new(cargo_bin!("paysettle"));
    cmd.arg("tests/fixtures/card_challenge.json");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARNING").not());
}
