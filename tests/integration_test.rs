use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::Server;
use std::io::Write;
use tempfile::NamedTempFile;

fn cli() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("webhook-retrier"));
    cmd.env_remove("WEBHOOK_RETRIER_CONFIG");
    cmd
}

#[test]
fn test_send_delivers_payload() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/webhook")
        .match_header("content-type", "application/json")
        .match_header("x-event", "order.created")
        .match_body(r#"{"hello": "world"}"#)
        .with_status(202)
        .expect(1)
        .create();

    cli()
        .arg("send")
        .arg(format!("{}/webhook", server.url()))
        .arg("-H")
        .arg("X-Event: order.created")
        .arg("-d")
        .arg(r#"{"hello": "world"}"#)
        .assert()
        .success()
        .stdout(predicates::str::contains("Delivered 18 bytes"));

    mock.assert();
}

#[test]
fn test_send_reports_exhaustion() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/webhook")
        .with_status(500)
        .expect(2)
        .create();

    cli()
        .arg("--max-attempts")
        .arg("2")
        .arg("send")
        .arg(format!("{}/webhook", server.url()))
        .arg("-d")
        .arg("{}")
        .assert()
        .failure()
        .stderr(predicates::str::contains("failed to send event to webhook"));

    mock.assert();
}

#[test]
fn test_send_with_config_file_and_stdin() {
    let mut server = Server::new();
    let mock = server
        .mock("PUT", "/hooks/1")
        .match_body("from stdin")
        .with_status(200)
        .expect(1)
        .create();

    let mut config = NamedTempFile::new().unwrap();
    config
        .write_all(
            br#"{
                "name": "stdin-test",
                "attempt_timeout_ms": 2000,
                "max_attempts": 3,
                "backoff": { "fixed": { "interval_ms": 10 } },
                "success_codes": [200]
            }"#,
        )
        .unwrap();

    cli()
        .arg("--config")
        .arg(config.path())
        .arg("send")
        .arg(format!("{}/hooks/1", server.url()))
        .arg("-X")
        .arg("put")
        .arg("--content-type")
        .arg("text/plain")
        .arg("--data-file")
        .arg("-")
        .write_stdin("from stdin")
        .assert()
        .success();

    mock.assert();
}

#[test]
fn test_send_rejects_invalid_config() {
    let mut config = NamedTempFile::new().unwrap();
    config.write_all(br#"{ "attempt_timeout_ms": 0 }"#).unwrap();

    cli()
        .arg("--config")
        .arg(config.path())
        .arg("send")
        .arg("http://127.0.0.1:1/webhook")
        .assert()
        .failure()
        .stderr(predicates::str::contains("attempt timeout must be positive"));
}

#[test]
fn test_send_rejects_bad_header() {
    cli()
        .arg("send")
        .arg("http://127.0.0.1:1/webhook")
        .arg("-H")
        .arg("no-colon")
        .assert()
        .failure()
        .stderr(predicates::str::contains("expected NAME:VALUE"));
}
