//! Integration Tests Against an Installed PowerShell
//!
//! Ignored by default; run with `--ignored` on a machine with `pwsh`.

use pwsh_bridge::config::TimeoutConfig;
use pwsh_bridge::{Error, ExecRequest, Session, SessionConfig, SessionState};
use serde_json::json;
use std::time::Duration;

fn config() -> SessionConfig {
    SessionConfig::default().with_timeouts(TimeoutConfig {
        startup_ms: 30_000,
        command_ms: 20_000,
        shutdown_grace_ms: 2_000,
    })
}

#[tokio::test]
#[ignore = "requires PowerShell"]
async fn test_real_round_trip() {
    let mut session = Session::launch(config()).await.unwrap();
    assert_eq!(session.state(), SessionState::Ready);

    assert_eq!(session.exec("1 + 1").await.unwrap().value, json!(2));
    assert_eq!(session.exec("'a', 'b'").await.unwrap().value, json!(["a", "b"]));
    assert!(session.exec("$null").await.unwrap().is_null());

    let output = session.exec("@{ Name = 'x'; Size = 3 }").await.unwrap();
    assert_eq!(output.get("Size"), Some(&json!(3)));

    session.shutdown().await.unwrap();
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
#[ignore = "requires PowerShell"]
async fn test_real_errors_and_scoping() {
    let mut session = Session::launch(config()).await.unwrap();

    match session.exec("Get-DefinitelyMissing").await {
        Err(Error::Execution(record)) => assert!(record.is("CommandNotFoundException")),
        other => panic!("expected an execution error, got {:?}", other),
    }

    // Locals stay in their script block; globals persist
    session.exec("$local = 1; $global:kept = 2").await.unwrap();
    assert!(session.exec("$local").await.unwrap().is_null());
    assert_eq!(session.exec("$global:kept").await.unwrap().value, json!(2));

    session.shutdown().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PowerShell"]
async fn test_real_incomplete_and_timeout() {
    let mut session = Session::launch(config()).await.unwrap();

    assert!(matches!(
        session.exec("if ($true) {").await,
        Err(Error::IncompleteCommand { .. })
    ));
    assert_eq!(session.exec("40 + 2").await.unwrap().value, json!(42));

    let request = ExecRequest::new("Start-Sleep -Milliseconds 800; 'late'")
        .timeout(Duration::from_millis(100))
        .safe_timeout(true);
    assert!(session.exec(request).await.unwrap().timeout);
    assert_eq!(session.exec("'next'").await.unwrap().value, json!("next"));

    session.shutdown().await.unwrap();
}
