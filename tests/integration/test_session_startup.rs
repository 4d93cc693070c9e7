//! Integration Tests for Session Startup
//!
//! Readiness, startup failures and timeouts, and the construction-time
//! checks around starting a session.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use pwsh_bridge::config::SessionConfig;
use pwsh_bridge::protocol::BOOTSTRAP_SCRIPT;
use pwsh_bridge::{Error, Session, SessionState, Signature};
use serde_json::json;
use std::time::{Duration, Instant};
use test_utils::mock_shell::arithmetic;
use test_utils::{mock_session_with, test_config, Reply, Startup};

#[tokio::test]
async fn test_start_reaches_ready() {
    let (mut session, mock) = mock_session_with(Startup::Ready, test_config(), arithmetic);
    assert_eq!(session.state(), SessionState::Uninitialized);
    assert_eq!(session.shell(), "mock-pwsh");

    session.start().await.unwrap();
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.is_started());

    let script = mock.bootstrap_script().expect("bootstrap written");
    assert!(script.ends_with(BOOTSTRAP_SCRIPT));
    assert!(script.contains("function prompt { return \"\" }"));
    assert_eq!(session.exec("1+1").await.unwrap().value, json!(2));
}

#[tokio::test]
async fn test_exec_before_start_fails() {
    let (session, mock) = mock_session_with(Startup::Ready, test_config(), arithmetic);
    assert!(matches!(session.exec("1+1").await, Err(Error::NotStarted)));
    assert!(mock.commands().is_empty());
}

#[tokio::test]
async fn test_start_twice_fails() {
    let (mut session, _mock) = mock_session_with(Startup::Ready, test_config(), arithmetic);
    session.start().await.unwrap();
    assert!(matches!(session.start().await, Err(Error::AlreadyStarted)));
    assert_eq!(session.state(), SessionState::Ready);
}

#[tokio::test]
async fn test_startup_timeout_fails_session() {
    let mut config = test_config();
    config.timeouts.startup_ms = 100;
    let (mut session, _mock) = mock_session_with(Startup::Hang, config, arithmetic);

    let started = Instant::now();
    match session.start().await {
        Err(Error::StartupTimeout { after }) => assert_eq!(after, Duration::from_millis(100)),
        other => panic!("expected startup timeout, got {:?}", other),
    }
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(session.state(), SessionState::Failed);

    assert!(matches!(session.exec("1+1").await, Err(Error::NotStarted)));
    assert!(matches!(session.start().await, Err(Error::AlreadyStarted)));
}

#[tokio::test]
async fn test_errors_before_first_prompt_fail_startup() {
    let (mut session, _mock) = mock_session_with(
        Startup::Fail("Add-Type: Cannot add type. Compilation errors occurred.\n".to_string()),
        test_config(),
        arithmetic,
    );

    match session.start().await {
        Err(Error::StartupFailed { stderr }) => assert!(stderr.contains("Add-Type")),
        other => panic!("expected startup failure, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Failed);
    assert!(matches!(session.exec("1+1").await, Err(Error::NotStarted)));
}

#[tokio::test]
async fn test_banner_is_not_a_frame() {
    // The mock prints a banner before the bootstrap; it must not resolve
    // anything or block readiness
    let (mut session, _mock) = mock_session_with(Startup::Ready, test_config(), |_| Reply::value(json!(7)));
    session.start().await.unwrap();
    assert_eq!(session.exec("7").await.unwrap().value, json!(7));
}

#[tokio::test]
async fn test_declarations_precede_bootstrap() {
    let mut config = test_config();
    config.libraries.insert(
        "C:\\Windows\\System32\\kernel32.dll".to_string(),
        [("Beep".to_string(), Signature::callable("bool", ["uint", "uint"]))]
            .into_iter()
            .collect(),
    );
    let (mut session, mock) = mock_session_with(Startup::Ready, config, arithmetic);
    session
        .import_dll("user32.dll", [("MessageBeep", Signature::callable("bool", ["uint"]))])
        .unwrap();
    session.start().await.unwrap();

    let script = mock.bootstrap_script().unwrap();
    let kernel32 = script.find("-Name kernel32").expect("kernel32 declared");
    let user32 = script.find("-Name user32").expect("user32 declared");
    let bootstrap = script.find("function Out-Default").expect("bootstrap written");
    assert!(kernel32 < bootstrap && user32 < bootstrap);
    assert!(script.contains("public static extern bool Beep(uint arg0, uint arg1);"));
}

#[tokio::test]
async fn test_import_after_start_fails() {
    let (mut session, _mock) = mock_session_with(Startup::Ready, test_config(), arithmetic);
    session.start().await.unwrap();

    let result = session.import_dll("user32.dll", [("MessageBeep", Signature::callable("bool", ["uint"]))]);
    assert!(matches!(result, Err(Error::ImportAfterStart { path }) if path == "user32.dll"));
}

#[tokio::test]
async fn test_missing_shells_are_reported() {
    let config = SessionConfig::default()
        .with_shell("definitely-not-a-shell-7f3a")
        .with_auto_start(false);

    match Session::new(config) {
        Err(Error::ShellNotFound { tried }) => {
            assert_eq!(tried, vec!["definitely-not-a-shell-7f3a", "pwsh", "powershell"]);
        }
        // A machine with PowerShell installed falls through to it
        Ok(session) => assert!(["pwsh", "powershell"].contains(&session.shell())),
        Err(other) => panic!("unexpected error: {:?}", other),
    }
}
