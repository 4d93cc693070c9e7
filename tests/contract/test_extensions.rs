//! Contract Tests for Session Extensions

#[path = "../test_utils/mod.rs"]
mod test_utils;

use pwsh_bridge::ffi::{LibraryImports, MemberMap};
use pwsh_bridge::{Error, Extension, Session, Signature};
use serde_json::json;
use std::sync::Arc;
use test_utils::{mock_session_with, test_config, Reply, Startup};

/// Extension that binds a couple of kernel32 members
struct Sound {
    shell: String,
}

impl Extension for Sound {
    fn create(session: &Session) -> Self {
        Sound {
            shell: session.shell().to_string(),
        }
    }

    fn name(&self) -> &str {
        "Sound"
    }

    fn dll_imports(&self) -> LibraryImports {
        let mut members = MemberMap::new();
        members.insert("Beep".to_string(), Signature::callable("bool", ["uint", "uint"]));
        let mut imports = LibraryImports::new();
        imports.insert("kernel32.dll".to_string(), members);
        imports
    }
}

/// Extension with no imports and no name
struct Plain;

impl Extension for Plain {
    fn create(_session: &Session) -> Self {
        Plain
    }
}

fn echo(command: &str) -> Reply {
    Reply::value(json!(command))
}

#[tokio::test]
async fn test_extend_is_idempotent_per_type() {
    let (mut session, _mock) = mock_session_with(Startup::Ready, test_config(), echo);

    let first = session.extend::<Sound>().unwrap();
    let second = session.extend::<Sound>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.shell, "mock-pwsh");

    let found = session.get_extension::<Sound>().unwrap();
    assert!(Arc::ptr_eq(&first, &found));
    assert!(session.get_extension::<Plain>().is_none());
}

#[tokio::test]
async fn test_extension_lookup_by_name() {
    let (mut session, _mock) = mock_session_with(Startup::Ready, test_config(), echo);
    session.extend::<Sound>().unwrap();
    session.extend::<Plain>().unwrap();

    let sound = session.get_extension_by_name("sound").unwrap();
    assert_eq!(sound.name(), "Sound");
    assert!(session.get_extension_by_name(" SOUND ").is_some());

    let plain = session.get_extension_by_name("extension").unwrap();
    assert!(plain.dll_imports().is_empty());
    assert!(session.get_extension_by_name("missing").is_none());
}

#[tokio::test]
async fn test_extension_imports_become_proxies() {
    let (mut session, mock) = mock_session_with(Startup::Ready, test_config(), echo);
    session.extend::<Sound>().unwrap();
    session.start().await.unwrap();

    assert!(mock.bootstrap_script().unwrap().contains("-Name kernel32"));

    let output = session
        .library("kernel32")
        .unwrap()
        .call("Beep", &[440u32.into(), 100u32.into()])
        .await
        .unwrap();
    assert_eq!(output.value, json!("[DLL.kernel32]::Beep(440, 100)"));
}

#[tokio::test]
async fn test_extension_with_imports_after_start_fails() {
    let (mut session, _mock) = mock_session_with(Startup::Ready, test_config(), echo);
    session.start().await.unwrap();

    assert!(matches!(
        session.extend::<Sound>(),
        Err(Error::ImportAfterStart { .. })
    ));
    assert!(session.get_extension::<Sound>().is_none());

    // Nothing to import, so attaching still works
    assert!(session.extend::<Plain>().is_ok());
}
