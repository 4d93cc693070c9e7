//! Contract Tests for Native Library Bindings
//!
//! Declarations must render into the bootstrap, and proxies must turn member
//! calls, reads and assignments into the exact shell commands the generated
//! types expect.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use pwsh_bridge::ffi::{LibraryImports, MemberMap};
use pwsh_bridge::{Error, ShellArg, Signature};
use serde_json::json;
use test_utils::{mock_session_with, test_config, Reply, Startup};

fn kernel32() -> Vec<(&'static str, Signature)> {
    vec![
        ("Beep", Signature::callable("bool", ["uint", "uint"])),
        ("GetTickCount", Signature::callable("uint", Vec::<String>::new())),
        ("LastCode", Signature::field("int")),
    ]
}

/// Echo the command back as the result so tests can see what was sent
fn echo(command: &str) -> Reply {
    Reply::value(json!(command))
}

#[tokio::test]
async fn test_method_call_through_proxy() {
    let (mut session, mock) = mock_session_with(Startup::Ready, test_config(), echo);
    assert_eq!(session.import_dll("C:\\Windows\\kernel32.dll", kernel32()).unwrap(), "kernel32");
    session.start().await.unwrap();

    let kernel32 = session.library("kernel32").unwrap();
    let output = kernel32
        .call("Beep", &[ShellArg::from(750u32), ShellArg::from(300u32)])
        .await
        .unwrap();
    assert_eq!(output.value, json!("[DLL.kernel32]::Beep(750, 300)"));

    let output = kernel32.call("GetTickCount", &[]).await.unwrap();
    assert_eq!(output.value, json!("[DLL.kernel32]::GetTickCount()"));
    assert_eq!(mock.commands().len(), 2);
}

#[tokio::test]
async fn test_field_read_and_assignment() {
    let (mut session, mock) = mock_session_with(Startup::Ready, test_config(), echo);
    session.import_dll("kernel32.dll", kernel32()).unwrap();
    session.start().await.unwrap();

    let kernel32 = session.library("kernel32").unwrap();
    kernel32.set("LastCode", 5i32).await.unwrap();
    kernel32.get("LastCode").await.unwrap();
    assert_eq!(
        mock.commands(),
        vec!["[DLL.kernel32]::LastCode = 5", "[DLL.kernel32]::LastCode"]
    );

    let script = mock.bootstrap_script().unwrap();
    assert!(script.contains("public static int LastCode;"));
    assert!(!script.contains("extern int LastCode"));
}

#[tokio::test]
async fn test_arguments_are_marshalled() {
    let (mut session, mock) = mock_session_with(Startup::Ready, test_config(), echo);
    session
        .import_dll(
            "user32.dll",
            [("MessageBox", Signature::callable("int", ["IntPtr", "string", "string", "uint"]))],
        )
        .unwrap();
    session.start().await.unwrap();

    session
        .library("user32")
        .unwrap()
        .call(
            "MessageBox",
            &[
                ShellArg::Null,
                ShellArg::from("it's done"),
                ShellArg::from(json!({ "title": "x" })),
                ShellArg::from(true),
            ],
        )
        .await
        .unwrap();

    assert_eq!(
        mock.commands(),
        vec![r#"[DLL.user32]::MessageBox($null, 'it''s done', (In '{"title":"x"}'), $True)"#]
    );
}

#[tokio::test]
async fn test_member_kind_is_enforced() {
    let (mut session, mock) = mock_session_with(Startup::Ready, test_config(), echo);
    session.import_dll("kernel32.dll", kernel32()).unwrap();
    session.start().await.unwrap();
    let kernel32 = session.library("kernel32").unwrap();

    assert!(matches!(
        kernel32.call("LastCode", &[]).await,
        Err(Error::MemberKindMismatch { expected: "method", .. })
    ));
    assert!(matches!(
        kernel32.get("Beep").await,
        Err(Error::MemberKindMismatch { expected: "field", .. })
    ));
    assert!(matches!(
        kernel32.call("Sleep", &[]).await,
        Err(Error::UnknownMember { member, .. }) if member == "Sleep"
    ));
    assert!(mock.commands().is_empty());
}

#[tokio::test]
async fn test_shell_errors_surface_from_proxy_calls() {
    let (mut session, _mock) = mock_session_with(Startup::Ready, test_config(), |_| {
        Reply::error("EntryPointNotFoundException", "Beep")
    });
    session.import_dll("kernel32.dll", kernel32()).unwrap();
    session.start().await.unwrap();

    let result = session
        .library("kernel32")
        .unwrap()
        .call("Beep", &[ShellArg::from(1u32), ShellArg::from(1u32)])
        .await;
    match result {
        Err(Error::Execution(record)) => assert_eq!(record.code, "EntryPointNotFoundException"),
        other => panic!("expected an execution error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_same_library_imports_merge() {
    let (mut session, mock) = mock_session_with(Startup::Ready, test_config(), echo);
    session
        .import_dll("kernel32.dll", [("Beep", Signature::callable("bool", ["uint", "uint"]))])
        .unwrap();
    session
        .import_dll("kernel32.dll", [("GetTickCount", Signature::callable("uint", Vec::<String>::new()))])
        .unwrap();
    session.start().await.unwrap();

    let dll = session.dll();
    assert_eq!(dll.len(), 1);
    let members: Vec<&str> = dll["kernel32"].members().collect();
    assert_eq!(members, vec!["Beep", "GetTickCount"]);

    let script = mock.bootstrap_script().unwrap();
    assert_eq!(script.matches("Add-Type").count(), 1);
}

#[tokio::test]
async fn test_library_lookup_before_and_after_start() {
    let (mut session, _mock) = mock_session_with(Startup::Ready, test_config(), echo);
    session.import_dll("kernel32.dll", kernel32()).unwrap();

    // Proxies exist once the session is started
    assert!(session.dll().is_empty());
    session.start().await.unwrap();

    assert!(session.library("kernel32").is_ok());
    assert!(matches!(
        session.library("user32"),
        Err(Error::UnknownLibrary { library }) if library == "user32"
    ));
}

#[tokio::test]
async fn test_invalid_imports_are_rejected() {
    let (mut session, _mock) = mock_session_with(Startup::Ready, test_config(), echo);

    assert!(matches!(
        session.import_dll("notes.txt", kernel32()),
        Err(Error::InvalidLibraryPath { .. })
    ));
    assert!(session
        .import_dll("kernel32.dll", [("not a name", Signature::field("int"))])
        .is_err());
}

#[tokio::test]
async fn test_declarative_libraries_from_config() {
    let members: MemberMap = toml::from_str(
        r#"
        cos = ["double", "double"]
        signgam = ["int", "@"]
        "#,
    )
    .unwrap();
    let mut config = test_config();
    config.libraries.insert("/usr/lib/libm.so".to_string(), members);

    let (mut session, mock) = mock_session_with(Startup::Ready, config, echo);
    session.start().await.unwrap();

    let libm = session.library("libm").unwrap();
    assert_eq!(libm.signature("cos"), Some(&Signature::callable("double", ["double"])));
    assert_eq!(libm.signature("signgam"), Some(&Signature::field("int")));

    let script = mock.bootstrap_script().unwrap();
    assert!(script.contains(
        "[DllImport(\"/usr/lib/libm.so\", CharSet=CharSet.Auto)] public static extern double cos(double arg0);"
    ));
    assert!(script.contains("public static int signgam;"));
}

#[test]
fn test_misplaced_field_marker_fails_to_deserialize() {
    let result: Result<LibraryImports, _> = toml::from_str(
        r#"
        ["libm.so"]
        signgam = ["@", "int"]
        "#,
    );
    assert!(result.is_err());
}
