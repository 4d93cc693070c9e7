//! Session wire protocol
//!
//! The shell is bootstrapped so that every top-level value is written as a
//! delimited JSON block and every error as a delimited JSON error record.
//! This module holds the fixed tokens, the bootstrap script, and the pure
//! functions that encode commands and decode completed frames.

pub mod classifier;
pub mod codec;

pub use classifier::{classify, ErrorClass, ErrorRecord, ErrorTypeTable, GENERIC_ERROR_CLASS};
pub use codec::{extract_blocks, Blocks, ErrorPayload};

/// Prompt printed by the shell when it is idle and waiting for input
pub const PROMPT_TOKEN: &str = "PS>";

/// Leading character of the shell's continuation prompt
pub const CONTINUATION_TOKEN: &str = ">";

/// Delimiter wrapped around every serialized result value
pub const RESULT_MARKER: &str = "¬¬";

/// Opening delimiter of an error record
pub const ERROR_MARKER_OPEN: &str = "¬*";

/// Closing delimiter of an error record
pub const ERROR_MARKER_CLOSE: &str = "*¬";

/// Interrupt byte written when the shell waits for more input
pub const INTERRUPT: &[u8] = b"\x03";

/// Redefines the shell's default output so results and errors come back as
/// delimited JSON, and silences the interactive prompt text.
pub const BOOTSTRAP_SCRIPT: &str = r#"
function Out {
  [CmdletBinding()]
  param (
    [Parameter(ValueFromPipeline = $true)]
    $o
  )
  return ConvertTo-Json($o) -Compress -Depth 2 -WarningAction SilentlyContinue
}
function Out-Error {
  param ($o)
  $info = @{
    code = [string]$o.FullyQualifiedErrorId;
    term = [string]$o.InvocationInfo.InvocationName;
    line = [int]$o.InvocationInfo.ScriptLineNumber;
    pos = [int]$o.InvocationInfo.OffsetInLine
  }
  Write-Host ('¬*' + (ConvertTo-Json $info -Compress) + '*¬')
}
function Out-Default {
  [CmdletBinding()]
  param (
    [Parameter(ValueFromPipeline = $true)]
    $o
  )
  if (($o -is [System.Exception]) -or ($o -is [System.Management.Automation.ErrorRecord])) {
    Out-Error $o
  }
  elseif ($Null -eq $o) {
  }
  else {
    $d = Out($o)
    Write-Host ('¬¬' + $d + '¬¬')
  }
}
function In {
  [CmdletBinding()]
  param (
    [Parameter(ValueFromPipeline = $true)]
    $o,
    $d = 2
  )
  return ConvertFrom-Json($o) -Depth $d -AsHashtable -WarningAction SilentlyContinue
}
function prompt { return "" }

"#;

/// Wrap a command so it runs in an isolated script-block scope
///
/// Locals defined by the command do not leak into the shared session;
/// callers opt into global state with `$global:`.
pub fn wrap_command(command: &str) -> String {
    format!("&{{{}}}\n", command.trim())
}

/// Remove the echoed command line from a completed frame
pub fn strip_echo(frame: &str) -> &str {
    match frame.find('\n') {
        Some(idx) => frame[idx + 1..].trim(),
        None => frame.trim(),
    }
}
