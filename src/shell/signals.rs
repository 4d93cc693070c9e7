//! Shell Signal Handling
//!
//! Graceful termination of the shell process. Unix gets SIGTERM before the
//! hard kill; other platforms go straight to the kill.

use crate::error::Result;
#[cfg(unix)]
use crate::error::Error;

/// Ask the process to terminate
///
/// Returns `Ok(false)` where there is no graceful signal to send.
pub fn send_terminate(pid: u32) -> Result<bool> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(|e| Error::SignalSendFailed {
            signal: "SIGTERM".to_string(),
            reason: e.to_string(),
        })?;
        Ok(true)
    }

    #[cfg(not(unix))]
    {
        debug!("No graceful termination signal for pid {} on this platform", pid);
        Ok(false)
    }
}
