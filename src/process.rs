use std::process::{Child, Command, ExitStatus};
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::error::{HarvestError, HarvestResult};

fn timeout_duration(timeout_secs: u64) -> Option<Duration> {
    if timeout_secs == 0 {
        None
    } else {
        Some(Duration::from_secs(timeout_secs))
    }
}

/// Waits for a child, killing it if the configured timeout expires.
/// A timeout of 0 blocks indefinitely.
pub fn wait_child(child: &mut Child, label: &str, timeout_secs: u64) -> HarvestResult<ExitStatus> {
    match timeout_duration(timeout_secs) {
        None => child
            .wait()
            .map_err(|e| HarvestError::process(label, format!("wait failed: {e}"))),
        Some(limit) => match child
            .wait_timeout(limit)
            .map_err(|e| HarvestError::process(label, format!("wait failed: {e}")))?
        {
            Some(status) => Ok(status),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(HarvestError::Timeout {
                    label: label.to_string(),
                    timeout_secs,
                })
            }
        },
    }
}

/// Spawns a command with inherited stdio and waits for it. The child's own
/// stderr reaches the terminal untouched.
pub fn run_status(mut cmd: Command, label: &str, timeout_secs: u64) -> HarvestResult<ExitStatus> {
    let mut child = cmd
        .spawn()
        .map_err(|e| HarvestError::process(label, format!("spawn failed: {e}")))?;
    wait_child(&mut child, label, timeout_secs)
}

pub fn ensure_success(status: ExitStatus, label: &str) -> HarvestResult<()> {
    if status.success() {
        Ok(())
    } else {
        Err(HarvestError::process(
            label,
            format!("exited with status {}", status.code().unwrap_or(1)),
        ))
    }
}
