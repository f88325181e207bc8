use std::path::Path;
use std::process::{Command, Stdio};

use crate::config::HarvestConfig;
use crate::error::{HarvestError, HarvestResult};
use crate::process::{ensure_success, run_status, wait_child};

/// Capability for all remote interaction. The fetch logic takes this instead
/// of reaching for ambient shell context, so tests can substitute a recorder
/// and the ssh/scp binaries stay swappable.
pub trait Transport {
    /// Copies the named files from `host:remote_dir` into `dest`.
    fn copy_files(
        &self,
        host: &str,
        remote_dir: &str,
        files: &[String],
        dest: &Path,
    ) -> HarvestResult<()>;

    /// Runs `remote_cmd` on `host` and extracts its stdout, a gzipped tar
    /// stream, under `extract_dir`.
    fn stream_archive(&self, host: &str, remote_cmd: &str, extract_dir: &Path)
    -> HarvestResult<()>;
}

/// Transport over the `ssh`/`scp` binaries with ambient key-based auth.
pub struct SshTransport {
    ssh_bin: String,
    scp_bin: String,
    tar_bin: String,
    timeout_secs: u64,
}

impl SshTransport {
    pub fn new(cfg: &HarvestConfig) -> Self {
        SshTransport {
            ssh_bin: cfg.ssh_bin.clone(),
            scp_bin: cfg.scp_bin.clone(),
            tar_bin: cfg.tar_bin.clone(),
            timeout_secs: cfg.command_timeout_secs,
        }
    }
}

impl Transport for SshTransport {
    fn copy_files(
        &self,
        host: &str,
        remote_dir: &str,
        files: &[String],
        dest: &Path,
    ) -> HarvestResult<()> {
        for file in files {
            let source = if remote_dir.is_empty() {
                format!("{host}:{file}")
            } else {
                format!("{host}:{remote_dir}/{file}")
            };
            let label = format!("scp {source}");
            let mut cmd = Command::new(&self.scp_bin);
            cmd.arg(&source).arg(dest);
            let status = run_status(cmd, &label, self.timeout_secs)?;
            ensure_success(status, &label)?;
        }
        Ok(())
    }

    fn stream_archive(
        &self,
        host: &str,
        remote_cmd: &str,
        extract_dir: &Path,
    ) -> HarvestResult<()> {
        let ssh_label = format!("ssh {host}");
        let mut ssh = Command::new(&self.ssh_bin);
        ssh.arg(host)
            .arg(remote_cmd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped());
        let mut ssh_child = ssh
            .spawn()
            .map_err(|e| HarvestError::process(&ssh_label, format!("spawn failed: {e}")))?;
        let ssh_out = ssh_child
            .stdout
            .take()
            .ok_or_else(|| HarvestError::process(&ssh_label, "missing stdout pipe"))?;

        let tar_label = format!("tar extract into {}", extract_dir.display());
        let mut tar = Command::new(&self.tar_bin);
        tar.arg("-xzf")
            .arg("-")
            .arg("-C")
            .arg(extract_dir)
            .stdin(Stdio::from(ssh_out));
        let mut tar_child = match tar.spawn() {
            Ok(child) => child,
            Err(e) => {
                // The ssh child is already running; reap it before bailing.
                let _ = ssh_child.kill();
                let _ = ssh_child.wait();
                return Err(HarvestError::process(
                    &tar_label,
                    format!("spawn failed: {e}"),
                ));
            }
        };

        let tar_status = wait_child(&mut tar_child, &tar_label, self.timeout_secs);
        let ssh_status = wait_child(&mut ssh_child, &ssh_label, self.timeout_secs);
        ensure_success(ssh_status?, &ssh_label)?;
        ensure_success(tar_status?, &tar_label)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::tempdir;

    fn sh_transport(tar_bin: &str) -> SshTransport {
        SshTransport {
            ssh_bin: "sh".to_string(),
            scp_bin: "scp".to_string(),
            tar_bin: tar_bin.to_string(),
            timeout_secs: 0,
        }
    }

    #[test]
    fn empty_remote_stream_extracts_cleanly() {
        let dir = tempdir().expect("tempdir");
        let transport = sh_transport("tar");
        transport
            .stream_archive("-c", "tar -czf - -T /dev/null", dir.path())
            .expect("empty stream");
    }

    #[test]
    fn failed_tar_spawn_reaps_the_remote_child() {
        let dir = tempdir().expect("tempdir");
        let marker = dir.path().join("still-alive");
        let transport = sh_transport("/nonexistent/tar-binary");
        let cmd = format!("sleep 1; echo x > {}", marker.display());
        let err = transport
            .stream_archive("-c", &cmd, dir.path())
            .expect_err("tar spawn must fail");
        assert!(err.to_string().contains("spawn failed"));
        // The remote child was killed, not left running to completion.
        sleep(Duration::from_millis(1500));
        assert!(!marker.exists());
    }
}
