use std::fs;
use std::path::Path;

use crate::config::HarvestConfig;
use crate::error::{HarvestError, HarvestResult};
use crate::paths::scenarios_dir;
use crate::transfer::Transport;

/// Builds the remote procedure that packs up the latest run of every
/// scenario defined on a host: for each scenario definition, read the
/// recorded run number from its `run_number.txt` sidecar and emit the
/// matching `node_{run}_*` directories plus the most recent run log as a
/// single gzipped tar stream on stdout. With nothing to pack it still emits
/// an empty archive, so the local extraction side always sees valid input.
pub fn remote_harvest_script(data_dir: &str, defs_dir: &str) -> String {
    let data = shell_words::quote(data_dir).into_owned();
    let defs = shell_words::quote(defs_dir).into_owned();
    [
        format!("cd {data} || exit 1"),
        "files=".to_string(),
        format!("for def in {defs}/*.yaml; do"),
        "  [ -e \"$def\" ] || continue".to_string(),
        "  name=$(basename \"$def\" .yaml)".to_string(),
        "  [ -f \"$name/run_number.txt\" ] || continue".to_string(),
        "  run=$(cat \"$name/run_number.txt\")".to_string(),
        "  for d in \"$name\"/node_\"$run\"_*; do".to_string(),
        "    [ -e \"$d\" ] && files=\"$files $d\"".to_string(),
        "  done".to_string(),
        "  latest=$(ls -t \"$name\"/scenario-player-run*.log* 2>/dev/null | head -n 1)"
            .to_string(),
        "  [ -n \"$latest\" ] && files=\"$files $latest\"".to_string(),
        "done".to_string(),
        "if [ -n \"$files\" ]; then tar -czf - $files; else tar -czf - -T /dev/null; fi"
            .to_string(),
    ]
    .join("\n")
}

/// Downloads everything into `destination`, unless it already exists.
///
/// The existence check is the only rerun guard: a second invocation on the
/// same day finds the dated directory and skips every transfer. A failed
/// fetch leaves the partially populated directory behind; the caller deletes
/// it and reruns. Returns whether a fetch actually happened.
pub fn fetch_if_absent(
    cfg: &HarvestConfig,
    transport: &dyn Transport,
    destination: &Path,
) -> HarvestResult<bool> {
    if destination.exists() {
        return Ok(false);
    }
    let scenarios = scenarios_dir(destination);
    fs::create_dir_all(&scenarios)
        .map_err(|e| HarvestError::io(format!("cannot create {}", scenarios.display()), e))?;

    transport.copy_files(
        &cfg.service_host,
        &cfg.service_dir,
        &cfg.service_files,
        destination,
    )?;

    for sp in &cfg.scenario_hosts {
        let script = remote_harvest_script(&cfg.data_dir, &sp.defs_dir);
        transport.stream_archive(&sp.host, &script, &scenarios)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScenarioHost;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingTransport {
        calls: RefCell<Vec<String>>,
    }

    impl Transport for RecordingTransport {
        fn copy_files(
            &self,
            host: &str,
            remote_dir: &str,
            files: &[String],
            _dest: &Path,
        ) -> HarvestResult<()> {
            self.calls
                .borrow_mut()
                .push(format!("copy {host}:{remote_dir} {}", files.join(",")));
            Ok(())
        }

        fn stream_archive(
            &self,
            host: &str,
            _remote_cmd: &str,
            _extract_dir: &Path,
        ) -> HarvestResult<()> {
            self.calls.borrow_mut().push(format!("stream {host}"));
            Ok(())
        }
    }

    fn test_config() -> HarvestConfig {
        HarvestConfig {
            service_host: "services.example.org".to_string(),
            service_dir: "logs".to_string(),
            service_files: vec!["pfs.gz".to_string(), "ms.gz".to_string()],
            scenario_hosts: vec![
                ScenarioHost {
                    host: "sp1.example.org".to_string(),
                    defs_dir: "scenarios/one".to_string(),
                },
                ScenarioHost {
                    host: "sp2.example.org".to_string(),
                    defs_dir: "scenarios/two".to_string(),
                },
            ],
            data_dir: "data".to_string(),
            ssh_bin: "ssh".to_string(),
            scp_bin: "scp".to_string(),
            tar_bin: "tar".to_string(),
            command_timeout_secs: 0,
        }
    }

    #[test]
    fn fetch_runs_services_then_hosts_in_order() {
        let dir = tempdir().expect("tempdir");
        let dest: PathBuf = dir.path().join("01-02-2024");
        let transport = RecordingTransport::default();
        let fetched = fetch_if_absent(&test_config(), &transport, &dest).expect("fetch");
        assert!(fetched);
        assert!(dest.join("scenarios").is_dir());
        assert_eq!(
            *transport.calls.borrow(),
            vec![
                "copy services.example.org:logs pfs.gz,ms.gz".to_string(),
                "stream sp1.example.org".to_string(),
                "stream sp2.example.org".to_string(),
            ]
        );
    }

    #[test]
    fn existing_destination_skips_all_transfers() {
        let dir = tempdir().expect("tempdir");
        let dest: PathBuf = dir.path().join("01-02-2024");
        fs::create_dir_all(&dest).expect("pre-create dest");
        let transport = RecordingTransport::default();
        let fetched = fetch_if_absent(&test_config(), &transport, &dest).expect("fetch");
        assert!(!fetched);
        assert!(transport.calls.borrow().is_empty());
    }

    #[test]
    fn remote_script_reads_sidecar_and_packs_latest_run() {
        let script = remote_harvest_script("data dir", "scenarios/one");
        assert!(script.starts_with("cd 'data dir' || exit 1"));
        assert!(script.contains("scenarios/one/*.yaml"));
        assert!(script.contains("run_number.txt"));
        assert!(script.contains("node_\"$run\"_*"));
        assert!(script.contains("scenario-player-run*.log*"));
        assert!(script.contains("tar -czf -"));
    }
}
