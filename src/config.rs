use std::env;

/// Canonical application identity (used by help/version surfaces).
pub const APP_NAME: &str = "spharvest";
pub const APP_DESC: &str = "Download scenario-player CI logs and surface failures";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Canonical remote defaults. The shell workflow this replaces kept these as
/// globals at the top of the script; they live in one snapshot here so every
/// remote touchpoint is enumerable and overridable.
pub const DEFAULT_SERVICE_HOST: &str = "services-dev.raiden.network";
pub const DEFAULT_SERVICE_DIR: &str = "logs";
pub const DEFAULT_SERVICE_FILES: [&str; 5] = [
    "pfs-goerli.gz",
    "pfs-goerli-with-fee.gz",
    "ms-goerli.gz",
    "ms-goerli-backup.gz",
    "msrc-goerli.gz",
];
pub const DEFAULT_SCENARIO_HOSTS: [(&str, &str); 2] = [
    (
        "scenario-player.ci.raiden.network",
        "scenario-player/scenarios/ci-1",
    ),
    (
        "scenario-player2.ci.raiden.network",
        "scenario-player/scenarios/ci-2",
    ),
];
pub const DEFAULT_DATA_DIR: &str = ".raiden/scenario-player/scenarios";

/// One remote CI host running scenarios, plus the host-specific directory
/// its scenario definition files live under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioHost {
    pub host: String,
    pub defs_dir: String,
}

/// Process-level configuration snapshot.
///
/// Loaded once at startup and reused by the fetch/transfer layers to avoid
/// scattered, potentially inconsistent env parsing.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub service_host: String,
    pub service_dir: String,
    pub service_files: Vec<String>,
    pub scenario_hosts: Vec<ScenarioHost>,
    pub data_dir: String,
    pub ssh_bin: String,
    pub scp_bin: String,
    pub tar_bin: String,
    /// 0 disables the timeout; remote transfers then block until the
    /// underlying tool returns, like the original workflow.
    pub command_timeout_secs: u64,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

/// Parses a comma-separated list, dropping empty entries.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parses `host=defs_dir` entries; a bare host falls back to the first
/// default definitions directory.
pub fn parse_scenario_hosts(raw: &str) -> Vec<ScenarioHost> {
    parse_list(raw)
        .into_iter()
        .map(|entry| match entry.split_once('=') {
            Some((host, defs_dir)) => ScenarioHost {
                host: host.trim().to_string(),
                defs_dir: defs_dir.trim().to_string(),
            },
            None => ScenarioHost {
                host: entry,
                defs_dir: DEFAULT_SCENARIO_HOSTS[0].1.to_string(),
            },
        })
        .collect()
}

impl HarvestConfig {
    pub fn from_env() -> Self {
        let service_files = env::var("SP_SERVICE_FILES")
            .ok()
            .map(|v| parse_list(&v))
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| {
                DEFAULT_SERVICE_FILES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });
        let scenario_hosts = env::var("SP_SCENARIO_HOSTS")
            .ok()
            .map(|v| parse_scenario_hosts(&v))
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| {
                DEFAULT_SCENARIO_HOSTS
                    .iter()
                    .map(|(host, defs_dir)| ScenarioHost {
                        host: host.to_string(),
                        defs_dir: defs_dir.to_string(),
                    })
                    .collect()
            });
        HarvestConfig {
            service_host: env_str("SP_SERVICE_HOST", DEFAULT_SERVICE_HOST),
            service_dir: env_str("SP_SERVICE_DIR", DEFAULT_SERVICE_DIR),
            service_files,
            scenario_hosts,
            data_dir: env_str("SP_DATA_DIR", DEFAULT_DATA_DIR),
            ssh_bin: env_str("SP_SSH_BIN", "ssh"),
            scp_bin: env_str("SP_SCP_BIN", "scp"),
            tar_bin: env_str("SP_TAR_BIN", "tar"),
            command_timeout_secs: env_u64("SP_CMD_TIMEOUT_SECS", 0),
        }
    }
}
