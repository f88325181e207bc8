use chrono::NaiveDate;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{HarvestError, HarvestResult};

/// Dated directory component, e.g. `01-02-2024`.
pub fn date_component(day: NaiveDate) -> String {
    day.format("%m-%d-%Y").to_string()
}

/// Resolves the download destination: canonicalized base path (argument or
/// current directory) suffixed with the given day. The dated component is not
/// created here; its absence is what allows a fetch to run.
pub fn resolve_destination(arg: Option<&Path>, day: NaiveDate) -> HarvestResult<PathBuf> {
    let base = match arg {
        Some(p) => p.to_path_buf(),
        None => env::current_dir()
            .map_err(|e| HarvestError::io("cannot determine current directory", e))?,
    };
    let canonical = base
        .canonicalize()
        .map_err(|e| HarvestError::io(format!("cannot resolve {}", base.display()), e))?;
    Ok(canonical.join(date_component(day)))
}

pub fn scenarios_dir(destination: &Path) -> PathBuf {
    destination.join("scenarios")
}
