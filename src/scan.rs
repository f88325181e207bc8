use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::config::APP_NAME;
use crate::error::{HarvestError, HarvestResult};
use crate::gz::{read_gz_lines, sorted_entries};
use crate::paths::scenarios_dir;

const SEPARATOR: &str =
    "================================================================================";

/// stderr lines carrying these substrings are lifecycle noise, not
/// diagnostics. Substring match, same as the grep it replaces.
const STDERR_NOISE: [&str; 2] = ["Starting", "Stopped"];

pub fn is_noise_line(line: &str) -> bool {
    STDERR_NOISE.iter().any(|marker| line.contains(marker))
}

pub fn filter_stderr_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<String> {
    lines
        .filter(|line| !is_noise_line(line))
        .map(ToOwned::to_owned)
        .collect()
}

fn is_scenario_archive(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("scenario-player") && n.ends_with(".gz"))
        .unwrap_or(false)
}

/// One JSONL record of a scenario or node run log. Only the fields the
/// filters look at are kept; everything else about the log format is owned
/// by the remote side.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RunRecord {
    pub result: Option<Value>,
    pub message: Option<Value>,
    pub error: Option<Value>,
    pub exception: Option<Value>,
}

impl RunRecord {
    fn has_result(&self) -> bool {
        matches!(&self.result, Some(v) if !v.is_null())
    }

    fn has_diagnostic(&self) -> bool {
        matches!(&self.error, Some(v) if !v.is_null())
            || matches!(&self.exception, Some(v) if !v.is_null())
    }
}

/// Parses JSONL lines leniently: unparseable lines are warned about on
/// stderr and otherwise treated as carrying no result, which keeps the
/// original "no success record means failure" classification intact.
fn parse_records(file: &Path, lines: &[String]) -> Vec<RunRecord> {
    let mut records = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RunRecord>(line) {
            Ok(v) => records.push(v),
            Err(e) => {
                let preview: String = line.chars().take(160).collect();
                let err = HarvestError::JsonLineParse {
                    file: file.to_path_buf(),
                    line: idx + 1,
                    content_preview: preview,
                    source: e,
                };
                eprintln!("{APP_NAME}: {err}");
            }
        }
    }
    records
}

pub fn has_success(records: &[RunRecord]) -> bool {
    records
        .iter()
        .any(|r| r.result.as_ref().and_then(Value::as_str) == Some("success"))
}

/// Messages of every record whose `result` field is non-null, rendered the
/// way `jq .message` would print them.
pub fn result_messages(records: &[RunRecord]) -> Vec<String> {
    records
        .iter()
        .filter(|r| r.has_result())
        .map(|r| match &r.message {
            Some(Value::String(s)) => s.clone(),
            Some(v) if !v.is_null() => v.to_string(),
            _ => "null".to_string(),
        })
        .collect()
}

/// Raw lines whose record carries a non-null `error` or `exception` field.
pub fn error_lines(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|line| {
            serde_json::from_str::<RunRecord>(line)
                .map(|r| r.has_diagnostic())
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

pub struct Reporter<'a> {
    out: &'a mut dyn Write,
    bold: bool,
}

impl<'a> Reporter<'a> {
    pub fn new(out: &'a mut dyn Write, bold: bool) -> Self {
        Reporter { out, bold }
    }

    fn line(&mut self, text: &str) -> HarvestResult<()> {
        writeln!(self.out, "{text}").map_err(|e| HarvestError::io("cannot write report", e))
    }

    fn header(&mut self, scenario: &str) -> HarvestResult<()> {
        self.line(SEPARATOR)?;
        if self.bold {
            self.line(&format!("\x1b[1m{scenario}\x1b[0m"))
        } else {
            self.line(scenario)
        }
    }
}

/// Scans every scenario run log under `destination/scenarios` (depth <= 2)
/// and prints a report for each scenario without a success record. Listings
/// are sorted, so the transcript is stable across filesystems.
pub fn scan_for_failures(destination: &Path, reporter: &mut Reporter<'_>) -> HarvestResult<()> {
    let scenarios = scenarios_dir(destination);
    if !scenarios.is_dir() {
        return Err(HarvestError::invalid(format!(
            "no scenarios directory under {}",
            destination.display()
        )));
    }
    for entry in sorted_entries(&scenarios)? {
        if entry.is_file() && is_scenario_archive(&entry) {
            let file_name = entry
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("scenario");
            let name = file_name
                .strip_suffix(".gz")
                .unwrap_or(file_name)
                .to_string();
            report_scenario(&name, &entry, None, reporter)?;
        } else if entry.is_dir() {
            let name = entry
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("scenario")
                .to_string();
            for sub in sorted_entries(&entry)? {
                if sub.is_file() && is_scenario_archive(&sub) {
                    report_scenario(&name, &sub, Some(&entry), reporter)?;
                }
            }
        }
    }
    Ok(())
}

/// Failure report for one scenario run log: result messages, then node log
/// errors/exceptions and de-noised node stderr, then the same
/// error/exception filter over the run log itself.
fn report_scenario(
    scenario: &str,
    archive: &Path,
    scenario_dir: Option<&Path>,
    reporter: &mut Reporter<'_>,
) -> HarvestResult<()> {
    let lines = read_gz_lines(archive)?;
    let records = parse_records(archive, &lines);
    if has_success(&records) {
        return Ok(());
    }

    reporter.header(scenario)?;
    for message in result_messages(&records) {
        reporter.line(&message)?;
    }

    if let Some(dir) = scenario_dir {
        for node in sorted_entries(dir)? {
            let is_node_dir = node.is_dir()
                && node
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("node_"))
                    .unwrap_or(false);
            if !is_node_dir {
                continue;
            }
            report_node(&node, reporter)?;
        }
    }

    for raw in error_lines(&lines) {
        reporter.line(&raw)?;
    }
    Ok(())
}

fn report_node(node_dir: &Path, reporter: &mut Reporter<'_>) -> HarvestResult<()> {
    for file in sorted_entries(node_dir)? {
        if !file.is_file() {
            continue;
        }
        let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.ends_with(".log.gz") {
            for raw in error_lines(&read_gz_lines(&file)?) {
                reporter.line(&raw)?;
            }
        } else if name.ends_with(".stderr") {
            let text = fs::read_to_string(&file)
                .map_err(|e| HarvestError::io(format!("cannot read {}", file.display()), e))?;
            for line in filter_stderr_lines(text.lines()) {
                reporter.line(&line)?;
            }
        }
    }
    Ok(())
}
