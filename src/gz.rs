use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{HarvestError, HarvestResult};

/// Compresses `path` to a sibling `<name>.gz` and removes the original.
pub fn compress_in_place(path: &Path) -> HarvestResult<PathBuf> {
    let mut file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(ToOwned::to_owned)
        .ok_or_else(|| HarvestError::invalid(format!("unusable file name: {}", path.display())))?;
    file_name.push_str(".gz");
    let gz_path = path.with_file_name(file_name);

    let mut reader = File::open(path)
        .map_err(|e| HarvestError::io(format!("cannot open {}", path.display()), e))?;
    let out = File::create(&gz_path)
        .map_err(|e| HarvestError::io(format!("cannot create {}", gz_path.display()), e))?;
    let mut encoder = GzEncoder::new(out, Compression::default());
    io::copy(&mut reader, &mut encoder)
        .map_err(|e| HarvestError::io(format!("cannot compress {}", path.display()), e))?;
    encoder
        .finish()
        .map_err(|e| HarvestError::io(format!("cannot finish {}", gz_path.display()), e))?;
    fs::remove_file(path)
        .map_err(|e| HarvestError::io(format!("cannot remove {}", path.display()), e))?;
    Ok(gz_path)
}

/// Reads a gzip-compressed file into lines.
pub fn read_gz_lines(path: &Path) -> HarvestResult<Vec<String>> {
    let file = File::open(path)
        .map_err(|e| HarvestError::io(format!("cannot open {}", path.display()), e))?;
    let reader = BufReader::new(MultiGzDecoder::new(file));
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line =
            line.map_err(|e| HarvestError::io(format!("cannot read {}", path.display()), e))?;
        lines.push(line);
    }
    Ok(lines)
}

/// Sorted directory listing; keeps report output deterministic regardless of
/// filesystem iteration order.
pub fn sorted_entries(dir: &Path) -> HarvestResult<Vec<PathBuf>> {
    let mut entries = Vec::new();
    let iter = fs::read_dir(dir)
        .map_err(|e| HarvestError::io(format!("cannot list {}", dir.display()), e))?;
    for entry in iter {
        let entry =
            entry.map_err(|e| HarvestError::io(format!("cannot list {}", dir.display()), e))?;
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

/// Gzips every plain `*.log` file under `root` in place, so the scanning
/// phase can assume uniform gzip input. Runs exactly once, right before the
/// scan.
pub fn normalize_logs(root: &Path) -> HarvestResult<usize> {
    let mut compressed = 0;
    for path in sorted_entries(root)? {
        if path.is_dir() {
            compressed += normalize_logs(&path)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("log") {
            compress_in_place(&path)?;
            compressed += 1;
        }
    }
    Ok(compressed)
}
