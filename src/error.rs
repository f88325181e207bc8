use std::fmt;
use std::path::PathBuf;

pub type HarvestResult<T> = Result<T, HarvestError>;

#[derive(Debug)]
pub enum HarvestError {
    Io {
        context: String,
        source: std::io::Error,
    },
    JsonLineParse {
        file: PathBuf,
        line: usize,
        content_preview: String,
        source: serde_json::Error,
    },
    Process {
        label: String,
        detail: String,
    },
    Timeout {
        label: String,
        timeout_secs: u64,
    },
    InvalidData {
        context: String,
    },
}

impl HarvestError {
    pub fn invalid(context: impl Into<String>) -> Self {
        HarvestError::InvalidData {
            context: context.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        HarvestError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn process(label: impl Into<String>, detail: impl Into<String>) -> Self {
        HarvestError::Process {
            label: label.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for HarvestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarvestError::Io { context, source } => write!(f, "{context}: {source}"),
            HarvestError::JsonLineParse {
                file,
                line,
                content_preview,
                source,
            } => write!(
                f,
                "failed to parse json line {} in {} (preview='{}'): {}",
                line,
                file.display(),
                content_preview,
                source
            ),
            HarvestError::Process { label, detail } => write!(f, "{label}: {detail}"),
            HarvestError::Timeout {
                label,
                timeout_secs,
            } => write!(f, "{label} timed out after {timeout_secs}s"),
            HarvestError::InvalidData { context } => write!(f, "{context}"),
        }
    }
}

impl std::error::Error for HarvestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HarvestError::Io { source, .. } => Some(source),
            HarvestError::JsonLineParse { source, .. } => Some(source),
            HarvestError::Process { .. } => None,
            HarvestError::Timeout { .. } => None,
            HarvestError::InvalidData { .. } => None,
        }
    }
}
