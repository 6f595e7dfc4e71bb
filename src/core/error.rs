use thiserror::Error;

/// Core error types for bizdesk
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored or submitted content could not be parsed
    #[error("Parse error in {context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// An analytics stage rejected its input
    #[error("Processing error at document {index}: {reason}")]
    Processing { index: usize, reason: String },

    /// No durable store is reachable in this execution context
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Storage key cannot be mapped to a durable entry
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// File-system watcher could not be set up
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl Error {
    pub fn parse(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            context: context.into(),
            source,
        }
    }

    pub fn processing(index: usize, reason: impl Into<String>) -> Self {
        Self::Processing {
            index,
            reason: reason.into(),
        }
    }

    /// Translates the error into a message fit for a notification or the CLI.
    pub fn translate(&self) -> ErrorTranslation {
        match self {
            Error::Parse { context, .. } => {
                ErrorTranslation::new(format!("Could not read {context}"))
                    .with_suggestion("The stored data may have been edited by hand")
                    .with_suggestion("Defaults are used until a new value is saved")
            }
            Error::Processing { index, reason } => ErrorTranslation::new(format!(
                "Report could not be computed: document #{index} {reason}"
            ))
            .with_suggestion("Previous results are still displayed")
            .with_suggestion("Check the export for missing client or status fields"),
            Error::StorageUnavailable(_) => {
                ErrorTranslation::new("Preferences cannot be saved in this environment")
                    .with_suggestion("Changes are kept for this session only")
            }
            Error::InvalidKey(key) => ErrorTranslation::new(format!("Invalid key '{key}'"))
                .with_suggestion("Use only letters, digits, '.', '_' and '-' (max 64 chars)"),
            Error::Io(e) if e.kind() == std::io::ErrorKind::StorageFull => {
                ErrorTranslation::new("Disk full: preferences could not be saved")
                    .with_suggestion("Free up space and try again")
            }
            Error::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorTranslation::new("Permission denied while saving preferences")
                    .with_suggestion("Check ownership of the data directory")
            }
            other => ErrorTranslation::new(other.to_string()),
        }
    }
}

/// Represents a translated error with helpful context
#[derive(Debug, Clone)]
pub struct ErrorTranslation {
    pub user_message: String,
    pub suggestions: Vec<String>,
}

impl ErrorTranslation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            user_message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

pub type Result<T> = std::result::Result<T, Error>;
