//! Error types for `AppScout`
//!
//! This module defines the error taxonomy used throughout discovery. Every
//! domain error is caught and logged at the point where it happens; none of
//! them ever crosses a discovery strategy boundary.
//!
//! Error variants use `#[source]` to preserve error chains for better
//! observability and debugging.

use thiserror::Error;

/// Simple error type for wrapping string messages while implementing `std::error::Error`
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StringError(pub String);

impl StringError {
    /// Create a new `StringError` from a string message
    pub fn new(msg: impl Into<String>) -> Box<Self> {
        Box::new(Self(msg.into()))
    }
}

/// Main error type for `AppScout`
#[derive(Debug, Error)]
pub enum AppScoutError {
    /// A directory or registry branch could not be opened
    /// (permission denied, nonexistent path or key)
    #[error("Source unavailable: {source_name}: {source}")]
    SourceUnavailable {
        /// Human-readable name of the source (path or registry key)
        source_name: String,
        /// Underlying failure
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A shortcut, manifest, registry entry or command output line could not
    /// be turned into a record
    #[error("Malformed item {item}: {reason}")]
    MalformedItem {
        /// Item identifier (path, key name, or output fragment)
        item: String,
        /// What was wrong with it
        reason: String,
    },

    /// Every native extraction primitive failed for a path
    #[error("Icon extraction failed: {0}")]
    IconExtraction(String),

    /// An external process could not be started, exited non-zero, or produced
    /// unusable output
    #[error("External process `{program}` failed: {reason}")]
    ExternalProcess {
        /// Program that was invoked
        program: String,
        /// Exit status or stderr summary
        reason: String,
    },

    /// Configuration error
    /// Preserves the underlying error source for full error chain transparency
    #[error("Configuration error: {0}")]
    ConfigError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The log file or the global subscriber could not be set up
    #[error("Logging setup failed: {0}")]
    LoggingError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Windows API error
    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    WindowsApiError(#[from] windows::core::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Package full name does not follow `Name_Version_Arch_ResourceId_PublisherId`
    #[error("Failed to extract package family name from full name: {0}")]
    PackageFamilyNameExtractionError(String),
}

impl AppScoutError {
    /// Wrap an error raised while opening a directory or registry branch
    pub fn source_unavailable(
        source_name: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            source: Box::new(source),
        }
    }

    /// Build a malformed-item error
    pub fn malformed(item: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedItem {
            item: item.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for `AppScout` operations
pub type Result<T> = std::result::Result<T, AppScoutError>;

/// Convert an error to a user-friendly message
///
/// Used by the command-line front end when a startup step (logging,
/// configuration) fails. Scan errors never reach this point.
pub fn get_user_friendly_error(error: &AppScoutError) -> String {
    match error {
        AppScoutError::SourceUnavailable { source_name, .. } => {
            format!(
                "Could not read {source_name}.\n\n\
                 Applications from this location will not be listed.\n\
                 Check that your account has read access to it."
            )
        }
        AppScoutError::MalformedItem { item, .. } => {
            format!("Skipped an entry that could not be read: {item}")
        }
        AppScoutError::IconExtraction(path) => {
            format!(
                "Failed to extract an icon from: {path}\n\n\
                 A generated icon will be shown instead."
            )
        }
        AppScoutError::ExternalProcess { program, .. } => {
            format!(
                "Running {program} failed.\n\n\
                 Some Store applications may be missing from the list.\n\
                 Check that Windows PowerShell is installed and not blocked by policy."
            )
        }
        AppScoutError::ConfigError(_) => "Failed to load or save configuration.\n\n\
             Your settings may not persist.\n\
             Check that you have write permissions to:\n\
             %APPDATA%\\AppScout"
            .to_string(),
        AppScoutError::LoggingError(e) => {
            format!(
                "Failed to set up logging:\n\n{e}\n\n\
                 The scan can still run, but nothing will be written to\n\
                 %APPDATA%\\AppScout\\app.log"
            )
        }
        #[cfg(windows)]
        AppScoutError::WindowsApiError(e) => {
            format!(
                "A Windows API error occurred:\n\n{e}\n\n\
                 Please ensure your Windows installation is up to date."
            )
        }
        AppScoutError::IoError(e) => {
            format!(
                "A file system error occurred:\n\n{e}\n\n\
                 Please check file permissions and disk space."
            )
        }
        AppScoutError::JsonError(e) => {
            format!(
                "Configuration file is corrupted:\n\n{e}\n\n\
                 The application will use default settings."
            )
        }
        AppScoutError::PackageFamilyNameExtractionError(full_name) => {
            format!(
                "Failed to extract package family name from: {full_name}\n\n\
                 The package name format is not recognized."
            )
        }
    }
}
