use std::path::PathBuf;

use snop_core::RelayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WidgetError {
    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("Failed to save {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("There are no results to export")]
    NothingToExport,
}

impl WidgetError {
    /// Text for the blocking alert shown when an export fails.
    pub fn alert_message(&self) -> String {
        format!("File download failed: {}", self)
    }
}
