//! Save exported results to the download directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use snop_core::models::{ChatResponse, DownloadRequest, ExportFormat};

use crate::api::WidgetApi;
use crate::error::WidgetError;

pub struct Exporter {
    api: Arc<dyn WidgetApi>,
    download_dir: PathBuf,
}

impl Exporter {
    pub fn new(api: Arc<dyn WidgetApi>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            download_dir: download_dir.into(),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Re-run the answer's query as a spreadsheet and save it.
    pub async fn export_response(
        &self,
        response: &ChatResponse,
        format: ExportFormat,
    ) -> Result<PathBuf, WidgetError> {
        if !response.has_rows() {
            return Err(WidgetError::NothingToExport);
        }
        self.export_sql(&response.sql, format).await
    }

    /// Download `sql` in `format` and write it as `snop_data_<today>.<ext>`,
    /// never overwriting an earlier download. Returns the saved path.
    pub async fn export_sql(&self, sql: &str, format: ExportFormat) -> Result<PathBuf, WidgetError> {
        let bytes = self
            .api
            .download(&DownloadRequest::new(sql, format))
            .await?;

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|source| WidgetError::Save {
                path: self.download_dir.clone(),
                source,
            })?;

        let path = unique_path(&self.download_dir, &format.filename_today()).await;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| WidgetError::Save {
                path: path.clone(),
                source,
            })?;

        tracing::info!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

/// `name`, or `stem (n).ext` for the first free `n`.
async fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !exists(&candidate).await {
        return candidate;
    }

    let (stem, ext) = name.rsplit_once('.').unwrap_or((name, ""));
    let mut n = 1;
    loop {
        let file = if ext.is_empty() {
            format!("{} ({})", stem, n)
        } else {
            format!("{} ({}).{}", stem, n, ext)
        };
        let candidate = dir.join(file);
        if !exists(&candidate).await {
            return candidate;
        }
        n += 1;
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
