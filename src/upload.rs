//! Multipart reception into per-request temp files.
use axum::extract::multipart::{Field, Multipart};
use futures::TryStreamExt;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::io::{build_csv_reader, CsvMeta};
use crate::CsvResult;

/// Form field the file is expected under.
pub const UPLOAD_FIELD: &str = "file";

/// A received upload stored on disk for the length of one request.
#[derive(Debug)]
pub struct UploadedFile {
    pub id: Uuid,
    pub path: PathBuf,
    pub original_name: String,
    pub content_type: Option<String>,
}

impl UploadedFile {
    /// `.csv` by extension, ignoring case.
    pub fn has_csv_extension(&self) -> bool {
        self.original_name.to_ascii_lowercase().ends_with(".csv")
    }

    pub fn meta(&self) -> CsvMeta {
        CsvMeta::from_content_type(self.content_type.as_deref(), &self.original_name)
    }

    pub async fn open(&self) -> CsvResult<(impl AsyncRead + Unpin + Send, CsvMeta)> {
        let file = File::open(&self.path).await?;
        Ok(build_csv_reader(file, self.meta()))
    }

    /// Delete the temp file. Failures are logged, never surfaced.
    pub async fn discard(self) {
        match fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "upload removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "could not remove upload"),
        }
    }
}

/// Store the first file part named [`UPLOAD_FIELD`] under `dir`.
///
/// Returns `Ok(None)` when no such part exists. Parts with other names, and
/// plain text parts named `file`, are skipped.
pub async fn receive_upload(
    multipart: &mut Multipart,
    dir: &Path,
) -> CsvResult<Option<UploadedFile>> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let id = Uuid::new_v4();
        let upload = UploadedFile {
            id,
            path: dir.join(id.simple().to_string()),
            original_name,
            content_type: field.content_type().map(str::to_string),
        };
        return match store(&mut field, &upload.path).await {
            Ok(bytes) => {
                debug!(%id, bytes, name = %upload.original_name, "upload stored");
                Ok(Some(upload))
            }
            Err(e) => {
                upload.discard().await;
                Err(e)
            }
        };
    }
    Ok(None)
}

async fn store(field: &mut Field<'_>, path: &Path) -> CsvResult<u64> {
    let mut file = File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = field.try_next().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
