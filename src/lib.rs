//! Course-registration CSV ingestion behind a single upload endpoint.
//!
//! - Streaming path: `csv_async` rows become [`StreamEvent`]s, the
//!   [`Pipeline`] validates the first row, cleans every row and commits exactly
//!   one [`Outcome`].
//! - Boundary: [`server::build_router`] receives the multipart upload into a
//!   temp file, runs [`ingest_upload`], and the temp file is removed on every path.
//!
//! Data shape:
//! - Success: `Vec<CleanedRow>`, serialised as an array of JSON objects in
//!   header order, `Course Title` kept verbatim, other cells coerced with
//!   [`clean_value`].
//! - Failure: [`IngestError`], whose `Display` is the client-facing message.
#![cfg_attr(docsrs, feature(doc_cfg))]
//
mod clean;
mod codec;
pub mod config;
mod io;
pub mod logging;
mod pipeline;
pub mod server;
mod upload;
mod validate;

pub use crate::clean::{clean_row, clean_value, Cell, CleanedRow, RawRow, ResultSet};
pub use crate::io::{build_csv_reader, reader_from_path, CsvMeta};
pub use crate::pipeline::{Pipeline, PipelineState, StreamEvent};
pub use crate::upload::{receive_upload, UploadedFile, UPLOAD_FIELD};
pub use crate::validate::{missing_columns, ValidationMode, REQUIRED_COLUMNS, TEXT_COLUMN};

use axum::extract::multipart::MultipartError;
use csv_async::{AsyncReaderBuilder, StringRecord};
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::debug;

/// Error type for every failed upload. `Display` is the message sent back to the caller.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("No file uploaded")]
    NoFile,
    #[error("Please upload a CSV file")]
    NotCsv,
    #[error("Invalid CSV format: missing required columns")]
    MissingColumns { missing: Vec<String> },
    #[error("CSV file is empty")]
    Empty,
    #[error("Error processing CSV file: {0}")]
    Parse(String),
    #[error("Error processing CSV file: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type CsvResult<T> = std::result::Result<T, IngestError>;

/// Terminal result of one upload.
pub type Outcome = CsvResult<ResultSet>;

/// Knobs for one run of the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOptions {
    pub validation: ValidationMode,
}

/// Parse `reader` as a headed CSV and resolve it to a single outcome.
///
/// Returns as soon as the pipeline commits, so a format failure on the first
/// row is answered without reading the rest of the input. A parser error
/// always ends the stream.
pub async fn process_csv_stream<R>(reader: R, options: &IngestOptions) -> Outcome
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut rdr = AsyncReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .buffer_capacity(1 << 20) // 1 MiB
        .create_reader(reader);

    let mut pipeline = Pipeline::new(options.validation);

    let headers = match rdr.headers().await {
        Ok(h) => strip_bom(h),
        Err(e) => {
            return pipeline
                .handle(StreamEvent::Error(e.to_string()))
                .unwrap_or_else(unresolved)
        }
    };
    debug!(columns = headers.len(), "header read");

    let mut record = StringRecord::new();
    loop {
        let event = match rdr.read_record(&mut record).await {
            Ok(true) => StreamEvent::Row(RawRow::from_record(&headers, &record)),
            Ok(false) => StreamEvent::End,
            Err(e) => StreamEvent::Error(e.to_string()),
        };
        let terminal = !matches!(event, StreamEvent::Row(_));
        if let Some(outcome) = pipeline.handle(event) {
            return outcome;
        }
        if terminal {
            return unresolved();
        }
    }
}

// End and Error both commit on a live pipeline
fn unresolved() -> Outcome {
    Err(IngestError::Parse("stream closed without a result".into()))
}

/// Run the pipeline over an uploaded file, then delete the file.
pub async fn ingest_upload(upload: UploadedFile, options: &IngestOptions) -> Outcome {
    let outcome = match upload.open().await {
        Ok((reader, meta)) => {
            debug!(
                content_type = %meta.content_type,
                charset = meta.charset.name(),
                "reading upload"
            );
            process_csv_stream(reader, options).await
        }
        Err(e) => Err(e),
    };
    upload.discard().await;
    outcome
}

fn strip_bom(headers: &StringRecord) -> StringRecord {
    match headers.get(0) {
        Some(first) if first.starts_with('\u{feff}') => headers
            .iter()
            .enumerate()
            .map(|(i, h)| if i == 0 { h.trim_start_matches('\u{feff}') } else { h })
            .collect(),
        _ => headers.clone(),
    }
}
