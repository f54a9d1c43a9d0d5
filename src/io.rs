use crate::CsvResult;
use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::codec::Transcoder;

#[derive(Debug, Clone)]
pub struct CsvMeta {
    /// Media type without parameters, lowercased, e.g. "text/csv" or "application/gzip"
    pub content_type: String,
    /// e.g. "gzip", "zstd", or empty
    pub content_encoding: String,
    /// Original file name (used for extension fallback)
    pub name_hint: String,
    /// Which character encoding to expect (defaults to UTF-8)
    pub charset: &'static encoding_rs::Encoding,
}

impl Default for CsvMeta {
    fn default() -> Self {
        Self {
            content_type: String::new(),
            content_encoding: String::new(),
            name_hint: String::new(),
            charset: encoding_rs::UTF_8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    None,
    Gzip,
    Zstd,
}

impl CsvMeta {
    /// Meta for an uploaded part, from its declared `Content-Type`
    /// (e.g. `text/csv; charset=windows-1252`). Unknown charsets fall back to UTF-8.
    pub fn from_content_type(content_type: Option<&str>, name_hint: &str) -> Self {
        let mut meta = CsvMeta {
            name_hint: name_hint.to_string(),
            ..Default::default()
        };
        let Some(raw) = content_type else {
            return meta;
        };

        let mut parts = raw.split(';');
        meta.content_type = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        for param in parts {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            if !key.trim().eq_ignore_ascii_case("charset") {
                continue;
            }
            let label = value.trim().trim_matches('"');
            match encoding_rs::Encoding::for_label(label.as_bytes()) {
                Some(enc) => meta.charset = enc,
                None => debug!(label, "unknown charset, assuming UTF-8"),
            }
        }
        meta
    }

    fn compression(&self) -> Compression {
        let ce = self.content_encoding.to_ascii_lowercase();
        let name = self.name_hint.to_ascii_lowercase();
        if ce.split(',').any(|s| s.trim() == "gzip")
            || matches!(self.content_type.as_str(), "application/gzip" | "application/x-gzip")
            || name.ends_with(".gz")
        {
            Compression::Gzip
        } else if ce.split(',').any(|s| s.trim() == "zstd")
            || self.content_type == "application/zstd"
            || name.ends_with(".zst")
        {
            Compression::Zstd
        } else {
            Compression::None
        }
    }
}

/// Wrap a raw byte source with optional decompression and UTF-8 transcoding.
/// Returns an AsyncRead suitable for csv_async plus the meta that drove the choice.
pub fn build_csv_reader<R>(raw: R, meta: CsvMeta) -> (impl AsyncRead + Unpin + Send, CsvMeta)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = BufReader::with_capacity(1 << 20, raw);
    let decompressed: Box<dyn AsyncRead + Unpin + Send> = match meta.compression() {
        Compression::Gzip => Box::new(GzipDecoder::new(buf)),
        Compression::Zstd => Box::new(ZstdDecoder::new(buf)),
        Compression::None => Box::new(buf),
    };

    let reader: Box<dyn AsyncRead + Unpin + Send> = if meta.charset == encoding_rs::UTF_8 {
        decompressed
    } else {
        let framed = FramedRead::new(decompressed, Transcoder::new(meta.charset));
        Box::new(StreamReader::new(framed))
    };

    (reader, meta)
}

/// Build a reader from a local file path (meta guessed from the extension).
pub async fn reader_from_path(path: &Path) -> CsvResult<(impl AsyncRead + Unpin + Send, CsvMeta)> {
    let file = File::open(path).await?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let content_type = match path.extension().and_then(|s| s.to_str()).unwrap_or_default() {
        "gz" => "application/gzip",
        "zst" => "application/zstd",
        _ => "text/csv",
    };
    let meta = CsvMeta::from_content_type(Some(content_type), &name);

    Ok(build_csv_reader(file, meta))
}
