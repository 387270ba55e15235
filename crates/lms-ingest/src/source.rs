//! CSV source reading
//!
//! Rows are read one at a time from any tokio reader. Field bytes that are not
//! valid UTF-8 are replaced rather than rejected, so one badly encoded name
//! does not stop a load. Rows with too few or too many fields are read as
//! they are: missing trailing columns are absent from the record and extra
//! fields are dropped, leaving validation to decide about the row.

use csv_async::{AsyncReader, AsyncReaderBuilder, ByteRecord};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::model::{columns, SourceRecord};

/// File extension accepted by the loader
pub const SOURCE_EXTENSION: &str = "csv";

/// Failure to read the extract itself
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Unable to find specified file ({}): {source}", .path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected IO problem opening {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to read CSV source: {0}")]
    Csv(#[from] csv_async::Error),
}

/// Check a command-line path: it must exist, be a file and end in `.csv`
pub fn validate_source_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);

    if !path.is_file() {
        return Err("The specified file does not exist".to_string());
    }

    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == SOURCE_EXTENSION);
    if !is_csv {
        return Err("You must specify a csv file".to_string());
    }

    Ok(path)
}

/// Header-keyed CSV row reader
pub struct CsvSource<R> {
    reader: AsyncReader<R>,
    headers: Vec<String>,
    record: ByteRecord,
}

impl CsvSource<tokio::fs::File> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                SourceError::NotFound {
                    path: path.to_path_buf(),
                    source,
                }
            } else {
                SourceError::Open {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        Self::from_reader(file).await
    }
}

impl<R> CsvSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Wrap a reader and consume the header row
    pub async fn from_reader(reader: R) -> Result<Self, SourceError> {
        let mut reader = AsyncReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .create_reader(reader);

        let headers = reader
            .byte_headers()
            .await?
            .iter()
            .map(|field| String::from_utf8_lossy(field).trim_start_matches('\u{feff}').to_string())
            .collect();

        Ok(Self {
            reader,
            headers,
            record: ByteRecord::new(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Expected extract columns absent from the header row
    pub fn missing_columns(&self) -> Vec<&'static str> {
        columns::ALL
            .into_iter()
            .filter(|column| !self.headers.iter().any(|h| h == column))
            .collect()
    }

    /// Next data row, or `None` at end of input
    pub async fn next_record(&mut self) -> Result<Option<SourceRecord>, SourceError> {
        if !self.reader.read_byte_record(&mut self.record).await? {
            return Ok(None);
        }

        let line = self.record.position().map(|p| p.line()).unwrap_or_default();
        let fields: BTreeMap<String, String> = self
            .headers
            .iter()
            .zip(self.record.iter())
            .map(|(header, value)| (header.clone(), String::from_utf8_lossy(value).into_owned()))
            .collect();

        Ok(Some(SourceRecord::new(line, fields)))
    }
}
