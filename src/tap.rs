//! TAP service boundary.
//!
//! The crate never performs network I/O. This module composes requests
//! for a transport to fetch, defines the [`Transport`] seam a caller
//! implements, and decodes JSON, CSV and TSV row payloads into raw records.

use std::time::Duration;

use crate::builder::QueryBuilder;
use crate::config::ArchiveConfig;
use crate::error::{ExoError, ExoResult};
use crate::models::OutputFormat;
use crate::value::{FieldValue, Record, record_from_json};

/// Exoplanet Archive TAP root.
pub const DEFAULT_BASE_URL: &str = "https://exoplanetarchive.ipac.caltech.edu/TAP";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Synchronous requests return rows directly; asynchronous ones create a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryMode {
    #[default]
    Sync,
    Async,
}

/// A TAP service root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapEndpoint {
    base_url: String,
    timeout: Duration,
}

impl Default for TapEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl TapEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(config.base_url.as_str()).with_timeout(Duration::from_secs(config.timeout_secs))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn sync_url(&self) -> String {
        format!("{}/sync", self.base_url)
    }

    pub fn async_url(&self) -> String {
        format!("{}/async", self.base_url)
    }

    pub fn tables_url(&self) -> String {
        format!("{}/tables", self.base_url)
    }

    /// Full request URL for `query`.
    pub fn request_url(
        &self,
        query: &QueryBuilder,
        format: OutputFormat,
        mode: QueryMode,
    ) -> ExoResult<String> {
        let endpoint = match mode {
            QueryMode::Sync => self.sync_url(),
            QueryMode::Async => self.async_url(),
        };
        Ok(format!(
            "{}?query={}&format={}",
            endpoint,
            query.to_url_encoded()?,
            format.as_str()
        ))
    }
}

/// One synchronous query, as handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapRequest {
    pub url: String,
    pub format: OutputFormat,
    pub timeout: Duration,
}

/// Fetches a request and returns the raw response body.
///
/// Implementations own connection handling and retries, and must give up
/// after `request.timeout`.
pub trait Transport {
    fn fetch(&self, request: &TapRequest) -> ExoResult<String>;
}

/// Run `query` through `transport` against `endpoint` and decode the rows.
pub fn execute(
    transport: &dyn Transport,
    endpoint: &TapEndpoint,
    query: &QueryBuilder,
    format: OutputFormat,
) -> ExoResult<Vec<Record>> {
    let request = TapRequest {
        url: endpoint.request_url(query, format, QueryMode::Sync)?,
        format,
        timeout: endpoint.timeout(),
    };
    tracing::debug!("Fetching {} (timeout {:?})", request.url, request.timeout);
    let body = transport.fetch(&request)?;
    decode_rows(&body, format)
}

/// Decode a response body in `format` into raw records.
pub fn decode_rows(body: &str, format: OutputFormat) -> ExoResult<Vec<Record>> {
    match format {
        OutputFormat::Json => decode_json_rows(body),
        OutputFormat::Csv => decode_delimited_rows(body, b','),
        OutputFormat::Tsv => decode_delimited_rows(body, b'\t'),
        OutputFormat::Votable => Err(ExoError::Decode(
            "votable responses cannot be decoded into rows".to_string(),
        )),
    }
}

/// Decode a delimited body with a header row. Every cell is a string;
/// the transform pipeline does the typing.
pub fn decode_delimited_rows(body: &str, delimiter: u8) -> ExoResult<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(body.as_bytes());
    let headers = reader.headers().map_err(decode_error)?.clone();

    reader
        .records()
        .map(|row| -> ExoResult<Record> {
            let row = row.map_err(decode_error)?;
            Ok(headers
                .iter()
                .zip(row.iter())
                .map(|(name, cell)| (name.to_string(), FieldValue::from(cell)))
                .collect())
        })
        .collect()
}

fn decode_error(err: csv::Error) -> ExoError {
    ExoError::Decode(err.to_string())
}

/// Decode a JSON response body: an array of flat objects.
pub fn decode_json_rows(body: &str) -> ExoResult<Vec<Record>> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let serde_json::Value::Array(rows) = value else {
        return Err(ExoError::Decode(
            "expected a JSON array of rows".to_string(),
        ));
    };

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| match row {
            serde_json::Value::Object(map) => Ok(record_from_json(map)),
            other => Err(ExoError::Decode(format!(
                "row {} is not an object: {}",
                i, other
            ))),
        })
        .collect()
}
