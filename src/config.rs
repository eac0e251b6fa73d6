//! TOML configuration.
//!
//! ```toml
//! [archive]
//! base_url = "https://exoplanetarchive.ipac.caltech.edu/TAP"
//! format = "json"
//!
//! [pipeline]
//! batch_size = 500
//!
//! [transform]
//! date_columns = ["rowupdate"]
//!
//! [[transform.unit_conversions]]
//! column = "st_mass"
//! factor = 1.0
//!
//! [transform.mappings.soltype]
//! "Published Confirmed" = "confirmed"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ExoError, ExoResult};
use crate::models::OutputFormat;
use crate::tap::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::transform::{ExoplanetRules, RuleSet, TransformPipeline};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExoConfig {
    pub archive: ArchiveConfig,
    pub pipeline: PipelineConfig,
    pub transform: TransformConfig,
}

/// Where and how queries are sent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub base_url: String,
    /// Carried to the transport on every request.
    pub timeout_secs: u64,
    pub format: OutputFormat,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            format: OutputFormat::Json,
        }
    }
}

/// Batching for the load stage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub max_records: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_records: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UnitConversion {
    pub column: String,
    pub factor: f64,
}

/// Extra transform rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Layer [`ExoplanetRules`] before the configured rules.
    pub exoplanet_rules: bool,
    pub unit_conversions: Vec<UnitConversion>,
    pub date_columns: Vec<String>,
    /// Explicit format per date column; other date columns use the defaults.
    pub date_formats: BTreeMap<String, String>,
    pub mappings: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            exoplanet_rules: true,
            unit_conversions: Vec::new(),
            date_columns: Vec::new(),
            date_formats: BTreeMap::new(),
            mappings: BTreeMap::new(),
        }
    }
}

impl RuleSet for TransformConfig {
    fn apply(&self, pipeline: &mut TransformPipeline) {
        if self.exoplanet_rules {
            ExoplanetRules.apply(pipeline);
        }
        for conversion in &self.unit_conversions {
            pipeline.add_unit_conversion(&conversion.column, conversion.factor);
        }
        for column in &self.date_columns {
            pipeline.add_date_parsing(column, self.date_formats.get(column).map(String::as_str));
        }
        for (column, mapping) in &self.mappings {
            pipeline.add_categorical_mapping(column, mapping.clone());
        }
    }
}

impl TransformConfig {
    /// Default pipeline with the configured rules layered on top.
    pub fn build_pipeline(&self) -> TransformPipeline {
        TransformPipeline::new().with_rules(self)
    }
}

impl ExoConfig {
    /// `<config dir>/exoquery/config.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("exoquery").join("config.toml"))
    }

    pub fn from_toml_str(content: &str) -> ExoResult<Self> {
        let config: ExoConfig =
            toml::from_str(content).map_err(|e| ExoError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ExoResult<Self> {
        let content = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Load `path` if given, else the default path if it exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> ExoResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> ExoResult<()> {
        let url = url::Url::parse(&self.archive.base_url).map_err(|e| {
            ExoError::Config(format!("invalid base_url '{}': {}", self.archive.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExoError::Config(format!(
                "base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.archive.timeout_secs == 0 {
            return Err(ExoError::Config("timeout_secs must be positive".to_string()));
        }
        if self.pipeline.batch_size == 0 {
            return Err(ExoError::Config("batch_size must be positive".to_string()));
        }
        if let Some(bad) = self
            .transform
            .unit_conversions
            .iter()
            .find(|c| !c.factor.is_finite())
        {
            return Err(ExoError::Config(format!(
                "unit conversion factor for '{}' must be finite",
                bad.column
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{FieldValue, Record};

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ExoConfig::from_toml_str("").unwrap();
        assert_eq!(config, ExoConfig::default());
        assert_eq!(config.archive.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.pipeline.batch_size, 1000);
        assert!(config.transform.exoplanet_rules);
    }

    #[test]
    fn test_full_config() {
        let config = ExoConfig::from_toml_str(
            r#"
            [archive]
            base_url = "http://localhost:8080/TAP"
            format = "csv"

            [pipeline]
            batch_size = 2
            max_records = 10

            [transform]
            exoplanet_rules = false
            date_columns = ["rowupdate"]

            [transform.date_formats]
            rowupdate = "%d/%m/%Y"

            [[transform.unit_conversions]]
            column = "st_mass"
            factor = 2.0

            [transform.mappings.soltype]
            "Published Confirmed" = "confirmed"
            "#,
        )
        .unwrap();

        assert_eq!(config.archive.format, OutputFormat::Csv);
        assert_eq!(config.pipeline.max_records, Some(10));
        assert_eq!(config.transform.unit_conversions[0].column, "st_mass");

        let pipeline = config.transform.build_pipeline();
        let mut raw = Record::new();
        raw.insert("st_mass".into(), "1.5".into());
        raw.insert("soltype".into(), "published confirmed".into());
        raw.insert("rowupdate".into(), "31/12/2020".into());
        raw.insert("pl_masse".into(), "317.8".into());

        let out = pipeline.transform_record(&raw);
        assert_eq!(out["st_mass"], FieldValue::Float(3.0));
        assert_eq!(out["soltype"], FieldValue::from("confirmed"));
        assert!(matches!(out["rowupdate"], FieldValue::Timestamp(_)));
        // Exoplanet rules are off, so no mass conversion.
        assert_eq!(out["pl_masse"], FieldValue::Float(317.8));
    }

    #[test]
    fn test_invalid_url() {
        let err = ExoConfig::from_toml_str("[archive]\nbase_url = \"not a url\"").unwrap_err();
        assert!(matches!(err, ExoError::Config(_)));

        let err = ExoConfig::from_toml_str("[archive]\nbase_url = \"ftp://x/TAP\"").unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn test_zero_batch_size() {
        assert!(ExoConfig::from_toml_str("[pipeline]\nbatch_size = 0").is_err());
    }

    #[test]
    fn test_timeout() {
        let config = ExoConfig::from_toml_str("[archive]\ntimeout_secs = 5").unwrap();
        assert_eq!(config.archive.timeout_secs, 5);
        assert_eq!(ExoConfig::default().archive.timeout_secs, 30);
        assert!(ExoConfig::from_toml_str("[archive]\ntimeout_secs = 0").is_err());
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(ExoConfig::from_toml_str("[archive]\nformat = \"xml\"").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = ExoConfig::load(Path::new("/nonexistent/exoquery.toml")).unwrap_err();
        assert!(matches!(err, ExoError::Io(_)));
    }
}
