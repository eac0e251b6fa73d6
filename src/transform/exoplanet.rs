//! Exoplanet Archive specific normalization rules.

use crate::error::{ExoError, ExoResult};
use crate::transform::{ColumnSelector, RuleSet, TransformPipeline, TransformRule};
use crate::value::FieldValue;

/// Earth masses per Jupiter mass.
pub const EARTH_MASSES_PER_JUPITER: f64 = 317.8;

/// Earth radii per Jupiter radius.
pub const EARTH_RADII_PER_JUPITER: f64 = 11.2;

/// Columns holding sky or galactic coordinates.
pub const COORDINATE_COLUMNS: &[&str] = &["ra", "dec", "glon", "glat"];

/// Archive spelling of discovery methods to normalized vocabulary.
pub const DISCOVERY_METHOD_VOCABULARY: &[(&str, &str)] = &[
    ("Transit", "transit"),
    ("Radial Velocity", "radial_velocity"),
    ("Imaging", "direct_imaging"),
    ("Microlensing", "microlensing"),
    ("Eclipse Timing Variations", "eclipse_timing"),
    ("Orbital Brightness Modulation", "orbital_brightness"),
];

/// Rules for the planetary systems tables:
///
/// - `pl_masse` from Earth to Jupiter masses
/// - `pl_rade` from Earth to Jupiter radii
/// - `discoverymethod` mapped to a lowercase vocabulary
/// - `disc_year` parsed as a date when it is still text
/// - coordinate columns forced to floats
#[derive(Debug, Clone, Copy, Default)]
pub struct ExoplanetRules;

impl RuleSet for ExoplanetRules {
    fn apply(&self, pipeline: &mut TransformPipeline) {
        pipeline
            .add_unit_conversion("pl_masse", 1.0 / EARTH_MASSES_PER_JUPITER)
            .add_unit_conversion("pl_rade", 1.0 / EARTH_RADII_PER_JUPITER)
            .add_categorical_mapping("discoverymethod", DISCOVERY_METHOD_VOCABULARY.iter().copied())
            .add_date_parsing("disc_year", None);

        for column in COORDINATE_COLUMNS {
            pipeline.add_rule(TransformRule::new(
                ColumnSelector::exact(column),
                format!("Ensure {} is numeric", column),
                coerce_coordinate,
            ));
        }
    }
}

/// Integers, floats and digit-only text (signs and dots allowed) become
/// floats. Text that looks numeric but does not parse, such as `1.2.3`, is
/// an error.
fn coerce_coordinate(value: &FieldValue) -> ExoResult<FieldValue> {
    match value {
        FieldValue::Integer(n) => Ok(FieldValue::Float(*n as f64)),
        FieldValue::String(s) => {
            let digits: String = s.chars().filter(|c| *c != '.' && *c != '-').collect();
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return Ok(value.clone());
            }
            s.parse::<f64>().map(FieldValue::Float).map_err(|e| {
                ExoError::transform(
                    "coordinate",
                    format!("could not convert '{}' to float: {}", s, e),
                )
            })
        }
        _ => Ok(value.clone()),
    }
}
