//! Ready-made queries for common archive pulls.

use crate::builder::QueryBuilder;
use crate::models::TableName;
use crate::value::FieldValue;

/// Columns pulled by the planet presets.
pub const DEFAULT_PLANET_COLUMNS: &[&str] = &[
    "pl_name",
    "hostname",
    "discoverymethod",
    "disc_year",
    "pl_orbper",
    "pl_orbsmax",
    "pl_masse",
    "pl_rade",
    "pl_eqt",
    "st_teff",
    "st_rad",
    "st_mass",
    "ra",
    "dec",
    "sy_dist",
    "default_flag",
];

const SYSTEM_COLUMNS: &[&str] = &[
    "hostname", "sy_snum", "sy_pnum", "sy_mnum", "st_teff", "st_rad", "st_mass", "st_met",
    "sy_dist", "ra", "dec", "default_flag",
];

const TESS_COLUMNS: &[&str] = &[
    "toi", "tic_id", "toipfx", "pl_name", "hostname", "pl_orbper", "pl_rade", "pl_eqt",
    "st_tmag", "ra", "dec", "tfopwg_disp",
];

const KEPLER_COLUMNS: &[&str] = &[
    "kepid", "kepoi_name", "koi_disposition", "koi_score", "koi_period", "koi_prad", "koi_teq",
    "koi_slogg", "ra", "dec",
];

const MICROLENSING_COLUMNS: &[&str] = &[
    "pl_name", "hostname", "discoverymethod", "disc_year", "pl_orbsmax", "pl_masse", "st_mass",
    "sy_dist", "ra", "dec",
];

/// Extra column filter applied by the planet presets.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = 'value'`
    Eq(FieldValue),
    /// `column in (...)`
    In(Vec<FieldValue>),
}

/// Confirmed planets, default parameter sets only.
pub fn confirmed_planets(filters: &[(&str, Filter)], limit: Option<u64>) -> QueryBuilder {
    let query = planets().where_confirmed().where_default_flag();
    finish(apply_filters(query, filters), limit)
}

pub fn candidate_planets(filters: &[(&str, Filter)], limit: Option<u64>) -> QueryBuilder {
    let query = planets().where_candidates();
    finish(apply_filters(query, filters), limit)
}

/// Planets with a measured mass in `[min_mass, max_mass]` Earth masses.
/// A `min_mass` of zero or below adds no lower bound.
pub fn planets_with_mass(min_mass: f64, max_mass: Option<f64>, limit: Option<u64>) -> QueryBuilder {
    let mut query = planets().where_has_mass().where_default_flag();
    if min_mass > 0.0 {
        query = query.and_where(format!("pl_masse >= {}", min_mass));
    }
    if let Some(max) = max_mass {
        query = query.and_where(format!("pl_masse <= {}", max));
    }
    finish(query, limit)
}

/// One row per host system, grouped on every selected column.
pub fn systems_overview(limit: Option<u64>) -> QueryBuilder {
    let query = QueryBuilder::new()
        .select(SYSTEM_COLUMNS.iter().copied())
        .from_table(TableName::PlanetarySystems)
        .where_default_flag()
        .group_by(SYSTEM_COLUMNS.iter().copied());
    finish(query, limit)
}

/// TESS objects of interest, optionally with one TFOPWG disposition.
pub fn tess_candidates(disposition: Option<&str>, limit: Option<u64>) -> QueryBuilder {
    let mut query = QueryBuilder::new()
        .select(TESS_COLUMNS.iter().copied())
        .from_table(TableName::TessToi);
    if let Some(disposition) = disposition {
        query = query.set_where(format!("tfopwg_disp = '{}'", disposition));
    }
    finish(query, limit)
}

/// Cumulative KOI table, optionally with one disposition.
pub fn kepler_objects(disposition: Option<&str>, limit: Option<u64>) -> QueryBuilder {
    let mut query = QueryBuilder::new()
        .select(KEPLER_COLUMNS.iter().copied())
        .from_table(TableName::KoiCumulative);
    if let Some(disposition) = disposition {
        query = query.set_where(format!("koi_disposition = '{}'", disposition));
    }
    finish(query, limit)
}

pub fn microlensing_events(limit: Option<u64>) -> QueryBuilder {
    let query = QueryBuilder::new()
        .select(MICROLENSING_COLUMNS.iter().copied())
        .from_table(TableName::Microlensing);
    finish(query, limit)
}

fn planets() -> QueryBuilder {
    QueryBuilder::new()
        .select(DEFAULT_PLANET_COLUMNS.iter().copied())
        .from_table(TableName::PlanetarySystems)
}

fn apply_filters(query: QueryBuilder, filters: &[(&str, Filter)]) -> QueryBuilder {
    filters.iter().fold(query, |query, (column, filter)| match filter {
        Filter::In(values) => query.where_in(column, values.iter().cloned()),
        Filter::Eq(value) => query.and_where(format!("{} = '{}'", column, value)),
    })
}

fn finish(query: QueryBuilder, limit: Option<u64>) -> QueryBuilder {
    match limit {
        Some(n) => query.limit(n),
        None => query,
    }
}
