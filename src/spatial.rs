//! ADQL spatial predicates.
//!
//! Every function returns a `contains(point(...), <region>)=1` fragment that
//! can be passed straight to [`QueryBuilder::and_where`](crate::builder::QueryBuilder::and_where)
//! or the spatial convenience filters. Coordinates are degrees and are written
//! with Rust's default float formatting; round them first if the exact text
//! matters.

use crate::error::{ExoError, ExoResult};

/// Default coordinate frame used by the archive.
pub const ICRS: &str = "icrs";

/// Default search radius for [`near_object`], in degrees.
pub const DEFAULT_NEAR_RADIUS: f64 = 0.1;

/// Circular region centred on `(ra, dec)`.
///
/// ```
/// use exoquery::spatial::{circle, ICRS};
///
/// assert_eq!(
///     circle(217.42896, -62.67947, 0.1, ICRS),
///     "contains(point('icrs',ra,dec),circle('icrs',217.42896,-62.67947,0.1))=1"
/// );
/// ```
pub fn circle(ra: f64, dec: f64, radius: f64, coordinate_system: &str) -> String {
    contains(
        coordinate_system,
        &format!("circle('{}',{},{},{})", coordinate_system, ra, dec, radius),
    )
}

/// Axis-aligned box centred on `(ra, dec)`.
pub fn box_region(ra: f64, dec: f64, width: f64, height: f64, coordinate_system: &str) -> String {
    contains(
        coordinate_system,
        &format!(
            "box('{}',{},{},{},{})",
            coordinate_system, ra, dec, width, height
        ),
    )
}

/// Polygon through `vertices` given as `(ra, dec)` pairs.
///
/// Fails with [`ExoError::InvalidInput`] for fewer than three vertices.
pub fn polygon(vertices: &[(f64, f64)], coordinate_system: &str) -> ExoResult<String> {
    if vertices.len() < 3 {
        return Err(ExoError::InvalidInput(format!(
            "Polygon must have at least 3 vertices, got {}",
            vertices.len()
        )));
    }

    let coords: Vec<String> = vertices
        .iter()
        .map(|(ra, dec)| format!("{},{}", ra, dec))
        .collect();

    Ok(contains(
        coordinate_system,
        &format!("polygon('{}',{})", coordinate_system, coords.join(",")),
    ))
}

/// Circle around a known object position.
pub fn near_object(ra: f64, dec: f64, radius: Option<f64>) -> String {
    circle(ra, dec, radius.unwrap_or(DEFAULT_NEAR_RADIUS), ICRS)
}

fn contains(coordinate_system: &str, region: &str) -> String {
    format!(
        "contains(point('{}',ra,dec),{})=1",
        coordinate_system, region
    )
}
