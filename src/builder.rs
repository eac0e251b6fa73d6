//! Fluent ADQL query builder.
//!
//! Clauses are collected in a [`QueryModel`] and serialized by
//! [`QueryBuilder::build`]. The chaining rules matter for the final string:
//!
//! - [`set_where`](QueryBuilder::set_where) replaces every condition added so far.
//! - [`and_where`](QueryBuilder::and_where) / [`or_where`](QueryBuilder::or_where)
//!   always append, prefixed with `AND ` / `OR `.
//! - The `where_*` filters append with `AND` when a condition already exists
//!   and otherwise become the first condition.
//!
//! ```
//! use exoquery::builder::QueryBuilder;
//! use exoquery::models::TableName;
//!
//! let query = QueryBuilder::new()
//!     .select(["pl_name", "pl_masse", "ra", "dec"])
//!     .from_table(TableName::PlanetarySystems)
//!     .set_where("pl_masse > 0.5")
//!     .and_where("pl_masse < 2.0")
//!     .order_by("pl_masse", false)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     query,
//!     "SELECT pl_name,pl_masse,ra,dec FROM ps WHERE pl_masse > 0.5 AND pl_masse < 2.0 ORDER BY pl_masse DESC"
//! );
//! ```

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::{ExoError, ExoResult};
use crate::models::DiscoveryMethod;
use crate::spatial;
use crate::value::FieldValue;

/// Characters left as-is by [`QueryBuilder::to_url_encoded`].
const QUERY_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'+')
    .remove(b',')
    .remove(b'=');

/// Radius ceiling, in Earth radii, used by [`QueryBuilder::where_earth_sized`] callers.
pub const EARTH_SIZED_MAX_RADIUS: f64 = 1.8;

/// Clause state of one query under construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryModel {
    pub select_columns: Vec<String>,
    pub from_table: Option<String>,
    /// Stored with the `AND `/`OR ` prefix of the call that added them.
    pub where_conditions: Vec<String>,
    pub group_by_columns: Vec<String>,
    pub having_condition: Option<String>,
    pub order_by_clause: Option<String>,
    pub limit_count: Option<u64>,
}

/// Fluent builder for ADQL queries against the Exoplanet Archive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    model: QueryModel,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The clauses collected so far.
    pub fn model(&self) -> &QueryModel {
        &self.model
    }

    /// Set the columns to select, replacing any earlier selection.
    ///
    /// A `"*"` entry is kept verbatim.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model.select_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Select every column.
    pub fn select_all(self) -> Self {
        self.select(["*"])
    }

    /// Select `count(column) as count`.
    pub fn count(mut self, column: &str) -> Self {
        self.model.select_columns = vec![format!("count({}) as count", column)];
        self
    }

    /// Select distinct values; the first column is wrapped in `distinct(...)`.
    pub fn distinct<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model.select_columns = columns
            .into_iter()
            .enumerate()
            .map(|(i, col)| {
                let col = col.into();
                if i == 0 { format!("distinct({})", col) } else { col }
            })
            .collect();
        self
    }

    /// Set the table to query, replacing any earlier table.
    pub fn from_table(mut self, table: impl Into<String>) -> Self {
        self.model.from_table = Some(table.into());
        self
    }

    /// Replace all conditions with `condition`.
    ///
    /// Anything added earlier through `and_where`, `or_where` or the
    /// `where_*` filters is discarded.
    pub fn set_where(mut self, condition: impl Into<String>) -> Self {
        self.model.where_conditions = vec![condition.into()];
        self
    }

    /// Append `AND condition`, even when no condition exists yet.
    pub fn and_where(mut self, condition: impl AsRef<str>) -> Self {
        self.model
            .where_conditions
            .push(format!("AND {}", condition.as_ref()));
        self
    }

    /// Append `OR condition`, even when no condition exists yet.
    pub fn or_where(mut self, condition: impl AsRef<str>) -> Self {
        self.model
            .where_conditions
            .push(format!("OR {}", condition.as_ref()));
        self
    }

    /// `and_where` when a condition exists, otherwise `set_where`.
    fn push_filter(self, condition: String) -> Self {
        if self.model.where_conditions.is_empty() {
            self.set_where(condition)
        } else {
            self.and_where(condition)
        }
    }

    /// `column between min and max`
    pub fn where_between(self, column: &str, min: f64, max: f64) -> Self {
        self.push_filter(format!("{} between {} and {}", column, min, max))
    }

    /// `column in (...)`; string values are single-quoted.
    pub fn where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        let formatted: Vec<String> = values.into_iter().map(|v| literal(&v.into())).collect();
        self.push_filter(format!("{} in ({})", column, formatted.join(",")))
    }

    /// `column like 'pattern'`, optionally upper-casing both sides.
    pub fn where_like(self, column: &str, pattern: &str, case_insensitive: bool) -> Self {
        let condition = if case_insensitive {
            format!("upper({}) like upper('{}')", column, pattern)
        } else {
            format!("{} like '{}'", column, pattern)
        };
        self.push_filter(condition)
    }

    /// Confirmed planets only.
    pub fn where_confirmed(self) -> Self {
        self.where_like("soltype", "%CONF%", true)
    }

    /// Candidate planets only.
    pub fn where_candidates(self) -> Self {
        self.where_like("soltype", "%CAND%", true)
    }

    pub fn where_discovery_method(self, method: DiscoveryMethod) -> Self {
        self.where_discovery_method_str(method.as_str())
    }

    /// Discovery method given as free text, for values outside [`DiscoveryMethod`].
    pub fn where_discovery_method_str(self, method: &str) -> Self {
        self.push_filter(format!("discoverymethod = '{}'", method))
    }

    /// Default parameter sets only.
    pub fn where_default_flag(self) -> Self {
        self.push_filter("default_flag=1".to_string())
    }

    pub fn where_has_mass(self) -> Self {
        self.push_filter("pl_masse > 0".to_string())
    }

    pub fn where_has_radius(self) -> Self {
        self.push_filter("pl_rade > 0".to_string())
    }

    /// Planets no larger than `max_radius` Earth radii.
    /// [`EARTH_SIZED_MAX_RADIUS`] is the usual ceiling.
    pub fn where_earth_sized(self, max_radius: f64) -> Self {
        self.push_filter(format!("pl_rade <= {}", max_radius))
    }

    /// Objects inside a circle, in ICRS degrees.
    pub fn where_spatial_circle(self, ra: f64, dec: f64, radius: f64) -> Self {
        self.push_filter(spatial::circle(ra, dec, radius, spatial::ICRS))
    }

    /// Objects inside a box, in ICRS degrees.
    pub fn where_spatial_box(self, ra: f64, dec: f64, width: f64, height: f64) -> Self {
        self.push_filter(spatial::box_region(ra, dec, width, height, spatial::ICRS))
    }

    /// Order by one column, replacing any earlier ordering.
    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "ASC" } else { "DESC" };
        self.model.order_by_clause = Some(format!("ORDER BY {} {}", column, direction));
        self
    }

    /// Cap the number of rows. Rendered as `SELECT TOP n`.
    pub fn limit(mut self, count: u64) -> Self {
        self.model.limit_count = Some(count);
        self
    }

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model.group_by_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn having(mut self, condition: impl Into<String>) -> Self {
        self.model.having_condition = Some(condition.into());
        self
    }

    /// Render the ADQL query.
    ///
    /// Fails when no columns are selected or no table is set; the builder is
    /// left untouched either way. Condition fragments are embedded as given.
    pub fn build(&self) -> ExoResult<String> {
        self.model.to_adql()
    }

    /// The built query with spaces turned into `+` and the rest
    /// percent-encoded, as the TAP `query` parameter expects.
    pub fn to_url_encoded(&self) -> ExoResult<String> {
        let query = self.build()?.replace(' ', "+");
        Ok(utf8_percent_encode(&query, QUERY_SAFE).to_string())
    }
}

impl QueryModel {
    fn to_adql(&self) -> ExoResult<String> {
        if self.select_columns.is_empty() {
            return Err(ExoError::missing("SELECT columns"));
        }
        let table = match self.from_table.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => return Err(ExoError::missing("FROM table")),
        };

        let mut parts: Vec<String> = Vec::new();

        let columns = self.select_columns.join(",");
        match self.limit_count {
            Some(n) if n > 0 => parts.push(format!("SELECT TOP {} {}", n, columns)),
            _ => parts.push(format!("SELECT {}", columns)),
        }

        parts.push(format!("FROM {}", table));

        if let Some((first, rest)) = self.where_conditions.split_first() {
            let first = first
                .strip_prefix("AND ")
                .or_else(|| first.strip_prefix("OR "))
                .unwrap_or(first);
            let mut clause = first.to_string();
            if !rest.is_empty() {
                clause.push(' ');
                clause.push_str(&rest.join(" "));
            }
            parts.push(format!("WHERE {}", clause));
        }

        if !self.group_by_columns.is_empty() {
            parts.push(format!("GROUP BY {}", self.group_by_columns.join(",")));
        }

        if let Some(having) = self.having_condition.as_deref().filter(|h| !h.is_empty()) {
            parts.push(format!("HAVING {}", having));
        }

        if let Some(order) = &self.order_by_clause {
            parts.push(order.clone());
        }

        let query = parts.join(" ");
        tracing::debug!("Built ADQL: {}", query);
        Ok(query)
    }
}

/// ADQL literal for an `in (...)` list.
fn literal(value: &FieldValue) -> String {
    match value {
        FieldValue::String(s) => format!("'{}'", s),
        FieldValue::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TableName;
    use pretty_assertions::assert_eq;

    fn base() -> QueryBuilder {
        QueryBuilder::new().select_all().from_table("ps")
    }

    #[test]
    fn test_basic_select() {
        let query = QueryBuilder::new()
            .select(["pl_name", "pl_masse"])
            .from_table(TableName::PlanetarySystems)
            .build()
            .unwrap();
        assert_eq!(query, "SELECT pl_name,pl_masse FROM ps");
    }

    #[test]
    fn test_select_all() {
        assert_eq!(base().build().unwrap(), "SELECT * FROM ps");
    }

    #[test]
    fn test_build_shape() {
        for (cols, table) in [(vec!["a"], "ps"), (vec!["a", "b", "c"], "toi"), (vec!["*"], "ml")] {
            let query = QueryBuilder::new().select(cols).from_table(table).build().unwrap();
            assert!(query.starts_with("SELECT"));
            assert_eq!(query.matches(&format!("FROM {}", table)).count(), 1);
        }
    }

    #[test]
    fn test_missing_select() {
        let builder = QueryBuilder::new().from_table("ps");
        assert!(matches!(builder.build(), Err(ExoError::Validation(_))));
        // Builder is still usable after a failed build.
        assert_eq!(builder.select_all().build().unwrap(), "SELECT * FROM ps");
    }

    #[test]
    fn test_missing_from() {
        let err = QueryBuilder::new().select_all().build().unwrap_err();
        assert_eq!(err.to_string(), "Validation error: FROM table must be specified");
    }

    #[test]
    fn test_where_and_where() {
        let query = base()
            .set_where("pl_masse > 0.5")
            .and_where("pl_masse < 2.0")
            .build()
            .unwrap();
        assert_eq!(query, "SELECT * FROM ps WHERE pl_masse > 0.5 AND pl_masse < 2.0");
    }

    #[test]
    fn test_set_where_replaces_everything() {
        let query = base()
            .set_where("a>1")
            .and_where("b<2")
            .set_where("c=3")
            .build()
            .unwrap();
        assert_eq!(query, "SELECT * FROM ps WHERE c=3");
        assert!(!query.contains("a>1"));
        assert!(!query.contains("b<2"));
    }

    #[test]
    fn test_set_where_discards_filters() {
        let query = base()
            .where_confirmed()
            .where_has_mass()
            .set_where("pl_rade < 2")
            .build()
            .unwrap();
        assert_eq!(query, "SELECT * FROM ps WHERE pl_rade < 2");
    }

    #[test]
    fn test_and_where_first_strips_prefix() {
        let query = base().and_where("x=1").build().unwrap();
        assert_eq!(query, "SELECT * FROM ps WHERE x=1");
    }

    #[test]
    fn test_or_where_first_strips_prefix() {
        let query = base().or_where("x=1").or_where("y=2").build().unwrap();
        assert_eq!(query, "SELECT * FROM ps WHERE x=1 OR y=2");
    }

    #[test]
    fn test_stored_prefixes_kept() {
        let builder = base().and_where("x=1").or_where("y=2");
        assert_eq!(builder.model().where_conditions, vec!["AND x=1", "OR y=2"]);
        // Serialization does not consume state.
        assert_eq!(builder.build().unwrap(), builder.build().unwrap());
    }

    #[test]
    fn test_filters_dispatch_on_existing_conditions() {
        let first = base().where_has_mass().build().unwrap();
        assert_eq!(first, "SELECT * FROM ps WHERE pl_masse > 0");

        let query = base()
            .where_has_mass()
            .where_has_radius()
            .where_earth_sized(EARTH_SIZED_MAX_RADIUS)
            .build()
            .unwrap();
        assert_eq!(
            query,
            "SELECT * FROM ps WHERE pl_masse > 0 AND pl_rade > 0 AND pl_rade <= 1.8"
        );
    }

    #[test]
    fn test_filter_after_or_where_appends() {
        let query = base().or_where("a=1").where_default_flag().build().unwrap();
        assert_eq!(query, "SELECT * FROM ps WHERE a=1 AND default_flag=1");
    }

    #[test]
    fn test_between() {
        let query = QueryBuilder::new()
            .select(["pl_name"])
            .from_table("ps")
            .where_between("pl_masse", 0.5, 2.0)
            .build()
            .unwrap();
        assert_eq!(query, "SELECT pl_name FROM ps WHERE pl_masse between 0.5 and 2");
    }

    #[test]
    fn test_where_in_quotes_strings() {
        let query = base()
            .where_in("hostname", ["Kepler-442", "TRAPPIST-1"])
            .where_in("disc_year", [2016, 2017])
            .build()
            .unwrap();
        assert_eq!(
            query,
            "SELECT * FROM ps WHERE hostname in ('Kepler-442','TRAPPIST-1') AND disc_year in (2016,2017)"
        );
    }

    #[test]
    fn test_like() {
        let query = base().where_like("pl_name", "Kepler%", false).build().unwrap();
        assert_eq!(query, "SELECT * FROM ps WHERE pl_name like 'Kepler%'");
    }

    #[test]
    fn test_confirmed_and_candidates() {
        let confirmed = base().where_confirmed().build().unwrap();
        assert_eq!(confirmed, "SELECT * FROM ps WHERE upper(soltype) like upper('%CONF%')");
        let candidates = base().where_candidates().build().unwrap();
        assert!(candidates.ends_with("upper(soltype) like upper('%CAND%')"));
    }

    #[test]
    fn test_discovery_method() {
        let query = QueryBuilder::new()
            .select(["pl_name"])
            .from_table("ps")
            .where_discovery_method(DiscoveryMethod::Transit)
            .build()
            .unwrap();
        assert_eq!(query, "SELECT pl_name FROM ps WHERE discoverymethod = 'Transit'");
    }

    #[test]
    fn test_spatial_filters() {
        let query = base()
            .where_default_flag()
            .where_spatial_circle(217.42896, -62.67947, 0.1)
            .build()
            .unwrap();
        assert_eq!(
            query,
            "SELECT * FROM ps WHERE default_flag=1 AND contains(point('icrs',ra,dec),circle('icrs',217.42896,-62.67947,0.1))=1"
        );

        let boxed = base().where_spatial_box(10.0, 20.0, 1.5, 2.5).build().unwrap();
        assert_eq!(
            boxed,
            "SELECT * FROM ps WHERE contains(point('icrs',ra,dec),box('icrs',10,20,1.5,2.5))=1"
        );
    }

    #[test]
    fn test_order_by_overwrites() {
        let query = base()
            .set_where("default_flag = 1")
            .order_by("pl_name", true)
            .order_by("pl_masse", false)
            .build()
            .unwrap();
        assert_eq!(query, "SELECT * FROM ps WHERE default_flag = 1 ORDER BY pl_masse DESC");
    }

    #[test]
    fn test_limit_folds_into_select() {
        let query = QueryBuilder::new()
            .select(["a", "b"])
            .from_table("ps")
            .limit(10)
            .build()
            .unwrap();
        assert_eq!(query, "SELECT TOP 10 a,b FROM ps");
        assert!(!query.to_uppercase().contains("LIMIT"));
    }

    #[test]
    fn test_count() {
        let query = QueryBuilder::new()
            .count("pl_name")
            .from_table("ps")
            .set_where("default_flag = 1")
            .build()
            .unwrap();
        assert_eq!(query, "SELECT count(pl_name) as count FROM ps WHERE default_flag = 1");
    }

    #[test]
    fn test_distinct() {
        let query = QueryBuilder::new()
            .distinct(["hostname", "sy_dist"])
            .from_table("ps")
            .build()
            .unwrap();
        assert_eq!(query, "SELECT distinct(hostname),sy_dist FROM ps");
    }

    #[test]
    fn test_full_clause_order() {
        let query = QueryBuilder::new()
            .select(["discoverymethod", "count(*) as n"])
            .from_table("ps")
            .limit(5)
            .order_by("n", false)
            .having("count(*) > 10")
            .group_by(["discoverymethod"])
            .where_default_flag()
            .build()
            .unwrap();
        assert_eq!(
            query,
            "SELECT TOP 5 discoverymethod,count(*) as n FROM ps WHERE default_flag=1 GROUP BY discoverymethod HAVING count(*) > 10 ORDER BY n DESC"
        );
    }

    #[test]
    fn test_empty_having_is_skipped() {
        let query = base().group_by(["hostname"]).having("").build().unwrap();
        assert_eq!(query, "SELECT * FROM ps GROUP BY hostname");
    }

    #[test]
    fn test_url_encoded() {
        let encoded = base().set_where("pl_masse > 0.5").to_url_encoded().unwrap();
        assert_eq!(encoded, "SELECT+%2A+FROM+ps+WHERE+pl_masse+%3E+0.5");
    }

    #[test]
    fn test_url_encoded_keeps_plus_and_comma() {
        let encoded = QueryBuilder::new()
            .select(["a", "b"])
            .from_table("ps")
            .set_where("x=1")
            .to_url_encoded()
            .unwrap();
        assert_eq!(encoded, "SELECT+a,b+FROM+ps+WHERE+x=1");

        let quoted = base().where_like("soltype", "%CONF%", true).to_url_encoded().unwrap();
        assert!(quoted.contains("upper%28%27%25CONF%25%27%29"));
    }

    #[test]
    fn test_url_encoded_propagates_validation() {
        assert!(QueryBuilder::new().to_url_encoded().is_err());
    }
}
