//! # exoquery
//!
//! ADQL queries for the NASA Exoplanet Archive, and normalization of the rows
//! that come back.
//!
//! ## Quick Example
//!
//! ```rust
//! use exoquery::prelude::*;
//!
//! let query = QueryBuilder::new()
//!     .select(["pl_name", "pl_masse"])
//!     .from_table(TableName::PlanetarySystems)
//!     .where_confirmed()
//!     .where_has_mass()
//!     .limit(10)
//!     .build()?;
//! assert_eq!(
//!     query,
//!     "SELECT TOP 10 pl_name,pl_masse FROM ps WHERE upper(soltype) like upper('%CONF%') AND pl_masse > 0"
//! );
//!
//! let rows = decode_json_rows(r#"[{"PL_NAME": "Kepler-442 b", "pl_masse": "2.3"}]"#)?;
//! let clean = TransformPipeline::new().transform_batch(&rows);
//! assert_eq!(clean[0]["pl_masse"], FieldValue::Float(2.3));
//! # Ok::<(), exoquery::error::ExoError>(())
//! ```
//!
//! ## Modules
//!
//! | Module      | Role                                           |
//! |-------------|------------------------------------------------|
//! | `builder`   | Fluent query builder and serializer            |
//! | `spatial`   | Circle / box / polygon containment predicates  |
//! | `transform` | Rule pipeline for record normalization         |
//! | `tap`       | Request URLs and the transport seam            |
//! | `load`      | Batching into record sinks                     |
//! | `config`    | TOML configuration                             |

pub mod builder;
pub mod config;
pub mod error;
pub mod load;
pub mod models;
pub mod presets;
pub mod spatial;
pub mod tap;
pub mod transform;
pub mod value;

pub mod prelude {
    pub use crate::builder::QueryBuilder;
    pub use crate::config::ExoConfig;
    pub use crate::error::*;
    pub use crate::load::{BatchLoader, JsonLinesSink, MemorySink, RecordSink};
    pub use crate::models::{DiscoveryMethod, OutputFormat, SolutionType, TableName};
    pub use crate::tap::{TapEndpoint, TapRequest, Transport, decode_json_rows, decode_rows};
    pub use crate::transform::{
        ColumnSelector, ExoplanetRules, RuleSet, TransformPipeline, TransformRule,
    };
    pub use crate::value::{FieldValue, Record};
}
