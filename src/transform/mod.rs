//! Rule-based record normalization.
//!
//! A [`TransformPipeline`] holds an ordered list of [`TransformRule`]s. For
//! every field of every record the field name is canonicalized once, then
//! each rule whose selector matches (and whose condition holds for the
//! current value) rewrites the value in registration order.
//!
//! A rule that fails is recovered: a warning is logged and the value stays
//! what it was before that rule. Later rules still run, and nothing escapes
//! [`TransformPipeline::transform_record`] or
//! [`TransformPipeline::transform_batch`].
//!
//! ```
//! use exoquery::transform::TransformPipeline;
//! use exoquery::value::{FieldValue, Record};
//!
//! let pipeline = TransformPipeline::new();
//! let mut raw = Record::new();
//! raw.insert("PL_MASSE".into(), "2.3".into());
//! raw.insert("Empty Field".into(), "N/A".into());
//!
//! let out = pipeline.transform_record(&raw);
//! assert_eq!(out["pl_masse"], FieldValue::Float(2.3));
//! assert_eq!(out["empty_field"], FieldValue::Null);
//! ```

pub mod exoplanet;
pub mod rules;

use std::fmt;
use std::sync::Arc;

use crate::error::ExoResult;
use crate::value::{FieldValue, Record};

pub use exoplanet::ExoplanetRules;
pub use rules::canonicalize_name;

/// Value function of a rule.
pub type TransformFn = dyn Fn(&FieldValue) -> ExoResult<FieldValue> + Send + Sync;

/// Gate evaluated against the current value before a rule runs.
pub type ConditionFn = dyn Fn(&FieldValue) -> bool + Send + Sync;

/// Which fields a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    All,
    /// One canonical field name.
    Exact(String),
}

impl ColumnSelector {
    /// Selector for one column; the name is canonicalized.
    pub fn exact(column: &str) -> Self {
        ColumnSelector::Exact(canonicalize_name(column))
    }

    pub fn matches(&self, canonical_name: &str) -> bool {
        match self {
            ColumnSelector::All => true,
            ColumnSelector::Exact(name) => name == canonical_name,
        }
    }
}

/// Result of offering one value to one rule.
#[derive(Debug)]
pub enum RuleOutcome {
    /// The rule ran and produced a new value.
    Applied(FieldValue),
    /// Selector or condition did not match.
    Skipped,
    /// The rule failed; the value is left as it was.
    Recovered(crate::error::ExoError),
}

/// One normalization step.
#[derive(Clone)]
pub struct TransformRule {
    selector: ColumnSelector,
    transform: Arc<TransformFn>,
    condition: Option<Arc<ConditionFn>>,
    description: String,
}

impl TransformRule {
    pub fn new<F>(selector: ColumnSelector, description: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&FieldValue) -> ExoResult<FieldValue> + Send + Sync + 'static,
    {
        Self {
            selector,
            transform: Arc::new(transform),
            condition: None,
            description: description.into(),
        }
    }

    /// Only run when `condition` holds for the current value.
    pub fn when<C>(mut self, condition: C) -> Self
    where
        C: Fn(&FieldValue) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    pub fn selector(&self) -> &ColumnSelector {
        &self.selector
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Offer `value` of the canonical field `field` to this rule.
    pub fn apply(&self, field: &str, value: &FieldValue) -> RuleOutcome {
        if !self.selector.matches(field) {
            return RuleOutcome::Skipped;
        }
        if let Some(condition) = &self.condition {
            if !condition(value) {
                return RuleOutcome::Skipped;
            }
        }
        match (self.transform)(value) {
            Ok(v) => RuleOutcome::Applied(v),
            Err(e) => RuleOutcome::Recovered(e),
        }
    }
}

impl fmt::Debug for TransformRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRule")
            .field("selector", &self.selector)
            .field("conditional", &self.condition.is_some())
            .field("description", &self.description)
            .finish()
    }
}

/// A group of rules layered onto a pipeline through its public hooks.
pub trait RuleSet {
    fn apply(&self, pipeline: &mut TransformPipeline);
}

/// Ordered collection of transform rules.
///
/// Configure once, then share: transforming never mutates the rule list, and
/// records are independent of each other, so batches can be split across
/// threads as long as each record goes through [`transform_record`](Self::transform_record).
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    rules: Vec<TransformRule>,
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformPipeline {
    /// Pipeline with the default rules: null folding, then numeric coercion.
    /// Field names are always canonicalized before any rule runs.
    pub fn new() -> Self {
        let mut pipeline = Self::empty();
        pipeline.add_rule(TransformRule::new(
            ColumnSelector::All,
            "Convert null sentinels to null",
            rules::fold_null,
        ));
        pipeline.add_rule(
            TransformRule::new(
                ColumnSelector::All,
                "Convert numeric strings to numbers",
                rules::coerce_numeric,
            )
            .when(|v| matches!(v, FieldValue::String(_))),
        );
        pipeline
    }

    /// Pipeline without any value rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Default rules plus the exoplanet archive rules.
    pub fn exoplanet() -> Self {
        Self::new().with_rules(&ExoplanetRules)
    }

    /// Layer a rule set on top of the current rules.
    pub fn with_rules(mut self, rule_set: &dyn RuleSet) -> Self {
        rule_set.apply(&mut self);
        self
    }

    pub fn rules(&self) -> &[TransformRule] {
        &self.rules
    }

    pub fn add_rule(&mut self, rule: TransformRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    /// Multiply numeric values of `column` by `factor`.
    pub fn add_unit_conversion(&mut self, column: &str, factor: f64) -> &mut Self {
        self.add_rule(TransformRule::new(
            ColumnSelector::exact(column),
            format!("Scale {} by {}", column, factor),
            move |v| rules::scale(v, factor),
        ))
    }

    /// Parse string values of `column` into timestamps.
    pub fn add_date_parsing(&mut self, column: &str, format: Option<&str>) -> &mut Self {
        let format = format.map(str::to_string);
        self.add_rule(TransformRule::new(
            ColumnSelector::exact(column),
            format!("Parse dates in {}", column),
            move |v| rules::parse_date(v, format.as_deref()),
        ))
    }

    /// Replace values of `column` through a lookup table.
    pub fn add_categorical_mapping<I, K, V>(&mut self, column: &str, mapping: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<FieldValue>,
        V: Into<FieldValue>,
    {
        let mapping: Vec<(FieldValue, FieldValue)> = mapping
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.add_rule(TransformRule::new(
            ColumnSelector::exact(column),
            format!("Map categorical values in {}", column),
            move |v| rules::map_category(v, &mapping),
        ))
    }

    /// Fold every rule over one value of the canonical field `field`.
    pub fn transform_value(&self, field: &str, value: FieldValue) -> FieldValue {
        self.rules
            .iter()
            .fold(value, |current, rule| match rule.apply(field, &current) {
                RuleOutcome::Applied(next) => next,
                RuleOutcome::Skipped => current,
                RuleOutcome::Recovered(err) => {
                    tracing::warn!(
                        field = field,
                        rule = rule.description(),
                        value_type = current.type_name(),
                        "Transform error for {}: {}",
                        field,
                        err
                    );
                    current
                }
            })
    }

    /// Normalize one record. Keys of the result are canonical names.
    pub fn transform_record(&self, record: &Record) -> Record {
        record
            .iter()
            .map(|(key, value)| {
                let name = canonicalize_name(key);
                let value = self.transform_value(&name, value.clone());
                (name, value)
            })
            .collect()
    }

    /// Normalize each record independently.
    pub fn transform_batch(&self, records: &[Record]) -> Vec<Record> {
        let out: Vec<Record> = records.iter().map(|r| self.transform_record(r)).collect();
        tracing::debug!("Transformed batch of {} records", out.len());
        out
    }
}
