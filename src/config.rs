use lazy_static::lazy_static;

use crate::constraints::NullsDistinct;
use crate::error::{DbError, DbResult};
use crate::value::{Collation, CompareMode};

pub const ENV_COLLATION: &str = "KEYGUARD_COLLATION";
pub const ENV_NULLS_DISTINCT: &str = "KEYGUARD_NULLS_DISTINCT";
pub const ENV_NULLS_CLAUSE: &str = "KEYGUARD_NULLS_CLAUSE";

/// When generated UNIQUE DDL carries its NULLS [NOT] DISTINCT clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullsClauseStyle {
    #[default]
    Always,
    IfNonDefault,
}

impl NullsClauseStyle {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "ALWAYS" | "ALWAYS_EMIT" => Some(NullsClauseStyle::Always),
            "IF_NON_DEFAULT" | "EMIT_IF_NONDEFAULT" | "IF_NONDEFAULT" => Some(NullsClauseStyle::IfNonDefault),
            _ => None,
        }
    }
}

/// Formatting choices frozen into objects that render their own DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SqlFormat {
    pub nulls_clause: NullsClauseStyle,
    pub default_nulls_distinct: NullsDistinct,
}

impl SqlFormat {
    pub fn emits_nulls_clause(&self, policy: NullsDistinct) -> bool {
        match self.nulls_clause {
            NullsClauseStyle::Always => true,
            NullsClauseStyle::IfNonDefault => policy != self.default_nulls_distinct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Schema every object is created in.
    pub schema: String,
    pub compare_mode: CompareMode,
    /// Policy for UNIQUE constraints declared without a NULLS clause.
    pub default_nulls_distinct: NullsDistinct,
    pub nulls_clause: NullsClauseStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            schema: "PUBLIC".to_string(),
            compare_mode: CompareMode::default(),
            default_nulls_distinct: NullsDistinct::Distinct,
            nulls_clause: NullsClauseStyle::Always,
        }
    }
}

lazy_static! {
    pub static ref DEFAULT_CONFIG: EngineConfig = EngineConfig::default();
}

impl EngineConfig {
    /// Defaults overridden by `KEYGUARD_*` environment variables.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let mut config = EngineConfig::default();
        if let Some(v) = lookup(ENV_COLLATION) {
            let collation = Collation::from_name(&v)
                .ok_or_else(|| DbError::InvalidValue(format!("{}={}", ENV_COLLATION, v)))?;
            config.compare_mode = CompareMode::new(collation);
        }
        if let Some(v) = lookup(ENV_NULLS_DISTINCT) {
            config.default_nulls_distinct = NullsDistinct::from_name(&v)
                .ok_or_else(|| DbError::InvalidValue(format!("{}={}", ENV_NULLS_DISTINCT, v)))?;
        }
        if let Some(v) = lookup(ENV_NULLS_CLAUSE) {
            config.nulls_clause = NullsClauseStyle::from_name(&v)
                .ok_or_else(|| DbError::InvalidValue(format!("{}={}", ENV_NULLS_CLAUSE, v)))?;
        }
        Ok(config)
    }

    pub fn with_collation(mut self, collation: Collation) -> Self {
        self.compare_mode = CompareMode::new(collation);
        self
    }

    pub fn with_nulls_distinct(mut self, policy: NullsDistinct) -> Self {
        self.default_nulls_distinct = policy;
        self
    }

    pub fn with_nulls_clause(mut self, style: NullsClauseStyle) -> Self {
        self.nulls_clause = style;
        self
    }

    pub fn sql_format(&self) -> SqlFormat {
        SqlFormat { nulls_clause: self.nulls_clause, default_nulls_distinct: self.default_nulls_distinct }
    }
}
