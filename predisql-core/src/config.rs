//! Dialects described by configuration instead of code
//!
//! # Examples
//! ```
//! use predisql_core::{ConfiguredDialect, Dialect};
//!
//! let dialect = ConfiguredDialect::from_json(r#"{
//!     "name": "h2",
//!     "limit_style": "limit",
//!     "functions": { "length": "CHAR_LENGTH" },
//!     "types": { "i32": "INT", "string": "VARCHAR({len})", "text": "CLOB" }
//! }"#).unwrap();
//!
//! assert_eq!(dialect.function_name("length").as_deref(), Some("CHAR_LENGTH"));
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dialect::{Dialect, IdentityClause, LimitClause};
use crate::metadata::ColumnMetadata;
use crate::schema::SqlType;
use crate::{Error, Result};

/// Row-limit syntax of a configured dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitStyle {
    /// `SELECT TOP(n) ...`
    Top,
    /// `... LIMIT n`
    Limit,
    /// `... FETCH FIRST n ROWS ONLY`
    FetchFirst,
}

fn default_parameter_prefix() -> String {
    "@".to_string()
}

/// Serializable description of a dialect
///
/// Type templates are keyed by `bool`, `i32`, `i64`, `f32`, `f64`,
/// `decimal`, `string`, `text`, `bytes`, `datetime` and `json`; the
/// placeholders `{len}`, `{precision}` and `{scale}` are substituted. An
/// unbounded string uses `text`, falling back to a `string` template that
/// does not mention `{len}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialectConfig {
    pub name: String,
    #[serde(default = "default_parameter_prefix")]
    pub parameter_prefix: String,
    pub limit_style: LimitStyle,
    #[serde(default)]
    pub functions: HashMap<String, String>,
    #[serde(default)]
    pub types: HashMap<String, String>,
    #[serde(default)]
    pub identity: Option<IdentityClause>,
}

/// A [`Dialect`] backed by a [`DialectConfig`]
#[derive(Debug, Clone)]
pub struct ConfiguredDialect {
    config: DialectConfig,
}

impl ConfiguredDialect {
    pub fn new(config: DialectConfig) -> Result<Self> {
        if config.name.trim().is_empty() {
            return Err(Error::configuration("dialect", "dialect name is empty"));
        }
        if config.parameter_prefix.is_empty() {
            return Err(Error::configuration(&config.name, "parameter prefix is empty"));
        }
        Ok(Self { config })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn config(&self) -> &DialectConfig {
        &self.config
    }

    fn template(&self, key: &str) -> Option<&str> {
        self.config.types.get(key).map(String::as_str)
    }
}

impl Dialect for ConfiguredDialect {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn parameter_prefix(&self) -> &str {
        &self.config.parameter_prefix
    }

    fn limit_clause(&self, limit: u64) -> LimitClause {
        match self.config.limit_style {
            LimitStyle::Top => LimitClause::AfterSelect(format!("TOP({limit})")),
            LimitStyle::Limit => LimitClause::Trailing(format!("LIMIT {limit}")),
            LimitStyle::FetchFirst => {
                LimitClause::Trailing(format!("FETCH FIRST {limit} ROWS ONLY"))
            }
        }
    }

    fn function_name(&self, logical: &str) -> Option<String> {
        self.config.functions.get(logical).cloned()
    }

    fn column_type(&self, column: &ColumnMetadata) -> Option<String> {
        let rendered = match column.sql_type {
            SqlType::Bool => self.template("bool")?.to_string(),
            SqlType::I32 => self.template("i32")?.to_string(),
            SqlType::I64 => self.template("i64")?.to_string(),
            SqlType::F32 => self.template("f32")?.to_string(),
            SqlType::F64 => self.template("f64")?.to_string(),
            SqlType::Decimal(precision, scale) => self
                .template("decimal")?
                .replace("{precision}", &precision.to_string())
                .replace("{scale}", &scale.to_string()),
            SqlType::String(Some(len)) => self.template("string")?.replace("{len}", &len.to_string()),
            SqlType::String(None) => match self.template("text") {
                Some(text) => text.to_string(),
                None => self
                    .template("string")
                    .filter(|t| !t.contains("{len}"))?
                    .to_string(),
            },
            SqlType::Bytes => self.template("bytes")?.to_string(),
            SqlType::DateTime => self.template("datetime")?.to_string(),
            SqlType::Json => self.template("json")?.to_string(),
        };
        Some(rendered)
    }

    fn identity_clause(&self) -> Option<IdentityClause> {
        self.config.identity.clone()
    }
}
