//! Dialect injection points
//!
//! Every generator is built with an explicit [`Dialect`]. The dialect decides
//! the three things that differ between database products: how a row limit is
//! written, what a logical function is called, and which type name a column
//! gets in `CREATE TABLE`. It also picks the placeholder prefix.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::metadata::ColumnMetadata;
use crate::schema::SqlType;

/// Logical function names understood by [`Dialect::function_name`]
pub mod functions {
    pub const LENGTH: &str = "length";
    pub const UPPER: &str = "upper";
    pub const LOWER: &str = "lower";
    pub const TRIM: &str = "trim";
    pub const ABS: &str = "abs";
    pub const ROUND: &str = "round";
    pub const COALESCE: &str = "coalesce";
    pub const SUBSTRING: &str = "substring";
    pub const REVERSE: &str = "reverse";
}

/// Where a row-limit fragment goes in a SELECT
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitClause {
    /// Directly after `SELECT`, e.g. `TOP(10)`
    AfterSelect(String),
    /// At the end of the statement, e.g. `LIMIT 10`
    Trailing(String),
}

/// Where an auto-increment marker goes in a column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "position", content = "text", rename_all = "snake_case")]
pub enum IdentityClause {
    /// Right after the type name, before constraints
    AfterType(String),
    /// After `PRIMARY KEY`
    AfterPrimaryKey(String),
}

/// A target database's SQL flavour
pub trait Dialect: Send + Sync + Debug {
    /// Identifier used in diagnostics
    fn name(&self) -> &str;

    /// Prefix written before each parameter name
    fn parameter_prefix(&self) -> &str {
        "@"
    }

    fn limit_clause(&self, limit: u64) -> LimitClause;

    /// Dialect spelling of a logical function, `None` when unsupported
    fn function_name(&self, logical: &str) -> Option<String>;

    /// Dialect type name of a column, `None` when the type has no mapping
    fn column_type(&self, column: &ColumnMetadata) -> Option<String>;

    /// Auto-increment marker, `None` when the type mapping already covers it
    fn identity_clause(&self) -> Option<IdentityClause>;
}

fn shared_function(logical: &str) -> Option<&'static str> {
    match logical {
        functions::UPPER => Some("UPPER"),
        functions::LOWER => Some("LOWER"),
        functions::TRIM => Some("TRIM"),
        functions::ABS => Some("ABS"),
        functions::ROUND => Some("ROUND"),
        functions::COALESCE => Some("COALESCE"),
        _ => None,
    }
}

/// Microsoft SQL Server
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServer;

impl Dialect for SqlServer {
    fn name(&self) -> &str {
        "sqlserver"
    }

    fn limit_clause(&self, limit: u64) -> LimitClause {
        LimitClause::AfterSelect(format!("TOP({limit})"))
    }

    fn function_name(&self, logical: &str) -> Option<String> {
        let name = match logical {
            functions::LENGTH => "LEN",
            functions::SUBSTRING => "SUBSTRING",
            functions::REVERSE => "REVERSE",
            other => shared_function(other)?,
        };
        Some(name.to_string())
    }

    fn column_type(&self, column: &ColumnMetadata) -> Option<String> {
        let name = match column.sql_type {
            SqlType::Bool => "BIT".to_string(),
            SqlType::I32 => "INT".to_string(),
            SqlType::I64 => "BIGINT".to_string(),
            SqlType::F32 => "REAL".to_string(),
            SqlType::F64 => "FLOAT".to_string(),
            SqlType::Decimal(p, s) => format!("DECIMAL({p},{s})"),
            SqlType::String(Some(len)) => format!("NVARCHAR({len})"),
            SqlType::String(None) | SqlType::Json => "NVARCHAR(MAX)".to_string(),
            SqlType::Bytes => "VARBINARY(MAX)".to_string(),
            SqlType::DateTime => "DATETIME2".to_string(),
        };
        Some(name)
    }

    fn identity_clause(&self) -> Option<IdentityClause> {
        Some(IdentityClause::AfterPrimaryKey("IDENTITY(1,1)".to_string()))
    }
}

/// PostgreSQL
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &str {
        "postgres"
    }

    fn limit_clause(&self, limit: u64) -> LimitClause {
        LimitClause::Trailing(format!("LIMIT {limit}"))
    }

    fn function_name(&self, logical: &str) -> Option<String> {
        let name = match logical {
            functions::LENGTH => "LENGTH",
            functions::SUBSTRING => "SUBSTRING",
            functions::REVERSE => "REVERSE",
            other => shared_function(other)?,
        };
        Some(name.to_string())
    }

    fn column_type(&self, column: &ColumnMetadata) -> Option<String> {
        let name = match (column.sql_type, column.is_auto_increment) {
            (SqlType::I32, true) => "SERIAL".to_string(),
            (SqlType::I64, true) => "BIGSERIAL".to_string(),
            (SqlType::Bool, _) => "BOOLEAN".to_string(),
            (SqlType::I32, _) => "INTEGER".to_string(),
            (SqlType::I64, _) => "BIGINT".to_string(),
            (SqlType::F32, _) => "REAL".to_string(),
            (SqlType::F64, _) => "DOUBLE PRECISION".to_string(),
            (SqlType::Decimal(p, s), _) => format!("NUMERIC({p},{s})"),
            (SqlType::String(Some(len)), _) => format!("VARCHAR({len})"),
            (SqlType::String(None), _) => "TEXT".to_string(),
            (SqlType::Bytes, _) => "BYTEA".to_string(),
            (SqlType::DateTime, _) => "TIMESTAMP".to_string(),
            (SqlType::Json, _) => "JSONB".to_string(),
        };
        Some(name)
    }

    fn identity_clause(&self) -> Option<IdentityClause> {
        None
    }
}

/// MySQL and MariaDB
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &str {
        "mysql"
    }

    fn limit_clause(&self, limit: u64) -> LimitClause {
        LimitClause::Trailing(format!("LIMIT {limit}"))
    }

    fn function_name(&self, logical: &str) -> Option<String> {
        let name = match logical {
            functions::LENGTH => "CHAR_LENGTH",
            functions::SUBSTRING => "SUBSTRING",
            functions::REVERSE => "REVERSE",
            other => shared_function(other)?,
        };
        Some(name.to_string())
    }

    fn column_type(&self, column: &ColumnMetadata) -> Option<String> {
        let name = match column.sql_type {
            SqlType::Bool => "TINYINT(1)".to_string(),
            SqlType::I32 => "INT".to_string(),
            SqlType::I64 => "BIGINT".to_string(),
            SqlType::F32 => "FLOAT".to_string(),
            SqlType::F64 => "DOUBLE".to_string(),
            SqlType::Decimal(p, s) => format!("DECIMAL({p},{s})"),
            SqlType::String(Some(len)) => format!("VARCHAR({len})"),
            SqlType::String(None) => "TEXT".to_string(),
            SqlType::Bytes => "LONGBLOB".to_string(),
            SqlType::DateTime => "DATETIME".to_string(),
            SqlType::Json => "JSON".to_string(),
        };
        Some(name)
    }

    fn identity_clause(&self) -> Option<IdentityClause> {
        Some(IdentityClause::AfterPrimaryKey("AUTO_INCREMENT".to_string()))
    }
}

/// SQLite
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn limit_clause(&self, limit: u64) -> LimitClause {
        LimitClause::Trailing(format!("LIMIT {limit}"))
    }

    fn function_name(&self, logical: &str) -> Option<String> {
        let name = match logical {
            functions::LENGTH => "LENGTH",
            functions::SUBSTRING => "SUBSTR",
            other => shared_function(other)?,
        };
        Some(name.to_string())
    }

    fn column_type(&self, column: &ColumnMetadata) -> Option<String> {
        let name = match column.sql_type {
            SqlType::Bool | SqlType::I32 | SqlType::I64 => "INTEGER",
            SqlType::F32 | SqlType::F64 => "REAL",
            SqlType::Decimal(_, _) => "NUMERIC",
            SqlType::String(_) | SqlType::DateTime | SqlType::Json => "TEXT",
            SqlType::Bytes => "BLOB",
        };
        Some(name.to_string())
    }

    fn identity_clause(&self) -> Option<IdentityClause> {
        Some(IdentityClause::AfterPrimaryKey("AUTOINCREMENT".to_string()))
    }
}

/// Oracle Database 12c and later
#[derive(Debug, Clone, Copy, Default)]
pub struct Oracle;

impl Dialect for Oracle {
    fn name(&self) -> &str {
        "oracle"
    }

    fn parameter_prefix(&self) -> &str {
        ":"
    }

    fn limit_clause(&self, limit: u64) -> LimitClause {
        LimitClause::Trailing(format!("FETCH FIRST {limit} ROWS ONLY"))
    }

    fn function_name(&self, logical: &str) -> Option<String> {
        let name = match logical {
            functions::LENGTH => "LENGTH",
            functions::SUBSTRING => "SUBSTR",
            other => shared_function(other)?,
        };
        Some(name.to_string())
    }

    fn column_type(&self, column: &ColumnMetadata) -> Option<String> {
        let name = match column.sql_type {
            SqlType::Bool => "NUMBER(1)".to_string(),
            SqlType::I32 => "NUMBER(10)".to_string(),
            SqlType::I64 => "NUMBER(19)".to_string(),
            SqlType::F32 => "BINARY_FLOAT".to_string(),
            SqlType::F64 => "BINARY_DOUBLE".to_string(),
            SqlType::Decimal(p, s) => format!("NUMBER({p},{s})"),
            SqlType::String(Some(len)) => format!("VARCHAR2({len})"),
            SqlType::String(None) | SqlType::Json => "CLOB".to_string(),
            SqlType::Bytes => "BLOB".to_string(),
            SqlType::DateTime => "TIMESTAMP".to_string(),
        };
        Some(name)
    }

    fn identity_clause(&self) -> Option<IdentityClause> {
        Some(IdentityClause::AfterType(
            "GENERATED BY DEFAULT AS IDENTITY".to_string(),
        ))
    }
}
