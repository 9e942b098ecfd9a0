//! Predisql Core - predicate-to-SQL translation and metadata-driven CRUD generation
//!
//! Entities describe their table once; a [`QueryGenerator`] turns keys,
//! instances and [`Predicate`]s into parameterized [`QueryPlan`]s for a chosen
//! [`Dialect`], and an [`Executor`] runs them.

pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod generator;
pub mod metadata;
pub mod operator;
pub mod plan;
pub mod predicate;
pub mod row;
pub mod schema;
pub mod session;
pub mod translator;
pub mod value;

// Re-export main types
pub use config::{ConfiguredDialect, DialectConfig, LimitStyle};
pub use dialect::{
    functions, Dialect, IdentityClause, LimitClause, MySql, Oracle, Postgres, SqlServer, Sqlite,
};
pub use error::{Error, Result};
pub use executor::Executor;
pub use generator::QueryGenerator;
pub use metadata::{ColumnMetadata, ForeignKey, MetadataRegistry, TableMetadata};
pub use operator::{ArithOp, CompareOp};
pub use plan::{Parameter, PlaceholderStyle, QueryPlan};
pub use predicate::{call, field, lit, Expr, Function, Predicate};
pub use row::{FromRow, Row};
pub use schema::{Binding, Entity, EntitySchema, FieldDef, ForeignKeyTarget, SqlType, Visibility};
pub use session::Session;
pub use translator::{ExpressionTranslator, TranslatedPredicate};
pub use value::{FromValue, Value};

#[cfg(feature = "postgres")]
pub use executor::postgres::PostgresExecutor;
#[cfg(feature = "sqlite")]
pub use executor::sqlite::SqliteExecutor;
