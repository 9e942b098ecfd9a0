//! Executor collaborator interface and sqlx-backed adapters
//!
//! An executor runs a [`QueryPlan`] and reports either the affected-row count
//! or the result rows. The generator never calls one itself; see
//! [`Session`](crate::Session) for the pairing of both.

use std::future::Future;

use crate::plan::QueryPlan;
use crate::row::Row;
use crate::Result;

/// Runs generated plans against a database
pub trait Executor: Send + Sync {
    /// Execute a statement that returns no rows (INSERT, UPDATE, DELETE, DDL)
    fn execute(&self, plan: &QueryPlan) -> impl Future<Output = Result<u64>> + Send;

    /// Execute a query and collect every row
    fn fetch_all(&self, plan: &QueryPlan) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Execute a query and keep the first row, if any
    fn fetch_optional(&self, plan: &QueryPlan) -> impl Future<Output = Result<Option<Row>>> + Send {
        async move { Ok(self.fetch_all(plan).await?.into_iter().next()) }
    }
}

#[cfg(feature = "sqlite")]
pub mod sqlite {
    use super::*;
    use crate::plan::PlaceholderStyle;
    use crate::value::DATETIME_FORMAT;
    use crate::{Error, Value};
    use sqlx::sqlite::{SqliteArguments, SqliteRow};
    use sqlx::{Column, Row as _, Sqlite, SqlitePool, TypeInfo, ValueRef};
    use tracing::debug;

    /// SQLite executor over a sqlx pool
    #[derive(Debug, Clone)]
    pub struct SqliteExecutor {
        inner: SqlitePool,
    }

    impl SqliteExecutor {
        /// Create a new SQLite pool from a connection string
        pub async fn connect(database_url: &str) -> Result<Self> {
            let pool = SqlitePool::connect(database_url).await?;
            Ok(Self { inner: pool })
        }

        /// Create from an existing SqlitePool
        pub fn from_pool(pool: SqlitePool) -> Self {
            Self { inner: pool }
        }

        pub fn pool(&self) -> &SqlitePool {
            &self.inner
        }
    }

    impl Executor for SqliteExecutor {
        async fn execute(&self, plan: &QueryPlan) -> Result<u64> {
            let (sql, values) = plan.bind_positional(PlaceholderStyle::QuestionMark)?;
            let query = bind_values_to_query(sqlx::query(&sql), &values);
            let result = query.execute(&self.inner).await?;
            debug!(sql = %sql, affected = result.rows_affected(), "executed statement");
            Ok(result.rows_affected())
        }

        async fn fetch_all(&self, plan: &QueryPlan) -> Result<Vec<Row>> {
            let (sql, values) = plan.bind_positional(PlaceholderStyle::QuestionMark)?;
            let query = bind_values_to_query(sqlx::query(&sql), &values);
            let rows = query.fetch_all(&self.inner).await?;
            debug!(sql = %sql, rows = rows.len(), "fetched rows");
            rows.iter().map(decode_row).collect()
        }
    }

    /// Bind values to a SQLite query; datetimes and JSON travel as text
    fn bind_values_to_query<'q>(
        mut query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
        params: &'q [Value],
    ) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
        for param in params {
            query = match param {
                Value::Null => query.bind(None::<i64>),
                Value::Bool(b) => query.bind(*b),
                Value::I32(i) => query.bind(*i),
                Value::I64(i) => query.bind(*i),
                Value::F32(f) => query.bind(*f),
                Value::F64(f) => query.bind(*f),
                Value::String(s) => query.bind(s.as_str()),
                Value::Bytes(b) => query.bind(b.as_slice()),
                Value::DateTime(dt) => query.bind(dt.format(DATETIME_FORMAT).to_string()),
                Value::Json(j) => query.bind(j.to_string()),
            };
        }
        query
    }

    fn decode_row(row: &SqliteRow) -> Result<Row> {
        let mut decoded = Row::new();
        for column in row.columns() {
            let index = column.ordinal();
            let raw = row.try_get_raw(index)?;
            let type_name = raw.type_info().name().to_string();
            let value = if raw.is_null() {
                Value::Null
            } else {
                match type_name.as_str() {
                    "INTEGER" | "INT" | "BIGINT" => Value::I64(row.try_get_unchecked(index)?),
                    "BOOLEAN" => Value::Bool(row.try_get_unchecked(index)?),
                    "REAL" | "FLOAT" | "DOUBLE" => Value::F64(row.try_get_unchecked(index)?),
                    "TEXT" | "DATETIME" | "DATE" | "TIME" => {
                        Value::String(row.try_get_unchecked(index)?)
                    }
                    "BLOB" => Value::Bytes(row.try_get_unchecked(index)?),
                    other => return Err(Error::decode(column.name(), "a SQLite storage class", other)),
                }
            };
            decoded.insert(column.name(), value);
        }
        Ok(decoded)
    }
}

#[cfg(feature = "postgres")]
pub mod postgres {
    use super::*;
    use crate::plan::PlaceholderStyle;
    use crate::{Error, Value};
    use sqlx::encode::IsNull;
    use sqlx::postgres::types::Oid;
    use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgRow, PgTypeInfo};
    use sqlx::{Column, PgPool, Postgres, Row as _, TypeInfo, ValueRef};
    use tracing::debug;

    /// PostgreSQL executor over a sqlx pool
    #[derive(Debug, Clone)]
    pub struct PostgresExecutor {
        inner: PgPool,
    }

    impl PostgresExecutor {
        /// Create a new PostgreSQL pool from a connection string
        pub async fn connect(database_url: &str) -> Result<Self> {
            let pool = PgPool::connect(database_url).await?;
            Ok(Self { inner: pool })
        }

        /// Create from an existing PgPool
        pub fn from_pool(pool: PgPool) -> Self {
            Self { inner: pool }
        }

        pub fn pool(&self) -> &PgPool {
            &self.inner
        }
    }

    impl Executor for PostgresExecutor {
        async fn execute(&self, plan: &QueryPlan) -> Result<u64> {
            let (sql, values) = plan.bind_positional(PlaceholderStyle::Numbered)?;
            let query = bind_values_to_query(sqlx::query(&sql), &values);
            let result = query.execute(&self.inner).await?;
            debug!(sql = %sql, affected = result.rows_affected(), "executed statement");
            Ok(result.rows_affected())
        }

        async fn fetch_all(&self, plan: &QueryPlan) -> Result<Vec<Row>> {
            let (sql, values) = plan.bind_positional(PlaceholderStyle::Numbered)?;
            let query = bind_values_to_query(sqlx::query(&sql), &values);
            let rows = query.fetch_all(&self.inner).await?;
            debug!(sql = %sql, rows = rows.len(), "fetched rows");
            rows.iter().map(decode_row).collect()
        }
    }

    /// NULL declared with the unspecified OID, so the server infers the
    /// parameter type from the column it is compared with or assigned to
    #[derive(Debug, Clone, Copy)]
    struct UntypedNull;

    impl sqlx::Type<Postgres> for UntypedNull {
        fn type_info() -> PgTypeInfo {
            PgTypeInfo::with_oid(Oid(0))
        }
    }

    impl<'q> sqlx::Encode<'q, Postgres> for UntypedNull {
        fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> IsNull {
            IsNull::Yes
        }
    }

    fn bind_values_to_query<'q>(
        mut query: sqlx::query::Query<'q, Postgres, PgArguments>,
        params: &'q [Value],
    ) -> sqlx::query::Query<'q, Postgres, PgArguments> {
        for param in params {
            query = match param {
                Value::Null => query.bind(UntypedNull),
                Value::Bool(b) => query.bind(*b),
                Value::I32(i) => query.bind(*i),
                Value::I64(i) => query.bind(*i),
                Value::F32(f) => query.bind(*f),
                Value::F64(f) => query.bind(*f),
                Value::String(s) => query.bind(s.as_str()),
                Value::Bytes(b) => query.bind(b.as_slice()),
                Value::DateTime(dt) => query.bind(*dt),
                Value::Json(j) => query.bind(j),
            };
        }
        query
    }

    fn decode_row(row: &PgRow) -> Result<Row> {
        let mut decoded = Row::new();
        for column in row.columns() {
            let index = column.ordinal();
            let raw = row.try_get_raw(index)?;
            let type_name = raw.type_info().name().to_string();
            let value = if raw.is_null() {
                Value::Null
            } else {
                match type_name.as_str() {
                    "BOOL" => Value::Bool(row.try_get(index)?),
                    "INT2" => Value::I32(i32::from(row.try_get::<i16, _>(index)?)),
                    "INT4" => Value::I32(row.try_get(index)?),
                    "INT8" => Value::I64(row.try_get(index)?),
                    "FLOAT4" => Value::F32(row.try_get(index)?),
                    "FLOAT8" => Value::F64(row.try_get(index)?),
                    "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Value::String(row.try_get(index)?),
                    "BYTEA" => Value::Bytes(row.try_get(index)?),
                    "TIMESTAMP" => Value::DateTime(row.try_get(index)?),
                    "JSON" | "JSONB" => Value::Json(row.try_get(index)?),
                    other => {
                        return Err(Error::decode(column.name(), "a supported PostgreSQL type", other))
                    }
                }
            };
            decoded.insert(column.name(), value);
        }
        Ok(decoded)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Parameter;
    use crate::{Error, Value};
    use std::sync::Mutex;

    // Records every plan and answers with canned rows
    #[derive(Default)]
    struct MockExecutor {
        executed: Mutex<Vec<QueryPlan>>,
        rows: Vec<Row>,
        should_fail: bool,
    }

    impl MockExecutor {
        fn with_rows(rows: Vec<Row>) -> Self {
            Self {
                rows,
                ..Self::default()
            }
        }

        fn with_failure() -> Self {
            Self {
                should_fail: true,
                ..Self::default()
            }
        }
    }

    impl Executor for MockExecutor {
        async fn execute(&self, plan: &QueryPlan) -> Result<u64> {
            if self.should_fail {
                return Err(Error::invalid_query("Mock execute failure"));
            }
            self.executed.lock().unwrap().push(plan.clone());
            Ok(1)
        }

        async fn fetch_all(&self, plan: &QueryPlan) -> Result<Vec<Row>> {
            if self.should_fail {
                return Err(Error::invalid_query("Mock fetch_all failure"));
            }
            self.executed.lock().unwrap().push(plan.clone());
            Ok(self.rows.clone())
        }
    }

    fn plan() -> QueryPlan {
        QueryPlan::new(
            "SELECT * FROM User WHERE Id = @Id".to_string(),
            vec![Parameter::new("Id", 1)],
            "@",
        )
    }

    #[test]
    fn test_execute_receives_plan() {
        let executor = MockExecutor::default();
        let affected = tokio_test::block_on(executor.execute(&plan())).unwrap();
        assert_eq!(affected, 1);
        assert_eq!(executor.executed.lock().unwrap()[0], plan());
    }

    #[test]
    fn test_fetch_optional_defaults_to_first_row() {
        let executor = MockExecutor::with_rows(vec![
            Row::new().with("Id", 1).with("Name", "John"),
            Row::new().with("Id", 2).with("Name", "Jane"),
        ]);
        let row = tokio_test::block_on(executor.fetch_optional(&plan()))
            .unwrap()
            .unwrap();
        assert_eq!(row.get("Name"), Some(&Value::from("John")));

        let empty = MockExecutor::default();
        assert!(tokio_test::block_on(empty.fetch_optional(&plan()))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_failures_propagate() {
        let executor = MockExecutor::with_failure();
        let result = tokio_test::block_on(executor.fetch_all(&plan()));
        assert!(result.unwrap_err().to_string().contains("Mock fetch_all failure"));
    }

    #[cfg(feature = "sqlite")]
    mod sqlite_tests {
        use super::super::sqlite::SqliteExecutor;
        use super::*;
        use sqlx::sqlite::SqlitePoolOptions;

        #[tokio::test]
        async fn test_round_trip_of_value_kinds() {
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await
                .unwrap();
            let executor = SqliteExecutor::from_pool(pool);

            let create = QueryPlan::new(
                "CREATE TABLE kinds (i INTEGER, r REAL, t TEXT, b BLOB, n TEXT)".to_string(),
                Vec::new(),
                "@",
            );
            executor.execute(&create).await.unwrap();

            let insert = QueryPlan::new(
                "INSERT INTO kinds (i, r, t, b, n) VALUES (@i, @r, @t, @b, @n)".to_string(),
                vec![
                    Parameter::new("i", 7i64),
                    Parameter::new("r", 1.5f64),
                    Parameter::new("t", "it's"),
                    Parameter::new("b", vec![1u8, 2, 3]),
                    Parameter::new("n", Value::Null),
                ],
                "@",
            );
            assert_eq!(executor.execute(&insert).await.unwrap(), 1);

            let select = QueryPlan::new("SELECT * FROM kinds".to_string(), Vec::new(), "@");
            let row = executor.fetch_optional(&select).await.unwrap().unwrap();
            assert_eq!(row.get("i"), Some(&Value::I64(7)));
            assert_eq!(row.get("r"), Some(&Value::F64(1.5)));
            assert_eq!(row.get("t"), Some(&Value::from("it's")));
            assert_eq!(row.get("b"), Some(&Value::Bytes(vec![1, 2, 3])));
            assert_eq!(row.get("n"), Some(&Value::Null));
        }
    }
}
