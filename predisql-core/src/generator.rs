//! Metadata-driven CRUD statement generation
//!
//! A [`QueryGenerator`] turns an entity type plus a key, an instance or a
//! predicate into a [`QueryPlan`]. It never touches a database; plans are
//! handed to an [`Executor`](crate::Executor) or inspected directly.
//!
//! # Examples
//! ```
//! use predisql_core::{field, Entity, EntitySchema, FieldDef, Predicate, QueryGenerator, SqlServer, SqlType, Value};
//!
//! struct User {
//!     id: i32,
//!     name: String,
//! }
//!
//! impl Entity for User {
//!     fn schema() -> EntitySchema {
//!         EntitySchema::of::<Self>()
//!             .field(FieldDef::new("Id", SqlType::I32).primary_key())
//!             .field(FieldDef::new("Name", SqlType::String(Some(50))))
//!     }
//!
//!     fn field_value(&self, property: &str) -> Option<Value> {
//!         match property {
//!             "Id" => Some(self.id.into()),
//!             "Name" => Some(self.name.as_str().into()),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let generator = QueryGenerator::new(SqlServer);
//! let plan = generator.select_by_key::<User>(42).unwrap();
//! assert_eq!(plan.sql, "SELECT * FROM User WHERE Id = @Id");
//!
//! let bobs = Predicate::<User>::new(field("Name").starts_with("Bo"));
//! let plan = generator.select_where(&bobs, Some(10)).unwrap();
//! assert_eq!(plan.sql, "SELECT TOP(10) * FROM User WHERE Name LIKE @p0 ESCAPE '!'");
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::dialect::{Dialect, IdentityClause, LimitClause};
use crate::metadata::{ColumnMetadata, MetadataRegistry, TableMetadata};
use crate::plan::{Parameter, QueryPlan};
use crate::predicate::Predicate;
use crate::translator::{ExpressionTranslator, TranslatedPredicate};
use crate::{Entity, Error, Result, Value};

/// Builds [`QueryPlan`]s for entity types against one dialect
#[derive(Debug, Clone)]
pub struct QueryGenerator {
    registry: Arc<MetadataRegistry>,
    dialect: Arc<dyn Dialect>,
}

impl QueryGenerator {
    /// A generator with its own metadata registry
    pub fn new(dialect: impl Dialect + 'static) -> Self {
        Self::with_registry(Arc::new(dialect), Arc::new(MetadataRegistry::new()))
    }

    /// A generator sharing `registry` with other generators
    pub fn with_registry(dialect: Arc<dyn Dialect>, registry: Arc<MetadataRegistry>) -> Self {
        Self { registry, dialect }
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }

    /// `SELECT * FROM <table>`, optionally limited
    pub fn select_all<T: Entity>(&self, limit: Option<u64>) -> Result<QueryPlan> {
        let table = self.registry.resolve_table::<T>()?;
        let sql = self.select_sql(&table, "*", None, limit);
        Ok(self.plan(&table, sql, Vec::new()))
    }

    /// Select the row whose primary key equals `key`
    pub fn select_by_key<T: Entity>(&self, key: impl Into<Value>) -> Result<QueryPlan> {
        let table = self.registry.resolve_table::<T>()?;
        let (condition, parameter) = self.key_condition(&table, key.into())?;
        let sql = self.select_sql(&table, "*", Some(&condition), None);
        Ok(self.plan(&table, sql, vec![parameter]))
    }

    /// Select the rows matching `predicate`, optionally limited
    pub fn select_where<T: Entity>(
        &self,
        predicate: &Predicate<T>,
        limit: Option<u64>,
    ) -> Result<QueryPlan> {
        let table = self.registry.resolve_table::<T>()?;
        let translated = self.translate(&table, predicate)?;
        let sql = self.select_sql(&table, "*", Some(&translated.where_clause), limit);
        Ok(self.plan(&table, sql, translated.parameters))
    }

    /// `SELECT COUNT(*)` over the whole table or the rows matching `predicate`
    pub fn count<T: Entity>(&self, predicate: Option<&Predicate<T>>) -> Result<QueryPlan> {
        let table = self.registry.resolve_table::<T>()?;
        let (sql, parameters) = match predicate {
            Some(predicate) => {
                let translated = self.translate(&table, predicate)?;
                let sql = self.select_sql(&table, "COUNT(*)", Some(&translated.where_clause), None);
                (sql, translated.parameters)
            }
            None => (self.select_sql(&table, "COUNT(*)", None, None), Vec::new()),
        };
        Ok(self.plan(&table, sql, parameters))
    }

    /// Insert one instance; absent values are bound as NULL
    pub fn insert<T: Entity>(&self, entity: &T) -> Result<QueryPlan> {
        let table = self.registry.resolve_table::<T>()?;
        let columns = insertable(&table)?;
        let prefix = self.dialect.parameter_prefix();

        let mut sql = String::new();
        sql.push_str("INSERT INTO ");
        sql.push_str(&table.table_name);
        sql.push_str(" (");
        sql.push_str(&column_list(&columns));
        sql.push_str(") VALUES (");
        let placeholders: Vec<String> = columns
            .iter()
            .map(|c| format!("{prefix}{}", c.param_name))
            .collect();
        sql.push_str(&placeholders.join(", "));
        sql.push(')');

        let parameters = columns
            .iter()
            .map(|c| Parameter {
                name: c.param_name.clone(),
                value: value_of(entity, c),
            })
            .collect();
        Ok(self.plan(&table, sql, parameters))
    }

    /// Insert several instances in one statement
    ///
    /// Parameters are named `<column>_<row>`. An empty slice yields
    /// [`QueryPlan::noop`].
    pub fn insert_many<T: Entity>(&self, entities: &[T]) -> Result<QueryPlan> {
        let table = self.registry.resolve_table::<T>()?;
        let columns = insertable(&table)?;
        if entities.is_empty() {
            debug!(entity = %table.entity, "insert of zero rows, nothing to execute");
            return Ok(QueryPlan::noop());
        }
        let prefix = self.dialect.parameter_prefix();

        let mut sql = String::new();
        sql.push_str("INSERT INTO ");
        sql.push_str(&table.table_name);
        sql.push_str(" (");
        sql.push_str(&column_list(&columns));
        sql.push_str(") VALUES ");

        let mut parameters = Vec::with_capacity(entities.len() * columns.len());
        let mut groups = Vec::with_capacity(entities.len());
        for (row, entity) in entities.iter().enumerate() {
            let mut placeholders = Vec::with_capacity(columns.len());
            for column in &columns {
                let name = format!("{}_{row}", column.param_name);
                placeholders.push(format!("{prefix}{name}"));
                parameters.push(Parameter {
                    name,
                    value: value_of(entity, column),
                });
            }
            groups.push(format!("({})", placeholders.join(", ")));
        }
        sql.push_str(&groups.join(", "));

        Ok(self.plan(&table, sql, parameters))
    }

    /// Full-row update of the instance, keyed by its primary key
    pub fn update<T: Entity>(&self, entity: &T) -> Result<QueryPlan> {
        let table = self.registry.resolve_table::<T>()?;
        let key = table.primary_key()?;
        let columns: Vec<&ColumnMetadata> = table.update_columns().collect();
        if columns.is_empty() {
            return Err(Error::configuration(
                &table.entity,
                "no columns left to update besides the primary key",
            ));
        }
        let prefix = self.dialect.parameter_prefix();

        let mut sql = String::new();

        // UPDATE clause
        sql.push_str("UPDATE ");
        sql.push_str(&table.table_name);

        // SET clause
        sql.push_str(" SET ");
        let set_parts: Vec<String> = columns
            .iter()
            .map(|c| format!("{} = {prefix}{}", c.sql_name, c.param_name))
            .collect();
        sql.push_str(&set_parts.join(", "));

        // WHERE clause
        let (condition, key_parameter) = self.key_condition(&table, key_value(&table, key, entity)?)?;
        sql.push_str(" WHERE ");
        sql.push_str(&condition);

        let mut parameters: Vec<Parameter> = columns
            .iter()
            .map(|c| Parameter {
                name: c.param_name.clone(),
                value: value_of(entity, c),
            })
            .collect();
        parameters.push(key_parameter);
        Ok(self.plan(&table, sql, parameters))
    }

    /// Delete the row of the instance, by its primary key
    pub fn delete<T: Entity>(&self, entity: &T) -> Result<QueryPlan> {
        let table = self.registry.resolve_table::<T>()?;
        let key = key_value(&table, table.primary_key()?, entity)?;
        self.delete_keyed(&table, key)
    }

    pub fn delete_by_key<T: Entity>(&self, key: impl Into<Value>) -> Result<QueryPlan> {
        let table = self.registry.resolve_table::<T>()?;
        self.delete_keyed(&table, key.into())
    }

    /// Delete the rows matching `predicate`
    pub fn delete_where<T: Entity>(&self, predicate: &Predicate<T>) -> Result<QueryPlan> {
        let table = self.registry.resolve_table::<T>()?;
        let translated = self.translate(&table, predicate)?;
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            table.table_name, translated.where_clause
        );
        Ok(self.plan(&table, sql, translated.parameters))
    }

    /// `CREATE TABLE` using the dialect's own type mapping
    pub fn create_table<T: Entity>(&self) -> Result<QueryPlan> {
        let dialect = Arc::clone(&self.dialect);
        self.create_table_with::<T, _>(|column| dialect.column_type(column))
    }

    /// `CREATE TABLE` with column types chosen by `mapper`
    ///
    /// A column the mapper returns `None` for is a configuration error.
    pub fn create_table_with<T, F>(&self, mapper: F) -> Result<QueryPlan>
    where
        T: Entity,
        F: Fn(&ColumnMetadata) -> Option<String>,
    {
        let table = self.registry.resolve_table::<T>()?;
        let identity = self.dialect.identity_clause();

        let mut definitions = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let sql_type = mapper(column).ok_or_else(|| {
                Error::configuration(
                    &table.entity,
                    format!(
                        "no {} type for column '{}' of type {}",
                        self.dialect.name(),
                        column.sql_name,
                        column.sql_type
                    ),
                )
            })?;
            definitions.push(column_definition(column, &sql_type, identity.as_ref()));
        }
        for key in table.foreign_keys() {
            definitions.push(format!(
                "FOREIGN KEY ({}) REFERENCES {}({})",
                key.local_column, key.target_table, key.target_column
            ));
        }

        let sql = format!(
            "CREATE TABLE {} ({})",
            table.table_name,
            definitions.join(", ")
        );
        Ok(self.plan(&table, sql, Vec::new()))
    }

    pub fn drop_table<T: Entity>(&self) -> Result<QueryPlan> {
        let table = self.registry.resolve_table::<T>()?;
        let sql = format!("DROP TABLE {}", table.table_name);
        Ok(self.plan(&table, sql, Vec::new()))
    }

    fn delete_keyed(&self, table: &TableMetadata, key: Value) -> Result<QueryPlan> {
        let (condition, parameter) = self.key_condition(table, key)?;
        let sql = format!("DELETE FROM {} WHERE {condition}", table.table_name);
        Ok(self.plan(table, sql, vec![parameter]))
    }

    /// `<pk> = @<pk>` and its parameter
    fn key_condition(&self, table: &TableMetadata, key: Value) -> Result<(String, Parameter)> {
        let column = table.primary_key()?;
        let condition = format!(
            "{} = {}{}",
            column.sql_name,
            self.dialect.parameter_prefix(),
            column.param_name
        );
        Ok((condition, Parameter::new(column.param_name.clone(), key)))
    }

    fn translate<T: Entity>(
        &self,
        table: &TableMetadata,
        predicate: &Predicate<T>,
    ) -> Result<TranslatedPredicate> {
        ExpressionTranslator::new(table, self.dialect.as_ref()).translate(predicate)
    }

    fn select_sql(
        &self,
        table: &TableMetadata,
        projection: &str,
        condition: Option<&str>,
        limit: Option<u64>,
    ) -> String {
        let limit = limit.map(|n| self.dialect.limit_clause(n));
        let mut sql = String::from("SELECT ");

        if let Some(LimitClause::AfterSelect(top)) = &limit {
            sql.push_str(top);
            sql.push(' ');
        }
        sql.push_str(projection);
        sql.push_str(" FROM ");
        sql.push_str(&table.table_name);

        if let Some(condition) = condition {
            sql.push_str(" WHERE ");
            sql.push_str(condition);
        }
        if let Some(LimitClause::Trailing(trailing)) = &limit {
            sql.push(' ');
            sql.push_str(trailing);
        }
        sql
    }

    fn plan(&self, table: &TableMetadata, sql: String, parameters: Vec<Parameter>) -> QueryPlan {
        debug!(
            entity = %table.entity,
            sql = %sql,
            parameter_count = parameters.len(),
            "generated query plan"
        );
        QueryPlan::new(sql, parameters, self.dialect.parameter_prefix())
    }
}

fn insertable(table: &TableMetadata) -> Result<Vec<&ColumnMetadata>> {
    let columns: Vec<&ColumnMetadata> = table.insert_columns().collect();
    if columns.is_empty() {
        return Err(Error::configuration(&table.entity, "every column is ignored on insert"));
    }
    Ok(columns)
}

fn column_list(columns: &[&ColumnMetadata]) -> String {
    columns
        .iter()
        .map(|c| c.sql_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn value_of<T: Entity>(entity: &T, column: &ColumnMetadata) -> Value {
    entity.field_value(&column.property).unwrap_or(Value::Null)
}

fn key_value<T: Entity>(table: &TableMetadata, key: &ColumnMetadata, entity: &T) -> Result<Value> {
    match entity.field_value(&key.property) {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(Error::configuration(
            &table.entity,
            format!("instance has no value for primary key '{}'", key.property),
        )),
    }
}

fn column_definition(column: &ColumnMetadata, sql_type: &str, identity: Option<&IdentityClause>) -> String {
    let identity = identity.filter(|_| column.is_auto_increment);
    let mut definition = format!("{} {sql_type}", column.sql_name);

    if let Some(IdentityClause::AfterType(text)) = identity {
        definition.push(' ');
        definition.push_str(text);
    }
    if column.not_null || column.is_primary_key {
        definition.push_str(" NOT NULL");
    }
    if column.is_primary_key {
        definition.push_str(" PRIMARY KEY");
    }
    if let Some(IdentityClause::AfterPrimaryKey(text)) = identity {
        definition.push(' ');
        definition.push_str(text);
    }
    definition
}
