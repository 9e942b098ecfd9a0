//! Resolved table metadata and the per-type metadata cache

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::trace;

use crate::schema::{EntitySchema, ForeignKeyTarget, SqlType};
use crate::{Entity, Error, Result};

/// Resolved facts about one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    /// Property identifier used by predicates and [`Entity::field_value`]
    pub property: String,
    pub sql_name: String,
    /// Placeholder name derived from `sql_name`
    pub param_name: String,
    pub sql_type: SqlType,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
    pub ignore_on_insert: bool,
    pub ignore_on_update: bool,
    pub not_null: bool,
    pub foreign_key: Option<ForeignKeyTarget>,
}

/// A foreign-key relationship of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub local_column: String,
    pub target_table: String,
    pub target_column: String,
}

/// Resolved table shape of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    pub entity: String,
    pub table_name: String,
    pub columns: Vec<ColumnMetadata>,
}

impl TableMetadata {
    /// Validate a declared schema and resolve its columns
    pub fn from_schema(schema: EntitySchema) -> Result<Self> {
        let entity = schema.type_name.clone();
        let table_name = schema.table.unwrap_or_else(|| schema.type_name.clone());
        if table_name.trim().is_empty() {
            return Err(Error::configuration(&entity, "table name is empty"));
        }

        let mut properties = HashSet::new();
        let mut sql_names = HashSet::new();
        let mut param_names = HashSet::new();
        let mut columns = Vec::with_capacity(schema.fields.len());

        for field in schema.fields {
            if !schema.binding.admits(field.visibility) {
                continue;
            }
            if field.property.is_empty() {
                return Err(Error::configuration(&entity, "field with an empty property name"));
            }
            if !properties.insert(field.property.clone()) {
                return Err(Error::configuration(
                    &entity,
                    format!("property '{}' is declared twice", field.property),
                ));
            }

            let sql_name = field.column.unwrap_or_else(|| field.property.clone());
            if sql_name.trim().is_empty() {
                return Err(Error::configuration(
                    &entity,
                    format!("property '{}' maps to an empty column name", field.property),
                ));
            }
            if !sql_names.insert(sql_name.to_ascii_lowercase()) {
                return Err(Error::configuration(
                    &entity,
                    format!("column '{sql_name}' is declared twice"),
                ));
            }

            let param_name = parameter_name(&sql_name);
            if !param_names.insert(param_name.to_ascii_lowercase()) {
                return Err(Error::configuration(
                    &entity,
                    format!("column '{sql_name}' collides with another column's parameter name '{param_name}'"),
                ));
            }

            if let Some(target) = &field.foreign_key {
                if target.table.trim().is_empty() || target.column.trim().is_empty() {
                    return Err(Error::configuration(
                        &entity,
                        format!("foreign key on '{sql_name}' has an empty target"),
                    ));
                }
            }

            columns.push(ColumnMetadata {
                property: field.property,
                sql_name,
                param_name,
                sql_type: field.sql_type,
                is_primary_key: field.primary_key,
                is_auto_increment: field.auto_increment,
                ignore_on_insert: field.ignore_on_insert || field.auto_increment,
                ignore_on_update: field.ignore_on_update,
                not_null: field.not_null,
                foreign_key: field.foreign_key,
            });
        }

        if columns.is_empty() {
            return Err(Error::configuration(&entity, "no columns selected by the binding"));
        }

        Ok(Self {
            entity,
            table_name,
            columns,
        })
    }

    /// The single primary-key column
    pub fn primary_key(&self) -> Result<&ColumnMetadata> {
        let mut keys = self.columns.iter().filter(|c| c.is_primary_key);
        match (keys.next(), keys.next()) {
            (Some(key), None) => Ok(key),
            (None, _) => Err(Error::configuration(&self.entity, "no primary key declared")),
            (Some(_), Some(_)) => Err(Error::configuration(
                &self.entity,
                "more than one primary key declared",
            )),
        }
    }

    /// Column for a property identifier, falling back to the SQL name
    pub fn column(&self, property: &str) -> Option<&ColumnMetadata> {
        self.columns
            .iter()
            .find(|c| c.property == property)
            .or_else(|| self.columns.iter().find(|c| c.sql_name == property))
    }

    /// Columns written by INSERT
    pub fn insert_columns(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns.iter().filter(|c| !c.ignore_on_insert)
    }

    /// Columns written by the SET list of UPDATE
    pub fn update_columns(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns
            .iter()
            .filter(|c| !c.is_primary_key && !c.ignore_on_update)
    }

    pub fn foreign_keys(&self) -> Vec<ForeignKey> {
        self.columns
            .iter()
            .filter_map(|c| {
                c.foreign_key.as_ref().map(|target| ForeignKey {
                    local_column: c.sql_name.clone(),
                    target_table: target.table.clone(),
                    target_column: target.column.clone(),
                })
            })
            .collect()
    }
}

/// Placeholder-safe form of a column name
fn parameter_name(sql_name: &str) -> String {
    let mut name: String = sql_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

/// Cache of resolved metadata keyed by entity type
///
/// Hits read an immutable snapshot of the map without taking a lock. A miss
/// publishes a new snapshot; a concurrent miss may resolve the same type
/// twice, and the first resolved value to be stored is the one every caller
/// sees.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    tables: ArcSwap<HashMap<TypeId, Arc<TableMetadata>>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve (or fetch the cached) table metadata of `T`
    pub fn resolve_table<T: Entity>(&self) -> Result<Arc<TableMetadata>> {
        let key = TypeId::of::<T>();
        if let Some(table) = self.tables.load().get(&key) {
            return Ok(Arc::clone(table));
        }

        // schema() is user code, so resolve before publishing
        let resolved = Arc::new(TableMetadata::from_schema(T::schema())?);
        trace!(entity = %resolved.entity, table = %resolved.table_name, "resolved entity metadata");

        let mut stored = None;
        self.tables.rcu(|tables| {
            let mut next = (**tables).clone();
            let table = next.entry(key).or_insert_with(|| Arc::clone(&resolved));
            stored = Some(Arc::clone(table));
            next
        });
        Ok(stored.unwrap_or(resolved))
    }

    /// Columns of `T` in declaration order
    pub fn resolve_columns<T: Entity>(&self) -> Result<Vec<ColumnMetadata>> {
        Ok(self.resolve_table::<T>()?.columns.clone())
    }

    pub fn resolve_primary_key<T: Entity>(&self) -> Result<ColumnMetadata> {
        self.resolve_table::<T>()?.primary_key().cloned()
    }

    pub fn resolve_foreign_keys<T: Entity>(&self) -> Result<Vec<ForeignKey>> {
        Ok(self.resolve_table::<T>()?.foreign_keys())
    }

    /// Number of cached entity types
    pub fn len(&self) -> usize {
        self.tables.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
