//! Column-name addressed result rows

use indexmap::IndexMap;

use crate::value::FromValue;
use crate::{Error, Result, Value};

/// A result row: column names in driver order, each mapped to its cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: IndexMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cell; a repeated column name replaces the earlier cell
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(column.into(), value.into());
    }

    /// Builder-style [`Row::insert`]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Look a cell up by exact name, then case-insensitively
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column).or_else(|| {
            self.columns
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(column))
                .map(|(_, value)| value)
        })
    }

    /// Decode the named cell; a missing column is a decode error
    pub fn try_get<V: FromValue>(&self, column: &str) -> Result<V> {
        match self.get(column) {
            Some(value) => V::decode(column, value),
            None => Err(Error::decode(column, V::expected(), "missing column")),
        }
    }

    /// Like [`Row::try_get`], but a missing column decodes as NULL
    pub fn try_get_or_null<V: FromValue>(&self, column: &str) -> Result<V> {
        V::decode(column, self.get(column).unwrap_or(&Value::Null))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Types that can be rebuilt from a [`Row`]
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(row.clone())
    }
}
