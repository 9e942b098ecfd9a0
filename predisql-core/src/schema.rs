//! Declarative entity descriptors
//!
//! An [`Entity`] describes its table once through an [`EntitySchema`]; the
//! [`MetadataRegistry`](crate::MetadataRegistry) validates that descriptor and
//! caches the resolved [`TableMetadata`](crate::TableMetadata).

use std::fmt::{self, Display};
use std::ops::BitOr;

use crate::Value;

/// A type that maps onto a single table
///
/// # Examples
/// ```
/// use predisql_core::{Entity, EntitySchema, FieldDef, SqlType, Value};
///
/// struct User {
///     id: i32,
///     name: String,
/// }
///
/// impl Entity for User {
///     fn schema() -> EntitySchema {
///         EntitySchema::of::<Self>()
///             .field(FieldDef::new("Id", SqlType::I32).primary_key())
///             .field(FieldDef::new("Name", SqlType::String(None)))
///     }
///
///     fn field_value(&self, property: &str) -> Option<Value> {
///         match property {
///             "Id" => Some(self.id.into()),
///             "Name" => Some(self.name.as_str().into()),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Entity: Send + Sync + 'static {
    /// The declared table shape; called once per registry
    fn schema() -> EntitySchema;

    /// Current value of the named property, `None` when the property is absent
    fn field_value(&self, property: &str) -> Option<Value>;
}

/// Logical column type, mapped to a dialect type name for DDL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Bool,
    I32,
    I64,
    F32,
    F64,
    /// Fixed-point number with precision and scale
    Decimal(u8, u8),
    /// Text with an optional maximum length
    String(Option<u32>),
    Bytes,
    DateTime,
    Json,
}

impl Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Bool => write!(f, "bool"),
            SqlType::I32 => write!(f, "i32"),
            SqlType::I64 => write!(f, "i64"),
            SqlType::F32 => write!(f, "f32"),
            SqlType::F64 => write!(f, "f64"),
            SqlType::Decimal(p, s) => write!(f, "decimal({p},{s})"),
            SqlType::String(Some(len)) => write!(f, "string({len})"),
            SqlType::String(None) => write!(f, "string"),
            SqlType::Bytes => write!(f, "bytes"),
            SqlType::DateTime => write!(f, "datetime"),
            SqlType::Json => write!(f, "json"),
        }
    }
}

/// Visibility of a declared field, matched against the schema's [`Binding`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    NonPublic,
}

/// Selects which declared fields count as columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding(u8);

impl Binding {
    pub const PUBLIC: Self = Binding(0b01);
    pub const NON_PUBLIC: Self = Binding(0b10);
    pub const ALL: Self = Binding(0b11);

    pub fn contains(self, other: Binding) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn admits(self, visibility: Visibility) -> bool {
        match visibility {
            Visibility::Public => self.contains(Binding::PUBLIC),
            Visibility::NonPublic => self.contains(Binding::NON_PUBLIC),
        }
    }
}

impl Default for Binding {
    fn default() -> Self {
        Binding::PUBLIC
    }
}

impl BitOr for Binding {
    type Output = Binding;

    fn bitor(self, rhs: Self) -> Self::Output {
        Binding(self.0 | rhs.0)
    }
}

/// Target of a foreign-key declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyTarget {
    pub table: String,
    pub column: String,
}

/// One declared property of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub(crate) property: String,
    pub(crate) column: Option<String>,
    pub(crate) sql_type: SqlType,
    pub(crate) visibility: Visibility,
    pub(crate) primary_key: bool,
    pub(crate) auto_increment: bool,
    pub(crate) ignore_on_insert: bool,
    pub(crate) ignore_on_update: bool,
    pub(crate) not_null: bool,
    pub(crate) foreign_key: Option<ForeignKeyTarget>,
}

impl FieldDef {
    /// A public field whose column name is the property name
    pub fn new(property: &str, sql_type: SqlType) -> Self {
        Self {
            property: property.to_string(),
            column: None,
            sql_type,
            visibility: Visibility::Public,
            primary_key: false,
            auto_increment: false,
            ignore_on_insert: false,
            ignore_on_update: false,
            not_null: false,
            foreign_key: None,
        }
    }

    /// Override the SQL column name
    pub fn column(mut self, name: &str) -> Self {
        self.column = Some(name.to_string());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Database-generated key; never written by INSERT
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self.ignore_on_insert = true;
        self
    }

    /// Skip the column in both INSERT and UPDATE
    pub fn ignore(self) -> Self {
        self.ignore_on_insert().ignore_on_update()
    }

    pub fn ignore_on_insert(mut self) -> Self {
        self.ignore_on_insert = true;
        self
    }

    pub fn ignore_on_update(mut self) -> Self {
        self.ignore_on_update = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn references(mut self, table: &str, column: &str) -> Self {
        self.foreign_key = Some(ForeignKeyTarget {
            table: table.to_string(),
            column: column.to_string(),
        });
        self
    }

    pub fn non_public(mut self) -> Self {
        self.visibility = Visibility::NonPublic;
        self
    }
}

/// Declared table shape of an entity type
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySchema {
    pub(crate) type_name: String,
    pub(crate) table: Option<String>,
    pub(crate) fields: Vec<FieldDef>,
    pub(crate) binding: Binding,
}

impl EntitySchema {
    /// Schema named after the simple name of `T`
    pub fn of<T: ?Sized>() -> Self {
        Self::named(simple_type_name(std::any::type_name::<T>()))
    }

    pub fn named(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            table: None,
            fields: Vec::new(),
            binding: Binding::default(),
        }
    }

    /// Override the table name, which otherwise is the type name
    pub fn table(mut self, name: &str) -> Self {
        self.table = Some(name.to_string());
        self
    }

    /// Declare the next field; declaration order is column order
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn binding(mut self, binding: Binding) -> Self {
        self.binding = binding;
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// `a::b::Wrapper<c::D>` -> `Wrapper`
fn simple_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
