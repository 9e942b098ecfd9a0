//! Predisql - typed predicates and entity metadata turned into parameterized SQL
//!
//! Predisql lowers predicate trees into injection-safe WHERE clauses and
//! generates the CRUD statements of an entity from its declared metadata.
//! Execution is left to an [`Executor`]; the sqlx adapters sit behind the
//! `sqlite` and `postgres` features.
//!
//! # Examples
//! ```
//! use predisql::{field, generator, predicate, Entity, EntitySchema, FieldDef, Postgres, SqlType, Value};
//!
//! struct Account {
//!     id: i64,
//!     owner: String,
//! }
//!
//! impl Entity for Account {
//!     fn schema() -> EntitySchema {
//!         EntitySchema::of::<Self>()
//!             .table("accounts")
//!             .field(FieldDef::new("Id", SqlType::I64).primary_key().auto_increment())
//!             .field(FieldDef::new("Owner", SqlType::String(Some(80))).column("owner_name"))
//!     }
//!
//!     fn field_value(&self, property: &str) -> Option<Value> {
//!         match property {
//!             "Id" => Some(self.id.into()),
//!             "Owner" => Some(self.owner.as_str().into()),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let generator = generator(Postgres);
//! let plan = generator
//!     .select_where(&predicate::<Account>(field("Owner").ne("root")), Some(20))
//!     .unwrap();
//! assert_eq!(plan.sql, "SELECT * FROM accounts WHERE owner_name <> @p0 LIMIT 20");
//!
//! let plan = generator.insert(&Account { id: 0, owner: "ann".into() }).unwrap();
//! assert_eq!(plan.sql, "INSERT INTO accounts (owner_name) VALUES (@owner_name)");
//! ```

pub use predisql_core::*;

/// Create a query generator for the given dialect
pub fn generator(dialect: impl Dialect + 'static) -> QueryGenerator {
    QueryGenerator::new(dialect)
}

/// Wrap an expression as a predicate over entity `T`
pub fn predicate<T: Entity>(expr: Expr) -> Predicate<T> {
    Predicate::new(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tag;

    impl Entity for Tag {
        fn schema() -> EntitySchema {
            EntitySchema::of::<Self>()
                .field(FieldDef::new("Id", SqlType::I32).primary_key())
                .field(FieldDef::new("Label", SqlType::String(Some(20))))
        }

        fn field_value(&self, _property: &str) -> Option<Value> {
            None
        }
    }

    #[test]
    fn test_facade_conveniences() {
        let plan = generator(MySql)
            .count(Some(&predicate::<Tag>(field("Label").in_list(["a", "b"]))))
            .unwrap();
        assert_eq!(plan.sql, "SELECT COUNT(*) FROM Tag WHERE Label IN (@p0, @p1)");
    }
}
