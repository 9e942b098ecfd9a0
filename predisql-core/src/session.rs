//! Generator and executor paired for typed CRUD

use crate::executor::Executor;
use crate::generator::QueryGenerator;
use crate::plan::QueryPlan;
use crate::predicate::Predicate;
use crate::row::FromRow;
use crate::{Entity, Error, Result, Value};

/// Runs generated plans through an executor and maps rows back into entities
#[derive(Debug, Clone)]
pub struct Session<E> {
    generator: QueryGenerator,
    executor: E,
}

impl<E: Executor> Session<E> {
    pub fn new(generator: QueryGenerator, executor: E) -> Self {
        Self {
            generator,
            executor,
        }
    }

    pub fn generator(&self) -> &QueryGenerator {
        &self.generator
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Fetch one entity by primary key
    pub async fn find<T>(&self, key: impl Into<Value>) -> Result<Option<T>>
    where
        T: Entity + FromRow,
    {
        let plan = self.generator.select_by_key::<T>(key)?;
        match self.executor.fetch_optional(&plan).await? {
            Some(row) => Ok(Some(T::from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn find_where<T>(&self, predicate: &Predicate<T>, limit: Option<u64>) -> Result<Vec<T>>
    where
        T: Entity + FromRow,
    {
        let plan = self.generator.select_where(predicate, limit)?;
        self.fetch(&plan).await
    }

    pub async fn all<T>(&self, limit: Option<u64>) -> Result<Vec<T>>
    where
        T: Entity + FromRow,
    {
        let plan = self.generator.select_all::<T>(limit)?;
        self.fetch(&plan).await
    }

    pub async fn count<T: Entity>(&self, predicate: Option<&Predicate<T>>) -> Result<u64> {
        let plan = self.generator.count(predicate)?;
        let row = self.executor.fetch_optional(&plan).await?;
        let count = row
            .as_ref()
            .and_then(|row| row.iter().next())
            .and_then(|(_, value)| value.as_i64())
            .and_then(|count| u64::try_from(count).ok());
        count.ok_or_else(|| Error::decode("COUNT(*)", "a non-negative integer", "no count"))
    }

    pub async fn insert<T: Entity>(&self, entity: &T) -> Result<u64> {
        let plan = self.generator.insert(entity)?;
        self.executor.execute(&plan).await
    }

    /// Insert every entity in one statement; an empty slice touches nothing
    pub async fn insert_many<T: Entity>(&self, entities: &[T]) -> Result<u64> {
        let plan = self.generator.insert_many(entities)?;
        if plan.is_noop() {
            return Ok(0);
        }
        self.executor.execute(&plan).await
    }

    pub async fn update<T: Entity>(&self, entity: &T) -> Result<u64> {
        let plan = self.generator.update(entity)?;
        self.executor.execute(&plan).await
    }

    pub async fn delete<T: Entity>(&self, entity: &T) -> Result<u64> {
        let plan = self.generator.delete(entity)?;
        self.executor.execute(&plan).await
    }

    pub async fn delete_by_key<T: Entity>(&self, key: impl Into<Value>) -> Result<u64> {
        let plan = self.generator.delete_by_key::<T>(key)?;
        self.executor.execute(&plan).await
    }

    pub async fn delete_where<T: Entity>(&self, predicate: &Predicate<T>) -> Result<u64> {
        let plan = self.generator.delete_where(predicate)?;
        self.executor.execute(&plan).await
    }

    pub async fn create_table<T: Entity>(&self) -> Result<()> {
        let plan = self.generator.create_table::<T>()?;
        self.executor.execute(&plan).await?;
        Ok(())
    }

    pub async fn drop_table<T: Entity>(&self) -> Result<()> {
        let plan = self.generator.drop_table::<T>()?;
        self.executor.execute(&plan).await?;
        Ok(())
    }

    async fn fetch<T: FromRow>(&self, plan: &QueryPlan) -> Result<Vec<T>> {
        self.executor
            .fetch_all(plan)
            .await?
            .iter()
            .map(T::from_row)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqlServer;
    use crate::predicate::field;
    use crate::row::Row;
    use crate::schema::{EntitySchema, FieldDef, SqlType};
    use std::sync::Mutex;

    #[derive(Debug, PartialEq)]
    struct User {
        id: i32,
        name: String,
    }

    impl Entity for User {
        fn schema() -> EntitySchema {
            EntitySchema::of::<Self>()
                .field(FieldDef::new("Id", SqlType::I32).primary_key())
                .field(FieldDef::new("Name", SqlType::String(Some(50))))
        }

        fn field_value(&self, property: &str) -> Option<Value> {
            match property {
                "Id" => Some(self.id.into()),
                "Name" => Some(self.name.as_str().into()),
                _ => None,
            }
        }
    }

    impl FromRow for User {
        fn from_row(row: &Row) -> Result<Self> {
            Ok(Self {
                id: row.try_get("Id")?,
                name: row.try_get("Name")?,
            })
        }
    }

    #[derive(Default)]
    struct MockExecutor {
        plans: Mutex<Vec<QueryPlan>>,
        rows: Vec<Row>,
    }

    impl MockExecutor {
        fn returning(rows: Vec<Row>) -> Self {
            Self {
                rows,
                ..Self::default()
            }
        }

        fn sql(&self) -> Vec<String> {
            self.plans.lock().unwrap().iter().map(|p| p.sql.clone()).collect()
        }
    }

    impl Executor for MockExecutor {
        async fn execute(&self, plan: &QueryPlan) -> Result<u64> {
            self.plans.lock().unwrap().push(plan.clone());
            Ok(plan.parameters.len() as u64)
        }

        async fn fetch_all(&self, plan: &QueryPlan) -> Result<Vec<Row>> {
            self.plans.lock().unwrap().push(plan.clone());
            Ok(self.rows.clone())
        }
    }

    fn session(rows: Vec<Row>) -> Session<MockExecutor> {
        Session::new(QueryGenerator::new(SqlServer), MockExecutor::returning(rows))
    }

    #[test]
    fn test_find_maps_row() {
        let session = session(vec![Row::new().with("Id", 42i64).with("Name", "Bob")]);
        let user: Option<User> = tokio_test::block_on(session.find(42)).unwrap();
        assert_eq!(
            user,
            Some(User {
                id: 42,
                name: "Bob".to_string()
            })
        );
        assert_eq!(session.executor().sql(), vec!["SELECT * FROM User WHERE Id = @Id"]);
    }

    #[test]
    fn test_find_missing_row() {
        let session = session(Vec::new());
        let user: Option<User> = tokio_test::block_on(session.find(1)).unwrap();
        assert!(user.is_none());
    }

    #[test]
    fn test_find_where_and_all() {
        let rows = vec![
            Row::new().with("Id", 1).with("Name", "a"),
            Row::new().with("Id", 2).with("Name", "b"),
        ];
        let session = session(rows);
        let predicate = Predicate::<User>::new(field("Id").gt(0));
        let users = tokio_test::block_on(session.find_where(&predicate, Some(2))).unwrap();
        assert_eq!(users.len(), 2);

        let users: Vec<User> = tokio_test::block_on(session.all(None)).unwrap();
        assert_eq!(users[1].name, "b");
        assert_eq!(
            session.executor().sql(),
            vec!["SELECT TOP(2) * FROM User WHERE Id > @p0", "SELECT * FROM User"]
        );
    }

    #[test]
    fn test_count() {
        let empty = session(Vec::new());
        let counting = session(vec![Row::new().with("", 3i64)]);
        let count = tokio_test::block_on(counting.count::<User>(None)).unwrap();
        assert_eq!(count, 3);

        let err = tokio_test::block_on(empty.count::<User>(None)).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_writes_go_through_executor() {
        let session = session(Vec::new());
        let bob = User {
            id: 7,
            name: "Bob".to_string(),
        };
        tokio_test::block_on(async {
            session.insert(&bob).await.unwrap();
            session.update(&bob).await.unwrap();
            session.delete(&bob).await.unwrap();
            session.delete_by_key::<User>(8).await.unwrap();
            session.create_table::<User>().await.unwrap();
        });
        assert_eq!(
            session.executor().sql(),
            vec![
                "INSERT INTO User (Id, Name) VALUES (@Id, @Name)",
                "UPDATE User SET Name = @Name WHERE Id = @Id",
                "DELETE FROM User WHERE Id = @Id",
                "DELETE FROM User WHERE Id = @Id",
                "CREATE TABLE User (Id INT NOT NULL PRIMARY KEY, Name NVARCHAR(50))",
            ]
        );
    }

    #[test]
    fn test_empty_insert_many_skips_executor() {
        let session = session(Vec::new());
        let affected = tokio_test::block_on(session.insert_many::<User>(&[])).unwrap();
        assert_eq!(affected, 0);
        assert!(session.executor().sql().is_empty());
    }

    #[test]
    fn test_generation_errors_stop_before_executor() {
        let session = session(Vec::new());
        let predicate = Predicate::<User>::new(field("Missing").eq(1));
        let result = tokio_test::block_on(session.delete_where(&predicate));
        assert!(matches!(result, Err(Error::Configuration { .. })));
        assert!(session.executor().sql().is_empty());
    }
}
