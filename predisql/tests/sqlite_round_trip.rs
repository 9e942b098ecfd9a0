use predisql::{
    field, generator, predicate, Entity, EntitySchema, Error, FieldDef, FromRow, Result, Row,
    Session, SqlType, Sqlite, SqliteExecutor, Value,
};
use sqlx::sqlite::SqlitePoolOptions;

#[derive(Debug, Clone, PartialEq)]
struct Person {
    id: i32,
    name: String,
    email: Option<String>,
    age: i32,
    active: bool,
    score: f64,
}

impl Entity for Person {
    fn schema() -> EntitySchema {
        EntitySchema::of::<Self>()
            .field(FieldDef::new("Id", SqlType::I32).primary_key())
            .field(FieldDef::new("Name", SqlType::String(Some(60))).not_null())
            .field(FieldDef::new("Email", SqlType::String(None)).column("email_address"))
            .field(FieldDef::new("Age", SqlType::I32))
            .field(FieldDef::new("Active", SqlType::Bool))
            .field(FieldDef::new("Score", SqlType::F64))
    }

    fn field_value(&self, property: &str) -> Option<Value> {
        match property {
            "Id" => Some(self.id.into()),
            "Name" => Some(self.name.as_str().into()),
            "Email" => Some(self.email.clone().into()),
            "Age" => Some(self.age.into()),
            "Active" => Some(self.active.into()),
            "Score" => Some(self.score.into()),
            _ => None,
        }
    }
}

impl FromRow for Person {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.try_get("Id")?,
            name: row.try_get("Name")?,
            email: row.try_get("email_address")?,
            age: row.try_get("Age")?,
            active: row.try_get("Active")?,
            score: row.try_get("Score")?,
        })
    }
}

fn person(id: i32, name: &str, email: Option<&str>, age: i32, active: bool) -> Person {
    Person {
        id,
        name: name.to_string(),
        email: email.map(str::to_string),
        age,
        active,
        score: f64::from(age) / 4.0,
    }
}

async fn session() -> Session<SqliteExecutor> {
    // one connection, so every statement sees the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let session = Session::new(generator(Sqlite), SqliteExecutor::from_pool(pool));
    session.create_table::<Person>().await.unwrap();
    session
}

async fn seeded() -> Session<SqliteExecutor> {
    let session = session().await;
    let people = [
        person(1, "Alice", Some("alice@example.com"), 34, true),
        person(2, "Bob", None, 27, true),
        person(3, "a_b", None, 41, false),
        person(4, "axb", Some("axb@example.com"), 19, false),
    ];
    assert_eq!(session.insert_many(&people).await.unwrap(), 4);
    session
}

#[tokio::test]
async fn test_insert_then_select_by_key() {
    let session = session().await;
    let alice = person(1, "Alice", Some("alice@example.com"), 34, true);

    assert_eq!(session.insert(&alice).await.unwrap(), 1);
    let found: Option<Person> = session.find(1).await.unwrap();
    assert_eq!(found, Some(alice));

    let missing: Option<Person> = session.find(99).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_insert_many_and_count() {
    let session = seeded().await;
    assert_eq!(session.count::<Person>(None).await.unwrap(), 4);

    let inactive = predicate::<Person>(!field("Active"));
    assert_eq!(session.count(Some(&inactive)).await.unwrap(), 2);

    assert_eq!(session.insert_many::<Person>(&[]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_null_comparisons() {
    let session = seeded().await;

    let no_email = predicate::<Person>(field("Email").is_null());
    let mut ids: Vec<i32> = session
        .find_where(&no_email, None)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec![2, 3]);

    let with_email = predicate::<Person>(field("Email").is_not_null());
    assert_eq!(session.count(Some(&with_email)).await.unwrap(), 2);
}

#[tokio::test]
async fn test_like_wildcards_match_literally() {
    let session = seeded().await;

    let underscore = predicate::<Person>(field("Name").contains("_"));
    let found = session.find_where(&underscore, None).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "a_b");

    let prefix = predicate::<Person>(field("Name").starts_with("Al"));
    assert_eq!(session.count(Some(&prefix)).await.unwrap(), 1);
}

#[tokio::test]
async fn test_hostile_literals_are_bound() {
    let session = seeded().await;

    let hostile = predicate::<Person>(field("Name").eq("x'; DROP TABLE Person; --"));
    assert!(session.find_where(&hostile, None).await.unwrap().is_empty());
    assert_eq!(session.count::<Person>(None).await.unwrap(), 4);
}

#[tokio::test]
async fn test_functions_arithmetic_and_lists() {
    let session = seeded().await;

    let long_names = predicate::<Person>(field("Name").len().gt(3));
    let found = session.find_where(&long_names, None).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Alice");

    let next_year = predicate::<Person>((field("Age") + predisql::lit(1)).ge(35));
    assert_eq!(session.count(Some(&next_year)).await.unwrap(), 2);

    let chosen = predicate::<Person>(field("Id").in_list([2, 4, 8]));
    assert_eq!(session.count(Some(&chosen)).await.unwrap(), 2);

    let limited = predicate::<Person>(field("Active").or(field("Age").lt(30)));
    assert_eq!(session.find_where(&limited, Some(2)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_update_replaces_the_row() {
    let session = seeded().await;

    let mut bob = person(2, "Robert", Some("bob@example.com"), 28, false);
    bob.score = 9.5;
    assert_eq!(session.update(&bob).await.unwrap(), 1);

    let found: Option<Person> = session.find(2).await.unwrap();
    assert_eq!(found, Some(bob));
}

#[tokio::test]
async fn test_deletes() {
    let session = seeded().await;

    let inactive = predicate::<Person>(field("Active").eq(false));
    assert_eq!(session.delete_where(&inactive).await.unwrap(), 2);

    let alice = person(1, "Alice", None, 34, true);
    assert_eq!(session.delete(&alice).await.unwrap(), 1);
    assert_eq!(session.delete_by_key::<Person>(2).await.unwrap(), 1);
    assert_eq!(session.delete_by_key::<Person>(2).await.unwrap(), 0);

    let rest: Vec<Person> = session.all(None).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_generation_errors_surface_before_execution() {
    let session = seeded().await;

    let reversed = predicate::<Person>(predisql::call("reverse", vec![field("Name")]).eq("bob"));
    let err = session.find_where(&reversed, None).await.unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedFunction { ref function, ref dialect } if function == "reverse" && dialect == "sqlite"
    ));

    let unknown = predicate::<Person>(field("Nickname").eq("bobby"));
    let err = session.delete_where(&unknown).await.unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
    assert_eq!(session.count::<Person>(None).await.unwrap(), 4);
}

#[tokio::test]
async fn test_drop_table() {
    let session = session().await;
    session.drop_table::<Person>().await.unwrap();

    let err = session.count::<Person>(None).await.unwrap_err();
    assert!(matches!(err, Error::Database(_)));
}
