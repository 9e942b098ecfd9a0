//! Generated SQL and its parameter bindings

use serde::{Deserialize, Serialize};

use crate::{Error, Result, Value};

/// A named, driver-agnostic parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Name without the dialect prefix
    pub name: String,
    pub value: Value,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Placeholder syntax of a positional driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` (SQLite, MySQL, ODBC)
    QuestionMark,
    /// `$1, $2, ...` (PostgreSQL)
    Numbered,
}

/// SQL text with its ordered parameters; the sole contract with an executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub sql: String,
    pub parameters: Vec<Parameter>,
    prefix: String,
}

impl QueryPlan {
    pub fn new(sql: String, parameters: Vec<Parameter>, prefix: &str) -> Self {
        Self {
            sql,
            parameters,
            prefix: prefix.to_string(),
        }
    }

    /// A plan with nothing to execute
    pub fn noop() -> Self {
        Self {
            sql: String::new(),
            parameters: Vec::new(),
            prefix: String::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.sql.is_empty()
    }

    /// Prefix marking placeholders in `sql`
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// Rewrite named placeholders into positional ones
    ///
    /// Values are returned in the order their placeholders appear in the
    /// text; a name used twice is bound twice. Quoted text is left alone.
    pub fn bind_positional(&self, style: PlaceholderStyle) -> Result<(String, Vec<Value>)> {
        if self.prefix.is_empty() {
            return Ok((self.sql.clone(), Vec::new()));
        }

        let mut sql = String::with_capacity(self.sql.len());
        let mut values = Vec::with_capacity(self.parameters.len());
        let mut rest = self.sql.as_str();
        let mut quote: Option<char> = None;

        while let Some(c) = rest.chars().next() {
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
                sql.push(c);
                rest = &rest[c.len_utf8()..];
                continue;
            }
            if c == '\'' || c == '"' {
                quote = Some(c);
                sql.push(c);
                rest = &rest[c.len_utf8()..];
                continue;
            }
            if let Some(after) = rest.strip_prefix(self.prefix.as_str()) {
                let len = after
                    .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
                    .unwrap_or(after.len());
                if len > 0 {
                    let name = &after[..len];
                    let value = self.parameter(name).ok_or_else(|| {
                        Error::invalid_query(format!(
                            "placeholder {}{} has no parameter",
                            self.prefix, name
                        ))
                    })?;
                    values.push(value.clone());
                    match style {
                        PlaceholderStyle::QuestionMark => sql.push('?'),
                        PlaceholderStyle::Numbered => {
                            sql.push('$');
                            sql.push_str(&values.len().to_string());
                        }
                    }
                    rest = &after[len..];
                    continue;
                }
            }
            sql.push(c);
            rest = &rest[c.len_utf8()..];
        }

        Ok((sql, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> QueryPlan {
        QueryPlan::new(
            "UPDATE User SET Name = @Name, Age = @Age WHERE Id = @Id".to_string(),
            vec![
                Parameter::new("Name", "Bob"),
                Parameter::new("Age", 30),
                Parameter::new("Id", 7),
            ],
            "@",
        )
    }

    #[test]
    fn test_question_marks() {
        let (sql, values) = plan().bind_positional(PlaceholderStyle::QuestionMark).unwrap();
        assert_eq!(sql, "UPDATE User SET Name = ?, Age = ? WHERE Id = ?");
        assert_eq!(values, vec![Value::from("Bob"), Value::I32(30), Value::I32(7)]);
    }

    #[test]
    fn test_numbered() {
        let (sql, _) = plan().bind_positional(PlaceholderStyle::Numbered).unwrap();
        assert_eq!(sql, "UPDATE User SET Name = $1, Age = $2 WHERE Id = $3");
    }

    #[test]
    fn test_textual_order_wins() {
        let plan = QueryPlan::new(
            "SELECT * FROM t WHERE b = @b AND a = @a".to_string(),
            vec![Parameter::new("a", 1), Parameter::new("b", 2)],
            "@",
        );
        let (_, values) = plan.bind_positional(PlaceholderStyle::QuestionMark).unwrap();
        assert_eq!(values, vec![Value::I32(2), Value::I32(1)]);
    }

    #[test]
    fn test_quoted_text_is_skipped() {
        let plan = QueryPlan::new(
            "SELECT * FROM t WHERE a LIKE @p0 ESCAPE '!' AND b = '@p0'".to_string(),
            vec![Parameter::new("p0", "x%")],
            "@",
        );
        let (sql, values) = plan.bind_positional(PlaceholderStyle::QuestionMark).unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE a LIKE ? ESCAPE '!' AND b = '@p0'");
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_unknown_placeholder() {
        let plan = QueryPlan::new("SELECT @missing".to_string(), Vec::new(), "@");
        let err = plan.bind_positional(PlaceholderStyle::QuestionMark).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }));
    }

    #[test]
    fn test_noop() {
        let plan = QueryPlan::noop();
        assert!(plan.is_noop());
        assert!(plan.parameters.is_empty());
    }
}
