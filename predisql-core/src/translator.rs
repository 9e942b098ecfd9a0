//! Lowering of predicate trees into parameterized WHERE clauses

use crate::dialect::Dialect;
use crate::metadata::{ColumnMetadata, TableMetadata};
use crate::operator::CompareOp;
use crate::plan::Parameter;
use crate::predicate::{Expr, Function, Predicate};
use crate::schema::SqlType;
use crate::{Entity, Error, Result, Value};

/// Escape character used by every generated LIKE clause
const LIKE_ESCAPE: char = '!';

/// WHERE-clause text and the parameters it references, in textual order
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedPredicate {
    pub where_clause: String,
    pub parameters: Vec<Parameter>,
}

/// Translates predicates over one table for one dialect
///
/// Literals become parameters named `p<n>`, numbered left to right from the
/// translator's starting index. Translating several predicates for one
/// statement with disjoint starting indexes keeps their names apart.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionTranslator<'a> {
    table: &'a TableMetadata,
    dialect: &'a dyn Dialect,
    start: usize,
}

struct Bindings<'p> {
    prefix: &'p str,
    next: usize,
    parameters: Vec<Parameter>,
}

impl Bindings<'_> {
    fn bind(&mut self, value: Value) -> String {
        let name = format!("p{}", self.next);
        self.next += 1;
        let placeholder = format!("{}{}", self.prefix, name);
        self.parameters.push(Parameter { name, value });
        placeholder
    }
}

impl<'a> ExpressionTranslator<'a> {
    pub fn new(table: &'a TableMetadata, dialect: &'a dyn Dialect) -> Self {
        Self {
            table,
            dialect,
            start: 0,
        }
    }

    /// Number parameters from `start` instead of zero
    pub fn starting_at(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    pub fn translate<T: Entity>(&self, predicate: &Predicate<T>) -> Result<TranslatedPredicate> {
        self.translate_expr(predicate.expr())
    }

    pub fn translate_expr(&self, expr: &Expr) -> Result<TranslatedPredicate> {
        let mut bindings = Bindings {
            prefix: self.dialect.parameter_prefix(),
            next: self.start,
            parameters: Vec::new(),
        };
        let where_clause = self.condition(expr, &mut bindings)?;
        Ok(TranslatedPredicate {
            where_clause,
            parameters: bindings.parameters,
        })
    }

    /// Render `expr` where a boolean is expected
    fn condition(&self, expr: &Expr, bindings: &mut Bindings<'_>) -> Result<String> {
        match expr {
            Expr::Compare { op, lhs, rhs } => self.comparison(*op, lhs, rhs, bindings),
            Expr::And(lhs, rhs) => {
                let lhs = self.condition(lhs, bindings)?;
                let rhs = self.condition(rhs, bindings)?;
                Ok(format!("({lhs} AND {rhs})"))
            }
            Expr::Or(lhs, rhs) => {
                let lhs = self.condition(lhs, bindings)?;
                let rhs = self.condition(rhs, bindings)?;
                Ok(format!("({lhs} OR {rhs})"))
            }
            Expr::Not(inner) => Ok(format!("NOT ({})", self.condition(inner, bindings)?)),
            Expr::Member(property) => {
                let column = self.column(property)?;
                if column.sql_type != SqlType::Bool {
                    return Err(Error::unsupported_expression(
                        expr.kind(),
                        format!(
                            "member '{property}' of type {} cannot stand alone as a condition",
                            column.sql_type
                        ),
                    ));
                }
                let placeholder = bindings.bind(Value::Bool(true));
                Ok(format!("{} = {placeholder}", column.sql_name))
            }
            Expr::Literal(Value::Bool(true)) => Ok("1 = 1".to_string()),
            Expr::Literal(Value::Bool(false)) => Ok("1 = 0".to_string()),
            Expr::Literal(value) => Err(Error::unsupported_expression(
                expr.kind(),
                format!("{} literal cannot stand alone as a condition", value.type_name()),
            )),
            Expr::Call { function, args } => match function {
                Function::Contains | Function::StartsWith | Function::EndsWith => {
                    self.like(function, args, bindings)
                }
                Function::Named(name) => Err(Error::unsupported_expression(
                    expr.kind(),
                    format!("function '{name}' does not produce a condition"),
                )),
            },
            Expr::InList { expr: target, values } => self.in_list(target, values, bindings),
            Expr::Arith { op, .. } => Err(Error::unsupported_expression(
                expr.kind(),
                format!("arithmetic '{op}' cannot stand alone as a condition"),
            )),
        }
    }

    /// Render `expr` where a value is expected
    fn operand(&self, expr: &Expr, bindings: &mut Bindings<'_>) -> Result<String> {
        match expr {
            Expr::Member(property) => Ok(self.column(property)?.sql_name.clone()),
            Expr::Literal(value) => Ok(bindings.bind(value.clone())),
            Expr::Arith { op, lhs, rhs } => {
                let lhs = self.operand(lhs, bindings)?;
                let rhs = self.operand(rhs, bindings)?;
                Ok(format!("({lhs} {op} {rhs})"))
            }
            Expr::Call {
                function: Function::Named(name),
                args,
            } => {
                let sql_name = self
                    .dialect
                    .function_name(name)
                    .ok_or_else(|| Error::unsupported_function(name, self.dialect.name()))?;
                let args = args
                    .iter()
                    .map(|arg| self.operand(arg, bindings))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("{sql_name}({})", args.join(", ")))
            }
            Expr::Call { function, .. } => Err(Error::unsupported_expression(
                expr.kind(),
                format!("{function:?} produces a condition, not a value"),
            )),
            Expr::Compare { .. }
            | Expr::And(_, _)
            | Expr::Or(_, _)
            | Expr::Not(_)
            | Expr::InList { .. } => Err(Error::unsupported_expression(
                expr.kind(),
                "a condition cannot be used as a value",
            )),
        }
    }

    fn comparison(
        &self,
        op: CompareOp,
        lhs: &Expr,
        rhs: &Expr,
        bindings: &mut Bindings<'_>,
    ) -> Result<String> {
        let null_side = match (is_null(lhs), is_null(rhs)) {
            (true, true) => {
                return Err(Error::unsupported_expression(
                    "Compare",
                    "comparison between two NULL literals",
                ))
            }
            (true, false) => Some(rhs),
            (false, true) => Some(lhs),
            (false, false) => None,
        };

        // `= NULL` is never true in SQL
        if let Some(other) = null_side {
            let test = match op {
                CompareOp::Eq => "IS NULL",
                CompareOp::Ne => "IS NOT NULL",
                _ => {
                    return Err(Error::unsupported_expression(
                        "Compare",
                        format!("operator '{op}' cannot compare against NULL"),
                    ))
                }
            };
            return Ok(format!("{} {test}", self.operand(other, bindings)?));
        }

        let lhs = self.operand(lhs, bindings)?;
        let rhs = self.operand(rhs, bindings)?;
        Ok(format!("{lhs} {op} {rhs}"))
    }

    fn like(
        &self,
        function: &Function,
        args: &[Expr],
        bindings: &mut Bindings<'_>,
    ) -> Result<String> {
        let (target, pattern) = match args {
            [target, Expr::Literal(Value::String(pattern))] => (target, pattern),
            _ => {
                return Err(Error::unsupported_expression(
                    "Call",
                    format!("{function:?} needs a target and a string literal pattern"),
                ))
            }
        };

        let target = self.operand(target, bindings)?;
        let escaped = escape_like(pattern);
        let pattern = match function {
            Function::StartsWith => format!("{escaped}%"),
            Function::EndsWith => format!("%{escaped}"),
            _ => format!("%{escaped}%"),
        };
        let placeholder = bindings.bind(Value::String(pattern));
        Ok(format!("{target} LIKE {placeholder} ESCAPE '{LIKE_ESCAPE}'"))
    }

    fn in_list(
        &self,
        target: &Expr,
        values: &[Value],
        bindings: &mut Bindings<'_>,
    ) -> Result<String> {
        let (mark, next) = (bindings.parameters.len(), bindings.next);
        let target = self.operand(target, bindings)?;
        if values.is_empty() {
            // the target still has to resolve, but nothing it bound is referenced
            bindings.parameters.truncate(mark);
            bindings.next = next;
            return Ok("1 = 0".to_string());
        }

        let (nulls, present): (Vec<&Value>, Vec<&Value>) = values.iter().partition(|v| v.is_null());
        if present.is_empty() {
            return Ok(format!("{target} IS NULL"));
        }

        let placeholders: Vec<String> = present
            .into_iter()
            .map(|value| bindings.bind(value.clone()))
            .collect();
        let clause = format!("{target} IN ({})", placeholders.join(", "));
        if nulls.is_empty() {
            Ok(clause)
        } else {
            Ok(format!("({clause} OR {target} IS NULL)"))
        }
    }

    fn column(&self, property: &str) -> Result<&'a ColumnMetadata> {
        self.table.column(property).ok_or_else(|| {
            Error::configuration(
                &self.table.entity,
                format!("no column is mapped to property '{property}'"),
            )
        })
    }
}

fn is_null(expr: &Expr) -> bool {
    matches!(expr, Expr::Literal(Value::Null))
}

/// Escape LIKE wildcards so the pattern matches literally
fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '%' | '_' | '[') || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}
