use crate::Entity;
use crate::error::{FilterError, FilterResult};
use crate::field::{FieldDescriptor, FieldKind, FieldValue};
use error_stack::Report;
use itertools::Itertools;
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

mod parser;

pub use parser::{MAX_DEPTH, parse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    StartsWith,
    EndsWith,
}

impl CompareOp {
    /// Substring operators only make sense on text fields.
    pub fn is_text_only(&self) -> bool {
        matches!(
            self,
            CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith
        )
    }

    fn test(&self, actual: &FieldValue, expected: &FieldValue) -> bool {
        match self {
            CompareOp::Eq => actual == expected,
            CompareOp::Ne => actual != expected,
            CompareOp::Gt => actual.compare(expected) == Some(Ordering::Greater),
            CompareOp::Ge => matches!(
                actual.compare(expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            CompareOp::Lt => actual.compare(expected) == Some(Ordering::Less),
            CompareOp::Le => matches!(
                actual.compare(expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            CompareOp::Contains => text_pair(actual, expected).is_some_and(|(a, e)| a.contains(e)),
            CompareOp::StartsWith => {
                text_pair(actual, expected).is_some_and(|(a, e)| a.starts_with(e))
            }
            CompareOp::EndsWith => text_pair(actual, expected).is_some_and(|(a, e)| a.ends_with(e)),
        }
    }
}

fn text_pair<'a>(actual: &'a FieldValue, expected: &'a FieldValue) -> Option<(&'a str, &'a str)> {
    Some((actual.as_str()?, expected.as_str()?))
}

impl FromStr for CompareOp {
    type Err = Report<FilterError>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.to_ascii_lowercase().as_str() {
            "eq" => CompareOp::Eq,
            "ne" => CompareOp::Ne,
            "gt" => CompareOp::Gt,
            "ge" => CompareOp::Ge,
            "lt" => CompareOp::Lt,
            "le" => CompareOp::Le,
            "contains" => CompareOp::Contains,
            "startswith" => CompareOp::StartsWith,
            "endswith" => CompareOp::EndsWith,
            _ => return Err(Report::new(FilterError::UnknownOperator(s.to_owned()))),
        };
        Ok(op)
    }
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
            CompareOp::Contains => "contains",
            CompareOp::StartsWith => "startswith",
            CompareOp::EndsWith => "endswith",
        };
        f.write_str(op)
    }
}

/// A boolean test over an entity's fields.
///
/// Field clauses keep a reference into the entity's registry so a repository
/// can inspect them; [`Predicate::from_fn`] covers anything else.
pub enum Predicate<E: 'static> {
    All,
    Compare {
        field: &'static FieldDescriptor<E>,
        op: CompareOp,
        value: FieldValue,
    },
    In {
        field: &'static FieldDescriptor<E>,
        values: Vec<FieldValue>,
    },
    And(Box<Predicate<E>>, Box<Predicate<E>>),
    Or(Box<Predicate<E>>, Box<Predicate<E>>),
    Custom(Arc<dyn Fn(&E) -> bool + Send + Sync>),
}

impl<E: Entity> Predicate<E> {
    /// `field op value`, where `field` names a field of `E` and `value` is already typed.
    pub fn compare(field: &str, op: CompareOp, value: FieldValue) -> FilterResult<Self> {
        let field = lookup::<E>(field)?;
        if op.is_text_only() && field.kind() != FieldKind::Text {
            return Err(Report::new(FilterError::UnsupportedOperator {
                field: field.name().to_owned(),
                op: op.to_string(),
            }));
        }
        Ok(Predicate::Compare { field, op, value })
    }

    /// Field value is a member of `values`.
    pub fn is_in(field: &str, values: Vec<FieldValue>) -> FilterResult<Self> {
        Ok(Predicate::In {
            field: lookup::<E>(field)?,
            values,
        })
    }
}

impl<E: 'static> Predicate<E> {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Predicate::Custom(Arc::new(f))
    }

    pub fn and(self, other: Predicate<E>) -> Self {
        match (self, other) {
            (Predicate::All, p) | (p, Predicate::All) => p,
            (a, b) => Predicate::And(Box::new(a), Box::new(b)),
        }
    }

    pub fn or(self, other: Predicate<E>) -> Self {
        match (self, other) {
            (Predicate::All, _) | (_, Predicate::All) => Predicate::All,
            (a, b) => Predicate::Or(Box::new(a), Box::new(b)),
        }
    }

    pub fn matches(&self, entity: &E) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Compare { field, op, value } => op.test(&field.read(entity), value),
            Predicate::In { field, values } => {
                let actual = field.read(entity);
                values.contains(&actual)
            }
            Predicate::And(a, b) => a.matches(entity) && b.matches(entity),
            Predicate::Or(a, b) => a.matches(entity) || b.matches(entity),
            Predicate::Custom(f) => f(entity),
        }
    }
}

fn lookup<E: Entity>(name: &str) -> FilterResult<&'static FieldDescriptor<E>> {
    E::fields().get(name).ok_or_else(|| {
        Report::new(FilterError::UnknownField {
            field: name.to_owned(),
            entity: E::NAME,
        })
    })
}

impl<E: 'static> Clone for Predicate<E> {
    fn clone(&self) -> Self {
        match self {
            Predicate::All => Predicate::All,
            Predicate::Compare { field, op, value } => Predicate::Compare {
                field: *field,
                op: *op,
                value: value.clone(),
            },
            Predicate::In { field, values } => Predicate::In {
                field: *field,
                values: values.clone(),
            },
            Predicate::And(a, b) => Predicate::And(a.clone(), b.clone()),
            Predicate::Or(a, b) => Predicate::Or(a.clone(), b.clone()),
            Predicate::Custom(f) => Predicate::Custom(Arc::clone(f)),
        }
    }
}

impl<E: 'static> Debug for Predicate<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl<E: 'static> Display for Predicate<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::All => f.write_str("true"),
            Predicate::Compare { field, op, value } => {
                write!(f, "{} {op} {}", field.name(), quoted(value))
            }
            Predicate::In { field, values } => write!(
                f,
                "{} in ({})",
                field.name(),
                values.iter().map(quoted).join(", ")
            ),
            Predicate::And(a, b) => write!(f, "({a} and {b})"),
            Predicate::Or(a, b) => write!(f, "({a} or {b})"),
            Predicate::Custom(_) => f.write_str("<custom>"),
        }
    }
}

fn quoted(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => "null".to_owned(),
        FieldValue::Bool(_) | FieldValue::Integer(_) | FieldValue::Float(_) => value.to_string(),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}
