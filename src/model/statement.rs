use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A typed literal value.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<Utc>),
}

impl Literal {
    fn rank(&self) -> u8 {
        match self {
            Literal::Integer(_) => 0,
            Literal::Float(_) => 1,
            Literal::String(_) => 2,
            Literal::Timestamp(_) => 3,
        }
    }
}

// Floats compare by bit pattern so that statements keep set semantics.
impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Literal {}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Literal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Literal::Integer(a), Literal::Integer(b)) => a.cmp(b),
            (Literal::Float(a), Literal::Float(b)) => a.total_cmp(b),
            (Literal::String(a), Literal::String(b)) => a.cmp(b),
            (Literal::Timestamp(a), Literal::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Literal::Integer(v) => v.hash(state),
            Literal::Float(v) => v.to_bits().hash(state),
            Literal::String(v) => v.hash(state),
            Literal::Timestamp(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::String(v) => write!(f, "{}", v),
            Literal::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

/// Subject, predicate or object position of a statement.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn blank(id: impl Into<String>) -> Self {
        Term::Blank(id.into())
    }

    pub fn integer(value: impl Into<i64>) -> Self {
        Term::Literal(Literal::Integer(value.into()))
    }

    pub fn float(value: f64) -> Self {
        Term::Literal(Literal::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Term::Literal(Literal::String(value.into()))
    }

    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Term::Literal(Literal::Timestamp(value))
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Integer view of the term. Floats are truncated, strings parsed, and
    /// IRIs read from their last path segment (e.g. `.../notes/60`).
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Term::Literal(Literal::Integer(v)) => Some(*v),
            Term::Literal(Literal::Float(v)) if v.is_finite() => Some(v.trunc() as i64),
            Term::Literal(Literal::String(s)) => parse_integer(s),
            Term::Iri(iri) => iri.rsplit(['/', '#']).next().and_then(parse_integer),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Term::Literal(Literal::Integer(v)) => Some(*v as f64),
            Term::Literal(Literal::Float(v)) => Some(*v),
            Term::Literal(Literal::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite())
    }

    /// Plain text of a literal, if this is one.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Term::Literal(literal) => Some(literal.to_string()),
            _ => None,
        }
    }
}

fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.trunc() as i64)
    })
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::Blank(id) => write!(f, "_:{}", id),
            Term::Literal(literal) => write!(f, "{:?}", literal.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Statement {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Statement {
    pub fn new(subject: impl Into<Term>, predicate: impl Into<Term>, object: impl Into<Term>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}
