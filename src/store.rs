use crate::model::statement::{Statement, Term};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// An insertion-ordered set of statements, indexed by subject, by predicate
/// and by (subject, predicate).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Statement>", into = "Vec<Statement>")]
pub struct StatementStore {
    statements: Vec<Statement>,
    seen: HashSet<Statement>,
    by_subject: HashMap<Term, Vec<usize>>,
    by_predicate: HashMap<Term, Vec<usize>>,
    by_subject_predicate: HashMap<(Term, Term), Vec<usize>>,
}

impl StatementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Adds a statement, returning `false` if it was already present.
    pub fn push(&mut self, statement: Statement) -> bool {
        if self.seen.contains(&statement) {
            return false;
        }

        let idx = self.statements.len();
        self.by_subject
            .entry(statement.subject.clone())
            .or_default()
            .push(idx);
        self.by_predicate
            .entry(statement.predicate.clone())
            .or_default()
            .push(idx);
        self.by_subject_predicate
            .entry((statement.subject.clone(), statement.predicate.clone()))
            .or_default()
            .push(idx);
        self.seen.insert(statement.clone());
        self.statements.push(statement);

        true
    }

    pub fn insert(
        &mut self,
        subject: impl Into<Term>,
        predicate: impl Into<Term>,
        object: impl Into<Term>,
    ) -> bool {
        self.push(Statement::new(subject, predicate, object))
    }

    pub fn contains(&self, statement: &Statement) -> bool {
        self.seen.contains(statement)
    }

    /// Statements in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }

    /// Statements matching a pattern; `None` matches anything.
    pub fn matching<'a, 'b>(
        &'a self,
        subject: Option<&'b Term>,
        predicate: Option<&'b Term>,
        object: Option<&'b Term>,
    ) -> Box<dyn Iterator<Item = &'a Statement> + 'b>
    where
        'a: 'b,
    {
        let candidates: Box<dyn Iterator<Item = &'a Statement> + 'b> = match (subject, predicate) {
            (Some(s), Some(p)) => self.indexed(
                self.by_subject_predicate
                    .get(&(s.clone(), p.clone()))
                    .map(Vec::as_slice),
            ),
            (Some(s), None) => self.indexed(self.by_subject.get(s).map(Vec::as_slice)),
            (None, Some(p)) => self.indexed(self.by_predicate.get(p).map(Vec::as_slice)),
            (None, None) => Box::new(self.statements.iter()),
        };

        match object {
            Some(o) => Box::new(candidates.filter(move |st| &st.object == o)),
            None => candidates,
        }
    }

    fn indexed<'a>(
        &'a self,
        indices: Option<&'a [usize]>,
    ) -> Box<dyn Iterator<Item = &'a Statement> + 'a> {
        Box::new(
            indices
                .unwrap_or_default()
                .iter()
                .map(move |idx| &self.statements[*idx]),
        )
    }

    pub fn objects<'a, 'b>(
        &'a self,
        subject: &'b Term,
        predicate: &'b Term,
    ) -> impl Iterator<Item = &'a Term> + 'b
    where
        'a: 'b,
    {
        self.matching(Some(subject), Some(predicate), None)
            .map(|st| &st.object)
    }

    /// First object for (subject, predicate) in insertion order.
    pub fn object(&self, subject: &Term, predicate: &Term) -> Option<&Term> {
        self.by_subject_predicate
            .get(&(subject.clone(), predicate.clone()))
            .and_then(|indices| indices.first())
            .map(|idx| &self.statements[*idx].object)
    }

    pub fn subjects<'a, 'b>(
        &'a self,
        predicate: &'b Term,
        object: &'b Term,
    ) -> impl Iterator<Item = &'a Term> + 'b
    where
        'a: 'b,
    {
        self.matching(None, Some(predicate), Some(object))
            .map(|st| &st.subject)
    }

    /// All statements in (subject, predicate, object) order.
    pub fn sorted(&self) -> Vec<&Statement> {
        let mut sorted: Vec<&Statement> = self.statements.iter().collect();
        sorted.sort();
        sorted
    }

    pub fn extend<I: IntoIterator<Item = Statement>>(&mut self, statements: I) {
        for statement in statements {
            self.push(statement);
        }
    }
}

impl From<Vec<Statement>> for StatementStore {
    fn from(statements: Vec<Statement>) -> Self {
        let mut store = StatementStore::new();
        store.extend(statements);
        store
    }
}

impl From<StatementStore> for Vec<Statement> {
    fn from(store: StatementStore) -> Self {
        store.statements
    }
}

impl FromIterator<Statement> for StatementStore {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        let mut store = StatementStore::new();
        store.extend(iter);
        store
    }
}
