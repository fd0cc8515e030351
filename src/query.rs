//! Query handles, combinators and field-aware factories
//!
//! A [`Query`] is an immutable, reference-counted handle to a Tantivy query
//! tree. Handles are combined with `&`, `|`, `!` and [`Query::boost`] without
//! ever being inspected. Every factory goes through [`Query::build`], which
//! checks that the target fields belong to a group the query kind supports
//! before anything is handed to the engine.

use std::ops::{BitAnd, BitOr, Bound, Not, RangeInclusive};
use std::sync::Arc;

use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, EmptyQuery, FuzzyTermQuery, Occur, PhraseQuery,
    RangeQuery, RegexQuery, TermQuery,
};
use tantivy::schema::{Facet, Field, IndexRecordOption};
use tantivy::Term;

use crate::document::{to_engine_date, FieldValue};
use crate::error::{SearchError, SearchResult};
use crate::index::Index;
use crate::schema::FieldGroup;

/// Boost factor that leaves a query unchanged
pub const DEFAULT_BOOST: f32 = 1.0;

/// Edit distance used by fuzzy term queries when none is given
pub const DEFAULT_FUZZY_DISTANCE: u8 = 1;

/// Options for [`Query::smart`] and [`Index::search_text`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmartQueryOptions {
    /// Match terms within this edit distance instead of exactly
    pub fuzzy_distance: Option<u8>,

    /// Boost applied to the combined query
    pub boost: f32,
}

impl Default for SmartQueryOptions {
    fn default() -> Self {
        Self {
            fuzzy_distance: None,
            boost: DEFAULT_BOOST,
        }
    }
}

impl SmartQueryOptions {
    pub fn fuzzy(distance: u8) -> Self {
        Self {
            fuzzy_distance: Some(distance),
            ..Self::default()
        }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

/// Every kind of query the factories can build
#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    All,
    Empty,
    Term(String),
    FuzzyTerm { term: String, distance: u8 },
    Phrase(String),
    Regex(String),
    Prefix(String),
    /// Inclusive range; both bounds must have the same type
    Range { from: FieldValue, to: FieldValue },
    Facet(String),
    Smart {
        text: String,
        fuzzy_distance: Option<u8>,
    },
}

impl QueryKind {
    pub fn name(&self) -> &'static str {
        match self {
            QueryKind::All => "all",
            QueryKind::Empty => "empty",
            QueryKind::Term(_) => "term",
            QueryKind::FuzzyTerm { .. } => "fuzzy_term",
            QueryKind::Phrase(_) => "phrase",
            QueryKind::Regex(_) => "regex",
            QueryKind::Prefix(_) => "prefix",
            QueryKind::Range { .. } => "range",
            QueryKind::Facet(_) => "facet",
            QueryKind::Smart { .. } => "smart",
        }
    }

    /// Field groups this kind may target
    fn allowed_groups(&self) -> SearchResult<&'static [FieldGroup]> {
        const TEXT_AND_STRINGS: &[FieldGroup] = &[FieldGroup::Text, FieldGroup::String];

        let groups: &'static [FieldGroup] = match self {
            QueryKind::All | QueryKind::Empty => &[],
            QueryKind::Term(_)
            | QueryKind::FuzzyTerm { .. }
            | QueryKind::Regex(_)
            | QueryKind::Prefix(_) => TEXT_AND_STRINGS,
            QueryKind::Phrase(_) | QueryKind::Smart { .. } => &[FieldGroup::Text],
            QueryKind::Facet(_) => &[FieldGroup::Facet],
            QueryKind::Range { from, to } => match range_group(from, to)? {
                FieldGroup::Integer => &[FieldGroup::Integer],
                FieldGroup::Double => &[FieldGroup::Double],
                _ => &[FieldGroup::Date],
            },
        };
        Ok(groups)
    }
}

/// Group selected by the type of a range's bounds
fn range_group(from: &FieldValue, to: &FieldValue) -> SearchResult<FieldGroup> {
    let group = match from {
        FieldValue::Integer(_) => FieldGroup::Integer,
        FieldValue::Double(_) => FieldGroup::Double,
        FieldValue::Date(_) => FieldGroup::Date,
        other => return Err(SearchError::UnsupportedRange(other.type_name().to_string())),
    };

    if std::mem::discriminant(from) != std::mem::discriminant(to) {
        return Err(SearchError::UnsupportedRange(format!(
            "{}..{}",
            from.type_name(),
            to.type_name()
        )));
    }

    Ok(group)
}

/// Immutable handle to a query tree
#[derive(Debug, Clone)]
pub struct Query(Arc<dyn tantivy::query::Query>);

impl Query {
    fn new(query: impl tantivy::query::Query + 'static) -> Self {
        Query(Arc::new(query))
    }

    /// Matches every document
    pub fn all() -> Self {
        Query::new(AllQuery)
    }

    /// Matches no document
    pub fn empty() -> Self {
        Query::new(EmptyQuery)
    }

    /// Logical AND; a single query is returned as is, none matches nothing
    pub fn conjunction(queries: impl IntoIterator<Item = Query>) -> Self {
        Self::combine(Occur::Must, queries)
    }

    /// Logical OR; a single query is returned as is, none matches nothing
    pub fn disjunction(queries: impl IntoIterator<Item = Query>) -> Self {
        Self::combine(Occur::Should, queries)
    }

    fn combine(occur: Occur, queries: impl IntoIterator<Item = Query>) -> Self {
        let mut queries: Vec<Query> = queries.into_iter().collect();

        match queries.len() {
            0 => Query::empty(),
            1 => queries.remove(0),
            _ => {
                let clauses: Vec<(Occur, Box<dyn tantivy::query::Query>)> = queries
                    .iter()
                    .map(|query| (occur, query.0.box_clone()))
                    .collect();
                Query::new(BooleanQuery::from(clauses))
            }
        }
    }

    /// Everything except the documents this query matches
    pub fn negate(&self) -> Self {
        Query::new(BooleanQuery::from(vec![
            (Occur::Must, Box::new(AllQuery) as Box<dyn tantivy::query::Query>),
            (Occur::MustNot, self.0.box_clone()),
        ]))
    }

    /// Scale the query's score; a factor of 1.0 returns the same handle
    pub fn boost(&self, factor: f32) -> Self {
        if factor == DEFAULT_BOOST {
            return self.clone();
        }
        Query::new(BoostQuery::new(self.0.box_clone(), factor))
    }

    /// Whether both handles point at the same query tree
    pub fn ptr_eq(&self, other: &Query) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_tantivy(&self) -> &(dyn tantivy::query::Query + 'static) {
        self.0.as_ref()
    }

    /// Build a query of `kind` over `fields`
    ///
    /// Every field is checked against the groups `kind` supports before any
    /// engine query is created. No fields gives a match-nothing query, several
    /// fields are ORed together, and `boost` is applied last.
    pub fn build<F: AsRef<str>>(
        index: &Index,
        fields: &[F],
        kind: &QueryKind,
        boost: f32,
    ) -> SearchResult<Query> {
        match kind {
            QueryKind::All => return Ok(Query::all().boost(boost)),
            QueryKind::Empty => return Ok(Query::empty()),
            _ => {}
        }

        let allowed = kind.allowed_groups()?;
        let schema = index.schema();
        for field in fields {
            let field = field.as_ref();
            match schema.field_group(field) {
                Some(group) if allowed.contains(&group) => {}
                _ => return Err(SearchError::UnsupportedField(field.to_string())),
            }
        }

        let queries = fields
            .iter()
            .filter_map(|field| field_query(index, field.as_ref(), kind).transpose())
            .collect::<SearchResult<Vec<_>>>()?;

        Ok(Query::disjunction(queries).boost(boost))
    }

    pub fn term<F: AsRef<str>>(index: &Index, fields: &[F], term: &str) -> SearchResult<Query> {
        Self::build(index, fields, &QueryKind::Term(term.to_string()), DEFAULT_BOOST)
    }

    pub fn fuzzy_term<F: AsRef<str>>(
        index: &Index,
        fields: &[F],
        term: &str,
        distance: u8,
    ) -> SearchResult<Query> {
        let kind = QueryKind::FuzzyTerm {
            term: term.to_string(),
            distance,
        };
        Self::build(index, fields, &kind, DEFAULT_BOOST)
    }

    pub fn phrase<F: AsRef<str>>(index: &Index, fields: &[F], phrase: &str) -> SearchResult<Query> {
        Self::build(index, fields, &QueryKind::Phrase(phrase.to_string()), DEFAULT_BOOST)
    }

    pub fn regex<F: AsRef<str>>(index: &Index, fields: &[F], pattern: &str) -> SearchResult<Query> {
        Self::build(index, fields, &QueryKind::Regex(pattern.to_string()), DEFAULT_BOOST)
    }

    pub fn prefix<F: AsRef<str>>(index: &Index, fields: &[F], prefix: &str) -> SearchResult<Query> {
        Self::build(index, fields, &QueryKind::Prefix(prefix.to_string()), DEFAULT_BOOST)
    }

    /// Inclusive range; the bound type picks integer, double or date fields
    pub fn range<F: AsRef<str>, V: Into<FieldValue>>(
        index: &Index,
        fields: &[F],
        range: RangeInclusive<V>,
    ) -> SearchResult<Query> {
        let (from, to) = range.into_inner();
        let kind = QueryKind::Range {
            from: from.into(),
            to: to.into(),
        };
        Self::build(index, fields, &kind, DEFAULT_BOOST)
    }

    /// Documents filed under `path` in a facet field
    pub fn facet(index: &Index, field: &str, path: &str) -> SearchResult<Query> {
        Self::build(index, &[field], &QueryKind::Facet(path.to_string()), DEFAULT_BOOST)
    }

    /// Free-text query: every token must match, the last one also as a prefix
    pub fn smart<F: AsRef<str>>(
        index: &Index,
        fields: &[F],
        text: &str,
        options: &SmartQueryOptions,
    ) -> SearchResult<Query> {
        let kind = QueryKind::Smart {
            text: text.to_string(),
            fuzzy_distance: options.fuzzy_distance,
        };
        Self::build(index, fields, &kind, options.boost)
    }
}

/// Query for one validated field; `None` when the field contributes nothing
fn field_query(index: &Index, name: &str, kind: &QueryKind) -> SearchResult<Option<Query>> {
    let field = index.field(name)?;

    let query = match kind {
        QueryKind::All => Query::all(),
        QueryKind::Empty => Query::empty(),
        QueryKind::Term(term) => term_query(field, term),
        QueryKind::FuzzyTerm { term, distance } => fuzzy_term_query(field, term, *distance),
        QueryKind::Regex(pattern) => regex_query(field, pattern)?,
        QueryKind::Prefix(prefix) => prefix_query(field, prefix)?,
        QueryKind::Facet(path) => {
            let facet = Facet::from_text(path)
                .map_err(|err| SearchError::InvalidQuery(err.to_string()))?;
            Query::new(TermQuery::new(
                Term::from_facet(field, &facet),
                IndexRecordOption::Basic,
            ))
        }
        QueryKind::Range { from, to } => range_query(name, from, to)?,
        QueryKind::Phrase(phrase) => {
            let terms: Vec<Term> = index
                .schema()
                .tokenizer_for(name)
                .terms(phrase)
                .iter()
                .map(|term| Term::from_field_text(field, term))
                .collect();

            match terms.len() {
                0 => Query::empty(),
                1 => Query::new(TermQuery::new(
                    terms[0].clone(),
                    IndexRecordOption::WithFreqsAndPositions,
                )),
                _ => Query::new(PhraseQuery::new(terms)),
            }
        }
        QueryKind::Smart {
            text,
            fuzzy_distance,
        } => {
            let terms = index.schema().tokenizer_for(name).terms(text);
            let Some((last, rest)) = terms.split_last() else {
                return Ok(None);
            };

            let word = |term: &str| match fuzzy_distance {
                Some(distance) => fuzzy_term_query(field, term, *distance),
                None => term_query(field, term),
            };

            let last_query = prefix_query(field, last)? | word(last.as_str());
            Query::conjunction(
                std::iter::once(last_query).chain(rest.iter().map(|term| word(term.as_str()))),
            )
        }
    };

    Ok(Some(query))
}

fn term_query(field: Field, term: &str) -> Query {
    Query::new(TermQuery::new(
        Term::from_field_text(field, term),
        IndexRecordOption::Basic,
    ))
}

fn fuzzy_term_query(field: Field, term: &str, distance: u8) -> Query {
    Query::new(FuzzyTermQuery::new(
        Term::from_field_text(field, term),
        distance,
        true,
    ))
}

fn regex_query(field: Field, pattern: &str) -> SearchResult<Query> {
    RegexQuery::from_pattern(pattern, field)
        .map(Query::new)
        .map_err(|err| SearchError::InvalidQuery(err.to_string()))
}

fn prefix_query(field: Field, prefix: &str) -> SearchResult<Query> {
    regex_query(field, &format!("{}.*", regex::escape(prefix)))
}

fn range_query(name: &str, from: &FieldValue, to: &FieldValue) -> SearchResult<Query> {
    let field = name.to_string();

    let query = match (from, to) {
        (FieldValue::Integer(from), FieldValue::Integer(to)) => {
            RangeQuery::new_i64_bounds(field, Bound::Included(*from), Bound::Included(*to))
        }
        (FieldValue::Double(from), FieldValue::Double(to)) => {
            RangeQuery::new_f64_bounds(field, Bound::Included(*from), Bound::Included(*to))
        }
        (FieldValue::Date(from), FieldValue::Date(to)) => RangeQuery::new_date_bounds(
            field,
            Bound::Included(to_engine_date(from)),
            Bound::Included(to_engine_date(to)),
        ),
        _ => {
            return Err(SearchError::UnsupportedRange(format!(
                "{}..{}",
                from.type_name(),
                to.type_name()
            )))
        }
    };

    Ok(Query::new(query))
}

impl BitAnd for Query {
    type Output = Query;

    fn bitand(self, rhs: Query) -> Query {
        Query::conjunction([self, rhs])
    }
}

impl<'a> BitAnd<&'a Query> for &'a Query {
    type Output = Query;

    fn bitand(self, rhs: &'a Query) -> Query {
        Query::conjunction([self.clone(), rhs.clone()])
    }
}

impl BitOr for Query {
    type Output = Query;

    fn bitor(self, rhs: Query) -> Query {
        Query::disjunction([self, rhs])
    }
}

impl<'a> BitOr<&'a Query> for &'a Query {
    type Output = Query;

    fn bitor(self, rhs: &'a Query) -> Query {
        Query::disjunction([self.clone(), rhs.clone()])
    }
}

impl Not for Query {
    type Output = Query;

    fn not(self) -> Query {
        self.negate()
    }
}

impl Not for &Query {
    type Output = Query;

    fn not(self) -> Query {
        self.negate()
    }
}
