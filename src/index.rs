//! Index: documents in, ids out
//!
//! [`Index`] ties a [`Schema`] to a Tantivy index, routes every mutation
//! through the [`TransactionCoordinator`] and exposes the query factories as
//! shortcuts. Readers reload manually: nothing written becomes searchable
//! before [`Index::reload`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::schema::{Field, Value};
use tantivy::{IndexReader, ReloadPolicy, TantivyDocument, Term};
use tracing::info;

use crate::config::IndexConfig;
use crate::document::{Document, FieldValue};
use crate::error::SearchResult;
use crate::query::{Query, QueryKind, SmartQueryOptions, DEFAULT_BOOST};
use crate::schema::{FieldGroup, Schema};
use crate::transaction::TransactionCoordinator;

/// Index statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Documents visible to the current reader
    pub total_documents: u64,

    /// Segments visible to the current reader
    pub num_segments: usize,

    /// Commits made by this instance
    pub commits: u64,

    pub in_memory: bool,

    pub exclusive_writer: bool,
}

/// A searchable, transactionally written index
pub struct Index {
    config: IndexConfig,
    schema: Schema,
    engine_schema: tantivy::schema::Schema,
    id_field: Field,
    reader: IndexReader,
    coordinator: TransactionCoordinator,
}

impl Index {
    /// Open the index at `config.path`, creating it if needed, or a fresh one in memory
    pub fn open(config: IndexConfig, schema: Schema) -> SearchResult<Self> {
        config.validate()?;

        let engine_schema = schema.to_tantivy();
        let index = match &config.path {
            Some(path) => {
                std::fs::create_dir_all(path)?;
                let directory = MmapDirectory::open(path)?;
                tantivy::Index::open_or_create(directory, engine_schema.clone())?
            }
            None => tantivy::Index::create_in_ram(engine_schema.clone()),
        };

        schema.register_tokenizers(&index);

        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        let coordinator = TransactionCoordinator::new(
            index,
            config.path.as_deref(),
            config.writer_memory,
            config.exclusive_writer,
        )?;

        let id_field = engine_schema.get_field(schema.id_field())?;

        info!(
            path = ?config.path,
            exclusive_writer = config.exclusive_writer,
            fields = schema.fields().count(),
            "Index opened"
        );

        Ok(Self {
            config,
            schema,
            engine_schema,
            id_field,
            reader,
            coordinator,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn path(&self) -> Option<&Path> {
        self.config.path.as_deref()
    }

    pub fn in_memory(&self) -> bool {
        self.config.path.is_none()
    }

    pub fn default_limit(&self) -> usize {
        self.config.default_limit
    }

    pub(crate) fn field(&self, name: &str) -> SearchResult<Field> {
        Ok(self.engine_schema.get_field(name)?)
    }

    /// Run `body` in a transaction; adds and deletes inside it commit together
    pub fn transaction<T>(&self, body: impl FnOnce() -> SearchResult<T>) -> SearchResult<T> {
        self.coordinator.run(body)
    }

    /// Add a document, replacing any document with the same id
    pub fn add_document(&self, document: &Document) -> SearchResult<()> {
        let doc = document.to_tantivy(&self.schema, &self.engine_schema)?;
        let id = Term::from_field_text(self.id_field, &document.id);

        self.transaction(|| {
            self.coordinator.with_writer(|writer| {
                writer.delete_term(id);
                writer.add_document(doc)
            })??;
            Ok(())
        })
    }

    /// Add several documents in a single transaction
    pub fn add_documents(&self, documents: &[Document]) -> SearchResult<usize> {
        self.transaction(|| {
            for document in documents {
                self.add_document(document)?;
            }
            Ok(documents.len())
        })
    }

    pub fn delete_document(&self, id: &str) -> SearchResult<()> {
        let id = Term::from_field_text(self.id_field, id);

        self.transaction(|| {
            self.coordinator.with_writer(|writer| writer.delete_term(id))?;
            Ok(())
        })
    }

    /// Make everything committed so far visible to searches
    pub fn reload(&self) -> SearchResult<()> {
        self.reader.reload()?;
        Ok(())
    }

    /// Ids of the best `limit` matches, best first
    pub fn search(&self, query: &Query, limit: usize) -> SearchResult<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(query.as_tantivy(), &TopDocs::with_limit(limit))?;

        let mut ids = Vec::with_capacity(top_docs.len());
        for (_score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            if let Some(id) = doc.get_first(self.id_field).and_then(|value| value.as_str()) {
                ids.push(id.to_string());
            }
        }

        Ok(ids)
    }

    /// Smart query over every text field
    pub fn search_text(
        &self,
        text: &str,
        limit: usize,
        options: &SmartQueryOptions,
    ) -> SearchResult<Vec<String>> {
        let query = self.smart_query(&self.schema.fields_of(FieldGroup::Text), text, options)?;
        self.search(&query, limit)
    }

    pub fn stats(&self) -> SearchResult<IndexStats> {
        let searcher = self.reader.searcher();

        Ok(IndexStats {
            total_documents: searcher.num_docs(),
            num_segments: searcher.segment_readers().len(),
            commits: self.coordinator.commits(),
            in_memory: self.in_memory(),
            exclusive_writer: self.coordinator.exclusive_writer(),
        })
    }

    /// Build any kind of query over `fields`
    pub fn query<F: AsRef<str>>(&self, fields: &[F], kind: &QueryKind) -> SearchResult<Query> {
        Query::build(self, fields, kind, DEFAULT_BOOST)
    }

    pub fn all_query(&self) -> Query {
        Query::all()
    }

    pub fn empty_query(&self) -> Query {
        Query::empty()
    }

    pub fn term_query<F: AsRef<str>>(&self, fields: &[F], term: &str) -> SearchResult<Query> {
        Query::term(self, fields, term)
    }

    pub fn fuzzy_term_query<F: AsRef<str>>(
        &self,
        fields: &[F],
        term: &str,
        distance: u8,
    ) -> SearchResult<Query> {
        Query::fuzzy_term(self, fields, term, distance)
    }

    pub fn phrase_query<F: AsRef<str>>(&self, fields: &[F], phrase: &str) -> SearchResult<Query> {
        Query::phrase(self, fields, phrase)
    }

    pub fn regex_query<F: AsRef<str>>(&self, fields: &[F], pattern: &str) -> SearchResult<Query> {
        Query::regex(self, fields, pattern)
    }

    pub fn prefix_query<F: AsRef<str>>(&self, fields: &[F], prefix: &str) -> SearchResult<Query> {
        Query::prefix(self, fields, prefix)
    }

    pub fn range_query<F: AsRef<str>, V: Into<FieldValue>>(
        &self,
        fields: &[F],
        range: std::ops::RangeInclusive<V>,
    ) -> SearchResult<Query> {
        Query::range(self, fields, range)
    }

    pub fn facet_query(&self, field: &str, path: &str) -> SearchResult<Query> {
        Query::facet(self, field, path)
    }

    pub fn smart_query<F: AsRef<str>>(
        &self,
        fields: &[F],
        text: &str,
        options: &SmartQueryOptions,
    ) -> SearchResult<Query> {
        Query::smart(self, fields, text, options)
    }
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("config", &self.config)
            .field("schema", &self.schema)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
