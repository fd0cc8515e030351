//! Common test utilities for index and query testing
//!
//! Builds the schemas and fixtures shared by the integration tests.

#![allow(dead_code)]

use ftsgate::{Document, Index, IndexConfig, Schema, StemmerLanguage, Tokenizer};
use tempfile::TempDir;

/// Schema covering every field group, with one stemmed text field
pub fn all_fields_schema() -> Schema {
    Schema::builder()
        .facet("facet")
        .string("string")
        .text("text")
        .text_with_tokenizer("en_text", Tokenizer::stemmer(StemmerLanguage::default()))
        .double("double")
        .integer("integer")
        .date("date")
        .build()
        .unwrap()
}

/// Movie schema with a custom id field
pub fn movie_schema() -> Schema {
    Schema::builder()
        .id("imdb_id")
        .facet("category")
        .string("title")
        .text("description")
        .double("rating")
        .integer("duration")
        .date("release_date")
        .build()
        .unwrap()
}

pub fn hana_bi() -> Document {
    Document::new("tt0119250")
        .with("title", "Hana-bi")
        .with("description", "Takeshi Kitano goes bonkers.")
        .with("category", "/crime/Japan")
        .with("category", "/crime/Shinjuku")
        .with("duration", 103)
        .with("rating", 7.7)
        .with("release_date", "1998-12-01")
}

/// In-memory index over `schema` holding `documents`, already reloaded
pub fn memory_index(schema: Schema, documents: &[Document]) -> Index {
    let index = Index::open(IndexConfig::in_memory(), schema).unwrap();
    index.add_documents(documents).unwrap();
    index.reload().unwrap();
    index
}

/// Persisted index in `dir`
pub fn persisted_index(dir: &TempDir, schema: Schema) -> Index {
    Index::open(IndexConfig::persisted(dir.path()), schema).unwrap()
}

pub fn exclusive_index(dir: &TempDir, schema: Schema) -> ftsgate::SearchResult<Index> {
    let config = IndexConfig::builder()
        .path(dir.path())
        .exclusive_writer(true)
        .build();
    Index::open(config, schema)
}

/// Document with only an id and one field value
pub fn doc(id: impl ToString, field: &str, value: &str) -> Document {
    Document::new(id.to_string()).with(field, value)
}

/// Every id currently visible, sorted
pub fn all_ids(index: &Index) -> Vec<String> {
    sorted(index.search(&index.all_query(), 1_000).unwrap())
}

pub fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}

pub fn ids(ids: &[&str]) -> Vec<String> {
    sorted(ids.iter().map(|id| id.to_string()).collect())
}
