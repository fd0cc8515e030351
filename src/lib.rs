//! Transactional writer coordination and a typed query algebra over Tantivy
//!
//! This crate is a thin access layer over a Tantivy index:
//!
//! - **Writer Coordination**: at most one writer mutates a persisted index at a
//!   time, across threads and across processes; transactions nest per thread
//! - **Typed Schema**: id field plus text, string, integer, double, date and
//!   facet field groups, with per-field tokenizers
//! - **Query Algebra**: term, fuzzy, phrase, regex, prefix, range, facet and
//!   "smart" free-text queries, combined with `&`, `|`, `!` and boost
//! - **Highlighting**: emphasis markup for matched words
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                    Index                         │
//! ├─────────────────────────────────────────────────┤
//! │  - add_document()   - delete_document()         │
//! │  - search()         - search_text()             │
//! │  - transaction()    - *_query() shortcuts       │
//! └─────────────────────────────────────────────────┘
//!          │                          │
//!          ▼                          ▼
//! ┌────────────────────────┐ ┌──────────────────────┐
//! │ TransactionCoordinator │ │ Query / QueryKind     │
//! ├────────────────────────┤ ├──────────────────────┤
//! │  - gate mutex          │ │  - field validation   │
//! │  - .tantiny.lock       │ │  - combinators        │
//! │  - writer lease        │ │  - smart query        │
//! └────────────────────────┘ └──────────────────────┘
//!          │                          │
//!          ▼                          ▼
//! ┌─────────────────────────────────────────────────┐
//! │              Tantivy Index                       │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use ftsgate::{Document, Index, IndexConfig, Schema, SmartQueryOptions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = Schema::builder()
//!         .id("imdb_id")
//!         .string("title")
//!         .text("description")
//!         .integer("duration")
//!         .build()?;
//!     let index = Index::open(IndexConfig::persisted("/tmp/movies"), schema)?;
//!
//!     index.transaction(|| {
//!         index.add_document(
//!             &Document::new("tt0111161")
//!                 .with("title", "The Shawshank Redemption")
//!                 .with("description", "Two imprisoned men bond over a number of years")
//!                 .with("duration", 142),
//!         )?;
//!         index.delete_document("tt0068646")
//!     })?;
//!     index.reload()?;
//!
//!     let ids = index.search_text("imprisoned me", 10, &SmartQueryOptions::default())?;
//!     println!("Found {:?}", ids);
//!
//!     let long = index.range_query(&["duration"], 120..=240)?;
//!     let title = index.term_query(&["title"], "The Shawshank Redemption")?;
//!     println!("Found {:?}", index.search(&(long & !title), 10)?);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod highlight;
pub mod index;
pub mod query;
pub mod schema;
pub mod tokenizer;
pub mod transaction;

pub use config::{AppConfig, IndexConfig, IndexConfigBuilder, LoggingConfig};
pub use document::{Document, FieldValue};
pub use error::{SearchError, SearchResult};
pub use highlight::{highlight, HighlightOptions};
pub use index::{Index, IndexStats};
pub use query::{Query, QueryKind, SmartQueryOptions, DEFAULT_BOOST, DEFAULT_FUZZY_DISTANCE};
pub use schema::{FieldGroup, Schema, SchemaBuilder, SchemaDefinition};
pub use tokenizer::{StemmerLanguage, Tokenizer, TokenizerConfig, TokenizerKind};
pub use transaction::{TransactionCoordinator, LOCK_FILE_NAME};
