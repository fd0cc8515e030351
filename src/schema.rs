//! Index schema: the id field, typed field groups and tokenizer overrides
//!
//! A [`Schema`] is declared once, through [`SchemaBuilder`] or a TOML
//! [`SchemaDefinition`], and is immutable afterwards. It maps onto the Tantivy
//! schema as follows:
//!
//! | Group     | Tantivy field                                   |
//! |-----------|-------------------------------------------------|
//! | id        | `STRING \| STORED`                              |
//! | text      | indexed with freqs and positions, own tokenizer |
//! | string    | `STRING` (raw, untokenized)                     |
//! | integer   | `i64`, `FAST \| INDEXED`                        |
//! | double    | `f64`, `FAST \| INDEXED`                        |
//! | date      | date, `FAST \| INDEXED`                         |
//! | facet     | hierarchical facet                              |

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tantivy::schema::{
    FacetOptions, IndexRecordOption, TextFieldIndexing, TextOptions, FAST, INDEXED, STORED,
    STRING,
};

use crate::error::{SearchError, SearchResult};
use crate::tokenizer::{Tokenizer, TokenizerConfig};

/// Name under which the schema's default tokenizer is registered
pub const DEFAULT_TOKENIZER_NAME: &str = "default";

/// Default name of the identifier field
pub const DEFAULT_ID_FIELD: &str = "id";

/// Tokenizers Tantivy registers itself; the id field relies on `raw`
const BUILTIN_TOKENIZER_NAMES: &[&str] = &["raw", DEFAULT_TOKENIZER_NAME, "en_stem", "whitespace"];

/// The typed group a field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    Text,
    String,
    Integer,
    Double,
    Date,
    Facet,
}

impl FieldGroup {
    pub fn name(&self) -> &'static str {
        match self {
            FieldGroup::Text => "text",
            FieldGroup::String => "string",
            FieldGroup::Integer => "integer",
            FieldGroup::Double => "double",
            FieldGroup::Date => "date",
            FieldGroup::Facet => "facet",
        }
    }
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static description of the documents held by an index
#[derive(Clone)]
pub struct Schema {
    id_field: String,
    default_tokenizer: Tokenizer,
    fields: Vec<(String, FieldGroup)>,
    field_tokenizers: HashMap<String, Tokenizer>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Resolve a declarative definition, building every tokenizer it names
    pub fn from_definition(definition: &SchemaDefinition) -> SearchResult<Self> {
        let mut builder = Schema::builder()
            .id(&definition.id)
            .default_tokenizer(Tokenizer::from_config(&definition.tokenizer)?);

        for field in &definition.text {
            builder = match definition.tokenizers.get(field) {
                Some(config) => builder.text_with_tokenizer(field, Tokenizer::from_config(config)?),
                None => builder.text(field),
            };
        }
        if let Some(field) = definition
            .tokenizers
            .keys()
            .find(|field| !definition.text.contains(field))
        {
            return Err(SearchError::InvalidSchema(format!(
                "tokenizer override for \"{field}\", which is not a text field"
            )));
        }

        for field in &definition.string {
            builder = builder.string(field);
        }
        for field in &definition.integer {
            builder = builder.integer(field);
        }
        for field in &definition.double {
            builder = builder.double(field);
        }
        for field in &definition.date {
            builder = builder.date(field);
        }
        for field in &definition.facet {
            builder = builder.facet(field);
        }

        builder.build()
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn default_tokenizer(&self) -> &Tokenizer {
        &self.default_tokenizer
    }

    /// The group a field was declared in, `None` for unknown fields and the id
    pub fn field_group(&self, field: &str) -> Option<FieldGroup> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, group)| *group)
    }

    /// Fields of one group, in declaration order
    pub fn fields_of(&self, group: FieldGroup) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, g)| *g == group)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn text_fields(&self) -> Vec<&str> {
        self.fields_of(FieldGroup::Text)
    }

    pub fn string_fields(&self) -> Vec<&str> {
        self.fields_of(FieldGroup::String)
    }

    pub fn integer_fields(&self) -> Vec<&str> {
        self.fields_of(FieldGroup::Integer)
    }

    pub fn double_fields(&self) -> Vec<&str> {
        self.fields_of(FieldGroup::Double)
    }

    pub fn date_fields(&self) -> Vec<&str> {
        self.fields_of(FieldGroup::Date)
    }

    pub fn facet_fields(&self) -> Vec<&str> {
        self.fields_of(FieldGroup::Facet)
    }

    /// All declared fields with their groups, in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldGroup)> {
        self.fields.iter().map(|(name, group)| (name.as_str(), *group))
    }

    /// Tokenizer used for a text field: its override, or the default
    pub fn tokenizer_for(&self, field: &str) -> &Tokenizer {
        self.field_tokenizers
            .get(field)
            .unwrap_or(&self.default_tokenizer)
    }

    /// Name the field's tokenizer is registered under in the Tantivy index
    fn tokenizer_name<'a>(&self, field: &'a str) -> &'a str {
        if self.field_tokenizers.contains_key(field) {
            field
        } else {
            DEFAULT_TOKENIZER_NAME
        }
    }

    /// Build the matching Tantivy schema
    pub(crate) fn to_tantivy(&self) -> tantivy::schema::Schema {
        let mut builder = tantivy::schema::Schema::builder();

        builder.add_text_field(&self.id_field, STRING | STORED);

        for (name, group) in &self.fields {
            match group {
                FieldGroup::Text => {
                    let indexing = TextFieldIndexing::default()
                        .set_tokenizer(self.tokenizer_name(name))
                        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
                    let options = TextOptions::default().set_indexing_options(indexing);
                    builder.add_text_field(name, options);
                }
                FieldGroup::String => {
                    builder.add_text_field(name, STRING);
                }
                FieldGroup::Integer => {
                    builder.add_i64_field(name, FAST | INDEXED);
                }
                FieldGroup::Double => {
                    builder.add_f64_field(name, FAST | INDEXED);
                }
                FieldGroup::Date => {
                    builder.add_date_field(name, FAST | INDEXED);
                }
                FieldGroup::Facet => {
                    builder.add_facet_field(name, FacetOptions::default());
                }
            }
        }

        builder.build()
    }

    /// Register the default and per-field analyzers with a Tantivy index
    pub(crate) fn register_tokenizers(&self, index: &tantivy::Index) {
        let tokenizers = index.tokenizers();

        tokenizers.register(DEFAULT_TOKENIZER_NAME, self.default_tokenizer.analyzer());
        for (field, tokenizer) in &self.field_tokenizers {
            tokenizers.register(field, tokenizer.analyzer());
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("id_field", &self.id_field)
            .field("fields", &self.fields)
            .field("overrides", &self.field_tokenizers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`Schema`]
pub struct SchemaBuilder {
    id_field: String,
    default_tokenizer: Tokenizer,
    fields: Vec<(String, FieldGroup)>,
    field_tokenizers: HashMap<String, Tokenizer>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            default_tokenizer: Tokenizer::default(),
            fields: Vec::new(),
            field_tokenizers: HashMap::new(),
        }
    }
}

impl SchemaBuilder {
    pub fn id(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    pub fn default_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.default_tokenizer = tokenizer;
        self
    }

    pub fn text(self, field: impl Into<String>) -> Self {
        self.field(field, FieldGroup::Text)
    }

    /// Text field analyzed with its own tokenizer instead of the default
    pub fn text_with_tokenizer(mut self, field: impl Into<String>, tokenizer: Tokenizer) -> Self {
        let field = field.into();
        self.field_tokenizers.insert(field.clone(), tokenizer);
        self.field(field, FieldGroup::Text)
    }

    pub fn string(self, field: impl Into<String>) -> Self {
        self.field(field, FieldGroup::String)
    }

    pub fn integer(self, field: impl Into<String>) -> Self {
        self.field(field, FieldGroup::Integer)
    }

    pub fn double(self, field: impl Into<String>) -> Self {
        self.field(field, FieldGroup::Double)
    }

    pub fn date(self, field: impl Into<String>) -> Self {
        self.field(field, FieldGroup::Date)
    }

    pub fn facet(self, field: impl Into<String>) -> Self {
        self.field(field, FieldGroup::Facet)
    }

    fn field(mut self, field: impl Into<String>, group: FieldGroup) -> Self {
        self.fields.push((field.into(), group));
        self
    }

    /// Validate and freeze the schema
    ///
    /// Fails when a field is declared twice, in one group or across groups,
    /// or when a field reuses the id field's name. A field with its own
    /// tokenizer registers it under the field name, so that name must not be
    /// one of Tantivy's built-in tokenizers.
    pub fn build(self) -> SearchResult<Schema> {
        let mut seen = HashSet::new();
        seen.insert(self.id_field.as_str());

        for (name, _) in &self.fields {
            if name.is_empty() {
                return Err(SearchError::InvalidSchema("empty field name".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(SearchError::InvalidSchema(format!(
                    "field \"{name}\" is declared more than once"
                )));
            }
        }

        if let Some(name) = self
            .field_tokenizers
            .keys()
            .find(|name| BUILTIN_TOKENIZER_NAMES.contains(&name.as_str()))
        {
            return Err(SearchError::InvalidSchema(format!(
                "field \"{name}\" cannot have its own tokenizer: the name is reserved"
            )));
        }

        Ok(Schema {
            id_field: self.id_field,
            default_tokenizer: self.default_tokenizer,
            fields: self.fields,
            field_tokenizers: self.field_tokenizers,
        })
    }
}

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_string()
}

/// Declarative schema, as read from configuration files
///
/// ```toml
/// id = "imdb_id"
/// text = ["description", "en_text"]
/// string = ["title"]
/// integer = ["duration"]
///
/// [tokenizers.en_text]
/// kind = "stemmer"
/// language = "en"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default = "default_id_field")]
    pub id: String,

    /// Default tokenizer for text fields
    #[serde(default = "TokenizerConfig::simple")]
    pub tokenizer: TokenizerConfig,

    /// Per-field tokenizer overrides (text fields only)
    #[serde(default)]
    pub tokenizers: HashMap<String, TokenizerConfig>,

    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default)]
    pub string: Vec<String>,
    #[serde(default)]
    pub integer: Vec<String>,
    #[serde(default)]
    pub double: Vec<String>,
    #[serde(default)]
    pub date: Vec<String>,
    #[serde(default)]
    pub facet: Vec<String>,
}

impl Default for SchemaDefinition {
    fn default() -> Self {
        Self {
            id: default_id_field(),
            tokenizer: TokenizerConfig::simple(),
            tokenizers: HashMap::new(),
            text: Vec::new(),
            string: Vec::new(),
            integer: Vec::new(),
            double: Vec::new(),
            date: Vec::new(),
            facet: Vec::new(),
        }
    }
}
