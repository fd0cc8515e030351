//! Documents and typed field values
//!
//! Values are tagged once, where external input enters the crate (builder
//! calls or [`Document::from_json`]), and coerced into their field's group when
//! the document is handed to Tantivy.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tantivy::schema::Facet;
use tantivy::TantivyDocument;
use tracing::debug;

use crate::error::{SearchError, SearchResult};
use crate::schema::{FieldGroup, Schema};

/// A single field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Double(f64),
    Date(DateTime<Utc>),
    /// Slash-delimited facet path, e.g. `/genre/drama`
    Facet(String),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Integer(_) => "integer",
            FieldValue::Double(_) => "double",
            FieldValue::Date(_) => "date",
            FieldValue::Facet(_) => "facet",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Double(value.into())
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Date(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value.and_time(NaiveTime::MIN).and_utc())
    }
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC)
pub(crate) fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

/// Date in the engine's canonical microsecond representation
pub(crate) fn to_engine_date(datetime: &DateTime<Utc>) -> tantivy::DateTime {
    tantivy::DateTime::from_timestamp_micros(datetime.timestamp_micros())
}

/// A document to be indexed: an id plus multi-valued fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub values: BTreeMap<String, Vec<FieldValue>>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: BTreeMap::new(),
        }
    }

    /// Append a value; calling it again for the same field makes it multi-valued
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.push(field, value);
        self
    }

    pub fn push(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.values
            .entry(field.into())
            .or_default()
            .push(value.into());
    }

    pub fn get(&self, field: &str) -> &[FieldValue] {
        self.values.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Convert one JSON object using the schema's field groups
    ///
    /// The id may be a string or an integer. Arrays are multi-valued, `null`s
    /// are skipped and keys that are not schema fields are ignored.
    pub fn from_json(schema: &Schema, json: &JsonValue) -> SearchResult<Self> {
        let object = json.as_object().ok_or_else(|| SearchError::InvalidFieldValue {
            field: schema.id_field().to_string(),
            expected: "a JSON object".to_string(),
        })?;

        let id = match object.get(schema.id_field()) {
            Some(JsonValue::String(id)) => id.clone(),
            Some(JsonValue::Number(id)) if id.is_i64() || id.is_u64() => id.to_string(),
            _ => {
                return Err(SearchError::InvalidFieldValue {
                    field: schema.id_field().to_string(),
                    expected: "a string or integer id".to_string(),
                })
            }
        };

        let mut document = Document::new(id);

        for (field, group) in schema.fields() {
            let values = match object.get(field) {
                None | Some(JsonValue::Null) => continue,
                Some(JsonValue::Array(values)) => values.iter().collect::<Vec<_>>(),
                Some(value) => vec![value],
            };

            for value in values.into_iter().filter(|v| !v.is_null()) {
                document.push(field, json_value(field, group, value)?);
            }
        }

        Ok(document)
    }

    /// Build the engine document, checking every value against its field group
    pub(crate) fn to_tantivy(
        &self,
        schema: &Schema,
        engine_schema: &tantivy::schema::Schema,
    ) -> SearchResult<TantivyDocument> {
        let mut doc = TantivyDocument::default();

        let id_field = engine_schema.get_field(schema.id_field())?;
        doc.add_text(id_field, &self.id);

        for (name, values) in &self.values {
            let Some(group) = schema.field_group(name) else {
                debug!(field = %name, id = %self.id, "Skipping field not declared in schema");
                continue;
            };
            let field = engine_schema.get_field(name)?;

            for value in values {
                match (group, value) {
                    (FieldGroup::Text | FieldGroup::String, FieldValue::Text(text))
                    | (FieldGroup::Text | FieldGroup::String, FieldValue::Facet(text)) => {
                        doc.add_text(field, text);
                    }
                    (FieldGroup::Facet, FieldValue::Text(path))
                    | (FieldGroup::Facet, FieldValue::Facet(path)) => {
                        let facet = Facet::from_text(path)
                            .map_err(|_| invalid(name, "a facet path like /a/b"))?;
                        doc.add_facet(field, facet);
                    }
                    (FieldGroup::Integer, FieldValue::Integer(number)) => {
                        doc.add_i64(field, *number);
                    }
                    (FieldGroup::Double, FieldValue::Double(number)) => {
                        doc.add_f64(field, *number);
                    }
                    (FieldGroup::Double, FieldValue::Integer(number)) => {
                        doc.add_f64(field, *number as f64);
                    }
                    (FieldGroup::Date, FieldValue::Date(datetime)) => {
                        doc.add_date(field, to_engine_date(datetime));
                    }
                    (FieldGroup::Date, FieldValue::Text(text)) => {
                        let datetime =
                            parse_date(text).ok_or_else(|| invalid(name, expected_for(group)))?;
                        doc.add_date(field, to_engine_date(&datetime));
                    }
                    (group, _) => return Err(invalid(name, expected_for(group))),
                }
            }
        }

        Ok(doc)
    }
}

fn invalid(field: &str, expected: &str) -> SearchError {
    SearchError::InvalidFieldValue {
        field: field.to_string(),
        expected: expected.to_string(),
    }
}

fn expected_for(group: FieldGroup) -> &'static str {
    match group {
        FieldGroup::Text | FieldGroup::String => "text",
        FieldGroup::Integer => "an integer",
        FieldGroup::Double => "a number",
        FieldGroup::Date => "an RFC 3339 timestamp or YYYY-MM-DD date",
        FieldGroup::Facet => "a facet path like /a/b",
    }
}

fn json_value(field: &str, group: FieldGroup, value: &JsonValue) -> SearchResult<FieldValue> {
    let converted = match group {
        FieldGroup::Text | FieldGroup::String => value.as_str().map(FieldValue::from),
        FieldGroup::Facet => value.as_str().map(|path| FieldValue::Facet(path.to_string())),
        FieldGroup::Integer => value.as_i64().map(FieldValue::Integer),
        FieldGroup::Double => value.as_f64().map(FieldValue::Double),
        FieldGroup::Date => value.as_str().and_then(parse_date).map(FieldValue::Date),
    };

    converted.ok_or_else(|| invalid(field, expected_for(group)))
}
