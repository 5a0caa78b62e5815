//! Raw corpus records and their canonical form.
//!
//! Every raw attribute is read by its own extractor returning
//! `Result<T, FieldError>`; the normalizer collapses each error to the
//! field's default, so one odd attribute never costs the whole record.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;
use tracing::trace;

use super::text::{clean, clean_str};
use super::venue::Venue;

/// Why a single raw field could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("record is not an object")]
    NotAnObject,
    #[error("field '{0}' is missing")]
    Missing(&'static str),
    #[error("field '{field}' should be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("field '{field}' cannot be parsed from {value}")]
    Unparsable { field: &'static str, value: String },
}

type FieldResult<T> = Result<T, FieldError>;

/// Collapse a field extraction to its default value.
fn or_default<T: Default>(field: &'static str, result: FieldResult<T>) -> T {
    result.unwrap_or_else(|e| {
        trace!(field, "Using default: {}", e);
        T::default()
    })
}

/// One item from the corpus, as loaded. Any attribute may be absent or of
/// an unexpected type.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord(JsonValue);

impl From<JsonValue> for RawRecord {
    fn from(value: JsonValue) -> Self {
        RawRecord(value)
    }
}

impl RawRecord {
    pub fn as_json(&self) -> &JsonValue {
        &self.0
    }

    /// Present, non-null attribute.
    fn get(&self, field: &'static str) -> FieldResult<&JsonValue> {
        let map = self.0.as_object().ok_or(FieldError::NotAnObject)?;
        match map.get(field) {
            None | Some(JsonValue::Null) => Err(FieldError::Missing(field)),
            Some(value) => Ok(value),
        }
    }

    fn text(&self, field: &'static str) -> FieldResult<String> {
        self.get(field).map(clean)
    }

    fn url(&self, field: &'static str) -> FieldResult<String> {
        match self.get(field)? {
            JsonValue::String(s) => Ok(s.trim().to_string()),
            _ => Err(FieldError::WrongType {
                field,
                expected: "a string",
            }),
        }
    }

    /// Primary `id`, falling back to `anthology_id` when absent or blank.
    pub fn id(&self) -> FieldResult<String> {
        match self.text("id") {
            Ok(id) if !id.is_empty() => Ok(id),
            _ => self.text("anthology_id"),
        }
    }

    pub fn title(&self) -> FieldResult<String> {
        self.text("title")
    }

    pub fn abstract_text(&self) -> FieldResult<String> {
        self.text("abstract")
    }

    /// Publication year as an integer; accepts numbers and numeric strings.
    pub fn year(&self) -> FieldResult<i64> {
        let value = self.get("year")?;
        let unparsable = || FieldError::Unparsable {
            field: "year",
            value: value.to_string(),
        };
        match value {
            JsonValue::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(unparsable),
            JsonValue::String(s) if s.trim().is_empty() => Err(FieldError::Missing("year")),
            JsonValue::String(s) => s.trim().parse().map_err(|_| unparsable()),
            _ => Err(unparsable()),
        }
    }

    /// Raw venue identifiers in corpus order. A lone string counts as a
    /// one-element list; non-string entries are skipped.
    pub fn venue_ids(&self) -> FieldResult<Vec<String>> {
        match self.get("venue_ids")? {
            JsonValue::String(s) => Ok(vec![s.clone()]),
            JsonValue::Array(items) => Ok(items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()),
            _ => Err(FieldError::WrongType {
                field: "venue_ids",
                expected: "a list of strings",
            }),
        }
    }

    /// Authors by display name; authors that cannot be rendered are skipped.
    pub fn authors(&self) -> FieldResult<Vec<Author>> {
        match self.get("authors")? {
            JsonValue::Array(items) => Ok(items
                .iter()
                .filter_map(|a| author_name(a).ok())
                .map(Author::named)
                .collect()),
            _ => Err(FieldError::WrongType {
                field: "authors",
                expected: "a list",
            }),
        }
    }

    /// `pdf.url`, or `pdf` itself when it is a plain string.
    pub fn pdf_url(&self) -> FieldResult<String> {
        match self.get("pdf")? {
            JsonValue::String(s) => Ok(s.trim().to_string()),
            JsonValue::Object(map) => match map.get("url") {
                Some(JsonValue::String(s)) => Ok(s.trim().to_string()),
                _ => Err(FieldError::Missing("pdf.url")),
            },
            _ => Err(FieldError::WrongType {
                field: "pdf",
                expected: "a reference with a url",
            }),
        }
    }

    pub fn web_url(&self) -> FieldResult<String> {
        self.url("web_url")
    }

    pub fn doi(&self) -> FieldResult<String> {
        self.url("doi")
    }

    pub fn kind(&self) -> FieldResult<String> {
        match self.get("type")? {
            JsonValue::String(s) => Ok(s.clone()),
            _ => Err(FieldError::WrongType {
                field: "type",
                expected: "a string",
            }),
        }
    }

    /// Proceedings front or back matter, by flag or by type tag. Any
    /// non-empty, non-zero, non-false flag counts.
    pub fn is_frontmatter(&self) -> bool {
        let flagged = self.get("is_frontmatter").map(truthy).unwrap_or(false);
        let tagged = matches!(
            self.kind().as_deref(),
            Ok("frontmatter") | Ok("backmatter")
        );
        flagged || tagged
    }
}

fn truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::Object(map) => !map.is_empty(),
    }
}

/// Display name of one raw author.
fn author_name(value: &JsonValue) -> FieldResult<String> {
    let name = match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Object(map) => match map.get("name") {
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Object(parts)) => join_name_parts(parts),
            _ => join_name_parts(map),
        },
        _ => {
            return Err(FieldError::WrongType {
                field: "authors",
                expected: "a name or name object",
            })
        }
    };
    let name = clean_str(&name);
    if name.is_empty() {
        Err(FieldError::Missing("authors.name"))
    } else {
        Ok(name)
    }
}

fn join_name_parts(parts: &Map<String, JsonValue>) -> String {
    ["first", "last"]
        .iter()
        .filter_map(|key| parts.get(*key).and_then(JsonValue::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Author entry of a canonical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub affiliation: String,
}

impl Author {
    /// Affiliations are not extracted; the field stays empty.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affiliation: String::new(),
        }
    }
}

/// Normalized record returned by `getPapers`.
///
/// The trailing optional fields are filled by a later enrichment stage;
/// the harvester always emits them as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub id: String,
    pub title: String,
    pub abs: String,
    pub year: i64,
    pub venue: Venue,
    #[serde(deserialize_with = "one_or_many")]
    pub venue_raw: Vec<String>,
    pub pdf_url: String,
    pub authors: Vec<Author>,
    pub doi: Option<String>,
    #[serde(default)]
    pub open_alex_id: Option<String>,
    #[serde(default)]
    pub cited_by_count: Option<u64>,
    #[serde(default)]
    pub is_classification_candidate: Option<bool>,
    #[serde(default)]
    pub is_dataset_or_benchmark_candidate: Option<bool>,
    #[serde(default)]
    pub signals: Option<JsonValue>,
    #[serde(default)]
    pub referenced_works: Option<Vec<String>>,
}

impl CanonicalRecord {
    /// Build the canonical form of `raw` once its year and venue are known.
    pub fn from_raw(raw: &RawRecord, year: i64, venue: Venue) -> Self {
        let pdf_url = or_default("pdf", raw.pdf_url());
        let pdf_url = if pdf_url.is_empty() {
            or_default("web_url", raw.web_url())
        } else {
            pdf_url
        };
        let doi = or_default("doi", raw.doi());

        Self {
            id: or_default("id", raw.id()),
            title: or_default("title", raw.title()),
            abs: or_default("abstract", raw.abstract_text()),
            year,
            venue,
            venue_raw: or_default("venue_ids", raw.venue_ids()),
            pdf_url,
            authors: or_default("authors", raw.authors()),
            doi: (!doi.is_empty()).then_some(doi),
            open_alex_id: None,
            cited_by_count: None,
            is_classification_candidate: None,
            is_dataset_or_benchmark_candidate: None,
            signals: None,
            referenced_works: None,
        }
    }

    /// Records without an id or a title are never emitted.
    pub fn is_complete(&self) -> bool {
        !self.id.is_empty() && !self.title.is_empty()
    }
}

/// Year of a raw record; unreadable years count as 0.
pub fn record_year(raw: &RawRecord) -> i64 {
    or_default("year", raw.year())
}

/// Raw venue identifiers; unreadable lists count as empty.
pub fn record_venue_ids(raw: &RawRecord) -> Vec<String> {
    or_default("venue_ids", raw.venue_ids())
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}
