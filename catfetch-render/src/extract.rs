//! Content-type classification and field extraction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use catfetch_http::{APPLICATION_JSON, TEXT_XML};

use crate::RenderError;

const NAME_FIELD: &str = "name";
const AGE_FIELD: &str = "age";

/// How a `Content-Type` value is compared against the known media types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMatch {
    /// Byte-for-byte comparison: `application/json; charset=utf-8` is not JSON.
    #[default]
    Exact,
    /// Compare the media-type essence only, ignoring parameters and ASCII case.
    Essence,
}

/// Which parser a response body goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Json,
    Xml,
    Unrecognized,
}

impl ResponseKind {
    /// ```
    /// use catfetch_render::{ContentMatch, ResponseKind};
    ///
    /// assert_eq!(
    ///     ResponseKind::classify(Some("text/xml"), ContentMatch::Exact),
    ///     ResponseKind::Xml
    /// );
    /// assert_eq!(
    ///     ResponseKind::classify(Some("Text/XML; charset=utf-8"), ContentMatch::Exact),
    ///     ResponseKind::Unrecognized
    /// );
    /// assert_eq!(
    ///     ResponseKind::classify(Some("Text/XML; charset=utf-8"), ContentMatch::Essence),
    ///     ResponseKind::Xml
    /// );
    /// assert_eq!(ResponseKind::classify(None, ContentMatch::Essence), ResponseKind::Unrecognized);
    /// ```
    pub fn classify(content_type: Option<&str>, mode: ContentMatch) -> Self {
        let Some(raw) = content_type else {
            return ResponseKind::Unrecognized;
        };
        match mode {
            ContentMatch::Exact => match raw {
                APPLICATION_JSON => ResponseKind::Json,
                TEXT_XML => ResponseKind::Xml,
                _ => ResponseKind::Unrecognized,
            },
            ContentMatch::Essence => {
                let essence = raw.split(';').next().unwrap_or("").trim();
                if essence.eq_ignore_ascii_case(APPLICATION_JSON) {
                    ResponseKind::Json
                } else if essence.eq_ignore_ascii_case(TEXT_XML) {
                    ResponseKind::Xml
                } else {
                    ResponseKind::Unrecognized
                }
            }
        }
    }
}

/// The two fields shown for a response. Missing values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayedRecord {
    pub name: String,
    pub age: String,
}

/// Pull `name` and `age` out of a body of the given kind.
///
/// Unrecognized bodies are never parsed and give an empty record. Well-formed
/// bodies that lack a field give an empty value for it.
pub fn extract_record(kind: ResponseKind, body: &str) -> Result<DisplayedRecord, RenderError> {
    match kind {
        ResponseKind::Json => from_json(body),
        ResponseKind::Xml => from_xml(body),
        ResponseKind::Unrecognized => Ok(DisplayedRecord::default()),
    }
}

fn from_json(body: &str) -> Result<DisplayedRecord, RenderError> {
    let value: Value = serde_json::from_str(body)?;
    Ok(DisplayedRecord {
        name: json_field(&value, NAME_FIELD),
        age: json_field(&value, AGE_FIELD),
    })
}

fn json_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => display_number(n),
        Some(other) => other.to_string(),
    }
}

/// Integral floats display without a fraction, so `3.0` shows as `3`.
fn display_number(n: &serde_json::Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f == 0.0 {
                return "0".to_string();
            }
            if f.fract() == 0.0 && f.abs() < 1e21 {
                return format!("{f:.0}");
            }
        }
    }
    n.to_string()
}

fn from_xml(body: &str) -> Result<DisplayedRecord, RenderError> {
    let opts = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(body, opts)?;
    Ok(DisplayedRecord {
        name: xml_text_of_first(&doc, NAME_FIELD),
        age: xml_text_of_first(&doc, AGE_FIELD),
    })
}

/// Concatenated text of the first element whose qualified name is `tag`, in
/// document order. Prefixed elements (`<a:name>`) do not match.
fn xml_text_of_first(doc: &roxmltree::Document<'_>, tag: &str) -> String {
    doc.descendants()
        .find(|n| n.is_element() && is_unprefixed(n, tag))
        .map(|el| {
            el.descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect()
        })
        .unwrap_or_default()
}

/// An element without a prefix sits in the default namespace in scope (or in
/// none at all).
fn is_unprefixed(node: &roxmltree::Node<'_, '_>, tag: &str) -> bool {
    let name = node.tag_name();
    name.name() == tag && name.namespace() == node.default_namespace()
}
