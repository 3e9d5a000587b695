//! The append-only `#content` region and its serializations.

use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::DisplayedRecord;

const CONTENT_ID: &str = "content";
const TEXT_DIVIDER: &str = "----------------------------------------";

/// One display element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Node {
    Divider,
    Heading(String),
    Paragraph(String),
    SubHeading(String),
}

impl Node {
    pub fn text(&self) -> Option<&str> {
        match self {
            Node::Divider => None,
            Node::Heading(t) | Node::Paragraph(t) | Node::SubHeading(t) => Some(t),
        }
    }
}

/// Everything a single render cycle appends: a divider followed by the name
/// heading, age paragraph, content-type sub-heading and raw body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RenderGroup {
    nodes: Vec<Node>,
}

impl RenderGroup {
    pub fn new(record: &DisplayedRecord, content_type: &str, raw_body: &str) -> Self {
        Self {
            nodes: vec![
                Node::Divider,
                Node::Heading(format!("Name: {}", record.name)),
                Node::Paragraph(format!("Age: {}", record.age)),
                Node::SubHeading(content_type.to_string()),
                Node::Paragraph(raw_body.to_string()),
            ],
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

/// How the region is written out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Html,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format: {other} (expected text, html or json)")),
        }
    }
}

/// Shared output region. Clones point at the same list of groups.
///
/// Groups are only ever pushed, never removed or edited, so concurrent render
/// cycles can interleave but never corrupt one another.
///
/// ```
/// use catfetch_render::{DisplayedRecord, OutputRegion, RenderGroup};
///
/// let region = OutputRegion::new();
/// let handle = region.clone();
/// let rec = DisplayedRecord { name: "Tom".into(), age: "3".into() };
/// handle.append(RenderGroup::new(&rec, "application/json", "{}"));
///
/// assert_eq!(region.group_count(), 1);
/// assert_eq!(region.snapshot()[0].nodes().len(), 5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct OutputRegion {
    groups: Arc<Mutex<Vec<RenderGroup>>>,
}

impl OutputRegion {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RenderGroup>> {
        // Appends are single pushes; a poisoned lock still holds whole groups.
        self.groups.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Push a group and return its position.
    pub fn append(&self, group: RenderGroup) -> usize {
        let mut groups = self.lock();
        groups.push(group);
        groups.len() - 1
    }

    pub fn group_count(&self) -> usize {
        self.lock().len()
    }

    pub fn snapshot(&self) -> Vec<RenderGroup> {
        self.lock().clone()
    }

    pub fn render_as(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Text => Ok(self.to_text()),
            OutputFormat::Html => Ok(self.to_html()),
            OutputFormat::Json => self.to_json(),
        }
    }

    /// HTML fragment for the region, with every text value escaped.
    pub fn to_html(&self) -> String {
        let mut out = format!("<div id=\"{CONTENT_ID}\">\n");
        for group in self.snapshot() {
            for node in group.nodes() {
                let _ = match node {
                    Node::Divider => writeln!(out, "<hr>"),
                    Node::Heading(t) => writeln!(out, "<h1>{}</h1>", escape_html(t)),
                    Node::Paragraph(t) => writeln!(out, "<p>{}</p>", escape_html(t)),
                    Node::SubHeading(t) => writeln!(out, "<h2>{}</h2>", escape_html(t)),
                };
            }
        }
        out.push_str("</div>\n");
        out
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for group in self.snapshot() {
            for node in group.nodes() {
                let _ = match node {
                    Node::Divider => writeln!(out, "{TEXT_DIVIDER}"),
                    Node::Heading(t) => writeln!(out, "# {t}"),
                    Node::Paragraph(t) => writeln!(out, "{t}"),
                    Node::SubHeading(t) => writeln!(out, "## {t}"),
                };
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot())
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
