//! Response rendering for catfetch.
//!
//! A render cycle reads one [`FetchedResponse`](catfetch_http::FetchedResponse),
//! picks a parser from its `Content-Type`, pulls out the `name` and `age`
//! fields, and appends one group of display nodes to an [`OutputRegion`].
//!
//! # Examples
//! ```rust
//! use catfetch_http::FetchedResponse;
//! use catfetch_http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
//! use catfetch_render::{render, ContentMatch, OutputRegion};
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
//! let resp = FetchedResponse::new(
//!     catfetch_http::StatusCode::OK,
//!     headers,
//!     r#"{"name":"Tom","age":3}"#,
//! );
//!
//! let region = OutputRegion::new();
//! render(&resp, &region, ContentMatch::Exact).unwrap();
//! assert_eq!(region.group_count(), 1);
//! assert!(region.to_text().contains("Name: Tom"));
//! ```

pub mod extract;
pub mod output;

pub use extract::{ContentMatch, DisplayedRecord, ResponseKind, extract_record};
pub use output::{Node, OutputFormat, OutputRegion, RenderGroup};

use catfetch_http::FetchedResponse;

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("malformed JSON body: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("malformed XML body: {0}")]
    MalformedXml(#[from] roxmltree::Error),
}

/// Run one render cycle.
///
/// The whole group is built before anything touches the region, so a body
/// that fails to parse leaves the region exactly as it was.
pub fn render(
    response: &FetchedResponse,
    region: &OutputRegion,
    mode: ContentMatch,
) -> Result<(), RenderError> {
    let content_type = response.content_type();
    let kind = ResponseKind::classify(content_type, mode);

    let record = match extract_record(kind, &response.body) {
        Ok(record) => record,
        Err(err) => {
            tracing::warn!(
                status=%response.status,
                content_type=?content_type,
                error=%err,
                "render.parse_failed"
            );
            return Err(err);
        }
    };

    let group = RenderGroup::new(&record, content_type.unwrap_or(""), &response.body);
    let index = region.append(group);

    tracing::debug!(
        status=%response.status,
        ?kind,
        group = index,
        name=%record.name,
        age=%record.age,
        "render.appended"
    );
    Ok(())
}
