use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use catfetch_common::{CatfetchError, Result};
use catfetch_http::{Dispatch, MediaType, RequestDescriptor};
use catfetch_render::{ContentMatch, OutputRegion, render};
use futures::future::join_all;
use tokio::task::JoinHandle;

pub const JSON_CONTROL_ID: &str = "getCatsJSON";
pub const XML_CONTROL_ID: &str = "getCatsXML";

/// The two trigger elements on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    GetCatsJson,
    GetCatsXml,
}

impl Control {
    pub const ALL: [Control; 2] = [Control::GetCatsJson, Control::GetCatsXml];

    pub fn id(self) -> &'static str {
        match self {
            Control::GetCatsJson => JSON_CONTROL_ID,
            Control::GetCatsXml => XML_CONTROL_ID,
        }
    }

    /// The `Accept` value this control asks for.
    pub fn accept(self) -> MediaType {
        match self {
            Control::GetCatsJson => MediaType::Json,
            Control::GetCatsXml => MediaType::Xml,
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.id())
    }
}

impl FromStr for Control {
    type Err = String;

    /// Accepts `json`/`xml` or the element ids, with or without a leading `#`.
    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let raw = raw.trim().trim_start_matches('#');
        if raw.eq_ignore_ascii_case("json") || raw == JSON_CONTROL_ID {
            Ok(Control::GetCatsJson)
        } else if raw.eq_ignore_ascii_case("xml") || raw == XML_CONTROL_ID {
            Ok(Control::GetCatsXml)
        } else {
            Err(format!(
                "unknown control: {raw} (expected json, xml, {JSON_CONTROL_ID} or {XML_CONTROL_ID})"
            ))
        }
    }
}

/// A mounted page. Activations share the dispatcher and the output region
/// and nothing else.
pub struct Page {
    dispatch: Arc<dyn Dispatch>,
    path: String,
    mode: ContentMatch,
    content: OutputRegion,
    cycles: AtomicU64,
}

impl Page {
    /// Wire both controls to `path` and create an empty `#content` region.
    pub fn mount(
        dispatch: Arc<dyn Dispatch>,
        path: impl Into<String>,
        mode: ContentMatch,
    ) -> Result<Self> {
        let path = path.into();
        for control in Control::ALL {
            // Validate once up front; descriptors are still built per activation.
            RequestDescriptor::new(path.clone(), control.accept())
                .map_err(|e| CatfetchError::Config(e.to_string()))?;
        }
        tracing::info!(path=%path, ?mode, controls=?Control::ALL.map(Control::id), "page.mounted");
        Ok(Self {
            dispatch,
            path,
            mode,
            content: OutputRegion::new(),
            cycles: AtomicU64::new(0),
        })
    }

    pub fn content(&self) -> &OutputRegion {
        &self.content
    }

    /// Fire a control. The request and its render run on their own task;
    /// overlapping activations race and land in whatever order they resolve.
    ///
    /// Must be called from within a tokio runtime.
    pub fn activate(&self, control: Control) -> JoinHandle<Result<()>> {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed);
        let dispatch = Arc::clone(&self.dispatch);
        let region = self.content.clone();
        let path = self.path.clone();
        let mode = self.mode;

        tokio::spawn(async move {
            let outcome = run_cycle(dispatch.as_ref(), &path, control, &region, mode).await;
            match &outcome {
                Ok(()) => tracing::debug!(cycle, %control, "page.cycle.done"),
                Err(e) => tracing::warn!(cycle, %control, error=%e, "page.cycle.failed"),
            }
            outcome
        })
    }

    /// Fire each control in turn and wait for every cycle to settle.
    ///
    /// With `sequential` set, each cycle completes before the next control
    /// fires, so groups land in activation order. Otherwise all fire at once.
    pub async fn click_through(&self, controls: &[Control], sequential: bool) -> Vec<Result<()>> {
        if sequential {
            let mut outcomes = Vec::with_capacity(controls.len());
            for control in controls {
                outcomes.push(flatten(self.activate(*control).await));
            }
            return outcomes;
        }

        let handles: Vec<_> = controls.iter().map(|c| self.activate(*c)).collect();
        join_all(handles).await.into_iter().map(flatten).collect()
    }
}

fn flatten(joined: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    joined.map_err(CatfetchError::from).and_then(|r| r)
}

async fn run_cycle(
    dispatch: &dyn Dispatch,
    path: &str,
    control: Control,
    region: &OutputRegion,
    mode: ContentMatch,
) -> Result<()> {
    let descriptor = RequestDescriptor::new(path, control.accept())
        .map_err(|e| CatfetchError::Config(e.to_string()))?;

    let response = dispatch
        .issue_request(&descriptor)
        .await
        .map_err(|e| CatfetchError::Dispatch(e.to_string()))?;

    render(&response, region, mode).map_err(|e| CatfetchError::Render(e.to_string()))
}
