//! Per-activation session state and the wire payload built from it.

use crate::config::AnalyticsOptions;
use crate::event::NormalizedEvent;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// State that lives from `enable_analytics` to `disable_analytics`.
///
/// Read-only once created. It owns the flush timer task, released with
/// [`Session::stop_timer`], and the runtime handle sends are spawned on.
#[derive(Debug)]
pub struct Session {
    pw_id: String,
    options: AnalyticsOptions,
    runtime: Option<Handle>,
    timer: Option<JoinHandle<()>>,
}

impl Session {
    /// Start a session with a freshly generated id.
    pub fn new(options: AnalyticsOptions) -> Self {
        Self {
            pw_id: Uuid::new_v4().to_string(),
            options,
            runtime: None,
            timer: None,
        }
    }

    pub fn pw_id(&self) -> &str {
        &self.pw_id
    }

    pub fn options(&self) -> &AnalyticsOptions {
        &self.options
    }

    pub(crate) fn attach_runtime(&mut self, runtime: Handle) {
        self.runtime = Some(runtime);
    }

    /// Runtime captured at activation. Sends go here whichever thread flushes.
    pub(crate) fn runtime(&self) -> Option<&Handle> {
        self.runtime.as_ref()
    }

    pub(crate) fn attach_timer(&mut self, timer: JoinHandle<()>) {
        self.timer = Some(timer);
    }

    #[cfg(test)]
    fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Cancel the periodic flush. In-flight sends are not affected.
    pub fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Build the payload for one flush.
    pub fn payload(&self, events: Vec<NormalizedEvent>, page_url: Option<String>) -> Payload {
        Payload {
            pw_id: self.pw_id.clone(),
            publisher_id: self.options.publisher_id.clone(),
            events,
            page_url,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_timer();
    }
}

/// POST body sent to the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub pw_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_id: Option<String>,

    pub events: Vec<NormalizedEvent>,

    pub page_url: Option<String>,
}
