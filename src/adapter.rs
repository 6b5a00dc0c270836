//! The AdvRed analytics adapter - dispatcher and flush controller.
//!
//! # Flow
//!
//! ```text
//! track(kind, args)
//!     │  unknown kind? ──► dropped
//!     ▼
//! copy args ──► project(kind) ──► stamp ──► BatchBuffer.append
//!                                               │
//!                         auctionEnd? ──────────┤
//!                         timer tick  ──────────┤
//!                                               ▼
//!                                         flush_now()
//!                            drain ─► Payload ─► JSON ─► spawn Transport::send
//! ```
//!
//! Flushing drains the buffer synchronously and hands the serialized batch to
//! a task on the runtime captured at activation, so any thread may track or
//! flush. The adapter never waits for delivery and never restores a batch
//! that failed to send. Collaborators (page URL, transport) are only called
//! with the session lock released.
//!
//! # Example
//!
//! ```rust,ignore
//! use advred_analytics::{AdvRedAnalytics, AdapterConfig, AnalyticsOptions};
//! use advred_analytics::transport::HttpTransport;
//! use advred_analytics::page::StaticPageUrl;
//! use std::sync::Arc;
//!
//! let adapter = AdvRedAnalytics::new(
//!     Arc::new(HttpTransport::new()?),
//!     Arc::new(StaticPageUrl::new("https://www.example.com/")),
//! );
//! adapter.enable_analytics(AdapterConfig::new(AnalyticsOptions::with_publisher_id("pub1")));
//! adapter.track("bidWon", &serde_json::json!({"adId": "a1", "cpm": 1.2}));
//! adapter.disable_analytics();
//! ```

use crate::buffer::BatchBuffer;
use crate::config::{AdapterConfig, AnalyticsOptions};
use crate::event::{is_truthy, EventKind};
use crate::normalize;
use crate::page::PageUrlSource;
use crate::session::{Payload, Session};
use crate::transport::Transport;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Batching analytics adapter for auction lifecycle events.
///
/// Cheap to clone; clones share the same buffer and session.
#[derive(Clone)]
pub struct AdvRedAnalytics {
    inner: Arc<Inner>,
}

struct Inner {
    buffer: BatchBuffer,
    transport: Arc<dyn Transport>,
    page: Arc<dyn PageUrlSource>,
    session: Mutex<Option<Session>>,
    /// Sends that may still be running; reaped on every dispatch
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl AdvRedAnalytics {
    pub fn new(transport: Arc<dyn Transport>, page: Arc<dyn PageUrlSource>) -> Self {
        Self {
            inner: Arc::new(Inner {
                buffer: BatchBuffer::new(),
                transport,
                page,
                session: Mutex::new(None),
                in_flight: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Start a session: new session id, periodic flush timer.
    ///
    /// Enabling while already enabled replaces the session and stops the
    /// previous timer. Buffered events are kept and go out with the new
    /// session's next flush.
    pub fn enable_analytics(&self, config: AdapterConfig) {
        let mut session = Session::new(config.options);
        let interval = session.options().flush_interval();

        match Handle::try_current() {
            Ok(handle) => {
                let timer = handle.spawn(run_flush_timer(
                    Arc::downgrade(&self.inner),
                    session.pw_id().to_string(),
                    interval,
                ));
                session.attach_timer(timer);
                session.attach_runtime(handle);
            }
            Err(_) => {
                warn!("No async runtime available, periodic flush disabled and events kept buffered");
            }
        }

        info!(
            pw_id = %session.pw_id(),
            publisher_id = ?session.options().publisher_id,
            endpoint = %session.options().endpoint_url(),
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            "AdvRed analytics enabled"
        );

        if let Some(mut previous) = self.inner.session.lock().replace(session) {
            previous.stop_timer();
            warn!(
                previous_pw_id = %previous.pw_id(),
                "AdvRed analytics re-enabled, previous session replaced"
            );
        }
    }

    /// End the session: stop the timer, then flush whatever is buffered.
    pub fn disable_analytics(&self) {
        let Some(mut session) = self.inner.session.lock().take() else {
            debug!("AdvRed analytics not enabled, nothing to disable");
            return;
        };

        // The session is no longer reachable, so a late timer tick cannot
        // flush after this point.
        session.stop_timer();
        let flushed = self
            .inner
            .take_batch(&session)
            .map_or(0, |batch| self.inner.send_batch(batch));

        info!(
            pw_id = %session.pw_id(),
            flushed = flushed,
            "AdvRed analytics disabled"
        );
    }

    /// Ingest one host event.
    ///
    /// Unrecognized event types are ignored. The payload is copied before it
    /// is read; if it cannot be copied the event is recorded with an empty
    /// body. An `auctionEnd` event flushes the buffer immediately.
    pub fn track<T: Serialize + ?Sized>(&self, event_type: &str, args: &T) {
        let Some(kind) = EventKind::from_event_type(event_type) else {
            debug!(event_type = %event_type, "Ignoring unrecognized event type");
            return;
        };

        let raw = copy_event(args);
        let event = normalize::normalize(kind, &raw, Utc::now().timestamp_millis());
        self.inner.buffer.append(event);

        debug!(
            event_type = %kind,
            buffered = self.inner.buffer.len(),
            "Buffered analytics event"
        );

        if kind.is_terminal() {
            self.flush_now();
        }
    }

    /// Flush the buffer now.
    ///
    /// Returns the number of events handed to the transport; zero when the
    /// buffer was empty or no session is active. Without a session, buffered
    /// events are kept for the next one.
    pub fn flush_now(&self) -> usize {
        self.inner.flush_now()
    }

    /// Options of the active session.
    pub fn options(&self) -> Option<AnalyticsOptions> {
        self.inner
            .session
            .lock()
            .as_ref()
            .map(|s| s.options().clone())
    }

    /// Id of the active session.
    pub fn session_id(&self) -> Option<String> {
        self.inner
            .session
            .lock()
            .as_ref()
            .map(|s| s.pw_id().to_string())
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.session.lock().is_some()
    }

    /// Number of events waiting for the next flush.
    pub fn buffered(&self) -> usize {
        self.inner.buffer.len()
    }

    /// Wait until every send dispatched so far has finished.
    ///
    /// The adapter itself never calls this; it exists for host shutdown
    /// sequences that want deliveries to complete before exiting.
    pub async fn settle(&self) {
        let pending = std::mem::take(&mut *self.inner.in_flight.lock());
        for send in pending {
            if let Err(e) = send.await {
                debug!(error = %e, "Analytics send task did not complete");
            }
        }
    }
}

/// A drained batch waiting to be handed to the transport.
struct PendingBatch {
    payload: Payload,
    url: String,
    runtime: Handle,
}

impl Inner {
    fn flush_now(&self) -> usize {
        let batch = {
            let session = self.session.lock();
            match session.as_ref() {
                Some(session) => self.take_batch(session),
                None => {
                    if !self.buffer.is_empty() {
                        debug!(
                            buffered = self.buffer.len(),
                            "Flush requested without an active session, keeping events"
                        );
                    }
                    None
                }
            }
        };

        batch.map_or(0, |batch| self.send_batch(batch))
    }

    /// Timer entry point. Returns false once the session it was started for
    /// is gone, which ends the timer loop.
    fn flush_if_current(&self, pw_id: &str) -> bool {
        let batch = {
            let session = self.session.lock();
            match session.as_ref() {
                Some(session) if session.pw_id() == pw_id => self.take_batch(session),
                _ => return false,
            }
        };

        if let Some(batch) = batch {
            self.send_batch(batch);
        }
        true
    }

    /// Drain the buffer into a batch for `session`.
    ///
    /// Events stay buffered when the session has no runtime to send on.
    /// Nothing here calls out of the adapter, so it is safe under the
    /// session lock.
    fn take_batch(&self, session: &Session) -> Option<PendingBatch> {
        let Some(runtime) = session.runtime() else {
            if !self.buffer.is_empty() {
                debug!(
                    buffered = self.buffer.len(),
                    "No async runtime for this session, keeping events"
                );
            }
            return None;
        };

        let events = self.buffer.drain();
        if events.is_empty() {
            return None;
        }

        Some(PendingBatch {
            payload: session.payload(events, None),
            url: session.options().endpoint_url().to_string(),
            runtime: runtime.clone(),
        })
    }

    /// Resolve the page URL, serialize and spawn the send. Must be called
    /// without the session lock held.
    fn send_batch(&self, batch: PendingBatch) -> usize {
        let PendingBatch {
            mut payload,
            url,
            runtime,
        } = batch;

        let count = payload.events.len();
        payload.page_url = self.page.page_url();

        let body = match serde_json::to_string(&payload) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, events = count, "Failed to serialize analytics batch, dropping it");
                return 0;
            }
        };

        let transport = Arc::clone(&self.transport);
        let send = runtime.spawn(async move {
            match transport.send(&url, body).await {
                Ok(()) => {
                    info!(
                        url = %url,
                        transport = %transport.name(),
                        events = count,
                        "AdvRed analytics sent {} events",
                        count
                    );
                }
                Err(e) => {
                    debug!(
                        url = %url,
                        transport = %transport.name(),
                        events = count,
                        error = %e,
                        "AdvRed analytics batch not delivered"
                    );
                }
            }
        });

        let mut in_flight = self.in_flight.lock();
        in_flight.retain(|send| !send.is_finished());
        in_flight.push(send);

        count
    }
}

/// Periodic flush loop for one session.
async fn run_flush_timer(inner: Weak<Inner>, pw_id: String, period: Duration) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(inner) = inner.upgrade() else {
            break;
        };
        if !inner.flush_if_current(&pw_id) {
            break;
        }
    }

    debug!(pw_id = %pw_id, "Flush timer stopped");
}

/// Structural copy of a host payload. Falsy payloads and payloads that fail
/// to serialize both become an empty object.
fn copy_event<T: Serialize + ?Sized>(args: &T) -> Value {
    match serde_json::to_value(args) {
        Ok(value) if is_truthy(&value) => value,
        Ok(_) => Value::Object(Map::new()),
        Err(e) => {
            debug!(error = %e, "Event payload could not be copied, using empty body");
            Value::Object(Map::new())
        }
    }
}
