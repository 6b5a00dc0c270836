//! # AdvRed Analytics
//!
//! A batching analytics adapter for header-bidding auctions.
//!
//! ## Architecture
//!
//! ```text
//! Host -> AdapterRegistry -> AdvRedAnalytics::track -> normalize -> BatchBuffer
//!                                                                      │
//!                              timer tick / auctionEnd -> flush_now ───┘
//!                                                           │
//!                                                           ▼
//!                                              Transport (HTTP POST, JSON)
//! ```
//!
//! ## Modules
//!
//! - [`event`]: Event kinds, host envelopes and the normalized event shape
//! - [`normalize`]: Per-kind allow-list projections
//! - [`buffer`]: The batch buffer drained on flush
//! - [`adapter`]: Dispatcher, flush controller and session lifecycle
//! - [`transport`]: Transport trait and built-in transports
//! - [`registry`]: Host-side adapter registry
//! - [`config`]: Activation options and file configuration

pub mod adapter;
pub mod buffer;
pub mod config;
pub mod event;
pub mod normalize;
pub mod page;
pub mod registry;
pub mod session;
pub mod shutdown;
pub mod transport;

use std::time::Duration;

// Re-export commonly used types at crate root
pub use adapter::AdvRedAnalytics;
pub use config::{AdapterConfig, AnalyticsOptions};
pub use event::{EventKind, NormalizedEvent, TrackedEvent};
pub use registry::{AdapterRegistry, AnalyticsAdapter};
pub use transport::{Transport, TransportError};

/// Collector endpoint used when no `url` option is given
pub const DEFAULT_EVENT_URL: &str = "https://analytics-api.advred.com/endpoint";

/// Code the adapter registers under
pub const ADAPTER_CODE: &str = "advRed";

/// Default period of the flush timer
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Default client-side timeout for one send
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);
