//! Core event types for the AdvRed adapter.
//!
//! The host pushes [`TrackedEvent`] envelopes (`eventType` + `args`). Only the
//! kinds listed in [`EventKind`] are recognized; everything the adapter keeps
//! is reduced to a [`NormalizedEvent`] before it is buffered.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Lifecycle event kinds the adapter collects.
///
/// The serialized names match the host's event constants
/// (e.g. `"auctionInit"`, `"bidResponse"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    AuctionInit,
    AuctionEnd,
    BidTimeout,
    BidRequested,
    BidResponse,
    BidWon,
    BidderDone,
}

impl EventKind {
    /// Every recognized kind, in host declaration order.
    pub const ALL: [EventKind; 7] = [
        EventKind::AuctionInit,
        EventKind::AuctionEnd,
        EventKind::BidTimeout,
        EventKind::BidRequested,
        EventKind::BidResponse,
        EventKind::BidWon,
        EventKind::BidderDone,
    ];

    /// Host wire name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AuctionInit => "auctionInit",
            EventKind::AuctionEnd => "auctionEnd",
            EventKind::BidTimeout => "bidTimeout",
            EventKind::BidRequested => "bidRequested",
            EventKind::BidResponse => "bidResponse",
            EventKind::BidWon => "bidWon",
            EventKind::BidderDone => "bidderDone",
        }
    }

    /// Look up a kind by its host wire name.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == event_type)
    }

    /// Whether appending this kind forces an immediate flush.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::AuctionEnd)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized event type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized event type: {0}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_event_type(s).ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

/// An event as delivered by the host.
///
/// # Example
///
/// ```json
/// {
///   "eventType": "bidResponse",
///   "args": {
///     "bidderCode": "appnexus",
///     "cpm": 1.5,
///     "currency": "USD"
///   }
/// }
/// ```
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TrackedEvent {
    /// Host event name; may be one the adapter does not recognize
    #[serde(rename = "eventType")]
    pub event_type: String,

    /// Event arguments, shape depends on `event_type`
    #[serde(default)]
    pub args: Value,
}

impl TrackedEvent {
    pub fn new(event_type: impl Into<String>, args: Value) -> Self {
        Self {
            event_type: event_type.into(),
            args,
        }
    }

    /// The recognized kind, if any.
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_event_type(&self.event_type)
    }
}

/// Canonical, reduced form of a host event.
///
/// A flat JSON object. After stamping it always carries `eventType` and
/// `timestamp`; `auctionId` and `adUnitCode` are present whenever the raw
/// event had them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedEvent(Map<String, Value>);

impl NormalizedEvent {
    pub const EVENT_TYPE: &'static str = "eventType";
    pub const AUCTION_ID: &'static str = "auctionId";
    pub const AD_UNIT_CODE: &'static str = "adUnitCode";
    pub const TIMESTAMP: &'static str = "timestamp";

    /// The four fields stamped onto every event regardless of kind.
    pub const STAMP_FIELDS: [&'static str; 4] = [
        Self::EVENT_TYPE,
        Self::AUCTION_ID,
        Self::AD_UNIT_CODE,
        Self::TIMESTAMP,
    ];

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Stamp the universal fields using values read from the raw event.
    ///
    /// `auctionId` and `adUnitCode` mirror the raw event exactly: copied when
    /// present (including an explicit `null`), removed when absent. The raw
    /// `timestamp` is kept only when truthy; otherwise `now_ms` is used.
    pub fn stamp(&mut self, kind: EventKind, raw: &Value, now_ms: i64) {
        self.0
            .insert(Self::EVENT_TYPE.to_string(), Value::from(kind.as_str()));

        for field in [Self::AUCTION_ID, Self::AD_UNIT_CODE] {
            match raw.get(field) {
                Some(value) => {
                    self.0.insert(field.to_string(), value.clone());
                }
                None => {
                    self.0.remove(field);
                }
            }
        }

        let timestamp = raw
            .get(Self::TIMESTAMP)
            .filter(|v| is_truthy(v))
            .cloned()
            .unwrap_or_else(|| Value::from(now_ms));
        self.0.insert(Self::TIMESTAMP.to_string(), timestamp);
    }

    pub fn event_type(&self) -> Option<&str> {
        self.0.get(Self::EVENT_TYPE).and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

/// JavaScript-style truthiness, as the host applies it to optional fields.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
