//! Per-kind projections from raw host events onto the compact wire shape.
//!
//! Each [`EventKind`] has a fixed allow-list. Projection only selects fields;
//! values are copied verbatim and fields missing on the input stay missing on
//! the output. List-valued fields (bids, ad units, bidder requests) are
//! projected element by element through a nested allow-list.
//!
//! ```text
//! bidRequested ──► auctionId, bidderCode, ..., bids[ bid summary ]
//!                                               │
//!                                               ▼
//!                    auctionId, bidder, bidId, cpm, currency, sizes, ...
//! ```

use crate::event::{is_truthy, EventKind, NormalizedEvent};
use serde_json::{Map, Value};

/// One entry of a projection table.
#[derive(Debug, Clone, Copy)]
enum Field {
    /// Copy the value as-is
    Scalar(&'static str),
    /// Project every element of a list through a nested table
    List(&'static str, &'static [Field]),
}

impl Field {
    fn name(&self) -> &'static str {
        match self {
            Field::Scalar(name) | Field::List(name, _) => *name,
        }
    }
}

use Field::{List, Scalar};

const BID_SUMMARY: &[Field] = &[
    Scalar("auctionId"),
    Scalar("bidder"),
    Scalar("bidderRequestId"),
    Scalar("bidId"),
    Scalar("crumbs"),
    Scalar("cpm"),
    Scalar("currency"),
    Scalar("mediaTypes"),
    Scalar("sizes"),
    Scalar("transactionId"),
    Scalar("adUnitCode"),
    Scalar("bidRequestsCount"),
    Scalar("serverResponseTimeMs"),
];

const AD_UNIT_SUMMARY: &[Field] = &[Scalar("code"), Scalar("sizes")];

const BIDDER_REQUEST_SUMMARY: &[Field] = &[
    Scalar("auctionId"),
    Scalar("auctionStart"),
    Scalar("bidderRequestId"),
    Scalar("bidderCode"),
    List("bids", BID_SUMMARY),
];

const AUCTION_INIT: &[Field] = &[
    Scalar("auctionId"),
    Scalar("timeout"),
    List("adUnits", AD_UNIT_SUMMARY),
    List("bidderRequests", BIDDER_REQUEST_SUMMARY),
];

const AUCTION_END: &[Field] = &[
    Scalar("auctionId"),
    Scalar("end"),
    Scalar("start"),
    Scalar("adUnitCodes"),
    List("bidsReceived", BID_SUMMARY),
];

const BID_REQUESTED: &[Field] = &[
    Scalar("auctionId"),
    Scalar("bidderCode"),
    Scalar("doneCbCallCount"),
    Scalar("start"),
    Scalar("bidderRequestId"),
    List("bids", BID_SUMMARY),
    Scalar("auctionStart"),
    Scalar("timeout"),
];

const BID_RESPONSE: &[Field] = &[
    Scalar("bidderCode"),
    Scalar("width"),
    Scalar("height"),
    Scalar("adId"),
    Scalar("mediaType"),
    Scalar("cpm"),
    Scalar("currency"),
    Scalar("requestId"),
    Scalar("timeToRespond"),
    Scalar("requestTimestamp"),
    Scalar("responseTimestamp"),
    Scalar("netRevenue"),
    Scalar("size"),
];

const BID_WON: &[Field] = &[
    Scalar("adId"),
    Scalar("adUnitCode"),
    Scalar("bidderCode"),
    Scalar("height"),
    Scalar("mediaType"),
    Scalar("netRevenue"),
    Scalar("cpm"),
    Scalar("requestTimestamp"),
    Scalar("responseTimestamp"),
    Scalar("size"),
    Scalar("width"),
    Scalar("currency"),
    Scalar("bidder"),
];

const BIDDER_DONE: &[Field] = &[
    Scalar("auctionStart"),
    Scalar("bidderCode"),
    Scalar("bidderRequestId"),
    List("bids", BID_SUMMARY),
    Scalar("doneCbCallCount"),
    Scalar("start"),
    Scalar("timeout"),
    Scalar("tid"),
    Scalar("src"),
];

/// Name of the single field a `bidTimeout` event projects to.
const TIMEOUT_BIDDERS: &str = "bidders";

/// Top-level fields a projection of `kind` may produce (stamps excluded).
pub fn allowed_fields(kind: EventKind) -> Vec<&'static str> {
    match table_for(kind) {
        Some(table) => table.iter().map(Field::name).collect(),
        None => vec![TIMEOUT_BIDDERS],
    }
}

/// Field names of the reusable bid summary.
pub fn bid_summary_fields() -> Vec<&'static str> {
    BID_SUMMARY.iter().map(Field::name).collect()
}

fn table_for(kind: EventKind) -> Option<&'static [Field]> {
    match kind {
        EventKind::AuctionInit => Some(AUCTION_INIT),
        EventKind::AuctionEnd => Some(AUCTION_END),
        EventKind::BidRequested => Some(BID_REQUESTED),
        EventKind::BidResponse => Some(BID_RESPONSE),
        EventKind::BidWon => Some(BID_WON),
        EventKind::BidderDone => Some(BIDDER_DONE),
        EventKind::BidTimeout => None,
    }
}

/// Project a raw event onto the allow-list for `kind`.
///
/// The result is not yet stamped; see [`NormalizedEvent::stamp`].
pub fn project(kind: EventKind, raw: &Value) -> NormalizedEvent {
    let fields = match table_for(kind) {
        Some(table) => project_object(raw, table),
        None => project_timeout(raw),
    };
    NormalizedEvent::from_fields(fields)
}

/// Project and stamp in one step.
pub fn normalize(kind: EventKind, raw: &Value, now_ms: i64) -> NormalizedEvent {
    let mut event = project(kind, raw);
    event.stamp(kind, raw, now_ms);
    event
}

/// A timeout payload is normally a bare list of timed-out bids, but an
/// object is accepted as well and reduced through the bid summary.
fn project_timeout(raw: &Value) -> Map<String, Value> {
    let bidders = match raw {
        Value::Array(bids) => Value::Array(bids.iter().map(|b| project_item(b, BID_SUMMARY)).collect()),
        other => project_item(other, BID_SUMMARY),
    };

    let mut fields = Map::new();
    fields.insert(TIMEOUT_BIDDERS.to_string(), bidders);
    fields
}

fn project_object(raw: &Value, table: &[Field]) -> Map<String, Value> {
    let mut fields = Map::new();

    for field in table {
        let Some(value) = raw.get(field.name()) else {
            continue;
        };

        match field {
            Scalar(name) => {
                fields.insert(name.to_string(), value.clone());
            }
            List(name, nested) => {
                if let Some(projected) = project_list(value, nested) {
                    fields.insert(name.to_string(), projected);
                }
            }
        }
    }

    fields
}

/// Lists are projected per element. Falsy placeholders (`null`, `0`, `""`)
/// pass through untouched; any other non-list value is dropped.
fn project_list(value: &Value, table: &[Field]) -> Option<Value> {
    match value {
        Value::Array(items) => Some(Value::Array(
            items.iter().map(|item| project_item(item, table)).collect(),
        )),
        v if !is_truthy(v) => Some(v.clone()),
        _ => None,
    }
}

fn project_item(item: &Value, table: &[Field]) -> Value {
    match item {
        Value::Object(_) => Value::Object(project_object(item, table)),
        v if !is_truthy(v) => v.clone(),
        _ => Value::Object(Map::new()),
    }
}
