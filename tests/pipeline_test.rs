//! End-to-end tests: host registry -> adapter -> transport.

use std::sync::Arc;
use std::time::Duration;

use advred_analytics::page::StaticPageUrl;
use advred_analytics::session::Payload;
use advred_analytics::{
    AdapterConfig, AdapterRegistry, AdvRedAnalytics, AnalyticsOptions, TrackedEvent, Transport,
    TransportError,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

#[derive(Default)]
struct CapturingTransport {
    batches: Mutex<Vec<Payload>>,
}

#[async_trait]
impl Transport for CapturingTransport {
    fn name(&self) -> &str {
        "capture"
    }

    async fn send(&self, _url: &str, body: String) -> Result<(), TransportError> {
        self.batches.lock().push(serde_json::from_str(&body).unwrap());
        Ok(())
    }
}

fn host() -> (AdapterRegistry, AdvRedAnalytics, Arc<CapturingTransport>) {
    let transport = Arc::new(CapturingTransport::default());
    let adapter = AdvRedAnalytics::new(
        transport.clone(),
        Arc::new(StaticPageUrl::new("https://news.example/story")),
    );

    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(adapter.clone()));
    registry
        .enable(AdapterConfig::new(AnalyticsOptions::with_publisher_id("pub1")))
        .unwrap();

    (registry, adapter, transport)
}

fn emit(registry: &AdapterRegistry, event_type: &str, args: Value) {
    registry.emit(&TrackedEvent::new(event_type, args));
}

#[tokio::test]
async fn test_full_auction_is_sent_as_one_batch() {
    let (registry, adapter, transport) = host();

    emit(&registry, "auctionInit", json!({
        "auctionId": "auc-1",
        "timestamp": 100,
        "timeout": 1500,
        "adUnits": [{"code": "div-top", "sizes": [[728, 90]], "bids": [{"bidder": "x"}]}],
        "bidderRequests": [{"bidderCode": "x", "bids": [{"bidder": "x", "bidId": "b1", "params": {}}]}]
    }));
    emit(&registry, "bidRequested", json!({"auctionId": "auc-1", "bidderCode": "x", "start": 110}));
    emit(&registry, "bidResponse", json!({"auctionId": "auc-1", "adUnitCode": "div-top", "bidderCode": "x", "cpm": 0.8, "ad": "<html/>"}));
    emit(&registry, "noBid", json!({"auctionId": "auc-1"}));
    emit(&registry, "bidderDone", json!({"auctionId": "auc-1", "bidderCode": "x", "src": "client"}));
    emit(&registry, "auctionEnd", json!({"auctionId": "auc-1", "end": 400, "adUnitCodes": ["div-top"]}));

    adapter.settle().await;

    let batches = transport.batches.lock().clone();
    assert_eq!(batches.len(), 1);

    let batch = &batches[0];
    assert_eq!(batch.publisher_id.as_deref(), Some("pub1"));
    assert_eq!(batch.page_url.as_deref(), Some("https://news.example/story"));

    let kinds: Vec<_> = batch.events.iter().map(|e| e.event_type().unwrap()).collect();
    assert_eq!(kinds, vec!["auctionInit", "bidRequested", "bidResponse", "bidderDone", "auctionEnd"]);

    for event in &batch.events {
        assert_eq!(event.get("auctionId"), Some(&json!("auc-1")));
        assert!(event.contains("timestamp"));
    }

    assert_eq!(batch.events[0].get("timestamp"), Some(&json!(100)));
    assert_eq!(
        batch.events[0].get("adUnits"),
        Some(&json!([{"code": "div-top", "sizes": [[728, 90]]}]))
    );
    assert_eq!(batch.events[2].get("adUnitCode"), Some(&json!("div-top")));
    assert!(!batch.events[2].contains("ad"));
}

#[tokio::test]
async fn test_bare_list_timeout_event() {
    let (registry, adapter, transport) = host();

    emit(&registry, "bidTimeout", json!([{"bidder": "b1"}]));
    adapter.flush_now();
    adapter.settle().await;

    let batches = transport.batches.lock().clone();
    let event = &batches[0].events[0];
    assert_eq!(event.get("bidders"), Some(&json!([{"bidder": "b1"}])));
    assert_eq!(event.event_type(), Some("bidTimeout"));
}

#[tokio::test(start_paused = true)]
async fn test_host_teardown_flushes_remaining_events() {
    let (mut registry, adapter, transport) = host();

    emit(&registry, "bidWon", json!({"adId": "a1", "cpm": 2.0}));
    emit(&registry, "bidWon", json!({"adId": "a2", "cpm": 2.5}));

    registry.disable_all();
    adapter.settle().await;
    assert_eq!(transport.batches.lock().len(), 1);
    assert_eq!(transport.batches.lock()[0].events.len(), 2);

    // Adapter is no longer enabled in the host; nothing reaches it.
    emit(&registry, "bidWon", json!({"adId": "a3"}));
    tokio::time::sleep(Duration::from_secs(3)).await;
    adapter.settle().await;
    assert_eq!(transport.batches.lock().len(), 1);
    assert_eq!(adapter.buffered(), 0);
}
