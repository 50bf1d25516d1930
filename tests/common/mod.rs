//! Scripted fake capabilities shared by the integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use tradeflow::{CloseRequest, MarketData, OrderGateway, OrderRequest, ServiceReply};

/// Market terminal answering every quote with the current scripted bid.
pub struct ScriptedMarket {
    pub bid: Mutex<f64>,
}

impl ScriptedMarket {
    pub fn new(bid: f64) -> Self {
        ScriptedMarket {
            bid: Mutex::new(bid),
        }
    }

    pub fn set_bid(&self, bid: f64) {
        *self.bid.lock() = bid;
    }
}

#[async_trait]
impl MarketData for ScriptedMarket {
    async fn quote(&self, symbol: &str) -> ServiceReply {
        let bid = *self.bid.lock();
        ServiceReply::ok(json!({"symbol": symbol, "bid": bid, "ask": bid + 0.0002}))
    }

    async fn symbols(&self, _filter: Option<&str>) -> ServiceReply {
        ServiceReply::ok(json!(["EURUSD", "GBPUSD"]))
    }
}

/// Gateway that accepts every order and remembers it.
#[derive(Default)]
pub struct RecordingGateway {
    pub placed: Mutex<Vec<OrderRequest>>,
}

#[async_trait]
impl OrderGateway for RecordingGateway {
    async fn place(&self, order: &OrderRequest) -> ServiceReply {
        self.placed.lock().push(order.clone());
        ServiceReply::ok(json!({"ticket": self.placed.lock().len()}))
    }

    async fn close(&self, _request: &CloseRequest) -> ServiceReply {
        ServiceReply::ok_empty()
    }
}
