// KuCoin Futures REST client

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ExchangeConfig;
use crate::core::types::{Candle, OrderSide};
use crate::error::{TradingError, TradingResult};
use crate::gateway::{ExecutionGateway, MarketDataSource, OrderState};

type HmacSha256 = Hmac<Sha256>;

const SUCCESS_CODE: &str = "200000";

#[derive(Debug, Clone)]
pub struct KucoinFuturesGateway {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    api_passphrase: String,
    tick_size: f64,
}

/// Round `price` to the nearest multiple of `tick_size`
pub fn normalize_price(price: f64, tick_size: f64) -> f64 {
    (price / tick_size).round() * tick_size
}

/// Decimal string for a price already on the tick grid
fn format_price(price: f64, tick_size: f64) -> String {
    let decimals = (-tick_size.log10() - 1e-9).ceil().max(0.0) as usize;
    format!("{:.*}", decimals, normalize_price(price, tick_size))
}

impl KucoinFuturesGateway {
    pub fn new(config: &ExchangeConfig) -> TradingResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            base_url: config.rest_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            api_passphrase: config.api_passphrase.clone(),
            tick_size: config.tick_size,
        })
    }

    fn sign(&self, payload: &str) -> TradingResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| TradingError::ApiAuthentication(format!("invalid API secret: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Send a request and return the `data` field of a successful envelope
    async fn request(&self, method: Method, endpoint: &str, body: Option<Value>, signed: bool) -> TradingResult<Value> {
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        let url = format!("{}{}", self.base_url, endpoint);
        let mut builder = self.client.request(method.clone(), &url);

        if signed {
            if self.api_key.is_empty() || self.api_secret.is_empty() || self.api_passphrase.is_empty() {
                return Err(TradingError::ApiAuthentication("API credentials are not configured".to_string()));
            }
            let timestamp = Utc::now().timestamp_millis().to_string();
            let signature = self.sign(&format!("{}{}{}{}", timestamp, method.as_str(), endpoint, body))?;
            let passphrase = self.sign(&self.api_passphrase)?;
            builder = builder
                .header("KC-API-KEY", &self.api_key)
                .header("KC-API-SIGN", signature)
                .header("KC-API-TIMESTAMP", timestamp)
                .header("KC-API-PASSPHRASE", passphrase)
                .header("KC-API-KEY-VERSION", "2");
        }
        if !body.is_empty() {
            builder = builder.header("Content-Type", "application/json").body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!("KuCoin {} {} -> {}", method, endpoint, status);

        match status {
            StatusCode::UNAUTHORIZED => return Err(TradingError::ApiAuthentication(text)),
            StatusCode::TOO_MANY_REQUESTS => return Err(TradingError::ApiRateLimit(text)),
            s if !s.is_success() => return Err(TradingError::ApiResponse(format!("HTTP {}: {}", s.as_u16(), text))),
            _ => {}
        }

        let mut envelope: Value = serde_json::from_str(&text)
            .map_err(|e| TradingError::ApiResponse(format!("malformed response: {}", e)))?;
        let code = envelope["code"].as_str().unwrap_or_default();
        if code != SUCCESS_CODE {
            return Err(TradingError::ApiResponse(format!(
                "code {}: {}",
                code,
                envelope["msg"].as_str().unwrap_or("unknown error")
            )));
        }

        Ok(envelope.get_mut("data").map(Value::take).unwrap_or(Value::Null))
    }
}

/// KuCoin sends numbers both as JSON numbers and as strings
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_candle(row: &Value) -> TradingResult<Candle> {
    let field = |i: usize| {
        number(&row[i]).ok_or_else(|| TradingError::ApiResponse(format!("bad kline row: {}", row)))
    };
    Ok(Candle {
        timestamp: field(0)? as i64,
        open: field(1)?,
        high: field(2)?,
        low: field(3)?,
        close: field(4)?,
        volume: field(5)?,
    })
}

#[async_trait]
impl MarketDataSource for KucoinFuturesGateway {
    async fn current_price(&self, symbol: &str) -> TradingResult<f64> {
        let data = self
            .request(Method::GET, &format!("/api/v1/ticker?symbol={}", symbol), None, false)
            .await?;
        number(&data["price"]).ok_or_else(|| TradingError::ApiResponse(format!("ticker without price: {}", data)))
    }

    async fn candles(&self, symbol: &str, granularity_minutes: u32, limit: usize) -> TradingResult<Vec<Candle>> {
        let to = Utc::now().timestamp_millis();
        let from = to - granularity_minutes as i64 * 60_000 * limit as i64;
        let endpoint = format!(
            "/api/v1/kline/query?symbol={}&granularity={}&from={}&to={}",
            symbol, granularity_minutes, from, to
        );
        let data = self.request(Method::GET, &endpoint, None, false).await?;

        let rows = data
            .as_array()
            .ok_or_else(|| TradingError::ApiResponse("kline data is not an array".to_string()))?;
        let mut candles = rows.iter().map(parse_candle).collect::<TradingResult<Vec<_>>>()?;
        candles.sort_by_key(|c| c.timestamp);
        if candles.len() > limit {
            candles.drain(..candles.len() - limit);
        }
        Ok(candles)
    }
}

#[async_trait]
impl ExecutionGateway for KucoinFuturesGateway {
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        price: f64,
        size: f64,
        leverage: u32,
    ) -> TradingResult<String> {
        let body = json!({
            "clientOid": uuid::Uuid::new_v4().to_string(),
            "side": side.as_str(),
            "symbol": symbol,
            "type": "limit",
            "leverage": leverage.to_string(),
            "price": format_price(price, self.tick_size),
            "size": size.to_string(),
        });
        let data = self
            .request(Method::POST, "/api/v1/orders", Some(body), true)
            .await
            .map_err(|e| match e {
                TradingError::ApiResponse(msg) => TradingError::OrderRejected(msg),
                other => other,
            })?;

        let order_id = data["orderId"]
            .as_str()
            .ok_or_else(|| TradingError::OrderFailed(format!("no orderId in response: {}", data)))?;
        info!("📝 Order placed: {} {} {} @ {}", order_id, side, size, price);
        Ok(order_id.to_string())
    }

    async fn cancel_order(&self, order_id: &str) -> TradingResult<()> {
        self.request(Method::DELETE, &format!("/api/v1/orders/{}", order_id), None, true)
            .await?;
        Ok(())
    }

    async fn order_status(&self, order_id: &str) -> TradingResult<OrderState> {
        let data = self
            .request(Method::GET, &format!("/api/v1/orders/{}", order_id), None, true)
            .await?;
        if data.is_null() {
            return Err(TradingError::OrderNotFound(order_id.to_string()));
        }

        let is_active = data["isActive"]
            .as_bool()
            .ok_or_else(|| TradingError::ApiResponse(format!("order {} has no isActive flag: {}", order_id, data)))?;
        let cancelled = data["cancelExist"].as_bool().unwrap_or(false);
        Ok(match (is_active, cancelled) {
            (true, _) => OrderState::Active,
            (false, true) => OrderState::Cancelled,
            (false, false) => OrderState::Filled,
        })
    }

    async fn account_balance(&self) -> TradingResult<Option<f64>> {
        let data = self
            .request(Method::GET, "/api/v1/account-overview?currency=USDT", None, true)
            .await?;
        Ok(number(&data["accountEquity"]).or_else(|| number(&data["availableBalance"])))
    }
}
