use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{Dispatcher, EnvelopeFactory, HttpTransport, Scope, Transport};
use crate::core::types::{
    ApiResponse, ExecutionType, Fix, FixList, MarketStatus, Position, PositionList, Rate, Side,
    StatusData,
};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Typed client for the exchange's REST API.
///
/// Every operation builds a signed envelope, submits it through the paced
/// [`Dispatcher`], and decodes the response envelope. A successful ticker
/// fetch replaces the cached rate table, which in turn supplies default
/// limit prices for orders placed without an explicit one.
pub struct GmoCoin {
    factory: EnvelopeFactory,
    dispatcher: Dispatcher,
    rates: Mutex<HashMap<String, Rate>>,
    submit_deadline: Duration,
    cancel: CancellationToken,
}

impl GmoCoin {
    /// Connect with the production HTTP transport.
    ///
    /// Fails with [`ExchangeError::MarketClosed`] if the exchange reports any
    /// status other than `OPEN`, so a client is never handed out against a
    /// closed market.
    pub async fn connect(config: ExchangeConfig) -> Result<Self, ExchangeError> {
        let transport = Arc::new(HttpTransport::new(config.transport_timeout)?);
        Self::connect_with_transport(config, transport).await
    }

    /// Connect over a caller-supplied transport. Used by tests to run the
    /// full client against an in-process fake.
    pub async fn connect_with_transport(
        config: ExchangeConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ExchangeError> {
        let cancel = CancellationToken::new();
        let dispatcher = Dispatcher::start(transport, config.pacing_interval, cancel.clone());
        let client = Self {
            factory: EnvelopeFactory::new(&config),
            dispatcher,
            rates: Mutex::new(HashMap::new()),
            submit_deadline: config.submit_deadline,
            cancel,
        };

        let status = client.market_status().await?;
        if status != MarketStatus::Open {
            client.close();
            return Err(ExchangeError::MarketClosed(status));
        }
        debug!("exchange status verified, client ready");
        Ok(client)
    }

    /// Stop the dispatcher. Idempotent; subsequent operations fail with
    /// [`ExchangeError::PoolClosed`].
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Build, submit, and decode one request. The envelope status is checked
    /// before the payload is decoded, so a rejection with a junk `data`
    /// field still surfaces as [`ExchangeError::Rejected`].
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        scope: Scope,
        path: &str,
        query: &[(&str, &str)],
        body: &[u8],
    ) -> Result<Option<T>, ExchangeError> {
        let envelope = self.factory.build(method, scope, path, query, body)?;
        let bytes = self.dispatcher.submit(envelope, self.submit_deadline).await?;
        let response: ApiResponse<serde_json::Value> = serde_json::from_slice(&bytes)?;
        match response.into_data()? {
            None => Ok(None),
            Some(value) if value.is_null() => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    /// `GET /public/v1/status`
    pub async fn market_status(&self) -> Result<MarketStatus, ExchangeError> {
        let data: StatusData = self
            .request(Method::GET, Scope::Public, "/v1/status", &[], &[])
            .await?
            .ok_or_else(|| ExchangeError::Other("status response carried no data".to_string()))?;
        Ok(data.status)
    }

    /// `GET /public/v1/ticker` - fetch rates for all symbols and replace the
    /// cached rate table wholesale.
    #[instrument(skip(self))]
    pub async fn update_rates(&self) -> Result<HashMap<String, Rate>, ExchangeError> {
        let list: Vec<Rate> = self
            .request(Method::GET, Scope::Public, "/v1/ticker", &[], &[])
            .await?
            .unwrap_or_default();

        let table: HashMap<String, Rate> = list
            .into_iter()
            .map(|rate| (rate.symbol.clone(), rate))
            .collect();

        *self.rates.lock().await = table.clone();
        debug!(symbols = table.len(), "rate table refreshed");
        Ok(table)
    }

    /// `POST /private/v1/order` - place a limit order.
    ///
    /// With `price: None` the last-seen rate table supplies the price: ask
    /// for a buy, bid for a sell. A symbol never seen by [`update_rates`]
    /// fails with [`ExchangeError::UnknownSymbol`] without touching the
    /// network.
    ///
    /// [`update_rates`]: Self::update_rates
    #[instrument(skip(self), fields(%symbol, %side))]
    pub async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        size: Decimal,
        price: Option<Decimal>,
    ) -> Result<String, ExchangeError> {
        let price = self.resolve_price(symbol, side, price).await?;
        let body = json!({
            "symbol": symbol,
            "side": side.as_str(),
            "executionType": ExecutionType::Limit.as_str(),
            "price": price,
            "size": format_size(size)?,
        });

        self.request(
            Method::POST,
            Scope::Private,
            "/v1/order",
            &[],
            &serde_json::to_vec(&body)?,
        )
        .await?
        .ok_or_else(|| ExchangeError::Other("order response carried no order id".to_string()))
    }

    /// `POST /private/v1/closeOrder` - close (part of) an open position with
    /// a limit order. Price defaults from the rate cache exactly like
    /// [`place_order`](Self::place_order).
    #[instrument(skip(self), fields(%symbol, %side, position_id))]
    pub async fn close_order(
        &self,
        symbol: &str,
        side: Side,
        position_id: u64,
        size: Decimal,
        price: Option<Decimal>,
    ) -> Result<String, ExchangeError> {
        let price = self.resolve_price(symbol, side, price).await?;
        let body = json!({
            "symbol": symbol,
            "side": side.as_str(),
            "executionType": ExecutionType::Limit.as_str(),
            "price": price,
            "settlePosition": [{
                "positionId": position_id,
                "size": format_size(size)?,
            }],
        });

        self.request(
            Method::POST,
            Scope::Private,
            "/v1/closeOrder",
            &[],
            &serde_json::to_vec(&body)?,
        )
        .await?
        .ok_or_else(|| ExchangeError::Other("close response carried no order id".to_string()))
    }

    /// `GET /private/v1/openPositions?symbol=`
    #[instrument(skip(self), fields(%symbol))]
    pub async fn open_positions(&self, symbol: &str) -> Result<Vec<Position>, ExchangeError> {
        let positions: Option<PositionList> = self
            .request(
                Method::GET,
                Scope::Private,
                "/v1/openPositions",
                &[("symbol", symbol)],
                &[],
            )
            .await?;
        Ok(positions.map(|positions| positions.list).unwrap_or_default())
    }

    /// `GET /private/v1/latestExecutions?symbol=&page=&count=`
    #[instrument(skip(self), fields(%symbol, page, count))]
    pub async fn latest_executions(
        &self,
        symbol: &str,
        page: u32,
        count: u32,
    ) -> Result<Vec<Fix>, ExchangeError> {
        let page = page.to_string();
        let count = count.to_string();
        let fixes: Option<FixList> = self
            .request(
                Method::GET,
                Scope::Private,
                "/v1/latestExecutions",
                &[("symbol", symbol), ("page", &page), ("count", &count)],
                &[],
            )
            .await?;
        Ok(fixes.map(|fixes| fixes.list).unwrap_or_default())
    }

    /// Pick an explicit price, or fall back to the cached rate table.
    async fn resolve_price(
        &self,
        symbol: &str,
        side: Side,
        price: Option<Decimal>,
    ) -> Result<String, ExchangeError> {
        if let Some(price) = price {
            return Ok(price.to_string());
        }

        let rates = self.rates.lock().await;
        let rate = rates
            .get(symbol)
            .ok_or_else(|| ExchangeError::UnknownSymbol(symbol.to_string()))?;
        Ok(match side {
            Side::Buy => rate.ask.clone(),
            Side::Sell => rate.bid.clone(),
        })
    }
}

impl Drop for GmoCoin {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The exchange accepts at most four decimal places on order sizes.
fn format_size(size: Decimal) -> Result<String, ExchangeError> {
    if size <= Decimal::ZERO {
        return Err(ExchangeError::InvalidParameters(format!(
            "order size must be positive, got {size}"
        )));
    }
    Ok(format!("{:.4}", size.round_dp(4)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sizes_are_fixed_to_four_decimals() {
        assert_eq!(format_size(dec!(0.5)).unwrap(), "0.5000");
        assert_eq!(format_size(dec!(1)).unwrap(), "1.0000");
    }

    #[test]
    fn sizes_round_rather_than_truncate() {
        assert_eq!(format_size(dec!(1.23456)).unwrap(), "1.2346");
        assert_eq!(format_size(dec!(1.23454)).unwrap(), "1.2345");
        assert_eq!(format_size(dec!(0.00009)).unwrap(), "0.0001");
    }

    #[test]
    fn non_positive_sizes_are_rejected() {
        assert!(matches!(
            format_size(dec!(0)),
            Err(ExchangeError::InvalidParameters(_))
        ));
        assert!(matches!(
            format_size(dec!(-1)),
            Err(ExchangeError::InvalidParameters(_))
        ));
    }
}
