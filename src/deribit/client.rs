use super::types::{BookSummary, RpcResponse};
use crate::chain::InstrumentChain;
use crate::errors::{EngineError, EngineResult};
use crate::http::PublicApi;

/// Deribit public REST client.
#[derive(Clone)]
pub struct DeribitClient {
    api: PublicApi,
}

impl DeribitClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            api: PublicApi::new("deribit", base_url, timeout_secs),
        }
    }

    /// Unwraps the JSON-RPC envelope; an `error` member becomes `Api`.
    async fn rpc_get<T: serde::de::DeserializeOwned>(&self, path: &str) -> EngineResult<T> {
        let envelope: RpcResponse<T> = self.api.get(path).await?;
        unwrap_envelope(self.api.service(), path, envelope)
    }

    pub async fn get_book_summaries(&self, currency: &str) -> EngineResult<Vec<BookSummary>> {
        self.rpc_get(&format!(
            "/public/get_book_summary_by_currency?currency={currency}&kind=option"
        ))
        .await
    }

    /// Full option chain for `currency`, fetched fresh.
    pub async fn get_option_chain(&self, currency: &str) -> EngineResult<InstrumentChain> {
        let summaries = self.get_book_summaries(currency).await?;
        let chain = chain_from_summaries(currency, &summaries);
        if chain.is_empty() {
            tracing::warn!(currency, instruments = summaries.len(), "option chain is empty");
        } else {
            tracing::info!(
                currency,
                instruments = summaries.len(),
                quotes = chain.len(),
                expiries = chain.expiries().len(),
                "option chain loaded"
            );
        }
        Ok(chain)
    }
}

fn unwrap_envelope<T>(service: &'static str, path: &str, envelope: RpcResponse<T>) -> EngineResult<T> {
    match (envelope.result, envelope.error) {
        (Some(result), _) => Ok(result),
        (None, Some(err)) => Err(EngineError::Api {
            service,
            status: 200,
            body: format!("{} {}", err.code, err.message),
        }),
        (None, None) => Err(EngineError::Parse(format!("GET {path}: empty result"))),
    }
}

pub fn chain_from_summaries(currency: &str, summaries: &[BookSummary]) -> InstrumentChain {
    let quotes = summaries
        .iter()
        .filter_map(|s| {
            let q = s.to_quote();
            if q.is_none() {
                tracing::debug!(instrument = %s.instrument_name, "unparseable instrument dropped");
            }
            q
        })
        .collect();
    InstrumentChain::new(currency, quotes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::OptionKind;

    #[test]
    fn test_chain_from_summaries_orders_and_drops() {
        let json = r#"[
            {"instrument_name": "BTC-27MAR26-110000-C", "bid_price": 0.004, "ask_price": 0.006, "mark_iv": 55.0, "underlying_price": 100000.0},
            {"instrument_name": "BTC-27FEB26-100000-P", "bid_price": 0.03, "ask_price": 0.031},
            {"instrument_name": "BTC-27FEB26-100000-C", "bid_price": 0.02, "ask_price": 0.025},
            {"instrument_name": "BTC-27FEB26-100000-C", "bid_price": 0.99, "ask_price": 0.99},
            {"instrument_name": "BTC-PERPETUAL"}
        ]"#;
        let summaries: Vec<BookSummary> = serde_json::from_str(json).unwrap();
        let chain = chain_from_summaries("BTC", &summaries);
        assert_eq!(chain.underlying(), "BTC");
        assert_eq!(chain.len(), 3);
        assert!(!chain.is_empty());
        let q = chain.quotes();
        assert_eq!((q[0].strike, q[0].kind), (100_000.0, OptionKind::Call));
        assert_eq!(q[0].bid, Some(0.02));
        assert_eq!(q[1].kind, OptionKind::Put);
        assert_eq!(q[2].strike, 110_000.0);

        assert!(chain_from_summaries("BTC", &[]).is_empty());
    }

    #[test]
    fn test_envelope_error_is_api_error() {
        let env: RpcResponse<Vec<BookSummary>> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","error":{"code":10020,"message":"invalid_currency"}}"#,
        )
        .unwrap();
        match unwrap_envelope("deribit", "/public/x", env) {
            Err(EngineError::Api { service, body, .. }) => {
                assert_eq!(service, "deribit");
                assert!(body.contains("invalid_currency"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let empty: RpcResponse<Vec<BookSummary>> = serde_json::from_str(r#"{"jsonrpc":"2.0"}"#).unwrap();
        assert!(matches!(unwrap_envelope("deribit", "/p", empty), Err(EngineError::Parse(_))));
    }
}
