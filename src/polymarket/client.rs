use super::types::GammaMarket;
use crate::errors::EngineResult;
use crate::http::{query_string, PublicApi};
use std::future::Future;

/// Polymarket Gamma REST client. Public endpoints only.
#[derive(Clone)]
pub struct GammaClient {
    api: PublicApi,
}

impl GammaClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            api: PublicApi::new("gamma", base_url, timeout_secs),
        }
    }

    /// One page of active, open markets ordered by 24h volume.
    pub async fn get_markets(&self, limit: u32, offset: usize) -> EngineResult<Vec<GammaMarket>> {
        let mut parts: smallvec::SmallVec<[String; 6]> = smallvec::SmallVec::new();
        parts.push("active=true".into());
        parts.push("closed=false".into());
        parts.push(format!("limit={limit}"));
        parts.push(format!("offset={offset}"));
        parts.push("order=volume24hr".into());
        parts.push("ascending=false".into());
        self.api.get(&format!("/markets{}", query_string(&parts))).await
    }

    /// Every active market, up to `max_markets`.
    pub async fn get_active_markets(&self, page_limit: u32, max_markets: usize) -> EngineResult<Vec<GammaMarket>> {
        let markets = collect_pages(page_limit, max_markets, |offset| {
            self.get_markets(page_limit, offset)
        })
        .await?;
        tracing::info!(markets = markets.len(), "gamma markets fetched");
        Ok(markets)
    }
}

/// Offset pagination.
///
/// Stops at an empty page, a short page (fewer than `page_limit` rows), or
/// once `max_markets` rows are held; the result is truncated to `max_markets`.
/// A failing first page is returned as the error. A failing later page ends
/// pagination with what was already fetched.
pub async fn collect_pages<T, F, Fut>(page_limit: u32, max_markets: usize, mut fetch: F) -> EngineResult<Vec<T>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = EngineResult<Vec<T>>>,
{
    let mut rows: Vec<T> = Vec::new();
    let mut offset = 0usize;

    loop {
        let page = match fetch(offset).await {
            Ok(p) => p,
            Err(e) if offset == 0 => return Err(e),
            Err(e) => {
                tracing::warn!(offset, error = %e, "page failed, stopping pagination");
                break;
            }
        };
        if page.is_empty() {
            break;
        }
        let n = page.len();
        rows.extend(page);
        offset += n;
        tracing::debug!(fetched = rows.len(), "page");

        if rows.len() >= max_markets || n < page_limit as usize {
            break;
        }
    }

    rows.truncate(max_markets);
    Ok(rows)
}
