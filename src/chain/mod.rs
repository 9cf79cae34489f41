pub mod alignment;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => f.pad("call"),
            Self::Put => f.pad("put"),
        }
    }
}

/// One listed option at one snapshot. Premiums (bid/ask/mark) are in units of
/// the underlying; `mark_iv` is a percentage (60.0 = 60%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub instrument: String,
    pub expiry: NaiveDate,
    pub strike: f64,
    pub kind: OptionKind,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub mark: Option<f64>,
    pub mark_iv: Option<f64>,
    pub underlying_price: Option<f64>,
    pub open_interest: f64,
    pub volume_24h: f64,
}

impl Quote {
    /// Mark IV as an annualized decimal, if present and positive.
    #[inline]
    pub fn volatility(&self) -> Option<f64> {
        self.mark_iv
            .filter(|iv| iv.is_finite() && *iv > 0.0)
            .map(|iv| iv / 100.0)
    }

    #[inline]
    pub fn spot(&self) -> Option<f64> {
        self.underlying_price.filter(|s| s.is_finite() && *s > 0.0)
    }
}

/// All quotes for one underlying at one snapshot, ordered by expiry, then
/// strike, then kind. Strikes are unique within (expiry, kind).
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstrumentChain {
    underlying: String,
    quotes: Vec<Quote>,
}

impl InstrumentChain {
    /// Builds the ordered chain. Quotes with a non-positive strike are dropped;
    /// a repeated (expiry, kind, strike) keeps its first occurrence.
    pub fn new(underlying: impl Into<String>, quotes: Vec<Quote>) -> Self {
        let underlying = underlying.into();
        let total = quotes.len();

        let mut quotes: Vec<Quote> = quotes
            .into_iter()
            .filter(|q| q.strike.is_finite() && q.strike > 0.0)
            .collect();
        // Stable sort keeps the first of any duplicates in front.
        quotes.sort_by(|a, b| {
            a.expiry
                .cmp(&b.expiry)
                .then(a.strike.total_cmp(&b.strike))
                .then(a.kind.cmp(&b.kind))
        });
        quotes.dedup_by(|later, earlier| {
            later.expiry == earlier.expiry
                && later.kind == earlier.kind
                && later.strike == earlier.strike
        });

        let dropped = total - quotes.len();
        if dropped > 0 {
            tracing::warn!(underlying = %underlying, dropped, "dropped invalid or duplicate quotes");
        }

        Self { underlying, quotes }
    }

    pub fn underlying(&self) -> &str {
        &self.underlying
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Distinct listed expiries, ascending.
    pub fn expiries(&self) -> Vec<NaiveDate> {
        let mut out: Vec<NaiveDate> = self.quotes.iter().map(|q| q.expiry).collect();
        out.dedup();
        out
    }
}

/// The part of a chain listed at a single expiry.
#[derive(Debug, Clone, Serialize)]
pub struct ChainSlice {
    pub expiry: NaiveDate,
    /// Ordered by strike, then kind
    pub quotes: Vec<Quote>,
}

impl ChainSlice {
    /// Quotes of one kind, strike ascending.
    pub fn of_kind(&self, kind: OptionKind) -> impl Iterator<Item = &Quote> + '_ {
        self.quotes.iter().filter(move |q| q.kind == kind)
    }

    pub fn calls(&self) -> Vec<&Quote> {
        self.of_kind(OptionKind::Call).collect()
    }

    /// Annualized vol of the call nearest `strike` that carries a mark IV.
    /// Ties go to the lower strike.
    pub fn volatility_near(&self, strike: f64) -> Option<(f64, &Quote)> {
        self.of_kind(OptionKind::Call)
            .filter_map(|q| q.volatility().map(|v| (v, q)))
            .min_by(|(_, a), (_, b)| {
                (a.strike - strike)
                    .abs()
                    .total_cmp(&(b.strike - strike).abs())
                    .then(a.strike.total_cmp(&b.strike))
            })
    }

    /// First positive underlying price in the slice.
    pub fn spot(&self) -> Option<f64> {
        self.quotes.iter().find_map(Quote::spot)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    pub fn call(expiry: &str, strike: f64, bid: Option<f64>, ask: Option<f64>) -> Quote {
        Quote {
            instrument: format!("BTC-{expiry}-{strike}-C"),
            expiry: date(expiry),
            strike,
            kind: OptionKind::Call,
            bid,
            ask,
            mark: None,
            mark_iv: Some(60.0),
            underlying_price: Some(100_000.0),
            open_interest: 10.0,
            volume_24h: 1_000.0,
        }
    }

    pub fn put(expiry: &str, strike: f64) -> Quote {
        Quote {
            kind: OptionKind::Put,
            instrument: format!("BTC-{expiry}-{strike}-P"),
            ..call(expiry, strike, Some(0.01), Some(0.02))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_chain_ordered_and_unique() {
        let chain = InstrumentChain::new(
            "BTC",
            vec![
                call("2026-03-27", 110_000.0, None, None),
                put("2026-02-27", 100_000.0),
                call("2026-02-27", 100_000.0, Some(0.05), None),
                call("2026-02-27", 100_000.0, Some(0.09), None),
                call("2026-02-27", 90_000.0, None, None),
                call("2026-02-27", -5.0, None, None),
            ],
        );
        assert_eq!(chain.len(), 4);
        let keys: Vec<(NaiveDate, f64, OptionKind)> =
            chain.quotes().iter().map(|q| (q.expiry, q.strike, q.kind)).collect();
        assert_eq!(
            keys,
            vec![
                (date("2026-02-27"), 90_000.0, OptionKind::Call),
                (date("2026-02-27"), 100_000.0, OptionKind::Call),
                (date("2026-02-27"), 100_000.0, OptionKind::Put),
                (date("2026-03-27"), 110_000.0, OptionKind::Call),
            ]
        );
        // First duplicate wins
        assert_eq!(chain.quotes()[1].bid, Some(0.05));
        assert_eq!(chain.expiries(), vec![date("2026-02-27"), date("2026-03-27")]);
    }

    #[test]
    fn test_volatility_near_prefers_closest_then_lower() {
        let mut a = call("2026-02-27", 95_000.0, None, None);
        a.mark_iv = Some(55.0);
        let mut b = call("2026-02-27", 105_000.0, None, None);
        b.mark_iv = Some(65.0);
        let mut c = call("2026-02-27", 100_000.0, None, None);
        c.mark_iv = None;
        let slice = ChainSlice {
            expiry: date("2026-02-27"),
            quotes: vec![a, c, b],
        };
        let (vol, q) = slice.volatility_near(100_000.0).unwrap();
        assert_eq!(q.strike, 95_000.0);
        assert!((vol - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_quote_rejects_non_positive_iv_and_spot() {
        let mut q = call("2026-02-27", 95_000.0, None, None);
        q.mark_iv = Some(0.0);
        q.underlying_price = Some(-1.0);
        assert!(q.volatility().is_none());
        assert!(q.spot().is_none());
    }
}
