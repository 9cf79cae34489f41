use super::types::{EncodedList, GammaMarket, StringOrNumber};
use crate::errors::{EngineError, EngineResult};
use crate::models::BarrierDirection;
use crate::scan::ExternalObservation;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

/// Why a touch market could not be turned into an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("no strike in question")]
    NoStrike,
    #[error("missing or unparseable end date")]
    NoExpiry,
    #[error("outcome prices are not two probabilities")]
    BadPrices,
}

/// Recognizes touch markets on one underlying and normalizes them.
///
/// Selection:
///   1. The question names the underlying (ticker or full name).
///   2. The question carries a touch verb (hit, reach, above, dip, fall, ...).
///   3. A strike can be read from the question, or the group label.
pub struct TouchMarketParser {
    underlying: Regex,
    touch_verb: Regex,
    down_word: Regex,
    up_word: Regex,
    strike: Regex,
    bare_amount: Regex,
}

fn underlying_aliases(underlying: &str) -> Vec<String> {
    let u = underlying.to_uppercase();
    let name = match u.as_str() {
        "BTC" => Some("bitcoin"),
        "ETH" => Some("ethereum"),
        "SOL" => Some("solana"),
        "XRP" => Some("ripple"),
        _ => None,
    };
    let mut out = vec![regex::escape(&u.to_lowercase())];
    out.extend(name.map(str::to_string));
    out
}

impl TouchMarketParser {
    pub fn new(underlying: &str) -> EngineResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| EngineError::Config(format!("regex {pattern}: {e}")))
        };
        Ok(Self {
            underlying: compile(&format!(r"(?i)\b(?:{})\b", underlying_aliases(underlying).join("|")))?,
            touch_verb: compile(r"(?i)\b(?:hit|hits|reach|reaches|above|dip|dips|fall|falls|drop|drops|below)\b")?,
            down_word: compile(r"(?i)\b(?:dip|dips|fall|falls|drop|drops|below)\b")?,
            up_word: compile(r"(?i)\b(?:hit|hits|reach|reaches|above)\b")?,
            strike: compile(r"\$\s?(\d[\d,]*(?:\.\d+)?)\s?([kKmM])?\b")?,
            bare_amount: compile(r"(\d[\d,]*(?:\.\d+)?)\s?([kKmM])?\b")?,
        })
    }

    pub fn is_touch_market(&self, question: &str) -> bool {
        self.underlying.is_match(question) && self.touch_verb.is_match(question)
    }

    /// First `$`-amount: `$100,000`, `$100k`, `$1.5m`.
    pub fn parse_strike(&self, text: &str) -> Option<f64> {
        scaled_amount(&self.strike.captures(text)?)
    }

    /// Strike from a group label such as `↑ 120,000` or `$95k`. Only the
    /// first numeric token counts, so `↑ 100,000 (2026)` is 100000.
    fn parse_group_strike(&self, label: &str) -> Option<f64> {
        self.parse_strike(label)
            .or_else(|| scaled_amount(&self.bare_amount.captures(label)?))
    }

    pub fn parse_direction(&self, question: &str) -> Option<BarrierDirection> {
        if self.down_word.is_match(question) {
            Some(BarrierDirection::Down)
        } else if self.up_word.is_match(question) {
            Some(BarrierDirection::Up)
        } else {
            None
        }
    }

    /// Normalizes one touch market. Call only on markets that passed
    /// `is_touch_market`.
    pub fn to_observation(&self, market: &GammaMarket) -> Result<ExternalObservation, Rejection> {
        let strike = self
            .parse_strike(&market.question)
            .or_else(|| {
                market
                    .group_item_title
                    .as_deref()
                    .and_then(|l| self.parse_group_strike(l))
            })
            .ok_or(Rejection::NoStrike)?;

        let expiry = market
            .end_date
            .as_deref()
            .and_then(parse_end_date)
            .ok_or(Rejection::NoExpiry)?;

        let yes = yes_index(market.outcomes.as_ref());
        let prices = market
            .outcome_prices
            .as_ref()
            .and_then(parse_outcome_prices)
            .ok_or(Rejection::BadPrices)?;

        let direction = market
            .group_item_title
            .as_deref()
            .and_then(|l| {
                if l.contains('↓') {
                    Some(BarrierDirection::Down)
                } else if l.contains('↑') {
                    Some(BarrierDirection::Up)
                } else {
                    None
                }
            })
            .or_else(|| self.parse_direction(&market.question));

        Ok(ExternalObservation {
            id: market.id_string(),
            question: market.question.clone(),
            strike,
            expiry,
            observed_probability: prices[yes],
            url: format!(
                "https://polymarket.com/event/{}",
                market.slug.as_deref().unwrap_or_default()
            ),
            direction,
        })
    }

    /// Filters and normalizes a page set. Non-touch markets are dropped
    /// silently; touch markets that fail to parse are logged.
    pub fn observations(&self, markets: &[GammaMarket]) -> Vec<ExternalObservation> {
        let mut out = Vec::new();
        let mut rejected = 0usize;
        for m in markets.iter().filter(|m| self.is_touch_market(&m.question)) {
            match self.to_observation(m) {
                Ok(obs) => out.push(obs),
                Err(reason) => {
                    rejected += 1;
                    tracing::warn!(id = %m.id_string(), question = %m.question, %reason, "touch market skipped");
                }
            }
        }
        tracing::info!(
            markets = markets.len(),
            observations = out.len(),
            rejected,
            "touch markets discovered"
        );
        out
    }
}

/// Amount in group 1 (commas allowed) times the k/m suffix in group 2.
fn scaled_amount(caps: &regex::Captures<'_>) -> Option<f64> {
    let base: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    let scale = match caps.get(2).map(|m| m.as_str()) {
        Some("k" | "K") => 1e3,
        Some("m" | "M") => 1e6,
        _ => 1.0,
    };
    let amount = base * scale;
    (amount.is_finite() && amount > 0.0).then_some(amount)
}

/// RFC 3339 first, then bare `YYYY-MM-DD`.
pub fn parse_end_date(s: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .or_else(|| NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok())
}

/// Exactly two finite probabilities in [0, 1].
pub fn parse_outcome_prices(raw: &EncodedList) -> Option<[f64; 2]> {
    let entries = raw.entries()?;
    let [a, b] = entries.as_slice() else {
        return None;
    };
    let valid = |v: &StringOrNumber| v.as_f64().filter(|p| p.is_finite() && (0.0..=1.0).contains(p));
    Some([valid(a)?, valid(b)?])
}

/// Index of the "Yes" outcome, 0 when outcomes are absent or unlabeled.
pub fn yes_index(outcomes: Option<&EncodedList>) -> usize {
    outcomes
        .and_then(EncodedList::entries)
        .and_then(|entries| {
            entries.iter().take(2).position(|e| {
                matches!(e, StringOrNumber::Str(s) if s.trim().eq_ignore_ascii_case("yes"))
            })
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> TouchMarketParser {
        TouchMarketParser::new("BTC").unwrap()
    }

    fn market(json: &str) -> GammaMarket {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_touch_filter() {
        let p = parser();
        assert!(p.is_touch_market("Will Bitcoin reach $150,000 by December 31?"));
        assert!(p.is_touch_market("Will BTC dip to $80k in March?"));
        assert!(!p.is_touch_market("Will Ethereum reach $5,000?"));
        assert!(!p.is_touch_market("Bitcoin ETF approved by June?"));
        assert!(!p.is_touch_market("Will the Fed hit 3% rates?"));
    }

    #[test]
    fn test_strike_formats() {
        let p = parser();
        assert_eq!(p.parse_strike("reach $100,000 in 2026"), Some(100_000.0));
        assert_eq!(p.parse_strike("hit $120k?"), Some(120_000.0));
        assert_eq!(p.parse_strike("above $1.5m"), Some(1_500_000.0));
        assert_eq!(p.parse_strike("dip to $ 95K by Friday"), Some(95_000.0));
        assert_eq!(p.parse_strike("reach 100k"), None);
        assert_eq!(p.parse_strike("$0 test"), None);
    }

    #[test]
    fn test_direction_hints() {
        let p = parser();
        assert_eq!(p.parse_direction("Will Bitcoin dip to $80k?"), Some(BarrierDirection::Down));
        assert_eq!(p.parse_direction("Will Bitcoin fall below $70,000?"), Some(BarrierDirection::Down));
        assert_eq!(p.parse_direction("Will Bitcoin reach $150k?"), Some(BarrierDirection::Up));
        assert_eq!(p.parse_direction("Bitcoin at $100k on Jan 1?"), None);
    }

    #[test]
    fn test_outcome_prices_strict() {
        let ok = EncodedList::Encoded(r#"["0.35", "0.65"]"#.into());
        assert_eq!(parse_outcome_prices(&ok), Some([0.35, 0.65]));
        let numbers = EncodedList::Encoded("[0.4, 0.6]".into());
        assert_eq!(parse_outcome_prices(&numbers), Some([0.4, 0.6]));

        for bad in [
            r#"["0.35"]"#,
            r#"["0.2", "0.3", "0.5"]"#,
            r#"["1.4", "0.1"]"#,
            r#"["abc", "0.5"]"#,
            r#"{"yes": 0.5}"#,
            "print('hi')",
            "",
        ] {
            assert_eq!(parse_outcome_prices(&EncodedList::Encoded(bad.into())), None, "{bad}");
        }
    }

    #[test]
    fn test_yes_index() {
        assert_eq!(yes_index(None), 0);
        assert_eq!(yes_index(Some(&EncodedList::Encoded(r#"["Yes","No"]"#.into()))), 0);
        assert_eq!(yes_index(Some(&EncodedList::Encoded(r#"["No","Yes"]"#.into()))), 1);
        assert_eq!(yes_index(Some(&EncodedList::Encoded("garbage".into()))), 0);
    }

    #[test]
    fn test_end_date() {
        let d = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        assert_eq!(parse_end_date("2026-02-28T23:59:00Z"), Some(d));
        assert_eq!(parse_end_date("2026-02-28T20:00:00-05:00").map(|x| x.to_string()), Some("2026-03-01".into()));
        assert_eq!(parse_end_date("2026-02-28"), Some(d));
        assert_eq!(parse_end_date("soon"), None);
    }

    #[test]
    fn test_to_observation() {
        let m = market(
            r#"{
                "id": "9001",
                "question": "Will Bitcoin reach $150,000 by December 31, 2026?",
                "slug": "btc-150k-2026",
                "endDate": "2026-12-31T12:00:00Z",
                "outcomes": "[\"No\", \"Yes\"]",
                "outcomePrices": "[\"0.9\", \"0.1\"]"
            }"#,
        );
        let obs = parser().to_observation(&m).unwrap();
        assert_eq!(obs.id, "9001");
        assert_eq!(obs.strike, 150_000.0);
        assert_eq!(obs.expiry, NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());
        assert_eq!(obs.observed_probability, 0.1);
        assert_eq!(obs.url, "https://polymarket.com/event/btc-150k-2026");
        assert_eq!(obs.direction, Some(BarrierDirection::Up));
    }

    #[test]
    fn test_group_label_strike() {
        let m = market(
            r#"{
                "id": "1",
                "question": "What price will Bitcoin hit in February 2026?",
                "slug": "what-price-will-bitcoin-hit-in-february-2026",
                "endDate": "2026-02-28T23:59:00Z",
                "outcomePrices": ["0.05", "0.95"],
                "groupItemTitle": "↓ 60,000"
            }"#,
        );
        let obs = parser().to_observation(&m).unwrap();
        assert_eq!(obs.strike, 60_000.0);
        assert_eq!(obs.direction, Some(BarrierDirection::Down));
        assert_eq!(obs.observed_probability, 0.05);
    }

    #[test]
    fn test_group_label_reads_first_number_only() {
        let p = parser();
        assert_eq!(p.parse_group_strike("↑ 100,000 (2026)"), Some(100_000.0));
        assert_eq!(p.parse_group_strike("↓ 85k by 3/31"), Some(85_000.0));
        assert_eq!(p.parse_group_strike("$95k"), Some(95_000.0));
        assert_eq!(p.parse_group_strike("↑ 1.5m"), Some(1_500_000.0));
        assert_eq!(p.parse_group_strike("no touch"), None);
    }

    #[test]
    fn test_rejections_and_batch() {
        let p = parser();
        let no_date = market(r#"{"question": "Will Bitcoin hit $200k?", "outcomePrices": "[\"0.1\",\"0.9\"]"}"#);
        assert_eq!(p.to_observation(&no_date), Err(Rejection::NoExpiry));
        let bad_prices = market(r#"{"question": "Will Bitcoin hit $200k?", "endDate": "2026-06-30", "outcomePrices": "[\"x\"]"}"#);
        assert_eq!(p.to_observation(&bad_prices), Err(Rejection::BadPrices));

        let other = market(r#"{"question": "Will it rain in London?"}"#);
        let good = market(
            r#"{"id": "2", "question": "Will BTC hit $120k?", "endDate": "2026-06-30T00:00:00Z", "outcomePrices": "[\"0.3\",\"0.7\"]", "slug": "s"}"#,
        );
        let obs = p.observations(&[other, no_date, good]);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].strike, 120_000.0);
    }
}
