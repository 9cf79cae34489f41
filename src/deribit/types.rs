use crate::chain::{OptionKind, Quote};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Book summary ──

/// JSON-RPC envelope around every public Deribit response.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSummary {
    pub instrument_name: String,
    pub bid_price: Option<f64>,
    pub ask_price: Option<f64>,
    pub mark_price: Option<f64>,
    pub mark_iv: Option<f64>,
    pub underlying_price: Option<f64>,
    pub open_interest: Option<f64>,
    #[serde(alias = "volume_usd_24h")]
    pub volume_usd: Option<f64>,
}

/// Parsed `BTC-28MAR25-100000-C`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstrumentName<'a> {
    pub underlying: &'a str,
    pub expiry: NaiveDate,
    pub strike: f64,
    pub kind: OptionKind,
}

/// Splits a Deribit option name into its parts. Returns None on anything
/// that does not look like `U-DDMMMYY-STRIKE-C|P`.
pub fn parse_instrument_name(name: &str) -> Option<InstrumentName<'_>> {
    let mut parts = name.split('-');
    let underlying = parts.next().filter(|u| !u.is_empty())?;
    let expiry = parse_expiry(parts.next()?)?;
    let strike: f64 = parts.next()?.parse().ok()?;
    let kind = match parts.next()? {
        "C" => OptionKind::Call,
        "P" => OptionKind::Put,
        _ => return None,
    };
    if parts.next().is_some() || !(strike.is_finite() && strike > 0.0) {
        return None;
    }
    Some(InstrumentName {
        underlying,
        expiry,
        strike,
        kind,
    })
}

/// DDMMMYY, day may be a single digit (`7MAR25`).
fn parse_expiry(s: &str) -> Option<NaiveDate> {
    // chrono's %b matches month abbreviations case-insensitively
    NaiveDate::parse_from_str(s, "%d%b%y").ok()
}

impl BookSummary {
    /// Normalizes into a chain quote. None if the name does not parse.
    pub fn to_quote(&self) -> Option<Quote> {
        let name = parse_instrument_name(&self.instrument_name)?;
        Some(Quote {
            instrument: self.instrument_name.clone(),
            expiry: name.expiry,
            strike: name.strike,
            kind: name.kind,
            bid: self.bid_price,
            ask: self.ask_price,
            mark: self.mark_price,
            mark_iv: self.mark_iv,
            underlying_price: self.underlying_price,
            open_interest: self.open_interest.unwrap_or(0.0),
            volume_24h: self.volume_usd.unwrap_or(0.0),
        })
    }
}
