use crate::chain::{ChainSlice, Quote};
use serde::Serialize;

/// Upper bound accepted for a mark-price European digital before it is
/// treated as bad data.
const MAX_MARKET_DIGITAL: f64 = 1.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bracket {
    /// Largest listed call strike <= target, sold at its bid
    pub short_strike: f64,
    /// Next listed call strike above the short leg, bought at its ask
    pub long_strike: f64,
}

impl Bracket {
    #[inline]
    pub fn width(&self) -> f64 {
        self.long_strike - self.short_strike
    }
}

/// Touch probability implied by a tradeable vertical call credit spread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpreadReplication {
    pub bracket: Bracket,
    /// (bid_short - ask_long) * spot, in settlement currency
    pub credit: f64,
    pub width: f64,
    pub spot: f64,
    /// 2 * credit / width. Not clamped.
    pub probability: f64,
}

/// Why no replicated probability could be derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum Unavailable {
    #[error("no listed call strike at or below target")]
    NoShortLeg,
    #[error("no listed call strike above the short leg")]
    NoLongLeg,
    #[error("short leg has no bid")]
    MissingBid,
    #[error("long leg has no ask")]
    MissingAsk,
    #[error("no underlying price on the short leg or slice")]
    MissingSpot,
    #[error("call strikes are not strictly increasing")]
    NonIncreasingStrikes,
    #[error("spread credit is not positive")]
    NonPositiveCredit,
    // The two below are decided by the scan, not by replicate_touch.
    #[error("call spreads do not replicate a down barrier")]
    DownBarrier,
    #[error("replicated probability above plausibility ceiling")]
    Implausible,
}

#[inline]
fn positive(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite() && *x > 0.0)
}

/// Tightest call bracket around `target`: (short leg, long leg).
pub fn bracket<'a>(slice: &'a ChainSlice, target: f64) -> Result<(&'a Quote, &'a Quote), Unavailable> {
    let calls = slice.calls();
    if calls.windows(2).any(|w| !(w[1].strike > w[0].strike)) {
        return Err(Unavailable::NonIncreasingStrikes);
    }

    let below = calls.partition_point(|q| q.strike <= target);
    if below == 0 {
        return Err(Unavailable::NoShortLeg);
    }
    let short = calls[below - 1];
    let long = calls.get(below).copied().ok_or(Unavailable::NoLongLeg)?;
    Ok((short, long))
}

/// Sell the short-leg call at its bid, buy the long-leg call at its ask.
///
/// A vertical credit spread priced as a European claim is worth roughly half
/// its width at the moment of touch, so doubling the credit fraction recovers
/// the touch probability:
///
///   P(touch) = 2 * credit / width
///
/// A non-positive credit means the quotes are too wide to say anything and is
/// reported as unavailable, never as a zero probability.
pub fn replicate_touch(slice: &ChainSlice, target: f64) -> Result<SpreadReplication, Unavailable> {
    let (short, long) = bracket(slice, target)?;

    let bid_short = positive(short.bid).ok_or(Unavailable::MissingBid)?;
    let ask_long = positive(long.ask).ok_or(Unavailable::MissingAsk)?;
    let spot = short.spot().or_else(|| slice.spot()).ok_or(Unavailable::MissingSpot)?;

    let bracket = Bracket {
        short_strike: short.strike,
        long_strike: long.strike,
    };
    let width = bracket.width();
    if !(width > 0.0) {
        return Err(Unavailable::NonIncreasingStrikes);
    }

    let credit = (bid_short - ask_long) * spot;
    if !(credit > 0.0) {
        return Err(Unavailable::NonPositiveCredit);
    }

    Ok(SpreadReplication {
        bracket,
        credit,
        width,
        spot,
        probability: 2.0 * credit / width,
    })
}

/// Market-implied European digital from mark prices over the same bracket:
/// (mark_short - mark_long) * spot / width.
///
/// Only returned when it is a sane price in [0, 1.05]; anything else points at
/// stale marks or an internally inconsistent book.
pub fn market_digital(slice: &ChainSlice, target: f64) -> Option<f64> {
    let (short, long) = bracket(slice, target).ok()?;
    let mark_short = short.mark.filter(|m| m.is_finite() && *m >= 0.0)?;
    let mark_long = long.mark.filter(|m| m.is_finite() && *m >= 0.0)?;
    let spot = short.spot().or_else(|| slice.spot())?;

    let width = long.strike - short.strike;
    if !(width > 0.0) {
        return None;
    }

    let p = (mark_short - mark_long) * spot / width;
    (0.0..=MAX_MARKET_DIGITAL).contains(&p).then_some(p)
}
