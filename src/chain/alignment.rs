use super::{ChainSlice, InstrumentChain};
use chrono::NaiveDate;

/// Earliest listed expiry on or after `target`.
///
/// An option that expires before the target date cannot hedge a touch that
/// happens after it is gone, so earlier expiries are never considered.
/// Returns `None` ("no coverage") when every listed expiry is earlier.
pub fn aligned_expiry(chain: &InstrumentChain, target: NaiveDate) -> Option<NaiveDate> {
    // Quotes are expiry-ordered: the first one at/after target is the answer.
    let idx = chain.quotes().partition_point(|q| q.expiry < target);
    chain.quotes().get(idx).map(|q| q.expiry)
}

/// The chain restricted to the aligned expiry for `target`.
pub fn align(chain: &InstrumentChain, target: NaiveDate) -> Option<ChainSlice> {
    let expiry = aligned_expiry(chain, target)?;
    Some(slice_at(chain, expiry))
}

/// All quotes listed exactly at `expiry` (possibly empty).
pub fn slice_at(chain: &InstrumentChain, expiry: NaiveDate) -> ChainSlice {
    let quotes = chain.quotes();
    let start = quotes.partition_point(|q| q.expiry < expiry);
    let end = quotes.partition_point(|q| q.expiry <= expiry);
    ChainSlice {
        expiry,
        quotes: quotes[start..end].to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::test_support::*;

    fn chain() -> InstrumentChain {
        InstrumentChain::new(
            "BTC",
            vec![
                call("2026-02-20", 100_000.0, None, None),
                call("2026-02-27", 100_000.0, None, None),
                call("2026-02-27", 110_000.0, None, None),
                put("2026-02-27", 90_000.0),
                call("2026-03-27", 120_000.0, None, None),
            ],
        )
    }

    #[test]
    fn test_exact_expiry_selected() {
        let slice = align(&chain(), date("2026-02-27")).unwrap();
        assert_eq!(slice.expiry, date("2026-02-27"));
        assert_eq!(slice.quotes.len(), 3);
        assert!(slice.quotes.iter().all(|q| q.expiry == date("2026-02-27")));
    }

    #[test]
    fn test_next_later_expiry_selected() {
        assert_eq!(aligned_expiry(&chain(), date("2026-02-21")), Some(date("2026-02-27")));
        assert_eq!(aligned_expiry(&chain(), date("2026-01-01")), Some(date("2026-02-20")));
        assert_eq!(aligned_expiry(&chain(), date("2026-03-01")), Some(date("2026-03-27")));
    }

    #[test]
    fn test_no_coverage_after_last_expiry() {
        assert!(align(&chain(), date("2026-03-28")).is_none());
        assert!(align(&InstrumentChain::default(), date("2026-03-28")).is_none());
    }

    #[test]
    fn test_slice_at_unlisted_expiry_is_empty() {
        assert!(slice_at(&chain(), date("2026-02-21")).quotes.is_empty());
    }
}
