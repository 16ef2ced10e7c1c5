//! Catalog display pricing.
//!
//! Product cards show the cheapest variant, with the compare-at price struck
//! through when that variant is on sale. These rules are display-only; cart
//! totals always come from the commerce backend.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::{CurrencyCode, Money};

/// One variant's display price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePoint {
    pub amount: Decimal,
    /// Original amount when the variant sits in a sale price list.
    pub compare_at: Option<Decimal>,
    pub currency: CurrencyCode,
}

impl PricePoint {
    #[must_use]
    pub const fn new(amount: Decimal, compare_at: Option<Decimal>, currency: CurrencyCode) -> Self {
        Self {
            amount,
            compare_at,
            currency,
        }
    }

    #[must_use]
    pub const fn price(&self) -> Money {
        Money::new(self.amount, self.currency)
    }

    /// The compare-at price, only when it is actually higher.
    #[must_use]
    pub fn compare_at_price(&self) -> Option<Money> {
        self.compare_at
            .filter(|compare| *compare > self.amount)
            .map(|compare| Money::new(compare, self.currency))
    }

    #[must_use]
    pub fn percent_off(&self) -> Option<u32> {
        self.compare_at
            .and_then(|compare| percent_off(self.amount, compare))
    }
}

/// Pick the cheapest price point. The first entry wins on ties.
pub fn lowest_price<'a, I>(points: I) -> Option<&'a PricePoint>
where
    I: IntoIterator<Item = &'a PricePoint>,
{
    points.into_iter().fold(None, |best, candidate| match best {
        Some(current) if current.amount <= candidate.amount => Some(current),
        _ => Some(candidate),
    })
}

/// `round((compare - price) / compare * 100)`, only when `compare > price`.
///
/// ```
/// use dbk_core::pricing::percent_off;
/// use rust_decimal::Decimal;
///
/// assert_eq!(percent_off(Decimal::from(750), Decimal::from(1000)), Some(25));
/// assert_eq!(percent_off(Decimal::from(1000), Decimal::from(1000)), None);
/// ```
#[must_use]
pub fn percent_off(price: Decimal, compare: Decimal) -> Option<u32> {
    if compare <= price || compare <= Decimal::ZERO {
        return None;
    }

    ((compare - price) / compare * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn point(amount: &str, compare: Option<&str>) -> PricePoint {
        PricePoint::new(dec(amount), compare.map(dec), CurrencyCode::INR)
    }

    #[test]
    fn test_percent_off_rounds_to_nearest() {
        assert_eq!(percent_off(dec("999"), dec("1499")), Some(33));
        assert_eq!(percent_off(dec("1"), dec("3")), Some(67));
        assert_eq!(percent_off(dec("87.5"), dec("100")), Some(13));
    }

    #[test]
    fn test_percent_off_requires_higher_compare() {
        assert_eq!(percent_off(dec("500"), dec("500")), None);
        assert_eq!(percent_off(dec("600"), dec("500")), None);
        assert_eq!(percent_off(dec("0"), dec("0")), None);
    }

    #[test]
    fn test_lowest_price_picks_minimum() {
        let points = [
            point("1499", None),
            point("999", Some("1299")),
            point("1199", None),
        ];
        let best = lowest_price(&points).unwrap();
        assert_eq!(best.amount, dec("999"));
        assert_eq!(best.percent_off(), Some(23));
    }

    #[test]
    fn test_lowest_price_first_wins_on_tie() {
        let points = [point("999", Some("1999")), point("999", None)];
        let best = lowest_price(&points).unwrap();
        assert_eq!(best.compare_at, Some(dec("1999")));
    }

    #[test]
    fn test_lowest_price_empty() {
        let empty: [PricePoint; 0] = [];
        assert!(lowest_price(&empty).is_none());
    }

    #[test]
    fn test_compare_at_price_hidden_when_not_higher() {
        assert!(point("999", Some("999")).compare_at_price().is_none());
        assert_eq!(
            point("999", Some("1299")).compare_at_price().unwrap().format_compact(),
            "₹1,299"
        );
    }
}
