//! Monetary amounts and their storefront display formats.
//!
//! Amounts come from the commerce backend in major units (rupees, dollars).
//! Nothing here performs transactional arithmetic; it only renders numbers
//! the backend already computed.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes the storefront knows how to render.
///
/// The backend reports codes in lowercase (`"inr"`). Unknown codes render as
/// INR, the home market.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Parse a currency code case-insensitively, falling back to INR.
    #[must_use]
    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "USD" => Self::USD,
            "EUR" => Self::EUR,
            "GBP" => Self::GBP,
            "CAD" => Self::CAD,
            "AUD" => Self::AUD,
            _ => Self::INR,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::CAD => "CA$",
            Self::AUD => "A$",
        }
    }

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }

    /// Whether amounts use lakh/crore digit grouping (`12,34,567`).
    const fn indian_grouping(self) -> bool {
        matches!(self, Self::INR)
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// An amount paired with its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

impl Money {
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Currency-style rendering with two fraction digits: `₹1,23,456.50`.
    #[must_use]
    pub fn format(&self) -> String {
        let rounded = self.rounded();
        let digits = format!("{:.2}", rounded.abs());
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
        format!(
            "{}{}{}.{}",
            sign(rounded),
            self.currency.symbol(),
            group_digits(int_part, self.currency.indian_grouping()),
            frac_part
        )
    }

    /// Product-card rendering: grouped digits, fraction only when present.
    ///
    /// `1299.00` renders as `₹1,299` and `1299.5` as `₹1,299.5`.
    #[must_use]
    pub fn format_compact(&self) -> String {
        let rounded = self.rounded();
        let digits = rounded.abs().normalize().to_string();
        let grouped = match digits.split_once('.') {
            Some((int_part, frac_part)) => format!(
                "{}.{frac_part}",
                group_digits(int_part, self.currency.indian_grouping())
            ),
            None => group_digits(&digits, self.currency.indian_grouping()),
        };
        format!("{}{}{grouped}", sign(rounded), self.currency.symbol())
    }

    fn rounded(&self) -> Decimal {
        self.amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

fn sign(amount: Decimal) -> &'static str {
    if amount.is_sign_negative() && !amount.is_zero() {
        "-"
    } else {
        ""
    }
}

/// Insert thousands separators into a run of ASCII digits.
///
/// Indian grouping keeps the last three digits together and groups the rest
/// in pairs.
fn group_digits(digits: &str, indian: bool) -> String {
    let len = digits.len();
    if len <= 3 {
        return digits.to_owned();
    }

    let (head, tail) = digits.split_at(len - 3);
    let group = if indian { 2 } else { 3 };
    let mut out = String::with_capacity(len + len / group + 1);
    let lead = head.len() % group;
    for (i, ch) in head.chars().enumerate() {
        if i != 0 && (i + group - lead) % group == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push(',');
    out.push_str(tail);
    out
}
