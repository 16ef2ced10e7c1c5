//! Checkout and address-book address rules.

use serde::{Deserialize, Serialize};

/// Fallback country when neither the input nor the region names one.
pub const DEFAULT_COUNTRY_CODE: &str = "in";

/// An address being typed in by a shopper.
///
/// Every field is optional while the form is partially filled. `None` means
/// "not provided"; an empty string means the shopper cleared the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// ISO 3166-1 alpha-2, lowercase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl DraftAddress {
    /// Overlay the fields `incoming` provides onto `self`.
    pub fn merge(&mut self, incoming: Self) {
        fn take(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.first_name, incoming.first_name);
        take(&mut self.last_name, incoming.last_name);
        take(&mut self.address_1, incoming.address_1);
        take(&mut self.address_2, incoming.address_2);
        take(&mut self.postal_code, incoming.postal_code);
        take(&mut self.city, incoming.city);
        take(&mut self.province, incoming.province);
        take(&mut self.company, incoming.company);
        take(&mut self.country_code, incoming.country_code);
        take(&mut self.phone, incoming.phone);
    }

    /// Phone, street, city and postal code are all present.
    ///
    /// Incomplete addresses are never written to the cart.
    #[must_use]
    pub fn is_shippable(&self) -> bool {
        [&self.phone, &self.address_1, &self.city, &self.postal_code]
            .into_iter()
            .all(|field| filled(field.as_deref()).is_some())
    }

    /// Whether the phone field specifically is missing.
    #[must_use]
    pub fn missing_phone(&self) -> bool {
        filled(self.phone.as_deref()).is_none()
    }
}

/// Trimmed value, `None` when absent or blank.
#[must_use]
pub fn filled(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A country as a region lists it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryRef<'a> {
    pub iso_2: &'a str,
    pub display_name: &'a str,
}

/// Map free-text country input to a lowercase ISO code.
///
/// Matches a region country by display name or ISO code (case-insensitive),
/// else falls back to the region's first country, else [`DEFAULT_COUNTRY_CODE`].
#[must_use]
pub fn resolve_country_code(input: &str, countries: &[CountryRef<'_>]) -> String {
    let input = input.trim();
    countries
        .iter()
        .find(|c| c.display_name.eq_ignore_ascii_case(input) || c.iso_2.eq_ignore_ascii_case(input))
        .or_else(|| countries.first())
        .map(|c| c.iso_2)
        .filter(|code| !code.is_empty())
        .unwrap_or(DEFAULT_COUNTRY_CODE)
        .to_ascii_lowercase()
}

/// "First Last", else the email, else `"Guest"`.
#[must_use]
pub fn display_name(first: Option<&str>, last: Option<&str>, email: Option<&str>) -> String {
    let name = [first, last]
        .into_iter()
        .filter_map(filled)
        .collect::<Vec<_>>()
        .join(" ");
    if !name.is_empty() {
        return name;
    }
    filled(email).unwrap_or("Guest").to_owned()
}
