//! Variant selection.
//!
//! A product has option dimensions (size, colour); each variant carries one
//! value per dimension. Shoppers pick values one dimension at a time and a
//! variant is only resolved once every dimension has a value.

use std::collections::BTreeMap;

/// Option values chosen so far, keyed by option id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSelection(BTreeMap<String, String>);

impl OptionSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the value for one option dimension.
    pub fn toggle(&mut self, option_id: impl Into<String>, value: impl Into<String>) {
        self.0.insert(option_id.into(), value.into());
    }

    /// Copy of this selection with one dimension changed.
    #[must_use]
    pub fn with(&self, option_id: &str, value: &str) -> Self {
        let mut next = self.clone();
        next.toggle(option_id, value);
        next
    }

    #[must_use]
    pub fn get(&self, option_id: &str) -> Option<&str> {
        self.0.get(option_id).map(String::as_str)
    }

    #[must_use]
    pub fn is_selected(&self, option_id: &str, value: &str) -> bool {
        self.get(option_id) == Some(value)
    }

    /// Whether each of the product's `option_ids` has a value.
    #[must_use]
    pub fn is_complete(&self, option_ids: &[&str]) -> bool {
        !option_ids.is_empty() && option_ids.iter().all(|id| self.0.contains_key(*id))
    }

    /// Copy of this selection keeping only the product's `option_ids`.
    ///
    /// Query strings may carry values for options a product no longer has.
    #[must_use]
    pub fn restricted_to(&self, option_ids: &[&str]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(id, _)| option_ids.contains(&id.as_str()))
                .map(|(id, value)| (id.clone(), value.clone()))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OptionSelection {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A variant's `(option id, value)` pairs.
pub trait VariantOptions {
    fn option_values(&self) -> impl Iterator<Item = (&str, &str)>;
}

/// Resolve the variant matching a complete selection.
///
/// Returns `None` until every one of `option_ids` is chosen, then the first
/// variant whose every option value matches the selection.
pub fn resolve<'a, V: VariantOptions>(
    selection: &OptionSelection,
    option_ids: &[&str],
    variants: &'a [V],
) -> Option<&'a V> {
    if !selection.is_complete(option_ids) {
        return None;
    }

    variants.iter().find(|variant| {
        variant
            .option_values()
            .all(|(option_id, value)| selection.is_selected(option_id, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Variant {
        id: &'static str,
        options: Vec<(&'static str, &'static str)>,
    }

    impl VariantOptions for Variant {
        fn option_values(&self) -> impl Iterator<Item = (&str, &str)> {
            self.options.iter().copied()
        }
    }

    const SHIRT_OPTIONS: [&str; 2] = ["size", "color"];

    fn shirts() -> Vec<Variant> {
        vec![
            Variant {
                id: "s-red",
                options: vec![("size", "S"), ("color", "Red")],
            },
            Variant {
                id: "m-red",
                options: vec![("size", "M"), ("color", "Red")],
            },
            Variant {
                id: "m-blue",
                options: vec![("size", "M"), ("color", "Blue")],
            },
        ]
    }

    #[test]
    fn test_partial_selection_resolves_nothing() {
        let variants = shirts();
        let mut selection = OptionSelection::new();
        selection.toggle("size", "M");
        assert!(resolve(&selection, &SHIRT_OPTIONS, &variants).is_none());
    }

    #[test]
    fn test_complete_selection_resolves_variant() {
        let variants = shirts();
        let selection: OptionSelection = [("size", "M"), ("color", "Blue")].into_iter().collect();
        assert_eq!(resolve(&selection, &SHIRT_OPTIONS, &variants).map(|v| v.id), Some("m-blue"));
    }

    #[test]
    fn test_toggle_replaces_value() {
        let variants = shirts();
        let mut selection: OptionSelection =
            [("size", "M"), ("color", "Blue")].into_iter().collect();
        selection.toggle("size", "S");
        assert_eq!(selection.len(), 2);
        assert!(resolve(&selection, &SHIRT_OPTIONS, &variants).is_none());

        selection.toggle("color", "Red");
        assert_eq!(resolve(&selection, &SHIRT_OPTIONS, &variants).map(|v| v.id), Some("s-red"));
    }

    #[test]
    fn test_product_without_options_never_resolves() {
        let variants = shirts();
        assert!(resolve(&OptionSelection::new(), &[], &variants).is_none());
    }

    #[test]
    fn test_with_leaves_original_untouched() {
        let base: OptionSelection = [("size", "M")].into_iter().collect();
        let next = base.with("color", "Red");
        assert_eq!(base.len(), 1);
        assert!(next.is_selected("color", "Red"));
        assert!(next.is_selected("size", "M"));
    }

    #[test]
    fn test_unknown_option_does_not_block_resolution() {
        let variants = shirts();
        let selection: OptionSelection = [("size", "M"), ("color", "Red"), ("fit", "Slim")]
            .into_iter()
            .collect();
        assert!(selection.is_complete(&SHIRT_OPTIONS));
        assert_eq!(resolve(&selection, &SHIRT_OPTIONS, &variants).map(|v| v.id), Some("m-red"));

        let restricted = selection.restricted_to(&SHIRT_OPTIONS);
        assert_eq!(restricted.len(), 2);
        assert!(restricted.get("fit").is_none());
    }
}
