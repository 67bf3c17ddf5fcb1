//! Option groups and their expansion into sellable variant descriptors.
//!
//! A product with option groups `Size = [S, M]` and `Color = [Red, Blue]`
//! is sold as four variants. [`combine`] produces those combinations in
//! row-major order (the last group varies fastest), which is also the order
//! Shopify lists variants in.

use serde::{Deserialize, Serialize};

use crate::types::Bundle;

/// Name of the option group that toggles gift packaging.
pub const PACKAGING_OPTION: &str = "Packaging";
/// Packaging value selecting the gift box.
pub const WITH_PACKAGING: &str = "With Gift box";
/// Packaging value without the gift box.
pub const WITHOUT_PACKAGING: &str = "Without Gift Box";

/// A named axis of choice with its ordered allowed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionGroup {
    pub name: String,
    pub values: Vec<String>,
}

impl OptionGroup {
    /// Create an option group.
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// The packaging toggle (`Without Gift Box` first, so the default variant
    /// created by the platform is the plain one).
    #[must_use]
    pub fn packaging() -> Self {
        Self::new(PACKAGING_OPTION, [WITHOUT_PACKAGING, WITH_PACKAGING])
    }
}

/// One `(option, value)` selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionChoice {
    pub option_name: String,
    pub value: String,
}

/// One combination of option values, i.e. one sellable variant.
///
/// An empty descriptor is the product's default variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantDescriptor {
    choices: Vec<OptionChoice>,
}

impl VariantDescriptor {
    /// Build a descriptor from `(option, value)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            choices: pairs
                .into_iter()
                .map(|(option_name, value)| OptionChoice {
                    option_name: option_name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn choices(&self) -> &[OptionChoice] {
        &self.choices
    }

    /// Whether this is the option-less default variant.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.choices.is_empty()
    }

    /// Whether the descriptor selects `value` for `option_name`.
    #[must_use]
    pub fn selects(&self, option_name: &str, value: &str) -> bool {
        self.choices
            .iter()
            .any(|c| c.option_name == option_name && c.value == value)
    }

    /// Whether this variant includes the gift box.
    #[must_use]
    pub fn selects_packaging(&self) -> bool {
        self.selects(PACKAGING_OPTION, WITH_PACKAGING)
    }

    /// Whether the descriptor makes exactly the given selections, in any order.
    pub fn matches_selection<'a>(
        &self,
        selected: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> bool {
        let selected: Vec<(&str, &str)> = selected.into_iter().collect();
        selected.len() == self.choices.len()
            && selected
                .iter()
                .all(|(name, value)| self.selects(name, value))
    }
}

/// Expand option groups into every combination of their values.
///
/// Zero groups yield exactly one (default) descriptor. A group with no
/// values contributes no combinations, so the result is empty.
#[must_use]
pub fn combine(groups: &[OptionGroup]) -> Vec<VariantDescriptor> {
    groups
        .iter()
        .fold(vec![VariantDescriptor::default()], |acc, group| {
            acc.iter()
                .flat_map(|prefix| {
                    group.values.iter().map(move |value| {
                        let mut choices = prefix.choices.clone();
                        choices.push(OptionChoice {
                            option_name: group.name.clone(),
                            value: value.clone(),
                        });
                        VariantDescriptor { choices }
                    })
                })
                .collect()
        })
}

/// The option schema a bundle is listed with.
///
/// The packaging toggle is appended only when the bundle has packaging and
/// packaging stock exists to back it.
#[must_use]
pub fn bundle_option_groups(bundle: &Bundle, packaging_available: bool) -> Vec<OptionGroup> {
    let mut groups: Vec<OptionGroup> = bundle
        .options
        .iter()
        .map(|option| OptionGroup {
            name: option.axis_name(),
            values: option.values.clone(),
        })
        .collect();

    if bundle.packaging.is_some() && packaging_available {
        groups.push(OptionGroup::packaging());
    }

    groups
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn group(name: &str, values: &[&str]) -> OptionGroup {
        OptionGroup::new(name, values.iter().copied())
    }

    #[test]
    fn test_zero_groups_yield_default_variant() {
        let variants = combine(&[]);
        assert_eq!(variants.len(), 1);
        assert!(variants[0].is_default());
    }

    #[test]
    fn test_single_group_yields_one_per_value() {
        let variants = combine(&[group("Size", &["S", "M", "L"])]);
        assert_eq!(variants.len(), 3);
        assert!(variants[2].selects("Size", "L"));
    }

    #[test]
    fn test_product_of_sizes_and_uniqueness() {
        let groups = [
            group("Size", &["S", "M"]),
            group("Color", &["Red", "Green", "Blue"]),
            group("Packaging", &[WITHOUT_PACKAGING, WITH_PACKAGING]),
        ];
        let variants = combine(&groups);

        assert_eq!(variants.len(), 2 * 3 * 2);
        assert!(variants.iter().all(|v| v.choices().len() == groups.len()));
        let unique: HashSet<_> = variants.iter().collect();
        assert_eq!(unique.len(), variants.len());
    }

    #[test]
    fn test_last_group_varies_fastest() {
        let variants = combine(&[group("Size", &["S", "M"]), group("Color", &["Red", "Blue"])]);
        let expected = [
            VariantDescriptor::from_pairs([("Size", "S"), ("Color", "Red")]),
            VariantDescriptor::from_pairs([("Size", "S"), ("Color", "Blue")]),
            VariantDescriptor::from_pairs([("Size", "M"), ("Color", "Red")]),
            VariantDescriptor::from_pairs([("Size", "M"), ("Color", "Blue")]),
        ];
        assert_eq!(variants, expected);
    }

    #[test]
    fn test_empty_group_yields_nothing() {
        assert!(combine(&[group("Size", &["S"]), group("Color", &[])]).is_empty());
    }

    #[test]
    fn test_matches_selection_ignores_order() {
        let descriptor = VariantDescriptor::from_pairs([("Size", "S"), ("Color", "Red")]);
        assert!(descriptor.matches_selection([("Color", "Red"), ("Size", "S")]));
        assert!(!descriptor.matches_selection([("Size", "S")]));
        assert!(!descriptor.matches_selection([("Size", "S"), ("Color", "Blue")]));
    }

    #[test]
    fn test_packaging_selection() {
        let boxed = VariantDescriptor::from_pairs([(PACKAGING_OPTION, WITH_PACKAGING)]);
        let plain = VariantDescriptor::from_pairs([(PACKAGING_OPTION, WITHOUT_PACKAGING)]);
        assert!(boxed.selects_packaging());
        assert!(!plain.selects_packaging());
        assert!(!VariantDescriptor::default().selects_packaging());
    }
}
