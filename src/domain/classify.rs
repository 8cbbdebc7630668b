//! Series classification from free-text labels.
//!
//! Labels in the release are long English descriptions (for example
//! "Loans and leases in bank credit: Commercial and industrial loans, small
//! domestically chartered commercial banks"). Each label is mapped to a
//! `(BankType, AssetClass)` pair by two ordered rule lists.
//!
//! Matching is case-insensitive substring search and the first matching rule
//! wins. The order is part of the contract: a label that mentions both "small"
//! and "foreign" is `small`, and a reserve line described in terms of loans is
//! `reserves` only if no earlier rule matched.

use crate::domain::{AssetClass, BankType};

/// A rule matches when the lowercased label contains any of its keywords.
pub struct Rule<T: 'static> {
    pub keywords: &'static [&'static str],
    pub label: T,
}

/// Bank-type rules, evaluated top to bottom.
pub const BANK_TYPE_RULES: &[Rule<BankType>] = &[
    Rule { keywords: &["small"], label: BankType::Small },
    Rule { keywords: &["large", "domestically chartered"], label: BankType::Large },
    Rule { keywords: &["foreign"], label: BankType::Foreign },
];

/// Asset-class rules, evaluated top to bottom.
pub const ASSET_CLASS_RULES: &[Rule<AssetClass>] = &[
    Rule {
        keywords: &["commercial and industrial", "c&i"],
        label: AssetClass::CommercialIndustrial,
    },
    Rule { keywords: &["real estate"], label: AssetClass::RealEstate },
    Rule { keywords: &["consumer"], label: AssetClass::Consumer },
    Rule { keywords: &["deposit"], label: AssetClass::Deposits },
    Rule { keywords: &["reserve"], label: AssetClass::Reserves },
    Rule { keywords: &["loan"], label: AssetClass::Loans },
];

/// Apply an ordered rule list to an already-lowercased label.
fn first_match<T: Copy>(rules: &[Rule<T>], lowered: &str, fallback: T) -> T {
    rules
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| lowered.contains(k)))
        .map_or(fallback, |rule| rule.label)
}

/// Classify a series label. Total: unmatched labels yield `(All, Other)`.
pub fn classify(label: &str) -> (BankType, AssetClass) {
    let lowered = label.to_lowercase();
    (
        first_match(BANK_TYPE_RULES, &lowered, BankType::All),
        first_match(ASSET_CLASS_RULES, &lowered, AssetClass::Other),
    )
}
