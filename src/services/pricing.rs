use crate::models::PricingQuote;
use std::collections::BTreeSet;

pub const BASE_PRICE: f64 = 19.99;
pub const MIN_PRICE: f64 = 27.0;
pub const MAX_PRICE: f64 = 97.0;
pub const ADD_ON_BONUS: f64 = 3.0;

/// Niche premiums, matched case-insensitively on the trimmed niche.
const NICHE_BONUS: &[(&str, f64)] = &[
    ("real estate", 50.0),
    ("investing", 40.0),
    ("personal finance", 35.0),
    ("business", 30.0),
    ("marketing", 25.0),
    ("health & fitness", 15.0),
    ("relationships", 10.0),
    ("spiritual awakening & energy vibration", 10.0),
    ("productivity", 8.0),
    ("parenting", 8.0),
];

fn word_count_bonus(word_count: usize) -> f64 {
    if word_count > 20_000 {
        20.0
    } else if word_count > 10_000 {
        10.0
    } else {
        0.0
    }
}

pub fn niche_bonus(niche: &str) -> f64 {
    let key = niche.trim().to_lowercase();
    NICHE_BONUS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0.0)
}

pub fn quote(word_count: usize, niche: &str, add_ons: &BTreeSet<String>) -> PricingQuote {
    let raw = BASE_PRICE
        + word_count_bonus(word_count)
        + niche_bonus(niche)
        + ADD_ON_BONUS * add_ons.len() as f64;

    PricingQuote {
        base_price: BASE_PRICE,
        adjusted_price: round_cents(raw.clamp(MIN_PRICE, MAX_PRICE)),
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_ons(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn short_unknown_book_clamps_up() {
        assert_eq!(quote(5000, "unknown-niche", &add_ons(&[])).adjusted_price, 27.0);
    }

    #[test]
    fn long_premium_book_clamps_down() {
        let q = quote(50_000, "Real Estate", &add_ons(&["a", "b", "c"]));
        assert_eq!(q.adjusted_price, 97.0);
        assert_eq!(q.base_price, BASE_PRICE);
    }

    #[test]
    fn tiers_are_not_cumulative() {
        let niche = "productivity";
        let none = add_ons(&[]);
        assert_eq!(quote(10_000, niche, &none).adjusted_price, 27.99);
        assert_eq!(quote(10_001, niche, &none).adjusted_price, 37.99);
        assert_eq!(quote(20_001, niche, &none).adjusted_price, 47.99);
    }

    #[test]
    fn deterministic() {
        let set = add_ons(&["workbook"]);
        assert_eq!(quote(12_345, "Business", &set), quote(12_345, "Business", &set));
    }

    #[test]
    fn monotonic_in_words_and_add_ons() {
        let names = ["a", "b", "c", "d", "e", "f"];
        let word_steps = [0, 10_000, 10_001, 20_000, 20_001, 80_000];
        for niche in ["", "business", "real estate", "productivity"] {
            for n in 0..=names.len() {
                let set = add_ons(&names[..n]);
                let prices: Vec<f64> = word_steps
                    .iter()
                    .map(|&words| quote(words, niche, &set).adjusted_price)
                    .collect();
                assert!(prices.windows(2).all(|w| w[0] <= w[1]), "{niche}: {prices:?}");
            }
            for words in word_steps {
                let prices: Vec<f64> = (0..=names.len())
                    .map(|n| quote(words, niche, &add_ons(&names[..n])).adjusted_price)
                    .collect();
                assert!(prices.windows(2).all(|w| w[0] <= w[1]), "{niche}: {prices:?}");
            }
        }
    }

    #[test]
    fn niche_lookup_is_case_insensitive() {
        assert_eq!(niche_bonus("  REAL ESTATE "), 50.0);
        assert_eq!(niche_bonus("knitting"), 0.0);
    }
}
