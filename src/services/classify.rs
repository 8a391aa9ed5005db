// src/services/classify.rs

//! Keyword classification of document titles into election categories.

use crate::models::Category;

/// Ordered `(category, keywords)` rules; the first rule with a keyword
/// contained in the lower-cased title wins.
///
/// Primaries come first: `maire` is a substring of `primaire` and titles of
/// primaries usually also mention the presidential election.
pub const CATEGORY_RULES: &[(Category, &[&str])] = &[
    (Category::Prim, &["primaire", "prim"]),
    (
        Category::Pres,
        &["présidentiel", "presidentiel", "président", "president"],
    ),
    (Category::Mun, &["municipal", "mairie", "maire"]),
    (Category::Leg, &["législati", "legislati", "député", "depute"]),
];

/// Classify a document title. Pure and deterministic.
pub fn categorize(name: &str) -> Option<Category> {
    let lowered = name.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(category, _)| *category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_wins_over_presidential() {
        assert_eq!(
            categorize("Primaire présidentielle 2027"),
            Some(Category::Prim)
        );
    }

    #[test]
    fn primary_wins_over_municipal_substring() {
        // "primaire" contains "maire"
        assert_eq!(categorize("Sondage primaire écologiste"), Some(Category::Prim));
    }

    #[test]
    fn each_category_is_recognized() {
        assert_eq!(
            categorize("Notice - Élection présidentielle 2022 - vague 3"),
            Some(Category::Pres)
        );
        assert_eq!(categorize("Municipales Paris 2020"), Some(Category::Mun));
        assert_eq!(categorize("Élection du maire de Lyon"), Some(Category::Mun));
        assert_eq!(categorize("Élections législatives 2024"), Some(Category::Leg));
        assert_eq!(categorize("Intentions de vote députés"), Some(Category::Leg));
    }

    #[test]
    fn matching_ignores_case() {
        assert_eq!(categorize("PRÉSIDENTIELLE 2017"), Some(Category::Pres));
        assert_eq!(categorize("LEGISLATIVES"), Some(Category::Leg));
    }

    #[test]
    fn unmatched_titles_have_no_category() {
        assert_eq!(categorize("Élections européennes 2019"), None);
        assert_eq!(categorize(""), None);
    }

    #[test]
    fn rule_order_is_fixed() {
        let order: Vec<Category> = CATEGORY_RULES.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            order,
            vec![Category::Prim, Category::Pres, Category::Mun, Category::Leg]
        );
    }
}
