//! Exception keyword matching
//!
//! Exception keywords route alternate broadcasts ("Prime Vision",
//! "ManningCast", language feeds) to special handling. Matching is a
//! lowercase substring test against the raw stream name, and the first
//! variant of a keyword group is the canonical name used for grouping.

use crate::models::{ExceptionKeyword, KeywordBehavior};

/// The keyword a stream matched, with its canonical form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordHit {
    pub keyword_id: i64,
    pub canonical: String,
    pub behavior: KeywordBehavior,
}

/// First keyword group whose any variant appears in the stream name
pub fn check_exception_keyword(
    stream_name: &str,
    keywords: &[ExceptionKeyword],
) -> Option<KeywordHit> {
    if stream_name.is_empty() {
        return None;
    }
    let lower = stream_name.to_lowercase();

    for keyword in keywords {
        for variant in &keyword.keywords {
            if !variant.is_empty() && lower.contains(variant.as_str()) {
                return Some(KeywordHit {
                    keyword_id: keyword.id,
                    canonical: keyword.canonical().unwrap_or(variant).to_string(),
                    behavior: keyword.behavior,
                });
            }
        }
    }
    None
}

/// Parse a comma-separated variants string into normalized keywords
pub fn parse_keywords_string(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|variant| variant.trim().to_lowercase())
        .filter(|variant| !variant.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyword(id: i64, raw: &str, behavior: KeywordBehavior) -> ExceptionKeyword {
        ExceptionKeyword {
            id,
            keywords: parse_keywords_string(raw),
            behavior,
        }
    }

    #[test]
    fn any_variant_matches_with_first_as_canonical() {
        let keywords = vec![keyword(1, "Prime Vision, Primevision", KeywordBehavior::Separate)];
        let hit =
            check_exception_keyword("NFL: Chiefs vs Raiders (Primevision)", &keywords).unwrap();
        assert_eq!(hit.canonical, "prime vision");
        assert_eq!(hit.behavior, KeywordBehavior::Separate);
    }

    #[test]
    fn no_match_returns_none() {
        let keywords = vec![keyword(1, "ManningCast", KeywordBehavior::Consolidate)];
        assert!(check_exception_keyword("NFL: Chiefs vs Raiders", &keywords).is_none());
    }

    #[test]
    fn first_group_in_order_wins() {
        let keywords = vec![
            keyword(1, "manningcast", KeywordBehavior::Consolidate),
            keyword(2, "cast", KeywordBehavior::Separate),
        ];
        let hit =
            check_exception_keyword("Chiefs vs Raiders ManningCast", &keywords).unwrap();
        assert_eq!(hit.keyword_id, 1);
    }

    #[test]
    fn parse_trims_and_lowercases() {
        assert_eq!(
            parse_keywords_string(" Prime Vision , Primevision ,"),
            vec!["prime vision".to_string(), "primevision".to_string()]
        );
    }
}
