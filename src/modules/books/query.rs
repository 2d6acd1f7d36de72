use shelf_db::Predicate;

/// Turn the optional `search` parameter into a listing predicate.
///
/// A blank term lists everything. Otherwise the term is matched as submitted;
/// ordering (newest first) is applied by the store.
pub fn build_listing(search: Option<&str>) -> Predicate {
    match search {
        Some(term) if !term.trim().is_empty() => Predicate::ContainsTerm(term.to_string()),
        _ => Predicate::MatchAll,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_term_matches_all() {
        assert_eq!(build_listing(None), Predicate::MatchAll);
        assert_eq!(build_listing(Some("")), Predicate::MatchAll);
        assert_eq!(build_listing(Some("  \t")), Predicate::MatchAll);
    }

    #[test]
    fn present_term_is_kept_verbatim() {
        assert_eq!(
            build_listing(Some("Go")),
            Predicate::ContainsTerm("Go".to_string())
        );
        assert_eq!(
            build_listing(Some("100% ")),
            Predicate::ContainsTerm("100% ".to_string())
        );
    }
}
