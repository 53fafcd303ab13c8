use std::collections::BTreeSet;

/// `(scraped ∪ to_add) \ to_remove`, deduplicated and sorted ascending.
pub fn build_final_list<S: AsRef<str>>(
    scraped: &[S],
    to_add: &[S],
    to_remove: &[S],
) -> Vec<String> {
    let removed = to_remove
        .iter()
        .map(AsRef::<str>::as_ref)
        .collect::<BTreeSet<&str>>();

    scraped
        .iter()
        .chain(to_add)
        .map(AsRef::<str>::as_ref)
        .filter(|entry| !removed.contains(entry))
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::build_final_list;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn merges_additions_and_drops_removals() {
        let merged = build_final_list(
            &strings(&["X.", "Y.", "Z."]),
            &strings(&["A.", "B.", "C.", "D."]),
            &strings(&["B."]),
        );
        assert_eq!(merged, vec!["A.", "C.", "D.", "X.", "Y.", "Z."]);
    }

    #[test]
    fn removing_an_absent_entry_changes_nothing() {
        let merged = build_final_list(&["X.", "Y.", "Z."], &["A.", "B."], &["F."]);
        assert_eq!(merged, vec!["A.", "B.", "X.", "Y.", "Z."]);
    }

    #[test]
    fn empty_inputs_are_fine() {
        assert_eq!(build_final_list(&[], &["A.", "B."], &[]), vec!["A.", "B."]);
        assert_eq!(build_final_list(&["X.", "Y."], &[], &[]), vec!["X.", "Y."]);
        assert!(build_final_list::<&str>(&[], &[], &[]).is_empty());
    }

    #[test]
    fn removal_wins_over_both_sources() {
        assert!(build_final_list(&["X."], &["X."], &["X."]).is_empty());
    }

    #[test]
    fn duplicates_collapse_and_order_is_case_sensitive() {
        let merged = build_final_list(&["b.", "B.", "b.", "a."], &["B."], &[]);
        assert_eq!(merged, vec!["B.", "a.", "b."]);
    }

    #[test]
    fn merging_is_idempotent() {
        let scraped = strings(&["Mar.", "Jan.", "Jan.", "Apr."]);
        let add = strings(&["X."]);
        let remove = strings(&["Mar."]);
        let first = build_final_list(&scraped, &add, &remove);
        let second = build_final_list(&scraped, &add, &remove);
        assert_eq!(first, second);
        assert_eq!(first, vec!["Apr.", "Jan.", "X."]);
    }
}
