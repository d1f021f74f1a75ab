use rand::seq::SliceRandom;

/// Returns `candidates` unchanged if it already fits within `k`; otherwise a
/// uniform-at-random, duplicate-free subset of size `k`.
pub(crate) fn random_subset(candidates: &[String], k: usize) -> Vec<String> {
    if candidates.len() <= k {
        return candidates.to_vec();
    }
    let mut shuffled = candidates.to_vec();
    shuffled.shuffle(&mut rand::thread_rng());
    shuffled.truncate(k);
    shuffled
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn returns_candidates_unchanged_when_already_small_enough() {
        let candidates = vec!["a".to_owned(), "b".to_owned()];
        assert_eq!(random_subset(&candidates, 5), candidates);
    }

    #[test]
    fn truncates_to_k_without_duplicates() {
        let candidates: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        let subset = random_subset(&candidates, 10);
        assert_eq!(subset.len(), 10);
        let unique: HashSet<&String> = subset.iter().collect();
        assert_eq!(unique.len(), 10);
        for item in &subset {
            assert!(candidates.contains(item));
        }
    }
}
