//! # Random Fact Tests
//!
//! Checks that facts drawn through the state store never repeat before the
//! deck is exhausted and that the round restarts afterwards.

use cosmo_assistant::facts::{next_fact, FACT_COUNT};
use cosmo_assistant::localization::create_localization_manager;
use cosmo_assistant::storage::StateStore;
use std::collections::HashSet;
use tempfile::TempDir;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_repeats_until_deck_exhausted() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let localization = create_localization_manager().unwrap();

        let facts: HashSet<String> = (0..FACT_COUNT)
            .map(|_| next_fact(&store, &localization, 11, "ru").unwrap())
            .collect();
        assert_eq!(facts.len(), FACT_COUNT);
        assert_eq!(store.seen_facts(11).len(), FACT_COUNT);

        // Deck exhausted: the next draw starts a new round
        next_fact(&store, &localization, 11, "ru").unwrap();
        assert_eq!(store.seen_facts(11).len(), 1);
    }

    #[test]
    fn test_rounds_are_tracked_per_user() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let localization = create_localization_manager().unwrap();

        next_fact(&store, &localization, 1, "ru").unwrap();
        next_fact(&store, &localization, 1, "ru").unwrap();
        next_fact(&store, &localization, 2, "en").unwrap();

        assert_eq!(store.seen_facts(1).len(), 2);
        assert_eq!(store.seen_facts(2).len(), 1);
    }

    #[test]
    fn test_seen_facts_survive_restart() {
        let dir = TempDir::new().unwrap();
        let localization = create_localization_manager().unwrap();
        let first_round: Vec<usize> = {
            let store = StateStore::open(dir.path()).unwrap();
            for _ in 0..FACT_COUNT - 1 {
                next_fact(&store, &localization, 5, "ru").unwrap();
            }
            store.seen_facts(5)
        };

        let store = StateStore::open(dir.path()).unwrap();
        assert_eq!(store.seen_facts(5), first_round);

        // Only one unseen fact is left, so it must be the one drawn
        next_fact(&store, &localization, 5, "ru").unwrap();
        let seen: HashSet<usize> = store.seen_facts(5).into_iter().collect();
        assert_eq!(seen.len(), FACT_COUNT);
    }

    #[test]
    fn test_every_fact_is_translated() {
        let localization = create_localization_manager().unwrap();
        for language in ["ru", "en"] {
            for n in 1..=FACT_COUNT {
                let text =
                    localization.get_message_in_language(&format!("fact-{}", n), language, None);
                assert!(!text.starts_with("Missing"), "fact-{} missing in {}", n, language);
            }
        }
    }
}
