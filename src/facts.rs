//! Random skincare facts without repeats until the whole deck was shown.

use rand::Rng;
use tracing::debug;

use crate::errors::AppResult;
use crate::localization::LocalizationManager;
use crate::storage::StateStore;

/// Number of facts in every locale bundle (`fact-1` .. `fact-12`)
pub const FACT_COUNT: usize = 12;

/// Localization key of the fact at `index`
pub fn fact_key(index: usize) -> String {
    format!("fact-{}", index + 1)
}

/// Pick an index the user has not seen in the current round and mark it seen
///
/// Once every index in `0..deck_size` has been seen the round starts over.
pub fn pick_fact<R: Rng + ?Sized>(seen: &mut Vec<usize>, deck_size: usize, rng: &mut R) -> usize {
    seen.retain(|&index| index < deck_size);

    let mut unseen: Vec<usize> = (0..deck_size).filter(|i| !seen.contains(i)).collect();
    if unseen.is_empty() {
        seen.clear();
        unseen = (0..deck_size).collect();
    }

    let index = unseen[rng.random_range(0..unseen.len())];
    seen.push(index);
    index
}

/// Draw the next fact for a user and persist the updated round
pub fn next_fact(
    store: &StateStore,
    localization: &LocalizationManager,
    user_id: i64,
    language: &str,
) -> AppResult<String> {
    let index = store.with_seen_facts(user_id, |seen| {
        pick_fact(seen, FACT_COUNT, &mut rand::rng())
    })?;

    debug!(user_id = %user_id, fact = index + 1, "Picked fact");

    let title = localization.get_message_in_language("fact-title", language, None);
    let fact = localization.get_message_in_language(&fact_key(index), language, None);
    Ok(format!("{}\n{}", title, fact))
}
