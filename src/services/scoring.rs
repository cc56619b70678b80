use crate::models::{PreferenceProfile, Rankable, Scored};

/// Maximum number of products shown on the "my store" page
pub const STORE_LIMIT: usize = 24;

/// Overlap score: the sum of the profile's counts for the item's keywords
pub fn score<T: Rankable>(item: &T, profile: &PreferenceProfile) -> u64 {
    item.keywords().iter().map(|k| profile.count(k)).sum()
}

/// Orders items by descending score, ties by ascending tie-break key
///
/// Every item is kept, including those scoring 0.
pub fn rank<T: Rankable + Clone>(items: &[T], profile: &PreferenceProfile) -> Vec<Scored<T>> {
    let mut scored: Vec<Scored<T>> = items
        .iter()
        .map(|item| Scored {
            score: score(item, profile),
            item: item.clone(),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.item.tie_break_key().cmp(b.item.tie_break_key()))
    });
    scored
}

/// Ranking for the "my store" view: matching items only, at most `limit`
pub fn rank_for_store<T: Rankable + Clone>(
    items: &[T],
    profile: &PreferenceProfile,
    limit: usize,
) -> Vec<Scored<T>> {
    let mut ranked = rank(items, profile);
    ranked.retain(|s| s.score > 0);
    ranked.truncate(limit);
    ranked
}
