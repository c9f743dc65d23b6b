//! Shapes raw strategy groups into the final clusters.

use std::collections::HashSet;

use uuid::Uuid;

use stringer_core::{Cluster, NewsItem, StrategyParams};

/// Apply size policy to raw groups and guarantee completeness.
///
/// 1. Sort each group newest first (ties by ascending id) and truncate to
///    `max_cluster_size`; the oldest excess members fall out of the group.
/// 2. Drop groups smaller than `min_cluster_size`.
/// 3. Emit every input item not placed by then as a singleton, in batch
///    order. This rescues members of dropped groups, truncation leftovers,
///    and anything a strategy failed to place, so no item is silently lost.
///
/// Output order: surviving groups in strategy order, then safety-net
/// singletons in batch order.
pub fn post_process(
    raw_groups: Vec<Vec<NewsItem>>,
    all_items: &[NewsItem],
    params: StrategyParams,
) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut placed: HashSet<Uuid> = HashSet::with_capacity(all_items.len());

    for mut group in raw_groups {
        group.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        group.truncate(params.max_cluster_size);
        if group.len() < params.min_cluster_size {
            continue;
        }
        for item in &group {
            placed.insert(item.id);
        }
        clusters.push(Cluster::from_items(group));
    }

    for item in all_items {
        if !placed.contains(&item.id) {
            clusters.push(Cluster::from_items(vec![item.clone()]));
        }
    }
    clusters
}
