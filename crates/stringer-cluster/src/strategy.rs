//! Clustering strategies.
//!
//! Each strategy turns a batch of items plus a similarity oracle into raw
//! groups; size enforcement and singleton handling happen later in
//! post-processing. All four are deterministic given a fixed batch order and
//! a fixed oracle: every ordering they produce breaks ties by ascending id.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use stringer_core::{NewsItem, StrategyParams};
use stringer_vector::DynSimilarityOracle;

use crate::error::ClusterError;
use crate::unionfind::UnionFind;

/// Single-link clustering. Any pair at or above the threshold connects its
/// two items, and groups are the connected components of that graph.
///
/// Prone to chaining: one bridging pair merges two otherwise distinct
/// stories. The other strategies exist to trade recall against that.
pub async fn connected_components(
    items: &[NewsItem],
    oracle: &dyn DynSimilarityOracle,
    params: StrategyParams,
) -> Result<Vec<Vec<NewsItem>>, ClusterError> {
    let known: HashSet<Uuid> = items.iter().map(|item| item.id).collect();
    let lists = oracle
        .top_similar_many_boxed(items, params.candidate_limit)
        .await?;

    let mut sets = UnionFind::new();
    for item in items {
        sets.find(item.id);
    }
    for (item, neighbors) in items.iter().zip(&lists) {
        for neighbor in neighbors {
            // Ids from outside the batch (shared index) never join a group.
            if known.contains(&neighbor.id) {
                sets.union(item.id, neighbor.id);
            }
        }
    }
    Ok(components_in_batch_order(items, &mut sets))
}

/// Greedy agglomeration around fresh seeds. A candidate joins only while its
/// *average* similarity to every current member stays at or above the
/// threshold; growth stops at `max_cluster_size`.
pub async fn greedy_average(
    items: &[NewsItem],
    oracle: &dyn DynSimilarityOracle,
    params: StrategyParams,
) -> Result<Vec<Vec<NewsItem>>, ClusterError> {
    greedy_grow(items, oracle, params, Linkage::Average).await
}

/// Like [`greedy_average`], but every member pair must clear the threshold
/// individually. Strictest of the four: smaller, purer clusters and more
/// singletons.
pub async fn greedy_min(
    items: &[NewsItem],
    oracle: &dyn DynSimilarityOracle,
    params: StrategyParams,
) -> Result<Vec<Vec<NewsItem>>, ClusterError> {
    greedy_grow(items, oracle, params, Linkage::Min).await
}

/// Mutual nearest neighbors. Two items connect only when each appears in the
/// other's threshold-filtered top-`candidate_limit` set; groups are the
/// connected components of that stricter graph.
///
/// A neighbor pushed out of the set by the size cap does not count toward
/// mutuality, so a small `candidate_limit` makes this strategy stricter.
pub async fn mutual_k(
    items: &[NewsItem],
    oracle: &dyn DynSimilarityOracle,
    params: StrategyParams,
) -> Result<Vec<Vec<NewsItem>>, ClusterError> {
    let lists = oracle
        .top_similar_many_boxed(items, params.candidate_limit)
        .await?;

    let mut neighbor_sets: HashMap<Uuid, HashSet<Uuid>> = HashMap::with_capacity(items.len());
    for (item, neighbors) in items.iter().zip(&lists) {
        neighbor_sets.insert(item.id, neighbors.iter().map(|n| n.id).collect());
    }

    let mut sets = UnionFind::new();
    for item in items {
        sets.find(item.id);
    }
    for (item, neighbors) in items.iter().zip(&lists) {
        for neighbor in neighbors {
            // Only in-batch ids have a neighbor set of their own, so this
            // lookup checks batch membership and mutuality at once.
            if let Some(theirs) = neighbor_sets.get(&neighbor.id) {
                if theirs.contains(&item.id) {
                    sets.union(item.id, neighbor.id);
                }
            }
        }
    }
    Ok(components_in_batch_order(items, &mut sets))
}

// ===== Greedy internals =====

#[derive(Clone, Copy)]
enum Linkage {
    Average,
    Min,
}

async fn greedy_grow(
    items: &[NewsItem],
    oracle: &dyn DynSimilarityOracle,
    params: StrategyParams,
    linkage: Linkage,
) -> Result<Vec<Vec<NewsItem>>, ClusterError> {
    let by_id: HashMap<Uuid, &NewsItem> = items.iter().map(|item| (item.id, item)).collect();
    let mut assigned: HashSet<Uuid> = HashSet::with_capacity(items.len());
    let mut groups: Vec<Vec<NewsItem>> = Vec::new();

    // Strictly sequential: each admission depends on the groups formed so
    // far, so there is nothing to fetch ahead.
    for seed in seeds_newest_first(items) {
        if assigned.contains(&seed.id) {
            continue;
        }
        assigned.insert(seed.id);
        let mut group: Vec<NewsItem> = vec![seed.clone()];

        let neighbors = oracle
            .top_similar_boxed(seed, params.candidate_limit)
            .await?;
        for neighbor in neighbors {
            if group.len() >= params.max_cluster_size {
                break;
            }
            if assigned.contains(&neighbor.id) {
                continue;
            }
            let candidate = match by_id.get(&neighbor.id) {
                Some(candidate) => *candidate,
                // Id from outside the batch.
                None => continue,
            };
            if admits(linkage, oracle, candidate, &group, params.similarity_threshold) {
                assigned.insert(candidate.id);
                group.push(candidate.clone());
            }
        }
        groups.push(group);
    }
    Ok(groups)
}

fn admits(
    linkage: Linkage,
    oracle: &dyn DynSimilarityOracle,
    candidate: &NewsItem,
    members: &[NewsItem],
    threshold: f64,
) -> bool {
    match linkage {
        Linkage::Average => {
            let total: f64 = members
                .iter()
                .map(|member| oracle.score(candidate, member))
                .sum();
            total / members.len() as f64 >= threshold
        }
        Linkage::Min => members
            .iter()
            .all(|member| oracle.score(candidate, member) >= threshold),
    }
}

// ===== Shared helpers =====

/// Seed visit order: freshest first, ties by ascending id.
fn seeds_newest_first(items: &[NewsItem]) -> Vec<&NewsItem> {
    let mut seeds: Vec<&NewsItem> = items.iter().collect();
    seeds.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    seeds
}

/// Materialize union-find components as groups, ordered by each component's
/// first appearance in the batch.
fn components_in_batch_order(items: &[NewsItem], sets: &mut UnionFind) -> Vec<Vec<NewsItem>> {
    let mut groups: Vec<Vec<NewsItem>> = Vec::new();
    let mut slots: HashMap<Uuid, usize> = HashMap::new();
    for item in items {
        let root = sets.find(item.id);
        let slot = *slots.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(item.clone());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use stringer_vector::MockOracle;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    /// Item `n`, published `minutes_ago` before the shared base time.
    fn make_item(n: u128, minutes_ago: i64) -> NewsItem {
        NewsItem {
            id: Uuid::from_u128(n),
            title: format!("item {}", n),
            embedding: Some(vec![1.0, 0.0]),
            published_at: base_time() - Duration::minutes(minutes_ago),
        }
    }

    fn params(threshold: f64, max: usize, limit: usize) -> StrategyParams {
        StrategyParams {
            similarity_threshold: threshold,
            min_cluster_size: 1,
            max_cluster_size: max,
            candidate_limit: limit,
        }
    }

    fn id_sets(groups: &[Vec<NewsItem>]) -> Vec<HashSet<Uuid>> {
        groups
            .iter()
            .map(|group| group.iter().map(|item| item.id).collect())
            .collect()
    }

    fn group_of(groups: &[Vec<NewsItem>], member: u128) -> HashSet<Uuid> {
        let member = Uuid::from_u128(member);
        id_sets(groups)
            .into_iter()
            .find(|set| set.contains(&member))
            .unwrap_or_else(|| panic!("no group contains {}", member))
    }

    fn ids(ns: &[u128]) -> HashSet<Uuid> {
        ns.iter().map(|n| Uuid::from_u128(*n)).collect()
    }

    /// Three near-duplicates plus two unrelated items; every strategy should
    /// produce one trio and two singletons.
    fn duplicate_trio_fixture() -> (Vec<NewsItem>, MockOracle) {
        let items: Vec<NewsItem> = (1..=5).map(|n| make_item(n, n as i64)).collect();
        let mut oracle = MockOracle::new(0.68);
        for (a, b) in [(1u128, 2u128), (1, 3), (2, 3)] {
            oracle = oracle.with_score(Uuid::from_u128(a), Uuid::from_u128(b), 0.9);
        }
        for a in 1u128..=3 {
            for b in 4u128..=5 {
                oracle = oracle.with_score(Uuid::from_u128(a), Uuid::from_u128(b), 0.1);
            }
        }
        oracle = oracle.with_score(Uuid::from_u128(4), Uuid::from_u128(5), 0.1);
        (items, oracle)
    }

    #[tokio::test]
    async fn test_near_duplicates_cluster_under_every_strategy() {
        let (items, oracle) = duplicate_trio_fixture();
        let p = params(0.68, 20, 10);

        let outcomes = [
            connected_components(&items, &oracle, p).await.unwrap(),
            greedy_average(&items, &oracle, p).await.unwrap(),
            greedy_min(&items, &oracle, p).await.unwrap(),
            mutual_k(&items, &oracle, p).await.unwrap(),
        ];

        for groups in &outcomes {
            assert_eq!(group_of(groups, 1), ids(&[1, 2, 3]));
            assert_eq!(group_of(groups, 4), ids(&[4]));
            assert_eq!(group_of(groups, 5), ids(&[5]));
        }
    }

    /// A-B and B-C clear the threshold while A-C does not. Single-link
    /// chains all three; the stricter strategies refuse the bridge.
    #[tokio::test]
    async fn test_chained_pair_behavior_differs_by_strategy() {
        let items: Vec<NewsItem> = (1..=3).map(|n| make_item(n, n as i64)).collect();
        let oracle = MockOracle::new(0.68)
            .with_score(Uuid::from_u128(1), Uuid::from_u128(2), 0.7)
            .with_score(Uuid::from_u128(2), Uuid::from_u128(3), 0.7)
            .with_score(Uuid::from_u128(1), Uuid::from_u128(3), 0.3);
        let p = params(0.68, 20, 10);

        let chained = connected_components(&items, &oracle, p).await.unwrap();
        assert_eq!(group_of(&chained, 1), ids(&[1, 2, 3]));

        // Seed 1 is freshest; it claims 2, and 3 is left to seed alone.
        let strict = greedy_min(&items, &oracle, p).await.unwrap();
        assert_eq!(group_of(&strict, 1), ids(&[1, 2]));
        assert_eq!(group_of(&strict, 3), ids(&[3]));

        // With room for both neighbors the mutual graph keeps the chain.
        let mutual_wide = mutual_k(&items, &oracle, p).await.unwrap();
        assert_eq!(group_of(&mutual_wide, 1), ids(&[1, 2, 3]));

        // Top-1 sets break the chain: 2's single slot goes to 1 (tie on
        // score, lower id wins), so 2-3 is no longer mutual.
        let mutual_narrow = mutual_k(&items, &oracle, params(0.68, 20, 1))
            .await
            .unwrap();
        assert_eq!(group_of(&mutual_narrow, 1), ids(&[1, 2]));
        assert_eq!(group_of(&mutual_narrow, 3), ids(&[3]));
    }

    /// Average linkage tolerates one weak pair that minimum linkage rejects.
    #[tokio::test]
    async fn test_average_admits_where_min_rejects() {
        let items: Vec<NewsItem> = (1..=3).map(|n| make_item(n, n as i64)).collect();
        let oracle = MockOracle::new(0.68)
            .with_score(Uuid::from_u128(1), Uuid::from_u128(2), 0.9)
            .with_score(Uuid::from_u128(1), Uuid::from_u128(3), 0.8)
            .with_score(Uuid::from_u128(2), Uuid::from_u128(3), 0.6);
        let p = params(0.68, 20, 10);

        // Candidate 3 against {1, 2}: average (0.8 + 0.6) / 2 = 0.7 passes,
        // minimum 0.6 does not.
        let averaged = greedy_average(&items, &oracle, p).await.unwrap();
        assert_eq!(group_of(&averaged, 1), ids(&[1, 2, 3]));

        let strict = greedy_min(&items, &oracle, p).await.unwrap();
        assert_eq!(group_of(&strict, 1), ids(&[1, 2]));
        assert_eq!(group_of(&strict, 3), ids(&[3]));
    }

    /// The freshest item seeds first and claims its neighbors before older
    /// items get a turn.
    #[tokio::test]
    async fn test_greedy_seeds_newest_first() {
        let items = vec![
            make_item(1, 60), // oldest
            make_item(2, 0),  // newest, seeds first
            make_item(3, 30),
        ];
        let oracle = MockOracle::new(0.68)
            .with_score(Uuid::from_u128(1), Uuid::from_u128(2), 0.9)
            .with_score(Uuid::from_u128(2), Uuid::from_u128(3), 0.95)
            .with_score(Uuid::from_u128(1), Uuid::from_u128(3), 0.2);

        // Room for one admission only: the newest seed keeps its best
        // neighbor and the oldest item ends up alone.
        let groups = greedy_average(&items, &oracle, params(0.68, 2, 10))
            .await
            .unwrap();
        assert_eq!(group_of(&groups, 2), ids(&[2, 3]));
        assert_eq!(group_of(&groups, 1), ids(&[1]));
    }

    #[tokio::test]
    async fn test_greedy_stops_at_max_cluster_size() {
        let items: Vec<NewsItem> = (1..=6).map(|n| make_item(n, n as i64)).collect();
        let mut oracle = MockOracle::new(0.68);
        for a in 1u128..=6 {
            for b in (a + 1)..=6 {
                oracle = oracle.with_score(Uuid::from_u128(a), Uuid::from_u128(b), 0.9);
            }
        }

        let groups = greedy_min(&items, &oracle, params(0.68, 3, 10))
            .await
            .unwrap();
        // Seed 1 fills up with 2 and 3 (ties break by id), then the next
        // free seed takes the rest.
        assert_eq!(group_of(&groups, 1), ids(&[1, 2, 3]));
        assert_eq!(group_of(&groups, 4), ids(&[4, 5, 6]));
    }

    #[tokio::test]
    async fn test_mutual_k_one_way_is_not_enough() {
        let items: Vec<NewsItem> = (1..=3).map(|n| make_item(n, n as i64)).collect();
        let oracle = MockOracle::new(0.68)
            .with_score(Uuid::from_u128(1), Uuid::from_u128(2), 0.9)
            .with_score(Uuid::from_u128(2), Uuid::from_u128(3), 0.95);

        // 1 wants 2, but 2's single slot belongs to 3.
        let groups = mutual_k(&items, &oracle, params(0.68, 20, 1))
            .await
            .unwrap();
        assert_eq!(group_of(&groups, 1), ids(&[1]));
        assert_eq!(group_of(&groups, 2), ids(&[2, 3]));
    }

    /// Neighbor ids the oracle knows but the batch does not are skipped by
    /// every strategy.
    #[tokio::test]
    async fn test_foreign_neighbor_ids_are_skipped() {
        let items: Vec<NewsItem> = (1..=2).map(|n| make_item(n, n as i64)).collect();
        let oracle = MockOracle::new(0.68)
            .with_score(Uuid::from_u128(1), Uuid::from_u128(2), 0.7)
            .with_score(Uuid::from_u128(1), Uuid::from_u128(99), 0.9);
        let p = params(0.68, 20, 10);

        let outcomes = [
            connected_components(&items, &oracle, p).await.unwrap(),
            greedy_average(&items, &oracle, p).await.unwrap(),
            greedy_min(&items, &oracle, p).await.unwrap(),
            mutual_k(&items, &oracle, p).await.unwrap(),
        ];
        for groups in &outcomes {
            assert_eq!(group_of(groups, 1), ids(&[1, 2]));
            let total: usize = groups.iter().map(|g| g.len()).sum();
            assert_eq!(total, 2);
        }
    }

    #[tokio::test]
    async fn test_strategies_are_deterministic() {
        let (items, oracle) = duplicate_trio_fixture();
        let p = params(0.68, 20, 10);

        let reference = [
            id_sets(&connected_components(&items, &oracle, p).await.unwrap()),
            id_sets(&greedy_average(&items, &oracle, p).await.unwrap()),
            id_sets(&greedy_min(&items, &oracle, p).await.unwrap()),
            id_sets(&mutual_k(&items, &oracle, p).await.unwrap()),
        ];
        for _ in 0..5 {
            let again = [
                id_sets(&connected_components(&items, &oracle, p).await.unwrap()),
                id_sets(&greedy_average(&items, &oracle, p).await.unwrap()),
                id_sets(&greedy_min(&items, &oracle, p).await.unwrap()),
                id_sets(&mutual_k(&items, &oracle, p).await.unwrap()),
            ];
            assert_eq!(reference, again);
        }
    }

    #[tokio::test]
    async fn test_empty_batch_yields_no_groups() {
        let oracle = MockOracle::new(0.68);
        let p = params(0.68, 20, 10);
        assert!(connected_components(&[], &oracle, p).await.unwrap().is_empty());
        assert!(greedy_average(&[], &oracle, p).await.unwrap().is_empty());
        assert!(greedy_min(&[], &oracle, p).await.unwrap().is_empty());
        assert!(mutual_k(&[], &oracle, p).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_components_emitted_in_batch_order() {
        let items = vec![
            make_item(3, 0),
            make_item(1, 1),
            make_item(2, 2),
        ];
        let oracle = MockOracle::new(0.68)
            .with_score(Uuid::from_u128(1), Uuid::from_u128(2), 0.9);

        let groups = connected_components(&items, &oracle, params(0.68, 20, 10))
            .await
            .unwrap();
        // Item 3 appears first in the batch, so its singleton leads.
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0][0].id, Uuid::from_u128(3));
        assert_eq!(group_of(&groups, 1), ids(&[1, 2]));
    }
}
