//! Direct and multi-party barter chain discovery
//!
//! Items form a directed graph: an edge `x -> y` means the owner of `y`
//! would accept `x` in exchange for giving `y` away. Every simple cycle
//! whose owners are pairwise distinct is a closed barter chain.
//! The balance check is local to each edge (the receiver of `x` is the
//! giver of `y`), so it is applied while building the graph rather than
//! after enumeration.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::model::{
    BarterChain, BarterItem, BarterMatchResult, BarterPreference, BarterTransfer, MatchOptions,
};

/// Stop enumerating once this many candidate chains have been found
pub const MAX_CANDIDATE_CHAINS: usize = 10_000;
const FAIRNESS_WEIGHT: f64 = 0.7;
const LENGTH_WEIGHT: f64 = 0.3;
const LENGTH_PENALTY: f64 = 0.15;
const EPSILON: f64 = 1e-9;

struct Graph<'a> {
    items: Vec<&'a BarterItem>,
    /// `edges[x]` lists every `y` that `x` can be handed over for
    edges: Vec<Vec<usize>>,
    /// Tolerance of each item's owner
    tolerance: Vec<f64>,
}

impl<'a> Graph<'a> {
    fn build(
        items: &'a [BarterItem],
        preferences: &[BarterPreference],
        default_tolerance: f64,
    ) -> Self {
        let mut pool: Vec<&BarterItem> = items
            .iter()
            .filter(|i| i.is_available() && i.value().is_finite() && i.value() > 0.0)
            .collect();
        pool.sort_by(|a, b| a.id.cmp(&b.id));

        let prefs: HashMap<&str, &BarterPreference> =
            preferences.iter().map(|p| (p.user.as_str(), p)).collect();

        let tolerance: Vec<f64> = pool
            .iter()
            .map(|item| {
                prefs
                    .get(item.owner.as_str())
                    .map(|p| p.tolerance_or(default_tolerance))
                    .unwrap_or(default_tolerance)
            })
            .collect();

        let mut edges = vec![Vec::new(); pool.len()];
        for (x, given) in pool.iter().enumerate() {
            for (y, kept) in pool.iter().enumerate() {
                if given.owner == kept.owner {
                    continue;
                }
                // The owner of `kept` receives `given`
                let Some(pref) = prefs.get(kept.owner.as_str()) else {
                    continue;
                };
                if !pref.accepts(given) {
                    continue;
                }
                let gap = (given.value() - kept.value()).abs();
                if gap <= tolerance[y] * kept.value() + EPSILON {
                    edges[x].push(y);
                }
            }
        }

        Self {
            items: pool,
            edges,
            tolerance,
        }
    }

    /// Enumerate simple cycles up to `max_len`, each reported once,
    /// starting from its smallest index.
    fn cycles(&self, max_len: usize) -> Vec<Vec<usize>> {
        let mut found = Vec::new();
        let mut path = Vec::with_capacity(max_len);
        let mut owners: HashSet<&str> = HashSet::new();
        for start in 0..self.items.len() {
            path.push(start);
            owners.insert(self.items[start].owner.as_str());
            self.extend(start, max_len, &mut path, &mut owners, &mut found);
            owners.clear();
            path.clear();
            if found.len() >= MAX_CANDIDATE_CHAINS {
                tracing::warn!(
                    limit = MAX_CANDIDATE_CHAINS,
                    "barter chain enumeration truncated"
                );
                break;
            }
        }
        found
    }

    fn extend<'s>(
        &'s self,
        start: usize,
        max_len: usize,
        path: &mut Vec<usize>,
        owners: &mut HashSet<&'s str>,
        found: &mut Vec<Vec<usize>>,
    ) {
        if found.len() >= MAX_CANDIDATE_CHAINS {
            return;
        }
        let Some(&last) = path.last() else {
            return;
        };
        for &next in &self.edges[last] {
            if next == start {
                if path.len() >= 2 {
                    found.push(path.clone());
                }
                continue;
            }
            if next < start || path.len() >= max_len {
                continue;
            }
            let owner = self.items[next].owner.as_str();
            if owners.contains(owner) {
                continue;
            }
            path.push(next);
            owners.insert(owner);
            self.extend(start, max_len, path, owners, found);
            owners.remove(owner);
            path.pop();
        }
    }

    fn to_chain(&self, cycle: &[usize]) -> BarterChain {
        let k = cycle.len();
        let mut transfers = Vec::with_capacity(k);
        let mut max_relative_imbalance: f64 = 0.0;
        let mut max_tolerance_used: f64 = 0.0;

        for j in 0..k {
            let given = self.items[cycle[j]];
            let receiver_idx = cycle[(j + 1) % k];
            let receiver_item = self.items[receiver_idx];
            transfers.push(BarterTransfer {
                item_id: given.id.clone(),
                item_title: given.title.clone(),
                from: given.owner.clone(),
                to: receiver_item.owner.clone(),
                value: given.value(),
            });

            let relative = (given.value() - receiver_item.value()).abs() / receiver_item.value();
            max_relative_imbalance = max_relative_imbalance.max(relative);
            let tol = self.tolerance[receiver_idx];
            let used = if tol > 0.0 { relative / tol } else { 0.0 };
            max_tolerance_used = max_tolerance_used.max(used.min(1.0));
        }

        let fairness = 1.0 - max_tolerance_used;
        let length_pref = 1.0 / (1.0 + LENGTH_PENALTY * (k as f64 - 2.0));
        let total_value = transfers.iter().map(|t| t.value).sum();

        BarterChain {
            transfers,
            max_relative_imbalance,
            fairness,
            score: FAIRNESS_WEIGHT * fairness + LENGTH_WEIGHT * length_pref,
            total_value,
        }
    }
}

fn rank(a: &BarterChain, b: &BarterChain) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.len().cmp(&b.len()))
        .then_with(|| {
            b.total_value
                .partial_cmp(&a.total_value)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.item_ids().cmp(&b.item_ids()))
}

/// Find barter chains among `items`.
///
/// Only available items with a positive value take part. Users without a
/// preference accept nothing. An empty result means no chain closes within
/// tolerance.
pub fn find_chains(
    items: &[BarterItem],
    preferences: &[BarterPreference],
    options: &MatchOptions,
) -> BarterMatchResult {
    let max_len = options.max_chain_length.max(2);
    let graph = Graph::build(items, preferences, options.tolerance);
    let mut chains: Vec<BarterChain> = graph
        .cycles(max_len)
        .iter()
        .map(|cycle| graph.to_chain(cycle))
        .collect();
    chains.sort_by(rank);
    chains.truncate(options.limit);

    tracing::debug!(
        items = graph.items.len(),
        chains = chains.len(),
        max_len,
        "barter matching finished"
    );

    BarterMatchResult {
        chains,
        items_considered: graph.items.len(),
        tolerance: options.tolerance,
        max_chain_length: max_len,
    }
}

/// Re-check that a chain given as item ids still closes against the
/// current items and preferences. Returns the rebuilt chain when valid.
pub fn verify_chain(
    item_ids: &[String],
    items: &[BarterItem],
    preferences: &[BarterPreference],
    options: &MatchOptions,
) -> Option<BarterChain> {
    if item_ids.len() < 2 {
        return None;
    }
    let wanted: HashSet<&str> = item_ids.iter().map(String::as_str).collect();
    if wanted.len() != item_ids.len() {
        return None;
    }
    let subset: Vec<BarterItem> = items
        .iter()
        .filter(|i| wanted.contains(i.id.as_str()))
        .cloned()
        .collect();
    if subset.len() != item_ids.len() {
        return None;
    }
    let graph = Graph::build(&subset, preferences, options.tolerance);
    let index: HashMap<&str, usize> = graph
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| (item.id.as_str(), i))
        .collect();
    let cycle: Vec<usize> = item_ids
        .iter()
        .map(|id| index.get(id.as_str()).copied())
        .collect::<Option<_>>()?;

    let owners: HashSet<&str> = cycle.iter().map(|&i| graph.items[i].owner.as_str()).collect();
    if owners.len() != cycle.len() {
        return None;
    }
    let closes = (0..cycle.len()).all(|j| {
        let next = cycle[(j + 1) % cycle.len()];
        graph.edges[cycle[j]].contains(&next)
    });
    closes.then(|| graph.to_chain(&cycle))
}
