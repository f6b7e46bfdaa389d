//! Greedy single-pass grouping of listings that describe the same product

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::similarity::{key_similarity, token_sort_key};
use crate::models::{Listing, ProductGroup};

/// Partition `titles` into groups of indices.
///
/// Each unassigned title becomes the anchor of a new group and pulls in every
/// later unassigned title whose similarity to the *anchor* reaches
/// `threshold`. Membership is therefore not transitive: if A~B and B~C but
/// not A~C, C only joins A's group when it is similar to A itself. Groups are
/// ordered by anchor position and members keep their input order.
pub fn cluster_indices<S: AsRef<str>>(titles: &[S], threshold: f64) -> Vec<Vec<usize>> {
    let keys: Vec<String> = titles.iter().map(|t| token_sort_key(t.as_ref())).collect();
    let mut assigned = vec![false; keys.len()];
    let mut clusters = Vec::new();

    for i in 0..keys.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let mut cluster = vec![i];

        for j in (i + 1)..keys.len() {
            if !assigned[j] && key_similarity(&keys[i], &keys[j]) >= threshold {
                assigned[j] = true;
                cluster.push(j);
            }
        }

        clusters.push(cluster);
    }

    clusters
}

/// Group listings by title similarity. Members keep input order; call
/// [`ProductGroup::sort_by_price`] for price order.
pub fn group(listings: Vec<Listing>, threshold: f64) -> Vec<ProductGroup> {
    let clusters = {
        let names: Vec<&str> = listings.iter().map(Listing::name).collect();
        cluster_indices(&names, threshold)
    };

    let listing_count = listings.len();
    let mut slots: Vec<Option<Listing>> = listings.into_iter().map(Some).collect();
    let mut groups = Vec::with_capacity(clusters.len());

    for cluster in clusters {
        let mut members = cluster.into_iter().filter_map(|idx| slots[idx].take());
        if let Some(anchor) = members.next() {
            let mut group = ProductGroup::new(anchor);
            for listing in members {
                group.push(listing);
            }
            groups.push(group);
        }
    }

    debug!(
        "Grouped {} listings into {} groups",
        listing_count,
        groups.len()
    );

    groups
}

/// Summary of a grouping pass
#[derive(Debug, Serialize)]
pub struct GroupingStats {
    pub listing_count: usize,
    pub group_count: usize,
    pub largest_group: usize,
    pub cross_source_groups: usize,
    pub source_counts: HashMap<String, usize>,
}

pub fn grouping_stats(groups: &[ProductGroup]) -> GroupingStats {
    let mut source_counts = HashMap::new();
    let mut cross_source_groups = 0;

    for group in groups {
        let first_source = group.anchor().source();
        if group.listings().iter().any(|l| l.source() != first_source) {
            cross_source_groups += 1;
        }
        for listing in group.listings() {
            *source_counts.entry(listing.source().to_string()).or_insert(0) += 1;
        }
    }

    GroupingStats {
        listing_count: groups.iter().map(ProductGroup::len).sum(),
        group_count: groups.len(),
        largest_group: groups.iter().map(ProductGroup::len).max().unwrap_or(0),
        cross_source_groups,
        source_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::similarity::DEFAULT_SIMILARITY_THRESHOLD;

    fn create_test_listing(id: &str, name: &str, price: f64, source: &str) -> Listing {
        Listing::new(id, name, price, source, format!("https://test.com/{}", id)).unwrap()
    }

    #[test]
    fn test_group_empty_list() {
        assert!(group(Vec::new(), DEFAULT_SIMILARITY_THRESHOLD).is_empty());
    }

    #[test]
    fn test_group_single_listing() {
        let only = create_test_listing("1", "Test Product", 100.0, "Test");
        let groups = group(vec![only.clone()], DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].listings(), &[only]);
    }

    #[test]
    fn test_group_similar_listings() {
        let listings = vec![
            create_test_listing("1", "Notebook Dell Inspiron 15 i5 8GB", 2999.90, "Mercado Livre"),
            create_test_listing("2", "DELL INSPIRON 15 NOTEBOOK i5 8GB RAM", 3199.90, "Amazon"),
            create_test_listing("3", "iPhone 13 128GB", 4999.90, "Shopee"),
        ];

        let groups = group(listings, 70.0);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].len(), 1);
        assert_eq!(groups[0].anchor().id(), "1");
        assert_eq!(groups[1].anchor().id(), "3");
    }

    #[test]
    fn test_groups_follow_anchor_order() {
        let titles = ["Mouse Gamer", "Teclado Mecanico", "Mouse Gamer RGB", "Teclado Mecanico ABNT2"];
        let clusters = cluster_indices(&titles, 60.0);
        assert_eq!(clusters, vec![vec![0, 2], vec![1, 3]]);
    }

    #[test]
    fn test_membership_is_anchored_not_transitive() {
        // b is close to both a and c, but a and c are far apart.
        let a = "aaaa bbbb";
        let b = "aaaa bbbb cccc";
        let c = "aaaa bbbb cccc dddd";
        let threshold = 60.0;
        assert!(key_similarity(&token_sort_key(a), &token_sort_key(b)) >= threshold);
        assert!(key_similarity(&token_sort_key(b), &token_sort_key(c)) >= threshold);
        assert!(key_similarity(&token_sort_key(a), &token_sort_key(c)) < threshold);

        let clusters = cluster_indices(&[a, b, c], threshold);
        assert_eq!(clusters, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_every_index_assigned_once() {
        let titles = ["a b", "b a", "c", "a b c", "d", "c"];
        let clusters = cluster_indices(&titles, 70.0);
        let mut seen: Vec<usize> = clusters.into_iter().flatten().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..titles.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_unrelated_non_latin_titles_stay_apart() {
        let listings = vec![
            create_test_listing("1", "日本製 ノートパソコン", 3500.0, "Amazon"),
            create_test_listing("2", "中国 手机", 1200.0, "AliExpress"),
            create_test_listing("3", "!!!", 10.0, "Shopee"),
        ];

        let groups = group(listings, 70.0);
        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| g.len() == 1));
        assert_eq!(grouping_stats(&groups).cross_source_groups, 0);
    }

    #[test]
    fn test_grouping_stats() {
        let listings = vec![
            create_test_listing("1", "Notebook Dell Inspiron 15 i5 8GB", 2999.90, "Mercado Livre"),
            create_test_listing("2", "DELL INSPIRON 15 NOTEBOOK i5 8GB RAM", 3199.90, "Amazon"),
            create_test_listing("3", "iPhone 13 128GB", 4999.90, "Shopee"),
        ];
        let stats = grouping_stats(&group(listings, 70.0));
        assert_eq!(stats.listing_count, 3);
        assert_eq!(stats.group_count, 2);
        assert_eq!(stats.largest_group, 2);
        assert_eq!(stats.cross_source_groups, 1);
        assert_eq!(stats.source_counts["Amazon"], 1);
    }
}
