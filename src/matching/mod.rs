//! Product matching: title normalization, similarity scoring and clustering

pub mod clustering;
pub mod normalizer;
pub mod similarity;

pub use clustering::{cluster_indices, group, grouping_stats, GroupingStats};
pub use normalizer::{extract_keywords, extract_specs, normalize, normalize_brand};
pub use similarity::{are_similar, similarity, token_sort_key, DEFAULT_SIMILARITY_THRESHOLD};
