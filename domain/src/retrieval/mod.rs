//! Pure building blocks for tool retrieval: similarity math, whole-word
//! name matching and stable threshold/top-K ranking.

pub mod ranking;
pub mod similarity;

pub use ranking::{ScoredCandidate, rank, union_in_order};
pub use similarity::{cosine_similarity, mentions_name, normalize};
