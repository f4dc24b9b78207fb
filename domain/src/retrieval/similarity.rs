//! Vector similarity and name matching used by embedding retrieval.

use crate::core::string::words;

/// Cosine similarity of two vectors; `0.0` when either has zero norm.
///
/// Vectors of different lengths are compared over their common prefix.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let (a, b) = (&a[..len], &b[..len]);
    let dot = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum::<f32>();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Scale a vector to unit length in place.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Case-insensitive whole-word match of `name` inside `text`.
///
/// Multi-word names must appear as a contiguous run of words, so
/// "Create Tool" matches "please create tool now" but "Echo" does not match
/// "echoes".
pub fn mentions_name(text: &str, name: &str) -> bool {
    let needle: Vec<String> = words(name).collect();
    if needle.is_empty() {
        return false;
    }
    let haystack: Vec<String> = words(text).collect();
    haystack.windows(needle.len()).any(|window| window == needle.as_slice())
}
