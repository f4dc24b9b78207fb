//! Threshold and top-K selection over scored candidates.

/// A candidate with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub name: String,
    pub score: f32,
}

/// Keep candidates scoring at or above `threshold`, sort them by score
/// descending and truncate to `top_k`.
///
/// Input order is registry order; the sort is stable so ties keep it.
pub fn rank(candidates: Vec<ScoredCandidate>, threshold: f32, top_k: usize) -> Vec<ScoredCandidate> {
    let mut kept: Vec<ScoredCandidate> = candidates
        .into_iter()
        .filter(|c| c.score >= threshold)
        .collect();
    kept.sort_by(|a, b| b.score.total_cmp(&a.score));
    kept.truncate(top_k);
    kept
}

/// Append `extra` names to `names`, skipping ones already present.
pub fn union_in_order<'a>(names: &mut Vec<String>, extra: impl IntoIterator<Item = &'a str>) {
    for name in extra {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(name: &str, score: f32) -> ScoredCandidate {
        ScoredCandidate {
            name: name.to_string(),
            score,
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let ranked = rank(vec![c("a", 0.25), c("b", 0.2499)], 0.25, 5);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].name, "a");
    }

    #[test]
    fn test_sorted_descending_and_truncated() {
        let ranked = rank(
            vec![c("low", 0.3), c("high", 0.9), c("mid", 0.5), c("mid2", 0.4)],
            0.0,
            3,
        );
        let names: Vec<&str> = ranked.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["high", "mid", "mid2"]);
    }

    #[test]
    fn test_ties_preserve_input_order() {
        let ranked = rank(vec![c("first", 0.5), c("second", 0.5), c("third", 0.5)], 0.1, 5);
        let names: Vec<&str> = ranked.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_union_in_order_skips_duplicates() {
        let mut names = vec!["Echo".to_string(), "Create Tool".to_string()];
        union_in_order(&mut names, ["Create Tool", "Improve Existing Tool"]);
        assert_eq!(names, vec!["Echo", "Create Tool", "Improve Existing Tool"]);
    }
}
