//! Bounded Levenshtein edit distance.
//!
//! Used by the checker's "did you mean" suggestions: an unknown identifier
//! is compared against every name in scope and the closest candidate within
//! the limit is suggested.

/// Levenshtein distance between `a` and `b`, or `None` when it exceeds
/// `limit`.
///
/// The cut-off lets callers skip hopeless candidates early: once every cell
/// of a DP row is above `limit`, no suffix can bring the distance back
/// down.
pub fn edit_distance(a: &str, b: &str, limit: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.len().abs_diff(b.len()) > limit {
        return None;
    }
    if a.is_empty() {
        return Some(b.len());
    }
    if b.is_empty() {
        return Some(a.len());
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        let mut row_min = cur[0];
        for (j, &cb) in b.iter().enumerate() {
            let subst = prev[j] + usize::from(ca != cb);
            cur[j + 1] = subst.min(prev[j + 1] + 1).min(cur[j] + 1);
            row_min = row_min.min(cur[j + 1]);
        }
        if row_min > limit {
            return None;
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    let d = prev[b.len()];
    (d <= limit).then_some(d)
}
