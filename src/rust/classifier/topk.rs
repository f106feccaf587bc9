use std::cmp::Ordering;

use super::error::ClassifierError;
use super::model::ProbabilityDistribution;

/// Threshold value that disables probability filtering
pub const NO_THRESHOLD: f32 = -1.0;

/// One ranked entry: a native label index and its probability as returned by the model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedEntry {
    pub index: usize,
    pub prob: f32,
}

pub(crate) fn validate_k(k: usize) -> Result<(), ClassifierError> {
    if k == 0 {
        return Err(ClassifierError::InvalidArgument("k must be at least 1".into()));
    }
    Ok(())
}

pub(crate) fn validate_threshold(threshold: f32) -> Result<(), ClassifierError> {
    if threshold == NO_THRESHOLD || (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(ClassifierError::InvalidArgument(format!(
            "threshold must be {} or within [0, 1], got {}",
            NO_THRESHOLD, threshold
        )))
    }
}

/// Higher probability first; equal probabilities fall back to the lower label index.
fn rank_order(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    b.prob
        .partial_cmp(&a.prob)
        .unwrap_or(Ordering::Equal)
        .then(a.index.cmp(&b.index))
}

/// Selects at most `k` labels from `dist`, best first.
///
/// With [`NO_THRESHOLD`] every label with a positive probability is eligible.
/// Otherwise a label is eligible when its probability is at least `threshold`,
/// which for `0.0` also admits exact zeros. Fewer than `k` entries are
/// returned when fewer are eligible; probabilities are never renormalized.
///
/// # Errors
/// `InvalidArgument` when `k == 0` or the threshold is neither the sentinel
/// nor a value in `[0, 1]`.
pub fn top_k(
    dist: &ProbabilityDistribution,
    k: usize,
    threshold: f32,
) -> Result<Vec<RankedEntry>, ClassifierError> {
    validate_k(k)?;
    validate_threshold(threshold)?;
    Ok(select(dist, k, threshold))
}

/// `top_k` without argument checks, for callers that validated once per batch.
pub(crate) fn select(dist: &ProbabilityDistribution, k: usize, threshold: f32) -> Vec<RankedEntry> {
    let admits = |p: f32| {
        if threshold == NO_THRESHOLD {
            p > 0.0
        } else {
            p >= threshold
        }
    };

    let mut eligible: Vec<RankedEntry> = dist
        .probs()
        .iter()
        .enumerate()
        .filter(|&(_, &p)| admits(p))
        .map(|(index, &prob)| RankedEntry { index, prob })
        .collect();

    if eligible.len() > k {
        eligible.select_nth_unstable_by(k - 1, rank_order);
        eligible.truncate(k);
    }
    eligible.sort_unstable_by(rank_order);
    eligible
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(probs: &[f32]) -> ProbabilityDistribution {
        ProbabilityDistribution::new(probs.to_vec(), probs.len()).unwrap()
    }

    fn indices(entries: &[RankedEntry]) -> Vec<usize> {
        entries.iter().map(|e| e.index).collect()
    }

    #[test]
    fn test_orders_by_probability() {
        let ranked = top_k(&dist(&[0.1, 0.6, 0.05, 0.25]), 3, NO_THRESHOLD).unwrap();
        assert_eq!(indices(&ranked), vec![1, 3, 0]);
        assert_eq!(ranked[0].prob, 0.6);
    }

    #[test]
    fn test_ties_break_on_lower_index() {
        let ranked = top_k(&dist(&[0.2, 0.3, 0.2, 0.3]), 4, NO_THRESHOLD).unwrap();
        assert_eq!(indices(&ranked), vec![1, 3, 0, 2]);

        // The tie straddles the cut-off
        let ranked = top_k(&dist(&[0.2, 0.4, 0.2, 0.2]), 2, NO_THRESHOLD).unwrap();
        assert_eq!(indices(&ranked), vec![1, 0]);
    }

    #[test]
    fn test_cardinality_without_threshold() {
        let d = dist(&[0.0, 0.5, 0.0, 0.3, 0.2]);
        for k in 1..=6 {
            let positive = d.probs().iter().filter(|p| **p > 0.0).count();
            assert_eq!(top_k(&d, k, NO_THRESHOLD).unwrap().len(), k.min(positive));
        }
    }

    #[test]
    fn test_zero_threshold_admits_exact_zeros() {
        let d = dist(&[0.0, 1e-30, 0.0, 0.99]);
        assert_eq!(indices(&top_k(&d, 4, NO_THRESHOLD).unwrap()), vec![3, 1]);
        assert_eq!(indices(&top_k(&d, 4, 0.0).unwrap()), vec![3, 1, 0, 2]);
    }

    #[test]
    fn test_threshold_is_inclusive_and_never_pads() {
        let d = dist(&[0.5, 0.3, 0.2]);
        assert_eq!(indices(&top_k(&d, 3, 0.3).unwrap()), vec![0, 1]);
        assert!(top_k(&d, 3, 0.9).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let d = dist(&[1.0]);
        assert!(matches!(top_k(&d, 0, NO_THRESHOLD), Err(ClassifierError::InvalidArgument(_))));
        for bad in [f32::NAN, -0.5, 1.5, f32::INFINITY] {
            assert!(matches!(top_k(&d, 1, bad), Err(ClassifierError::InvalidArgument(_))));
        }
    }
}
