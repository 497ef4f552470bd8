use std::sync::Arc;
use crate::error::{Error, Result};
use crate::config::subsystems::ClusteringPolicy;
use super::substitution::SubstitutionMatrix;

/// Fraction of aligned positions holding the same residue.
///
/// Both sequences must have the same length; the score is symmetric, lies in
/// [0, 1] and is 1.0 for identical sequences.
pub fn match_score(s1: &str, s2: &str) -> Result<f64> {
    let (a, b) = (s1.as_bytes(), s2.as_bytes());
    if a.len() != b.len() {
        return Err(Error::LengthMismatch { left: a.len(), right: b.len() });
    }
    if a.is_empty() {
        return Err(Error::input("cannot score empty sequences"));
    }
    Ok(matching_positions(a, b) as f64 / a.len() as f64)
}

#[inline]
fn matching_positions(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).filter(|(x, y)| x == y).count()
}

/// The SimilarityPredicate trait decides whether two junctions are joined by
/// an edge. Implementations are pure: the answer depends only on the two
/// sequences and on parameters fixed at construction.
pub trait SimilarityPredicate: Send + Sync {
    /// Returns the policy this predicate implements
    fn policy(&self) -> ClusteringPolicy;

    /// Whether `a` and `b` are similar enough to share a cluster
    fn is_similar(&self, a: &str, b: &str) -> bool;
}

/// Identity. Transitive, so grouping alone already yields the clusters.
pub struct ExactPredicate;

impl SimilarityPredicate for ExactPredicate {
    fn policy(&self) -> ClusteringPolicy {
        ClusteringPolicy::Exact
    }

    #[inline]
    fn is_similar(&self, a: &str, b: &str) -> bool {
        a == b
    }
}

/// Equal length and positional identity at or above `threshold`.
pub struct PositionalPredicate {
    threshold: f64,
}

impl PositionalPredicate {
    pub fn new(threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl SimilarityPredicate for PositionalPredicate {
    fn policy(&self) -> ClusteringPolicy {
        ClusteringPolicy::Similar
    }

    #[inline]
    fn is_similar(&self, a: &str, b: &str) -> bool {
        match match_score(a, b) {
            Ok(score) => score >= self.threshold,
            Err(_) => false,
        }
    }
}

/// Positional identity at or above `threshold` and a strictly positive
/// substitution score at every aligned position.
pub struct ConvergencePredicate {
    positional: PositionalPredicate,
    matrix: Arc<SubstitutionMatrix>,
}

impl ConvergencePredicate {
    pub fn new(threshold: f64, matrix: Arc<SubstitutionMatrix>) -> Result<Self> {
        Ok(Self {
            positional: PositionalPredicate::new(threshold)?,
            matrix,
        })
    }

    /// Every aligned residue pair is a tolerated substitution.
    pub fn substitutions_tolerated(&self, a: &str, b: &str) -> bool {
        let (a, b) = (a.as_bytes(), b.as_bytes());
        a.len() == b.len()
            && a.iter().zip(b).all(|(&x, &y)| self.matrix.is_tolerated(x, y))
    }
}

impl SimilarityPredicate for ConvergencePredicate {
    fn policy(&self) -> ClusteringPolicy {
        ClusteringPolicy::Convergence
    }

    #[inline]
    fn is_similar(&self, a: &str, b: &str) -> bool {
        self.positional.is_similar(a, b) && self.substitutions_tolerated(a, b)
    }
}

fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "similarity threshold must be in (0, 1], got {}", threshold
        )))
    }
}

/// Get the appropriate predicate for a policy.
pub fn build_predicate(
    policy: ClusteringPolicy,
    threshold: f64,
    matrix: Option<&Arc<SubstitutionMatrix>>,
) -> Result<Box<dyn SimilarityPredicate>> {
    Ok(match policy {
        ClusteringPolicy::Exact => Box::new(ExactPredicate) as Box<dyn SimilarityPredicate>,
        ClusteringPolicy::Similar => Box::new(PositionalPredicate::new(threshold)?) as Box<dyn SimilarityPredicate>,
        ClusteringPolicy::Convergence => {
            let matrix = matrix.ok_or_else(|| {
                Error::config("convergence clustering needs a substitution matrix")
            })?;
            Box::new(ConvergencePredicate::new(threshold, Arc::clone(matrix))?) as Box<dyn SimilarityPredicate>
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_matrix() -> Arc<SubstitutionMatrix> {
        // A/B is a non-tolerated substitution, A/C is tolerated
        let csv = ",A,B,C\nA,4,-1,1\nB,-1,5,0\nC,1,0,9\n";
        Arc::new(SubstitutionMatrix::parse(csv).unwrap())
    }

    #[test]
    fn match_score_is_reflexive_and_symmetric() {
        for s in ["A", "CASSLG", "CARDYW"] {
            assert_eq!(match_score(s, s).unwrap(), 1.0);
        }
        let ab = match_score("CASSLG", "CASTLA").unwrap();
        let ba = match_score("CASTLA", "CASSLG").unwrap();
        assert_eq!(ab, ba);
        assert!((0.0..=1.0).contains(&ab));
        assert!((ab - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(match_score("AAAA", "CCCC").unwrap(), 0.0);
    }

    #[test]
    fn match_score_rejects_unequal_lengths() {
        assert!(matches!(
            match_score("AAAA", "AAA"),
            Err(Error::LengthMismatch { left: 4, right: 3 })
        ));
    }

    #[test]
    fn positional_threshold_is_inclusive() {
        let predicate = PositionalPredicate::new(0.8).unwrap();
        // 4 of 5 positions match, exactly 0.8
        assert!(predicate.is_similar("CASSL", "CASSF"));
        // 3 of 4 positions match, 0.75
        assert!(!predicate.is_similar("AAAA", "AAAB"));
        assert!(!predicate.is_similar("AAAA", "AAAAA"));
    }

    #[test]
    fn invalid_thresholds_are_rejected() {
        assert!(PositionalPredicate::new(0.0).is_err());
        assert!(PositionalPredicate::new(1.01).is_err());
        assert!(PositionalPredicate::new(1.0).is_ok());
    }

    #[test]
    fn convergence_needs_both_conditions() {
        let predicate = ConvergencePredicate::new(0.5, toy_matrix()).unwrap();
        // positional identity 0.75 passes, but A/B scores -1
        assert!(!predicate.is_similar("AAAA", "AAAB"));
        // A/C scores 1, identity 0.75
        assert!(predicate.is_similar("AAAA", "AAAC"));
        // all substitutions tolerated but identity 0.25
        assert!(!predicate.is_similar("AAAA", "ACCC"));
    }

    #[test]
    fn convergence_rejects_zero_scores_and_self_pairs_without_positive_diagonal() {
        let csv = ",A,B\nA,0,1\nB,1,3\n";
        let matrix = Arc::new(SubstitutionMatrix::parse(csv).unwrap());
        let predicate = ConvergencePredicate::new(0.5, matrix).unwrap();
        // A/A scores 0 which is not strictly positive
        assert!(!predicate.is_similar("AB", "AB"));
        assert!(predicate.is_similar("BB", "BB"));
    }

    #[test]
    fn build_predicate_requires_matrix_for_convergence() {
        assert!(build_predicate(ClusteringPolicy::Convergence, 0.8, None).is_err());
        let matrix = toy_matrix();
        let predicate = build_predicate(ClusteringPolicy::Convergence, 0.8, Some(&matrix)).unwrap();
        assert_eq!(predicate.policy(), ClusteringPolicy::Convergence);
        let exact = build_predicate(ClusteringPolicy::Exact, 0.8, None).unwrap();
        assert!(exact.is_similar("CAR", "CAR"));
        assert!(!exact.is_similar("CAR", "CAS"));
    }
}
