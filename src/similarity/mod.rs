pub mod algorithms;
pub mod substitution;

// Re-export the main types
pub use self::algorithms::{
    build_predicate,
    match_score,
    ConvergencePredicate,
    ExactPredicate,
    PositionalPredicate,
    SimilarityPredicate,
};
pub use self::substitution::SubstitutionMatrix;
