//! # Agreement Module
//!
//! Inter-rater reliability over fixed-N probability tables.
//!
//! - `rating_matrix` - probability rows → integer vote rows (+ residual)
//! - `fleiss` - exact Fleiss' kappa and the AgreementReport
//! - `evaluator` - per-scope and per-match evaluation with flagged rows
//! - `patterns` - vote-pattern histogram ("k/N" shares per category)

pub mod evaluator;
pub mod fleiss;
pub mod patterns;
pub mod rating_matrix;

pub use evaluator::{AgreementEvaluator, Evaluation, MatchAgreement};
pub use fleiss::{fleiss_kappa, row_agreement, AgreementReport};
pub use patterns::VotePatternHistogram;
pub use rating_matrix::RatingMatrix;
