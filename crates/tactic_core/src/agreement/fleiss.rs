//! Fleiss' kappa over a rating matrix.

use serde::{Deserialize, Serialize};

use super::rating_matrix::RatingMatrix;
use crate::error::{PipelineError, Result};

/// Agreement statistics for one evaluation scope.
///
/// `fleiss_kappa` is NaN when chance agreement is exactly 1 (every vote in a
/// single category). NaN is kept as is and never replaced by zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgreementReport {
    /// P̄: mean observed pairwise agreement
    pub agreement_rate: f64,
    /// P̄_e: agreement expected by chance
    pub chance_agreement_rate: f64,
    pub fleiss_kappa: f64,
    pub normalized_agreement: f64,
}

impl AgreementReport {
    /// Component-wise arithmetic mean (NaN propagates).
    pub fn mean_of(reports: &[AgreementReport]) -> Option<AgreementReport> {
        if reports.is_empty() {
            return None;
        }
        let n = reports.len() as f64;
        let avg = |f: fn(&AgreementReport) -> f64| reports.iter().map(f).sum::<f64>() / n;
        Some(AgreementReport {
            agreement_rate: avg(|r| r.agreement_rate),
            chance_agreement_rate: avg(|r| r.chance_agreement_rate),
            fleiss_kappa: avg(|r| r.fleiss_kappa),
            normalized_agreement: avg(|r| r.normalized_agreement),
        })
    }

    pub fn is_degenerate(&self) -> bool {
        self.fleiss_kappa.is_nan()
    }
}

/// Per-row agreement `P_i = (Σ_j r_ij² − N) / (N·(N−1))`.
pub fn row_agreement(row: &[u32], rater_count: u32) -> f64 {
    let n = rater_count as f64;
    let squares: f64 = row.iter().map(|&r| (r as f64) * (r as f64)).sum();
    (squares - n) / (n * (n - 1.0))
}

/// Exact Fleiss' kappa.
///
/// Fails with `InsufficientData` when N < 2 or the matrix has no rows.
pub fn fleiss_kappa(matrix: &RatingMatrix) -> Result<AgreementReport> {
    let rater_count = matrix.rater_count();
    if rater_count < 2 {
        return Err(PipelineError::insufficient(
            "fleiss kappa",
            format!("need at least 2 raters, have {}", rater_count),
        ));
    }
    if matrix.is_empty() {
        return Err(PipelineError::insufficient("fleiss kappa", "rating matrix has no rows"));
    }

    let n_rows = matrix.len() as f64;
    let n = rater_count as f64;

    let mut column_totals = vec![0u64; matrix.width()];
    let mut agreement_sum = 0.0;
    for row in matrix.rows() {
        agreement_sum += row_agreement(row, rater_count);
        for (total, &r) in column_totals.iter_mut().zip(row) {
            *total += r as u64;
        }
    }

    let agreement_rate = agreement_sum / n_rows;
    let chance_agreement_rate: f64 = column_totals
        .iter()
        .map(|&total| {
            let p = total as f64 / (n_rows * n);
            p * p
        })
        .sum();

    let denominator = 1.0 - chance_agreement_rate;
    let fleiss_kappa = if denominator == 0.0 {
        f64::NAN
    } else {
        (agreement_rate - chance_agreement_rate) / denominator
    };

    Ok(AgreementReport {
        agreement_rate,
        chance_agreement_rate,
        fleiss_kappa,
        normalized_agreement: fleiss_kappa,
    })
}

// ========== Tests ==========
