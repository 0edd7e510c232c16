//! Agreement evaluation per scope and per match group.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::fleiss::{fleiss_kappa, AgreementReport};
use super::rating_matrix::RatingMatrix;
use crate::aggregation::ProbabilityTimeline;
use crate::annotation::Side;
use crate::config::{AgreementConfig, AnnotationConfig};
use crate::error::{PipelineError, Result};
use crate::report::ConsistencyWarning;

/// Outcome of evaluating one scope (a match side, a half, a whole run...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub scope: String,
    pub report: AgreementReport,
    pub rows: usize,
    /// Overflowing probability rows and rows whose votes differ from N
    pub warnings: Vec<ConsistencyWarning>,
    /// Ticks with at least one active category
    pub annotated_ticks: usize,
    /// Annotated ticks whose strongest category is below `min_agreement`
    pub weak_ticks: usize,
}

/// Agreement for one game, per side and combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchAgreement {
    pub game_id: String,
    pub sides: Vec<(Side, Evaluation)>,
    /// Scopes that could not be evaluated, with the reason
    pub skipped: Vec<String>,
    /// Mean over the evaluated sides
    pub combined: Option<AgreementReport>,
}

#[derive(Debug, Clone)]
pub struct AgreementEvaluator {
    rater_count: u32,
    tolerance: f64,
    min_agreement: f64,
}

impl AgreementEvaluator {
    pub fn new(annotation: &AnnotationConfig, agreement: &AgreementConfig) -> Self {
        Self {
            rater_count: annotation.rater_count as u32,
            tolerance: annotation.overflow_tolerance,
            min_agreement: agreement.min_agreement,
        }
    }

    pub fn rater_count(&self) -> u32 {
        self.rater_count
    }

    /// Evaluate fixed-N tables of one scope as a single rating matrix.
    pub fn evaluate(&self, scope: &str, timelines: &[&ProbabilityTimeline]) -> Result<Evaluation> {
        if timelines.is_empty() {
            return Err(PipelineError::insufficient(scope, "no probability tables"));
        }

        let mut matrices = Vec::with_capacity(timelines.len());
        let mut warnings = Vec::new();
        for timeline in timelines {
            let (matrix, overflow) =
                RatingMatrix::from_timeline(timeline, self.rater_count, self.tolerance);
            warnings.extend(overflow);
            matrices.push(matrix);
        }
        let matrix = RatingMatrix::stack(&matrices)?;
        warnings.extend(matrix.validate_rows());

        let report = fleiss_kappa(&matrix).map_err(|e| match e {
            PipelineError::InsufficientData { detail, .. } => {
                PipelineError::insufficient(scope, detail)
            }
            other => other,
        })?;

        let (annotated_ticks, weak_ticks) = self.weak_ticks(timelines);
        if report.is_degenerate() {
            warn!(scope, rows = matrix.len(), "kappa undefined: all votes fall in one category");
        }
        debug!(
            scope,
            rows = matrix.len(),
            kappa = report.fleiss_kappa,
            flagged = warnings.len(),
            weak_ticks,
            "agreement evaluated"
        );

        Ok(Evaluation {
            scope: scope.to_string(),
            report,
            rows: matrix.len(),
            warnings,
            annotated_ticks,
            weak_ticks,
        })
    }

    /// Evaluate every side of a game separately, then average the sides.
    ///
    /// A side that cannot be evaluated is recorded in `skipped` and left out
    /// of the mean.
    pub fn evaluate_match(
        &self,
        game_id: &str,
        sides: &[(Side, Vec<&ProbabilityTimeline>)],
    ) -> MatchAgreement {
        let mut evaluated = Vec::new();
        let mut skipped = Vec::new();

        for (side, timelines) in sides {
            let scope = format!("{} {}", game_id, side.name());
            match self.evaluate(&scope, timelines) {
                Ok(evaluation) => evaluated.push((*side, evaluation)),
                Err(e) => {
                    warn!(scope = %scope, error = %e, "agreement skipped");
                    skipped.push(e.to_string());
                }
            }
        }

        let reports: Vec<AgreementReport> = evaluated.iter().map(|(_, e)| e.report).collect();
        let combined = AgreementReport::mean_of(&reports);
        if let Some(report) = &combined {
            info!(
                game = game_id,
                sides = reports.len(),
                kappa = report.fleiss_kappa,
                "match agreement"
            );
        }

        MatchAgreement {
            game_id: game_id.to_string(),
            sides: evaluated,
            skipped,
            combined,
        }
    }

    fn weak_ticks(&self, timelines: &[&ProbabilityTimeline]) -> (usize, usize) {
        let mut annotated = 0;
        let mut weak = 0;
        for timeline in timelines {
            for (_, row) in timeline.iter() {
                let top = row.iter().copied().fold(0.0, f64::max);
                if top > 0.0 {
                    annotated += 1;
                    if top < self.min_agreement {
                        weak += 1;
                    }
                }
            }
        }
        (annotated, weak)
    }
}
