//! Persisted income bookkeeping driven by COE progress.
//!
//! `income` on a student is the enrolment base plus whatever COE bonus the
//! current [`CoeBonusStage`] implies. Changes arrive as deltas so the stored
//! figure never has to be recomputed from history. The flat per-report
//! calculation lives in [`crate::reporting::flat_income`] and is unrelated.

use serde::Serialize;

use super::domain::{CoeBonusStage, CoeStatus};

/// Base income booked for a student flagged eligible for the bonus.
pub const ENROLMENT_BONUS: i64 = 2000;

/// Income and bonus stage as stored on a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusState {
    pub income: i64,
    pub stage: CoeBonusStage,
}

impl BonusState {
    /// State of a freshly created student, before any COE transition.
    pub fn initial(eligible_for_income_bonus: bool) -> Self {
        Self {
            income: base_income(eligible_for_income_bonus),
            stage: CoeBonusStage::None,
        }
    }
}

pub fn base_income(eligible_for_income_bonus: bool) -> i64 {
    if eligible_for_income_bonus {
        ENROLMENT_BONUS
    } else {
        0
    }
}

/// Stage change and income delta fired by `requested` from `stage`, if any.
pub fn coe_transition(stage: CoeBonusStage, requested: CoeStatus) -> Option<(CoeBonusStage, i64)> {
    match (stage, requested) {
        (CoeBonusStage::None, CoeStatus::Applied) => Some((CoeBonusStage::Applied, 5000)),
        (CoeBonusStage::None, CoeStatus::Received) => Some((CoeBonusStage::Received, 15000)),
        (CoeBonusStage::Applied, CoeStatus::Pending) => Some((CoeBonusStage::None, -5000)),
        (CoeBonusStage::Applied, CoeStatus::Received) => Some((CoeBonusStage::Received, 10000)),
        (CoeBonusStage::Received, CoeStatus::Applied) => Some((CoeBonusStage::Applied, -10000)),
        (CoeBonusStage::Received, CoeStatus::Pending) => Some((CoeBonusStage::None, -15000)),
        _ => None,
    }
}

/// Applies the COE transition table; pairs outside the table leave `state` as is.
pub fn apply_coe_transition(state: BonusState, requested: CoeStatus) -> BonusState {
    match coe_transition(state.stage, requested) {
        Some((stage, delta)) => BonusState {
            income: state.income + delta,
            stage,
        },
        None => state,
    }
}

/// Income correction when the eligibility flag flips on an existing student.
pub fn eligibility_delta(was_eligible: bool, now_eligible: bool) -> i64 {
    base_income(now_eligible) - base_income(was_eligible)
}
