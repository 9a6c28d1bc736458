//! # Roster
//!
//! 醫師排班：資料模型（`roster-core`）與排班引擎（`roster-engine`）的統一入口。

pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;

pub use roster_core::{
    Absence, CategoryConfig, Doctor, DoctorQualification, HolidayCalendar, QualificationTier,
    Result, RosterError, ServiceKind, ShiftEntry, Snapshot, SystemSettings, Timeslot,
    TrainingRotation, Wish, WishKind, WishStatus, Workplace, WorkplaceCategory,
    WorkplaceQualification,
};
pub use roster_engine::{
    AutoFillGenerator, ConstraintValidator, CostContext, CostFunction, GenerationResult,
    PlanRanker, PlanScore, PlanScorer, PlanWarning, ProposedAssignment, RankedPlan, RosterIndex,
    ServiceLimits, SuggestedAssignment, UnfilledSlot, ValidationOutcome, Violation,
    ViolationKind, WarningSeverity,
};

/// 對 `start..=end` 的每一天產生建議排班
pub fn generate_range(
    snapshot: &Snapshot,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<GenerationResult> {
    let days = HolidayCalendar::days_between(start, end)?;
    let index = RosterIndex::new(snapshot);
    AutoFillGenerator::new(&index).generate(&days)
}

/// 驗證單筆手動編輯
pub fn validate_edit(snapshot: &Snapshot, proposal: &ProposedAssignment) -> ValidationOutcome {
    let index = RosterIndex::new(snapshot);
    ConstraintValidator::new(&index).validate(proposal)
}
