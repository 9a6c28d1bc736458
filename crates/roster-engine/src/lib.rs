//! # Roster Engine
//!
//! 排班引擎：自動排班產生器、成本函數、約束驗證器

pub mod cost;
pub mod generator;
pub mod limits;
pub mod predicates;
pub mod qualification;
pub mod ranking;
pub mod scoring;
pub mod validator;

use chrono::NaiveDate;
use serde::Serialize;

// Re-export 主要類型
pub use cost::{CostContext, CostFunction};
pub use generator::AutoFillGenerator;
pub use limits::{LimitStatus, ServiceCount, ServiceLimits};
pub use predicates::{RosterIndex, RotationFit};
pub use qualification::{ExclusionPenalty, QualificationIndex, WorkplaceRequirements};
pub use ranking::{PlanRanker, RankedPlan};
pub use scoring::{PlanScore, PlanScorer};
pub use validator::{
    ConstraintValidator, ProposedAssignment, ValidationOutcome, Violation, ViolationKind,
};

/// 產生器輸出的建議指派（預覽，尚未寫入）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestedAssignment {
    pub date: NaiveDate,
    pub position: String,
    pub doctor_id: String,
    #[serde(rename = "isPreview")]
    pub is_preview: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SuggestedAssignment {
    /// 創建新的建議指派
    pub fn new(date: NaiveDate, position: impl Into<String>, doctor_id: impl Into<String>) -> Self {
        Self {
            date,
            position: position.into(),
            doctor_id: doctor_id.into(),
            is_preview: true,
            note: None,
        }
    }

    /// 建構器模式：設置備註
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// 未補滿的位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnfilledSlot {
    pub date: NaiveDate,
    pub position: String,
    /// 已排人數（含既有記錄）
    pub filled: u32,
    /// 最少人數
    pub minimum: u32,
    /// 目標人數
    pub target: u32,
}

impl UnfilledSlot {
    /// 是否低於最少人數
    pub fn below_minimum(&self) -> bool {
        self.filled < self.minimum
    }

    /// 距離目標的缺額
    pub fn missing(&self) -> u32 {
        self.target.saturating_sub(self.filled)
    }
}

/// 產生結果
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    /// 建議指派（含自動補休）
    pub assignments: Vec<SuggestedAssignment>,

    /// 未補滿的位置
    pub unfilled: Vec<UnfilledSlot>,

    /// 警告信息
    pub warnings: Vec<PlanWarning>,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

impl GenerationResult {
    /// 創建空的結果
    pub fn empty() -> Self {
        Self {
            assignments: Vec::new(),
            unfilled: Vec::new(),
            warnings: Vec::new(),
            calculation_time_ms: None,
        }
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: PlanWarning) {
        self.warnings.push(warning);
    }

    /// 某醫師某日的建議指派
    pub fn assignments_for(&self, doctor_id: &str, date: NaiveDate) -> Vec<&SuggestedAssignment> {
        self.assignments
            .iter()
            .filter(|a| a.doctor_id == doctor_id && a.date == date)
            .collect()
    }

    /// 某位置某日的建議指派
    pub fn assignments_at(&self, position: &str, date: NaiveDate) -> Vec<&SuggestedAssignment> {
        self.assignments
            .iter()
            .filter(|a| a.position == position && a.date == date)
            .collect()
    }
}

/// 排班警告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanWarning {
    pub date: NaiveDate,
    pub subject: String,
    pub message: String,
    pub severity: WarningSeverity,
}

impl PlanWarning {
    pub fn new(
        date: NaiveDate,
        subject: String,
        message: String,
        severity: WarningSeverity,
    ) -> Self {
        Self {
            date,
            subject,
            message,
            severity,
        }
    }

    pub fn info(date: NaiveDate, subject: String, message: String) -> Self {
        Self::new(date, subject, message, WarningSeverity::Info)
    }

    pub fn warning(date: NaiveDate, subject: String, message: String) -> Self {
        Self::new(date, subject, message, WarningSeverity::Warning)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningSeverity {
    Info,
    Warning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggested_assignment_serialization() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let suggestion = SuggestedAssignment::new(date, "Frei", "D1").with_note("Auto-Frei");
        let json = serde_json::to_value(&suggestion).unwrap();

        assert_eq!(json["isPreview"], true);
        assert_eq!(json["doctor_id"], "D1");
        assert_eq!(json["date"], "2026-03-09");
        assert_eq!(json["note"], "Auto-Frei");
    }

    #[test]
    fn test_unfilled_slot() {
        let slot = UnfilledSlot {
            date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            position: "CT".to_string(),
            filled: 1,
            minimum: 2,
            target: 3,
        };
        assert!(slot.below_minimum());
        assert_eq!(slot.missing(), 2);
    }
}
