//! # Roster Core
//!
//! 排班核心資料模型與類型定義

pub mod calendar;
pub mod config;
pub mod doctor;
pub mod qualification;
pub mod rotation;
pub mod shift;
pub mod snapshot;
pub mod wish;
pub mod workplace;

// Re-export 主要類型
pub use calendar::HolidayCalendar;
pub use config::{CategoryConfig, SystemSettings};
pub use doctor::Doctor;
pub use qualification::{DoctorQualification, QualificationTier, WorkplaceQualification};
pub use rotation::TrainingRotation;
pub use shift::{Absence, ShiftEntry};
pub use snapshot::Snapshot;
pub use wish::{Wish, WishKind, WishStatus};
pub use workplace::{ServiceKind, Timeslot, Workplace, WorkplaceCategory};

/// 排班錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("無效的配置: {0}")]
    InvalidConfig(String),

    #[error("日期溢出: {0}")]
    DateOverflow(chrono::NaiveDate),

    #[error("無效的 FTE: {0}")]
    InvalidFte(String),

    #[error("輸入解析錯誤: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RosterError>;
