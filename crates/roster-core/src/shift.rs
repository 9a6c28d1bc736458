//! 班表記錄模型

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 缺勤位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Absence {
    Frei,
    Krank,
    Urlaub,
    Dienstreise,
    NichtVerfuegbar,
}

impl Absence {
    pub const ALL: [Absence; 5] = [
        Absence::Frei,
        Absence::Krank,
        Absence::Urlaub,
        Absence::Dienstreise,
        Absence::NichtVerfuegbar,
    ];

    /// 由班表 position 解析
    pub fn from_position(position: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.position() == position)
    }

    /// 班表中使用的 position 名稱
    pub fn position(self) -> &'static str {
        match self {
            Self::Frei => "Frei",
            Self::Krank => "Krank",
            Self::Urlaub => "Urlaub",
            Self::Dienstreise => "Dienstreise",
            Self::NichtVerfuegbar => "Nicht verfügbar",
        }
    }
}

/// 班表記錄：一列代表一筆（醫師, 日期, 位置[, 時段]）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftEntry {
    /// 記錄ID（來自外部儲存，可為空）
    #[serde(default)]
    pub id: Option<String>,

    /// 醫師ID
    pub doctor_id: String,

    /// 日期
    pub date: NaiveDate,

    /// 位置：工作位置名稱或缺勤名稱
    pub position: String,

    /// 時段ID
    #[serde(default)]
    pub timeslot_id: Option<String>,

    /// 備註
    #[serde(default)]
    pub note: Option<String>,
}

impl ShiftEntry {
    /// 創建新的班表記錄
    pub fn new(doctor_id: impl Into<String>, date: NaiveDate, position: impl Into<String>) -> Self {
        Self {
            id: None,
            doctor_id: doctor_id.into(),
            date,
            position: position.into(),
            timeslot_id: None,
            note: None,
        }
    }

    /// 創建缺勤記錄
    pub fn absence(doctor_id: impl Into<String>, date: NaiveDate, absence: Absence) -> Self {
        Self::new(doctor_id, date, absence.position())
    }

    /// 建構器模式：設置記錄ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// 建構器模式：設置時段
    pub fn with_timeslot(mut self, timeslot_id: impl Into<String>) -> Self {
        self.timeslot_id = Some(timeslot_id.into());
        self
    }

    /// 建構器模式：設置備註
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// 若為缺勤記錄則返回缺勤類型
    pub fn as_absence(&self) -> Option<Absence> {
        Absence::from_position(&self.position)
    }

    /// 是否為缺勤記錄
    pub fn is_absence(&self) -> bool {
        self.as_absence().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absence_positions() {
        assert_eq!(Absence::from_position("Urlaub"), Some(Absence::Urlaub));
        assert_eq!(
            Absence::from_position("Nicht verfügbar"),
            Some(Absence::NichtVerfuegbar)
        );
        assert_eq!(Absence::from_position("CT"), None);
    }

    #[test]
    fn test_shift_entry_builder() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let entry = ShiftEntry::new("D1", date, "Sono")
            .with_id("S-1")
            .with_timeslot("am")
            .with_note("manuell");

        assert_eq!(entry.timeslot_id.as_deref(), Some("am"));
        assert!(!entry.is_absence());
        assert!(ShiftEntry::absence("D1", date, Absence::Krank).is_absence());
    }
}
