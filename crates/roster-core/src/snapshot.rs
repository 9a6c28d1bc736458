//! 排班輸入快照

use serde::{Deserialize, Serialize};

use crate::{
    Doctor, DoctorQualification, HolidayCalendar, Result, ShiftEntry, SystemSettings,
    TrainingRotation, Wish, Workplace, WorkplaceQualification,
};

/// 一次呼叫所需的完整狀態快照
///
/// 核心只讀取快照，不持有任何跨呼叫狀態。`shifts` 應涵蓋服務計數視窗
/// （預設往前 28 天）以便上限與公平性計算。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub doctors: Vec<Doctor>,
    pub workplaces: Vec<Workplace>,
    pub shifts: Vec<ShiftEntry>,
    pub wishes: Vec<Wish>,
    pub rotations: Vec<TrainingRotation>,
    pub doctor_qualifications: Vec<DoctorQualification>,
    pub workplace_qualifications: Vec<WorkplaceQualification>,
    pub settings: SystemSettings,
    pub calendar: HolidayCalendar,
}

impl Snapshot {
    /// 創建空快照
    pub fn new() -> Self {
        Self::default()
    }

    /// 從 JSON 載入快照
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// 檢查設定與醫師 FTE
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;
        for doctor in &self.doctors {
            doctor.validate()?;
        }
        Ok(())
    }

    pub fn with_doctors(mut self, doctors: Vec<Doctor>) -> Self {
        self.doctors = doctors;
        self
    }

    pub fn with_workplaces(mut self, workplaces: Vec<Workplace>) -> Self {
        self.workplaces = workplaces;
        self
    }

    pub fn with_shifts(mut self, shifts: Vec<ShiftEntry>) -> Self {
        self.shifts = shifts;
        self
    }

    pub fn with_wishes(mut self, wishes: Vec<Wish>) -> Self {
        self.wishes = wishes;
        self
    }

    pub fn with_rotations(mut self, rotations: Vec<TrainingRotation>) -> Self {
        self.rotations = rotations;
        self
    }

    pub fn with_doctor_qualifications(mut self, rows: Vec<DoctorQualification>) -> Self {
        self.doctor_qualifications = rows;
        self
    }

    pub fn with_workplace_qualifications(mut self, rows: Vec<WorkplaceQualification>) -> Self {
        self.workplace_qualifications = rows;
        self
    }

    pub fn with_settings(mut self, settings: SystemSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_calendar(mut self, calendar: HolidayCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// 查找醫師
    pub fn doctor(&self, doctor_id: &str) -> Option<&Doctor> {
        self.doctors.iter().find(|d| d.id == doctor_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RosterError, WishKind, WishStatus, WorkplaceCategory};

    #[test]
    fn test_snapshot_from_json() {
        let json = r#"{
            "doctors": [{"id": "D1", "role": "Facharzt", "fte": "0.5"}],
            "workplaces": [{"id": "W1", "name": "Nachtdienst", "category": "Dienste", "auto_off": true}],
            "wishes": [{"doctor_id": "D1", "date": "2026-03-05", "type": "no_service", "status": "approved"}],
            "calendar": {"working_days": [true, true, true, true, true, false, false], "holidays": ["2026-04-06"], "calendar_id": "BW"}
        }"#;
        let snapshot = Snapshot::from_json(json).unwrap();

        assert_eq!(snapshot.doctors[0].scaled_limit(4), 2);
        assert_eq!(snapshot.workplaces[0].category, WorkplaceCategory::Services);
        assert!(snapshot.workplaces[0].auto_off);
        assert_eq!(snapshot.wishes[0].kind, WishKind::NoService);
        assert_eq!(snapshot.wishes[0].status, WishStatus::Approved);
        assert_eq!(snapshot.settings.limit_fore_services, 4);
        assert!(snapshot.doctor("D1").is_some());
    }

    #[test]
    fn test_snapshot_from_json_rejects_bad_input() {
        assert!(Snapshot::from_json("{\"doctors\": 3}").is_err());
    }

    #[test]
    fn test_snapshot_from_json_rejects_negative_fte() {
        let json = r#"{"doctors": [{"id": "D1", "fte": "1"}, {"id": "D2", "fte": "-0.5"}]}"#;

        assert!(matches!(
            Snapshot::from_json(json),
            Err(RosterError::InvalidFte(ref msg)) if msg.contains("D2")
        ));
    }

    #[test]
    fn test_snapshot_from_json_legacy_categories() {
        let json = r#"{"settings": {"categories": ["Dienste", "Rotationen"]}}"#;
        let snapshot = Snapshot::from_json(json).unwrap();

        assert_eq!(snapshot.settings.categories.len(), 2);
        assert!(!snapshot.settings.category_allows_multiple("Rotationen"));
    }
}
