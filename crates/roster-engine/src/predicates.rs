//! 領域判斷
//!
//! `RosterIndex` 以一次呼叫的快照建立查詢索引，供產生器、成本函數、
//! 驗證器共用同一套資格、缺勤、服務與輪訓互斥規則。

use std::collections::HashMap;

use chrono::NaiveDate;
use roster_core::{
    Absence, Doctor, HolidayCalendar, ServiceKind, ShiftEntry, Snapshot, SystemSettings,
    WishKind, WishStatus, Workplace,
};

use crate::qualification::QualificationIndex;

/// 醫師與工作位置的輪訓關係
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationFit {
    /// 工作位置即為輪訓目標
    OnTarget,
    /// 當日沒有輪訓
    NoRotation,
    /// 輪訓目標在別處
    Elsewhere,
}

/// 快照查詢索引
#[derive(Debug)]
pub struct RosterIndex<'a> {
    snapshot: &'a Snapshot,
    qualifications: QualificationIndex,
    doctors_by_id: HashMap<&'a str, &'a Doctor>,
    workplaces_by_name: HashMap<&'a str, &'a Workplace>,
    /// Dienste 依顯示順序排列
    services: Vec<&'a Workplace>,
    /// 其餘工作位置依顯示順序排列
    non_services: Vec<&'a Workplace>,
    entries_by_doctor: HashMap<&'a str, Vec<&'a ShiftEntry>>,
    entries_by_doctor_day: HashMap<(&'a str, NaiveDate), Vec<&'a ShiftEntry>>,
    entries_by_position_day: HashMap<(&'a str, NaiveDate), Vec<&'a ShiftEntry>>,
}

impl<'a> RosterIndex<'a> {
    /// 建立索引
    pub fn new(snapshot: &'a Snapshot) -> Self {
        let qualifications = QualificationIndex::from_rows(
            &snapshot.doctor_qualifications,
            &snapshot.workplace_qualifications,
        );

        let doctors_by_id = snapshot
            .doctors
            .iter()
            .map(|d| (d.id.as_str(), d))
            .collect();

        let workplaces_by_name = snapshot
            .workplaces
            .iter()
            .map(|w| (w.name.as_str(), w))
            .collect();

        let mut ordered: Vec<&Workplace> = snapshot.workplaces.iter().collect();
        ordered.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        let (services, non_services): (Vec<&Workplace>, Vec<&Workplace>) =
            ordered.into_iter().partition(|w| w.is_service());

        let mut entries_by_doctor: HashMap<&str, Vec<&ShiftEntry>> = HashMap::new();
        let mut entries_by_doctor_day: HashMap<(&str, NaiveDate), Vec<&ShiftEntry>> =
            HashMap::new();
        let mut entries_by_position_day: HashMap<(&str, NaiveDate), Vec<&ShiftEntry>> =
            HashMap::new();
        for entry in &snapshot.shifts {
            entries_by_doctor
                .entry(entry.doctor_id.as_str())
                .or_default()
                .push(entry);
            entries_by_doctor_day
                .entry((entry.doctor_id.as_str(), entry.date))
                .or_default()
                .push(entry);
            entries_by_position_day
                .entry((entry.position.as_str(), entry.date))
                .or_default()
                .push(entry);
        }

        Self {
            snapshot,
            qualifications,
            doctors_by_id,
            workplaces_by_name,
            services,
            non_services,
            entries_by_doctor,
            entries_by_doctor_day,
            entries_by_position_day,
        }
    }

    pub fn snapshot(&self) -> &'a Snapshot {
        self.snapshot
    }

    pub fn settings(&self) -> &'a SystemSettings {
        &self.snapshot.settings
    }

    pub fn calendar(&self) -> &'a HolidayCalendar {
        &self.snapshot.calendar
    }

    pub fn qualifications(&self) -> &QualificationIndex {
        &self.qualifications
    }

    pub fn doctors(&self) -> &'a [Doctor] {
        &self.snapshot.doctors
    }

    pub fn doctor(&self, doctor_id: &str) -> Option<&'a Doctor> {
        self.doctors_by_id.get(doctor_id).copied()
    }

    /// 依名稱（班表 position）查找工作位置
    pub fn workplace(&self, name: &str) -> Option<&'a Workplace> {
        self.workplaces_by_name.get(name).copied()
    }

    /// 值班服務，依顯示順序
    pub fn services(&self) -> &[&'a Workplace] {
        &self.services
    }

    /// 非服務工作位置，依顯示順序
    pub fn non_services(&self) -> &[&'a Workplace] {
        &self.non_services
    }

    /// 服務類型：明確設定優先，否則 Dienste 中第一順位為前景、第二順位為背景
    pub fn service_kind(&self, workplace: &Workplace) -> Option<ServiceKind> {
        if !workplace.is_service() {
            return None;
        }
        if let Some(kind) = workplace.service_type {
            return Some(kind);
        }
        match self.services.iter().position(|w| w.id == workplace.id) {
            Some(0) => Some(ServiceKind::Foreground),
            Some(1) => Some(ServiceKind::Background),
            _ => None,
        }
    }

    /// 是否允許多人佔用：工作位置設定優先，其次類別設定
    pub fn allows_multiple(&self, workplace: &Workplace) -> bool {
        workplace.allows_multiple.unwrap_or_else(|| {
            self.settings()
                .category_allows_multiple(workplace.category.name())
        })
    }

    /// 工作位置在該日是否啟用（國定假日視為週日）
    pub fn is_active_on_date(&self, workplace: &Workplace, date: NaiveDate) -> bool {
        workplace.is_active_weekday(self.calendar().effective_weekday(date))
    }

    pub fn is_qualified(&self, doctor_id: &str, workplace: &Workplace) -> bool {
        self.qualifications.is_qualified(doctor_id, &workplace.id)
    }

    pub fn is_excluded(&self, doctor_id: &str, workplace: &Workplace) -> bool {
        self.qualifications.is_excluded(doctor_id, &workplace.id)
    }

    /// 當日有效的輪訓目標（工作位置名稱，已套用別名）
    pub fn active_rotation_targets(&self, doctor_id: &str, date: NaiveDate) -> Vec<&'a str> {
        let aliases = &self.settings().rotation_aliases;
        let mut targets: Vec<&'a str> = Vec::new();
        for rotation in &self.snapshot.rotations {
            if rotation.doctor_id != doctor_id || !rotation.covers(date) {
                continue;
            }
            let target = aliases
                .get(&rotation.modality)
                .map(String::as_str)
                .unwrap_or(rotation.modality.as_str());
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        targets
    }

    /// 醫師與工作位置的輪訓關係
    pub fn rotation_fit(&self, doctor_id: &str, date: NaiveDate, workplace: &str) -> RotationFit {
        let targets = self.active_rotation_targets(doctor_id, date);
        if targets.is_empty() {
            RotationFit::NoRotation
        } else if targets.contains(&workplace) {
            RotationFit::OnTarget
        } else {
            RotationFit::Elsewhere
        }
    }

    /// 醫師當日既有記錄
    pub fn entries_on<'s>(
        &'s self,
        doctor_id: &'s str,
        date: NaiveDate,
    ) -> &'s [&'a ShiftEntry] {
        self.entries_by_doctor_day
            .get(&(doctor_id, date))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 位置當日既有記錄
    pub fn entries_at<'s>(
        &'s self,
        position: &'s str,
        date: NaiveDate,
    ) -> &'s [&'a ShiftEntry] {
        self.entries_by_position_day
            .get(&(position, date))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 醫師全部既有記錄
    pub fn entries_of(&self, doctor_id: &str) -> &[&'a ShiftEntry] {
        self.entries_by_doctor
            .get(doctor_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 醫師當日是否已排該位置
    pub fn has_position_on(&self, doctor_id: &str, date: NaiveDate, position: &str) -> bool {
        self.entries_on(doctor_id, date)
            .iter()
            .any(|e| e.position == position)
    }

    /// 醫師當日的缺勤
    pub fn absence_on(&self, doctor_id: &str, date: NaiveDate) -> Option<Absence> {
        self.entries_on(doctor_id, date)
            .iter()
            .find_map(|e| e.as_absence())
    }

    /// 醫師當日的阻擋型缺勤位置
    pub fn blocking_absence_on(&self, doctor_id: &str, date: NaiveDate) -> Option<&'a str> {
        self.entries_on(doctor_id, date)
            .iter()
            .filter(|e| e.is_absence())
            .find(|e| self.settings().is_blocking_absence(&e.position))
            .map(|e| e.position.as_str())
    }

    /// 是否有已核准的不排服務願望
    pub fn has_approved_no_service_wish(&self, doctor_id: &str, date: NaiveDate) -> bool {
        self.no_service_wish(doctor_id, date) == Some(WishStatus::Approved)
    }

    /// 是否有待審的不排服務願望
    pub fn has_pending_no_service_wish(&self, doctor_id: &str, date: NaiveDate) -> bool {
        self.no_service_wish(doctor_id, date) == Some(WishStatus::Pending)
    }

    fn no_service_wish(&self, doctor_id: &str, date: NaiveDate) -> Option<WishStatus> {
        self.strongest_wish(doctor_id, date, WishKind::NoService, |_| true)
    }

    /// 針對該工作位置的服務願望狀態
    ///
    /// 未指定位置的服務願望只適用於 Dienste。
    pub fn service_wish_status(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        workplace: &Workplace,
    ) -> Option<WishStatus> {
        self.strongest_wish(doctor_id, date, WishKind::Service, |position| {
            match position {
                Some(p) => p == workplace.name,
                None => workplace.is_service(),
            }
        })
    }

    /// 已核准優先於待審；已拒絕的願望忽略
    fn strongest_wish(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        kind: WishKind,
        applies: impl Fn(Option<&str>) -> bool,
    ) -> Option<WishStatus> {
        let mut found = None;
        for wish in &self.snapshot.wishes {
            if wish.doctor_id != doctor_id
                || wish.date != date
                || wish.kind != kind
                || !wish.is_active()
                || !applies(wish.position.as_deref())
            {
                continue;
            }
            if wish.status == WishStatus::Approved {
                return Some(WishStatus::Approved);
            }
            found = Some(wish.status);
        }
        found
    }

    /// 同日互斥規則
    ///
    /// - 兩個不同的服務永遠互斥
    /// - 服務與非服務：兩者皆影響可用性，且雙方都不允許與輪訓並存時互斥
    /// - 兩個非服務工作位置不在此判斷（由時段檢查處理）
    pub fn same_day_conflict(&self, a: &Workplace, b: &Workplace) -> bool {
        match (a.is_service(), b.is_service()) {
            (true, true) => a.name != b.name,
            (true, false) | (false, true) => {
                a.affects_availability
                    && b.affects_availability
                    && !a.allows_rotation_concurrently
                    && !b.allows_rotation_concurrently
            }
            (false, false) => false,
        }
    }

    /// 角色是否為專科醫師
    pub fn is_specialist(&self, doctor: &Doctor) -> bool {
        self.settings().specialist_roles.contains(&doctor.role)
    }

    /// 角色是否為住院醫師
    pub fn is_assistant(&self, doctor: &Doctor) -> bool {
        self.settings().assistant_roles.contains(&doctor.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use roster_core::{
        DoctorQualification, QualificationTier, TrainingRotation, Wish, WorkplaceCategory,
        WorkplaceQualification,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot() -> Snapshot {
        Snapshot::new()
            .with_doctors(vec![
                Doctor::new("D1", "Facharzt"),
                Doctor::new("D2", "Assistenzarzt"),
            ])
            .with_workplaces(vec![
                Workplace::new("S2", "Hintergrund", WorkplaceCategory::Services).with_order(2),
                Workplace::new("S1", "Nachtdienst", WorkplaceCategory::Services).with_order(1),
                Workplace::new("S3", "Spätdienst", WorkplaceCategory::Services).with_order(3),
                Workplace::new("W1", "CT", WorkplaceCategory::Rotations),
                Workplace::new("W2", "Röntgen Thorax", WorkplaceCategory::Rotations)
                    .with_active_days(vec![Weekday::Mon, Weekday::Sun]),
            ])
            .with_rotations(vec![
                TrainingRotation::new("D2", "Röntgen", date(2026, 3, 1), date(2026, 3, 31)),
                TrainingRotation::new("D1", "CT", date(2026, 2, 1), date(2026, 2, 28)),
            ])
            .with_wishes(vec![
                Wish::new("D1", date(2026, 3, 5), WishKind::NoService, WishStatus::Pending),
                Wish::new("D1", date(2026, 3, 5), WishKind::NoService, WishStatus::Approved),
                Wish::new("D2", date(2026, 3, 5), WishKind::Service, WishStatus::Pending)
                    .with_position("Nachtdienst"),
                Wish::new("D2", date(2026, 3, 6), WishKind::Service, WishStatus::Rejected),
            ])
            .with_doctor_qualifications(vec![DoctorQualification::new("D1", "Q1")])
            .with_workplace_qualifications(vec![WorkplaceQualification::new(
                "W1",
                "Q1",
                QualificationTier::Mandatory,
            )])
            .with_shifts(vec![
                ShiftEntry::new("D1", date(2026, 3, 2), "Urlaub"),
                ShiftEntry::new("D2", date(2026, 3, 2), "Dienstreise"),
            ])
    }

    #[test]
    fn test_service_kind_by_order() {
        let snapshot = snapshot();
        let index = RosterIndex::new(&snapshot);

        let night = index.workplace("Nachtdienst").unwrap();
        let back = index.workplace("Hintergrund").unwrap();
        let late = index.workplace("Spätdienst").unwrap();
        let ct = index.workplace("CT").unwrap();

        assert_eq!(index.service_kind(night), Some(ServiceKind::Foreground));
        assert_eq!(index.service_kind(back), Some(ServiceKind::Background));
        assert_eq!(index.service_kind(late), None);
        assert_eq!(index.service_kind(ct), None);
    }

    #[test]
    fn test_rotation_alias_resolution() {
        let snapshot = snapshot();
        let plain = RosterIndex::new(&snapshot);
        assert_eq!(
            plain.active_rotation_targets("D2", date(2026, 3, 3)),
            vec!["Röntgen"]
        );

        let aliased = snapshot.clone().with_settings(
            SystemSettings::default().with_rotation_alias("Röntgen", "Röntgen Thorax"),
        );
        let index = RosterIndex::new(&aliased);
        assert_eq!(
            index.rotation_fit("D2", date(2026, 3, 3), "Röntgen Thorax"),
            RotationFit::OnTarget
        );
        assert_eq!(
            index.rotation_fit("D2", date(2026, 3, 3), "CT"),
            RotationFit::Elsewhere
        );
        assert_eq!(
            index.rotation_fit("D1", date(2026, 3, 3), "CT"),
            RotationFit::NoRotation
        );
    }

    #[test]
    fn test_holiday_counts_as_sunday() {
        let mut snapshot = snapshot();
        snapshot.calendar.add_holiday(date(2026, 4, 6)); // 復活節週一
        let index = RosterIndex::new(&snapshot);

        let ct = index.workplace("CT").unwrap();
        let thorax = index.workplace("Röntgen Thorax").unwrap();

        assert!(index.is_active_on_date(ct, date(2026, 4, 7)));
        assert!(!index.is_active_on_date(ct, date(2026, 4, 6)));
        // 週日明確啟用的位置在假日仍啟用
        assert!(index.is_active_on_date(thorax, date(2026, 4, 6)));
    }

    #[test]
    fn test_wishes() {
        let snapshot = snapshot();
        let index = RosterIndex::new(&snapshot);
        let night = index.workplace("Nachtdienst").unwrap();
        let back = index.workplace("Hintergrund").unwrap();

        assert!(index.has_approved_no_service_wish("D1", date(2026, 3, 5)));
        assert!(!index.has_pending_no_service_wish("D1", date(2026, 3, 5)));
        assert_eq!(
            index.service_wish_status("D2", date(2026, 3, 5), night),
            Some(WishStatus::Pending)
        );
        assert_eq!(index.service_wish_status("D2", date(2026, 3, 5), back), None);
        assert_eq!(index.service_wish_status("D2", date(2026, 3, 6), night), None);
    }

    #[test]
    fn test_absences() {
        let snapshot = snapshot();
        let index = RosterIndex::new(&snapshot);

        assert_eq!(index.blocking_absence_on("D1", date(2026, 3, 2)), Some("Urlaub"));
        assert_eq!(index.blocking_absence_on("D2", date(2026, 3, 2)), None);
        assert_eq!(
            index.absence_on("D2", date(2026, 3, 2)),
            Some(Absence::Dienstreise)
        );
    }

    #[test]
    fn test_same_day_conflict() {
        let snapshot = snapshot();
        let index = RosterIndex::new(&snapshot);
        let night = index.workplace("Nachtdienst").unwrap();
        let back = index.workplace("Hintergrund").unwrap();
        let ct = index.workplace("CT").unwrap();

        assert!(index.same_day_conflict(night, back));
        assert!(!index.same_day_conflict(night, night));
        assert!(index.same_day_conflict(night, ct));

        let concurrent = night.clone().with_rotation_concurrently(true);
        assert!(!index.same_day_conflict(&concurrent, ct));
        let remote = back.clone().with_affects_availability(false);
        assert!(!index.same_day_conflict(&remote, ct));
    }
}
