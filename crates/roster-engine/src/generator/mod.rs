//! 自動排班產生器
//!
//! 逐日執行四個階段，後面的階段看得到前面階段造成的可用性變化：
//! - Phase A：值班服務（可能產生未來的自動補休）
//! - Phase B：影響可用性的一般位置
//! - Phase C：不影響可用性的位置
//! - Phase D：非服務 auto_off 位置的補休
//!
//! 產生器本身沒有隨機性；需要多樣性時由呼叫端調整醫師順序。

mod context;
mod leave;
mod services;
mod staffing;

use std::collections::HashSet;

use chrono::NaiveDate;
use roster_core::Doctor;

use crate::predicates::RosterIndex;
use crate::GenerationResult;
use context::RunContext;
use staffing::FillPhase;

/// 自動排班產生器
pub struct AutoFillGenerator<'i, 'a> {
    index: &'i RosterIndex<'a>,

    /// 醫師優先順序；未列出的醫師依快照順序接在後面
    doctor_order: Option<Vec<String>>,
}

impl<'i, 'a> AutoFillGenerator<'i, 'a> {
    /// 創建新的產生器
    pub fn new(index: &'i RosterIndex<'a>) -> Self {
        Self {
            index,
            doctor_order: None,
        }
    }

    /// 建構器模式：設置醫師順序
    pub fn with_doctor_order(mut self, order: Vec<String>) -> Self {
        self.doctor_order = Some(order);
        self
    }

    /// 產生建議排班
    ///
    /// 日期會先排序並去重。找不到候選人不是錯誤，該位置會列在
    /// `GenerationResult::unfilled`；只有日期運算溢出會返回錯誤。
    pub fn generate(&self, days: &[NaiveDate]) -> roster_core::Result<GenerationResult> {
        let index = self.index;
        let start_time = std::time::Instant::now();

        let mut days = days.to_vec();
        days.sort();
        days.dedup();

        tracing::info!(
            "開始自動排班：{} 天，醫師 {} 位，工作位置 {} 個",
            days.len(),
            index.doctors().len(),
            index.snapshot().workplaces.len()
        );

        let doctors = self.ordered_doctors();
        let mut ctx = RunContext::new();

        for &date in &days {
            ctx.begin_day(index, date);

            tracing::debug!("{} Phase A: 值班服務", date);
            services::fill_services(index, &doctors, &mut ctx)?;

            tracing::debug!("{} Phase B: 影響可用性的位置", date);
            staffing::fill_workplaces(index, &doctors, &mut ctx, FillPhase::Availability);

            tracing::debug!("{} Phase C: 不影響可用性的位置", date);
            staffing::fill_workplaces(index, &doctors, &mut ctx, FillPhase::Supplementary);

            tracing::debug!("{} Phase D: 補休", date);
            leave::residual_leave(index, &mut ctx)?;

            ctx.record_unfilled(index);
        }

        let elapsed = start_time.elapsed();
        let result = GenerationResult {
            assignments: ctx.assignments,
            unfilled: ctx.unfilled,
            warnings: ctx.warnings,
            calculation_time_ms: Some(elapsed.as_millis()),
        };

        tracing::info!(
            "自動排班完成：建議 {} 筆，未補滿 {} 個位置，耗時 {:?}",
            result.assignments.len(),
            result.unfilled.len(),
            elapsed
        );

        Ok(result)
    }

    fn ordered_doctors(&self) -> Vec<&'a Doctor> {
        let all = self.index.doctors();
        let Some(order) = &self.doctor_order else {
            return all.iter().collect();
        };

        let mut seen: HashSet<&str> = HashSet::new();
        let mut ordered = Vec::with_capacity(all.len());
        let listed = order.iter().filter_map(|id| self.index.doctor(id));
        for doctor in listed.chain(all.iter()) {
            if seen.insert(doctor.id.as_str()) {
                ordered.push(doctor);
            }
        }
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use roster_core::{
        Absence, DoctorQualification, HolidayCalendar, QualificationTier, ShiftEntry, Snapshot,
        SystemSettings, TrainingRotation, Wish, WishKind, WishStatus, Workplace,
        WorkplaceCategory, WorkplaceQualification,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn every_day() -> Vec<Weekday> {
        vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]
    }

    fn night_service() -> Workplace {
        Workplace::new("S1", "Nachtdienst", WorkplaceCategory::Services)
            .with_active_days(every_day())
            .with_auto_off(true)
            .with_order(1)
    }

    fn doctors(ids: &[&str]) -> Vec<Doctor> {
        ids.iter().map(|id| Doctor::new(*id, "Facharzt")).collect()
    }

    fn positions(result: &GenerationResult, doctor_id: &str, day: NaiveDate) -> Vec<String> {
        result
            .assignments_for(doctor_id, day)
            .into_iter()
            .map(|a| a.position.clone())
            .collect()
    }

    #[test]
    fn test_service_assignment_creates_auto_off() {
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A", "B"]))
            .with_workplaces(vec![night_service()]);
        let index = RosterIndex::new(&snapshot);
        let friday = date(2026, 3, 6);

        let result = AutoFillGenerator::new(&index).generate(&[friday]).unwrap();

        assert_eq!(positions(&result, "A", friday), vec!["Nachtdienst"]);
        let leave = result.assignments_for("A", date(2026, 3, 9));
        assert_eq!(leave.len(), 1);
        assert_eq!(leave[0].position, "Frei");
        assert_eq!(leave[0].note.as_deref(), Some("Auto-Frei (Nachtdienst)"));
        assert!(result.assignments_for("B", date(2026, 3, 9)).is_empty());
    }

    #[test]
    fn test_auto_off_skips_holiday_and_existing_entries() {
        let calendar = HolidayCalendar::default().with_holidays(vec![date(2026, 3, 9)]);
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A"]))
            .with_workplaces(vec![night_service()])
            .with_calendar(calendar.clone());
        let index = RosterIndex::new(&snapshot);

        let result = AutoFillGenerator::new(&index)
            .generate(&[date(2026, 3, 6)])
            .unwrap();
        assert_eq!(positions(&result, "A", date(2026, 3, 10)), vec!["Frei"]);

        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A"]))
            .with_workplaces(vec![night_service()])
            .with_calendar(calendar)
            .with_shifts(vec![ShiftEntry::absence("A", date(2026, 3, 10), Absence::Urlaub)]);
        let index = RosterIndex::new(&snapshot);

        let result = AutoFillGenerator::new(&index)
            .generate(&[date(2026, 3, 6)])
            .unwrap();
        assert!(result.assignments_for("A", date(2026, 3, 10)).is_empty());
    }

    #[test]
    fn test_leave_blocks_later_day_in_run() {
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A", "B"]))
            .with_workplaces(vec![
                night_service(),
                Workplace::new("W1", "CT", WorkplaceCategory::Rotations),
            ]);
        let index = RosterIndex::new(&snapshot);
        let thursday = date(2026, 3, 5);
        let friday = date(2026, 3, 6);

        let result = AutoFillGenerator::new(&index)
            .generate(&[thursday, friday])
            .unwrap();

        // A 週四值班，週五補休，週五的值班與 CT 都不能再排 A
        assert_eq!(positions(&result, "A", thursday), vec!["Nachtdienst"]);
        assert_eq!(positions(&result, "A", friday), vec!["Frei"]);
        assert_eq!(positions(&result, "B", friday), vec!["Nachtdienst"]);
        assert!(result.assignments_at("CT", friday).is_empty());
    }

    #[test]
    fn test_approved_no_service_wish_is_absolute() {
        let day = date(2026, 3, 5);
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A"]))
            .with_workplaces(vec![night_service()])
            .with_wishes(vec![Wish::new(
                "A",
                day,
                WishKind::NoService,
                WishStatus::Approved,
            )]);
        let index = RosterIndex::new(&snapshot);

        let result = AutoFillGenerator::new(&index).generate(&[day]).unwrap();

        assert!(result.assignments.is_empty());
        assert_eq!(result.unfilled.len(), 1);
        assert_eq!(result.unfilled[0].position, "Nachtdienst");
        assert!(result.unfilled[0].below_minimum());
    }

    #[test]
    fn test_service_wish_and_pending_no_service_tiers() {
        let day = date(2026, 3, 5);
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A", "B", "C"]))
            .with_workplaces(vec![night_service()])
            .with_wishes(vec![
                Wish::new("A", day, WishKind::NoService, WishStatus::Pending),
                Wish::new("C", day, WishKind::Service, WishStatus::Pending),
            ]);
        let index = RosterIndex::new(&snapshot);

        let result = AutoFillGenerator::new(&index).generate(&[day]).unwrap();
        assert_eq!(positions(&result, "C", day), vec!["Nachtdienst"]);

        // 沒有服務願望時，待審的不排服務願望讓 A 排到最後
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A", "B"]))
            .with_workplaces(vec![night_service()])
            .with_wishes(vec![Wish::new(
                "A",
                day,
                WishKind::NoService,
                WishStatus::Pending,
            )]);
        let index = RosterIndex::new(&snapshot);

        let result = AutoFillGenerator::new(&index).generate(&[day]).unwrap();
        assert_eq!(positions(&result, "B", day), vec!["Nachtdienst"]);
    }

    #[test]
    fn test_cap_ignored_as_last_resort() {
        let day = date(2026, 3, 5);
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A"]))
            .with_workplaces(vec![night_service()])
            .with_settings(SystemSettings::default().with_service_limits(0, 0, 0));
        let index = RosterIndex::new(&snapshot);

        let result = AutoFillGenerator::new(&index).generate(&[day]).unwrap();

        assert_eq!(positions(&result, "A", day), vec!["Nachtdienst"]);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].subject, "Nachtdienst");
    }

    #[test]
    fn test_fairness_prefers_lower_history() {
        let day = date(2026, 3, 5);
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A", "B"]))
            .with_workplaces(vec![night_service().with_auto_off(false)])
            .with_shifts(vec![ShiftEntry::new("A", date(2026, 3, 1), "Nachtdienst")]);
        let index = RosterIndex::new(&snapshot);

        let result = AutoFillGenerator::new(&index).generate(&[day]).unwrap();
        assert_eq!(positions(&result, "B", day), vec!["Nachtdienst"]);
    }

    #[test]
    fn test_consecutive_day_rule() {
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A", "B"]))
            .with_workplaces(vec![night_service()
                .with_auto_off(false)
                .with_consecutive_days(false)])
            .with_shifts(vec![ShiftEntry::new("A", date(2026, 3, 3), "Nachtdienst")]);
        let index = RosterIndex::new(&snapshot);
        let day = date(2026, 3, 2);

        let result = AutoFillGenerator::new(&index).generate(&[day]).unwrap();
        assert_eq!(positions(&result, "B", day), vec!["Nachtdienst"]);
    }

    #[test]
    fn test_blocking_absence_and_doctor_order() {
        let day = date(2026, 3, 5);
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A", "B", "C"]))
            .with_workplaces(vec![night_service().with_auto_off(false)])
            .with_shifts(vec![ShiftEntry::absence("B", day, Absence::Krank)]);
        let index = RosterIndex::new(&snapshot);

        let result = AutoFillGenerator::new(&index)
            .with_doctor_order(vec!["B".to_string(), "C".to_string(), "X".to_string()])
            .generate(&[day])
            .unwrap();

        assert_eq!(positions(&result, "C", day), vec!["Nachtdienst"]);
        assert!(result.assignments_for("B", day).is_empty());
    }

    #[test]
    fn test_mandatory_coverage_then_supervised_fill() {
        let day = date(2026, 3, 5);
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A", "B"]))
            .with_workplaces(vec![
                Workplace::new("W1", "MRT", WorkplaceCategory::Rotations).with_staffing(1, 2)
            ])
            .with_doctor_qualifications(vec![DoctorQualification::new("B", "Q-MRT")])
            .with_workplace_qualifications(vec![WorkplaceQualification::new(
                "W1",
                "Q-MRT",
                QualificationTier::Mandatory,
            )]);
        let index = RosterIndex::new(&snapshot);

        let result = AutoFillGenerator::new(&index).generate(&[day]).unwrap();
        let at_mrt: Vec<&str> = result
            .assignments_at("MRT", day)
            .into_iter()
            .map(|a| a.doctor_id.as_str())
            .collect();

        assert_eq!(at_mrt, vec!["B", "A"]);
        assert!(result.unfilled.is_empty());
    }

    #[test]
    fn test_unqualified_doctor_left_out_without_supervision() {
        let day = date(2026, 3, 5);
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A"]))
            .with_workplaces(vec![
                Workplace::new("W1", "MRT", WorkplaceCategory::Rotations).with_staffing(1, 2)
            ])
            .with_workplace_qualifications(vec![WorkplaceQualification::new(
                "W1",
                "Q-MRT",
                QualificationTier::Mandatory,
            )]);
        let index = RosterIndex::new(&snapshot);

        let result = AutoFillGenerator::new(&index).generate(&[day]).unwrap();

        assert!(result.assignments.is_empty());
        assert_eq!(result.unfilled.len(), 1);
        assert_eq!(result.unfilled[0].missing(), 2);
    }

    #[test]
    fn test_rotation_target_preferred() {
        let day = date(2026, 3, 5);
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A", "B"]))
            .with_workplaces(vec![
                Workplace::new("W1", "CT", WorkplaceCategory::Rotations)
                    .with_allows_multiple(false)
                    .with_order(1),
                Workplace::new("W2", "MRT", WorkplaceCategory::Rotations)
                    .with_allows_multiple(false)
                    .with_order(2),
            ])
            .with_rotations(vec![TrainingRotation::new(
                "B",
                "CT",
                date(2026, 3, 1),
                date(2026, 3, 31),
            )]);
        let index = RosterIndex::new(&snapshot);

        let result = AutoFillGenerator::new(&index).generate(&[day]).unwrap();

        assert_eq!(positions(&result, "B", day), vec!["CT"]);
        assert_eq!(positions(&result, "A", day), vec!["MRT"]);
    }

    #[test]
    fn test_overfill_into_multi_occupancy_workplaces() {
        let day = date(2026, 3, 5);
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A", "B", "C", "D"]))
            .with_workplaces(vec![
                Workplace::new("W1", "CT", WorkplaceCategory::Rotations).with_order(1),
                Workplace::new("W2", "MRT", WorkplaceCategory::Rotations).with_order(2),
                Workplace::new("W3", "Sono", WorkplaceCategory::Rotations)
                    .with_allows_multiple(false)
                    .with_order(3),
            ]);
        let index = RosterIndex::new(&snapshot);

        let result = AutoFillGenerator::new(&index).generate(&[day]).unwrap();
        let at = |position: &str| -> Vec<String> {
            result
                .assignments_at(position, day)
                .into_iter()
                .map(|a| a.doctor_id.clone())
                .collect()
        };

        // 目標都補滿後，D 超額進入填補率相同、順序最前的 CT；Sono 只允許一人
        assert_eq!(at("CT"), vec!["A", "D"]);
        assert_eq!(at("MRT"), vec!["B"]);
        assert_eq!(at("Sono"), vec!["C"]);
        assert!(result.unfilled.is_empty());
    }

    #[test]
    fn test_displaced_rotation_returns_first() {
        let ct = Workplace::new("W1", "CT", WorkplaceCategory::Rotations)
            .with_active_days(vec![Weekday::Mon, Weekday::Fri])
            .with_allows_multiple(false)
            .with_order(1);
        let mrt = Workplace::new("W2", "MRT", WorkplaceCategory::Rotations)
            .with_allows_multiple(false)
            .with_order(2);
        let rotation = |id: &str| {
            TrainingRotation::new(id, "CT", date(2026, 3, 1), date(2026, 3, 31))
        };
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["B", "C"]))
            .with_workplaces(vec![ct, mrt])
            .with_rotations(vec![rotation("B"), rotation("C")])
            .with_doctor_qualifications(vec![DoctorQualification::new("B", "Q-CT")])
            .with_workplace_qualifications(vec![WorkplaceQualification::new(
                "W1",
                "Q-CT",
                QualificationTier::Preferred,
            )]);
        let index = RosterIndex::new(&snapshot);
        let (thursday, friday, monday) = (date(2026, 3, 5), date(2026, 3, 6), date(2026, 3, 9));

        let result = AutoFillGenerator::new(&index)
            .generate(&[thursday, friday, monday])
            .unwrap();

        // 週四 CT 未開，B 被調去 MRT
        assert_eq!(positions(&result, "B", thursday), vec!["MRT"]);
        // 週五 B 回到 CT，位移歸零；C 改被調去 MRT
        assert_eq!(positions(&result, "B", friday), vec!["CT"]);
        assert_eq!(positions(&result, "C", friday), vec!["MRT"]);
        // 週一被調離過的 C 優先於建議資格較佳的 B
        assert_eq!(positions(&result, "C", monday), vec!["CT"]);
        assert_eq!(positions(&result, "B", monday), vec!["MRT"]);
    }

    #[test]
    fn test_supplementary_phase_shares_qualified_doctor() {
        let day = date(2026, 3, 5);
        let demo = |id: &str, name: &str| {
            Workplace::new(id, name, WorkplaceCategory::Demonstrations)
                .with_affects_availability(false)
        };
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A", "B"]))
            .with_workplaces(vec![
                Workplace::new("W1", "CT", WorkplaceCategory::Rotations).with_staffing(1, 2),
                demo("D1", "Demo Chirurgie"),
                demo("D2", "Demo Innere"),
            ])
            .with_doctor_qualifications(vec![DoctorQualification::new("B", "Q-DEMO")])
            .with_workplace_qualifications(vec![
                WorkplaceQualification::new("D1", "Q-DEMO", QualificationTier::Mandatory),
                WorkplaceQualification::new("D2", "Q-DEMO", QualificationTier::Mandatory),
            ]);
        let index = RosterIndex::new(&snapshot);

        let result = AutoFillGenerator::new(&index).generate(&[day]).unwrap();

        let mut b = positions(&result, "B", day);
        b.sort();
        assert_eq!(b, vec!["CT", "Demo Chirurgie", "Demo Innere"]);
        assert_eq!(positions(&result, "A", day), vec!["CT"]);
    }

    #[test]
    fn test_residual_leave_for_non_service_auto_off() {
        let day = date(2026, 3, 6);
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A"]))
            .with_workplaces(vec![
                Workplace::new("W1", "Spätdienst Ambulanz", WorkplaceCategory::Rotations)
                    .with_auto_off(true),
            ]);
        let index = RosterIndex::new(&snapshot);

        let result = AutoFillGenerator::new(&index).generate(&[day]).unwrap();

        assert_eq!(positions(&result, "A", day), vec!["Spätdienst Ambulanz"]);
        assert_eq!(positions(&result, "A", date(2026, 3, 9)), vec!["Frei"]);
    }

    #[test]
    fn test_generate_is_deterministic() {
        let snapshot = Snapshot::new()
            .with_doctors(doctors(&["A", "B", "C", "D"]))
            .with_workplaces(vec![
                night_service(),
                Workplace::new("W1", "CT", WorkplaceCategory::Rotations).with_staffing(1, 2),
                Workplace::new("W2", "MRT", WorkplaceCategory::Rotations),
            ]);
        let index = RosterIndex::new(&snapshot);
        let days: Vec<NaiveDate> = (2..=8).map(|d| date(2026, 3, d)).collect();

        let first = AutoFillGenerator::new(&index).generate(&days).unwrap();
        let second = AutoFillGenerator::new(&index).generate(&days).unwrap();

        assert_eq!(first.assignments, second.assignments);
        assert_eq!(first.unfilled, second.unfilled);
    }
}
