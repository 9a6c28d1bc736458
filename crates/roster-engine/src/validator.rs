//! 約束驗證器
//!
//! 手動編輯前對單筆指派做同步檢查，不修改任何狀態。檢查依序執行：
//! 1. 缺勤衝突
//! 2. 服務／輪訓互斥
//! 3. 連續日限制
//! 4. 服務上限（只警告）
//! 5. 缺勤後的最少在場人數（只警告）
//! 6. 四層級資格
//! 7. 時段重疊
//!
//! 遇到第一個阻擋即停止；警告一律累積。

use chrono::NaiveDate;
use roster_core::{Absence, Doctor, ShiftEntry, Timeslot, Workplace};
use serde::Serialize;

use crate::limits::ServiceLimits;
use crate::predicates::RosterIndex;

/// 提議的單筆指派
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedAssignment {
    pub doctor_id: String,
    pub date: NaiveDate,
    /// 工作位置名稱或缺勤名稱
    pub position: String,
    pub timeslot_id: Option<String>,
}

impl ProposedAssignment {
    pub fn new(doctor_id: impl Into<String>, date: NaiveDate, position: impl Into<String>) -> Self {
        Self {
            doctor_id: doctor_id.into(),
            date,
            position: position.into(),
            timeslot_id: None,
        }
    }

    /// 建構器模式：設置時段
    pub fn with_timeslot(mut self, timeslot_id: impl Into<String>) -> Self {
        self.timeslot_id = Some(timeslot_id.into());
        self
    }
}

/// 違規類別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// 同一筆記錄已存在
    DuplicateAssignment,
    /// 當日有阻擋型缺勤
    AbsenceConflict,
    /// 當日有非阻擋缺勤，或提議缺勤時已有工作
    AbsenceNotice,
    /// 服務與輪訓互斥
    ServiceRotationConflict,
    /// 不允許連續日
    ConsecutiveDays,
    /// 超過滾動視窗服務上限
    ServiceLimit,
    /// 超過週末服務上限
    WeekendLimit,
    /// 缺勤後低於最少在場人數
    MinimumStaffing,
    /// 持有排除資格
    Excluded,
    /// 缺少必須資格
    MissingQualification,
    /// 持有不建議資格
    DiscouragedQualification,
    /// 缺少建議資格
    MissingOptionalQualification,
    /// 時段重疊
    TimeslotOverlap,
    /// 未知的位置
    UnknownPosition,
}

/// 違規項目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    /// 可讀的說明
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// 驗證結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub can_proceed: bool,
    pub blockers: Vec<Violation>,
    pub warnings: Vec<Violation>,
}

impl ValidationOutcome {
    fn new() -> Self {
        Self {
            can_proceed: true,
            blockers: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn block(mut self, violation: Violation) -> Self {
        tracing::debug!("驗證阻擋：{}", violation.message);
        self.can_proceed = false;
        self.blockers.push(violation);
        self
    }

    /// 是否含有某類別的阻擋
    pub fn is_blocked_by(&self, kind: ViolationKind) -> bool {
        self.blockers.iter().any(|v| v.kind == kind)
    }

    /// 是否含有某類別的警告
    pub fn has_warning(&self, kind: ViolationKind) -> bool {
        self.warnings.iter().any(|v| v.kind == kind)
    }
}

/// 約束驗證器
pub struct ConstraintValidator<'i, 'a> {
    index: &'i RosterIndex<'a>,
}

impl<'i, 'a> ConstraintValidator<'i, 'a> {
    pub fn new(index: &'i RosterIndex<'a>) -> Self {
        Self { index }
    }

    /// 驗證單筆提議
    pub fn validate(&self, proposal: &ProposedAssignment) -> ValidationOutcome {
        let index = self.index;
        let mut outcome = ValidationOutcome::new();

        let fallback;
        let doctor = match index.doctor(&proposal.doctor_id) {
            Some(doctor) => doctor,
            None => {
                fallback = Doctor::new(proposal.doctor_id.clone(), "");
                &fallback
            }
        };

        if let Some(blocker) = self.check_duplicate(proposal) {
            return outcome.block(blocker);
        }

        if let Some(absence) = Absence::from_position(&proposal.position) {
            self.check_proposed_absence(proposal, doctor, absence, &mut outcome.warnings);
            return outcome;
        }

        let Some(workplace) = index.workplace(&proposal.position) else {
            outcome.warnings.push(Violation::new(
                ViolationKind::UnknownPosition,
                format!("未知的位置：{}", proposal.position),
            ));
            return outcome;
        };

        // 1. 缺勤衝突
        if let Some(blocker) = self.check_absence(proposal, &mut outcome.warnings) {
            return outcome.block(blocker);
        }

        // 2. 服務／輪訓互斥
        if let Some(blocker) = self.check_same_day_conflict(proposal, workplace) {
            return outcome.block(blocker);
        }

        // 3. 連續日
        if let Some(blocker) = self.check_consecutive_days(proposal, workplace) {
            return outcome.block(blocker);
        }

        // 4. 服務上限
        self.check_limits(proposal, doctor, workplace, &mut outcome.warnings);

        // 6. 資格
        if let Some(blocker) = self.check_qualification(proposal, workplace, &mut outcome.warnings) {
            return outcome.block(blocker);
        }

        // 7. 時段
        if let Some(blocker) = self.check_timeslots(proposal, workplace) {
            return outcome.block(blocker);
        }

        outcome
    }

    fn check_duplicate(&self, proposal: &ProposedAssignment) -> Option<Violation> {
        let duplicate = self
            .index
            .entries_on(&proposal.doctor_id, proposal.date)
            .iter()
            .any(|e| e.position == proposal.position && e.timeslot_id == proposal.timeslot_id);

        duplicate.then(|| {
            Violation::new(
                ViolationKind::DuplicateAssignment,
                format!(
                    "{} 於 {} 已排 {}",
                    proposal.doctor_id, proposal.date, proposal.position
                ),
            )
        })
    }

    fn check_absence(
        &self,
        proposal: &ProposedAssignment,
        warnings: &mut Vec<Violation>,
    ) -> Option<Violation> {
        let settings = self.index.settings();
        for entry in self.index.entries_on(&proposal.doctor_id, proposal.date) {
            if !entry.is_absence() {
                continue;
            }
            if settings.is_blocking_absence(&entry.position) {
                return Some(Violation::new(
                    ViolationKind::AbsenceConflict,
                    format!(
                        "{} 於 {} 為 {}",
                        proposal.doctor_id, proposal.date, entry.position
                    ),
                ));
            }
            warnings.push(Violation::new(
                ViolationKind::AbsenceNotice,
                format!(
                    "{} 於 {} 有 {}（非阻擋）",
                    proposal.doctor_id, proposal.date, entry.position
                ),
            ));
        }
        None
    }

    /// 提議缺勤：已有工作時警告，並模擬最少在場人數
    fn check_proposed_absence(
        &self,
        proposal: &ProposedAssignment,
        doctor: &Doctor,
        absence: Absence,
        warnings: &mut Vec<Violation>,
    ) {
        let work: Vec<&str> = self
            .index
            .entries_on(&proposal.doctor_id, proposal.date)
            .iter()
            .filter(|e| !e.is_absence())
            .map(|e| e.position.as_str())
            .collect();
        if !work.is_empty() {
            warnings.push(Violation::new(
                ViolationKind::AbsenceNotice,
                format!(
                    "{} 於 {} 已排 {}，仍要登記 {}",
                    proposal.doctor_id,
                    proposal.date,
                    work.join(", "),
                    absence.position()
                ),
            ));
        }

        // 5. 最少在場人數
        if let Some(warning) = self.check_minimum_staffing(proposal, doctor) {
            warnings.push(warning);
        }
    }

    fn check_minimum_staffing(
        &self,
        proposal: &ProposedAssignment,
        doctor: &Doctor,
    ) -> Option<Violation> {
        let index = self.index;
        let settings = index.settings();
        let date = proposal.date;
        if !index.calendar().is_working_day(date) {
            return None;
        }

        let specialist = index.is_specialist(doctor);
        let (label, minimum) = if specialist {
            ("專科醫師", settings.min_present_specialists)
        } else if index.is_assistant(doctor) {
            ("住院醫師", settings.min_present_assistants)
        } else {
            return None;
        };
        if minimum == 0 {
            return None;
        }

        let in_group = |d: &Doctor| {
            if specialist {
                index.is_specialist(d)
            } else {
                index.is_assistant(d)
            }
        };
        let present = index
            .doctors()
            .iter()
            .filter(|d| in_group(*d) && d.id != doctor.id)
            .filter(|d| index.absence_on(&d.id, date).is_none())
            .count() as u32;

        (present < minimum).then(|| {
            Violation::new(
                ViolationKind::MinimumStaffing,
                format!(
                    "{} 在場{}將只剩 {} 位（最少 {} 位）",
                    date, label, present, minimum
                ),
            )
        })
    }

    fn check_same_day_conflict(
        &self,
        proposal: &ProposedAssignment,
        workplace: &Workplace,
    ) -> Option<Violation> {
        let index = self.index;
        index
            .entries_on(&proposal.doctor_id, proposal.date)
            .iter()
            .filter_map(|e| index.workplace(&e.position))
            .find(|held| index.same_day_conflict(held, workplace))
            .map(|held| {
                Violation::new(
                    ViolationKind::ServiceRotationConflict,
                    format!(
                        "{} 於 {} 已排 {}，不可同時排 {}",
                        proposal.doctor_id, proposal.date, held.name, workplace.name
                    ),
                )
            })
    }

    fn check_consecutive_days(
        &self,
        proposal: &ProposedAssignment,
        workplace: &Workplace,
    ) -> Option<Violation> {
        if !workplace.is_service() || workplace.allows_consecutive_days {
            return None;
        }
        [proposal.date.pred_opt(), proposal.date.succ_opt()]
            .into_iter()
            .flatten()
            .find(|day| {
                self.index
                    .has_position_on(&proposal.doctor_id, *day, &workplace.name)
            })
            .map(|day| {
                Violation::new(
                    ViolationKind::ConsecutiveDays,
                    format!(
                        "{} 不允許連續排班：{} 已於 {} 排班",
                        workplace.name, proposal.doctor_id, day
                    ),
                )
            })
    }

    fn check_limits(
        &self,
        proposal: &ProposedAssignment,
        doctor: &Doctor,
        workplace: &Workplace,
        warnings: &mut Vec<Violation>,
    ) {
        let Some(kind) = self.index.service_kind(workplace) else {
            return;
        };
        let status = ServiceLimits::check(self.index, doctor, kind, proposal.date, &[]);

        if status.exceeds_total() {
            warnings.push(Violation::new(
                ViolationKind::ServiceLimit,
                format!(
                    "{} 的 {} 將達 {} 次，超過上限 {}",
                    doctor.id,
                    workplace.name,
                    status.count.total + 1,
                    status.cap
                ),
            ));
        }
        if status.exceeds_weekend() {
            warnings.push(Violation::new(
                ViolationKind::WeekendLimit,
                format!(
                    "{} 的週末服務將達 {} 次，超過上限 {}",
                    doctor.id,
                    status.count.weekend + 1,
                    status.weekend_cap.unwrap_or(0)
                ),
            ));
        }
    }

    fn check_qualification(
        &self,
        proposal: &ProposedAssignment,
        workplace: &Workplace,
        warnings: &mut Vec<Violation>,
    ) -> Option<Violation> {
        let index = self.index;
        let quals = index.qualifications();
        let doctor_id = proposal.doctor_id.as_str();

        if index.is_excluded(doctor_id, workplace) {
            return Some(Violation::new(
                ViolationKind::Excluded,
                format!("{} 持有 {} 的排除資格", doctor_id, workplace.name),
            ));
        }

        if self.is_supervised(proposal, workplace) {
            return None;
        }

        let missing = quals.missing_mandatory(doctor_id, &workplace.id);
        if !missing.is_empty() {
            return Some(Violation::new(
                ViolationKind::MissingQualification,
                format!(
                    "{} 缺少 {} 的必須資格：{}",
                    doctor_id,
                    workplace.name,
                    missing.join(", ")
                ),
            ));
        }

        if quals.holds_discouraged(doctor_id, &workplace.id) {
            warnings.push(Violation::new(
                ViolationKind::DiscouragedQualification,
                format!("{} 持有 {} 不建議的資格", doctor_id, workplace.name),
            ));
        }

        let optional = &quals.requirements(&workplace.id).optional;
        if !optional.is_empty() && !quals.has_optional_quals(doctor_id, &workplace.id) {
            warnings.push(Violation::new(
                ViolationKind::MissingOptionalQualification,
                format!("{} 未持有 {} 的全部建議資格", doctor_id, workplace.name),
            ));
        }

        None
    }

    /// 可多人位置已有完全符合資格的同事時，不檢查新成員的資格
    fn is_supervised(&self, proposal: &ProposedAssignment, workplace: &Workplace) -> bool {
        let index = self.index;
        index.allows_multiple(workplace)
            && index
                .entries_at(&workplace.name, proposal.date)
                .iter()
                .filter(|e| e.doctor_id != proposal.doctor_id)
                .any(|e| {
                    index
                        .qualifications()
                        .fully_satisfies(&e.doctor_id, &workplace.id)
                })
    }

    fn check_timeslots(
        &self,
        proposal: &ProposedAssignment,
        workplace: &Workplace,
    ) -> Option<Violation> {
        let index = self.index;
        let range = minute_range(workplace, proposal.timeslot_id.as_deref())?;
        let tolerance = index.settings().timeslot_overlap_tolerance_minutes;

        index
            .entries_on(&proposal.doctor_id, proposal.date)
            .iter()
            .filter(|e| !e.is_absence())
            .find_map(|entry| {
                let other = index.workplace(&entry.position)?;
                let other_range = entry_range(other, entry)?;
                let overlap = overlap_minutes(range, other_range);
                (overlap > tolerance).then(|| {
                    Violation::new(
                        ViolationKind::TimeslotOverlap,
                        format!(
                            "{} 與 {} 的時段重疊 {} 分鐘",
                            workplace.name, entry.position, overlap
                        ),
                    )
                })
            })
    }
}

/// 指定時段的分鐘區間；位置啟用時段但未指定時視為全天
fn minute_range(workplace: &Workplace, timeslot_id: Option<&str>) -> Option<(u32, u32)> {
    match timeslot_id.and_then(|id| workplace.timeslot(id)) {
        Some(slot) => Some(slot.minute_range()),
        None if workplace.timeslots_enabled => Some(Timeslot::full_day()),
        None => None,
    }
}

fn entry_range(workplace: &Workplace, entry: &ShiftEntry) -> Option<(u32, u32)> {
    minute_range(workplace, entry.timeslot_id.as_deref())
}

fn overlap_minutes(a: (u32, u32), b: (u32, u32)) -> u32 {
    a.1.min(b.1).saturating_sub(a.0.max(b.0))
}
