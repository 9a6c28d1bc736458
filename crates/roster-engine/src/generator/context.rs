//! 單次執行的可變狀態
//!
//! 整個執行期間共用一個 `RunContext`，每日開始時重建 `DayState`。
//! 產生器結束後即丟棄，不跨呼叫保留。

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use roster_core::{Doctor, Workplace};

use crate::predicates::RosterIndex;
use crate::{PlanWarning, SuggestedAssignment, UnfilledSlot};

/// 當日狀態
#[derive(Debug, Default)]
pub(crate) struct DayState<'a> {
    pub date: Option<NaiveDate>,

    /// 因缺勤或自動補休而當日不可排的醫師
    pub blocked: HashSet<&'a str>,

    /// 醫師當日已佔用的工作位置（既有記錄與本次指派）
    pub held: HashMap<&'a str, Vec<&'a Workplace>>,

    /// 位置當日人數
    pub fill: HashMap<&'a str, u32>,

    /// 位置當日成員
    pub members: HashMap<&'a str, Vec<&'a str>>,
}

/// 執行狀態
#[derive(Debug, Default)]
pub(crate) struct RunContext<'a> {
    pub assignments: Vec<SuggestedAssignment>,
    pub unfilled: Vec<UnfilledSlot>,
    pub warnings: Vec<PlanWarning>,

    /// 自動補休造成的未來阻擋
    pub leave_blocked: HashMap<NaiveDate, HashSet<String>>,

    /// 本次執行中每位醫師的指派次數
    pub run_counts: HashMap<String, u32>,

    /// 每位醫師被調離輪訓目標的次數
    pub displacements: HashMap<String, u32>,

    pub day: DayState<'a>,
}

impl<'a> RunContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 目前處理的日期
    pub fn date(&self) -> NaiveDate {
        self.day.date.unwrap_or(NaiveDate::MIN)
    }

    /// 建立當日狀態：既有記錄計入人數與佔用，任何缺勤與自動補休皆阻擋
    pub fn begin_day(&mut self, index: &RosterIndex<'a>, date: NaiveDate) {
        let mut day = DayState {
            date: Some(date),
            ..DayState::default()
        };

        let leave = self.leave_blocked.get(&date);
        for doctor in index.doctors() {
            let id = doctor.id.as_str();
            if leave.is_some_and(|ids| ids.contains(id)) {
                day.blocked.insert(id);
            }
            for &entry in index.entries_on(id, date) {
                if entry.is_absence() {
                    day.blocked.insert(id);
                } else if let Some(workplace) = index.workplace(&entry.position) {
                    day.held.entry(id).or_default().push(workplace);
                }
            }
        }

        for workplace in &index.snapshot().workplaces {
            let entries = index.entries_at(&workplace.name, date);
            if entries.is_empty() {
                continue;
            }
            day.fill
                .insert(workplace.name.as_str(), entries.len() as u32);
            day.members.insert(
                workplace.name.as_str(),
                entries.iter().map(|e| e.doctor_id.as_str()).collect(),
            );
        }

        self.day = day;
    }

    /// 記錄一筆指派並更新當日狀態
    pub fn assign(&mut self, doctor: &'a Doctor, workplace: &'a Workplace) {
        let date = self.date();
        tracing::debug!("{} 指派 {} → {}", date, doctor.id, workplace.name);

        self.assignments
            .push(SuggestedAssignment::new(date, &workplace.name, &doctor.id));
        *self.run_counts.entry(doctor.id.clone()).or_default() += 1;

        let day = &mut self.day;
        day.held.entry(doctor.id.as_str()).or_default().push(workplace);
        *day.fill.entry(workplace.name.as_str()).or_default() += 1;
        day.members
            .entry(workplace.name.as_str())
            .or_default()
            .push(doctor.id.as_str());
    }

    pub fn is_blocked(&self, doctor_id: &str) -> bool {
        self.day.blocked.contains(doctor_id)
    }

    /// 醫師當日佔用的工作位置
    pub fn held(&self, doctor_id: &str) -> &[&'a Workplace] {
        self.day
            .held
            .get(doctor_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn fill(&self, position: &str) -> u32 {
        self.day.fill.get(position).copied().unwrap_or(0)
    }

    pub fn members(&self, position: &str) -> &[&'a str] {
        self.day
            .members
            .get(position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_member(&self, doctor_id: &str, position: &str) -> bool {
        self.members(position).iter().any(|m| *m == doctor_id)
    }

    pub fn run_count(&self, doctor_id: &str) -> u32 {
        self.run_counts.get(doctor_id).copied().unwrap_or(0)
    }

    pub fn displacement(&self, doctor_id: &str) -> u32 {
        self.displacements.get(doctor_id).copied().unwrap_or(0)
    }

    /// 本次執行中醫師在某日是否已有任何建議
    pub fn has_planned_on(&self, doctor_id: &str, date: NaiveDate) -> bool {
        self.assignments
            .iter()
            .any(|a| a.doctor_id == doctor_id && a.date == date)
    }

    /// 本次執行中醫師在某日是否已排該位置
    pub fn has_planned_position(&self, doctor_id: &str, date: NaiveDate, position: &str) -> bool {
        self.assignments
            .iter()
            .any(|a| a.doctor_id == doctor_id && a.date == date && a.position == position)
    }

    /// 記錄當日未補滿的位置
    pub fn record_unfilled(&mut self, index: &RosterIndex<'a>) {
        let date = self.date();
        let workplaces = index.services().iter().chain(index.non_services());
        for &workplace in workplaces {
            if !index.is_active_on_date(workplace, date) {
                continue;
            }
            let filled = self.fill(&workplace.name);
            let target = workplace.target_staff();
            if filled < target {
                tracing::debug!(
                    "{} {} 未補滿：{}/{}（最少 {}）",
                    date,
                    workplace.name,
                    filled,
                    target,
                    workplace.min_staff
                );
                self.unfilled.push(UnfilledSlot {
                    date,
                    position: workplace.name.clone(),
                    filled,
                    minimum: workplace.min_staff,
                    target,
                });
            }
        }
    }
}
