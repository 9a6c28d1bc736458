//! 服務上限與計數
//!
//! 滾動視窗 `[date - (window - 1), date]` 內，依 FTE 縮放的前景、背景服務上限，
//! 以及週末前景服務的子上限。計數包含快照中的歷史記錄與本次執行已產生的建議。

use chrono::NaiveDate;
use roster_core::{Doctor, HolidayCalendar, ServiceKind};

use crate::predicates::RosterIndex;
use crate::SuggestedAssignment;

/// 視窗內的服務計數
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceCount {
    /// 該類型服務總數
    pub total: u32,
    /// 其中落在週末或假日的數量
    pub weekend: u32,
}

/// 上限檢查結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitStatus {
    pub kind: ServiceKind,
    pub count: ServiceCount,
    /// FTE 縮放後的上限
    pub cap: u32,
    /// FTE 縮放後的週末上限（僅前景服務）
    pub weekend_cap: Option<u32>,
    /// 目標日是否為週末或假日
    pub on_weekend: bool,
}

impl LimitStatus {
    /// 再排一次是否超過上限
    pub fn exceeds_total(&self) -> bool {
        self.count.total + 1 > self.cap
    }

    /// 再排一次是否超過週末上限
    pub fn exceeds_weekend(&self) -> bool {
        match self.weekend_cap {
            Some(cap) if self.on_weekend => self.count.weekend + 1 > cap,
            _ => false,
        }
    }

    pub fn exceeds(&self) -> bool {
        self.exceeds_total() || self.exceeds_weekend()
    }
}

/// 服務上限計算器
pub struct ServiceLimits;

impl ServiceLimits {
    /// 視窗起始日
    pub fn window_start(index: &RosterIndex<'_>, date: NaiveDate) -> NaiveDate {
        let span = index.settings().service_window_days.saturating_sub(1);
        HolidayCalendar::days_before(date, span).unwrap_or(NaiveDate::MIN)
    }

    /// FTE 縮放後的服務上限
    pub fn cap(index: &RosterIndex<'_>, doctor: &Doctor, kind: ServiceKind) -> u32 {
        let settings = index.settings();
        match kind {
            ServiceKind::Foreground => doctor.scaled_limit(settings.limit_fore_services),
            ServiceKind::Background => doctor.scaled_limit(settings.limit_back_services),
        }
    }

    /// 視窗內某類型服務的計數
    pub fn count(
        index: &RosterIndex<'_>,
        doctor_id: &str,
        kind: ServiceKind,
        date: NaiveDate,
        planned: &[SuggestedAssignment],
    ) -> ServiceCount {
        let start = Self::window_start(index, date);
        let calendar = index.calendar();
        let mut count = ServiceCount::default();

        let historical = index
            .entries_of(doctor_id)
            .iter()
            .map(|e| (e.date, e.position.as_str()));
        let run = planned
            .iter()
            .filter(|a| a.doctor_id == doctor_id)
            .map(|a| (a.date, a.position.as_str()));

        for (day, position) in historical.chain(run) {
            if day < start || day > date {
                continue;
            }
            let matches = index
                .workplace(position)
                .and_then(|w| index.service_kind(w))
                .is_some_and(|k| k == kind);
            if matches {
                count.total += 1;
                if calendar.is_weekend_or_holiday(day) {
                    count.weekend += 1;
                }
            }
        }

        count
    }

    /// 視窗內同一位置的計數（用於非服務位置的公平性）
    pub fn position_count(
        index: &RosterIndex<'_>,
        doctor_id: &str,
        position: &str,
        date: NaiveDate,
        planned: &[SuggestedAssignment],
    ) -> u32 {
        let start = Self::window_start(index, date);
        let in_window = |day: NaiveDate| day >= start && day <= date;

        let historical = index
            .entries_of(doctor_id)
            .iter()
            .filter(|e| e.position == position && in_window(e.date))
            .count();
        let run = planned
            .iter()
            .filter(|a| a.doctor_id == doctor_id && a.position == position && in_window(a.date))
            .count();

        (historical + run) as u32
    }

    /// 上限檢查
    pub fn check(
        index: &RosterIndex<'_>,
        doctor: &Doctor,
        kind: ServiceKind,
        date: NaiveDate,
        planned: &[SuggestedAssignment],
    ) -> LimitStatus {
        let weekend_cap = match kind {
            ServiceKind::Foreground => {
                Some(doctor.scaled_limit(index.settings().limit_weekend_services))
            }
            ServiceKind::Background => None,
        };

        LimitStatus {
            kind,
            count: Self::count(index, &doctor.id, kind, date, planned),
            cap: Self::cap(index, doctor, kind),
            weekend_cap,
            on_weekend: index.calendar().is_weekend_or_holiday(date),
        }
    }

    /// FTE 調整後的公平性計數：服務依類型計，其餘依位置計
    pub fn fairness_count(
        index: &RosterIndex<'_>,
        doctor: &Doctor,
        position: &str,
        date: NaiveDate,
        planned: &[SuggestedAssignment],
    ) -> f64 {
        let kind = index.workplace(position).and_then(|w| index.service_kind(w));
        let raw = match kind {
            Some(kind) => Self::count(index, &doctor.id, kind, date, planned).total,
            None => Self::position_count(index, &doctor.id, position, date, planned),
        };
        doctor.fte_adjusted(raw)
    }
}
