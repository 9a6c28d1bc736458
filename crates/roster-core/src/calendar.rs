//! 節假日日曆

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::{Result, RosterError};

/// 節假日日曆
///
/// 對外提供 `is_public_holiday` 查詢；假日資料由外部系統載入，核心只負責判斷。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayCalendar {
    /// 工作日（週一到週日，true表示工作日）
    /// 索引 0 = 週一, 1 = 週二, ..., 6 = 週日
    pub working_days: [bool; 7],

    /// 國定假日列表
    pub holidays: Vec<NaiveDate>,

    /// 日曆ID
    pub calendar_id: String,
}

impl HolidayCalendar {
    /// 創建新的日曆（預設週一到週五為工作日）
    pub fn new(calendar_id: String) -> Self {
        Self {
            working_days: [true, true, true, true, true, false, false],
            holidays: Vec::new(),
            calendar_id,
        }
    }

    /// 建構器模式：設置工作日
    pub fn with_working_days(mut self, working_days: [bool; 7]) -> Self {
        self.working_days = working_days;
        self
    }

    /// 建構器模式：設置國定假日
    pub fn with_holidays(mut self, mut holidays: Vec<NaiveDate>) -> Self {
        holidays.sort();
        holidays.dedup();
        self.holidays = holidays;
        self
    }

    /// 添加國定假日
    pub fn add_holiday(&mut self, date: NaiveDate) {
        if let Err(pos) = self.holidays.binary_search(&date) {
            self.holidays.insert(pos, date);
        }
    }

    /// 檢查是否為國定假日
    pub fn is_public_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.binary_search(&date).is_ok()
    }

    /// 檢查是否為週末（週六、週日）
    pub fn is_weekend(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// 週末或國定假日
    pub fn is_weekend_or_holiday(&self, date: NaiveDate) -> bool {
        Self::is_weekend(date) || self.is_public_holiday(date)
    }

    /// 檢查是否為工作日
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        if self.is_public_holiday(date) {
            return false;
        }

        let weekday_index = date.weekday().num_days_from_monday() as usize;
        self.working_days[weekday_index]
    }

    /// 有效星期：國定假日視為週日
    pub fn effective_weekday(&self, date: NaiveDate) -> Weekday {
        if self.is_public_holiday(date) {
            Weekday::Sun
        } else {
            date.weekday()
        }
    }

    /// 向後搜尋下一個工作日（不含起始日），最多搜尋 `max_days` 天
    ///
    /// 搜尋範圍內沒有工作日時返回 `None`。
    pub fn next_working_day(&self, date: NaiveDate, max_days: u32) -> Result<Option<NaiveDate>> {
        let mut current = date;
        for _ in 0..max_days {
            current = current
                .succ_opt()
                .ok_or(RosterError::DateOverflow(current))?;
            if self.is_working_day(current) {
                return Ok(Some(current));
            }
        }
        Ok(None)
    }

    /// 向前推算 `days` 天（日曆日）
    pub fn days_before(date: NaiveDate, days: u32) -> Result<NaiveDate> {
        date.checked_sub_days(chrono::Days::new(u64::from(days)))
            .ok_or(RosterError::DateOverflow(date))
    }

    /// 產生 `start..=end` 的每日列表
    pub fn days_between(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        let mut days = Vec::new();
        let mut current = start;
        while current <= end {
            days.push(current);
            current = current
                .succ_opt()
                .ok_or(RosterError::DateOverflow(current))?;
        }
        Ok(days)
    }
}

impl Default for HolidayCalendar {
    fn default() -> Self {
        Self::new("DEFAULT".to_string())
    }
}
