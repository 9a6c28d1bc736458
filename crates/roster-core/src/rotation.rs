//! 輪訓模型

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 輪訓：醫師在日期區間內的目標模組
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRotation {
    pub doctor_id: String,
    /// 模組名稱（通常即工作位置名稱，必要時經別名轉換）
    pub modality: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl TrainingRotation {
    pub fn new(
        doctor_id: impl Into<String>,
        modality: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            doctor_id: doctor_id.into(),
            modality: modality.into(),
            start_date,
            end_date,
        }
    }

    /// 日期是否在輪訓區間內（含首尾）
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers_inclusive() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 27).unwrap();
        let rotation = TrainingRotation::new("D1", "CT", start, end);

        assert!(rotation.covers(start));
        assert!(rotation.covers(end));
        assert!(!rotation.covers(end.succ_opt().unwrap()));
    }
}
