//! 工作位置模型

use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// 工作位置類別
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkplaceCategory {
    /// 值班服務（Dienste）
    Services,
    /// 輪訓（Rotationen）
    Rotations,
    /// 示教（Demonstrationen）
    Demonstrations,
    /// 自訂類別
    Custom(String),
}

impl WorkplaceCategory {
    /// 類別的設定名稱
    pub fn name(&self) -> &str {
        match self {
            Self::Services => "Dienste",
            Self::Rotations => "Rotationen",
            Self::Demonstrations => "Demonstrationen",
            Self::Custom(name) => name,
        }
    }
}

impl From<String> for WorkplaceCategory {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Dienste" => Self::Services,
            "Rotationen" => Self::Rotations,
            "Demonstrationen" => Self::Demonstrations,
            _ => Self::Custom(value),
        }
    }
}

impl From<WorkplaceCategory> for String {
    fn from(value: WorkplaceCategory) -> Self {
        value.name().to_string()
    }
}

/// 服務類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// 前景服務（在院值班）
    Foreground,
    /// 背景服務（遠端待命）
    Background,
}

/// 工作位置時段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeslot {
    /// 時段ID
    pub id: String,

    /// 顯示標籤
    #[serde(default)]
    pub label: String,

    /// 開始時間
    pub start_time: NaiveTime,

    /// 結束時間（早於或等於開始時間表示跨午夜）
    pub end_time: NaiveTime,
}

impl Timeslot {
    pub fn new(id: impl Into<String>, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            start_time,
            end_time,
        }
    }

    /// 以當日 00:00 起算的分鐘區間 `[start, end)`
    pub fn minute_range(&self) -> (u32, u32) {
        let start = self.start_time.num_seconds_from_midnight() / 60;
        let mut end = self.end_time.num_seconds_from_midnight() / 60;
        if end <= start {
            end += MINUTES_PER_DAY;
        }
        (start, end)
    }

    /// 全天區間
    pub fn full_day() -> (u32, u32) {
        (0, MINUTES_PER_DAY)
    }
}

/// 工作位置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workplace {
    /// 工作位置ID
    pub id: String,

    /// 名稱（班表中的 position 以此對應）
    pub name: String,

    /// 類別
    pub category: WorkplaceCategory,

    /// 啟用的星期；未設定時為週一到週五
    #[serde(default)]
    pub active_days: Option<Vec<Weekday>>,

    /// 是否允許多人佔用；未設定時依類別設定
    #[serde(default)]
    pub allows_multiple: Option<bool>,

    /// 最少人數
    #[serde(default = "default_min_staff")]
    pub min_staff: u32,

    /// 最佳人數；未設定時等於最少人數
    #[serde(default)]
    pub optimal_staff: Option<u32>,

    /// 排入後隔個工作日自動補休
    #[serde(default)]
    pub auto_off: bool,

    /// 是否可與輪訓同日並存
    #[serde(default)]
    pub allows_rotation_concurrently: bool,

    /// 是否允許連續兩天排同一位置
    #[serde(default = "default_true")]
    pub allows_consecutive_days: bool,

    /// 是否影響醫師當日可用性
    #[serde(default = "default_true")]
    pub affects_availability: bool,

    /// 顯示順序
    #[serde(default)]
    pub order: i32,

    /// 明確指定的服務類型；未設定時依 Dienste 中的順序推導
    #[serde(default)]
    pub service_type: Option<ServiceKind>,

    /// 是否啟用時段
    #[serde(default)]
    pub timeslots_enabled: bool,

    /// 時段定義
    #[serde(default)]
    pub timeslots: Vec<Timeslot>,
}

fn default_min_staff() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// 預設啟用日：週一到週五
const DEFAULT_ACTIVE_DAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

impl Workplace {
    /// 創建新的工作位置
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: WorkplaceCategory,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            active_days: None,
            allows_multiple: None,
            min_staff: 1,
            optimal_staff: None,
            auto_off: false,
            allows_rotation_concurrently: false,
            allows_consecutive_days: true,
            affects_availability: true,
            order: 0,
            service_type: None,
            timeslots_enabled: false,
            timeslots: Vec::new(),
        }
    }

    /// 建構器模式：設置啟用星期
    pub fn with_active_days(mut self, days: Vec<Weekday>) -> Self {
        self.active_days = Some(days);
        self
    }

    /// 建構器模式：設置人數
    pub fn with_staffing(mut self, min_staff: u32, optimal_staff: u32) -> Self {
        self.min_staff = min_staff;
        self.optimal_staff = Some(optimal_staff);
        self
    }

    /// 建構器模式：設置是否允許多人
    pub fn with_allows_multiple(mut self, allows: bool) -> Self {
        self.allows_multiple = Some(allows);
        self
    }

    /// 建構器模式：設置自動補休
    pub fn with_auto_off(mut self, auto_off: bool) -> Self {
        self.auto_off = auto_off;
        self
    }

    /// 建構器模式：設置是否可與輪訓並存
    pub fn with_rotation_concurrently(mut self, allows: bool) -> Self {
        self.allows_rotation_concurrently = allows;
        self
    }

    /// 建構器模式：設置是否允許連續日
    pub fn with_consecutive_days(mut self, allows: bool) -> Self {
        self.allows_consecutive_days = allows;
        self
    }

    /// 建構器模式：設置是否影響可用性
    pub fn with_affects_availability(mut self, affects: bool) -> Self {
        self.affects_availability = affects;
        self
    }

    /// 建構器模式：設置顯示順序
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// 建構器模式：設置服務類型
    pub fn with_service_type(mut self, kind: ServiceKind) -> Self {
        self.service_type = Some(kind);
        self
    }

    /// 建構器模式：啟用時段
    pub fn with_timeslots(mut self, timeslots: Vec<Timeslot>) -> Self {
        self.timeslots_enabled = true;
        self.timeslots = timeslots;
        self
    }

    /// 是否為值班服務
    pub fn is_service(&self) -> bool {
        self.category == WorkplaceCategory::Services
    }

    /// 目標人數（最佳人數，不低於最少人數）
    pub fn target_staff(&self) -> u32 {
        self.optimal_staff.unwrap_or(self.min_staff).max(self.min_staff)
    }

    /// 星期是否在啟用日內
    pub fn is_active_weekday(&self, weekday: Weekday) -> bool {
        match &self.active_days {
            Some(days) => days.contains(&weekday),
            None => DEFAULT_ACTIVE_DAYS.contains(&weekday),
        }
    }

    /// 查找時段
    pub fn timeslot(&self, timeslot_id: &str) -> Option<&Timeslot> {
        self.timeslots.iter().find(|t| t.id == timeslot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip_names() {
        let custom: WorkplaceCategory = "Sonografie".to_string().into();
        assert_eq!(custom, WorkplaceCategory::Custom("Sonografie".to_string()));
        assert_eq!(
            WorkplaceCategory::from("Dienste".to_string()),
            WorkplaceCategory::Services
        );
        assert_eq!(WorkplaceCategory::Demonstrations.name(), "Demonstrationen");
    }

    #[test]
    fn test_target_staff() {
        let ct = Workplace::new("W1", "CT", WorkplaceCategory::Rotations).with_staffing(1, 2);
        let mrt = Workplace::new("W2", "MRT", WorkplaceCategory::Rotations).with_staffing(2, 1);
        let plain = Workplace::new("W3", "Angio", WorkplaceCategory::Rotations);

        assert_eq!(ct.target_staff(), 2);
        assert_eq!(mrt.target_staff(), 2);
        assert_eq!(plain.target_staff(), 1);
    }

    #[test]
    fn test_default_active_days() {
        let wp = Workplace::new("W1", "CT", WorkplaceCategory::Rotations);
        assert!(wp.is_active_weekday(Weekday::Mon));
        assert!(!wp.is_active_weekday(Weekday::Sat));

        let night = Workplace::new("S1", "Nachtdienst", WorkplaceCategory::Services)
            .with_active_days(vec![Weekday::Sat, Weekday::Sun]);
        assert!(night.is_active_weekday(Weekday::Sun));
        assert!(!night.is_active_weekday(Weekday::Mon));
    }

    #[test]
    fn test_timeslot_over_midnight() {
        let late = Timeslot::new(
            "late",
            NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        );
        assert_eq!(late.minute_range(), (1200, 1920));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let wp: Workplace = serde_json::from_str(
            r#"{"id": "W1", "name": "CT", "category": "Rotationen", "active_days": ["Mon", "Tue"]}"#,
        )
        .unwrap();

        assert_eq!(wp.category, WorkplaceCategory::Rotations);
        assert_eq!(wp.min_staff, 1);
        assert!(wp.affects_availability);
        assert!(wp.allows_consecutive_days);
        assert!(wp.is_active_weekday(Weekday::Tue));
        assert!(!wp.is_active_weekday(Weekday::Wed));
    }
}
