//! 系統設定模型

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Absence, Result, RosterError};

/// 工作位置類別設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// 類別名稱（如 Dienste、Rotationen）
    pub name: String,

    /// 該類別的工作位置是否允許多人同時佔用
    #[serde(default, alias = "allowsMultiple")]
    pub allows_multiple: bool,
}

/// 歷史上存在兩種 JSON 形狀：字串陣列與物件陣列
#[derive(Deserialize)]
#[serde(untagged)]
enum CategoryBlobEntry {
    Name(String),
    Full {
        name: String,
        #[serde(default, alias = "allowsMultiple")]
        allows_multiple: bool,
    },
}

/// 設定中的 categories 欄位：已解析的陣列，或仍以 JSON 文字保存的舊格式
#[derive(Deserialize)]
#[serde(untagged)]
enum CategoryField {
    Blob(String),
    Entries(Vec<CategoryBlobEntry>),
}

fn deserialize_categories<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<CategoryConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let configs = match CategoryField::deserialize(deserializer)? {
        CategoryField::Blob(blob) => CategoryConfig::from_json_blob(&blob),
        CategoryField::Entries(entries) => CategoryConfig::normalize(entries),
    };
    configs.map_err(serde::de::Error::custom)
}

impl CategoryConfig {
    /// 創建新的類別設定
    pub fn new(name: impl Into<String>, allows_multiple: bool) -> Self {
        Self {
            name: name.into(),
            allows_multiple,
        }
    }

    /// 從設定欄位的 JSON 文字解析類別列表
    ///
    /// 接受 `["Dienste", "Rotationen"]` 與
    /// `[{"name": "Dienste", "allows_multiple": false}]` 兩種形狀（可混用）。
    /// 空白文字視為沒有自訂類別。
    pub fn from_json_blob(blob: &str) -> Result<Vec<CategoryConfig>> {
        if blob.trim().is_empty() {
            return Ok(Vec::new());
        }

        let entries: Vec<CategoryBlobEntry> = serde_json::from_str(blob)?;
        Self::normalize(entries)
    }

    fn normalize(entries: Vec<CategoryBlobEntry>) -> Result<Vec<CategoryConfig>> {
        let mut configs: Vec<CategoryConfig> = Vec::with_capacity(entries.len());

        for entry in entries {
            let config = match entry {
                CategoryBlobEntry::Name(name) => CategoryConfig::new(name, false),
                CategoryBlobEntry::Full {
                    name,
                    allows_multiple,
                } => CategoryConfig::new(name, allows_multiple),
            };

            if config.name.trim().is_empty() {
                return Err(RosterError::InvalidConfig("類別名稱不可為空".to_string()));
            }

            // 重複名稱以後者為準
            match configs.iter_mut().find(|c| c.name == config.name) {
                Some(existing) => *existing = config,
                None => configs.push(config),
            }
        }

        Ok(configs)
    }
}

/// 排班系統設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    /// 前景服務（第一順位 Dienst）每 28 天上限（以 FTE 1.0 計）
    pub limit_fore_services: u32,

    /// 背景服務（第二順位 Dienst）每 28 天上限
    pub limit_back_services: u32,

    /// 週末前景服務上限
    pub limit_weekend_services: u32,

    /// 最少在場專科醫師人數
    pub min_present_specialists: u32,

    /// 最少在場住院醫師人數
    pub min_present_assistants: u32,

    /// 類別設定（已正規化）
    #[serde(deserialize_with = "deserialize_categories")]
    pub categories: Vec<CategoryConfig>,

    /// 視為阻擋的缺勤位置
    pub blocking_absences: Vec<String>,

    /// 視為專科醫師的角色
    pub specialist_roles: Vec<String>,

    /// 視為住院醫師的角色
    pub assistant_roles: Vec<String>,

    /// 輪訓模組名稱 → 工作位置名稱
    pub rotation_aliases: BTreeMap<String, String>,

    /// 服務計數的滾動視窗（天）
    pub service_window_days: u32,

    /// 自動補休的最大向後搜尋天數
    pub auto_off_search_days: u32,

    /// 時段重疊容許分鐘數
    pub timeslot_overlap_tolerance_minutes: u32,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            limit_fore_services: 4,
            limit_back_services: 12,
            limit_weekend_services: 1,
            min_present_specialists: 0,
            min_present_assistants: 0,
            categories: vec![
                CategoryConfig::new("Dienste", false),
                CategoryConfig::new("Rotationen", true),
                CategoryConfig::new("Demonstrationen", false),
            ],
            blocking_absences: vec![
                "Urlaub".to_string(),
                "Krank".to_string(),
                "Frei".to_string(),
            ],
            specialist_roles: vec![
                "Chefarzt".to_string(),
                "Oberarzt".to_string(),
                "Facharzt".to_string(),
            ],
            assistant_roles: vec!["Assistenzarzt".to_string()],
            rotation_aliases: BTreeMap::new(),
            service_window_days: 28,
            auto_off_search_days: 7,
            timeslot_overlap_tolerance_minutes: 0,
        }
    }
}

impl SystemSettings {
    /// 從 JSON 載入設定，缺少的欄位使用預設值
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: SystemSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// 建構器模式：設置服務上限
    pub fn with_service_limits(mut self, fore: u32, back: u32, weekend: u32) -> Self {
        self.limit_fore_services = fore;
        self.limit_back_services = back;
        self.limit_weekend_services = weekend;
        self
    }

    /// 建構器模式：設置最少在場人數
    pub fn with_min_present(mut self, specialists: u32, assistants: u32) -> Self {
        self.min_present_specialists = specialists;
        self.min_present_assistants = assistants;
        self
    }

    /// 建構器模式：設置類別
    pub fn with_categories(mut self, categories: Vec<CategoryConfig>) -> Self {
        self.categories = categories;
        self
    }

    /// 建構器模式：設置阻擋缺勤
    pub fn with_blocking_absences(mut self, absences: Vec<String>) -> Self {
        self.blocking_absences = absences;
        self
    }

    /// 建構器模式：添加輪訓別名
    pub fn with_rotation_alias(
        mut self,
        modality: impl Into<String>,
        workplace: impl Into<String>,
    ) -> Self {
        self.rotation_aliases.insert(modality.into(), workplace.into());
        self
    }

    /// 建構器模式：設置時段重疊容許值
    pub fn with_timeslot_tolerance(mut self, minutes: u32) -> Self {
        self.timeslot_overlap_tolerance_minutes = minutes;
        self
    }

    /// 查詢類別是否允許多人佔用（未設定時為 false）
    pub fn category_allows_multiple(&self, category: &str) -> bool {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.allows_multiple)
            .unwrap_or(false)
    }

    /// 缺勤位置是否為阻擋型
    pub fn is_blocking_absence(&self, position: &str) -> bool {
        self.blocking_absences.iter().any(|p| p == position)
    }

    /// 檢查設定的一致性
    pub fn validate(&self) -> Result<()> {
        if self.service_window_days == 0 {
            return Err(RosterError::InvalidConfig(
                "service_window_days 必須大於 0".to_string(),
            ));
        }
        if self.auto_off_search_days == 0 {
            return Err(RosterError::InvalidConfig(
                "auto_off_search_days 必須大於 0".to_string(),
            ));
        }
        if let Some(position) = self
            .blocking_absences
            .iter()
            .find(|p| Absence::from_position(p).is_none())
        {
            return Err(RosterError::InvalidConfig(format!(
                "blocking_absences 含非缺勤位置: {position}"
            )));
        }
        Ok(())
    }
}
