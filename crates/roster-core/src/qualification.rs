//! 資格關聯模型

use serde::{Deserialize, Serialize};

/// 醫師持有的資格（醫師 ↔ 資格 關聯表的一列）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorQualification {
    pub doctor_id: String,
    pub qualification_id: String,
}

impl DoctorQualification {
    pub fn new(doctor_id: impl Into<String>, qualification_id: impl Into<String>) -> Self {
        Self {
            doctor_id: doctor_id.into(),
            qualification_id: qualification_id.into(),
        }
    }
}

/// 工作位置的資格要求（工作位置 ↔ 資格 關聯表的一列）
///
/// 兩個布林值編碼四個層級：
///
/// | is_mandatory | is_excluded | 層級 |
/// |---|---|---|
/// | true  | false | Pflicht（必須） |
/// | false | false | Sollte（建議） |
/// | true  | true  | Sollte-nicht（不建議） |
/// | false | true  | Nicht（禁止） |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkplaceQualification {
    pub workplace_id: String,
    pub qualification_id: String,
    #[serde(default)]
    pub is_mandatory: bool,
    #[serde(default)]
    pub is_excluded: bool,
}

impl WorkplaceQualification {
    /// 依層級創建資格要求
    pub fn new(
        workplace_id: impl Into<String>,
        qualification_id: impl Into<String>,
        tier: QualificationTier,
    ) -> Self {
        let (is_mandatory, is_excluded) = tier.flags();
        Self {
            workplace_id: workplace_id.into(),
            qualification_id: qualification_id.into(),
            is_mandatory,
            is_excluded,
        }
    }

    /// 解析層級
    pub fn tier(&self) -> QualificationTier {
        QualificationTier::from_flags(self.is_mandatory, self.is_excluded)
    }
}

/// 資格層級
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationTier {
    /// Pflicht：必須持有
    Mandatory,
    /// Sollte：建議持有
    Preferred,
    /// Sollte-nicht：持有者不建議排入
    Discouraged,
    /// Nicht：持有者不得排入
    Excluded,
}

impl QualificationTier {
    pub fn from_flags(is_mandatory: bool, is_excluded: bool) -> Self {
        match (is_mandatory, is_excluded) {
            (true, false) => Self::Mandatory,
            (false, false) => Self::Preferred,
            (true, true) => Self::Discouraged,
            (false, true) => Self::Excluded,
        }
    }

    /// 轉回 `(is_mandatory, is_excluded)`
    pub fn flags(self) -> (bool, bool) {
        match self {
            Self::Mandatory => (true, false),
            Self::Preferred => (false, false),
            Self::Discouraged => (true, true),
            Self::Excluded => (false, true),
        }
    }
}
