//! 排班願望模型

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 願望類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WishKind {
    /// 希望排服務
    Service,
    /// 希望不排服務
    NoService,
}

/// 願望狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WishStatus {
    Approved,
    Pending,
    /// 已拒絕，所有規則皆忽略
    Rejected,
}

/// 排班願望
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wish {
    pub doctor_id: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: WishKind,
    pub status: WishStatus,
    /// 指定的服務位置；為空表示任一服務
    #[serde(default)]
    pub position: Option<String>,
}

impl Wish {
    pub fn new(
        doctor_id: impl Into<String>,
        date: NaiveDate,
        kind: WishKind,
        status: WishStatus,
    ) -> Self {
        Self {
            doctor_id: doctor_id.into(),
            date,
            kind,
            status,
            position: None,
        }
    }

    /// 建構器模式：指定位置
    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.status != WishStatus::Rejected
    }
}
