//! 醫師模型

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{Result, RosterError};

/// FTE 換算時的最小分母，避免除以零
const MIN_FTE_FACTOR: f64 = 0.1;

/// 醫師
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    /// 醫師ID
    pub id: String,

    /// 顯示名稱
    #[serde(default)]
    pub name: String,

    /// 角色（如 Oberarzt、Assistenzarzt）
    #[serde(default)]
    pub role: String,

    /// 全職當量（0.0 ~ 1.0），所有上限按此縮放
    #[serde(default = "default_fte")]
    pub fte: Decimal,
}

fn default_fte() -> Decimal {
    Decimal::ONE
}

impl Doctor {
    /// 創建新的醫師（FTE 1.0）
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            role: role.into(),
            fte: Decimal::ONE,
        }
    }

    /// 建構器模式：設置名稱
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 建構器模式：設置 FTE
    pub fn with_fte(mut self, fte: Decimal) -> Self {
        self.fte = fte;
        self
    }

    /// FTE 必須介於 0 與 1 之間
    pub fn validate(&self) -> Result<()> {
        if self.fte < Decimal::ZERO || self.fte > Decimal::ONE {
            return Err(RosterError::InvalidFte(format!("{} = {}", self.id, self.fte)));
        }
        Ok(())
    }

    /// 以 FTE 縮放上限（四捨五入）
    pub fn scaled_limit(&self, limit: u32) -> u32 {
        let fte = self.fte.max(Decimal::ZERO);
        (Decimal::from(limit) * fte)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u32()
            .unwrap_or(0)
    }

    /// 計數換算用的 FTE 係數
    pub fn fte_factor(&self) -> f64 {
        self.fte.to_f64().unwrap_or(1.0).max(MIN_FTE_FACTOR)
    }

    /// FTE 調整後的計數
    pub fn fte_adjusted(&self, count: u32) -> f64 {
        f64::from(count) / self.fte_factor()
    }
}
