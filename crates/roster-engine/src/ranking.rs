//! 方案變體排名
//!
//! 以不同的醫師順序多次執行產生器（並行），再以方案評分由高到低排序。
//! 第 0 個變體使用快照原始順序，其餘以 `seed + i` 洗牌。

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;

use crate::generator::AutoFillGenerator;
use crate::predicates::RosterIndex;
use crate::scoring::{PlanScore, PlanScorer};
use crate::GenerationResult;

/// 預設變體數
const DEFAULT_VARIANTS: usize = 8;

/// 已評分的方案變體
#[derive(Debug, Clone, Serialize)]
pub struct RankedPlan {
    /// 洗牌種子
    pub seed: u64,
    /// 使用的醫師順序
    pub doctor_order: Vec<String>,
    pub score: PlanScore,
    pub total: f64,
    pub result: GenerationResult,
}

/// 方案排名器
pub struct PlanRanker<'i, 'a> {
    index: &'i RosterIndex<'a>,
    variants: usize,
    seed: u64,
}

impl<'i, 'a> PlanRanker<'i, 'a> {
    pub fn new(index: &'i RosterIndex<'a>) -> Self {
        Self {
            index,
            variants: DEFAULT_VARIANTS,
            seed: 0,
        }
    }

    /// 建構器模式：設置變體數（至少 1）
    pub fn with_variants(mut self, variants: usize) -> Self {
        self.variants = variants.max(1);
        self
    }

    /// 建構器模式：設置基礎種子
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// 產生並排名所有變體，最佳者在前
    pub fn rank(&self, days: &[NaiveDate]) -> roster_core::Result<Vec<RankedPlan>> {
        tracing::info!("開始方案排名：{} 個變體", self.variants);

        let base_order: Vec<String> = self
            .index
            .doctors()
            .iter()
            .map(|d| d.id.clone())
            .collect();

        let mut plans = (0..self.variants)
            .into_par_iter()
            .map(|i| self.run_variant(&base_order, i, days))
            .collect::<roster_core::Result<Vec<_>>>()?;

        plans.sort_by(|a, b| {
            b.total
                .total_cmp(&a.total)
                .then_with(|| a.seed.cmp(&b.seed))
        });

        if let Some(best) = plans.first() {
            tracing::info!("最佳變體 seed={} 分數={:.2}", best.seed, best.total);
        }

        Ok(plans)
    }

    fn run_variant(
        &self,
        base_order: &[String],
        variant: usize,
        days: &[NaiveDate],
    ) -> roster_core::Result<RankedPlan> {
        let seed = self.seed.wrapping_add(variant as u64);
        let mut doctor_order = base_order.to_vec();
        if variant > 0 {
            let mut rng = StdRng::seed_from_u64(seed);
            doctor_order.shuffle(&mut rng);
        }

        let result = AutoFillGenerator::new(self.index)
            .with_doctor_order(doctor_order.clone())
            .generate(days)?;
        let score = PlanScorer::new(self.index).evaluate(&result.assignments, days);
        tracing::debug!("變體 seed={} 分數={:.2}", seed, score.total());

        Ok(RankedPlan {
            seed,
            doctor_order,
            total: score.total(),
            score,
            result,
        })
    }
}
