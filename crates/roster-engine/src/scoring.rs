//! 方案評分
//!
//! 用於比較多個獨立產生的完整方案，分數越高越好。

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::predicates::RosterIndex;
use crate::qualification::ExclusionPenalty;
use crate::SuggestedAssignment;

const WORKLOAD_SPREAD_WEIGHT: f64 = 10.0;
const SERVICE_SPREAD_WEIGHT: f64 = 15.0;
const ROTATION_DAY_REWARD: f64 = 2.0;
const FILLED_SLOT_REWARD: f64 = 0.1;
const EXCLUSION_VIOLATION_COST: f64 = 25.0;
const BELOW_MINIMUM_PENALTY: f64 = 8.0;
const BELOW_OPTIMAL_PENALTY: f64 = 2.0;

/// 方案分數明細
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PlanScore {
    /// FTE 調整後總指派數的標準差
    pub workload_spread: f64,
    /// FTE 調整後服務數的標準差
    pub service_spread: f64,
    /// 排在輪訓目標上的人日數
    pub rotation_days: u32,
    /// 已填補的位置數
    pub filled_slots: u32,
    /// 資格成本總和（排除以固定成本計）
    pub qualification_cost: f64,
    /// 低於最少人數的位置日
    pub below_minimum: u32,
    /// 低於最佳人數的位置日
    pub below_optimal: u32,
}

impl PlanScore {
    pub fn total(&self) -> f64 {
        -WORKLOAD_SPREAD_WEIGHT * self.workload_spread
            - SERVICE_SPREAD_WEIGHT * self.service_spread
            + ROTATION_DAY_REWARD * f64::from(self.rotation_days)
            + FILLED_SLOT_REWARD * f64::from(self.filled_slots)
            - self.qualification_cost
            - BELOW_MINIMUM_PENALTY * f64::from(self.below_minimum)
            - BELOW_OPTIMAL_PENALTY * f64::from(self.below_optimal)
    }
}

/// 方案評分器
pub struct PlanScorer<'i, 'a> {
    index: &'i RosterIndex<'a>,
}

impl<'i, 'a> PlanScorer<'i, 'a> {
    pub fn new(index: &'i RosterIndex<'a>) -> Self {
        Self { index }
    }

    /// 方案總分
    pub fn score_plan(&self, assignments: &[SuggestedAssignment], days: &[NaiveDate]) -> f64 {
        self.evaluate(assignments, days).total()
    }

    /// 方案分數明細
    pub fn evaluate(&self, assignments: &[SuggestedAssignment], days: &[NaiveDate]) -> PlanScore {
        let index = self.index;
        let quals = index.qualifications();
        let mut score = PlanScore::default();

        let mut totals: HashMap<&str, u32> = HashMap::new();
        let mut services: HashMap<&str, u32> = HashMap::new();
        let mut fill: HashMap<(&str, NaiveDate), u32> = HashMap::new();

        for assignment in assignments {
            let Some(workplace) = index.workplace(&assignment.position) else {
                // 缺勤或未知位置不計入
                continue;
            };

            score.filled_slots += 1;
            *totals.entry(assignment.doctor_id.as_str()).or_default() += 1;
            if workplace.is_service() {
                *services.entry(assignment.doctor_id.as_str()).or_default() += 1;
            }
            *fill
                .entry((workplace.name.as_str(), assignment.date))
                .or_default() += 1;

            if index
                .active_rotation_targets(&assignment.doctor_id, assignment.date)
                .contains(&workplace.name.as_str())
            {
                score.rotation_days += 1;
            }

            score.qualification_cost += quals.qualification_cost(
                &assignment.doctor_id,
                &workplace.id,
                ExclusionPenalty::Flat(EXCLUSION_VIOLATION_COST),
            );
        }

        score.workload_spread = self.fte_adjusted_spread(&totals);
        score.service_spread = self.fte_adjusted_spread(&services);

        for &date in days {
            for workplace in &index.snapshot().workplaces {
                if !index.is_active_on_date(workplace, date) {
                    continue;
                }
                let planned = fill
                    .get(&(workplace.name.as_str(), date))
                    .copied()
                    .unwrap_or(0);
                let staffed = planned + index.entries_at(&workplace.name, date).len() as u32;

                if staffed < workplace.min_staff {
                    score.below_minimum += 1;
                } else if staffed < workplace.target_staff() {
                    score.below_optimal += 1;
                }
            }
        }

        score
    }

    /// 全體醫師 FTE 調整後計數的母體標準差
    fn fte_adjusted_spread(&self, counts: &HashMap<&str, u32>) -> f64 {
        let values: Vec<f64> = self
            .index
            .doctors()
            .iter()
            .map(|d| d.fte_adjusted(counts.get(d.id.as_str()).copied().unwrap_or(0)))
            .collect();
        std_dev(&values)
    }
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
