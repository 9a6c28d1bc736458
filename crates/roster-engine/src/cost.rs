//! 單筆指派成本
//!
//! 將所有軟硬偏好折算為單一數值，數值越低越好；+∞ 代表不可指派。

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use roster_core::{Doctor, WishStatus, Workplace};

use crate::limits::ServiceLimits;
use crate::predicates::{RosterIndex, RotationFit};
use crate::qualification::ExclusionPenalty;
use crate::SuggestedAssignment;

const DISPLACED_RETURN_COST: f64 = -20.0;
const ON_TARGET_COST: f64 = -15.0;
const ROTATION_ELSEWHERE_COST: f64 = 8.0;
const FAIRNESS_WEIGHT: f64 = 5.0;
const RUN_COUNT_WEIGHT: f64 = 2.0;
const DISPLACEMENT_BONUS: f64 = -3.0;
const APPROVED_WISH_COST: f64 = -20.0;
const PENDING_WISH_COST: f64 = -10.0;
const PENDING_NO_SERVICE_COST: f64 = 12.0;
const NO_CANDIDATE_LEFT_COST: f64 = 60.0;
const BELOW_MINIMUM_COST: f64 = 30.0;
const BELOW_OPTIMAL_COST: f64 = 5.0;
const SOLE_OCCUPANT_COST: f64 = 10.0;

/// 成本評估的執行狀態
///
/// 預設值代表「只看快照」：沒有本次執行的指派、計數與位移記錄，
/// 可用醫師池與當日人數由快照推導。
#[derive(Debug, Clone)]
pub struct CostContext {
    /// 評估日期
    pub date: NaiveDate,

    /// 是否套用服務上限（超過時為 +∞）
    pub check_limits: bool,

    /// 本次執行已產生的指派（計入歷史計數）
    pub planned: Vec<SuggestedAssignment>,

    /// 本次執行中每位醫師的指派次數
    pub run_counts: HashMap<String, u32>,

    /// 每位醫師被調離輪訓目標的次數
    pub displacements: HashMap<String, u32>,

    /// 當日仍可用的醫師；未設定時由快照推導
    pub available_doctors: Option<HashSet<String>>,

    /// 當日各位置已排人數；未設定時由快照推導
    pub day_fill: Option<HashMap<String, u32>>,
}

impl CostContext {
    /// 創建新的評估狀態
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            check_limits: true,
            planned: Vec::new(),
            run_counts: HashMap::new(),
            displacements: HashMap::new(),
            available_doctors: None,
            day_fill: None,
        }
    }

    /// 建構器模式：設置是否檢查上限
    pub fn with_limit_check(mut self, check_limits: bool) -> Self {
        self.check_limits = check_limits;
        self
    }

    /// 建構器模式：設置已產生的指派
    pub fn with_planned(mut self, planned: Vec<SuggestedAssignment>) -> Self {
        self.planned = planned;
        self
    }

    /// 建構器模式：設置執行計數
    pub fn with_run_counts(mut self, run_counts: HashMap<String, u32>) -> Self {
        self.run_counts = run_counts;
        self
    }

    /// 建構器模式：設置位移次數
    pub fn with_displacements(mut self, displacements: HashMap<String, u32>) -> Self {
        self.displacements = displacements;
        self
    }

    /// 建構器模式：設置可用醫師池
    pub fn with_available_doctors(mut self, doctors: HashSet<String>) -> Self {
        self.available_doctors = Some(doctors);
        self
    }

    /// 建構器模式：設置當日人數
    pub fn with_day_fill(mut self, day_fill: HashMap<String, u32>) -> Self {
        self.day_fill = Some(day_fill);
        self
    }

    fn run_count(&self, doctor_id: &str) -> u32 {
        self.run_counts.get(doctor_id).copied().unwrap_or(0)
    }

    fn displacement(&self, doctor_id: &str) -> u32 {
        self.displacements.get(doctor_id).copied().unwrap_or(0)
    }
}

/// 成本函數
pub struct CostFunction<'i, 'a> {
    index: &'i RosterIndex<'a>,
}

impl<'i, 'a> CostFunction<'i, 'a> {
    pub fn new(index: &'i RosterIndex<'a>) -> Self {
        Self { index }
    }

    /// 單筆指派成本
    ///
    /// 以下情況直接返回 +∞：資格排除、已核准的不排服務願望、
    /// （檢查上限時）超過 FTE 縮放的服務上限。
    pub fn assignment_cost(
        &self,
        doctor: &Doctor,
        workplace: &Workplace,
        context: &CostContext,
    ) -> f64 {
        let index = self.index;
        let date = context.date;

        if index.is_excluded(&doctor.id, workplace) {
            return f64::INFINITY;
        }
        if index.has_approved_no_service_wish(&doctor.id, date) {
            return f64::INFINITY;
        }
        if context.check_limits {
            if let Some(kind) = index.service_kind(workplace) {
                let status = ServiceLimits::check(index, doctor, kind, date, &context.planned);
                if status.exceeds() {
                    return f64::INFINITY;
                }
            }
        }

        let mut cost = index.qualifications().qualification_cost(
            &doctor.id,
            &workplace.id,
            ExclusionPenalty::Infinite,
        );

        cost += self.rotation_cost(doctor, workplace, context);

        cost += FAIRNESS_WEIGHT
            * ServiceLimits::fairness_count(index, doctor, &workplace.name, date, &context.planned);
        cost += RUN_COUNT_WEIGHT * f64::from(context.run_count(&doctor.id));
        cost += DISPLACEMENT_BONUS * f64::from(context.displacement(&doctor.id));

        cost += self.wish_cost(doctor, workplace, date);
        cost += self.understaffing_cost(doctor, workplace, context);
        cost += self.sole_occupant_cost(doctor, workplace, context);

        cost
    }

    fn rotation_cost(&self, doctor: &Doctor, workplace: &Workplace, context: &CostContext) -> f64 {
        match self
            .index
            .rotation_fit(&doctor.id, context.date, &workplace.name)
        {
            RotationFit::OnTarget if context.displacement(&doctor.id) > 0 => DISPLACED_RETURN_COST,
            RotationFit::OnTarget => ON_TARGET_COST,
            RotationFit::Elsewhere => ROTATION_ELSEWHERE_COST,
            RotationFit::NoRotation => 0.0,
        }
    }

    fn wish_cost(&self, doctor: &Doctor, workplace: &Workplace, date: NaiveDate) -> f64 {
        let mut cost = match self.index.service_wish_status(&doctor.id, date, workplace) {
            Some(WishStatus::Approved) => APPROVED_WISH_COST,
            Some(WishStatus::Pending) => PENDING_WISH_COST,
            _ => 0.0,
        };
        if workplace.is_service() && self.index.has_pending_no_service_wish(&doctor.id, date) {
            cost += PENDING_NO_SERVICE_COST;
        }
        cost
    }

    /// 模擬將該醫師移出可用池後，其他未達最佳人數的位置受到的影響
    fn understaffing_cost(
        &self,
        doctor: &Doctor,
        workplace: &Workplace,
        context: &CostContext,
    ) -> f64 {
        let index = self.index;
        let date = context.date;
        let pool: Vec<&str> = self
            .available_pool(context)
            .into_iter()
            .filter(|id| *id != doctor.id)
            .collect();

        let mut cost = 0.0;
        for other in &index.snapshot().workplaces {
            if other.name == workplace.name
                || !other.affects_availability
                || !index.is_active_on_date(other, date)
            {
                continue;
            }

            let filled = self.fill_of(other, context);
            let target = other.target_staff();
            if filled >= target {
                continue;
            }

            let remaining = pool
                .iter()
                .filter(|id| !index.is_excluded(id, other) && index.is_qualified(id, other))
                .count() as u32;

            if remaining == 0 {
                cost += NO_CANDIDATE_LEFT_COST;
            } else if filled + remaining < other.min_staff {
                cost += BELOW_MINIMUM_COST;
            } else if filled + remaining < target {
                cost += BELOW_OPTIMAL_COST;
            }
        }
        cost
    }

    /// 成為空位置的唯一佔用者且未完全符合資格時加成本
    fn sole_occupant_cost(
        &self,
        doctor: &Doctor,
        workplace: &Workplace,
        context: &CostContext,
    ) -> f64 {
        let quals = self.index.qualifications();
        if quals.requirements(&workplace.id).is_empty() {
            return 0.0;
        }
        if self.fill_of(workplace, context) == 0 && !quals.fully_satisfies(&doctor.id, &workplace.id)
        {
            SOLE_OCCUPANT_COST
        } else {
            0.0
        }
    }

    fn fill_of(&self, workplace: &Workplace, context: &CostContext) -> u32 {
        match &context.day_fill {
            Some(fill) => fill.get(&workplace.name).copied().unwrap_or(0),
            None => {
                let existing = self.index.entries_at(&workplace.name, context.date).len();
                let planned = context
                    .planned
                    .iter()
                    .filter(|a| a.position == workplace.name && a.date == context.date)
                    .count();
                (existing + planned) as u32
            }
        }
    }

    /// 可用醫師池：未設定時為當日沒有缺勤且沒有任何記錄的醫師
    fn available_pool<'c>(&self, context: &'c CostContext) -> Vec<&'c str>
    where
        'a: 'c,
    {
        if let Some(available) = &context.available_doctors {
            return available.iter().map(String::as_str).collect();
        }
        let date = context.date;
        self.index
            .doctors()
            .iter()
            .filter(|d| self.index.entries_on(&d.id, date).is_empty())
            .filter(|d| {
                !context
                    .planned
                    .iter()
                    .any(|a| a.doctor_id == d.id && a.date == date)
            })
            .map(|d| d.id.as_str())
            .collect()
    }
}
