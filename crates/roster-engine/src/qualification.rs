//! 資格索引
//!
//! 由醫師、工作位置兩張資格關聯表建立一次，提供四層級查詢。
//! 未知的醫師或工作位置一律退化為「沒有資格」或「沒有要求」。

use std::collections::{BTreeSet, HashMap, HashSet};

use roster_core::{DoctorQualification, QualificationTier, WorkplaceQualification};

/// 缺少必須資格的成本
pub const MISSING_MANDATORY_COST: f64 = 50.0;
/// 持有不建議資格的成本
pub const DISCOURAGED_HELD_COST: f64 = 15.0;
/// 未持有全部建議資格的成本
pub const MISSING_OPTIONAL_COST: f64 = 3.0;
/// 持有全部建議資格的獎勵
pub const ALL_OPTIONAL_BONUS: f64 = -2.0;

/// 工作位置的分層資格要求
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkplaceRequirements {
    /// Pflicht
    pub required: BTreeSet<String>,
    /// Sollte
    pub optional: BTreeSet<String>,
    /// Sollte-nicht
    pub discouraged: BTreeSet<String>,
    /// Nicht
    pub excluded: BTreeSet<String>,
}

impl WorkplaceRequirements {
    pub fn has_mandatory(&self) -> bool {
        !self.required.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
            && self.optional.is_empty()
            && self.discouraged.is_empty()
            && self.excluded.is_empty()
    }
}

/// 排除資格時的計價方式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExclusionPenalty {
    /// 直接返回 +∞（單筆指派評估）
    Infinite,
    /// 固定成本（整體方案評分）
    Flat(f64),
}

/// 資格索引
#[derive(Debug, Clone, Default)]
pub struct QualificationIndex {
    doctor_qualifications: HashMap<String, HashSet<String>>,
    requirements: HashMap<String, WorkplaceRequirements>,
    no_qualifications: HashSet<String>,
    no_requirements: WorkplaceRequirements,
}

impl QualificationIndex {
    /// 由兩張關聯表建立索引
    pub fn from_rows(
        doctor_rows: &[DoctorQualification],
        workplace_rows: &[WorkplaceQualification],
    ) -> Self {
        let mut doctor_qualifications: HashMap<String, HashSet<String>> = HashMap::new();
        for row in doctor_rows {
            doctor_qualifications
                .entry(row.doctor_id.clone())
                .or_default()
                .insert(row.qualification_id.clone());
        }

        let mut requirements: HashMap<String, WorkplaceRequirements> = HashMap::new();
        for row in workplace_rows {
            let entry = requirements.entry(row.workplace_id.clone()).or_default();
            let id = row.qualification_id.clone();
            match row.tier() {
                QualificationTier::Mandatory => entry.required.insert(id),
                QualificationTier::Preferred => entry.optional.insert(id),
                QualificationTier::Discouraged => entry.discouraged.insert(id),
                QualificationTier::Excluded => entry.excluded.insert(id),
            };
        }

        Self {
            doctor_qualifications,
            requirements,
            no_qualifications: HashSet::new(),
            no_requirements: WorkplaceRequirements::default(),
        }
    }

    /// 醫師持有的資格
    pub fn doctor_qualifications(&self, doctor_id: &str) -> &HashSet<String> {
        self.doctor_qualifications
            .get(doctor_id)
            .unwrap_or(&self.no_qualifications)
    }

    /// 工作位置的資格要求
    pub fn requirements(&self, workplace_id: &str) -> &WorkplaceRequirements {
        self.requirements
            .get(workplace_id)
            .unwrap_or(&self.no_requirements)
    }

    /// 醫師持有全部必須資格（沒有必須資格時恆為 true）
    pub fn is_qualified(&self, doctor_id: &str, workplace_id: &str) -> bool {
        let held = self.doctor_qualifications(doctor_id);
        self.requirements(workplace_id)
            .required
            .iter()
            .all(|q| held.contains(q))
    }

    /// 醫師持有任一禁止資格
    pub fn is_excluded(&self, doctor_id: &str, workplace_id: &str) -> bool {
        let held = self.doctor_qualifications(doctor_id);
        self.requirements(workplace_id)
            .excluded
            .iter()
            .any(|q| held.contains(q))
    }

    /// 醫師持有任一不建議資格
    pub fn holds_discouraged(&self, doctor_id: &str, workplace_id: &str) -> bool {
        let held = self.doctor_qualifications(doctor_id);
        self.requirements(workplace_id)
            .discouraged
            .iter()
            .any(|q| held.contains(q))
    }

    /// 醫師持有全部建議資格（建議資格為空時為 false）
    pub fn has_optional_quals(&self, doctor_id: &str, workplace_id: &str) -> bool {
        let optional = &self.requirements(workplace_id).optional;
        let held = self.doctor_qualifications(doctor_id);
        !optional.is_empty() && optional.iter().all(|q| held.contains(q))
    }

    /// 醫師持有任一建議資格
    pub fn has_any_optional_qual(&self, doctor_id: &str, workplace_id: &str) -> bool {
        let held = self.doctor_qualifications(doctor_id);
        self.requirements(workplace_id)
            .optional
            .iter()
            .any(|q| held.contains(q))
    }

    /// 建議資格吻合程度：0 = 全部, 1 = 部分, 2 = 無（僅用於排序）
    pub fn optional_fit(&self, doctor_id: &str, workplace_id: &str) -> u8 {
        if self.requirements(workplace_id).optional.is_empty()
            || self.has_optional_quals(doctor_id, workplace_id)
        {
            0
        } else if self.has_any_optional_qual(doctor_id, workplace_id) {
            1
        } else {
            2
        }
    }

    /// 完全符合：未被排除、持有全部必須與建議資格
    pub fn fully_satisfies(&self, doctor_id: &str, workplace_id: &str) -> bool {
        !self.is_excluded(doctor_id, workplace_id)
            && self.is_qualified(doctor_id, workplace_id)
            && (self.requirements(workplace_id).optional.is_empty()
                || self.has_optional_quals(doctor_id, workplace_id))
    }

    /// 缺少的必須資格
    pub fn missing_mandatory(&self, doctor_id: &str, workplace_id: &str) -> Vec<String> {
        let held = self.doctor_qualifications(doctor_id);
        self.requirements(workplace_id)
            .required
            .iter()
            .filter(|q| !held.contains(*q))
            .cloned()
            .collect()
    }

    /// 四層級資格成本
    pub fn qualification_cost(
        &self,
        doctor_id: &str,
        workplace_id: &str,
        exclusion: ExclusionPenalty,
    ) -> f64 {
        if self.is_excluded(doctor_id, workplace_id) {
            return match exclusion {
                ExclusionPenalty::Infinite => f64::INFINITY,
                ExclusionPenalty::Flat(cost) => cost,
            };
        }

        let mut cost = 0.0;
        if !self.is_qualified(doctor_id, workplace_id) {
            cost += MISSING_MANDATORY_COST;
        }
        if self.holds_discouraged(doctor_id, workplace_id) {
            cost += DISCOURAGED_HELD_COST;
        }
        if !self.requirements(workplace_id).optional.is_empty() {
            if self.has_optional_quals(doctor_id, workplace_id) {
                cost += ALL_OPTIONAL_BONUS;
            } else {
                cost += MISSING_OPTIONAL_COST;
            }
        }
        cost
    }
}
