//! Phase B / C：一般工作位置
//!
//! 兩個階段共用同一套三步驟不動點迴圈：
//! 1. 補上必須資格位置的第一人
//! 2. 依填補率補到最佳人數
//! 3. 目標達成後，將剩餘醫師超額分配到可多人位置

use std::cmp::Reverse;

use chrono::NaiveDate;
use roster_core::{Doctor, Workplace};

use super::context::RunContext;
use crate::predicates::{RosterIndex, RotationFit};

/// 填補階段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FillPhase {
    /// Phase B：影響可用性的位置
    Availability,
    /// Phase C：不影響可用性的位置（例如示教）
    Supplementary,
}

impl FillPhase {
    fn includes(self, workplace: &Workplace) -> bool {
        match self {
            FillPhase::Availability => workplace.affects_availability,
            FillPhase::Supplementary => !workplace.affects_availability,
        }
    }
}

/// B.2 的醫師排序鍵
type CandidateKey = (u8, u8, u8, Reverse<u32>, u32);

pub(super) fn fill_workplaces<'a>(
    index: &RosterIndex<'a>,
    doctors: &[&'a Doctor],
    ctx: &mut RunContext<'a>,
    phase: FillPhase,
) {
    let date = ctx.date();
    let workplaces: Vec<&'a Workplace> = index
        .non_services()
        .iter()
        .copied()
        .filter(|w| phase.includes(w) && index.is_active_on_date(w, date))
        .collect();
    if workplaces.is_empty() {
        return;
    }
    tracing::debug!("{} {:?}：{} 個工作位置", date, phase, workplaces.len());

    let max_rounds = doctors.len() * workplaces.len() + 1;
    for round in 0..max_rounds {
        let mut changed = cover_mandatory(index, doctors, &workplaces, ctx, phase);
        changed |= fill_to_target(index, doctors, &workplaces, ctx, phase);
        if !changed {
            changed = overfill(index, doctors, &workplaces, ctx, phase);
        }
        if !changed {
            tracing::debug!("{} {:?} 於第 {} 輪收斂", date, phase, round + 1);
            break;
        }
    }
}

/// B.1：必須資格位置尚無人時，先指派一位合格醫師
fn cover_mandatory<'a>(
    index: &RosterIndex<'a>,
    doctors: &[&'a Doctor],
    workplaces: &[&'a Workplace],
    ctx: &mut RunContext<'a>,
    phase: FillPhase,
) -> bool {
    let date = ctx.date();
    let mut changed = false;

    for &workplace in workplaces {
        if workplace.min_staff == 0
            || ctx.fill(&workplace.name) > 0
            || !index
                .qualifications()
                .requirements(&workplace.id)
                .has_mandatory()
        {
            continue;
        }

        let best = doctors
            .iter()
            .copied()
            .filter(|d| can_take(index, ctx, d, workplace, phase))
            .filter(|d| index.is_qualified(&d.id, workplace))
            .min_by_key(|d| {
                (
                    index.rotation_fit(&d.id, date, &workplace.name) == RotationFit::Elsewhere,
                    ctx.run_count(&d.id),
                )
            });

        if let Some(doctor) = best {
            place(index, ctx, doctor, workplace, phase);
            changed = true;
        }
    }

    changed
}

/// B.2：反覆挑選填補率最低的位置與最適合的醫師，直到無法再補
fn fill_to_target<'a>(
    index: &RosterIndex<'a>,
    doctors: &[&'a Doctor],
    workplaces: &[&'a Workplace],
    ctx: &mut RunContext<'a>,
    phase: FillPhase,
) -> bool {
    let mut changed = false;

    loop {
        let mut open: Vec<&'a Workplace> = workplaces
            .iter()
            .copied()
            .filter(|w| ctx.fill(&w.name) < w.target_staff())
            .collect();
        open.sort_by(|a, b| {
            fill_ratio(ctx, a)
                .total_cmp(&fill_ratio(ctx, b))
                .then_with(|| has_mandatory(index, b).cmp(&has_mandatory(index, a)))
                .then_with(|| a.order.cmp(&b.order))
                .then_with(|| a.name.cmp(&b.name))
        });

        let pick = open
            .iter()
            .find_map(|&w| best_candidate(index, doctors, ctx, w, phase).map(|d| (d, w)));

        match pick {
            Some((doctor, workplace)) => {
                place(index, ctx, doctor, workplace, phase);
                changed = true;
            }
            None => break,
        }
    }

    changed
}

/// B.3：剩餘醫師超額分配到可多人且已達目標的位置
fn overfill<'a>(
    index: &RosterIndex<'a>,
    doctors: &[&'a Doctor],
    workplaces: &[&'a Workplace],
    ctx: &mut RunContext<'a>,
    phase: FillPhase,
) -> bool {
    let date = ctx.date();
    let mut changed = false;

    for &doctor in doctors {
        // Phase C 只分配當日完全沒有工作的醫師
        if phase == FillPhase::Supplementary && !ctx.held(&doctor.id).is_empty() {
            continue;
        }

        let best = workplaces
            .iter()
            .copied()
            .filter(|w| index.allows_multiple(w) && ctx.fill(&w.name) >= w.target_staff())
            .filter(|w| can_take(index, ctx, doctor, w, phase))
            .filter(|w| qualification_rank(index, ctx, doctor, w).is_some())
            .min_by(|a, b| {
                rotation_miss(index, doctor, a, date)
                    .cmp(&rotation_miss(index, doctor, b, date))
                    .then_with(|| fill_ratio(ctx, a).total_cmp(&fill_ratio(ctx, b)))
                    .then_with(|| a.order.cmp(&b.order))
            });

        if let Some(workplace) = best {
            place(index, ctx, doctor, workplace, phase);
            changed = true;
        }
    }

    changed
}

fn best_candidate<'a>(
    index: &RosterIndex<'a>,
    doctors: &[&'a Doctor],
    ctx: &RunContext<'a>,
    workplace: &Workplace,
    phase: FillPhase,
) -> Option<&'a Doctor> {
    doctors
        .iter()
        .copied()
        .filter(|d| can_take(index, ctx, d, workplace, phase))
        .filter_map(|d| Some((candidate_key(index, ctx, d, workplace)?, d)))
        .min_by_key(|(key, _)| *key)
        .map(|(_, d)| d)
}

/// 輪訓層級、資格、建議資格、位移次數（多者優先）、本次執行指派數
fn candidate_key(
    index: &RosterIndex<'_>,
    ctx: &RunContext<'_>,
    doctor: &Doctor,
    workplace: &Workplace,
) -> Option<CandidateKey> {
    let qual_rank = qualification_rank(index, ctx, doctor, workplace)?;
    let rotation_tier = match index.rotation_fit(&doctor.id, ctx.date(), &workplace.name) {
        RotationFit::OnTarget if ctx.displacement(&doctor.id) > 0 => 0,
        RotationFit::OnTarget => 1,
        RotationFit::NoRotation => 2,
        RotationFit::Elsewhere => 3,
    };
    Some((
        rotation_tier,
        qual_rank,
        index
            .qualifications()
            .optional_fit(&doctor.id, &workplace.id),
        Reverse(ctx.displacement(&doctor.id)),
        ctx.run_count(&doctor.id),
    ))
}

/// 合格為 0；在可多人位置由完全符合的同事帶領時為 1；否則不可指派
fn qualification_rank(
    index: &RosterIndex<'_>,
    ctx: &RunContext<'_>,
    doctor: &Doctor,
    workplace: &Workplace,
) -> Option<u8> {
    if index.is_qualified(&doctor.id, workplace) {
        Some(0)
    } else if is_supervised(index, ctx, workplace) {
        Some(1)
    } else {
        None
    }
}

fn is_supervised(index: &RosterIndex<'_>, ctx: &RunContext<'_>, workplace: &Workplace) -> bool {
    index.allows_multiple(workplace)
        && ctx
            .members(&workplace.name)
            .iter()
            .any(|m| index.qualifications().fully_satisfies(m, &workplace.id))
}

/// 醫師當日能否再接這個位置
fn can_take(
    index: &RosterIndex<'_>,
    ctx: &RunContext<'_>,
    doctor: &Doctor,
    workplace: &Workplace,
    phase: FillPhase,
) -> bool {
    if ctx.is_blocked(&doctor.id)
        || ctx.is_member(&doctor.id, &workplace.name)
        || index.is_excluded(&doctor.id, workplace)
    {
        return false;
    }

    let held = ctx.held(&doctor.id);
    match phase {
        FillPhase::Availability => !held.iter().any(|h| {
            index.same_day_conflict(h, workplace) || (!h.is_service() && h.affects_availability)
        }),
        // 同一位合格醫師可兼任多個必須資格的示教位置
        FillPhase::Supplementary => !held.iter().any(|h| {
            (h.is_service() && h.affects_availability)
                || (!h.is_service() && !h.affects_availability && !has_mandatory(index, h))
        }),
    }
}

/// 指派並在 Phase B 追蹤輪訓位移
fn place<'a>(
    index: &RosterIndex<'a>,
    ctx: &mut RunContext<'a>,
    doctor: &'a Doctor,
    workplace: &'a Workplace,
    phase: FillPhase,
) {
    if phase == FillPhase::Availability {
        match index.rotation_fit(&doctor.id, ctx.date(), &workplace.name) {
            RotationFit::Elsewhere => {
                *ctx.displacements.entry(doctor.id.clone()).or_default() += 1;
            }
            RotationFit::OnTarget => {
                ctx.displacements.remove(&doctor.id);
            }
            RotationFit::NoRotation => {}
        }
    }
    ctx.assign(doctor, workplace);
}

fn has_mandatory(index: &RosterIndex<'_>, workplace: &Workplace) -> bool {
    index
        .qualifications()
        .requirements(&workplace.id)
        .has_mandatory()
}

fn rotation_miss(
    index: &RosterIndex<'_>,
    doctor: &Doctor,
    workplace: &Workplace,
    date: NaiveDate,
) -> bool {
    index.rotation_fit(&doctor.id, date, &workplace.name) != RotationFit::OnTarget
}

fn fill_ratio(ctx: &RunContext<'_>, workplace: &Workplace) -> f64 {
    f64::from(ctx.fill(&workplace.name)) / f64::from(workplace.target_staff().max(1))
}
