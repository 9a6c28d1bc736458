//! Phase A：值班服務

use chrono::NaiveDate;
use roster_core::{Doctor, WishStatus, Workplace};

use super::context::RunContext;
use super::leave;
use crate::limits::ServiceLimits;
use crate::predicates::RosterIndex;
use crate::PlanWarning;

/// 服務候選人分層
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum WishTier {
    /// 有對應的服務願望
    Wished,
    Neutral,
    /// 有待審的不排服務願望
    Avoid,
}

/// 依顯示順序補滿當日所有服務；auto_off 服務立即產生未來補休
pub(super) fn fill_services<'a>(
    index: &RosterIndex<'a>,
    doctors: &[&'a Doctor],
    ctx: &mut RunContext<'a>,
) -> roster_core::Result<()> {
    let date = ctx.date();

    for &service in index.services() {
        if !index.is_active_on_date(service, date) {
            continue;
        }

        let needed = service.target_staff().saturating_sub(ctx.fill(&service.name));
        if needed == 0 {
            continue;
        }

        let eligible: Vec<&'a Doctor> = doctors
            .iter()
            .copied()
            .filter(|d| is_eligible(index, ctx, d, service, date))
            .collect();

        let mut candidates: Vec<&'a Doctor> = match index.service_kind(service) {
            Some(kind) => eligible
                .iter()
                .copied()
                .filter(|d| {
                    !ServiceLimits::check(index, d, kind, date, &ctx.assignments).exceeds()
                })
                .collect(),
            None => eligible.clone(),
        };

        if candidates.is_empty() && !eligible.is_empty() {
            tracing::debug!("{} {}：所有候選人已達上限，忽略上限", date, service.name);
            ctx.warnings.push(PlanWarning::info(
                date,
                service.name.clone(),
                "所有候選人已達服務上限，作為最後手段忽略上限".to_string(),
            ));
            candidates = eligible;
        }

        let mut ranked: Vec<(WishTier, f64, u32, &'a Doctor)> = candidates
            .into_iter()
            .map(|d| {
                (
                    wish_tier(index, d, service, date),
                    ServiceLimits::fairness_count(index, d, &service.name, date, &ctx.assignments),
                    ctx.run_count(&d.id),
                    d,
                )
            })
            .collect();
        ranked.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| a.1.total_cmp(&b.1))
                .then_with(|| a.2.cmp(&b.2))
        });

        for (_, _, _, doctor) in ranked.into_iter().take(needed as usize) {
            ctx.assign(doctor, service);
            if service.auto_off {
                leave::schedule_auto_off(index, ctx, doctor, service, date)?;
            }
        }
    }

    Ok(())
}

fn is_eligible(
    index: &RosterIndex<'_>,
    ctx: &RunContext<'_>,
    doctor: &Doctor,
    service: &Workplace,
    date: NaiveDate,
) -> bool {
    if ctx.is_blocked(&doctor.id) {
        return false;
    }
    // 當日已有服務，或已有互斥的工作
    if ctx
        .held(&doctor.id)
        .iter()
        .any(|h| h.is_service() || index.same_day_conflict(h, service))
    {
        return false;
    }
    if index.is_excluded(&doctor.id, service)
        || index.has_approved_no_service_wish(&doctor.id, date)
        || !index.is_qualified(&doctor.id, service)
    {
        return false;
    }
    !breaks_consecutive_rule(index, ctx, doctor, service, date)
}

/// 不允許連續排班的服務：前一日或後一日已排同一位置
fn breaks_consecutive_rule(
    index: &RosterIndex<'_>,
    ctx: &RunContext<'_>,
    doctor: &Doctor,
    service: &Workplace,
    date: NaiveDate,
) -> bool {
    if service.allows_consecutive_days {
        return false;
    }
    [date.pred_opt(), date.succ_opt()]
        .into_iter()
        .flatten()
        .any(|day| {
            index.has_position_on(&doctor.id, day, &service.name)
                || ctx.has_planned_position(&doctor.id, day, &service.name)
        })
}

fn wish_tier(
    index: &RosterIndex<'_>,
    doctor: &Doctor,
    service: &Workplace,
    date: NaiveDate,
) -> WishTier {
    match index.service_wish_status(&doctor.id, date, service) {
        Some(WishStatus::Approved | WishStatus::Pending) => WishTier::Wished,
        _ if index.has_pending_no_service_wish(&doctor.id, date) => WishTier::Avoid,
        _ => WishTier::Neutral,
    }
}

