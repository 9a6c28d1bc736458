//! 自動補休（Auto-Frei）

use std::collections::HashSet;

use chrono::NaiveDate;
use roster_core::{Absence, Doctor, Workplace};

use super::context::RunContext;
use crate::predicates::RosterIndex;
use crate::{PlanWarning, SuggestedAssignment};

/// 在下一個工作日產生補休，並阻擋該醫師當日的排班
///
/// 醫師在該日已有任何記錄或建議時跳過。
pub(super) fn schedule_auto_off(
    index: &RosterIndex<'_>,
    ctx: &mut RunContext<'_>,
    doctor: &Doctor,
    workplace: &Workplace,
    date: NaiveDate,
) -> roster_core::Result<()> {
    let search_days = index.settings().auto_off_search_days;
    let Some(leave_date) = index.calendar().next_working_day(date, search_days)? else {
        ctx.warnings.push(PlanWarning::warning(
            date,
            doctor.id.clone(),
            format!("{} 天內找不到可補休的工作日（{}）", search_days, workplace.name),
        ));
        return Ok(());
    };

    if !index.entries_on(&doctor.id, leave_date).is_empty()
        || ctx.has_planned_on(&doctor.id, leave_date)
    {
        tracing::debug!("{} 於 {} 已有記錄，不產生補休", doctor.id, leave_date);
        return Ok(());
    }

    tracing::debug!("{} 補休 {}（{}）", doctor.id, leave_date, workplace.name);
    ctx.assignments.push(
        SuggestedAssignment::new(leave_date, Absence::Frei.position(), &doctor.id)
            .with_note(format!("Auto-Frei ({})", workplace.name)),
    );
    ctx.leave_blocked
        .entry(leave_date)
        .or_default()
        .insert(doctor.id.clone());

    Ok(())
}

/// Phase D：本日指派到非服務 auto_off 位置的醫師補休
pub(super) fn residual_leave<'a>(
    index: &RosterIndex<'a>,
    ctx: &mut RunContext<'a>,
) -> roster_core::Result<()> {
    let date = ctx.date();
    let auto_off: HashSet<&str> = index
        .non_services()
        .iter()
        .filter(|w| w.auto_off)
        .map(|w| w.name.as_str())
        .collect();
    if auto_off.is_empty() {
        return Ok(());
    }

    let pending: Vec<(&'a Doctor, &'a Workplace)> = ctx
        .assignments
        .iter()
        .filter(|a| a.date == date && auto_off.contains(a.position.as_str()))
        .filter_map(|a| Some((index.doctor(&a.doctor_id)?, index.workplace(&a.position)?)))
        .collect();

    for (doctor, workplace) in pending {
        schedule_auto_off(index, ctx, doctor, workplace, date)?;
    }

    Ok(())
}
