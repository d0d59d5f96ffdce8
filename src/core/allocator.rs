use tracing::debug;

use super::types::{Percentage, PlanRow};

/// Splits `total` into `count` shares that add up to it exactly.
///
/// Every share gets the floor of the even split; the last one also takes the
/// leftover hundredths.
pub fn distribute_equally(total: Percentage, count: usize) -> Vec<Percentage> {
    let Ok(divisor) = u32::try_from(count) else {
        return Vec::new();
    };
    if divisor == 0 {
        return Vec::new();
    }
    let total = total.hundredths();
    let base = total / divisor;
    let remainder = total - base * divisor;

    let mut shares = vec![Percentage::from_hundredths(base); count];
    if let Some(last) = shares.last_mut() {
        *last = Percentage::from_hundredths(base + remainder);
    }
    shares
}

/// Writes an equal split of `pool` into the rows at `indices`.
pub(crate) fn spread(rows: &mut [PlanRow], indices: &[usize], pool: Percentage) {
    let shares = distribute_equally(pool, indices.len());
    for (&index, share) in indices.iter().zip(shares) {
        rows[index].installment.percentage = share;
    }
}

/// Applies an explicit percentage to one row and rebalances the rest.
///
/// Locked rows other than the changed one keep their values. Placeholder rows
/// absorb whatever room is left after the new value and the locked rows. When
/// the new value takes the whole 100% every other row drops to zero; when the
/// locked rows already claim the remaining room the placeholders are left as
/// they were. The caller is responsible for locking the changed row.
pub fn rebalance_on_edit(rows: &[PlanRow], changed_id: u32, new_value: Percentage) -> Vec<PlanRow> {
    let mut next = rows.to_vec();
    let Some(changed) = next.iter().position(|row| row.id() == changed_id) else {
        return next;
    };
    next[changed].installment.percentage = new_value;

    let room = i64::from(Percentage::FULL.hundredths()) - i64::from(new_value.hundredths());
    if room <= 0 {
        for (index, row) in next.iter_mut().enumerate() {
            if index != changed {
                row.installment.percentage = Percentage::ZERO;
            }
        }
        return next;
    }

    let locked_total: i64 = next
        .iter()
        .enumerate()
        .filter(|(index, row)| *index != changed && row.is_locked())
        .map(|(_, row)| i64::from(row.percentage().hundredths()))
        .sum();
    let placeholders: Vec<usize> = next
        .iter()
        .enumerate()
        .filter(|(index, row)| *index != changed && !row.is_locked())
        .map(|(index, _)| index)
        .collect();
    if placeholders.is_empty() {
        return next;
    }

    let leftover = room - locked_total;
    if leftover <= 0 {
        debug!(
            changed_id,
            locked_total, "locked rows already claim the remaining room; placeholders kept"
        );
        return next;
    }

    spread(&mut next, &placeholders, Percentage::from_hundredths(leftover as u32));
    next
}
