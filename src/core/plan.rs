use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::allocator::{rebalance_on_edit, spread};
use super::library::{PlanLibrary, default_plan};
use super::schedule;
use super::types::{
    DueDate, Installment, Percentage, PaymentPlan, PlanRow, PlanType, RowStatus, total_hundredths,
};
use crate::error::{PlanError, Result};

/// One operator action against an editing session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PlanCommand {
    SetPlanTitle { title: String },
    SetTitle { id: u32, title: String },
    SetDueDate { id: u32, due_date: Option<NaiveDate> },
    SetPercentage { id: u32, input: String },
    AddPayment,
    RemovePayment { id: u32 },
    SetDeposit { id: u32, is_deposit: bool },
    ResetToDefault,
}

/// A payment plan being edited, with each row's lock status.
///
/// Every mutator leaves `self` untouched and returns the next session value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEditor {
    pub plan_type: PlanType,
    pub title: String,
    pub rows: Vec<PlanRow>,
    /// Highest installment id handed out in this session.
    #[serde(default)]
    pub max_id_seen: u32,
}

impl PlanEditor {
    /// Opens a session from the saved plan, or the default when none exists.
    pub fn open(
        plan_type: PlanType,
        library: &PlanLibrary,
        anchor: Option<NaiveDate>,
    ) -> Result<Self> {
        if !plan_type.is_customizable() {
            return Err(PlanError::NotCustomizable(plan_type));
        }
        let plan = library
            .load(plan_type)
            .unwrap_or_else(|| default_plan(plan_type, anchor));
        Ok(Self::from_plan(plan_type, plan))
    }

    pub fn from_plan(plan_type: PlanType, plan: PaymentPlan) -> Self {
        let max_id_seen = plan.payments.iter().map(|p| p.id).max().unwrap_or(0);
        Self {
            plan_type,
            title: plan.title,
            rows: plan.payments.into_iter().map(PlanRow::placeholder).collect(),
            max_id_seen,
        }
    }

    /// The persisted shape: rows without their lock status.
    pub fn to_plan(&self) -> PaymentPlan {
        PaymentPlan {
            title: self.title.clone(),
            payments: self.rows.iter().map(|row| row.installment.clone()).collect(),
        }
    }

    /// Saves into `library`; the lock statuses are dropped.
    pub fn commit(&self, library: &mut PlanLibrary) -> Result<()> {
        library.save(self.plan_type, &self.to_plan())
    }

    pub fn total(&self) -> u32 {
        total_hundredths(self.rows.iter().map(|row| &row.installment))
    }

    pub fn is_complete(&self) -> bool {
        self.total() == Percentage::FULL.hundredths()
    }

    pub fn row(&self, id: u32) -> Option<&PlanRow> {
        self.rows.iter().find(|row| row.id() == id)
    }

    pub fn apply(&self, command: &PlanCommand, anchor: Option<NaiveDate>) -> Result<Self> {
        match command {
            PlanCommand::SetPlanTitle { title } => Ok(self.set_plan_title(title)),
            PlanCommand::SetTitle { id, title } => self.set_title(*id, title),
            PlanCommand::SetDueDate { id, due_date } => self.set_due_date(*id, *due_date),
            PlanCommand::SetPercentage { id, input } => self.set_percentage_input(*id, input),
            PlanCommand::AddPayment => self.add_payment(anchor),
            PlanCommand::RemovePayment { id } => self.remove_payment(*id),
            PlanCommand::SetDeposit { id, is_deposit } => {
                self.set_deposit(*id, *is_deposit, anchor)
            }
            PlanCommand::ResetToDefault => Ok(self.reset_to_default(anchor)),
        }
    }

    pub fn set_plan_title(&self, title: &str) -> Self {
        let mut next = self.clone();
        next.title = title.to_string();
        next
    }

    pub fn set_title(&self, id: u32, title: &str) -> Result<Self> {
        let mut next = self.clone();
        let index = next.position(id)?;
        next.rows[index].installment.title = title.to_string();
        Ok(next)
    }

    /// Sets or clears a sequential row's due date by hand.
    pub fn set_due_date(&self, id: u32, due_date: Option<NaiveDate>) -> Result<Self> {
        let mut next = self.clone();
        let index = next.position(id)?;
        let row = &mut next.rows[index].installment;
        if row.is_deposit {
            return Err(PlanError::DepositDueDateFixed(id));
        }
        row.due_date = DueDate::from_option(due_date);
        Ok(next)
    }

    /// Applies operator text; malformed text leaves the plan unchanged.
    pub fn set_percentage_input(&self, id: u32, input: &str) -> Result<Self> {
        self.position(id)?;
        match Percentage::parse_input(input) {
            Some(value) => self.set_percentage(id, value),
            None => {
                debug!(id, input, "ignored malformed percentage input");
                Ok(self.clone())
            }
        }
    }

    /// Locks the row at `value` and rebalances the placeholder rows.
    pub fn set_percentage(&self, id: u32, value: Percentage) -> Result<Self> {
        let index = self.position(id)?;
        let mut next = self.clone();
        next.rows = rebalance_on_edit(&self.rows, id, value);
        next.rows[index].status = RowStatus::Locked;
        Ok(next)
    }

    /// Appends a placeholder row one month after the latest dated row.
    ///
    /// The unclaimed remainder plus every placeholder's share is split again
    /// over the placeholders and the new row; locked rows keep their values.
    pub fn add_payment(&self, anchor: Option<NaiveDate>) -> Result<Self> {
        let mut next = self.clone();
        let id = next.next_id()?;
        next.max_id_seen = id;

        let latest = next
            .rows
            .iter()
            .filter(|row| !row.installment.is_deposit)
            .filter_map(|row| row.installment.due_date.date())
            .max();
        let due = match latest {
            Some(latest) => schedule::next_month(latest),
            None => anchor.and_then(schedule::first_due_date),
        };
        let sequence = next
            .rows
            .iter()
            .filter(|row| !row.installment.is_deposit)
            .count()
            + 1;

        let unclaimed = Percentage::FULL.saturating_sub(Percentage::from_hundredths(next.total()));
        let placeholder_total: u32 = next
            .rows
            .iter()
            .filter(|row| !row.is_locked())
            .map(|row| row.percentage().hundredths())
            .sum();

        next.rows.push(PlanRow::placeholder(Installment {
            id,
            title: format!("Payment {sequence}"),
            due_date: DueDate::from_option(due),
            percentage: Percentage::ZERO,
            is_deposit: false,
        }));

        let placeholders = next.placeholder_indices();
        let pool = Percentage::from_hundredths(placeholder_total + unclaimed.hundredths());
        spread(&mut next.rows, &placeholders, pool);
        Ok(next)
    }

    /// Drops a row and hands its share to the remaining placeholder rows.
    ///
    /// The only remaining row is never removed. When every remaining row is
    /// locked the share is simply dropped and the plan reports incomplete.
    pub fn remove_payment(&self, id: u32) -> Result<Self> {
        let index = self.position(id)?;
        if self.rows.len() <= 1 {
            debug!(id, "refused to remove the only installment");
            return Ok(self.clone());
        }

        let mut next = self.clone();
        let removed = next.rows.remove(index);
        let placeholders = next.placeholder_indices();
        if placeholders.is_empty() {
            return Ok(next);
        }
        let pool: u32 = removed.percentage().hundredths()
            + placeholders
                .iter()
                .map(|&i| next.rows[i].percentage().hundredths())
                .sum::<u32>();
        spread(&mut next.rows, &placeholders, Percentage::from_hundredths(pool));
        Ok(next)
    }

    /// Flags or unflags the first row as a checkout deposit.
    ///
    /// Flagging regenerates every sequential row's due date, since the
    /// deposit no longer consumes a slot in the schedule. Unflagging clears
    /// the row's date until the next refresh.
    pub fn set_deposit(&self, id: u32, is_deposit: bool, anchor: Option<NaiveDate>) -> Result<Self> {
        let index = self.position(id)?;
        let mut next = self.clone();
        if !is_deposit {
            let row = &mut next.rows[index].installment;
            row.is_deposit = false;
            row.due_date = DueDate::Unset;
            return Ok(next);
        }
        if index != 0 {
            return Err(PlanError::DepositNotFirst { id, position: index });
        }

        for (position, row) in next.rows.iter_mut().enumerate() {
            row.installment.is_deposit = position == 0;
        }
        next.rows[0].installment.due_date = DueDate::AtCheckout;
        regenerate_due_dates(next.rows.iter_mut().map(|row| &mut row.installment), anchor);
        Ok(next)
    }

    /// Back to the default plan for this type, with every lock cleared.
    pub fn reset_to_default(&self, anchor: Option<NaiveDate>) -> Self {
        Self::from_plan(self.plan_type, default_plan(self.plan_type, anchor))
    }

    /// Recomputes sequential due dates from `anchor`.
    pub fn refresh_due_dates(&self, anchor: Option<NaiveDate>) -> Self {
        let mut next = self.clone();
        regenerate_due_dates(next.rows.iter_mut().map(|row| &mut row.installment), anchor);
        next
    }

    pub fn clear_due_dates(&self) -> Self {
        let mut next = self.clone();
        clear_due_dates(next.rows.iter_mut().map(|row| &mut row.installment));
        next
    }

    fn position(&self, id: u32) -> Result<usize> {
        self.rows
            .iter()
            .position(|row| row.id() == id)
            .ok_or(PlanError::UnknownInstallment(id))
    }

    fn next_id(&self) -> Result<u32> {
        let current_max = self.rows.iter().map(PlanRow::id).max().unwrap_or(0);
        current_max
            .max(self.max_id_seen)
            .checked_add(1)
            .ok_or(PlanError::InstallmentIdsExhausted)
    }

    fn placeholder_indices(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.is_locked())
            .map(|(index, _)| index)
            .collect()
    }
}

/// Assigns schedule slots to the non-deposit rows in order.
///
/// Deposit rows keep their checkout due date.
pub(crate) fn regenerate_due_dates<'a>(
    payments: impl Iterator<Item = &'a mut Installment>,
    anchor: Option<NaiveDate>,
) {
    let sequential: Vec<&mut Installment> = payments.filter(|p| !p.is_deposit).collect();
    let dates = schedule::generate(anchor, sequential.len());
    for (payment, due) in sequential.into_iter().zip(dates) {
        payment.due_date = DueDate::from_option(due);
    }
}

pub(crate) fn clear_due_dates<'a>(payments: impl Iterator<Item = &'a mut Installment>) {
    for payment in payments.filter(|p| !p.is_deposit) {
        payment.due_date = DueDate::Unset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::library::{deposit_installments, four_installments, full_payment};
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn anchor() -> Option<NaiveDate> {
        Some(date(2025, 3, 15))
    }

    fn four() -> PlanEditor {
        PlanEditor::from_plan(PlanType::FourInstallments, four_installments(anchor()))
    }

    fn with_deposit() -> PlanEditor {
        PlanEditor::from_plan(PlanType::DepositInstallments, deposit_installments(anchor()))
    }

    fn values(editor: &PlanEditor) -> Vec<u32> {
        editor.rows.iter().map(|row| row.percentage().hundredths()).collect()
    }

    fn ids(editor: &PlanEditor) -> Vec<u32> {
        editor.rows.iter().map(PlanRow::id).collect()
    }

    #[test]
    fn open_loads_saved_plan_before_default() {
        let mut library = PlanLibrary::new();
        let fresh = PlanEditor::open(PlanType::FourInstallments, &library, anchor())
            .expect("customizable");
        assert_eq!(fresh.to_plan(), four_installments(anchor()));

        let edited = fresh
            .set_plan_title("Spring plan")
            .set_percentage(1, Percentage::from_whole(40))
            .expect("known row");
        edited.commit(&mut library).expect("complete plan saves");

        let reopened = PlanEditor::open(PlanType::FourInstallments, &library, anchor())
            .expect("customizable");
        assert_eq!(reopened.title, "Spring plan");
        assert_eq!(values(&reopened), vec![4000, 2000, 2000, 2000]);
        assert!(reopened.rows.iter().all(|row| !row.is_locked()));
    }

    #[test]
    fn full_payment_cannot_be_opened_for_editing() {
        let err = PlanEditor::open(PlanType::FullPayment, &PlanLibrary::new(), anchor())
            .expect_err("not customizable");
        assert_eq!(err, PlanError::NotCustomizable(PlanType::FullPayment));
    }

    #[test]
    fn sticky_edits_rebalance_remaining_placeholders() {
        let a = four().set_percentage(1, Percentage::from_whole(40)).expect("row 1");
        assert_eq!(values(&a), vec![4000, 2000, 2000, 2000]);
        let b = a.set_percentage(2, Percentage::from_whole(10)).expect("row 2");
        assert_eq!(values(&b), vec![4000, 1000, 2500, 2500]);
        assert!(b.rows[0].is_locked() && b.rows[1].is_locked());
        assert!(!b.rows[2].is_locked());
    }

    #[test]
    fn malformed_percentage_text_is_ignored() {
        let editor = four();
        let next = editor.set_percentage_input(2, "12a").expect("known row");
        assert_eq!(next, editor);

        let typed = editor.set_percentage_input(2, "40").expect("known row");
        assert_eq!(values(&typed), vec![2000, 4000, 2000, 2000]);
    }

    #[test]
    fn unknown_row_is_a_caller_error() {
        assert_eq!(
            four().set_percentage(42, Percentage::ZERO),
            Err(PlanError::UnknownInstallment(42))
        );
        assert_eq!(four().remove_payment(42), Err(PlanError::UnknownInstallment(42)));
    }

    #[test]
    fn add_payment_extends_schedule_and_keeps_total() {
        let next = four().add_payment(anchor()).expect("next id");
        assert_eq!(ids(&next), vec![1, 2, 3, 4, 5]);
        assert_eq!(values(&next), vec![2000, 2000, 2000, 2000, 2000]);
        let added = &next.rows[4].installment;
        assert_eq!(added.title, "Payment 5");
        assert_eq!(added.due_date, DueDate::On(date(2025, 9, 1)));
        assert!(!added.is_deposit);
        assert!(next.is_complete());
    }

    #[test]
    fn add_payment_keeps_locked_rows() {
        let locked = four().set_percentage(1, Percentage::from_whole(40)).expect("row 1");
        let next = locked.add_payment(anchor()).expect("next id");
        assert_eq!(values(&next), vec![4000, 1500, 1500, 1500, 1500]);
        assert!(next.is_complete());
    }

    #[test]
    fn add_payment_fills_unclaimed_remainder() {
        let mut editor = four();
        editor.rows[0].installment.percentage = Percentage::from_whole(10);
        assert!(!editor.is_complete());

        let next = editor.add_payment(anchor()).expect("next id");
        assert_eq!(values(&next), vec![2000, 2000, 2000, 2000, 2000]);
        assert!(next.is_complete());
    }

    #[test]
    fn add_payment_without_dates_starts_from_anchor() {
        let editor = PlanEditor::from_plan(PlanType::FourInstallments, four_installments(None));
        let next = editor.add_payment(anchor()).expect("next id");
        assert_eq!(next.rows[4].installment.due_date, DueDate::On(date(2025, 5, 1)));

        let undated = editor.add_payment(None).expect("next id");
        assert_eq!(undated.rows[4].installment.due_date, DueDate::Unset);
    }

    #[test]
    fn ids_are_not_reused_after_removing_the_highest() {
        let removed = four().remove_payment(4).expect("row 4");
        let next = removed.add_payment(anchor()).expect("next id");
        assert_eq!(ids(&next), vec![1, 2, 3, 5]);
    }

    #[test]
    fn add_payment_refuses_when_ids_run_out() {
        let mut editor = four();
        editor.max_id_seen = u32::MAX;
        assert_eq!(
            editor.add_payment(anchor()),
            Err(PlanError::InstallmentIdsExhausted)
        );

        let mut editor = four();
        editor.rows[3].installment.id = u32::MAX;
        assert_eq!(
            editor.apply(&PlanCommand::AddPayment, anchor()),
            Err(PlanError::InstallmentIdsExhausted)
        );
    }

    #[test]
    fn full_payment_session_is_never_committed() {
        let mut library = PlanLibrary::new();
        let editor = PlanEditor::from_plan(PlanType::FullPayment, full_payment(None));
        assert_eq!(
            editor.commit(&mut library),
            Err(PlanError::NotCustomizable(PlanType::FullPayment))
        );
        assert!(!library.contains(PlanType::FullPayment));
    }

    #[test]
    fn removal_folds_share_into_placeholders() {
        let editor = PlanEditor::from_plan(
            PlanType::FourInstallments,
            four_installments(anchor()),
        )
        .remove_payment(4)
        .expect("row 4")
        .set_percentage(1, Percentage::from_whole(40))
        .expect("row 1");
        assert_eq!(values(&editor), vec![4000, 3000, 3000]);

        let next = editor.remove_payment(2).expect("row 2");
        assert_eq!(ids(&next), vec![1, 3]);
        assert_eq!(values(&next), vec![4000, 6000]);
    }

    #[test]
    fn removing_locked_row_redistributes_its_share() {
        let editor = four().set_percentage(2, Percentage::from_whole(10)).expect("row 2");
        assert_eq!(values(&editor), vec![3000, 1000, 3000, 3000]);
        let next = editor.remove_payment(2).expect("row 2");
        assert_eq!(values(&next), vec![3333, 3333, 3334]);
    }

    #[test]
    fn removal_with_only_locked_rows_left_reports_incomplete() {
        let editor = four()
            .set_percentage(1, Percentage::from_whole(25))
            .and_then(|e| e.set_percentage(2, Percentage::from_whole(25)))
            .and_then(|e| e.set_percentage(3, Percentage::from_whole(25)))
            .expect("known rows");
        let next = editor.remove_payment(4).expect("row 4");
        assert_eq!(values(&next), vec![2500, 2500, 2500]);
        assert!(!next.is_complete());
    }

    #[test]
    fn last_row_is_never_removed() {
        let single = four()
            .remove_payment(1)
            .and_then(|e| e.remove_payment(2))
            .and_then(|e| e.remove_payment(3))
            .expect("known rows");
        assert_eq!(ids(&single), vec![4]);
        assert_eq!(values(&single), vec![10_000]);
        assert_eq!(single.remove_payment(4).expect("known row"), single);
    }

    #[test]
    fn deposit_only_on_first_row() {
        let err = four().set_deposit(3, true, anchor()).expect_err("third row");
        assert_eq!(err, PlanError::DepositNotFirst { id: 3, position: 2 });
    }

    #[test]
    fn deposit_stays_exclusive_when_another_row_is_flagged() {
        let editor = with_deposit();
        let err = editor.set_deposit(3, true, anchor()).expect_err("third row");
        assert_eq!(err, PlanError::DepositNotFirst { id: 3, position: 2 });

        let deposits: Vec<u32> = editor
            .rows
            .iter()
            .filter(|row| row.installment.is_deposit)
            .map(PlanRow::id)
            .collect();
        assert_eq!(deposits, vec![1]);

        let reflagged = editor.set_deposit(1, true, anchor()).expect("first row");
        assert_eq!(
            reflagged.rows.iter().filter(|row| row.installment.is_deposit).count(),
            1
        );
    }

    #[test]
    fn flagging_deposit_shifts_schedule() {
        let next = four().set_deposit(1, true, anchor()).expect("first row");
        let deposits: Vec<u32> = next
            .rows
            .iter()
            .filter(|row| row.installment.is_deposit)
            .map(PlanRow::id)
            .collect();
        assert_eq!(deposits, vec![1]);
        assert_eq!(next.rows[0].installment.due_date, DueDate::AtCheckout);
        assert_eq!(next.rows[1].installment.due_date, DueDate::On(date(2025, 5, 1)));
        assert_eq!(next.rows[3].installment.due_date, DueDate::On(date(2025, 7, 1)));
    }

    #[test]
    fn unflagging_deposit_clears_its_date_until_refresh() {
        let next = with_deposit().set_deposit(1, false, anchor()).expect("first row");
        let first = &next.rows[0].installment;
        assert!(!first.is_deposit);
        assert_eq!(first.due_date, DueDate::Unset);

        let refreshed = next.refresh_due_dates(anchor());
        assert_eq!(refreshed.rows[0].installment.due_date, DueDate::On(date(2025, 5, 1)));
        assert_eq!(refreshed.rows[4].installment.due_date, DueDate::On(date(2025, 9, 1)));
    }

    #[test]
    fn manual_due_date_is_refused_on_deposit() {
        let err = with_deposit()
            .set_due_date(1, Some(date(2025, 4, 1)))
            .expect_err("deposit row");
        assert_eq!(err, PlanError::DepositDueDateFixed(1));

        let next = with_deposit().set_due_date(2, None).expect("sequential row");
        assert_eq!(next.rows[1].installment.due_date, DueDate::Unset);
    }

    #[test]
    fn clearing_dates_keeps_checkout_sentinel() {
        let cleared = with_deposit().clear_due_dates();
        assert_eq!(cleared.rows[0].installment.due_date, DueDate::AtCheckout);
        assert!(cleared.rows[1..].iter().all(|r| r.installment.due_date == DueDate::Unset));
    }

    #[test]
    fn reset_restores_default_and_unlocks() {
        let edited = with_deposit()
            .set_percentage(2, Percentage::from_whole(50))
            .expect("row 2")
            .set_plan_title("Custom");
        let reset = edited.reset_to_default(anchor());
        assert_eq!(reset, with_deposit());
    }

    #[test]
    fn commands_deserialize_from_tagged_json() {
        let command: PlanCommand =
            serde_json::from_str(r#"{"op":"setDeposit","id":1,"isDeposit":true}"#).expect("parse");
        assert_eq!(command, PlanCommand::SetDeposit { id: 1, is_deposit: true });

        let command: PlanCommand =
            serde_json::from_str(r#"{"op":"setDueDate","id":2,"dueDate":"2025-06-15"}"#)
                .expect("parse");
        assert_eq!(
            command,
            PlanCommand::SetDueDate {
                id: 2,
                due_date: Some(date(2025, 6, 15))
            }
        );

        let applied = four().apply(&PlanCommand::AddPayment, anchor()).expect("apply");
        assert_eq!(applied.rows.len(), 5);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_operation_sequences_stay_complete_until_locks_overcommit(
            ops in proptest::collection::vec((0u8..4, 0usize..32, 0u32..=10_000), 1..40)
        ) {
            let mut editor = with_deposit();
            let mut overcommitted = false;
            for (kind, pick, value) in ops {
                let index = pick % editor.rows.len();
                let id = editor.rows[index].id();
                let locked_elsewhere: u32 = editor
                    .rows
                    .iter()
                    .enumerate()
                    .filter(|(i, row)| *i != index && row.is_locked())
                    .map(|(_, row)| row.percentage().hundredths())
                    .sum();
                let placeholders_elsewhere = editor
                    .rows
                    .iter()
                    .enumerate()
                    .any(|(i, row)| i != index && !row.is_locked());

                editor = match kind {
                    0 => editor.add_payment(anchor()).expect("next id"),
                    1 => {
                        let removed = editor.rows[index].percentage().hundredths();
                        let next = editor.remove_payment(id).expect("present row");
                        if next.rows.len() < editor.rows.len()
                            && !placeholders_elsewhere
                            && removed > 0
                        {
                            overcommitted = true;
                        }
                        next
                    }
                    2 => {
                        if value < 10_000
                            && (!placeholders_elsewhere || value + locked_elsewhere >= 10_000)
                        {
                            overcommitted = true;
                        }
                        editor
                            .set_percentage(id, Percentage::from_hundredths(value))
                            .expect("present row")
                    }
                    _ => editor.set_deposit(editor.rows[0].id(), true, anchor()).expect("first row"),
                };
                if !overcommitted {
                    prop_assert!(editor.is_complete());
                }
                prop_assert!(!editor.rows.is_empty());
                prop_assert!(editor.rows.iter().skip(1).all(|row| !row.installment.is_deposit));

                let mut seen = ids(&editor);
                seen.sort_unstable();
                seen.dedup();
                prop_assert_eq!(seen.len(), editor.rows.len());
            }
        }

        #[test]
        fn prop_single_edit_then_growth_stays_complete(
            count in 1usize..=20,
            value in 0u32..=10_000
        ) {
            let mut editor = PlanEditor::from_plan(PlanType::FourInstallments, four_installments(anchor()));
            while editor.rows.len() < count {
                editor = editor.add_payment(anchor()).expect("next id");
            }
            while editor.rows.len() > count {
                let id = editor.rows[editor.rows.len() - 1].id();
                editor = editor.remove_payment(id).expect("present row");
            }
            prop_assert!(editor.is_complete());

            let id = editor.rows[0].id();
            let edited = editor.set_percentage(id, Percentage::from_hundredths(value)).expect("row");
            if count > 1 || value == 10_000 {
                prop_assert!(edited.is_complete());
            }
            let grown = edited.add_payment(anchor()).expect("next id");
            if count > 1 || value == 10_000 {
                prop_assert!(grown.is_complete());
            }
        }
    }
}
