use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::allocator::distribute_equally;
use super::schedule;
use super::types::{DueDate, Installment, Percentage, PaymentPlan, PlanType};
use crate::error::{PlanError, Result};

const DEFAULT_INSTALLMENTS: usize = 4;

/// Saved plans keyed by plan type.
///
/// Entries are snapshots: they are written on save and read when a session
/// opens, never shared with a live session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanLibrary {
    plans: BTreeMap<PlanType, PaymentPlan>,
}

impl PlanLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a copy of `plan`.
    ///
    /// Refuses plan types that cannot be customized, plans that fail
    /// [`validate_rows`] and incomplete plans.
    pub fn save(&mut self, plan_type: PlanType, plan: &PaymentPlan) -> Result<()> {
        if !plan_type.is_customizable() {
            return Err(PlanError::NotCustomizable(plan_type));
        }
        validate_rows(plan)?;
        if !is_complete(plan) {
            return Err(PlanError::IncompletePlan {
                remaining: super::display::format_signed_hundredths(plan.remaining()),
            });
        }
        info!(
            plan_type = plan_type.key(),
            installments = plan.payments.len(),
            "saved payment plan"
        );
        self.plans.insert(plan_type, plan.clone());
        Ok(())
    }

    pub fn load(&self, plan_type: PlanType) -> Option<PaymentPlan> {
        self.plans.get(&plan_type).cloned()
    }

    pub fn get(&self, plan_type: PlanType) -> Option<&PaymentPlan> {
        self.plans.get(&plan_type)
    }

    pub fn contains(&self, plan_type: PlanType) -> bool {
        self.plans.contains_key(&plan_type)
    }

    pub fn remove(&mut self, plan_type: PlanType) -> Option<PaymentPlan> {
        self.plans.remove(&plan_type)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub(crate) fn plans_mut(&mut self) -> impl Iterator<Item = &mut PaymentPlan> {
        self.plans.values_mut()
    }
}

/// Ids are unique and only the first row may be a deposit.
pub fn validate_rows(plan: &PaymentPlan) -> Result<()> {
    let mut seen = BTreeSet::new();
    for (position, payment) in plan.payments.iter().enumerate() {
        if payment.is_deposit && position != 0 {
            return Err(PlanError::DepositNotFirst {
                id: payment.id,
                position,
            });
        }
        if !seen.insert(payment.id) {
            return Err(PlanError::DuplicateInstallmentId(payment.id));
        }
    }
    Ok(())
}

/// True iff the percentages add up to exactly 100.
pub fn is_complete(plan: &PaymentPlan) -> bool {
    plan.is_complete()
}

/// The plan an operator starts from when nothing is saved for `plan_type`.
pub fn default_plan(plan_type: PlanType, anchor: Option<NaiveDate>) -> PaymentPlan {
    match plan_type {
        PlanType::FullPayment => full_payment(anchor),
        PlanType::FourInstallments => four_installments(anchor),
        PlanType::DepositInstallments => deposit_installments(anchor),
    }
}

/// One row for the whole price, due on the registration start date.
pub fn full_payment(start_date: Option<NaiveDate>) -> PaymentPlan {
    PaymentPlan {
        title: PlanType::FullPayment.default_title().to_string(),
        payments: vec![Installment {
            id: 1,
            title: PlanType::FullPayment.default_title().to_string(),
            due_date: DueDate::from_option(start_date),
            percentage: Percentage::FULL,
            is_deposit: false,
        }],
    }
}

pub fn four_installments(anchor: Option<NaiveDate>) -> PaymentPlan {
    PaymentPlan {
        title: PlanType::FourInstallments.default_title().to_string(),
        payments: sequential_rows(anchor, DEFAULT_INSTALLMENTS, 1, DEFAULT_INSTALLMENTS),
    }
}

pub fn deposit_installments(anchor: Option<NaiveDate>) -> PaymentPlan {
    let shares = distribute_equally(Percentage::FULL, DEFAULT_INSTALLMENTS + 1);
    let mut payments = vec![Installment {
        id: 1,
        title: "Deposit".to_string(),
        due_date: DueDate::AtCheckout,
        percentage: shares[0],
        is_deposit: true,
    }];
    payments.extend(sequential_rows(anchor, DEFAULT_INSTALLMENTS, 2, DEFAULT_INSTALLMENTS + 1));
    PaymentPlan {
        title: PlanType::DepositInstallments.default_title().to_string(),
        payments,
    }
}

/// `count` dated rows numbered from `first_id`, each taking an equal share
/// of a split over `split_over` rows.
fn sequential_rows(
    anchor: Option<NaiveDate>,
    count: usize,
    first_id: u32,
    split_over: usize,
) -> Vec<Installment> {
    let shares = distribute_equally(Percentage::FULL, split_over);
    let offset = split_over - count;
    schedule::generate(anchor, count)
        .into_iter()
        .zip(&shares[offset..])
        .zip(first_id..)
        .enumerate()
        .map(|(position, ((due, share), id))| Installment {
            id,
            title: format!("Payment {}", position + 1),
            due_date: DueDate::from_option(due),
            percentage: *share,
            is_deposit: false,
        })
        .collect()
}
