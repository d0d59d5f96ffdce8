use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::library::PlanLibrary;
use super::plan::PlanEditor;
use super::registration::{Price, parse_price};
use super::schedule::format_date;
use super::types::{Installment, Percentage, PaymentPlan, PlanType};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentView {
    pub id: u32,
    pub title: String,
    pub due_date: String,
    pub percentage: Percentage,
    pub amount: String,
    pub is_deposit: bool,
    pub locked: bool,
}

/// What the plan editor shows below the installment table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub title: String,
    pub rows: Vec<InstallmentView>,
    pub total_percentage: Percentage,
    pub complete: bool,
    pub remaining: String,
    pub status_text: String,
}

pub fn summarize(plan: &PaymentPlan, price: Price) -> PlanSummary {
    build_summary(
        &plan.title,
        plan.payments.iter().map(|p| (p, false)),
        plan.remaining(),
        price,
    )
}

pub fn summarize_editor(editor: &PlanEditor, price: Price) -> PlanSummary {
    let remaining = i64::from(Percentage::FULL.hundredths()) - i64::from(editor.total());
    build_summary(
        &editor.title,
        editor.rows.iter().map(|row| (&row.installment, row.is_locked())),
        remaining,
        price,
    )
}

fn build_summary<'a>(
    title: &str,
    rows: impl Iterator<Item = (&'a Installment, bool)>,
    remaining: i64,
    price: Price,
) -> PlanSummary {
    let rows: Vec<InstallmentView> = rows
        .map(|(payment, locked)| InstallmentView {
            id: payment.id,
            title: payment.title.clone(),
            due_date: payment.due_date.to_string(),
            percentage: payment.percentage,
            amount: format_amount(installment_amount(price, payment.percentage)),
            is_deposit: payment.is_deposit,
            locked,
        })
        .collect();
    let total = i64::from(Percentage::FULL.hundredths()) - remaining;
    let complete = remaining == 0;
    let remaining = format_signed_hundredths(remaining);
    let status_text = if complete {
        "Payment plan is complete (100%)".to_string()
    } else {
        format!("Remaining: {remaining}%")
    };
    PlanSummary {
        title: title.to_string(),
        rows,
        total_percentage: Percentage::from_hundredths(u32::try_from(total).unwrap_or(0)),
        complete,
        remaining,
        status_text,
    }
}

/// `price * percentage / 100`, rounded to cents.
pub fn installment_amount(price: Price, percentage: Percentage) -> Decimal {
    match price {
        Price::Free => Decimal::ZERO,
        Price::Amount(total) => {
            let share = Decimal::new(i64::from(percentage.hundredths()), 4);
            round_cents(total * share)
        }
    }
}

fn round_cents(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Plain two-decimal amount, e.g. `1234.50`.
pub fn format_amount(amount: Decimal) -> String {
    round_cents(amount).to_string()
}

/// US dollar amount with thousands separators, e.g. `$1,234.50`.
pub fn format_currency(amount: Decimal) -> String {
    let plain = format_amount(amount);
    let (sign, digits) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain.as_str()),
    };
    let (whole, cents) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{sign}${grouped}.{cents}")
}

pub fn format_price(price: &str, is_free: bool) -> String {
    if is_free {
        return "Free".to_string();
    }
    format_currency(parse_price(price))
}

pub fn format_optional_date(date: Option<NaiveDate>) -> String {
    date.map(format_date).unwrap_or_else(|| "Not set".to_string())
}

pub fn payment_options_text(enabled: &BTreeSet<PlanType>) -> String {
    if enabled.is_empty() {
        return "No payment options".to_string();
    }
    enabled
        .iter()
        .map(|plan_type| plan_type.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The saved plan's title, falling back to the default title for the type.
pub fn plan_title(library: &PlanLibrary, plan_type: PlanType) -> String {
    library
        .get(plan_type)
        .map(|plan| plan.title.clone())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| plan_type.default_title().to_string())
}

/// Hundredths as a signed two-decimal number, e.g. `-12.50`.
pub fn format_signed_hundredths(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let magnitude = value.unsigned_abs();
    format!("{sign}{}.{:02}", magnitude / 100, magnitude % 100)
}
