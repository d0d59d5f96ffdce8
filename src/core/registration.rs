use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::library::{PlanLibrary, default_plan};
use super::plan::{PlanEditor, clear_due_dates, regenerate_due_dates};
use super::types::{PaymentPlan, PlanType};
use crate::error::{PlanError, Result};

pub const PAST_START_DATE: &str = "must be today or in the future";
pub const END_BEFORE_START: &str = "End date must be on or after the start date";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateValidation {
    pub valid: bool,
    pub reason: Option<String>,
}

/// An unset start date is valid; a date before `today` is not.
pub fn validate_start_date(date: Option<NaiveDate>, today: NaiveDate) -> DateValidation {
    match date {
        Some(date) if date < today => DateValidation {
            valid: false,
            reason: Some(PAST_START_DATE.to_string()),
        },
        _ => DateValidation {
            valid: true,
            reason: None,
        },
    }
}

pub fn date_range_warning(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<&'static str> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Some(END_BEFORE_START),
        _ => None,
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Price {
    Free,
    Amount(Decimal),
}

/// Keeps digits and the first decimal point, with at most two decimals.
pub fn sanitize_price_input(raw: &str) -> String {
    let numeric: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    match numeric.split_once('.') {
        None => numeric,
        Some((whole, rest)) => {
            let fraction: String = rest.chars().filter(|c| *c != '.').take(2).collect();
            format!("{whole}.{fraction}")
        }
    }
}

/// Unparseable or empty price text counts as zero.
pub fn parse_price(price: &str) -> Decimal {
    Decimal::from_str(price.trim()).unwrap_or(Decimal::ZERO)
}

fn default_plan_types() -> BTreeSet<PlanType> {
    BTreeSet::from([PlanType::FourInstallments, PlanType::DepositInstallments])
}

/// The registration being configured; the plan engine reads its start date
/// and price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_plan_types")]
    pub enabled_plan_types: BTreeSet<PlanType>,
    #[serde(default, rename = "savedPlans")]
    pub plan_library: PlanLibrary,
}

impl Default for RegistrationDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            price: String::new(),
            is_free: false,
            start_date: None,
            end_date: None,
            enabled_plan_types: default_plan_types(),
            plan_library: PlanLibrary::new(),
        }
    }
}

/// Result of moving the anchor date.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorChange {
    pub validation: DateValidation,
    pub session: Option<PlanEditor>,
}

impl RegistrationDraft {
    /// The start date when it passes validation.
    pub fn anchor_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.start_date
            .filter(|_| validate_start_date(self.start_date, today).valid)
    }

    pub fn total_price(&self) -> Price {
        if self.is_free {
            Price::Free
        } else {
            Price::Amount(parse_price(&self.price))
        }
    }

    pub fn set_price_input(&mut self, raw: &str) {
        self.price = sanitize_price_input(raw);
    }

    pub fn set_free(&mut self, is_free: bool) {
        self.is_free = is_free;
        if is_free {
            self.price = "0.00".to_string();
        }
    }

    pub fn date_range_warning(&self) -> Option<&'static str> {
        date_range_warning(self.start_date, self.end_date)
    }

    /// Moves the anchor date and refreshes every dependent due date.
    ///
    /// A past date clears the sequential due dates of the active session and
    /// of every saved plan; otherwise they are regenerated from the new date.
    /// Deposit rows stay due at checkout either way.
    pub fn change_start_date(
        &mut self,
        date: Option<NaiveDate>,
        today: NaiveDate,
        session: Option<&PlanEditor>,
    ) -> AnchorChange {
        self.start_date = date;
        let validation = validate_start_date(date, today);

        if validation.valid {
            for plan in self.plan_library.plans_mut() {
                regenerate_due_dates(plan.payments.iter_mut(), date);
            }
        } else {
            for plan in self.plan_library.plans_mut() {
                clear_due_dates(plan.payments.iter_mut());
            }
        }
        info!(
            start_date = ?date,
            valid = validation.valid,
            saved_plans = self.plan_library.len(),
            "refreshed installment due dates"
        );

        let session = session.map(|editor| {
            if validation.valid {
                editor.refresh_due_dates(date)
            } else {
                editor.clear_due_dates()
            }
        });
        AnchorChange {
            validation,
            session,
        }
    }

    pub fn open_plan(&self, plan_type: PlanType, today: NaiveDate) -> Result<PlanEditor> {
        PlanEditor::open(plan_type, &self.plan_library, self.anchor_date(today))
    }

    /// Stores the session's plan; incomplete plans are refused.
    pub fn save_plan(&mut self, editor: &PlanEditor) -> Result<()> {
        editor.commit(&mut self.plan_library)
    }

    /// The saved plan for `plan_type`, or its default.
    pub fn effective_plan(&self, plan_type: PlanType, today: NaiveDate) -> PaymentPlan {
        match plan_type {
            PlanType::FullPayment => default_plan(plan_type, self.start_date),
            _ => self
                .plan_library
                .load(plan_type)
                .unwrap_or_else(|| default_plan(plan_type, self.anchor_date(today))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub draft: RegistrationDraft,
}

/// Registrations kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct RegistrationList {
    next_id: u64,
    registrations: Vec<Registration>,
}

impl RegistrationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, draft: RegistrationDraft, now: DateTime<Utc>) -> Registration {
        self.next_id += 1;
        let registration = Registration {
            id: self.next_id,
            created_at: now,
            draft,
        };
        self.registrations.push(registration.clone());
        registration
    }

    pub fn list(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn get(&self, id: u64) -> Result<&Registration> {
        self.registrations
            .iter()
            .find(|r| r.id == id)
            .ok_or(PlanError::UnknownRegistration(id))
    }

    pub fn get_mut(&mut self, id: u64) -> Result<&mut Registration> {
        self.registrations
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(PlanError::UnknownRegistration(id))
    }

    /// Copies a registration, saved plans included, under a new id.
    pub fn duplicate(&mut self, id: u64, now: DateTime<Utc>) -> Result<Registration> {
        let mut draft = self.get(id)?.draft.clone();
        draft.title = format!("{} (Copy)", draft.title);
        Ok(self.create(draft, now))
    }

    pub fn delete(&mut self, id: u64) -> Result<Registration> {
        let index = self
            .registrations
            .iter()
            .position(|r| r.id == id)
            .ok_or(PlanError::UnknownRegistration(id))?;
        Ok(self.registrations.remove(index))
    }
}
