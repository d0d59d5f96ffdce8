use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::schedule::{format_date, parse_date};

pub const CHECKOUT_LABEL: &str = "Due at checkout";

/// A share of the total price in hundredths of a percent.
///
/// All allocation happens on this integer representation, so a plan is
/// complete exactly when its shares add up to [`Percentage::FULL`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Percentage(u32);

impl Percentage {
    pub const ZERO: Self = Self(0);
    pub const FULL: Self = Self(10_000);

    pub const fn from_hundredths(hundredths: u32) -> Self {
        Self(hundredths)
    }

    pub const fn from_whole(percent: u32) -> Self {
        Self(percent * 100)
    }

    pub const fn hundredths(self) -> u32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Quantizes a real percentage to hundredths, clamping to 100.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let hundredths = (value * 100.0).round().min(f64::from(Self::FULL.0));
        Some(Self(hundredths as u32))
    }

    /// Parses operator text of the form `digits[.digits]`.
    ///
    /// Empty text is zero. Anything else that is not plain decimal text is
    /// rejected. Values are rounded to hundredths and clamped to 100.
    pub fn parse_input(text: &str) -> Option<Self> {
        let (whole, fraction) = match text.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (text, ""),
        };
        if !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        let whole_value: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().unwrap_or(u64::MAX)
        };
        let digits: Vec<u64> = fraction.bytes().map(|b| u64::from(b - b'0')).collect();
        let tenths = digits.first().copied().unwrap_or(0);
        let hundredths = digits.get(1).copied().unwrap_or(0);
        let round_up = u64::from(digits.get(2).is_some_and(|d| *d >= 5));

        let total = whole_value
            .saturating_mul(100)
            .saturating_add(tenths * 10 + hundredths)
            .saturating_add(round_up);
        let clamped = total.min(u64::from(Self::FULL.0));
        Some(Self(u32::try_from(clamped).unwrap_or(Self::FULL.0)))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Percentage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Self::from_f64(value).ok_or_else(|| {
            serde::de::Error::custom(format!("percentage must be a non-negative number, got {value}"))
        })
    }
}

/// When an installment falls due.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum DueDate {
    #[default]
    Unset,
    AtCheckout,
    On(NaiveDate),
}

impl DueDate {
    pub fn date(self) -> Option<NaiveDate> {
        match self {
            DueDate::On(date) => Some(date),
            DueDate::Unset | DueDate::AtCheckout => None,
        }
    }

    pub fn from_option(date: Option<NaiveDate>) -> Self {
        date.map_or(DueDate::Unset, DueDate::On)
    }
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueDate::Unset => Ok(()),
            DueDate::AtCheckout => f.write_str(CHECKOUT_LABEL),
            DueDate::On(date) => f.write_str(&format_date(*date)),
        }
    }
}

impl From<DueDate> for String {
    fn from(value: DueDate) -> Self {
        match value {
            DueDate::Unset => String::new(),
            DueDate::AtCheckout => CHECKOUT_LABEL.to_string(),
            DueDate::On(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

impl TryFrom<String> for DueDate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(DueDate::Unset);
        }
        if trimmed.eq_ignore_ascii_case(CHECKOUT_LABEL) {
            return Ok(DueDate::AtCheckout);
        }
        parse_date(trimmed)
            .map(DueDate::On)
            .ok_or_else(|| format!("unrecognized due date {value:?}"))
    }
}

impl Serialize for DueDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from(*self))
    }
}

impl<'de> Deserialize<'de> for DueDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DueDate::try_from(raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub due_date: DueDate,
    pub percentage: Percentage,
    #[serde(default)]
    pub is_deposit: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPlan {
    pub title: String,
    pub payments: Vec<Installment>,
}

impl PaymentPlan {
    pub fn total(&self) -> u32 {
        total_hundredths(self.payments.iter())
    }

    pub fn is_complete(&self) -> bool {
        self.total() == Percentage::FULL.hundredths()
    }

    /// Hundredths still missing to reach 100; negative when overcommitted.
    pub fn remaining(&self) -> i64 {
        i64::from(Percentage::FULL.hundredths()) - i64::from(self.total())
    }
}

pub(crate) fn total_hundredths<'a>(payments: impl Iterator<Item = &'a Installment>) -> u32 {
    payments.map(|p| p.percentage.hundredths()).sum()
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanType {
    #[serde(alias = "full-payment", alias = "full_payment")]
    FullPayment,
    #[serde(alias = "four-installments", alias = "four_installments")]
    FourInstallments,
    #[serde(alias = "deposit-installments", alias = "deposit_installments")]
    DepositInstallments,
}

impl PlanType {
    pub const ALL: [PlanType; 3] = [
        PlanType::FullPayment,
        PlanType::FourInstallments,
        PlanType::DepositInstallments,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PlanType::FullPayment => "fullPayment",
            PlanType::FourInstallments => "fourInstallments",
            PlanType::DepositInstallments => "depositInstallments",
        }
    }

    /// Name shown in the list of enabled payment options.
    pub fn label(self) -> &'static str {
        match self {
            PlanType::FullPayment => "Full Payment",
            PlanType::FourInstallments => "4 Installments",
            PlanType::DepositInstallments => "4 Installments (with deposit)",
        }
    }

    pub fn default_title(self) -> &'static str {
        match self {
            PlanType::FullPayment => "Full Payment",
            PlanType::FourInstallments => "4 Installments",
            PlanType::DepositInstallments => "Deposit + 4 Installments",
        }
    }

    /// Full payment is always one row due on the start date.
    pub fn is_customizable(self) -> bool {
        !matches!(self, PlanType::FullPayment)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    /// The operator typed a percentage into this row during the session.
    Locked,
    #[default]
    Placeholder,
}

/// An installment inside an editing session, tagged with its edit status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRow {
    #[serde(flatten)]
    pub installment: Installment,
    #[serde(default)]
    pub status: RowStatus,
}

impl PlanRow {
    pub fn placeholder(installment: Installment) -> Self {
        Self {
            installment,
            status: RowStatus::Placeholder,
        }
    }

    pub fn id(&self) -> u32 {
        self.installment.id
    }

    pub fn percentage(&self) -> Percentage {
        self.installment.percentage
    }

    pub fn is_locked(&self) -> bool {
        self.status == RowStatus::Locked
    }
}
