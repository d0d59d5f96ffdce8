use crate::core::PlanType;

/// Caller-contract violations raised by the plan engine.
///
/// Policy branches such as an invalid anchor date, malformed percentage text
/// or removing the only installment are not errors; they leave the plan in a
/// well-defined state instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("no installment with id {0}")]
    UnknownInstallment(u32),

    /// Only the installment at position 0 may carry the deposit flag.
    #[error("installment {id} is at position {position}; only the first installment can be a deposit")]
    DepositNotFirst { id: u32, position: usize },

    #[error("installment id {0} appears more than once")]
    DuplicateInstallmentId(u32),

    #[error("no installment ids left to assign")]
    InstallmentIdsExhausted,

    #[error("installment {0} is a deposit and is always due at checkout")]
    DepositDueDateFixed(u32),

    /// Percentages must sum to exactly 100 before a plan is saved.
    #[error("payment plan is incomplete: {remaining}% remaining")]
    IncompletePlan { remaining: String },

    #[error("{} plans cannot be customized", .0.label())]
    NotCustomizable(PlanType),

    #[error("no registration with id {0}")]
    UnknownRegistration(u64),
}

pub type Result<T> = std::result::Result<T, PlanError>;
