mod allocator;
mod display;
mod library;
mod plan;
mod registration;
mod schedule;
mod types;

pub use allocator::{distribute_equally, rebalance_on_edit};
pub use display::{
    InstallmentView, PlanSummary, format_amount, format_currency, format_optional_date,
    format_price, format_signed_hundredths, installment_amount, payment_options_text, plan_title,
    summarize, summarize_editor,
};
pub use library::{
    PlanLibrary, default_plan, deposit_installments, four_installments, full_payment, is_complete,
    validate_rows,
};
pub use plan::{PlanCommand, PlanEditor};
pub use registration::{
    AnchorChange, DateValidation, END_BEFORE_START, PAST_START_DATE, Price, Registration,
    RegistrationDraft, RegistrationList, date_range_warning, parse_price, sanitize_price_input,
    validate_start_date,
};
pub use schedule::{LEAD_MONTHS, first_due_date, format_date, generate, generate_display, parse_date};
pub use types::{
    CHECKOUT_LABEL, DueDate, Installment, PaymentPlan, Percentage, PlanRow, PlanType, RowStatus,
};
