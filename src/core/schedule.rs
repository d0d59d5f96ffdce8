use chrono::{Datelike, Months, NaiveDate};

/// Months between the anchor's month and the month of the first due date.
pub const LEAD_MONTHS: u32 = 2;

const DISPLAY_FORMAT: &str = "%b %-d, %Y";

/// First of the month [`LEAD_MONTHS`] after the anchor's month.
pub fn first_due_date(anchor: NaiveDate) -> Option<NaiveDate> {
    anchor
        .with_day(1)?
        .checked_add_months(Months::new(LEAD_MONTHS))
}

/// Due dates for `count` sequential installments, one calendar month apart.
///
/// Without an anchor every slot is `None`.
pub fn generate(anchor: Option<NaiveDate>, count: usize) -> Vec<Option<NaiveDate>> {
    let Some(first) = anchor.and_then(first_due_date) else {
        return vec![None; count];
    };
    (0..count)
        .map(|offset| {
            u32::try_from(offset)
                .ok()
                .and_then(|offset| first.checked_add_months(Months::new(offset)))
        })
        .collect()
}

/// String form of [`generate`]: unparseable anchors yield empty strings.
pub fn generate_display(anchor: &str, count: usize) -> Vec<String> {
    generate(parse_date(anchor), count)
        .into_iter()
        .map(|date| date.map(format_date).unwrap_or_default())
        .collect()
}

pub fn next_month(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(1))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

/// Accepts ISO `2025-03-15` or the display form `Mar 15, 2025`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%b %d, %Y"))
        .ok()
}
