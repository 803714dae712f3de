//! Dutch date grammars used on diploma register extracts.
//!
//! Two forms occur: a full date such as `3 maart 1990` and, for some
//! achievement dates, only a month such as `Augustus 2016`. Both are
//! normalized to `DD-MM-YYYY`. A value that fits neither grammar becomes the
//! empty string; it is never an error at this level.

/// Month names, January first.
const DUTCH_MONTHS: [&str; 12] = [
    "januari",
    "februari",
    "maart",
    "april",
    "mei",
    "juni",
    "juli",
    "augustus",
    "september",
    "oktober",
    "november",
    "december",
];

fn month_number(name: &str) -> Option<u32> {
    DUTCH_MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|i| i as u32 + 1)
}

fn positive(field: &str) -> Option<u32> {
    field.parse::<u32>().ok().filter(|n| *n > 0)
}

/// Parse `D monthname YYYY`. The month name must be lowercase.
///
/// ```
/// # use diploma_oxide::extract::dates::parse_dutch_date;
/// assert_eq!(parse_dutch_date("3 maart 1990"), "03-03-1990");
/// assert_eq!(parse_dutch_date("3 Maart 1990"), "");
/// ```
pub fn parse_dutch_date(input: &str) -> String {
    let fields: Vec<&str> = input.split_whitespace().collect();
    let [day, month, year] = fields.as_slice() else {
        return String::new();
    };
    match (positive(day), month_number(month), positive(year)) {
        (Some(day), Some(month), Some(year)) => format!("{:02}-{:02}-{:04}", day, month, year),
        _ => String::new(),
    }
}

/// Parse `Monthname YYYY` (any case) as the first day of that month.
///
/// ```
/// # use diploma_oxide::extract::dates::parse_dutch_month;
/// assert_eq!(parse_dutch_month("Augustus 2016"), "01-08-2016");
/// ```
pub fn parse_dutch_month(input: &str) -> String {
    let fields: Vec<&str> = input.split_whitespace().collect();
    let [month, year] = fields.as_slice() else {
        return String::new();
    };
    match (month_number(&month.to_lowercase()), positive(year)) {
        (Some(month), Some(year)) => format!("01-{:02}-{:04}", month, year),
        _ => String::new(),
    }
}

/// Full date, falling back to the month-only form.
pub fn parse_dutch_date_or_month(input: &str) -> String {
    let date = parse_dutch_date(input);
    if date.is_empty() {
        parse_dutch_month(input)
    } else {
        date
    }
}
