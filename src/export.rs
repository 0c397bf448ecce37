//! CSV exports and printable reports of the expenses the user is looking at.
//!
//! Both documents take the filtered and sorted collection across every page,
//! never just the visible page, so that they agree with the displayed total.

use maud::{DOCTYPE, Markup, html};
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::{Error, currency::format_currency, date_range::DateRange, record::Record};

/// The file name suggested for CSV exports.
pub const DEFAULT_CSV_FILE_NAME: &str = "expenses.csv";

const CSV_HEADER: [&str; 6] = [
    "Date",
    "Expense",
    "Amount",
    "Primary Category",
    "Secondary Category",
    "ID",
];

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[day]/[month]/[year]");

/// Write `records` as CSV with a header row.
///
/// # Errors
/// Returns [Error::NothingToExport] if `records` is empty, or
/// [Error::CsvError] if the CSV could not be written.
pub fn write_csv(records: &[Record]) -> Result<String, Error> {
    if records.is_empty() {
        return Err(Error::NothingToExport);
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for record in records {
        writer.write_record([
            format_date(record.occurred_at),
            record.description.clone(),
            format!("{:.2}", record.amount),
            record.primary_category.clone(),
            record.secondary_category.clone(),
            record.id.to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;

    String::from_utf8(bytes).map_err(|error| Error::CsvError(error.to_string()))
}

/// The summary printed above the table in a report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportHeading<'a> {
    /// The range the expenses were fetched for, `None` for all time.
    pub range: Option<DateRange>,
    /// The total over every record in the report.
    pub total_amount: f64,
    /// The symbol put in front of amounts.
    pub currency_symbol: &'a str,
}

/// Render `records` as a standalone HTML document ready for printing.
///
/// # Errors
/// Returns [Error::NothingToExport] if `records` is empty.
pub fn render_report(records: &[Record], heading: &ReportHeading) -> Result<String, Error> {
    if records.is_empty() {
        return Err(Error::NothingToExport);
    }

    Ok(report_view(records, heading).into_string())
}

const REPORT_STYLE: &str = r#"
body { font-family: Arial, sans-serif; padding: 20px; }
h1 { color: #333; }
.header { margin-bottom: 20px; }
.summary { background: #f5f5f5; padding: 15px; border-radius: 8px; margin-bottom: 20px; }
table { width: 100%; border-collapse: collapse; }
th, td { padding: 10px; text-align: left; border-bottom: 1px solid #ddd; }
th { background: #667eea; color: white; }
.total { font-weight: bold; font-size: 18px; margin-top: 20px; }
"#;

fn report_view(records: &[Record], heading: &ReportHeading) -> Markup {
    let range_label = heading
        .range
        .map(DateRange::label)
        .unwrap_or_else(|| "All Time".to_owned());

    html! {
        (DOCTYPE)
        html lang="en"
        {
            head
            {
                meta charset="UTF-8";
                title { "Expense Report" }
                style { (REPORT_STYLE) }
            }

            body
            {
                div class="header"
                {
                    h1 { "Expense Report" }
                    p { strong { "Date Range:" } " " (range_label) }
                    p { strong { "Total Expenses:" } " " (records.len()) }
                }

                div class="summary"
                {
                    p class="total"
                    {
                        "Total Amount: " (format_currency(heading.total_amount, heading.currency_symbol))
                    }
                }

                table
                {
                    thead
                    {
                        tr
                        {
                            th { "Date" }
                            th { "Expense" }
                            th { "Amount" }
                            th { "Primary Category" }
                            th { "Secondary Category" }
                        }
                    }

                    tbody
                    {
                        @for record in records
                        {
                            tr
                            {
                                td { (format_date(record.occurred_at)) }
                                td { (record.description) }
                                td { (format_currency(record.amount, heading.currency_symbol)) }
                                td { (or_dash(&record.primary_category)) }
                                td { (or_dash(&record.secondary_category)) }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn format_date(timestamp: OffsetDateTime) -> String {
    timestamp
        .date()
        .format(DATE_FORMAT)
        .unwrap_or_else(|_| timestamp.date().to_string())
}

fn or_dash(text: &str) -> &str {
    if text.trim().is_empty() { "-" } else { text }
}
