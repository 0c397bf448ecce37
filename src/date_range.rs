//! Date ranges that scope which expenses are fetched from the data service.

use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

/// An inclusive range of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// The first day in the range.
    pub start: Date,
    /// The last day in the range.
    pub end: Date,
}

/// The first day the data service will return expenses for.
const EPOCH_START: Date = time::macros::date!(1970 - 01 - 01);

impl DateRange {
    /// Create a custom range.
    ///
    /// # Errors
    /// Returns [Error::InvalidDateRange] if `start` is after `end`.
    pub fn new(start: Date, end: Date) -> Result<Self, Error> {
        if start > end {
            return Err(Error::InvalidDateRange(start, end));
        }

        Ok(Self { start, end })
    }

    /// Every day from 1970-01-01 through `today`, the range used when a fetch
    /// does not specify one.
    pub fn all_time(today: Date) -> Self {
        Self {
            start: EPOCH_START,
            end: today.max(EPOCH_START),
        }
    }

    /// Whether `date` falls within the range.
    pub fn contains(self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    /// The first instant of the range, in UTC.
    pub fn start_instant(self) -> OffsetDateTime {
        PrimitiveDateTime::new(self.start, Time::MIDNIGHT).assume_utc()
    }

    /// The first instant after the range, in UTC.
    pub fn end_instant_exclusive(self) -> OffsetDateTime {
        PrimitiveDateTime::new(self.end, Time::MIDNIGHT).assume_utc() + Duration::days(1)
    }

    /// A label such as "5 Jan 2025 - 11 Jan 2025".
    pub fn label(self) -> String {
        format!(
            "{} - {}",
            format_date_label(self.start),
            format_date_label(self.end)
        )
    }
}

/// The preset ranges offered next to the custom range picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePreset {
    /// Sunday through Saturday of the current week.
    Week,
    /// The current calendar month.
    Month,
    /// The current calendar quarter.
    Quarter,
    /// Everything up to and including today.
    AllTime,
}

impl RangePreset {
    /// The range shown when the tracker first opens.
    pub fn default_preset() -> Self {
        Self::Week
    }
}

/// Compute the range for `preset` relative to `today`.
pub fn compute_range(preset: RangePreset, today: Date) -> DateRange {
    match preset {
        RangePreset::Week => week_bounds(today),
        RangePreset::Month => month_bounds(today.year(), today.month()),
        RangePreset::Quarter => quarter_bounds(today.year(), today.month()),
        RangePreset::AllTime => DateRange::all_time(today),
    }
}

/// Today's date in the canonical timezone `timezone`, e.g. "Asia/Kolkata".
///
/// # Errors
/// Returns [Error::InvalidTimezone] if `timezone` is not a known timezone name.
pub fn today_in(timezone: &str) -> Result<Date, Error> {
    let offset = get_local_offset(timezone)
        .ok_or_else(|| Error::InvalidTimezone(timezone.to_owned()))?;

    Ok(OffsetDateTime::now_utc().to_offset(offset).date())
}

fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

fn week_bounds(today: Date) -> DateRange {
    let days_since_sunday = today.weekday().number_days_from_sunday() as i64;
    let start = today - Duration::days(days_since_sunday);
    let end = start + Duration::days(6);

    DateRange { start, end }
}

fn month_bounds(year: i32, month: Month) -> DateRange {
    DateRange {
        start: first_of_month(year, month),
        end: last_of_month(year, month),
    }
}

fn quarter_bounds(year: i32, month: Month) -> DateRange {
    let quarter_start = ((month as u8 - 1) / 3) * 3 + 1;
    let start_month = Month::try_from(quarter_start).unwrap_or(Month::January);
    let end_month = start_month.nth_next(2);

    DateRange {
        start: first_of_month(year, start_month),
        end: last_of_month(year, end_month),
    }
}

fn first_of_month(year: i32, month: Month) -> Date {
    // Day 1 exists in every month, so this cannot fail for years `Date` supports.
    Date::from_calendar_date(year, month, 1).unwrap_or(EPOCH_START)
}

fn last_of_month(year: i32, month: Month) -> Date {
    let next_year = if month == Month::December {
        year + 1
    } else {
        year
    };

    first_of_month(next_year, month.next()) - Duration::days(1)
}

fn format_date_label(date: Date) -> String {
    format!("{} {} {}", date.day(), month_abbrev(date.month()), date.year())
}

fn month_abbrev(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}
