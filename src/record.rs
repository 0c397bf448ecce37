//! Defines the expense record and the payloads used to create and update one.

use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize, de};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time, format_description::BorrowedFormatItem,
    format_description::well_known::Rfc3339, macros::format_description,
};

use crate::Error;

/// The primary category the data service assigns to expenses created without
/// one, until they are categorised.
pub const PENDING_CATEGORY: &str = "Categorization pending";

/// The opaque, stable identifier of a [Record].
///
/// The data service may send IDs as strings or integers, both are accepted and
/// compared as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create an ID from its text form.
    pub fn new(id: &str) -> Self {
        Self(id.to_owned())
    }

    /// The ID as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum WireId {
            Text(String),
            Integer(i64),
        }

        match WireId::deserialize(deserializer)? {
            WireId::Text(text) => Ok(Self(text)),
            WireId::Integer(number) => Ok(Self(number.to_string())),
        }
    }
}

/// One expense, as delivered by the data service.
///
/// Records are never mutated by the view pipeline, filtered, sorted and paged
/// views hold references to the same records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The ID of the expense.
    pub id: RecordId,
    /// What the money was spent on.
    #[serde(default, alias = "expense", deserialize_with = "null_as_empty")]
    pub description: String,
    /// The amount spent. Missing or malformed amounts are read as zero.
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
    /// When the expense happened.
    #[serde(
        alias = "created",
        serialize_with = "serialize_timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    pub occurred_at: OffsetDateTime,
    /// The top level category, may be empty or [PENDING_CATEGORY].
    #[serde(default, alias = "primarycategory", deserialize_with = "null_as_empty")]
    pub primary_category: String,
    /// The second level category, may be empty.
    #[serde(
        default,
        alias = "secondarycategory",
        deserialize_with = "null_as_empty"
    )]
    pub secondary_category: String,
}

impl Record {
    /// Create an uncategorised record.
    pub fn new(
        id: impl Into<RecordId>,
        description: &str,
        amount: f64,
        occurred_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.to_owned(),
            amount,
            occurred_at,
            primary_category: String::new(),
            secondary_category: String::new(),
        }
    }

    /// Set both category levels.
    pub fn with_categories(mut self, primary: &str, secondary: &str) -> Self {
        self.primary_category = primary.to_owned();
        self.secondary_category = secondary.to_owned();
        self
    }
}

/// The data needed to create a new expense.
///
/// To create a new `NewRecord`, use [NewRecord::build].
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    /// What the money was spent on. Required.
    pub description: String,
    /// The amount spent, must be finite and not negative.
    pub amount: f64,
    /// The day the expense happened.
    pub date: Date,
    /// The category to file the expense under.
    ///
    /// `None` leaves the expense as [PENDING_CATEGORY] for the data service to
    /// categorise later.
    pub category: Option<String>,
}

impl NewRecord {
    /// Start building a new expense.
    pub fn build(description: &str, amount: f64, date: Date) -> Self {
        Self {
            description: description.to_owned(),
            amount,
            date,
            category: None,
        }
    }

    /// Set the category for the expense. Blank categories are ignored.
    pub fn category(mut self, category: Option<&str>) -> Self {
        self.category = category
            .map(str::trim)
            .filter(|category| !category.is_empty())
            .map(str::to_owned);
        self
    }

    /// Check the expense before it is sent to the data service.
    ///
    /// # Errors
    /// Returns [Error::EmptyDescription] or [Error::InvalidAmount].
    pub fn validate(&self) -> Result<(), Error> {
        validate_fields(&self.description, self.amount)
    }
}

/// The replacement values for an existing expense.
///
/// Categories left as `None` keep their current value.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    /// What the money was spent on. Required.
    pub description: String,
    /// The amount spent, must be finite and not negative.
    pub amount: f64,
    /// The day the expense happened.
    pub date: Date,
    /// The new primary category.
    pub primary_category: Option<String>,
    /// The new secondary category.
    pub secondary_category: Option<String>,
}

impl RecordUpdate {
    /// An update that rewrites `record` with its current values.
    ///
    /// Useful as the starting point for editing a single field.
    pub fn from_record(record: &Record) -> Self {
        Self {
            description: record.description.clone(),
            amount: record.amount,
            date: record.occurred_at.date(),
            primary_category: non_empty(&record.primary_category),
            secondary_category: non_empty(&record.secondary_category),
        }
    }

    /// Set the categories to write. Blank categories are left unchanged.
    pub fn categories(mut self, primary: Option<&str>, secondary: Option<&str>) -> Self {
        self.primary_category = primary.and_then(non_empty);
        self.secondary_category = secondary.and_then(non_empty);
        self
    }

    /// Check the update before it is sent to the data service.
    ///
    /// # Errors
    /// Returns [Error::EmptyDescription] or [Error::InvalidAmount].
    pub fn validate(&self) -> Result<(), Error> {
        validate_fields(&self.description, self.amount)
    }
}

fn validate_fields(description: &str, amount: f64) -> Result<(), Error> {
    if description.trim().is_empty() {
        return Err(Error::EmptyDescription);
    }

    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount(amount));
    }

    Ok(())
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();

    if text.is_empty() {
        None
    } else {
        Some(text.to_owned())
    }
}

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");
const SQL_DATE_TIME_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Parse the timestamp formats the data service has been seen to send.
///
/// Accepts RFC 3339 date-times, `YYYY-MM-DD HH:MM:SS` (read as UTC) and plain
/// `YYYY-MM-DD` dates (read as midnight UTC).
pub fn parse_timestamp(text: &str) -> Option<OffsetDateTime> {
    let text = text.trim();

    if let Ok(timestamp) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(timestamp);
    }

    if let Ok(timestamp) = PrimitiveDateTime::parse(text, SQL_DATE_TIME_FORMAT) {
        return Some(timestamp.assume_utc());
    }

    Date::parse(text, DATE_FORMAT)
        .ok()
        .map(|date| PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc())
}

fn serialize_timestamp<S>(timestamp: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let text = timestamp
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&text)
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;

    parse_timestamp(&text)
        .ok_or_else(|| de::Error::custom(format!("could not parse timestamp \"{text}\"")))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let amount = match value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    Ok(amount.filter(|amount| amount.is_finite()).unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::{date, datetime};

    use crate::{
        Error,
        record::{NewRecord, Record, RecordId, RecordUpdate, parse_timestamp},
    };

    #[test]
    fn deserializes_wire_field_names() {
        let value = json!({
            "id": 42,
            "expense": "Groceries",
            "amount": 120.5,
            "created": "2024-01-02T10:30:00Z",
            "primarycategory": "Essentials",
            "secondarycategory": "Food"
        });

        let record: Record = serde_json::from_value(value).unwrap();

        assert_eq!(record.id, RecordId::new("42"));
        assert_eq!(record.description, "Groceries");
        assert_eq!(record.amount, 120.5);
        assert_eq!(record.occurred_at, datetime!(2024-01-02 10:30 UTC));
        assert_eq!(record.primary_category, "Essentials");
        assert_eq!(record.secondary_category, "Food");
    }

    #[test]
    fn missing_fields_fall_back_to_empty_values() {
        let value = json!({
            "id": "abc",
            "expense": null,
            "amount": "not a number",
            "created": "2024-01-01",
        });

        let record: Record = serde_json::from_value(value).unwrap();

        assert_eq!(record.description, "");
        assert_eq!(record.amount, 0.0);
        assert_eq!(record.primary_category, "");
        assert_eq!(record.secondary_category, "");
    }

    #[test]
    fn parses_supported_timestamp_formats() {
        assert_eq!(
            parse_timestamp("2024-01-02"),
            Some(datetime!(2024-01-02 0:00 UTC))
        );
        assert_eq!(
            parse_timestamp("2024-01-02 13:14:15"),
            Some(datetime!(2024-01-02 13:14:15 UTC))
        );
        assert_eq!(
            parse_timestamp("2024-01-02T13:14:15+05:30"),
            Some(datetime!(2024-01-02 13:14:15 +05:30))
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn new_record_requires_description() {
        let record = NewRecord::build("  ", 10.0, date!(2024 - 01 - 01));

        assert_eq!(record.validate(), Err(Error::EmptyDescription));
    }

    #[test]
    fn new_record_rejects_negative_amount() {
        let record = NewRecord::build("Coffee", -1.0, date!(2024 - 01 - 01));

        assert_eq!(record.validate(), Err(Error::InvalidAmount(-1.0)));
    }

    #[test]
    fn blank_category_is_ignored() {
        let record = NewRecord::build("Coffee", 4.5, date!(2024 - 01 - 01)).category(Some(" "));

        assert_eq!(record.category, None);
    }

    #[test]
    fn update_from_record_keeps_existing_values() {
        let record = Record::new("1", "Rent", 900.0, datetime!(2024-03-01 9:00 UTC))
            .with_categories("Housing", "");

        let update = RecordUpdate::from_record(&record);

        assert_eq!(update.date, date!(2024 - 03 - 01));
        assert_eq!(update.primary_category.as_deref(), Some("Housing"));
        assert_eq!(update.secondary_category, None);
    }
}
