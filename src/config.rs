//! Settings for the expense view.

use serde::Deserialize;

use crate::{Error, pipeline::pagination::PaginationConfig};

/// How the expense view pages, dates and formats expenses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Page sizes and the width of the pager.
    #[serde(flatten)]
    pub pagination: PaginationConfig,
    /// The canonical timezone used to work out "today", e.g. "Asia/Kolkata".
    pub local_timezone: String,
    /// The symbol put in front of amounts.
    pub currency_symbol: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            pagination: PaginationConfig::default(),
            local_timezone: "Etc/UTC".to_owned(),
            currency_symbol: "₹".to_owned(),
        }
    }
}

impl ViewConfig {
    /// Check that the settings can be used together.
    ///
    /// # Errors
    /// Returns [Error::InvalidPageSize] if the default page size is zero or is
    /// not one of the page size options, or [Error::InvalidTimezone] if the
    /// timezone is not a canonical timezone name.
    pub fn validate(&self) -> Result<(), Error> {
        let default_page_size = self.pagination.default_page_size;

        if default_page_size == 0
            || !self
                .pagination
                .page_size_options
                .contains(&default_page_size)
        {
            return Err(Error::InvalidPageSize(default_page_size));
        }

        if time_tz::timezones::get_by_name(&self.local_timezone).is_none() {
            return Err(Error::InvalidTimezone(self.local_timezone.clone()));
        }

        Ok(())
    }
}
