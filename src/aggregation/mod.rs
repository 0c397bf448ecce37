//! Category level totals for the active date range.
//!
//! The primary rollup and each secondary rollup are summed by the data
//! service. This module shields callers from the shape of those responses and
//! orders and annotates the rows for display. Rollups are computed
//! independently of the page the user is viewing.

pub mod drilldown;
pub mod normalize;
pub mod rollup;
