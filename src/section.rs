//! Loading and error state for one independently fetched part of the view.

use crate::Error;

/// Data fetched from the data service along with whether it is loading and
/// the last error, if any.
///
/// Each section fails on its own: an error in one section never blocks
/// another from loading or displaying.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section<T> {
    data: T,
    loading: bool,
    error: Option<String>,
}

impl<T: Default> Section<T> {
    /// Mark the section as loading and clear any previous error.
    pub fn start_loading(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Store freshly fetched data.
    pub fn succeed(&mut self, data: T) {
        self.data = data;
        self.loading = false;
        self.error = None;
    }

    /// Record a failed fetch, the data is emptied so stale values are not shown
    /// next to the error.
    pub fn fail(&mut self, error: &Error) {
        self.data = T::default();
        self.loading = false;
        self.error = Some(error.user_message());
    }

    /// Empty the section entirely.
    pub fn reset(&mut self) {
        *self = Self {
            data: T::default(),
            loading: false,
            error: None,
        };
    }

    /// The most recently fetched data.
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Whether a fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The message for the last failed fetch.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, section::Section};

    #[test]
    fn failure_clears_data_and_keeps_message() {
        let mut section = Section::<Vec<u8>>::default();
        section.succeed(vec![1, 2]);
        section.start_loading();

        section.fail(&Error::TransientNetworkFailure("connection refused".to_owned()));

        assert!(section.data().is_empty());
        assert!(!section.is_loading());
        assert_eq!(
            section.error(),
            Some("Network error: Could not connect to the server.")
        );
    }

    #[test]
    fn loading_clears_previous_error() {
        let mut section = Section::<Vec<u8>>::default();
        section.fail(&Error::RequestRejected("nope".to_owned()));

        section.start_loading();

        assert!(section.is_loading());
        assert_eq!(section.error(), None);
    }
}
