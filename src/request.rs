//! Tokens for telling the latest request apart from ones it superseded.

/// Identifies one outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

/// Issues strictly increasing [RequestToken]s for one kind of request.
///
/// A response should only be applied if its token is still current, i.e. no
/// newer request of the same kind has been issued since.
#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: u64,
}

impl RequestSequence {
    /// Issue the token for a new request, superseding all earlier tokens.
    pub fn issue(&mut self) -> RequestToken {
        self.latest += 1;
        RequestToken(self.latest)
    }

    /// Whether `token` is the most recently issued token.
    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.latest
    }

    /// Supersede every outstanding token without issuing a new one.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}
