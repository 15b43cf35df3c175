use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// Errors a provider reports; the kind drives the agent's retry policy.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Classifies the failure.
    fn kind(&self) -> ErrorKind;
}

/// A backend that samples completions.
///
/// Every request carries the full conversation, so providers keep no
/// conversation state and can be cloned or rebuilt freely.
pub trait ModelProvider: Send + Sync {
    /// Error for failed requests and streams.
    type Error: ModelProviderError;
    /// The stream handed back for each request.
    type Response: ModelResponse<Error = Self::Error>;

    /// Starts streaming a completion for `req`.
    ///
    /// The returned future must not borrow `self` or `req`.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
