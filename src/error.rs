//! Client-level error types shared across the transport, storage, and refresh layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
///
/// The client recovers locally from exactly one case, an authenticated request that
/// failed with HTTP 401 and has not been retried yet. Every other failure surfaces
/// here unchanged.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure outside the refresh path.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS); no response was received.
	#[error(transparent)]
	Network(#[from] TransportError),
	/// Token refresh could not complete; the session has been ended.
	#[error(transparent)]
	RefreshFailed(#[from] RefreshError),

	/// Server responded with a non-2xx status that the refresh logic does not handle.
	#[error("Server responded with HTTP {status}.")]
	Http {
		/// HTTP status code returned by the backend.
		status: u16,
		/// Raw response body, carrying any backend validation message.
		body: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Response body could not be deserialized into the requested type.
	#[error("Response body returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code of the response being parsed.
		status: u16,
	},
}

/// Configuration and request construction failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request path cannot be joined onto the base URL.
	#[error("Request path `{path}` cannot be joined onto the base URL.")]
	InvalidPath {
		/// Offending relative path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Failures that abort a token refresh.
///
/// Every variant ends the current session: the credential pair is cleared and the
/// session observer fires before the error reaches the caller. Variants carry plain
/// message strings so the refresh leader can settle any number of queued
/// continuations with the same failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum RefreshError {
	/// No refresh token is stored; the refresh endpoint is never contacted.
	#[error("No refresh token is available in credential storage.")]
	MissingRefreshToken,
	/// Refresh request could not be constructed.
	#[error("Refresh request could not be constructed: {message}.")]
	Request {
		/// Human-readable error payload.
		message: String,
	},
	/// Token endpoint responded with a non-2xx status.
	#[error("Token endpoint rejected the refresh request with HTTP {status}.")]
	Rejected {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Raw response body.
		body: String,
	},
	/// Token endpoint responded with a body that is not a valid token grant.
	#[error("Token endpoint returned a malformed grant: {message}.")]
	MalformedGrant {
		/// Human-readable error payload.
		message: String,
	},
	/// Transport failure while calling the token endpoint.
	#[error("Network error occurred while calling the token endpoint: {message}.")]
	Network {
		/// Human-readable error payload.
		message: String,
	},
	/// Credential storage failed while reading or rotating the pair.
	#[error("Credential storage failed during refresh: {message}.")]
	Storage {
		/// Human-readable error payload.
		message: String,
	},
	/// The in-flight refresh was abandoned before a result could be delivered.
	#[error("Refresh was abandoned before a result could be delivered.")]
	Interrupted,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn refresh_error_converts_into_client_error() {
		let err: Error = RefreshError::MissingRefreshToken.into();

		assert!(matches!(err, Error::RefreshFailed(RefreshError::MissingRefreshToken)));
		assert!(err.to_string().contains("No refresh token"));
	}

	#[test]
	fn store_error_converts_into_client_error_with_source() {
		let store_error =
			crate::store::StoreError::Backend { message: "keychain unreachable".into() };
		let err: Error = store_error.clone().into();

		assert!(matches!(err, Error::Storage(_)));

		let source = StdError::source(&err)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn refresh_error_messages_are_shareable_across_waiters() {
		let rejected = RefreshError::Rejected { status: 403, body: "{\"error\":\"revoked\"}".into() };

		assert_eq!(rejected.clone(), rejected);
		assert!(rejected.to_string().contains("403"));
	}
}
