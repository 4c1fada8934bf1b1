//! Transport primitives for marketplace API calls.
//!
//! The module exposes [`Transport`] alongside the request and response descriptors
//! shared by the client, so the refresh protocol composes as a decorator over any HTTP
//! stack instead of living inside framework-specific middleware. Implementations
//! return [`TransportError`] only when no response was received; a served non-2xx
//! status comes back as an [`ApiResponse`] so the client can route eligible 401s
//! through the refresh protocol.

// std
use std::ops::Deref;
// crates.io
use serde::de::DeserializeOwned;
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, auth::TokenSecret, error::TransportError};

/// HTTP methods supported by the marketplace backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
	/// GET request.
	Get,
	/// POST request.
	Post,
	/// PUT request.
	Put,
	/// PATCH request.
	Patch,
	/// DELETE request.
	Delete,
}
impl HttpMethod {
	/// Returns the canonical method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
			HttpMethod::Put => "PUT",
			HttpMethod::Patch => "PATCH",
			HttpMethod::Delete => "DELETE",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Request descriptor accepted by [`ApiClient::request`](crate::client::ApiClient::request).
///
/// Descriptors carry a crate-private retry flag so a request replayed after a token
/// refresh is never refreshed a second time, and a bearer slot the refresh protocol
/// fills directly when replaying, bypassing the token-read step.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method used for dispatch.
	pub method: HttpMethod,
	/// Path relative to the client's base URL, e.g. `/orders/my-orders`.
	pub path: String,
	/// Optional JSON body.
	pub body: Option<serde_json::Value>,
	/// Extra headers merged into the outgoing request.
	pub headers: BTreeMap<String, String>,
	pub(crate) bearer: Option<TokenSecret>,
	pub(crate) retried: bool,
}
impl ApiRequest {
	/// Creates a descriptor for the provided method and path.
	pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			body: None,
			headers: BTreeMap::new(),
			bearer: None,
			retried: false,
		}
	}

	/// Convenience constructor for GET requests.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(HttpMethod::Get, path)
	}

	/// Convenience constructor for POST requests.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(HttpMethod::Post, path)
	}

	/// Convenience constructor for PUT requests.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(HttpMethod::Put, path)
	}

	/// Convenience constructor for PATCH requests.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(HttpMethod::Patch, path)
	}

	/// Convenience constructor for DELETE requests.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(HttpMethod::Delete, path)
	}

	/// Attaches a JSON body.
	pub fn with_body(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Adds a single header to the request.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Path with any query string or fragment stripped, used for allow-list checks.
	pub(crate) fn route(&self) -> &str {
		self.path.split(['?', '#']).next().unwrap_or("")
	}
}

/// Fully resolved request handed to a [`Transport`].
#[derive(Clone)]
pub struct WireRequest {
	/// Absolute request URL.
	pub url: Url,
	/// HTTP method.
	pub method: HttpMethod,
	/// Complete header map, including the bearer header when one applies.
	pub headers: BTreeMap<String, String>,
	/// JSON-encoded body bytes.
	pub body: Option<Vec<u8>>,
}
impl Debug for WireRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers: BTreeMap<&str, &str> = self
			.headers
			.iter()
			.map(|(name, value)| {
				if name == "authorization" {
					(name.as_str(), "<redacted>")
				} else {
					(name.as_str(), value.as_str())
				}
			})
			.collect();

		f.debug_struct("WireRequest")
			.field("url", &self.url)
			.field("method", &self.method)
			.field("headers", &headers)
			.field("body_len", &self.body.as_ref().map(Vec::len))
			.finish()
	}
}

/// Response surfaced by a [`Transport`].
///
/// Header names are lowercased so lookups behave the same across transports.
#[derive(Clone, Debug, Default)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers, lowercased names.
	pub headers: BTreeMap<String, String>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Deserializes the body, reporting the JSON path of any mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::ResponseParse { source, status: self.status })
	}

	/// Body decoded as UTF-8, lossily.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Retry-After hint expressed as a relative duration, when present.
	pub fn retry_after(&self) -> Option<Duration> {
		let raw = self.headers.get("retry-after")?.trim();

		if let Ok(secs) = raw.parse::<u64>() {
			return Some(Duration::seconds(secs as i64));
		}
		if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
			let delta = moment - OffsetDateTime::now_utc();

			if delta.is_positive() {
				return Some(delta);
			}
		}

		None
	}
}

/// Boxed future returned by [`Transport`] implementations.
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing marketplace API calls.
///
/// The trait is the client's only dependency on an HTTP implementation. It must be
/// `Send + Sync + 'static` so a single client clone can be shared across tasks, and
/// the returned futures must be `Send` for the lifetime of the in-flight call.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Executes a single request.
	fn send(&self, request: WireRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Bodies are always JSON; the wrapper stamps `content-type` accordingly. Configure
/// any custom [`ReqwestClient`] with the TLS and proxy settings your deployment needs
/// and hand it over via [`ReqwestTransport::with_client`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, request: WireRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				HttpMethod::Get => reqwest::Method::GET,
				HttpMethod::Post => reqwest::Method::POST,
				HttpMethod::Put => reqwest::Method::PUT,
				HttpMethod::Patch => reqwest::Method::PATCH,
				HttpMethod::Delete => reqwest::Method::DELETE,
			};
			let mut builder = client.request(method, request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder = builder.header("content-type", "application/json").body(body);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|v| (name.as_str().to_ascii_lowercase(), v.to_owned()))
				})
				.collect();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn response_with_header(status: u16, name: &str, value: &str) -> ApiResponse {
		let mut headers = BTreeMap::new();

		headers.insert(name.to_owned(), value.to_owned());

		ApiResponse { status, headers, body: Vec::new() }
	}

	#[test]
	fn route_strips_query_and_fragment() {
		assert_eq!(ApiRequest::get("/orders/my-orders?status=paid").route(), "/orders/my-orders");
		assert_eq!(ApiRequest::get("/auth/login#top").route(), "/auth/login");
		assert_eq!(ApiRequest::get("/cart").route(), "/cart");
	}

	#[test]
	fn retry_after_parses_numeric_seconds() {
		let response = response_with_header(429, "retry-after", "17");

		assert_eq!(response.retry_after(), Some(Duration::seconds(17)));
	}

	#[test]
	fn retry_after_ignores_past_dates() {
		let response = response_with_header(429, "retry-after", "Mon, 01 Jan 2001 00:00:00 GMT");

		assert_eq!(response.retry_after(), None);
	}

	#[test]
	fn json_reports_the_failing_path() {
		let response = ApiResponse {
			status: 200,
			headers: BTreeMap::new(),
			body: b"{\"access_token\":42}".to_vec(),
		};
		let err = response
			.json::<crate::auth::TokenGrant>()
			.expect_err("A numeric access_token should fail to deserialize.");

		assert!(matches!(err, Error::ResponseParse { status: 200, .. }));
		assert!(err.source().is_some_and(|source| source.to_string().contains("access_token")));
	}

	#[test]
	fn wire_request_debug_redacts_the_bearer_header() {
		let mut headers = BTreeMap::new();

		headers.insert("authorization".to_owned(), "Bearer plain-token".to_owned());

		let wire = WireRequest {
			url: Url::parse("https://api.test/orders").expect("Fixture URL should parse."),
			method: HttpMethod::Get,
			headers,
			body: None,
		};
		let rendered = format!("{wire:?}");

		assert!(!rendered.contains("plain-token"));
		assert!(rendered.contains("<redacted>"));
	}

	#[test]
	fn success_covers_the_2xx_range_only() {
		assert!(ApiResponse { status: 204, ..Default::default() }.is_success());
		assert!(!ApiResponse { status: 301, ..Default::default() }.is_success());
		assert!(!ApiResponse { status: 401, ..Default::default() }.is_success());
	}
}
