//! The authenticated marketplace client and its request pipeline.

pub mod account;
pub mod coordinator;
pub mod refresh;

pub use coordinator::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{ApiRequest, ApiResponse, Transport, WireRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{NoopSessionObserver, SessionObserver},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Relative path of the login endpoint.
pub const LOGIN_ROUTE: &str = "/auth/login";
/// Relative path of the registration endpoint.
pub const REGISTER_ROUTE: &str = "/auth/register";
/// Relative path of the OTP verification endpoint.
pub const VERIFY_OTP_ROUTE: &str = "/auth/verify-otp";
/// Relative path of the token refresh endpoint.
pub const REFRESH_ROUTE: &str = "/auth/refresh-token";
/// API routes that establish or refresh identity and therefore never receive a bearer
/// header, even when a valid access token is stored.
pub const AUTH_EXEMPT_ROUTES: [&str; 4] =
	[LOGIN_ROUTE, REGISTER_ROUTE, VERIFY_OTP_ROUTE, REFRESH_ROUTE];

/// Returns `true` when the route is on the unauthenticated allow-list.
pub fn is_auth_exempt(route: &str) -> bool {
	AUTH_EXEMPT_ROUTES.contains(&route)
}

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Issues HTTP requests to the marketplace backend, transparently attaching and
/// refreshing bearer tokens.
///
/// The client owns the transport, credential store, session observer, and refresh
/// coordinator so call sites never deal with authentication mechanics. A 401 on an
/// authenticated route funnels into the single-flight refresh protocol; every other
/// outcome is surfaced unchanged. Callers cannot tell a response that was replayed
/// after a refresh from one that succeeded on the first try.
pub struct ApiClient<T>
where
	T: ?Sized + Transport,
{
	/// Transport used for every outbound request.
	pub transport: Arc<T>,
	/// Store that persists the credential pair and cached profile.
	pub store: Arc<dyn CredentialStore>,
	/// Observer notified exactly once per forced logout.
	pub observer: Arc<dyn SessionObserver>,
	/// Base URL all request paths are joined onto.
	pub base_url: Url,
	/// Shared metrics recorder for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	pub(crate) coordinator: Arc<RefreshCoordinator>,
	pub(crate) logout_gate: Arc<AsyncMutex<()>>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + Transport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		base_url: Url,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			observer: Arc::new(NoopSessionObserver),
			base_url,
			refresh_metrics: Default::default(),
			coordinator: Default::default(),
			logout_gate: Default::default(),
		}
	}

	/// Sets or replaces the session observer.
	pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
		self.observer = observer;

		self
	}

	/// The sole request entry point used by all call sites.
	///
	/// Routes outside the allow-list pick up the stored access token as a bearer
	/// header. A missing token is not an error here; the request proceeds bare and is
	/// expected to fail server-side.
	pub async fn request(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				if !is_auth_exempt(request.route()) {
					request.bearer = self.store.access_token().await?;
				}

				self.dispatch(request).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Convenience wrapper for GET requests.
	pub async fn get(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.request(ApiRequest::get(path)).await
	}

	/// Convenience wrapper for POST requests with a JSON body.
	pub async fn post<B>(&self, path: impl Into<String>, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.request(ApiRequest::post(path).with_body(to_json_body(body)?)).await
	}

	/// Convenience wrapper for PUT requests with a JSON body.
	pub async fn put<B>(&self, path: impl Into<String>, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.request(ApiRequest::put(path).with_body(to_json_body(body)?)).await
	}

	/// Convenience wrapper for PATCH requests with a JSON body.
	pub async fn patch<B>(&self, path: impl Into<String>, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.request(ApiRequest::patch(path).with_body(to_json_body(body)?)).await
	}

	/// Convenience wrapper for DELETE requests.
	pub async fn delete(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.request(ApiRequest::delete(path)).await
	}

	/// Dispatches a prepared descriptor, routing eligible 401s into the refresh
	/// protocol. Replays arrive here with their bearer already set, so the
	/// allow-list/token-read step is not repeated.
	pub(crate) async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
		let response = self.transport.send(self.to_wire(&request)?).await?;

		if response.status == 401 && !is_auth_exempt(request.route()) {
			if request.retried {
				// The refresh-and-retry already happened once; the session is over.
				self.force_logout().await;

				return Err(http_error(response));
			}

			return self.refresh_and_replay(request).await;
		}
		if !response.is_success() {
			return Err(http_error(response));
		}

		Ok(response)
	}

	pub(crate) fn to_wire(&self, request: &ApiRequest) -> Result<WireRequest> {
		let mut raw = self.base_url.as_str().trim_end_matches('/').to_owned();

		if !request.path.starts_with('/') {
			raw.push('/');
		}

		raw.push_str(&request.path);

		let url = Url::parse(&raw).map_err(|source| ConfigError::InvalidPath {
			path: request.path.clone(),
			source,
		})?;
		let mut headers = request.headers.clone();

		if let Some(bearer) = &request.bearer {
			headers.insert("authorization".into(), format!("Bearer {}", bearer.expose()));
		}

		let body = request
			.body
			.as_ref()
			.map(serde_json::to_vec)
			.transpose()
			.map_err(ConfigError::BodySerialize)?;

		Ok(WireRequest { url, method: request.method, headers, body })
	}

	/// Clears the credential pair and notifies the observer when an active session was
	/// actually ended.
	///
	/// Serialized by `logout_gate` and keyed off the store's answer, so any number of
	/// concurrent authorization failures produce a single notification. A storage
	/// failure leaves the pair behind; the next authorization failure retries the
	/// logout.
	pub(crate) async fn force_logout(&self) {
		let _gate = self.logout_gate.lock().await;

		if let Ok(true) = self.store.clear().await {
			self.observer.session_ended();
		}
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client backed by the crate's default reqwest transport.
	pub fn new(base_url: Url, store: Arc<dyn CredentialStore>) -> Self {
		Self::with_transport(base_url, store, ReqwestTransport::default())
	}
}
// Manual impl because the derive would demand `T: Clone`; every field is shared.
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + Transport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			observer: self.observer.clone(),
			base_url: self.base_url.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			coordinator: self.coordinator.clone(),
			logout_gate: self.logout_gate.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.base_url)
			.field("coordinator", &self.coordinator)
			.finish()
	}
}

fn to_json_body<B>(body: &B) -> Result<serde_json::Value>
where
	B: ?Sized + Serialize,
{
	Ok(serde_json::to_value(body).map_err(ConfigError::BodySerialize)?)
}

fn http_error(response: ApiResponse) -> Error {
	let retry_after = response.retry_after();

	Error::Http { status: response.status, body: response.text(), retry_after }
}
