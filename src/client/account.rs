//! Session establishment and teardown flows for the identity endpoints.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenGrant, TokenSecret},
	client::{ApiClient, LOGIN_ROUTE, REGISTER_ROUTE, VERIFY_OTP_ROUTE},
	error::ConfigError,
	http::{ApiRequest, Transport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl<T> ApiClient<T>
where
	T: ?Sized + Transport,
{
	/// Authenticates with the backend and persists the issued credentials.
	///
	/// The call is sent without a bearer header even when a stale token is stored.
	pub async fn login<B>(&self, credentials: &B) -> Result<TokenGrant>
	where
		B: ?Sized + Serialize,
	{
		self.establish_session(LOGIN_ROUTE, "login", credentials).await
	}

	/// Registers a new account. Any tokens the response carries are persisted exactly
	/// like a login; responses without tokens (OTP-gated registrations) leave storage
	/// untouched.
	pub async fn register<B>(&self, profile: &B) -> Result<TokenGrant>
	where
		B: ?Sized + Serialize,
	{
		self.establish_session(REGISTER_ROUTE, "register", profile).await
	}

	/// Confirms a one-time passcode. Tokens in the response are persisted like a
	/// login.
	pub async fn verify_otp<B>(&self, challenge: &B) -> Result<TokenGrant>
	where
		B: ?Sized + Serialize,
	{
		self.establish_session(VERIFY_OTP_ROUTE, "verify_otp", challenge).await
	}

	/// Clears the stored session values.
	///
	/// App-initiated, so the session observer stays silent; its contract covers
	/// forced logouts only.
	pub async fn logout(&self) -> Result<()> {
		let _gate = self.logout_gate.lock().await;
		let _ = self.store.clear().await?;

		Ok(())
	}

	/// Returns `true` when an access token is currently stored.
	pub async fn is_authenticated(&self) -> Result<bool> {
		Ok(self.store.access_token().await?.is_some())
	}

	/// Returns the cached user profile JSON captured at login, if any.
	pub async fn cached_profile(&self) -> Result<Option<String>> {
		Ok(self.store.profile().await?)
	}

	async fn establish_session<B>(
		&self,
		route: &str,
		stage: &'static str,
		body: &B,
	) -> Result<TokenGrant>
	where
		B: ?Sized + Serialize,
	{
		const KIND: FlowKind = FlowKind::Session;

		let span = FlowSpan::new(KIND, stage);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let payload =
					serde_json::to_value(body).map_err(ConfigError::BodySerialize)?;
				let response = self.request(ApiRequest::post(route).with_body(payload)).await?;
				let grant: TokenGrant = response.json()?;

				self.persist_grant(&grant).await?;

				Ok(grant)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Stores whichever session values the grant carries. Tokens are written as one
	/// pair so readers never observe a partial rotation.
	async fn persist_grant(&self, grant: &TokenGrant) -> Result<()> {
		if let Some(access) = &grant.access_token {
			let pair = CredentialPair {
				access: TokenSecret::new(access.clone()),
				refresh: grant.refresh_token.clone().map(TokenSecret::new),
			};

			self.store.save_credentials(pair).await?;
		}
		if let Some(user) = &grant.user {
			let profile = serde_json::to_string(user).map_err(ConfigError::BodySerialize)?;

			self.store.save_profile(profile).await?;
		}

		Ok(())
	}
}
