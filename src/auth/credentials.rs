//! Persisted credential pair and the wire payload issued by the identity endpoints.

// self
use crate::{_prelude::*, auth::secret::TokenSecret};

/// Access/refresh token pair persisted in device-local storage.
///
/// Created at login, replaced atomically on refresh success, and deleted on logout or
/// unrecoverable refresh failure. A pair without a refresh token keeps whatever refresh
/// token the store already holds when saved, matching the partial writes the identity
/// endpoints can produce.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Short-lived bearer credential attached to authenticated requests.
	pub access: TokenSecret,
	/// Long-lived credential exchanged for a new access token, when issued.
	pub refresh: Option<TokenSecret>,
}
impl CredentialPair {
	/// Builds a pair carrying both tokens.
	pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
		Self { access: TokenSecret::new(access), refresh: Some(TokenSecret::new(refresh)) }
	}

	/// Builds a pair that keeps whatever refresh token is already stored.
	pub fn access_only(access: impl Into<String>) -> Self {
		Self { access: TokenSecret::new(access), refresh: None }
	}
}
impl Debug for CredentialPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialPair")
			.field("access", &"<redacted>")
			.field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Token payload issued by the login, register, OTP verification, and refresh
/// endpoints.
///
/// Field names match the backend wire format exactly. The refresh endpoint always
/// carries `access_token`; the register and OTP endpoints may omit every field when
/// the flow has not produced a session yet.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenGrant {
	/// Newly issued access token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access_token: Option<String>,
	/// Rotated refresh token, when the server issues one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
	/// User profile payload carried by the login-family endpoints.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user: Option<serde_json::Value>,
}
impl TokenGrant {
	/// Returns `true` when the grant carries no session material at all.
	pub fn is_empty(&self) -> bool {
		self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
	}
}
impl Debug for TokenGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGrant")
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("user", &self.user)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn credential_pair_debug_redacts_both_tokens() {
		let pair = CredentialPair::new("access-plain", "refresh-plain");
		let rendered = format!("{pair:?}");

		assert!(!rendered.contains("access-plain"));
		assert!(!rendered.contains("refresh-plain"));
	}

	#[test]
	fn token_grant_tolerates_missing_fields() {
		let grant: TokenGrant = serde_json::from_str("{}")
			.expect("An empty JSON object should deserialize into a grant.");

		assert!(grant.is_empty());

		let grant: TokenGrant = serde_json::from_str("{\"access_token\":\"a\"}")
			.expect("A grant with only an access token should deserialize.");

		assert_eq!(grant.access_token.as_deref(), Some("a"));
		assert!(grant.refresh_token.is_none());
	}

	#[test]
	fn token_grant_debug_redacts_tokens() {
		let grant = TokenGrant {
			access_token: Some("access-plain".into()),
			refresh_token: Some("refresh-plain".into()),
			user: None,
		};
		let rendered = format!("{grant:?}");

		assert!(!rendered.contains("access-plain"));
		assert!(!rendered.contains("refresh-plain"));
	}
}
