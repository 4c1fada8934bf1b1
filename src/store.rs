//! Storage contracts and built-in credential store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Device-local key-value storage contract for the three session values: the access
/// token, the refresh token, and the cached user profile JSON.
///
/// Values are opaque strings; no schema applies beyond the pair semantics of
/// [`save_credentials`](CredentialStore::save_credentials).
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Reads the current access token, if one is stored.
	fn access_token(&self) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Reads the current refresh token, if one is stored.
	fn refresh_token(&self) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Replaces the stored credential pair in a single operation.
	///
	/// The access token is always replaced. The refresh token is replaced when the
	/// pair carries one and kept otherwise. Readers must never observe the new access
	/// token alongside a half-written refresh token, or the reverse.
	fn save_credentials(&self, pair: CredentialPair) -> StoreFuture<'_, ()>;

	/// Reads the cached user profile JSON, if present.
	fn profile(&self) -> StoreFuture<'_, Option<String>>;

	/// Replaces the cached user profile JSON.
	fn save_profile(&self, profile: String) -> StoreFuture<'_, ()>;

	/// Removes all three session values.
	///
	/// Returns `true` when a credential pair was actually present. The flag drives
	/// the exactly-once session-ended notification, so implementations must answer it
	/// from the same critical section that performs the removal.
	fn clear(&self) -> StoreFuture<'_, bool>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
