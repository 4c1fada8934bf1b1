//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	store::{CredentialStore, StoreFuture},
};

#[derive(Clone, Debug, Default)]
struct SessionSlots {
	access: Option<TokenSecret>,
	refresh: Option<TokenSecret>,
	profile: Option<String>,
}

type SharedSlots = Arc<RwLock<SessionSlots>>;

/// Thread-safe storage backend that keeps session values in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(SharedSlots);
impl MemoryStore {
	fn save_now(slots: SharedSlots, pair: CredentialPair) {
		let mut guard = slots.write();

		guard.access = Some(pair.access);

		if let Some(refresh) = pair.refresh {
			guard.refresh = Some(refresh);
		}
	}

	fn clear_now(slots: SharedSlots) -> bool {
		let mut guard = slots.write();
		let had_session = guard.access.is_some() || guard.refresh.is_some();

		*guard = SessionSlots::default();

		had_session
	}
}
impl CredentialStore for MemoryStore {
	fn access_token(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		let slots = self.0.clone();

		Box::pin(async move { Ok(slots.read().access.clone()) })
	}

	fn refresh_token(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		let slots = self.0.clone();

		Box::pin(async move { Ok(slots.read().refresh.clone()) })
	}

	fn save_credentials(&self, pair: CredentialPair) -> StoreFuture<'_, ()> {
		let slots = self.0.clone();

		Box::pin(async move {
			Self::save_now(slots, pair);

			Ok(())
		})
	}

	fn profile(&self) -> StoreFuture<'_, Option<String>> {
		let slots = self.0.clone();

		Box::pin(async move { Ok(slots.read().profile.clone()) })
	}

	fn save_profile(&self, profile: String) -> StoreFuture<'_, ()> {
		let slots = self.0.clone();

		Box::pin(async move {
			slots.write().profile = Some(profile);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, bool> {
		let slots = self.0.clone();

		Box::pin(async move { Ok(Self::clear_now(slots)) })
	}
}
