//! Authenticated HTTP client for the BikeTrade marketplace backend, with transparent
//! bearer injection and a single-flight token refresh protocol shared by every call site.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod obs;
pub mod session;
pub mod store;
#[cfg(feature = "reqwest")]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; ships with the default
	//! `reqwest` feature so the `tests/` suites link against it directly.

	pub use std::sync::atomic::{AtomicUsize, Ordering};

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::CredentialPair,
		client::{ApiClient, ReqwestApiClient},
		session::SessionObserver,
		store::{CredentialStore, MemoryStore},
	};

	/// Observer that counts session-ended notifications so tests can assert the
	/// exactly-once contract.
	#[derive(Debug, Default)]
	pub struct CountingSessionObserver(AtomicUsize);
	impl CountingSessionObserver {
		/// Number of notifications observed so far.
		pub fn count(&self) -> usize {
			self.0.load(Ordering::SeqCst)
		}
	}
	impl SessionObserver for CountingSessionObserver {
		fn session_ended(&self) {
			self.0.fetch_add(1, Ordering::SeqCst);
		}
	}

	/// Builds a reqwest-backed client wired to an in-memory store and a counting
	/// observer, the fixture used across integration tests.
	pub fn build_reqwest_test_client(
		base_url: &str,
	) -> (ReqwestApiClient, Arc<MemoryStore>, Arc<CountingSessionObserver>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let observer = Arc::new(CountingSessionObserver::default());
		let base = Url::parse(base_url).expect("Test base URL should parse successfully.");
		let client = ApiClient::new(base, store).with_observer(observer.clone());

		(client, store_backend, observer)
	}

	/// Seeds the store with a credential pair fixture.
	pub async fn seed_credentials(store: &MemoryStore, access: &str, refresh: &str) {
		store
			.save_credentials(CredentialPair::new(access, refresh))
			.await
			.expect("Failed to seed credential fixture into the store.");
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
