//! Simple file-backed [`CredentialStore`] for command-line tools and local sessions.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	store::{CredentialStore, StoreError, StoreFuture},
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct SessionSnapshot {
	access: Option<TokenSecret>,
	refresh: Option<TokenSecret>,
	profile: Option<String>,
}

/// Persists session values to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<SessionSnapshot>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot =
			if path.exists() { Self::load_snapshot(&path)? } else { SessionSnapshot::default() };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	fn load_snapshot(path: &Path) -> Result<SessionSnapshot, StoreError> {
		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(SessionSnapshot::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist_locked(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize session snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CredentialStore for FileStore {
	fn access_token(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move { Ok(self.inner.read().access.clone()) })
	}

	fn refresh_token(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move { Ok(self.inner.read().refresh.clone()) })
	}

	fn save_credentials(&self, pair: CredentialPair) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.access = Some(pair.access);

			if let Some(refresh) = pair.refresh {
				guard.refresh = Some(refresh);
			}

			self.persist_locked(&guard)
		})
	}

	fn profile(&self) -> StoreFuture<'_, Option<String>> {
		Box::pin(async move { Ok(self.inner.read().profile.clone()) })
	}

	fn save_profile(&self, profile: String) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.profile = Some(profile);

			self.persist_locked(&guard)
		})
	}

	fn clear(&self) -> StoreFuture<'_, bool> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let had_session = guard.access.is_some() || guard.refresh.is_some();

			*guard = SessionSnapshot::default();

			self.persist_locked(&guard)?;

			Ok(had_session)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"biketrade_client_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn save_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.save_credentials(CredentialPair::new("access-a", "refresh-a")))
			.expect("Failed to save credential fixture to file store.");
		rt.block_on(store.save_profile("{\"name\":\"demo\"}".into()))
			.expect("Failed to save profile fixture to file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let access = rt
			.block_on(reopened.access_token())
			.expect("Failed to fetch access token from file store.")
			.expect("File store lost the access token after reopen.");

		assert_eq!(access.expose(), "access-a");

		let profile = rt
			.block_on(reopened.profile())
			.expect("Failed to fetch profile from file store.")
			.expect("File store lost the profile after reopen.");

		assert_eq!(profile, "{\"name\":\"demo\"}");

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn clear_reports_whether_a_session_was_present() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		assert!(
			!rt.block_on(store.clear()).expect("Clearing an empty file store should succeed."),
			"An empty store must not report a removed session.",
		);

		rt.block_on(store.save_credentials(CredentialPair::new("access-b", "refresh-b")))
			.expect("Failed to save credential fixture to file store.");

		assert!(
			rt.block_on(store.clear()).expect("Clearing a seeded file store should succeed."),
			"A seeded store must report the removed session.",
		);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
