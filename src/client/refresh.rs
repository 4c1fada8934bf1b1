//! The single-flight refresh-and-replay protocol behind eligible 401 responses.
//!
//! The first authorization failure claims leadership via the
//! [`RefreshCoordinator`](crate::client::coordinator::RefreshCoordinator) and drives
//! one unauthenticated exchange against `/auth/refresh-token`; failures that arrive
//! while that call is in flight park their descriptors instead of issuing competing
//! refreshes. On success the leader persists the rotated pair, replays its
//! own request with the new bearer, then drains the parked queue in FIFO order. On
//! failure every parked continuation is rejected with the same [`RefreshError`], the
//! credential pair is cleared, and the session observer fires once.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenGrant, TokenSecret},
	client::{ApiClient, REFRESH_ROUTE, coordinator::AcquireOutcome},
	error::RefreshError,
	http::{ApiRequest, ApiResponse, Transport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl<T> ApiClient<T>
where
	T: ?Sized + Transport,
{
	/// Entry point from the dispatch path. Boxed because replays re-enter
	/// [`ApiClient::dispatch`], which would otherwise make the future infinitely
	/// sized.
	pub(crate) fn refresh_and_replay(
		&self,
		request: ApiRequest,
	) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + '_ + Send>> {
		Box::pin(async move {
			match self.coordinator.acquire_or_enqueue(request) {
				AcquireOutcome::Lead(request) => self.lead_refresh(request).await,
				AcquireOutcome::Enqueued(outcome) =>
					outcome.await.unwrap_or_else(|_| Err(RefreshError::Interrupted.into())),
			}
		})
	}

	async fn lead_refresh(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "lead_refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		request.retried = true;

		match span.instrument(self.rotate_credentials()).await {
			Ok(access) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
				self.refresh_metrics.record_success();

				// Release before replaying so requests failing after this point start a
				// fresh cycle instead of joining a queue nobody will drain.
				let parked = self.coordinator.release();

				request.bearer = Some(access.clone());

				let lead_outcome = self.dispatch(request).await;

				for pending in parked {
					let mut queued = pending.request;

					queued.retried = true;
					queued.bearer = Some(access.clone());

					// An abandoned caller has dropped its receiver; the settlement is
					// discarded, never redelivered.
					let _ = pending.settle.send(self.dispatch(queued).await);
				}

				lead_outcome
			},
			Err(err) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				self.refresh_metrics.record_failure();

				for pending in self.coordinator.release() {
					let _ = pending.settle.send(Err(err.clone().into()));
				}

				self.force_logout().await;

				Err(err.into())
			},
		}
	}

	/// Exchanges the stored refresh token for a rotated credential pair and returns
	/// the new access token. Every failure in here ends the session, so the error
	/// type is [`RefreshError`] throughout.
	async fn rotate_credentials(&self) -> Result<TokenSecret, RefreshError> {
		let refresh = self
			.store
			.refresh_token()
			.await
			.map_err(|err| RefreshError::Storage { message: err.to_string() })?
			.ok_or(RefreshError::MissingRefreshToken)?;
		let wire = self
			.to_wire(&refresh_request(&refresh))
			.map_err(|err| RefreshError::Request { message: err.to_string() })?;
		let response = self
			.transport
			.send(wire)
			.await
			.map_err(|err| RefreshError::Network { message: err.to_string() })?;

		if !response.is_success() {
			return Err(RefreshError::Rejected { status: response.status, body: response.text() });
		}

		let grant: TokenGrant = response
			.json()
			.map_err(|err| RefreshError::MalformedGrant { message: err.to_string() })?;
		let access = grant.access_token.ok_or_else(|| RefreshError::MalformedGrant {
			message: "Token endpoint response is missing access_token".into(),
		})?;
		let rotated = CredentialPair {
			access: TokenSecret::new(access),
			// No rotated refresh token means the store keeps the current one.
			refresh: grant.refresh_token.map(TokenSecret::new),
		};
		let access = rotated.access.clone();

		self.store
			.save_credentials(rotated)
			.await
			.map_err(|err| RefreshError::Storage { message: err.to_string() })?;

		Ok(access)
	}
}

/// Builds the unauthenticated refresh exchange; the route is on the allow-list so no
/// bearer header ever applies, even while one is stored.
fn refresh_request(refresh: &TokenSecret) -> ApiRequest {
	ApiRequest::post(REFRESH_ROUTE)
		.with_body(serde_json::json!({ "refreshToken": refresh.expose() }))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn refresh_request_targets_the_exempt_route_with_the_expected_body() {
		let request = refresh_request(&TokenSecret::new("refresh-plain"));

		assert_eq!(request.route(), REFRESH_ROUTE);
		assert!(crate::client::is_auth_exempt(request.route()));
		assert_eq!(
			request.body,
			Some(serde_json::json!({ "refreshToken": "refresh-plain" })),
		);
	}
}
