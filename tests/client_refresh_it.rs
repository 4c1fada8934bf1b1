#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use biketrade_client::{_preludet::*, store::CredentialStore};

#[tokio::test]
async fn fresh_token_passes_through_without_a_refresh() {
	let server = MockServer::start_async().await;
	let (client, store, observer) = build_reqwest_test_client(&server.base_url());

	seed_credentials(&store, "access-current", "refresh-current").await;

	let orders = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/orders/my-orders")
				.header("authorization", "Bearer access-current");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"orders\":[{\"id\":\"ord-1\"}]}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh-token");
			then.status(200).body("{}");
		})
		.await;
	let response = client
		.get("/orders/my-orders")
		.await
		.expect("A request with a valid token should pass through.");

	orders.assert_async().await;
	refresh.assert_calls_async(0).await;

	assert_eq!(response.status, 200);
	assert_eq!(response.text(), "{\"orders\":[{\"id\":\"ord-1\"}]}");
	assert_eq!(observer.count(), 0);
}

#[tokio::test]
async fn stale_token_is_rotated_and_the_request_replayed() {
	let server = MockServer::start_async().await;
	let (client, store, observer) = build_reqwest_test_client(&server.base_url());

	seed_credentials(&store, "stale-access", "refresh-1").await;

	let stale = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/orders/my-orders")
				.header("authorization", "Bearer stale-access");
			then.status(401).body("{\"error\":\"token expired\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/refresh-token")
				.json_body(serde_json::json!({ "refreshToken": "refresh-1" }));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-fresh\",\"refresh_token\":\"refresh-2\"}");
		})
		.await;
	let replay = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/orders/my-orders")
				.header("authorization", "Bearer access-fresh");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"orders\":[]}");
		})
		.await;
	let response = client
		.get("/orders/my-orders")
		.await
		.expect("The replay should succeed with the rotated token.");

	stale.assert_async().await;
	refresh.assert_async().await;
	replay.assert_async().await;

	assert_eq!(response.status, 200);
	assert_eq!(observer.count(), 0);

	let access = store
		.access_token()
		.await
		.expect("Token store fetch should succeed.")
		.expect("A rotated access token should be stored.");

	assert_eq!(access.expose(), "access-fresh");

	let rotated_refresh = store
		.refresh_token()
		.await
		.expect("Token store fetch should succeed.")
		.expect("A rotated refresh token should be stored.");

	assert_eq!(rotated_refresh.expose(), "refresh-2");
}

#[tokio::test]
async fn concurrent_requests_share_a_single_refresh_call() {
	let server = MockServer::start_async().await;
	let (client, store, observer) = build_reqwest_test_client(&server.base_url());

	seed_credentials(&store, "stale-access", "refresh-1").await;

	for route in ["/cart", "/favorites", "/user/profile"] {
		server
			.mock_async(|when, then| {
				when.method(GET).path(route).header("authorization", "Bearer stale-access");
				then.status(401).body("{\"error\":\"token expired\"}");
			})
			.await;
		server
			.mock_async(|when, then| {
				when.method(GET).path(route).header("authorization", "Bearer access-fresh");
				then.status(200).body("{}");
			})
			.await;
	}

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh-token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-fresh\"}");
		})
		.await;
	let (cart, favorites, profile) =
		tokio::join!(client.get("/cart"), client.get("/favorites"), client.get("/user/profile"));

	assert_eq!(cart.expect("Cart request should succeed after the shared refresh.").status, 200);
	assert_eq!(
		favorites.expect("Favorites request should succeed after the shared refresh.").status,
		200,
	);
	assert_eq!(
		profile.expect("Profile request should succeed after the shared refresh.").status,
		200,
	);

	refresh.assert_calls_async(1).await;

	assert_eq!(observer.count(), 0);

	// The server kept the old refresh token, so the stored one must survive rotation.
	let kept_refresh = store
		.refresh_token()
		.await
		.expect("Token store fetch should succeed.")
		.expect("The refresh token should survive an access-only rotation.");

	assert_eq!(kept_refresh.expose(), "refresh-1");
}
