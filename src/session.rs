//! Application-level session lifecycle notifications.

/// Callback surface the application layer subscribes to for forced logouts.
///
/// The client invokes [`session_ended`](SessionObserver::session_ended) exactly once
/// per forced logout, with no payload, no matter how many concurrent requests failed
/// around the same refresh. Implementations typically route the UI back to a login
/// state; the client itself performs no navigation.
pub trait SessionObserver
where
	Self: Send + Sync,
{
	/// Invoked after the credential pair has been cleared by a forced logout.
	fn session_ended(&self);
}

/// Default observer that ignores session-ended notifications.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSessionObserver;
impl SessionObserver for NoopSessionObserver {
	fn session_ended(&self) {}
}
