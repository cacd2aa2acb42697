use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::iam::{self, Auth, Deny, Fixed, IdentityResolver};

/// Specifies the current session information when processing a request.
///
/// A session is created by the transport for every incoming request and
/// handed to the GraphQL engine as request data. Cloning a session is cheap
/// and clones share the resolved identity and the cancellation signal.
#[derive(Clone)]
pub struct Session {
	/// The current connection IP address
	pub ip: Option<String>,
	/// The current request ID
	pub id: Option<String>,
	/// The headers of the incoming request
	headers: Arc<HeaderMap>,
	/// The collaborator resolving the caller's identity
	resolver: Arc<dyn IdentityResolver>,
	/// The identity, once resolved
	identity: Arc<OnceCell<Auth>>,
	/// Fires when the caller goes away
	cancel: CancellationToken,
	/// When the request must have completed
	deadline: Option<Instant>,
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("ip", &self.ip)
			.field("id", &self.id)
			.field("identity", &self.identity.get())
			.field("deadline", &self.deadline)
			.finish()
	}
}

impl Default for Session {
	fn default() -> Self {
		Self::new(Arc::new(Deny))
	}
}

impl Session {
	/// Create a session resolving identities with the given collaborator
	pub fn new(resolver: Arc<dyn IdentityResolver>) -> Session {
		Session {
			ip: None,
			id: None,
			headers: Arc::new(HeaderMap::new()),
			resolver,
			identity: Arc::new(OnceCell::new()),
			cancel: CancellationToken::new(),
			deadline: None,
		}
	}
	/// Create a session with an already known identity
	pub fn for_auth(auth: Auth) -> Session {
		Session::new(Arc::new(Fixed(auth)))
	}
	/// Set the connection IP address for the session
	pub fn with_ip(mut self, ip: impl Into<String>) -> Session {
		self.ip = Some(ip.into());
		self
	}
	/// Set the request ID for the session
	pub fn with_id(mut self, id: impl Into<String>) -> Session {
		self.id = Some(id.into());
		self
	}
	/// Set the request headers identities are resolved from
	pub fn with_headers(mut self, headers: HeaderMap) -> Session {
		self.headers = Arc::new(headers);
		self
	}
	/// Cancel the session when the given token fires
	pub fn with_cancellation(mut self, token: CancellationToken) -> Session {
		self.cancel = token;
		self
	}
	/// Limit how long the session may run
	pub fn with_timeout(mut self, timeout: Duration) -> Session {
		self.deadline = Some(Instant::now() + timeout);
		self
	}
	/// Retrieves the request headers
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}
	/// Retrieves the cancellation token of the session
	pub fn cancellation(&self) -> &CancellationToken {
		&self.cancel
	}
	/// Resolves the caller's identity, at most once per session.
	///
	/// A failed resolution is not cached, so a later resolver of the same
	/// request will ask the collaborator again.
	pub async fn auth(&self) -> Result<Auth, iam::Error> {
		let auth = self
			.identity
			.get_or_try_init(|| async {
				trace!("Resolving the identity for request {:?}", self.id);
				self.resolver.resolve(&self.headers).await
			})
			.await?;
		Ok(auth.clone())
	}
	/// Check whether the caller went away or the deadline has passed
	pub fn is_done(&self) -> bool {
		self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
	}
	/// Completes once the caller goes away or the deadline passes
	pub async fn done(&self) {
		match self.deadline {
			Some(deadline) => {
				tokio::select! {
					_ = self.cancel.cancelled() => {},
					_ = tokio::time::sleep_until(deadline) => {},
				}
			}
			None => self.cancel.cancelled().await,
		}
	}
}
