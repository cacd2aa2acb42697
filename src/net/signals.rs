use tokio_util::sync::CancellationToken;

use crate::err::Error;

/// Completes when a shutdown signal is received, so the server stops
/// accepting connections and waits for the requests in flight.
///
/// A second signal cancels every request still in flight.
pub async fn graceful_shutdown(requests: CancellationToken) {
	let signal = match listen().await {
		Ok(signal) => signal,
		Err(e) => {
			error!("Failed to listen to shutdown signals: {e}");
			return std::future::pending().await;
		}
	};
	info!(
		"{signal} received. Waiting for graceful shutdown... A second signal will force an immediate shutdown"
	);
	tokio::spawn(async move {
		match listen().await {
			Ok(signal) => {
				warn!("{signal} received during graceful shutdown. Terminate immediately...")
			}
			Err(e) => error!("Failed to listen to shutdown signals: {e}. Terminate immediately..."),
		}
		// Cancel every field which is still resolving
		requests.cancel();
	});
}

#[cfg(unix)]
pub async fn listen() -> Result<String, Error> {
	// Import the OS signals
	use tokio::signal::unix::{SignalKind, signal};
	// Get the operating system signal types
	let mut sighup = signal(SignalKind::hangup())?;
	let mut sigint = signal(SignalKind::interrupt())?;
	let mut sigquit = signal(SignalKind::quit())?;
	let mut sigterm = signal(SignalKind::terminate())?;
	// Listen and wait for the system signals
	tokio::select! {
		// Wait for a SIGHUP signal
		_ = sighup.recv() => {
			Ok(String::from("SIGHUP"))
		}
		// Wait for a SIGINT signal
		_ = sigint.recv() => {
			Ok(String::from("SIGINT"))
		}
		// Wait for a SIGQUIT signal
		_ = sigquit.recv() => {
			Ok(String::from("SIGQUIT"))
		}
		// Wait for a SIGTERM signal
		_ = sigterm.recv() => {
			Ok(String::from("SIGTERM"))
		}
	}
}

#[cfg(windows)]
pub async fn listen() -> Result<String, Error> {
	// Import the OS signals
	use tokio::signal::windows;
	// Get the operating system signal types
	let mut exit = windows::ctrl_c()?;
	let mut leave = windows::ctrl_break()?;
	let mut close = windows::ctrl_close()?;
	let mut shutdown = windows::ctrl_shutdown()?;
	// Listen and wait for the system signals
	tokio::select! {
		// Wait for a CTRL-C signal
		_ = exit.recv() => {
			Ok(String::from("CTRL-C"))
		}
		// Wait for a CTRL-BREAK signal
		_ = leave.recv() => {
			Ok(String::from("CTRL-BREAK"))
		}
		// Wait for a CTRL-CLOSE signal
		_ = close.recv() => {
			Ok(String::from("CTRL-CLOSE"))
		}
		// Wait for a CTRL-SHUTDOWN signal
		_ = shutdown.recv() => {
			Ok(String::from("CTRL-SHUTDOWN"))
		}
	}
}
