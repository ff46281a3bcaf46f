//! Free-port detection.
//!
//! Best-effort only: the listener used for the check is dropped before the
//! caller binds the port, so another process can grab it in between. The
//! registry records the detected number as a reservation, not a lock.

use std::net::Ipv4Addr;

use tokio::net::TcpListener;

/// Find a TCP port that is free on the local machine at the instant of the check.
///
/// Prefers `preferred` when given and currently bindable; otherwise lets the OS
/// pick any free port (bind to port 0).
pub async fn detect_port(preferred: Option<u16>) -> crate::Result<u16> {
    if let Some(port) = preferred {
        match TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await {
            Ok(listener) => return Ok(listener.local_addr()?.port()),
            Err(e) => {
                tracing::debug!(port, error = %e, "preferred port unavailable, picking any free port");
            }
        }
    }

    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    Ok(listener.local_addr()?.port())
}
