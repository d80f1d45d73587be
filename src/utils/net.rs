use std::net::TcpListener;

use tracing::trace;

use crate::constants::LOOPBACK;
use crate::Error;
use crate::Result;

/// Asks the OS for an unused loopback port.
///
/// The listener is dropped before returning so the server can bind the port
/// next. Another process may grab it in between; that race is accepted for a
/// test helper.
pub fn allocate_port() -> Result<u16> {
    let listener = TcpListener::bind((LOOPBACK, 0)).map_err(Error::Allocation)?;
    let port = listener.local_addr().map_err(Error::Allocation)?.port();
    trace!("allocated ephemeral port {}", port);
    Ok(port)
}

/// `127.0.0.1:<port>`
pub fn loopback_addr(port: u16) -> String {
    format!("{}:{}", LOOPBACK, port)
}
