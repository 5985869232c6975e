use std::net::{IpAddr, SocketAddr, TcpListener};

use log::debug;

use crate::{config::PortRange, error::LaunchError};

/// Bind the first free port in `range`, trying candidates in ascending order.
///
/// A candidate that fails to bind is skipped; only running out of
/// candidates is an error.
pub fn select_port(host: IpAddr, range: PortRange) -> Result<(TcpListener, u16), LaunchError> {
    for port in range {
        match TcpListener::bind(SocketAddr::new(host, port)) {
            Ok(listener) => return Ok((listener, port)),
            Err(e) => debug!("Port {port} unavailable: {e}"),
        }
    }
    Err(LaunchError::PortExhaustion {
        start: range.start(),
        end: range.end(),
    })
}
