//! Local address discovery for URLs handed to displays.

use std::net::{IpAddr, Ipv4Addr};

use tokio::net::UdpSocket;
use tracing::debug;

/// Address of a public resolver used only to pick the outbound route.
/// Connecting a UDP socket sends no packets.
const ROUTE_PROBE: &str = "8.8.8.8:80";

/// The local address of the interface that routes to the wider network.
///
/// Displays fetch streams from this machine, so they need a routable
/// address rather than loopback. Falls back to `127.0.0.1` when no route
/// exists.
pub async fn local_ip() -> IpAddr {
    match probe().await {
        Ok(ip) => ip,
        Err(e) => {
            debug!(error = %e, "route probe failed, using loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

async fn probe() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.connect(ROUTE_PROBE).await?;
    Ok(socket.local_addr()?.ip())
}
