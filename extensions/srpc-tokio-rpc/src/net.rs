use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// First IPv4 address that a remote peer could plausibly reach.
pub fn first_non_loopback_ipv4<I>(addrs: I) -> Option<IpAddr>
where
    I: IntoIterator<Item = IpAddr>,
{
    addrs.into_iter().find(|addr| match addr {
        IpAddr::V4(v4) => !v4.is_loopback() && !v4.is_unspecified(),
        IpAddr::V6(_) => false,
    })
}

/// Address of this host on its first non-loopback IPv4 interface.
pub fn local_ipv4() -> Option<IpAddr> {
    match local_ip_address::list_afinet_netifas() {
        Ok(interfaces) => first_non_loopback_ipv4(interfaces.into_iter().map(|(_, addr)| addr)),
        Err(e) => {
            tracing::warn!(error = %e, "failed to list network interfaces");
            None
        }
    }
}

/// The address to announce for a listener bound at `local_addr`.
///
/// A wildcard bind is replaced by this host's interface address, or loopback
/// when no interface qualifies. The port is kept.
pub fn advertised_addr(local_addr: SocketAddr) -> SocketAddr {
    if !local_addr.ip().is_unspecified() {
        return local_addr;
    }

    let ip = local_ipv4().unwrap_or_else(|| {
        tracing::warn!(%local_addr, "no non-loopback interface found; advertising loopback");
        Ipv4Addr::LOCALHOST.into()
    });
    SocketAddr::new(ip, local_addr.port())
}
