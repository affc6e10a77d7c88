use srpc_tokio_rpc::net::{advertised_addr, first_non_loopback_ipv4};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

#[test]
fn picks_first_non_loopback_ipv4() {
    let addrs = [
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(Ipv6Addr::LOCALHOST),
        IpAddr::V6("fe80::1".parse().unwrap()),
        IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)),
    ];

    assert_eq!(
        first_non_loopback_ipv4(addrs),
        Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)))
    );
}

#[test]
fn loopback_only_hosts_have_no_candidate() {
    let addrs = [
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V4(Ipv4Addr::new(127, 0, 1, 1)),
        IpAddr::V6(Ipv6Addr::LOCALHOST),
    ];

    assert_eq!(first_non_loopback_ipv4(addrs), None);
    assert_eq!(first_non_loopback_ipv4(Vec::new()), None);
}

#[test]
fn specific_binds_are_advertised_as_is() {
    let local: SocketAddr = "127.0.0.1:9000".parse().unwrap();
    assert_eq!(advertised_addr(local), local);

    let local: SocketAddr = "10.1.2.3:9000".parse().unwrap();
    assert_eq!(advertised_addr(local), local);
}

#[test]
fn wildcard_binds_advertise_a_reachable_ipv4() {
    let advertised = advertised_addr("0.0.0.0:9000".parse().unwrap());

    assert_eq!(advertised.port(), 9000);
    assert!(advertised.is_ipv4());
    assert!(!advertised.ip().is_unspecified());
}
