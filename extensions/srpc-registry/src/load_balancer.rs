use rand::seq::IteratorRandom;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Picks one provider out of a discovery result.
pub trait LoadBalancer: Send + Sync {
    fn select(&self, service_name: &str, endpoints: &BTreeSet<SocketAddr>) -> Option<SocketAddr>;
}

/// Always the lowest endpoint in sort order.
#[derive(Debug, Default)]
pub struct FirstAvailable;

impl LoadBalancer for FirstAvailable {
    fn select(&self, _service_name: &str, endpoints: &BTreeSet<SocketAddr>) -> Option<SocketAddr> {
        endpoints.first().copied()
    }
}

/// Cycles through the endpoints in sort order.
///
/// One cursor is shared by all services, so interleaved calls to different
/// services advance each other's rotation.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl LoadBalancer for RoundRobin {
    fn select(&self, _service_name: &str, endpoints: &BTreeSet<SocketAddr>) -> Option<SocketAddr> {
        if endpoints.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % endpoints.len();
        endpoints.iter().nth(index).copied()
    }
}

#[derive(Debug, Default)]
pub struct Random;

impl LoadBalancer for Random {
    fn select(&self, _service_name: &str, endpoints: &BTreeSet<SocketAddr>) -> Option<SocketAddr> {
        endpoints.iter().choose(&mut rand::rng()).copied()
    }
}
