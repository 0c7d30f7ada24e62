//! Round-robin selection strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::balancer::Selector;
use crate::registry::EndpointView;

/// Round-robin selector.
/// Stores an internal cursor to rotate through the healthy subset.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Selector for RoundRobin {
    fn pick(&self, healthy: &[EndpointView]) -> Option<EndpointView> {
        if healthy.is_empty() {
            return None;
        }

        let n = self.cursor.fetch_add(1, Ordering::Relaxed);
        Some(healthy[n % healthy.len()].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{EndpointStats, EndpointStatus};
    use std::time::Instant;

    fn view(address: &str) -> EndpointView {
        EndpointView {
            address: address.to_string(),
            status: EndpointStatus::Healthy,
            consecutive_failures: 0,
            last_check: Instant::now(),
            stats: EndpointStats::default(),
        }
    }

    #[test]
    fn rotates_through_each_endpoint_then_wraps() {
        let selector = RoundRobin::new();
        let healthy = vec![view("http://a:1"), view("http://b:1"), view("http://c:1")];

        let picks: Vec<_> = (0..4)
            .map(|_| selector.pick(&healthy).unwrap().address)
            .collect();
        assert_eq!(picks, vec!["http://a:1", "http://b:1", "http://c:1", "http://a:1"]);
    }

    #[test]
    fn empty_subset_yields_none() {
        let selector = RoundRobin::new();
        assert!(selector.pick(&[]).is_none());
    }

    #[test]
    fn cursor_remaps_when_the_subset_shrinks() {
        let selector = RoundRobin::new();
        let full = vec![view("http://a:1"), view("http://b:1"), view("http://c:1")];
        let reduced = vec![view("http://a:1"), view("http://c:1")];

        let _ = selector.pick(&full);
        let _ = selector.pick(&full);

        // With one endpoint demoted, rotation continues over what is left.
        let picks: Vec<_> = (0..4)
            .map(|_| selector.pick(&reduced).unwrap().address)
            .collect();
        assert_eq!(
            picks,
            vec!["http://a:1", "http://c:1", "http://a:1", "http://c:1"]
        );
    }
}
