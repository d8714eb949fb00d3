//! Observable pool statistics, surfaced through the Database Manager for
//! diagnostics and through the Resource Monitor for eviction decisions.

/// A snapshot of a [`super::ConnectionPool`]'s occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    pub idle: usize,
    pub in_use: usize,
    /// Connections handed out beyond `max_connections` because the pool was
    /// saturated; these are never reused and are closed on release.
    pub bypass_count: usize,
    pub max_connections: usize,
}

impl PoolStats {
    pub fn total_active(&self) -> usize {
        self.in_use + self.bypass_count
    }

    /// Whether the pool is currently serving connections beyond its
    /// configured capacity.
    pub fn is_over_capacity(&self) -> bool {
        self.bypass_count > 0
    }
}
