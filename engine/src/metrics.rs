//! Metrics collection for auction monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Auction metrics.
pub struct Metrics {
    /// Accepted commitments.
    pub commits_total: AtomicU64,
    /// Verified reveals.
    pub reveals_total: AtomicU64,
    /// Times the leading bid changed.
    pub leader_changes: AtomicU64,
    /// Completed refunds to bidders.
    pub withdrawals_total: AtomicU64,
    /// Lot hand-overs (claim or reclaim).
    pub settlements_total: AtomicU64,
    /// Proceeds paid to the seller.
    pub proceeds_collected: AtomicU64,
    /// Operations rejected by a precondition.
    pub rejections_total: AtomicU64,
    /// Outbound transfers that failed and were rolled back.
    pub transfer_failures: AtomicU64,
    /// Funds currently held in escrow.
    pub escrow_balance: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            commits_total: AtomicU64::new(0),
            reveals_total: AtomicU64::new(0),
            leader_changes: AtomicU64::new(0),
            withdrawals_total: AtomicU64::new(0),
            settlements_total: AtomicU64::new(0),
            proceeds_collected: AtomicU64::new(0),
            rejections_total: AtomicU64::new(0),
            transfer_failures: AtomicU64::new(0),
            escrow_balance: AtomicU64::new(0),
        }
    }

    pub fn commit_accepted(&self) {
        self.commits_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reveal_accepted(&self, new_leader: bool) {
        self.reveals_total.fetch_add(1, Ordering::Relaxed);
        if new_leader {
            self.leader_changes.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn withdrawal_paid(&self) {
        self.withdrawals_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn lot_settled(&self) {
        self.settlements_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn proceeds_paid(&self) {
        self.proceeds_collected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn operation_rejected(&self) {
        self.rejections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transfer_failed(&self) {
        self.transfer_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Set the escrow gauge, saturating at `u64::MAX`.
    pub fn set_escrow_balance(&self, balance: u128) {
        let balance = u64::try_from(balance).unwrap_or(u64::MAX);
        self.escrow_balance.store(balance, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commits_total: self.commits_total.load(Ordering::Relaxed),
            reveals_total: self.reveals_total.load(Ordering::Relaxed),
            leader_changes: self.leader_changes.load(Ordering::Relaxed),
            withdrawals_total: self.withdrawals_total.load(Ordering::Relaxed),
            settlements_total: self.settlements_total.load(Ordering::Relaxed),
            proceeds_collected: self.proceeds_collected.load(Ordering::Relaxed),
            rejections_total: self.rejections_total.load(Ordering::Relaxed),
            transfer_failures: self.transfer_failures.load(Ordering::Relaxed),
            escrow_balance: self.escrow_balance.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            r#"# HELP sealbid_commits_total Total accepted commitments
# TYPE sealbid_commits_total counter
sealbid_commits_total {}

# HELP sealbid_reveals_total Total verified reveals
# TYPE sealbid_reveals_total counter
sealbid_reveals_total {}

# HELP sealbid_leader_changes Total changes of the leading bid
# TYPE sealbid_leader_changes counter
sealbid_leader_changes {}

# HELP sealbid_withdrawals_total Total refunds paid to bidders
# TYPE sealbid_withdrawals_total counter
sealbid_withdrawals_total {}

# HELP sealbid_settlements_total Total lot hand-overs
# TYPE sealbid_settlements_total counter
sealbid_settlements_total {}

# HELP sealbid_proceeds_collected Total proceeds payouts to the seller
# TYPE sealbid_proceeds_collected counter
sealbid_proceeds_collected {}

# HELP sealbid_rejections_total Total rejected operations
# TYPE sealbid_rejections_total counter
sealbid_rejections_total {}

# HELP sealbid_transfer_failures Total rolled back transfers
# TYPE sealbid_transfer_failures counter
sealbid_transfer_failures {}

# HELP sealbid_escrow_balance Funds currently held in escrow
# TYPE sealbid_escrow_balance gauge
sealbid_escrow_balance {}
"#,
            snapshot.commits_total,
            snapshot.reveals_total,
            snapshot.leader_changes,
            snapshot.withdrawals_total,
            snapshot.settlements_total,
            snapshot.proceeds_collected,
            snapshot.rejections_total,
            snapshot.transfer_failures,
            snapshot.escrow_balance,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub commits_total: u64,
    pub reveals_total: u64,
    pub leader_changes: u64,
    pub withdrawals_total: u64,
    pub settlements_total: u64,
    pub proceeds_collected: u64,
    pub rejections_total: u64,
    pub transfer_failures: u64,
    pub escrow_balance: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_increment() {
        let metrics = Metrics::new();

        metrics.reveal_accepted(true);
        metrics.reveal_accepted(false);
        metrics.operation_rejected();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.reveals_total, 2);
        assert_eq!(snapshot.leader_changes, 1);
        assert_eq!(snapshot.rejections_total, 1);
    }

    #[test]
    fn test_escrow_gauge_saturates() {
        let metrics = Metrics::new();
        metrics.set_escrow_balance(u128::MAX);
        assert_eq!(metrics.snapshot().escrow_balance, u64::MAX);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.commit_accepted();
        metrics.set_escrow_balance(200);

        let output = metrics.to_prometheus();
        assert!(output.contains("sealbid_commits_total 1"));
        assert!(output.contains("sealbid_escrow_balance 200"));
    }
}
