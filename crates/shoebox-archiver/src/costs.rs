//! Usage counters and cost estimates
//!
//! Counters only ever increase. Prices are optional; an item without a
//! configured price is left out of the cost summary.

use std::sync::atomic::{AtomicU64, Ordering};

use rust_decimal::Decimal;
use shoebox_core::CostPrices;

const GB: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Default)]
pub struct CostEstimator {
    reads: AtomicU64,
    writes: AtomicU64,
    others: AtomicU64,
    list_or_create_containers: AtomicU64,
    bytes_written: AtomicU64,
    bytes_read: AtomicU64,
    describes: AtomicU64,
    faces: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub reads: u64,
    pub writes: u64,
    pub others: u64,
    pub list_or_create_containers: u64,
    pub bytes_written: u64,
    pub bytes_read: u64,
    pub describes: u64,
    pub faces: u64,
}

impl CostEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    /// A read that transferred `bytes` out of the store
    pub fn add_download(&self, bytes: u64) {
        self.add_read();
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// A write that stored `bytes`
    pub fn add_upload(&self, bytes: u64) {
        self.add_write();
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_other(&self) {
        self.others.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_list_or_create_container(&self) {
        self.list_or_create_containers
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_describe(&self) {
        self.describes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_face(&self) {
        self.faces.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            others: self.others.load(Ordering::Relaxed),
            list_or_create_containers: self.list_or_create_containers.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            describes: self.describes.load(Ordering::Relaxed),
            faces: self.faces.load(Ordering::Relaxed),
        }
    }

    /// Non-zero counters with a human-readable label
    pub fn summarize_usage(&self) -> Vec<(&'static str, u64)> {
        let usage = self.snapshot();
        [
            ("Bytes uploaded", usage.bytes_written),
            ("Bytes downloaded", usage.bytes_read),
            ("List or create container operations", usage.list_or_create_containers),
            ("Read operations", usage.reads),
            ("Write operations", usage.writes),
            ("Other operations", usage.others),
            ("Describe transactions", usage.describes),
            ("Face transactions", usage.faces),
        ]
        .into_iter()
        .filter(|(_, amount)| *amount > 0)
        .collect()
    }

    /// Estimated costs for every counter that has both usage and a price
    pub fn summarize_costs(&self, prices: &CostPrices) -> Vec<(&'static str, Decimal)> {
        let usage = self.snapshot();
        let per = |count: u64, price: Option<Decimal>, unit: u64| {
            price.map(|price| Decimal::from(count) * price / Decimal::from(unit))
        };
        let gigabytes = |bytes: u64| Decimal::from(bytes) / Decimal::from(GB);

        let items = [
            (
                "Data storage (monthly)",
                usage.bytes_written,
                prices.data_storage_per_gb.map(|p| gigabytes(usage.bytes_written) * p),
            ),
            (
                "List or create container operations",
                usage.list_or_create_containers,
                per(
                    usage.list_or_create_containers,
                    prices.list_or_create_container_per_10000,
                    10_000,
                ),
            ),
            (
                "Read operations",
                usage.reads,
                per(usage.reads, prices.read_per_10000, 10_000),
            ),
            (
                "Write operations",
                usage.writes,
                per(usage.writes, prices.write_per_10000, 10_000),
            ),
            (
                "Other operations",
                usage.others,
                per(usage.others, prices.other_per_10000, 10_000),
            ),
            (
                "Geo-redundancy data transfer",
                usage.bytes_written,
                prices
                    .grs_data_transfer_per_gb
                    .map(|p| gigabytes(usage.bytes_written) * p),
            ),
            (
                "Outbound data transfer",
                usage.bytes_read,
                prices
                    .outbound_data_transfer_per_gb
                    .map(|p| gigabytes(usage.bytes_read) * p),
            ),
            (
                "Describe transactions",
                usage.describes,
                per(usage.describes, prices.describe_per_1000, 1_000),
            ),
            (
                "Face transactions",
                usage.faces,
                per(usage.faces, prices.face_per_1000, 1_000),
            ),
        ];

        items
            .into_iter()
            .filter(|(_, amount, _)| *amount > 0)
            .filter_map(|(label, _, cost)| cost.map(|cost| (label, cost.round_dp(6))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_usage_skips_zero_counters() {
        let costs = CostEstimator::new();
        costs.add_upload(2048);
        costs.add_other();
        costs.add_other();

        let usage = costs.summarize_usage();
        assert_eq!(
            usage,
            vec![
                ("Bytes uploaded", 2048),
                ("Write operations", 1),
                ("Other operations", 2)
            ]
        );
    }

    #[test]
    fn test_costs_use_configured_prices_only() {
        let costs = CostEstimator::new();
        for _ in 0..10 {
            costs.add_write();
        }
        costs.add_read();
        costs.add_describe();

        let prices = CostPrices {
            write_per_10000: Some(Decimal::from_str("0.10").unwrap()),
            describe_per_1000: Some(Decimal::from(1)),
            ..CostPrices::default()
        };

        let summary = costs.summarize_costs(&prices);
        assert_eq!(
            summary,
            vec![
                ("Write operations", Decimal::from_str("0.0001").unwrap()),
                ("Describe transactions", Decimal::from_str("0.001").unwrap()),
            ]
        );
    }

    #[test]
    fn test_storage_cost_by_gigabyte() {
        let costs = CostEstimator::new();
        costs.add_upload(GB);
        let prices = CostPrices {
            data_storage_per_gb: Some(Decimal::from_str("0.01").unwrap()),
            ..CostPrices::default()
        };
        let summary = costs.summarize_costs(&prices);
        assert_eq!(
            summary,
            vec![("Data storage (monthly)", Decimal::from_str("0.01").unwrap())]
        );
    }
}
