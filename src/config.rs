//! Store-wide configuration.

use std::time::Duration;

/// Durability mode for commit operations.
///
/// Distinguishes a WAL append that is merely buffered (survives process
/// crash, not OS crash) from one that is followed by an `fsync`
/// (survives both).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// Append to the WAL and return; no explicit fsync.
    Buffered,
    /// Append to the WAL, then fsync before returning.
    Durable,
}

impl Default for Durability {
    fn default() -> Self {
        Durability::Durable
    }
}

/// Tunable parameters for a [`crate::store::PersistentStore`].
///
/// Every field has a conservative default; callers override only the
/// fields their workload needs.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Target size, in bytes, of one compressed page in the paged index.
    pub page_size: usize,

    /// Number of primary keys buffered per order in the LSM-lite staging
    /// area before a flush is triggered.
    pub staging_flush_threshold: usize,

    /// Whether the LSM-lite staging layer (C11) is enabled at all. When
    /// `false`, every `addFact`/`deleteFact` lands directly in the
    /// in-memory six-order index and staging metrics always read zero.
    pub staging_enabled: bool,

    /// Number of live pages for a single primary key that triggers
    /// incremental compaction of that primary.
    pub compaction_page_threshold: usize,

    /// Fraction of tombstoned triples (by count) in an order's pages that
    /// triggers a full rewrite compaction of that order.
    pub compaction_tombstone_ratio: f64,

    /// Hard cap on primaries rewritten by one incremental compaction pass.
    pub compaction_max_primary: usize,

    /// Exponential decay factor applied to hotness counters on each
    /// maintenance tick (0.0..1.0; closer to 1.0 decays slower).
    pub hotness_decay: f64,

    /// Interval between automatic GC sweeps when the store drives its
    /// own maintenance loop. `None` disables automatic GC; callers invoke
    /// `gc()` manually.
    pub gc_interval: Option<Duration>,

    /// Reader registry entries older than this are considered stale and
    /// reclaimed by GC even if the owning process still appears to exist.
    pub reader_timeout: Duration,

    /// Maximum number of txIds remembered by the txId registry (C9) across
    /// restarts, bounding the idempotency window for WAL replay.
    pub max_remember_tx_ids: usize,

    /// Default durability mode for commits that don't specify one
    /// explicitly.
    pub durability: Durability,

    /// Whether `open` takes an exclusive writer lock (`*.lock`). Disabling
    /// this is only valid when no `.lock` file is currently present;
    /// otherwise `open` fails with `Error::Busy` rather than guess at
    /// whether the existing lock is stale.
    pub enable_lock: bool,

    /// Whether page blobs are Brotli-compressed on write.
    pub compress_pages: bool,

    /// Brotli quality level (0-11) used when `compress_pages` is set.
    pub compression_level: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            page_size: 64 * 1024,
            staging_flush_threshold: 4096,
            staging_enabled: true,
            compaction_page_threshold: 8,
            compaction_tombstone_ratio: 0.3,
            compaction_max_primary: 256,
            hotness_decay: 0.98,
            gc_interval: Some(Duration::from_secs(300)),
            reader_timeout: Duration::from_secs(60),
            max_remember_tx_ids: 100_000,
            durability: Durability::Durable,
            enable_lock: true,
            compress_pages: true,
            compression_level: 5,
        }
    }
}
