//! Background TTL Sweeper
//!
//! Lazy expiry hides dead entries from readers, but an entry that is never
//! read again would stay on disk forever. The sweeper reclaims it.
//!
//! ## Design
//!
//! The sweeper runs as a Tokio task and on every tick:
//! 1. Computes the cutoff, the newest slot whose entries have all expired
//! 2. Walks every slot between the prune pointer and the cutoff, oldest first
//! 3. Removes each marker in the slot, together with its data record unless
//!    the key has been rewritten into a later slot since
//! 4. Persists the prune pointer as the last slot it finished
//!
//! ```text
//!            pointer                cutoff              now
//!               │                     │                  │
//!  ... ─────────┼─────────────────────┼──────────────────┼──▶ slots
//!   swept       │  swept by this tick │  still alive     │
//! ```
//!
//! A failure on one key is logged and skipped; it only means that key lingers
//! (still hidden by lazy expiry). A failed slot scan ends the tick before that
//! slot so the next tick retries it. The loop itself never exits on error.
//!
//! Cancellation is observed between ticks and between slots, so a slot is
//! never left half swept.

use super::index::{self, Record, PRUNE_POINTER_KEY, SLOT_PREFIX};
use super::Core;
use crate::error::{Error, Result};
use crate::table::Table;
use parking_lot::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Backlogs longer than this are swept with a single scan over all markers
/// instead of probing each (mostly empty) slot.
const BACKLOG_SCAN_SLOTS: i64 = 4096;

/// Lifecycle of the background sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweeperState {
    /// Waiting for the next tick
    Idle,
    /// Processing the slots of one tick
    Sweeping,
    /// Cancelled; no further ticks will run
    Stopped,
}

/// What one sweep tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Slots fully processed
    pub slots: u64,
    /// Data records removed
    pub expired: u64,
    /// Markers removed whose key had already moved to a later slot or gone
    pub stale_markers: u64,
    /// Keys skipped because the underlying table returned an error
    pub failures: u64,
    /// Prune pointer after the tick
    pub pointer: i64,
}

impl<T: Table> Core<T> {
    /// Runs one sweep up to the current cutoff, stopping early (at a slot
    /// boundary) if `cancel` fires.
    pub(crate) fn sweep(&self, cancel: &CancellationToken) -> SweepReport {
        let _sweeping = self.sweep_lock.lock();
        let pointer = self.pointer.load(Ordering::Acquire);
        let cutoff = self.schedule.cutoff(self.clock.now_nanos());
        let mut report = SweepReport {
            pointer,
            ..Default::default()
        };
        if cutoff <= pointer {
            return report;
        }

        let swept_to = if cutoff - pointer > BACKLOG_SCAN_SLOTS {
            info!(
                from = pointer,
                to = cutoff,
                "Sweeping a large backlog with a full marker scan"
            );
            self.sweep_backlog(pointer, cutoff, cancel, &mut report)
        } else {
            self.sweep_slots(pointer, cutoff, cancel, &mut report)
        };

        if swept_to > pointer {
            if let Err(e) = self
                .table
                .insert(PRUNE_POINTER_KEY, index::encode_pointer(swept_to))
            {
                error!(error = %e, pointer = swept_to, "Failed to persist prune pointer");
            }
            self.pointer.store(swept_to, Ordering::Release);
        }
        report.pointer = self.pointer.load(Ordering::Acquire);
        report
    }

    /// Probes each slot in `(pointer, cutoff]`. Returns the last slot finished.
    fn sweep_slots(
        &self,
        pointer: i64,
        cutoff: i64,
        cancel: &CancellationToken,
        report: &mut SweepReport,
    ) -> i64 {
        for slot in pointer + 1..=cutoff {
            if cancel.is_cancelled() {
                debug!(slot, "Sweep cancelled at slot boundary");
                return slot - 1;
            }
            if let Err(e) = self.sweep_slot(slot, report) {
                error!(error = %e, slot, "Failed to scan slot markers, retrying next tick");
                return slot - 1;
            }
            report.slots += 1;
        }
        cutoff
    }

    fn sweep_slot(&self, slot: i64, report: &mut SweepReport) -> Result<()> {
        for item in self.table.scan_prefix(&index::slot_prefix(slot))? {
            let (marker, _) = item?;
            match index::parse_marker(&marker) {
                Some((_, key)) => self.sweep_marker(slot, key, &marker, report),
                None => warn!(marker = %marker, "Ignoring malformed slot marker"),
            }
        }
        Ok(())
    }

    /// One ordered pass over the whole marker namespace, for when the pointer
    /// is far behind (after a long shutdown).
    fn sweep_backlog(
        &self,
        pointer: i64,
        cutoff: i64,
        cancel: &CancellationToken,
        report: &mut SweepReport,
    ) -> i64 {
        let iter = match self.table.scan_prefix(SLOT_PREFIX) {
            Ok(iter) => iter,
            Err(e) => {
                error!(error = %e, "Failed to scan slot markers, retrying next tick");
                return pointer;
            }
        };

        let mut current: Option<i64> = None;
        for item in iter {
            let marker = match item {
                Ok((marker, _)) => marker,
                Err(e) => {
                    error!(error = %e, "Slot marker scan failed, retrying next tick");
                    return current.map_or(pointer, |slot| (slot - 1).max(pointer));
                }
            };
            let Some((slot, key)) = index::parse_marker(&marker) else {
                warn!(marker = %marker, "Ignoring malformed slot marker");
                continue;
            };
            if slot > cutoff {
                break;
            }
            if current != Some(slot) {
                if current.is_some() {
                    report.slots += 1;
                }
                if cancel.is_cancelled() {
                    debug!(slot, "Sweep cancelled at slot boundary");
                    return (slot - 1).max(pointer);
                }
                current = Some(slot);
            }
            self.sweep_marker(slot, key, &marker, report);
        }
        if current.is_some() {
            report.slots += 1;
        }
        cutoff
    }

    fn sweep_marker(&self, slot: i64, key: &str, marker: &str, report: &mut SweepReport) {
        match self.remove_marked(slot, key, marker) {
            Ok(true) => report.expired += 1,
            Ok(false) => report.stale_markers += 1,
            Err(e) => {
                report.failures += 1;
                warn!(error = %e, key, slot, "Failed to remove expired key, skipping");
            }
        }
    }

    /// Removes the marker `slot:<slot>:<key>` and, if the key's record still
    /// belongs to that slot, the record itself. Returns whether data was
    /// removed.
    ///
    /// Holding the key lock while re-reading the record means a refresh that
    /// raced with the sweep is never undone: the refreshed record sits in a
    /// later slot and is left alone.
    fn remove_marked(&self, slot: i64, key: &str, marker: &str) -> Result<bool> {
        let _guard = self.locks.lock(key);
        let data_key = index::data_key(key);

        let remove_data = match self.table.get(&data_key) {
            Ok(raw) => match Record::decode(key, raw) {
                Ok(record) => self.schedule.slot_of(record.written_at) <= slot,
                Err(e) => {
                    warn!(error = %e, "Removing undecodable record");
                    true
                }
            },
            Err(Error::NotFound) => false,
            Err(e) => return Err(e),
        };

        if remove_data {
            self.table.delete(&data_key)?;
            trace!(key, slot, "Swept expired key");
        }
        self.table.delete(marker)?;
        Ok(remove_data)
    }
}

/// Handle to a running sweeper task.
///
/// The task stops when the caller's cancellation token fires, when
/// [`Sweeper::shutdown`] is called, or when the handle is dropped.
#[derive(Debug)]
pub(crate) struct Sweeper {
    cancel: CancellationToken,
    state: watch::Receiver<SweeperState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    /// Spawns the sweeper on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn start<T: Table + 'static>(core: Arc<Core<T>>, cancel: &CancellationToken) -> Self {
        let cancel = cancel.child_token();
        let (state_tx, state_rx) = watch::channel(SweeperState::Idle);

        let task = tokio::spawn(sweeper_loop(core, cancel.clone(), state_tx));
        info!("Background TTL sweeper started");

        Self {
            cancel,
            state: state_rx,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn state(&self) -> SweeperState {
        *self.state.borrow()
    }

    /// Stops the sweeper and waits for the current tick to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "TTL sweeper task failed");
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The main sweeper loop.
async fn sweeper_loop<T: Table + 'static>(
    core: Arc<Core<T>>,
    cancel: CancellationToken,
    state_tx: watch::Sender<SweeperState>,
) {
    let mut ticker = tokio::time::interval(core.prune_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        state_tx.send_replace(SweeperState::Sweeping);

        let tick_core = Arc::clone(&core);
        let tick_cancel = cancel.clone();
        match tokio::task::spawn_blocking(move || tick_core.sweep(&tick_cancel)).await {
            Ok(report) if report.slots > 0 => debug!(
                slots = report.slots,
                expired = report.expired,
                stale_markers = report.stale_markers,
                failures = report.failures,
                pointer = report.pointer,
                "TTL sweep finished"
            ),
            Ok(_) => trace!("TTL sweep found nothing due"),
            Err(e) => error!(error = %e, "TTL sweep panicked"),
        }

        state_tx.send_replace(SweeperState::Idle);
    }

    state_tx.send_replace(SweeperState::Stopped);
    info!("Background TTL sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ttl::{TtlConfig, TtlTable};
    use crate::clock::{Clock, ManualClock};
    use crate::storage::MemTable;
    use crate::table::Iter;
    use bytes::Bytes;
    use std::time::Duration;

    const TTL: Duration = Duration::from_secs(3600);
    const INTERVAL: Duration = Duration::from_secs(360);

    fn config() -> TtlConfig {
        TtlConfig::new(TTL, INTERVAL)
    }

    fn clock() -> ManualClock {
        ManualClock::new(Duration::from_secs(1_000_000))
    }

    fn open<T: Table + 'static>(
        db: T,
        clock: &ManualClock,
        cancel: &CancellationToken,
    ) -> TtlTable<T> {
        TtlTable::with_clock(db, config(), cancel, Arc::new(clock.clone())).unwrap()
    }

    /// Runs a hook before every delete; the hook may fail the delete.
    struct HookedTable {
        inner: MemTable,
        on_delete: Box<dyn Fn(&str) -> Result<()> + Send + Sync>,
    }

    impl HookedTable {
        fn new(on_delete: impl Fn(&str) -> Result<()> + Send + Sync + 'static) -> Self {
            Self {
                inner: MemTable::new(),
                on_delete: Box::new(on_delete),
            }
        }
    }

    impl Table for HookedTable {
        fn insert(&self, key: &str, value: Bytes) -> Result<()> {
            self.inner.insert(key, value)
        }

        fn get(&self, key: &str) -> Result<Bytes> {
            self.inner.get(key)
        }

        fn delete(&self, key: &str) -> Result<()> {
            (self.on_delete)(key)?;
            self.inner.delete(key)
        }

        fn size(&self) -> Result<usize> {
            self.inner.size()
        }

        fn iter(&self) -> Result<Iter> {
            self.inner.iter()
        }

        fn scan_prefix(&self, prefix: &str) -> Result<Iter> {
            self.inner.scan_prefix(prefix)
        }
    }

    fn marker_slots<T: Table>(db: &T) -> Vec<i64> {
        db.scan_prefix(SLOT_PREFIX)
            .unwrap()
            .filter_map(|item| index::parse_marker(&item.unwrap().0).map(|(slot, _)| slot))
            .collect()
    }

    #[tokio::test]
    async fn test_sweep_frees_storage() {
        let cancel = CancellationToken::new();
        let clock = clock();
        let table = open(MemTable::new(), &clock, &cancel);

        for i in 0..50 {
            table.insert(&format!("key{i}"), Bytes::from("v")).unwrap();
        }
        clock.advance(TTL + INTERVAL * 2);

        let report = table.sweep_now();
        assert_eq!(report.expired, 50);
        assert_eq!(report.failures, 0);
        // Only the prune pointer is left behind.
        assert_eq!(table.inner().size().unwrap(), 1);
        assert!(table.inner().get(PRUNE_POINTER_KEY).is_ok());
        assert_eq!(report.pointer, table.prune_pointer());
    }

    #[tokio::test]
    async fn test_sweep_spares_live_and_refreshed_keys() {
        let cancel = CancellationToken::new();
        let clock = clock();
        let table = open(MemTable::new(), &clock, &cancel);

        table.insert("stale", Bytes::from("v")).unwrap();
        table.insert("refreshed", Bytes::from("v1")).unwrap();
        clock.advance(TTL / 2);
        table.insert("refreshed", Bytes::from("v2")).unwrap();
        table.insert("young", Bytes::from("v")).unwrap();
        clock.advance(TTL / 2 + INTERVAL * 2);

        let report = table.sweep_now();
        assert_eq!(report.expired, 1);
        assert!(table.inner().get(&index::data_key("stale")).is_err());
        assert_eq!(table.get("refreshed").unwrap(), Bytes::from("v2"));
        assert!(table.get("young").is_ok());
    }

    #[tokio::test]
    async fn test_leftover_marker_does_not_delete_newer_record() {
        let cancel = CancellationToken::new();
        let clock = clock();
        let table = open(MemTable::new(), &clock, &cancel);
        let schedule = table.core.schedule;

        // A marker in an old slot that a crashed insert never cleaned up.
        let old_slot = schedule.slot_of(clock.now_nanos());
        table
            .inner()
            .insert(&index::marker_key(old_slot, "k"), Bytes::new())
            .unwrap();
        clock.advance(TTL / 2);
        table.insert("k", Bytes::from("v")).unwrap();
        clock.advance(TTL / 2 + INTERVAL * 2);

        let report = table.sweep_now();
        assert_eq!(report.stale_markers, 1);
        assert_eq!(report.expired, 0);
        assert_eq!(table.get("k").unwrap(), Bytes::from("v"));
    }

    #[tokio::test]
    async fn test_failures_are_skipped_and_pointer_still_advances() {
        let cancel = CancellationToken::new();
        let clock = clock();
        let db = HookedTable::new(|key| {
            if key.contains("poison") {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "injected").into());
            }
            Ok(())
        });
        let table = open(db, &clock, &cancel);

        table.insert("poison", Bytes::from("v")).unwrap();
        for i in 0..5 {
            table.insert(&format!("ok{i}"), Bytes::from("v")).unwrap();
        }
        let before = table.prune_pointer();
        clock.advance(TTL + INTERVAL * 2);

        let report = table.sweep_now();
        assert_eq!(report.failures, 1);
        assert_eq!(report.expired, 5);
        assert!(table.prune_pointer() > before);

        // The leaked key stays hidden from readers.
        assert!(table.get("ok0").unwrap_err().is_not_found());
        assert_eq!(table.iter().unwrap().count(), 0);
        // Callers do see the error on their own path.
        assert!(matches!(table.delete("poison"), Err(Error::Backend(_))));
    }

    #[tokio::test]
    async fn test_cancelled_sweep_leaves_pointer_alone() {
        let cancel = CancellationToken::new();
        let clock = clock();
        let table = open(MemTable::new(), &clock, &cancel);
        table.insert("k", Bytes::from("v")).unwrap();
        let before = table.prune_pointer();
        clock.advance(TTL + INTERVAL * 3);

        let cancelled = CancellationToken::new();
        cancelled.cancel();
        let report = table.core.sweep(&cancelled);
        assert_eq!(report.slots, 0);
        assert_eq!(table.prune_pointer(), before);
        assert!(table.inner().get(&index::data_key("k")).is_ok());
    }

    /// Fills slot `s` and slot `s + 1` with three keys each, then returns `s`.
    fn fill_two_slots<T: Table + 'static>(table: &TtlTable<T>, clock: &ManualClock) -> i64 {
        let first = table.core.schedule.slot_of(clock.now_nanos());
        for i in 0..3 {
            table.insert(&format!("a{i}"), Bytes::from("v")).unwrap();
        }
        clock.advance(INTERVAL);
        for i in 0..3 {
            table.insert(&format!("b{i}"), Bytes::from("v")).unwrap();
        }
        first
    }

    /// A table that cancels `stop` on the first data delete it sees.
    fn cancelling_table(stop: &CancellationToken) -> HookedTable {
        let stop = stop.clone();
        HookedTable::new(move |key| {
            if key.starts_with(index::DATA_PREFIX) {
                stop.cancel();
            }
            Ok(())
        })
    }

    fn assert_stopped_after_first_slot<T: Table + 'static>(
        table: &TtlTable<T>,
        report: SweepReport,
        first: i64,
    ) {
        assert_eq!(report.slots, 1);
        assert_eq!(report.expired, 3);
        assert_eq!(report.pointer, first);
        assert_eq!(table.prune_pointer(), first);
        assert_eq!(marker_slots(table.inner()), vec![first + 1; 3]);
        for i in 0..3 {
            assert!(table.inner().get(&index::data_key(&format!("a{i}"))).is_err());
            assert!(table.inner().get(&index::data_key(&format!("b{i}"))).is_ok());
        }
        let persisted = table.inner().get(PRUNE_POINTER_KEY).unwrap();
        assert_eq!(index::decode_pointer(&persisted).unwrap(), first);
    }

    #[tokio::test]
    async fn test_cancel_mid_slot_finishes_that_slot_only() {
        let cancel = CancellationToken::new();
        let stop = CancellationToken::new();
        let clock = clock();
        let table = open(cancelling_table(&stop), &clock, &cancel);
        let first = fill_two_slots(&table, &clock);
        clock.advance(TTL + INTERVAL * 2);
        assert!(table.core.schedule.cutoff(clock.now_nanos()) > first);

        let report = table.core.sweep(&stop);
        assert_stopped_after_first_slot(&table, report, first);

        // The next sweep picks up where the cancelled one stopped.
        let report = table.sweep_now();
        assert_eq!(report.expired, 3);
        assert!(marker_slots(table.inner()).is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_backlog_stops_at_slot_boundary() {
        let cancel = CancellationToken::new();
        let stop = CancellationToken::new();
        let clock = clock();
        let table = open(cancelling_table(&stop), &clock, &cancel);
        let first = fill_two_slots(&table, &clock);
        clock.advance(TTL + INTERVAL * (BACKLOG_SCAN_SLOTS as u32 * 2));

        let report = table.core.sweep(&stop);
        assert_stopped_after_first_slot(&table, report, first);
    }

    #[tokio::test]
    async fn test_prune_pointer_does_not_wait_for_a_sweep() {
        let cancel = CancellationToken::new();
        let clock = clock();
        let db = HookedTable::new(|key| {
            if key.starts_with(index::DATA_PREFIX) {
                std::thread::sleep(Duration::from_millis(50));
            }
            Ok(())
        });
        let table = Arc::new(open(db, &clock, &cancel));
        for i in 0..10 {
            table.insert(&format!("k{i}"), Bytes::from("v")).unwrap();
        }
        let before = table.prune_pointer();
        clock.advance(TTL + INTERVAL * 2);

        let sweeping = Arc::clone(&table);
        let sweep = std::thread::spawn(move || sweeping.sweep_now());
        std::thread::sleep(Duration::from_millis(30));

        let started = std::time::Instant::now();
        let pointer = table.prune_pointer();
        assert!(started.elapsed() < Duration::from_millis(20));
        // Not advanced until the sweep has persisted it.
        assert_eq!(pointer, before);

        let report = sweep.join().unwrap();
        assert_eq!(report.expired, 10);
        assert_eq!(table.prune_pointer(), report.pointer);
        assert!(report.pointer > before);
    }

    #[tokio::test]
    async fn test_sweeper_reports_sweeping_while_busy() {
        let cancel = CancellationToken::new();
        let db = HookedTable::new(|key| {
            if key.starts_with(index::DATA_PREFIX) {
                std::thread::sleep(Duration::from_millis(100));
            }
            Ok(())
        });
        let table = TtlTable::new(
            db,
            TtlConfig::new(Duration::from_millis(100), Duration::from_millis(20)),
            &cancel,
        )
        .unwrap();
        for i in 0..5 {
            table.insert(&format!("k{i}"), Bytes::from("v")).unwrap();
        }

        let mut seen = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        while tokio::time::Instant::now() < deadline {
            let state = table.sweeper_state();
            if seen.last() != Some(&state) {
                seen.push(state);
            }
            let remaining = table.inner().inner.size_prefix(index::DATA_PREFIX).unwrap();
            if state == SweeperState::Idle && remaining == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(seen.contains(&SweeperState::Sweeping));
        assert_eq!(seen.last(), Some(&SweeperState::Idle));

        table.shutdown().await;
        assert_eq!(table.sweeper_state(), SweeperState::Stopped);
    }

    #[tokio::test]
    async fn test_restart_resumes_from_persisted_pointer() {
        let db = Arc::new(MemTable::new());
        let clock = clock();

        let cancel = CancellationToken::new();
        let first = open(Arc::clone(&db), &clock, &cancel);
        first.insert("early", Bytes::from("v")).unwrap();
        clock.advance(TTL + INTERVAL * 2);
        first.insert("late", Bytes::from("v")).unwrap();
        first.sweep_now();
        let pointer = first.prune_pointer();
        first.shutdown().await;
        assert_eq!(first.sweeper_state(), SweeperState::Stopped);
        drop(first);

        let cancel = CancellationToken::new();
        let second = open(Arc::clone(&db), &clock, &cancel);
        assert_eq!(second.prune_pointer(), pointer);

        // Nothing is due yet, so nothing is re-swept and nothing expires early.
        let report = second.sweep_now();
        assert_eq!(report.slots, 0);
        assert_eq!(second.get("late").unwrap(), Bytes::from("v"));

        clock.advance(TTL + INTERVAL * 2);
        let report = second.sweep_now();
        assert_eq!(report.expired, 1);
        assert!(second.prune_pointer() > pointer);
        assert_eq!(db.size().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_long_downtime_uses_backlog_scan() {
        let db = Arc::new(MemTable::new());
        let clock = clock();
        let cancel = CancellationToken::new();
        let table = open(Arc::clone(&db), &clock, &cancel);
        for i in 0..10 {
            table.insert(&format!("k{i}"), Bytes::from("v")).unwrap();
            clock.advance(INTERVAL);
        }

        clock.advance(INTERVAL * (BACKLOG_SCAN_SLOTS as u32 * 2));
        let report = table.sweep_now();
        assert_eq!(report.expired, 10);
        assert_eq!(report.slots, 10);
        assert_eq!(
            report.pointer,
            table.core.schedule.cutoff(clock.now_nanos())
        );
        assert_eq!(db.size().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_background_sweeper() {
        let cancel = CancellationToken::new();
        let table = TtlTable::new(
            MemTable::new(),
            TtlConfig::new(Duration::from_millis(200), Duration::from_millis(20)),
            &cancel,
        )
        .unwrap();
        assert_ne!(table.sweeper_state(), SweeperState::Stopped);

        cancel.cancel();
        table.shutdown().await;
        assert_eq!(table.sweeper_state(), SweeperState::Stopped);

        // Lazy expiry still works without the sweeper.
        table.insert("k", Bytes::from("v")).unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(table.get("k").unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_background_sweeper_reclaims_storage() {
        let cancel = CancellationToken::new();
        let db = Arc::new(MemTable::new());
        let table = TtlTable::new(
            Arc::clone(&db),
            TtlConfig::new(Duration::from_millis(200), Duration::from_millis(50)),
            &cancel,
        )
        .unwrap();

        for i in 0..10 {
            table.insert(&format!("key{i}"), Bytes::from("value")).unwrap();
        }
        assert_eq!(db.size().unwrap(), 21);

        // Nobody reads the keys; only the sweeper can remove them.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        while db.size().unwrap() > 1 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        assert_eq!(db.size().unwrap(), 1);
        cancel.cancel();
    }

    #[test]
    fn test_manual_clock_drives_cutoff() {
        let clock = clock();
        let schedule = index::Schedule::new(TTL, INTERVAL);
        let start = schedule.cutoff(clock.now_nanos());
        clock.advance(INTERVAL);
        assert_eq!(schedule.cutoff(clock.now_nanos()), start + 1);
    }
}
