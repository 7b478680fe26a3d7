//! Epoch-synchronized join of two independently windowed streams.
//!
//! [`join`] returns a left and a right handle over one shared core. Each side
//! keeps an epoch cursor; a downstream flush for epoch `E` is issued only when
//! a side moves past `E` while the other side is already past it, so the
//! counterpart can no longer supply a match for `E`. A side that never
//! advances holds back every flush.
//!
//! Entries are matched at most once: a hit removes the counterpart's pending
//! entry. Pending entries expire by epoch: when one side's cursor reaches `c`,
//! the other side's entries for epochs below `c` are dropped, since no record
//! for those epochs can arrive anymore.

use super::{reject, BoxedOperator, Extractor, Operator};
use crate::error::{Result, StreamError};
use crate::record::{GroupKey, JoinKey, Record, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    /// (own, other) slot indices
    fn slots(self) -> (usize, usize) {
        match self {
            Side::Left => (0, 1),
            Side::Right => (1, 0),
        }
    }
}

/// Counters over the life of a join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    /// Merged records emitted
    pub matched: u64,
    /// Records parked waiting for a counterpart
    pub buffered: u64,
    /// Pending entries dropped because their epoch can no longer match
    pub evicted: u64,
    /// Flushes forwarded downstream
    pub flushes: u64,
}

/// Values waiting for a counterpart, bucketed by epoch.
#[derive(Debug, Default)]
struct PendingTable {
    epochs: BTreeMap<i64, HashMap<GroupKey, Record>>,
}

impl PendingTable {
    fn take(&mut self, key: &JoinKey) -> Option<Record> {
        let bucket = self.epochs.get_mut(&key.epoch)?;
        let taken = bucket.remove(&key.key);
        if bucket.is_empty() {
            self.epochs.remove(&key.epoch);
        }
        taken
    }

    /// Park `vals` under `key`. A second record for the same key replaces the first.
    fn insert(&mut self, key: JoinKey, vals: Record) -> bool {
        self.epochs
            .entry(key.epoch)
            .or_default()
            .insert(key.key, vals)
            .is_some()
    }

    /// Drop every entry with an epoch below `epoch`; returns how many went.
    fn evict_before(&mut self, epoch: i64) -> usize {
        let keep = self.epochs.split_off(&epoch);
        let expired = std::mem::replace(&mut self.epochs, keep);
        expired.values().map(HashMap::len).sum()
    }

    fn len(&self) -> usize {
        self.epochs.values().map(HashMap::len).sum()
    }
}

struct JoinCore {
    epoch_field: String,
    extractors: [Extractor; 2],
    pending: [PendingTable; 2],
    cursors: [i64; 2],
    next: BoxedOperator,
    stats: JoinStats,
}

impl JoinCore {
    /// Move `side`'s cursor up to `target`, flushing each epoch both sides have left.
    fn advance(&mut self, side: Side, target: i64) -> Result<()> {
        let (own, other) = side.slots();
        while target > self.cursors[own] {
            if self.cursors[other] > self.cursors[own] {
                let ctx = Record::singleton(self.epoch_field.clone(), Value::Int(self.cursors[own]));
                self.next.flush(&ctx)?;
                self.stats.flushes += 1;
            }
            self.cursors[own] += 1;
            let evicted = self.pending[other].evict_before(self.cursors[own]);
            if evicted > 0 {
                self.stats.evicted += evicted as u64;
                debug!(?side, evicted, before = self.cursors[own], "expired pending join entries");
            }
        }
        Ok(())
    }

    fn accept(&mut self, side: Side, record: &Record) -> Result<()> {
        let (own, other) = side.slots();
        let epoch = record.int(&self.epoch_field).map_err(|e| {
            StreamError::InvariantViolation(format!("join input has no usable epoch: {}", e))
        })?;
        self.advance(side, epoch)?;

        let (key, vals) = match (self.extractors[own])(record) {
            Ok(kv) => kv,
            Err(e) => return reject("join", e),
        };
        let join_key = JoinKey::new(key, epoch);

        if let Some(theirs) = self.pending[other].take(&join_key) {
            self.stats.matched += 1;
            let mut head = join_key.key.into_record();
            head.insert(self.epoch_field.clone(), Value::Int(epoch));
            let out = Record::merge(&head, &Record::merge(&vals, &theirs));
            return self.next.accept(&out);
        }

        if epoch < self.cursors[other] {
            // The other side has moved past this epoch; nothing can match it.
            self.stats.evicted += 1;
            return Ok(());
        }
        if self.pending[own].insert(join_key, vals) {
            debug!(?side, epoch, "pending join entry replaced");
        } else {
            self.stats.buffered += 1;
        }
        Ok(())
    }

    fn flush(&mut self, side: Side, ctx: &Record) -> Result<()> {
        let epoch = ctx.int(&self.epoch_field).map_err(|e| {
            StreamError::InvariantViolation(format!("join flush context has no usable epoch: {}", e))
        })?;
        self.advance(side, epoch)
    }
}

/// One input of a join. Both handles share the same pending tables and cursors.
pub struct JoinSide {
    side: Side,
    core: Rc<RefCell<JoinCore>>,
}

impl JoinSide {
    pub fn stats(&self) -> JoinStats {
        self.core.borrow().stats
    }

    /// Entries currently waiting on this side.
    pub fn pending(&self) -> usize {
        let (own, _) = self.side.slots();
        self.core.borrow().pending[own].len()
    }

    pub fn cursor(&self) -> i64 {
        let (own, _) = self.side.slots();
        self.core.borrow().cursors[own]
    }

    fn core(&self) -> Result<std::cell::RefMut<'_, JoinCore>> {
        self.core.try_borrow_mut().map_err(|_| {
            StreamError::InvariantViolation("join re-entered from its own downstream".to_string())
        })
    }
}

impl Operator for JoinSide {
    fn accept(&mut self, record: &Record) -> Result<()> {
        let side = self.side;
        self.core()?.accept(side, record)
    }

    fn flush(&mut self, ctx: &Record) -> Result<()> {
        let side = self.side;
        self.core()?.flush(side, ctx)
    }
}

/// Build the (left, right) operator pair of a join on `epoch_field`.
///
/// Each extractor maps a record to `(key fields, value fields)`. A match emits
/// `key fields + {epoch_field: E} + arriving values + parked values`, earlier
/// parts winning on a name collision.
pub fn join(
    epoch_field: impl Into<String>,
    left: impl Fn(&Record) -> Result<(GroupKey, Record)> + 'static,
    right: impl Fn(&Record) -> Result<(GroupKey, Record)> + 'static,
    next: BoxedOperator,
) -> (JoinSide, JoinSide) {
    let core = Rc::new(RefCell::new(JoinCore {
        epoch_field: epoch_field.into(),
        extractors: [Box::new(left), Box::new(right)],
        pending: [PendingTable::default(), PendingTable::default()],
        cursors: [0, 0],
        next,
        stats: JoinStats::default(),
    }));
    (
        JoinSide {
            side: Side::Left,
            core: Rc::clone(&core),
        },
        JoinSide {
            side: Side::Right,
            core,
        },
    )
}
