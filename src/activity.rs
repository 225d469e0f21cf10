//! Per-epoch validator activity built from observed blocks
//!
//! Every attestation included in a block tells us, for each member of the
//! attesting committee, whether it voted and how many slots late the vote
//! landed (the inclusion distance). The tracker keeps the best distance per
//! validator and epoch, marks validators that were slow or missing as
//! interesting, and finally dumps those validators into the
//! `validator_state` table for the epochs it saw from start to end.
//!
//! ```text
//! epoch 123123 -> { validator 1: 12, validator 2: 14, validator 132: 65535 }
//! epoch 123124 -> { validator 6: 48, validator 8: 23, ... }
//! ```

use crate::db::{create_table, insert_batched};
use crate::error::DbResult;
use crate::types::ValidatorEpochRecord;
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use tracing::{debug, info};

/// Slots in one epoch
pub const SLOTS_PER_EPOCH: u64 = 32;

/// Distance stored for a validator that did not attest in an epoch
pub const VALIDATOR_MISSING_MAGIC: i64 = 65535;

/// Rows per insert transaction when dumping
const DUMP_BATCH_SIZE: usize = 10_000;

/// Epoch containing `slot`
pub fn compute_epoch_at_slot(slot: u64) -> u64 {
    slot / SLOTS_PER_EPOCH
}

/// First slot of `epoch`
pub fn compute_start_slot_at_epoch(epoch: u64) -> u64 {
    epoch.saturating_mul(SLOTS_PER_EPOCH)
}

/// Position of `slot` inside its epoch (0..32)
pub fn slot_index_within_epoch(slot: u64) -> u64 {
    slot - compute_start_slot_at_epoch(compute_epoch_at_slot(slot))
}

/// First epoch that starts at or after `slot`.
///
/// Slot 17 of epoch 7 gives 8; slot 0 of epoch 9 gives 9.
pub fn first_epoch_after_slot(slot: u64) -> u64 {
    let epoch = compute_epoch_at_slot(slot);
    if slot_index_within_epoch(slot) == 0 {
        epoch
    } else {
        epoch + 1
    }
}

/// The epoch before the one containing `slot`, or `None` inside epoch 0
pub fn last_epoch_before_slot(slot: u64) -> Option<u64> {
    compute_epoch_at_slot(slot).checked_sub(1)
}

/// Inclusion distances per epoch and validator
#[derive(Debug, Default, Clone)]
pub struct ActivityTracker {
    activity: BTreeMap<u64, BTreeMap<u64, i64>>,
    interesting: BTreeSet<u64>,
    first_slot_seen: Option<u64>,
    last_slot_seen: Option<u64>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one validator's vote (or missing vote) for `attestation_slot`,
    /// learned from the block at `block_slot`.
    ///
    /// A present vote keeps the smallest distance seen for the epoch and
    /// replaces a missing marker. A missing vote only fills an empty slot.
    pub fn register_presence(
        &mut self,
        validator: u64,
        attestation_slot: u64,
        block_slot: u64,
        present: bool,
    ) {
        let epoch = compute_epoch_at_slot(attestation_slot);
        let validators = self.activity.entry(epoch).or_default();
        let existing = validators.get(&validator).copied();

        if !present {
            if existing.is_none() {
                validators.insert(validator, VALIDATOR_MISSING_MAGIC);
                self.interesting.insert(validator);
            }
            return;
        }

        let distance = i64::try_from(block_slot.saturating_sub(attestation_slot))
            .unwrap_or(VALIDATOR_MISSING_MAGIC);
        if matches!(existing, Some(prev) if distance >= prev) {
            return;
        }
        validators.insert(validator, distance);

        if distance > 1 {
            self.interesting.insert(validator);
        } else if distance == 1 {
            // An on-time vote clears the flag, even one raised in another epoch
            self.interesting.remove(&validator);
        }
    }

    /// Register every member of `committee` from an attestation's aggregation
    /// bits. Members past the end of `aggregation_bits` count as missing.
    pub fn register_committee(
        &mut self,
        committee: &[u64],
        aggregation_bits: &[bool],
        attestation_slot: u64,
        block_slot: u64,
    ) {
        for (i, &validator) in committee.iter().enumerate() {
            let present = aggregation_bits.get(i).copied().unwrap_or(false);
            self.register_presence(validator, attestation_slot, block_slot, present);
        }
    }

    /// Note that a block at `slot` was processed
    pub fn register_new_block(&mut self, slot: u64) {
        self.first_slot_seen.get_or_insert(slot);
        self.last_slot_seen = Some(slot);
    }

    /// Distance recorded for `validator` in `epoch`
    pub fn distance(&self, validator: u64, epoch: u64) -> Option<i64> {
        self.activity.get(&epoch)?.get(&validator).copied()
    }

    pub fn is_interesting(&self, validator: u64) -> bool {
        self.interesting.contains(&validator)
    }

    pub fn interesting_count(&self) -> usize {
        self.interesting.len()
    }

    pub fn first_slot_seen(&self) -> Option<u64> {
        self.first_slot_seen
    }

    pub fn last_slot_seen(&self) -> Option<u64> {
        self.last_slot_seen
    }

    /// Epochs whose first and last slot both fall inside the blocks seen
    pub fn fully_seen_epochs(&self) -> Range<u64> {
        let (Some(first), Some(last)) = (self.first_slot_seen, self.last_slot_seen) else {
            return 0..0;
        };
        let start = first_epoch_after_slot(first);
        match last_epoch_before_slot(last) {
            Some(end) if end >= start => start..end + 1,
            _ => start..start,
        }
    }

    /// Rows for interesting validators in fully seen epochs, ordered by
    /// epoch then validator
    pub fn records_to_dump(&self) -> Vec<ValidatorEpochRecord> {
        self.fully_seen_epochs()
            .filter_map(|epoch| Some((epoch, self.activity.get(&epoch)?)))
            .flat_map(|(epoch, validators)| {
                validators
                    .iter()
                    .filter(move |(validator, _)| self.interesting.contains(*validator))
                    .filter_map(move |(&validator, &distance)| {
                        Some(ValidatorEpochRecord::new(
                            i64::try_from(validator).ok()?,
                            i64::try_from(epoch).ok()?,
                            distance,
                        ))
                    })
            })
            .collect()
    }

    /// Write [`Self::records_to_dump`] into `table`, creating it if needed
    pub fn dump(&self, conn: &mut Connection, table: &str) -> DbResult<u64> {
        let epochs = self.fully_seen_epochs();
        info!(
            validators = self.interesting_count(),
            epochs = epochs.end - epochs.start,
            "Dumping interesting validators over fully seen epochs {:?}",
            epochs
        );

        create_table(conn, table)?;
        let records = self.records_to_dump();
        let written = insert_batched(conn, table, records, DUMP_BATCH_SIZE)?;

        debug!(rows = written, "Activity dump complete");
        Ok(written)
    }
}
