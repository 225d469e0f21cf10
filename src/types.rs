//! Record types for the validator_state table
//!
//! The table has a fixed schema. Rows are mapped to a typed struct at the
//! storage boundary and serialized with serde using the column names as
//! JSON keys.

use serde::{Deserialize, Serialize};

/// Upper bound (inclusive) of the distance metric
pub const MAX_DISTANCE: i64 = 64;

/// One row of the validator_state table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidatorEpochRecord {
    /// Validator index
    pub validator_idx: i64,
    /// Epoch number
    pub epoch: i64,
    /// Observed distance at this epoch, in [0, 64]
    pub distance: i64,
}

impl ValidatorEpochRecord {
    pub fn new(validator_idx: i64, epoch: i64, distance: i64) -> Self {
        Self {
            validator_idx,
            epoch,
            distance,
        }
    }

    /// Map a row selected as (validator_idx, epoch, distance)
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            validator_idx: row.get(0)?,
            epoch: row.get(1)?,
            distance: row.get(2)?,
        })
    }

    /// Check the distance is within [0, MAX_DISTANCE]
    pub fn distance_in_range(&self) -> bool {
        (0..=MAX_DISTANCE).contains(&self.distance)
    }
}

/// Columns of the validator_state table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    ValidatorIdx,
    Epoch,
    Distance,
}

impl Column {
    /// SQL column name (also the JSON key)
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::ValidatorIdx => "validator_idx",
            Column::Epoch => "epoch",
            Column::Distance => "distance",
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
