//! Synthetic validator/epoch data
//!
//! Two generators:
//! - [`generate_items`]: random validator indices with a run of consecutive
//!   epochs each, printed as a JavaScript literal for ad-hoc visualization.
//!   Indices may repeat, so the output is *not* a dense grid.
//! - [`DenseRecords`]: validators `0..N` x a run of epochs, suitable for
//!   seeding a database the exporter accepts.

use crate::config::SeedConfig;
use crate::db::{create_order_index, create_table, insert_batched, schema};
use crate::error::{ConfigError, DbError, Result};
use crate::types::{ValidatorEpochRecord, MAX_DISTANCE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::Connection;
use std::io::Write;
use std::ops::RangeInclusive;
use tracing::info;

/// Default number of validator iterations
pub const DEFAULT_VALIDATORS: u64 = 1000;

/// Default number of consecutive epochs per validator
pub const DEFAULT_EPOCHS: u64 = 10;

/// Range random validator indices are drawn from
pub const VALIDATOR_IDX_RANGE: RangeInclusive<i64> = 0..=1_243_500;

/// Range the first epoch is drawn from
pub const START_EPOCH_RANGE: RangeInclusive<i64> = 12_341..=512_555;

/// Upper bound for consecutive epochs per validator
pub const MAX_EPOCHS: u64 = 1_000_000;

/// Upper bound for validators x epochs in one run
pub const MAX_ROWS: u64 = 100_000_000;

/// Parameters shared by both generators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticConfig {
    pub validators: u64,
    pub epochs: u64,
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            validators: DEFAULT_VALIDATORS,
            epochs: DEFAULT_EPOCHS,
            seed: None,
        }
    }
}

impl SyntheticConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.epochs == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "epochs",
                value: self.epochs,
                reason: "must be at least 1".to_string(),
            });
        }
        if self.epochs > MAX_EPOCHS {
            return Err(ConfigError::InvalidParameter {
                name: "epochs",
                value: self.epochs,
                reason: format!("must be at most {}", MAX_EPOCHS),
            });
        }
        match self.validators.checked_mul(self.epochs) {
            Some(rows) if rows <= MAX_ROWS => Ok(()),
            _ => Err(ConfigError::InvalidParameter {
                name: "validators",
                value: self.validators,
                reason: format!("validators x {} epochs exceeds {} rows", self.epochs, MAX_ROWS),
            }),
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

fn random_distance(rng: &mut StdRng) -> i64 {
    rng.random_range(0..=MAX_DISTANCE)
}

/// Random validators, each with `epochs` consecutive epochs from one shared start
pub fn generate_items(config: &SyntheticConfig) -> RandomItems {
    RandomItems::new(config)
}

/// Write records as `var items = [ ... ]`, one object per line
pub fn write_items_js<W, I>(mut out: W, records: I) -> std::io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = ValidatorEpochRecord>,
{
    writeln!(out, "var items = [")?;
    for r in records {
        writeln!(
            out,
            r#"{{"validator_idx": {}, "epoch": {}, "distance": {}}},"#,
            r.validator_idx, r.epoch, r.distance
        )?;
    }
    writeln!(out, "]")?;
    out.flush()
}

/// Lazily drawn random items; see [`generate_items`]
pub struct RandomItems {
    rng: StdRng,
    validators_left: u64,
    epochs: u64,
    start_epoch: i64,
    validator_idx: i64,
    // Position inside the current validator's run; `epochs` means a new draw
    offset: u64,
}

impl RandomItems {
    pub fn new(config: &SyntheticConfig) -> Self {
        let mut rng = config.rng();
        let start_epoch = rng.random_range(START_EPOCH_RANGE);
        Self {
            rng,
            validators_left: config.validators,
            epochs: config.epochs,
            start_epoch,
            validator_idx: 0,
            offset: config.epochs,
        }
    }

    /// First epoch of every run
    pub fn start_epoch(&self) -> i64 {
        self.start_epoch
    }
}

impl Iterator for RandomItems {
    type Item = ValidatorEpochRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.epochs == 0 {
            return None;
        }
        if self.offset == self.epochs {
            if self.validators_left == 0 {
                return None;
            }
            self.validators_left -= 1;
            self.validator_idx = self.rng.random_range(VALIDATOR_IDX_RANGE);
            self.offset = 0;
        }

        let epoch = self.start_epoch.checked_add(i64::try_from(self.offset).ok()?)?;
        self.offset += 1;

        let distance = random_distance(&mut self.rng);
        Some(ValidatorEpochRecord::new(self.validator_idx, epoch, distance))
    }
}

/// Dense validator x epoch grid with random distances
pub struct DenseRecords {
    rng: StdRng,
    validators: u64,
    epochs: u64,
    start_epoch: i64,
    next: u64,
}

impl DenseRecords {
    pub fn new(config: &SyntheticConfig) -> Self {
        let mut rng = config.rng();
        let start_epoch = rng.random_range(START_EPOCH_RANGE);
        Self {
            rng,
            validators: config.validators,
            epochs: config.epochs,
            start_epoch,
            next: 0,
        }
    }

    /// First epoch of the run
    pub fn start_epoch(&self) -> i64 {
        self.start_epoch
    }

    fn total(&self) -> u64 {
        self.validators.saturating_mul(self.epochs)
    }
}

impl Iterator for DenseRecords {
    type Item = ValidatorEpochRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.epochs == 0 || self.next >= self.total() {
            return None;
        }
        let validator_idx = i64::try_from(self.next / self.epochs).ok()?;
        let offset = i64::try_from(self.next % self.epochs).ok()?;
        let epoch = self.start_epoch.checked_add(offset)?;
        self.next += 1;

        let distance = random_distance(&mut self.rng);
        Some(ValidatorEpochRecord::new(validator_idx, epoch, distance))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.total() - self.next.min(self.total())).ok();
        (remaining.unwrap_or(usize::MAX), remaining)
    }
}

/// Create the table (if needed) and fill it with a dense synthetic grid
pub fn seed_database(config: &SeedConfig) -> Result<u64> {
    config.validate()?;

    let mut conn = Connection::open(&config.db_path).map_err(|e| DbError::OpenFailed {
        path: config.db_path.clone(),
        reason: e.to_string(),
    })?;
    schema::optimize_for_writes(&conn)?;
    create_table(&conn, &config.table)?;

    let records = DenseRecords::new(&config.synthetic);
    info!(
        validators = config.synthetic.validators,
        epochs = config.synthetic.epochs,
        start_epoch = records.start_epoch(),
        "Seeding {}",
        config.db_path.display()
    );

    let written = insert_batched(&mut conn, &config.table, records, config.batch_size)?;
    create_order_index(&conn, &config.table)?;

    info!(rows = written, "Seed complete");
    Ok(written)
}
