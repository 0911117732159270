//! Persistence of trained genomes.
//!
//! A checkpoint is one genome plus everything needed to run it again: the network layout
//! and shape it was trained for, its last fitness and a timestamp. Three slots exist:
//!
//! | Slot                        | File           | Written by                           |
//! |-----------------------------|----------------|--------------------------------------|
//! | [`CheckpointSlot::SideA`]   | `side_a.json`  | co-evolution, after training side A |
//! | [`CheckpointSlot::SideB`]   | `side_b.json`  | co-evolution, after training side B |
//! | [`CheckpointSlot::Best`]    | `best.json`    | single-population training, promote  |
//!
//! Writes replace the whole record. [`FileCheckpointStore`] writes to a temporary file
//! next to the target and renames it into place, so a failed write never leaves a
//! truncated checkpoint behind.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use rally_evaluator::{FeedForwardNetwork, NetworkError, NetworkLayout, NetworkShape};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Genome, ScoredGenome};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointSlot {
    #[display("side A")]
    SideA,
    #[display("side B")]
    SideB,
    #[display("best")]
    Best,
}

impl CheckpointSlot {
    pub const ALL: [Self; 3] = [Self::SideA, Self::SideB, Self::Best];

    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::SideA => "side_a.json",
            Self::SideB => "side_b.json",
            Self::Best => "best.json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub saved_at: DateTime<Utc>,
    pub fitness: f32,
    pub layout: NetworkLayout,
    pub shape: NetworkShape,
    pub genome: Genome,
}

impl Checkpoint {
    #[must_use]
    pub fn new(scored: ScoredGenome, layout: NetworkLayout, shape: NetworkShape) -> Self {
        Self {
            saved_at: Utc::now(),
            fitness: scored.fitness,
            layout,
            shape,
            genome: scored.genome,
        }
    }

    /// Realizes the stored genome, checking it against the stored layout.
    pub fn network(&self) -> Result<FeedForwardNetwork, NetworkError> {
        let network = self.genome.network(self.shape)?;
        self.layout.check(&network)?;
        Ok(network)
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum CheckpointLoadError {
    #[display("no {slot} checkpoint")]
    Missing { slot: CheckpointSlot },
    #[display("failed to read {slot} checkpoint")]
    Io {
        slot: CheckpointSlot,
        source: io::Error,
    },
    #[display("{slot} checkpoint is corrupt")]
    Corrupt {
        slot: CheckpointSlot,
        source: serde_json::Error,
    },
    #[display("{slot} checkpoint holds an unusable network")]
    Invalid {
        slot: CheckpointSlot,
        source: NetworkError,
    },
}

impl CheckpointLoadError {
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum CheckpointSaveError {
    #[display("failed to write {slot} checkpoint")]
    Io {
        slot: CheckpointSlot,
        source: io::Error,
    },
    #[display("failed to encode {slot} checkpoint")]
    Encode {
        slot: CheckpointSlot,
        source: serde_json::Error,
    },
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum CheckpointError {
    #[display("checkpoint load failed")]
    Load(CheckpointLoadError),
    #[display("checkpoint save failed")]
    Save(CheckpointSaveError),
}

/// Where checkpoints live.
pub trait CheckpointStore {
    /// Loads and validates the checkpoint in `slot`.
    fn load(&self, slot: CheckpointSlot) -> Result<Checkpoint, CheckpointLoadError>;

    /// Replaces the checkpoint in `slot`.
    fn save(
        &mut self,
        slot: CheckpointSlot,
        checkpoint: &Checkpoint,
    ) -> Result<(), CheckpointSaveError>;

    fn exists(&self, slot: CheckpointSlot) -> bool;

    /// Copies the checkpoint in `from` over the one in `to`.
    fn clone_slot(&mut self, from: CheckpointSlot, to: CheckpointSlot) -> Result<(), CheckpointError> {
        let checkpoint = self.load(from)?;
        self.save(to, &checkpoint)?;
        Ok(())
    }
}

/// JSON files in one directory.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// The directory is created on the first save.
    pub fn new<P>(dir: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path(&self, slot: CheckpointSlot) -> PathBuf {
        self.dir.join(slot.file_name())
    }

    fn write(&self, slot: CheckpointSlot, checkpoint: &Checkpoint) -> Result<(), CheckpointSaveError> {
        let io_err = |source| CheckpointSaveError::Io { slot, source };

        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let path = self.path(slot);
        let tmp = path.with_extension("json.tmp");
        let file = File::create(&tmp).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, checkpoint)
            .map_err(|source| CheckpointSaveError::Encode { slot, source })?;
        writeln!(writer).map_err(io_err)?;
        let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
        file.sync_all().map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self, slot: CheckpointSlot) -> Result<Checkpoint, CheckpointLoadError> {
        let path = self.path(slot);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CheckpointLoadError::Missing { slot });
            }
            Err(source) => return Err(CheckpointLoadError::Io { slot, source }),
        };
        let checkpoint: Checkpoint = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| CheckpointLoadError::Corrupt { slot, source })?;
        checkpoint
            .network()
            .map_err(|source| CheckpointLoadError::Invalid { slot, source })?;
        Ok(checkpoint)
    }

    fn save(
        &mut self,
        slot: CheckpointSlot,
        checkpoint: &Checkpoint,
    ) -> Result<(), CheckpointSaveError> {
        let result = self.write(slot, checkpoint);
        if result.is_err() {
            let tmp = self.path(slot).with_extension("json.tmp");
            if let Err(e) = discard_temp(&tmp) {
                warn!(path = %tmp.display(), error = %e, "failed to remove temporary checkpoint");
            }
        }
        result
    }

    fn exists(&self, slot: CheckpointSlot) -> bool {
        self.path(slot).is_file()
    }
}

/// Removes a leftover temporary file; a file that was never created is not an error.
fn discard_temp(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// What happened to a [`MemoryCheckpointStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Saved(CheckpointSlot),
    Cloned {
        from: CheckpointSlot,
        to: CheckpointSlot,
    },
}

/// In-memory store that records every write, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    slots: BTreeMap<CheckpointSlot, Checkpoint>,
    events: Vec<StoreEvent>,
    failing: Option<CheckpointSlot>,
}

impl MemoryCheckpointStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every save to `slot` fail with an I/O error.
    #[must_use]
    pub fn fail_saves_to(mut self, slot: CheckpointSlot) -> Self {
        self.failing = Some(slot);
        self
    }

    /// Stores `checkpoint` without recording an event.
    pub fn insert(&mut self, slot: CheckpointSlot, checkpoint: Checkpoint) {
        self.slots.insert(slot, checkpoint);
    }

    #[must_use]
    pub fn get(&self, slot: CheckpointSlot) -> Option<&Checkpoint> {
        self.slots.get(&slot)
    }

    #[must_use]
    pub fn events(&self) -> &[StoreEvent] {
        &self.events
    }

    /// Slots saved to, in order, excluding clones.
    #[must_use]
    pub fn saved_slots(&self) -> Vec<CheckpointSlot> {
        self.events
            .iter()
            .filter_map(|e| match e {
                StoreEvent::Saved(slot) => Some(*slot),
                StoreEvent::Cloned { .. } => None,
            })
            .collect()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self, slot: CheckpointSlot) -> Result<Checkpoint, CheckpointLoadError> {
        let checkpoint = self
            .slots
            .get(&slot)
            .cloned()
            .ok_or(CheckpointLoadError::Missing { slot })?;
        checkpoint
            .network()
            .map_err(|source| CheckpointLoadError::Invalid { slot, source })?;
        Ok(checkpoint)
    }

    fn save(
        &mut self,
        slot: CheckpointSlot,
        checkpoint: &Checkpoint,
    ) -> Result<(), CheckpointSaveError> {
        if self.failing == Some(slot) {
            return Err(CheckpointSaveError::Io {
                slot,
                source: io::Error::other("save disabled"),
            });
        }
        self.slots.insert(slot, checkpoint.clone());
        self.events.push(StoreEvent::Saved(slot));
        Ok(())
    }

    fn exists(&self, slot: CheckpointSlot) -> bool {
        self.slots.contains_key(&slot)
    }

    fn clone_slot(&mut self, from: CheckpointSlot, to: CheckpointSlot) -> Result<(), CheckpointError> {
        let checkpoint = self.load(from)?;
        self.slots.insert(to, checkpoint);
        self.events.push(StoreEvent::Cloned { from, to });
        Ok(())
    }
}
