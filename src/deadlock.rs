//! Deadlock lookahead for candidate destinations.
//!
//! Each authored destination (block and direction) lists the alternative
//! places ("threats") that a conflicting train could still be sent to once
//! the destination is occupied. If every one of them is already taken or
//! unusable for the train, sending the train to the destination can close a
//! circular wait, and the destination is reported unsafe.

use crate::blocks::BlockStore;
use crate::error::{Error, Result};
use crate::record::RecordStore;
use crate::track::*;
use log::*;
use std::collections::HashMap;

pub const MAX_THREATS: usize = 8;

/// Direction in which a threat block counts as taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approach {
    East,
    West,
    /// Taken whichever way the holder is heading.
    Either,
}

impl Approach {
    pub fn matches(self, direction: Direction) -> bool {
        match self {
            Approach::Either => true,
            Approach::East => direction == Direction::East,
            Approach::West => direction == Direction::West,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreatEntry {
    pub block: BlockId,
    pub approach: Approach,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlockRecord {
    pub destination: (BlockId, Direction),
    pub threats: Vec<ThreatEntry>,
}

#[derive(Debug, Default)]
pub struct DeadlockTable {
    records: HashMap<(BlockId, Direction), Vec<ThreatEntry>>,
}

impl DeadlockTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&mut self, record: DeadlockRecord) -> Result<()> {
        let (block, direction) = record.destination;
        if record.threats.len() > MAX_THREATS {
            return Err(Error::Layout(format!(
                "destination {} {:?} lists {} threats, at most {} allowed",
                block,
                direction,
                record.threats.len(),
                MAX_THREATS
            )));
        }
        if self.records.contains_key(&record.destination) {
            return Err(Error::Layout(format!(
                "destination {} {:?} has more than one threat list",
                block, direction
            )));
        }
        self.records.insert(record.destination, record.threats);
        Ok(())
    }

    pub fn threats(&self, destination: (BlockId, Direction)) -> Option<&[ThreatEntry]> {
        self.records.get(&destination).map(|t| t.as_slice())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreatState {
    /// Free and usable by the requesting train.
    Open,
    /// Held by someone else in the threatening direction.
    Taken(Owner),
    /// Too short for the train, or closed to its type.
    Ineligible,
}

impl ThreatState {
    pub fn is_neutralized(self) -> bool {
        self != ThreatState::Open
    }
}

pub struct DeadlockAnalyzer<'a> {
    table: &'a DeadlockTable,
}

impl<'a> DeadlockAnalyzer<'a> {
    pub fn new(table: &'a DeadlockTable) -> Self {
        DeadlockAnalyzer { table }
    }

    pub fn assess<S: RecordStore>(
        &self,
        threat: ThreatEntry,
        train: &TrainProfile,
        blocks: &BlockStore<S>,
    ) -> Result<ThreatState> {
        let record = blocks.record(threat.block)?;
        if let Some(owner) = record.owner {
            // Static equipment never moves, so its heading is irrelevant.
            let taken = owner != train.owner()
                && (owner == Owner::Static || threat.approach.matches(record.direction));
            if taken {
                return Ok(ThreatState::Taken(owner));
            }
        }
        if !train.fits(&record.attrs) {
            return Ok(ThreatState::Ineligible);
        }
        Ok(ThreatState::Open)
    }

    /// True when every threat listed for `destination` is neutralized for
    /// `train`. Destinations without a threat list, or with an empty one,
    /// are never unsafe.
    pub fn is_unsafe<S: RecordStore>(
        &self,
        destination: (BlockId, Direction),
        train: &TrainProfile,
        blocks: &BlockStore<S>,
    ) -> Result<bool> {
        let threats = match self.table.threats(destination) {
            Some(t) if !t.is_empty() => t,
            _ => return Ok(false),
        };
        for threat in threats {
            let state = self.assess(*threat, train, blocks)?;
            trace!(
                "Threat {} {:?} to destination {:?} for train {}: {:?}",
                threat.block,
                threat.approach,
                destination,
                train.id,
                state
            );
            if !state.is_neutralized() {
                return Ok(false);
            }
        }
        debug!(
            "Destination {} {:?} is a deadlock trap for train {}",
            destination.0, destination.1, train.id
        );
        Ok(true)
    }
}
