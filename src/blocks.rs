//! Block reservation store.
//!
//! Each block has one record holding its authored attributes and its single
//! mutable reservation (owner and direction). A block's direction is always
//! East or West; release resets it to the default of West.

use crate::codec::{BlockRecord, BLOCK_RECORD_LEN};
use crate::error::{InvariantViolation, Result};
use crate::record::{FileStore, RecordStore};
use crate::table::RecordTable;
use crate::track::*;
use log::*;
use std::path::Path;

pub struct BlockStore<S> {
    table: RecordTable<S, BlockRecord>,
}

fn check_owner(owner: Owner) -> Result<()> {
    match owner {
        Owner::Train(t) if t == 0 || t > MAX_TRAIN_ID => Err(InvariantViolation::InvalidTrain(t).into()),
        _ => Ok(()),
    }
}

impl<S: RecordStore> BlockStore<S> {
    /// Writes unreserved records for blocks `1..=attrs.len()`.
    pub fn provision(store: S, attrs: &[BlockAttributes]) -> Result<Self> {
        let records = attrs
            .iter()
            .copied()
            .map(BlockRecord::unreserved)
            .collect::<Vec<_>>();
        Ok(BlockStore {
            table: RecordTable::provision(store, &records)?,
        })
    }

    pub fn open(store: S, count: u16) -> Result<Self> {
        Ok(BlockStore {
            table: RecordTable::open(store, count)?,
        })
    }

    pub fn count(&self) -> u16 {
        self.table.count()
    }

    pub fn store(&self) -> &S {
        self.table.store()
    }

    pub fn record(&self, block: BlockId) -> Result<BlockRecord> {
        self.table.get(block)
    }

    /// Reserves `block` for `owner`. Reserving a block already held by the
    /// same owner only updates the direction.
    pub fn reserve(&mut self, block: BlockId, direction: Direction, owner: Owner) -> Result<()> {
        check_owner(owner)?;
        let mut record = self.table.get(block)?;
        match record.owner {
            Some(current) if current != owner => {
                return Err(InvariantViolation::AlreadyReserved {
                    kind: "block",
                    id: block,
                    owner: current,
                    requested: owner,
                }
                .into());
            }
            _ => {}
        }
        record.owner = Some(owner);
        record.direction = direction;
        self.table.put(block, record)?;
        debug!("Block {} reserved {:?} for {}", block, direction, owner);
        Ok(())
    }

    pub fn release(&mut self, block: BlockId) -> Result<()> {
        let mut record = self.table.get(block)?;
        if record.owner.is_none() && record.direction == Direction::default() {
            return Ok(());
        }
        record.owner = None;
        record.direction = Direction::default();
        self.table.put(block, record)?;
        debug!("Block {} released", block);
        Ok(())
    }

    pub fn release_all(&mut self) -> Result<()> {
        for block in self.table.ids() {
            self.release(block)?;
        }
        info!("Released all {} blocks", self.count());
        Ok(())
    }

    /// Blocks currently held by trains, in block order. Read by registration
    /// as default train locations before a session reset.
    pub fn train_locations(&self) -> Result<Vec<(BlockId, TrainId, Direction)>> {
        let mut locations = Vec::new();
        for block in self.table.ids() {
            let record = self.table.get(block)?;
            if let Some(Owner::Train(t)) = record.owner {
                locations.push((block, t, record.direction));
            }
        }
        Ok(locations)
    }

    pub fn owner(&self, block: BlockId) -> Result<Option<Owner>> {
        Ok(self.record(block)?.owner)
    }

    pub fn direction(&self, block: BlockId) -> Result<Direction> {
        Ok(self.record(block)?.direction)
    }

    pub fn attributes(&self, block: BlockId) -> Result<BlockAttributes> {
        Ok(self.record(block)?.attrs)
    }

    /// West and east boundary sensors.
    pub fn sensors(&self, block: BlockId) -> Result<(SensorId, SensorId)> {
        let a = self.attributes(block)?;
        Ok((a.west_sensor, a.east_sensor))
    }

    pub fn default_speed(&self, block: BlockId, direction: Direction) -> Result<u8> {
        let a = self.attributes(block)?;
        Ok(match direction {
            Direction::West => a.westbound_speed,
            Direction::East => a.eastbound_speed,
        })
    }

    pub fn length(&self, block: BlockId) -> Result<u16> {
        Ok(self.attributes(block)?.length)
    }

    pub fn siding(&self, block: BlockId) -> Result<SidingKind> {
        Ok(self.attributes(block)?.siding)
    }

    pub fn is_parking(&self, block: BlockId) -> Result<bool> {
        Ok(self.attributes(block)?.parking)
    }

    pub fn station(&self, block: BlockId) -> Result<StationRestriction> {
        Ok(self.attributes(block)?.station)
    }

    pub fn forbidden(&self, block: BlockId) -> Result<ForbiddenType> {
        Ok(self.attributes(block)?.forbidden)
    }

    pub fn is_tunnel(&self, block: BlockId) -> Result<bool> {
        Ok(self.attributes(block)?.tunnel)
    }

    pub fn grade(&self, block: BlockId) -> Result<Grade> {
        Ok(self.attributes(block)?.grade)
    }
}

impl BlockStore<FileStore> {
    /// Attaches to the block file at `path`. A file that is new, or sized for
    /// a different number of blocks, is provisioned from `attrs`.
    pub fn attach_file(path: &Path, attrs: &[BlockAttributes]) -> Result<Self> {
        let store = FileStore::open(path, attrs.len() * BLOCK_RECORD_LEN)?;
        if store.is_fresh() {
            info!("Provisioning {} block records in {}", attrs.len(), path.display());
            Self::provision(store, attrs)
        } else {
            Self::open(store, attrs.len() as u16)
        }
    }
}
