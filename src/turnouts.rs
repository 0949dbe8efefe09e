//! Turnout reservation store. Ownership works like blocks. The last commanded
//! orientation is tracked separately and only matters while a turnout is
//! under manual control; reservations never touch it.

use crate::codec::{TurnoutRecord, TURNOUT_RECORD_LEN};
use crate::error::{InvariantViolation, Result};
use crate::record::{FileStore, RecordStore};
use crate::table::RecordTable;
use crate::track::*;
use log::*;
use std::path::Path;

pub struct TurnoutStore<S> {
    table: RecordTable<S, TurnoutRecord>,
}

impl<S: RecordStore> TurnoutStore<S> {
    pub fn provision(store: S, count: u16) -> Result<Self> {
        let records = vec![TurnoutRecord::default(); count as usize];
        Ok(TurnoutStore {
            table: RecordTable::provision(store, &records)?,
        })
    }

    pub fn open(store: S, count: u16) -> Result<Self> {
        Ok(TurnoutStore {
            table: RecordTable::open(store, count)?,
        })
    }

    pub fn count(&self) -> u16 {
        self.table.count()
    }

    pub fn store(&self) -> &S {
        self.table.store()
    }

    pub fn reserve(&mut self, turnout: TurnoutId, owner: Owner) -> Result<()> {
        if let Owner::Train(t) = owner {
            if t == 0 || t > MAX_TRAIN_ID {
                return Err(InvariantViolation::InvalidTrain(t).into());
            }
        }
        let mut record = self.table.get(turnout)?;
        match record.owner {
            Some(current) if current == owner => return Ok(()),
            Some(current) => {
                return Err(InvariantViolation::AlreadyReserved {
                    kind: "turnout",
                    id: turnout,
                    owner: current,
                    requested: owner,
                }
                .into())
            }
            None => {}
        }
        record.owner = Some(owner);
        self.table.put(turnout, record)?;
        debug!("Turnout {} reserved for {}", turnout, owner);
        Ok(())
    }

    pub fn release(&mut self, turnout: TurnoutId) -> Result<()> {
        let mut record = self.table.get(turnout)?;
        if record.owner.is_none() {
            return Ok(());
        }
        record.owner = None;
        self.table.put(turnout, record)?;
        debug!("Turnout {} released", turnout);
        Ok(())
    }

    pub fn release_all(&mut self) -> Result<()> {
        for turnout in self.table.ids() {
            self.release(turnout)?;
        }
        info!("Released all {} turnouts", self.count());
        Ok(())
    }

    pub fn owner(&self, turnout: TurnoutId) -> Result<Option<Owner>> {
        Ok(self.table.get(turnout)?.owner)
    }

    pub fn set_last_orientation(&mut self, turnout: TurnoutId, orientation: Orientation) -> Result<()> {
        let mut record = self.table.get(turnout)?;
        record.orientation = orientation;
        self.table.put(turnout, record)
    }

    pub fn last_orientation(&self, turnout: TurnoutId) -> Result<Orientation> {
        Ok(self.table.get(turnout)?.orientation)
    }
}

impl TurnoutStore<FileStore> {
    /// Attaches to the turnout file at `path`, provisioning it when it is
    /// new or sized for a different turnout count.
    pub fn attach_file(path: &Path, count: u16) -> Result<Self> {
        let store = FileStore::open(path, count as usize * TURNOUT_RECORD_LEN)?;
        if store.is_fresh() {
            info!("Provisioning {} turnout records in {}", count, path.display());
            Self::provision(store, count)
        } else {
            Self::open(store, count)
        }
    }
}
