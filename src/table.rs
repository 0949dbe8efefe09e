use crate::codec::{DecodeError, Record};
use crate::error::{Error, InvariantViolation, Result, StorageError};
use crate::record::RecordStore;
use log::*;
use std::cell::RefCell;
use std::ops::RangeInclusive;

/// A table of fixed-size records, one per 1-based id, with a single decoded
/// record held in memory.
///
/// The cache slot stores the id together with the record, so a lookup for
/// any other id cannot be answered from it. Writes update the slot before
/// persisting and clear it if persisting fails.
pub struct RecordTable<S, R> {
    store: S,
    count: u16,
    cache: RefCell<Option<(u16, R)>>,
}

impl<S: RecordStore, R: Record> RecordTable<S, R> {
    /// Writes a fresh table holding `records` for ids `1..=records.len()`.
    pub fn provision(store: S, records: &[R]) -> Result<Self> {
        if records.len() > u16::MAX as usize {
            return Err(Error::Layout(format!(
                "{} {} records do not fit 16-bit ids",
                records.len(),
                R::KIND
            )));
        }
        let mut table = Self::open(store, records.len() as u16)?;
        for (idx, record) in records.iter().enumerate() {
            table.put(idx as u16 + 1, *record)?;
        }
        table.cache.replace(None);
        debug!("Provisioned {} {} records", table.count, R::KIND);
        Ok(table)
    }

    /// Attaches to a store already holding `count` records.
    pub fn open(store: S, count: u16) -> Result<Self> {
        let len = count as usize * R::LEN;
        if len > store.capacity() {
            return Err(StorageError::OutOfBounds {
                offset: 0,
                len,
                capacity: store.capacity(),
            }
            .into());
        }
        Ok(RecordTable {
            store,
            count,
            cache: RefCell::new(None),
        })
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn ids(&self) -> RangeInclusive<u16> {
        1..=self.count
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn offset(&self, id: u16) -> Result<usize> {
        if id == 0 || id > self.count {
            return Err(InvariantViolation::OutOfRange {
                kind: R::KIND,
                id,
                count: self.count,
            }
            .into());
        }
        Ok((id as usize - 1) * R::LEN)
    }

    pub fn get(&self, id: u16) -> Result<R> {
        let offset = self.offset(id)?;
        if let Some((cached_id, record)) = *self.cache.borrow() {
            if cached_id == id {
                return Ok(record);
            }
        }

        trace!("Loading {} {} record", R::KIND, id);
        let mut buf = vec![0u8; R::LEN];
        self.store.read(offset, &mut buf)?;
        let record = R::decode(&buf).map_err(|e| match e {
            DecodeError::Version(version) => InvariantViolation::UnsupportedVersion {
                kind: R::KIND,
                id,
                version,
            },
            DecodeError::Field { field, value } => InvariantViolation::MalformedRecord {
                kind: R::KIND,
                id,
                field,
                value,
            },
        })?;
        self.cache.replace(Some((id, record)));
        Ok(record)
    }

    pub fn put(&mut self, id: u16, record: R) -> Result<()> {
        let offset = self.offset(id)?;
        let mut buf = vec![0u8; R::LEN];
        record.encode(&mut buf);
        self.cache.replace(Some((id, record)));
        if let Err(e) = self.store.write(offset, &buf) {
            self.cache.replace(None);
            return Err(e.into());
        }
        Ok(())
    }
}
