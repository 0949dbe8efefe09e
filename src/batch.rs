//! All-or-nothing reservation of a route's turnouts and blocks.

use crate::blocks::BlockStore;
use crate::error::Result;
use crate::record::RecordStore;
use crate::route::Route;
use crate::track::*;
use crate::turnouts::TurnoutStore;
use log::*;

/// Resources a commit took that the owner did not already hold.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Taken {
    pub turnouts: Vec<TurnoutId>,
    pub blocks: Vec<BlockId>,
}

impl Taken {
    pub fn is_empty(&self) -> bool {
        self.turnouts.is_empty() && self.blocks.is_empty()
    }
}

/// Reserves every turnout and every path block of `route` for `owner`. If
/// any single reservation fails, everything this call took is released
/// again before the error is returned; resources the owner already held
/// are left alone either way.
pub fn reserve_route<B: RecordStore, T: RecordStore>(
    blocks: &mut BlockStore<B>,
    turnouts: &mut TurnoutStore<T>,
    route: &Route,
    owner: Owner,
) -> Result<Taken> {
    let mut taken = Taken::default();
    match take_all(blocks, turnouts, route, owner, &mut taken) {
        Ok(()) => Ok(taken),
        Err(e) => {
            error!(
                "Reserving route {} for {} failed ({}), rolling back {} turnouts and {} blocks",
                route.key(),
                owner,
                e,
                taken.turnouts.len(),
                taken.blocks.len()
            );
            release_taken(blocks, turnouts, &taken);
            Err(e)
        }
    }
}

fn take_all<B: RecordStore, T: RecordStore>(
    blocks: &mut BlockStore<B>,
    turnouts: &mut TurnoutStore<T>,
    route: &Route,
    owner: Owner,
    taken: &mut Taken,
) -> Result<()> {
    for (turnout, _) in route.turnouts() {
        if turnouts.owner(turnout)? == Some(owner) {
            continue;
        }
        turnouts.reserve(turnout, owner)?;
        taken.turnouts.push(turnout);
    }
    for (block, direction) in route.path_blocks() {
        if blocks.owner(block)? == Some(owner) {
            continue;
        }
        blocks.reserve(block, direction, owner)?;
        taken.blocks.push(block);
    }
    Ok(())
}

/// Releases resources in reverse order of taking. Failures are logged and
/// the remaining resources are still released.
pub fn release_taken<B: RecordStore, T: RecordStore>(
    blocks: &mut BlockStore<B>,
    turnouts: &mut TurnoutStore<T>,
    taken: &Taken,
) {
    for block in taken.blocks.iter().rev() {
        if let Err(e) = blocks.release(*block) {
            error!("Rollback could not release block {}: {}", block, e);
        }
    }
    for turnout in taken.turnouts.iter().rev() {
        if let Err(e) = turnouts.release(*turnout) {
            error!("Rollback could not release turnout {}: {}", turnout, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::testing::FailingStore;
    use crate::record::MemoryStore;
    use crate::route::{RouteElement::*, RouteKey};

    fn route() -> Route {
        Route::new(
            RouteKey { group: Direction::East, record: 1 },
            vec![
                BlockEast(1),
                TurnoutReverse(1),
                BlockEast(2),
                TurnoutNormal(2),
                BlockEast(3),
            ],
        )
        .unwrap()
    }

    fn stores<B: RecordStore, T: RecordStore>(b: B, t: T) -> (BlockStore<B>, TurnoutStore<T>) {
        let attrs = vec![BlockAttributes::default(); 3];
        (
            BlockStore::provision(b, &attrs).unwrap(),
            TurnoutStore::provision(t, 2).unwrap(),
        )
    }

    #[test]
    fn reserves_path_and_turnouts() {
        let (mut blocks, mut turnouts) = stores(MemoryStore::new(64), MemoryStore::new(16));
        blocks.reserve(1, Direction::East, Owner::Train(4)).unwrap();
        turnouts.reserve(2, Owner::Train(4)).unwrap();

        let taken = reserve_route(&mut blocks, &mut turnouts, &route(), Owner::Train(4)).unwrap();
        assert_eq!(taken, Taken { turnouts: vec![1], blocks: vec![2, 3] });
        for b in 1..=3 {
            assert_eq!(blocks.owner(b).unwrap(), Some(Owner::Train(4)));
        }
        assert_eq!(blocks.direction(3).unwrap(), Direction::East);
        assert_eq!(turnouts.owner(1).unwrap(), Some(Owner::Train(4)));
    }

    #[test]
    fn conflict_rolls_back_everything_taken() {
        let (mut blocks, mut turnouts) = stores(MemoryStore::new(64), MemoryStore::new(16));
        blocks.reserve(3, Direction::West, Owner::Train(2)).unwrap();
        let before_blocks = blocks.store().bytes().to_vec();
        let before_turnouts = turnouts.store().bytes().to_vec();

        let err = reserve_route(&mut blocks, &mut turnouts, &route(), Owner::Train(1)).unwrap_err();
        assert!(err.is_invariant_violation());
        assert_eq!(blocks.store().bytes(), &before_blocks[..]);
        assert_eq!(turnouts.store().bytes(), &before_turnouts[..]);
        assert_eq!(blocks.owner(3).unwrap(), Some(Owner::Train(2)));
        assert_eq!(blocks.direction(3).unwrap(), Direction::West);
    }

    #[test]
    fn storage_failure_rolls_back() {
        let mut store = FailingStore::new(MemoryStore::new(64));
        // Three provisioning writes, then block 2 succeeds and block 3 fails.
        store.fail_write(4);
        let (mut blocks, mut turnouts) = stores(store, MemoryStore::new(16));

        let err = reserve_route(&mut blocks, &mut turnouts, &route(), Owner::Train(1)).unwrap_err();
        assert!(!err.is_invariant_violation());
        for b in 1..=3 {
            assert_eq!(blocks.owner(b).unwrap(), None);
        }
        for t in 1..=2 {
            assert_eq!(turnouts.owner(t).unwrap(), None);
        }
    }

    #[test]
    fn owner_keeps_resources_it_held_before() {
        let (mut blocks, mut turnouts) = stores(MemoryStore::new(64), MemoryStore::new(16));
        turnouts.reserve(1, Owner::Train(1)).unwrap();
        blocks.reserve(2, Direction::East, Owner::Train(1)).unwrap();
        blocks.reserve(3, Direction::East, Owner::Static).unwrap();

        assert!(reserve_route(&mut blocks, &mut turnouts, &route(), Owner::Train(1)).is_err());
        assert_eq!(turnouts.owner(1).unwrap(), Some(Owner::Train(1)));
        assert_eq!(turnouts.owner(2).unwrap(), None);
        assert_eq!(blocks.owner(2).unwrap(), Some(Owner::Train(1)));
    }
}
