//! Cooperative stand-ins for the train-progress, mode and execution
//! collaborators, used by the command-line driver.
//!
//! Each train occupies exactly one block. A moving train enters the next
//! block of its committed routes on every call to [`Simulation::advance`],
//! releasing the block it left and the turnouts it crossed.

use crate::error::Result;
use crate::layout::Layout;
use crate::record::RecordStore;
use crate::route::Route;
use crate::scheduler::{DecisionKind, ExecutionLayer, ModeController, RunState, Scheduler, TrainProgress};
use crate::track::*;
use log::*;
use std::collections::{BTreeMap, VecDeque};

/// Ticks a train stands after arriving before it asks for a new route.
pub const DWELL_TICKS: usize = 2;

/// Collects committed routes for the simulation to pick up.
#[derive(Debug, Default)]
pub struct DispatchQueue {
    pending: Vec<(TrainId, Route, DecisionKind)>,
}

impl DispatchQueue {
    pub fn drain(&mut self) -> Vec<(TrainId, Route, DecisionKind)> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl ExecutionLayer for DispatchQueue {
    fn execute(&mut self, train: TrainId, route: &Route, kind: DecisionKind) {
        self.pending.push((train, route.clone(), kind));
    }
}

/// Runs until `stop_at`, then asks trains to stop.
#[derive(Debug)]
pub struct SessionMode {
    state: RunState,
    park: bool,
    stop_at: Option<usize>,
}

impl SessionMode {
    pub fn new(park: bool, stop_at: Option<usize>) -> Self {
        SessionMode {
            state: RunState::Running,
            park,
            stop_at,
        }
    }

    pub fn advance(&mut self, tick: usize) {
        if self.state == RunState::Running && self.stop_at.map_or(false, |t| tick >= t) {
            info!("Stopping requested at tick {}", tick);
            self.state = RunState::Stopping;
        }
    }
}

impl ModeController for SessionMode {
    fn state(&self) -> RunState {
        self.state
    }

    fn park_mode(&self) -> bool {
        self.park
    }

    fn all_trains_stopped(&mut self) {
        if self.state == RunState::Stopping {
            self.state = RunState::Stopped;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Leg {
    block: BlockId,
    direction: Direction,
    /// Turnouts between the previous block and this one.
    turnouts: Vec<TurnoutId>,
}

#[derive(Debug)]
struct SimTrain {
    profile: TrainProfile,
    block: BlockId,
    direction: Direction,
    ahead: VecDeque<Leg>,
    standing: usize,
}

#[derive(Debug, Default)]
pub struct Simulation {
    trains: BTreeMap<TrainId, SimTrain>,
}

impl Simulation {
    /// Starts a new session on `scheduler`: releases everything, places
    /// static equipment, and registers each train where the previous
    /// session left it, or at its layout position if it had none.
    pub fn start_session<B, T, X>(
        scheduler: &mut Scheduler<'_, B, T, X>,
        layout: &Layout,
    ) -> Result<Simulation>
    where
        B: RecordStore,
        T: RecordStore,
        X: ExecutionLayer,
    {
        let previous = scheduler.start_session()?;
        for (block, direction) in layout.static_blocks.iter() {
            scheduler.register_static(*block, *direction)?;
        }

        let mut trains = BTreeMap::new();
        for spec in layout.trains.iter() {
            let (block, direction) = previous
                .iter()
                .find(|(_, t, _)| *t == spec.profile.id)
                .map(|(b, _, d)| (*b, *d))
                .unwrap_or((spec.block, spec.direction));
            scheduler.register_train(spec.profile.id, block, direction)?;
            trains.insert(
                spec.profile.id,
                SimTrain {
                    profile: spec.profile,
                    block,
                    direction,
                    ahead: VecDeque::new(),
                    standing: DWELL_TICKS,
                },
            );
        }
        Ok(Simulation { trains })
    }

    /// Hands a committed route to its train.
    pub fn accept(&mut self, train: TrainId, route: &Route, kind: DecisionKind) {
        let sim = match self.trains.get_mut(&train) {
            Some(t) => t,
            None => {
                warn!("Route {} dispatched to unknown train {}", route.key(), train);
                return;
            }
        };
        let mut turnouts = Vec::new();
        let mut legs = Vec::new();
        for element in route.elements().iter().skip_while(|e| e.block().is_none()).skip(1) {
            if let Some((t, _)) = element.turnout() {
                turnouts.push(t);
            }
            if let Some((block, direction)) = element.block() {
                legs.push(Leg {
                    block,
                    direction,
                    turnouts: std::mem::take(&mut turnouts),
                });
            }
        }
        if let Some(last) = legs.last_mut() {
            last.turnouts.extend(turnouts);
        }
        debug!("Train {} takes {} legs of {} ({:?})", train, legs.len(), route.key(), kind);
        sim.ahead.extend(legs);
    }

    /// Moves every moving train one block forward.
    pub fn advance<B, T, X>(&mut self, scheduler: &mut Scheduler<'_, B, T, X>) -> Result<()>
    where
        B: RecordStore,
        T: RecordStore,
        X: ExecutionLayer,
    {
        for train in self.trains.values_mut() {
            let leg = match train.ahead.pop_front() {
                Some(leg) => leg,
                None => {
                    train.standing += 1;
                    continue;
                }
            };
            if scheduler.blocks().owner(train.block)? == Some(train.profile.owner()) {
                scheduler.blocks_mut().release(train.block)?;
            }
            for turnout in leg.turnouts.iter() {
                scheduler.turnouts_mut().release(*turnout)?;
            }
            trace!("Train {} {} -> {}", train.profile.id, train.block, leg.block);
            train.block = leg.block;
            train.direction = leg.direction;
            train.standing = 0;
        }
        Ok(())
    }

    /// Ends the session: gives back every block and turnout reserved ahead
    /// of each train, so the stores are left holding only the blocks trains
    /// stand in. The next session registers trains from those.
    pub fn finish<B, T, X>(&mut self, scheduler: &mut Scheduler<'_, B, T, X>) -> Result<()>
    where
        B: RecordStore,
        T: RecordStore,
        X: ExecutionLayer,
    {
        for train in self.trains.values_mut() {
            let owner = train.profile.owner();
            for leg in train.ahead.drain(..) {
                if scheduler.blocks().owner(leg.block)? == Some(owner) {
                    scheduler.blocks_mut().release(leg.block)?;
                }
                for turnout in leg.turnouts.iter() {
                    if scheduler.turnouts().owner(*turnout)? == Some(owner) {
                        scheduler.turnouts_mut().release(*turnout)?;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn location(&self, train: TrainId) -> Option<(BlockId, Direction)> {
        self.trains.get(&train).map(|t| (t.block, t.direction))
    }
}

impl TrainProgress for Simulation {
    fn active_trains(&self) -> Vec<TrainId> {
        self.trains.keys().copied().collect()
    }

    fn decision(&self, train: TrainId) -> Option<DecisionKind> {
        let t = self.trains.get(&train)?;
        match t.ahead.len() {
            0 if t.standing >= DWELL_TICKS => Some(DecisionKind::Extension),
            1 => Some(DecisionKind::Continuation),
            _ => None,
        }
    }

    fn planning_origin(&self, train: TrainId) -> Option<(BlockId, Direction)> {
        let t = self.trains.get(&train)?;
        Some(match t.ahead.back() {
            Some(leg) => (leg.block, leg.direction),
            None => (t.block, t.direction),
        })
    }

    fn current_block(&self, train: TrainId) -> Option<BlockId> {
        self.trains.get(&train).map(|t| t.block)
    }

    fn is_stopped(&self, train: TrainId) -> bool {
        self.trains.get(&train).map_or(true, |t| t.ahead.is_empty())
    }

    fn profile(&self, train: TrainId) -> Option<TrainProfile> {
        self.trains.get(&train).map(|t| t.profile)
    }
}
