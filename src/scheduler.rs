//! Dispatch scheduler.
//!
//! One call to [`Scheduler::tick`] is one pass of the cooperative polling
//! loop: it reads the operating state, finds trains waiting at a decision
//! point, and commits at most one route before returning.

use crate::batch::reserve_route;
use crate::blocks::BlockStore;
use crate::deadlock::{DeadlockAnalyzer, DeadlockTable};
use crate::error::Result;
use crate::record::RecordStore;
use crate::route::{Route, RouteCatalog, RouteKey};
use crate::track::*;
use crate::turnouts::TurnoutStore;
use log::*;
use velcro::iter;

/// Operating state owned by the mode controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopping,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// The train is standing and needs a route to start moving.
    Extension,
    /// The train is moving, has passed its lookahead sensor, and can take a
    /// route appended ahead of the one it is running on.
    Continuation,
}

/// Live train state, owned outside the scheduler.
pub trait TrainProgress {
    /// Trains taking part in dispatching, in the order they are considered.
    fn active_trains(&self) -> Vec<TrainId>;
    fn decision(&self, train: TrainId) -> Option<DecisionKind>;
    /// Block and heading a new route must start from: the current block of
    /// a standing train, or the destination of a moving train's route.
    fn planning_origin(&self, train: TrainId) -> Option<(BlockId, Direction)>;
    fn current_block(&self, train: TrainId) -> Option<BlockId>;
    fn is_stopped(&self, train: TrainId) -> bool;
    /// Length and type of the train.
    fn profile(&self, train: TrainId) -> Option<TrainProfile>;
}

pub trait ModeController {
    fn state(&self) -> RunState;
    fn park_mode(&self) -> bool;
    /// Every active train is at rest; the controller may move from
    /// `Stopping` to `Stopped`.
    fn all_trains_stopped(&mut self);
}

/// Downstream layer that drives the train along a committed route.
pub trait ExecutionLayer {
    fn execute(&mut self, train: TrainId, route: &Route, kind: DecisionKind);
}

/// Why a candidate route was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TurnoutHeld { turnout: TurnoutId, owner: Owner },
    BlockHeld { block: BlockId, owner: Owner },
    Station(StationRestriction),
    Forbidden(ForbiddenType),
    TooShort { length: u16 },
    DeadlockRisk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Committed { route: RouteKey, kind: DecisionKind },
    /// The train is waiting for a route but no candidate passed. It is
    /// considered again on the next tick.
    NoCandidate,
    /// Nothing to decide for this train right now.
    NotDecided,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub assigned: Option<(TrainId, RouteKey, DecisionKind)>,
    /// Decided trains for which no candidate passed.
    pub waiting: Vec<TrainId>,
    /// This tick asked the mode controller for the `Stopping → Stopped` edge.
    pub stopped: bool,
}

pub struct Scheduler<'l, B, T, X> {
    catalog: &'l RouteCatalog,
    threats: &'l DeadlockTable,
    blocks: BlockStore<B>,
    turnouts: TurnoutStore<T>,
    execution: X,
}

impl<'l, B: RecordStore, T: RecordStore, X: ExecutionLayer> Scheduler<'l, B, T, X> {
    pub fn new(
        catalog: &'l RouteCatalog,
        threats: &'l DeadlockTable,
        blocks: BlockStore<B>,
        turnouts: TurnoutStore<T>,
        execution: X,
    ) -> Self {
        Scheduler {
            catalog,
            threats,
            blocks,
            turnouts,
            execution,
        }
    }

    pub fn blocks(&self) -> &BlockStore<B> {
        &self.blocks
    }

    /// Progress tracking releases blocks through here as trains move on.
    pub fn blocks_mut(&mut self) -> &mut BlockStore<B> {
        &mut self.blocks
    }

    pub fn turnouts(&self) -> &TurnoutStore<T> {
        &self.turnouts
    }

    pub fn turnouts_mut(&mut self) -> &mut TurnoutStore<T> {
        &mut self.turnouts
    }

    pub fn execution(&self) -> &X {
        &self.execution
    }

    pub fn execution_mut(&mut self) -> &mut X {
        &mut self.execution
    }

    /// Begins a new operating session. Returns the blocks trains held at the
    /// end of the previous session, for registration to use as default
    /// locations, then releases every block and turnout.
    pub fn start_session(&mut self) -> Result<Vec<(BlockId, TrainId, Direction)>> {
        let previous = self.blocks.train_locations()?;
        self.blocks.release_all()?;
        self.turnouts.release_all()?;
        info!(
            "New session, {} train locations carried over from the last one",
            previous.len()
        );
        Ok(previous)
    }

    pub fn register_static(&mut self, block: BlockId, direction: Direction) -> Result<()> {
        self.blocks.reserve(block, direction, Owner::Static)
    }

    pub fn register_train(&mut self, train: TrainId, block: BlockId, direction: Direction) -> Result<()> {
        self.blocks.reserve(block, direction, Owner::Train(train))?;
        info!("Train {} registered in block {} heading {:?}", train, block, direction);
        Ok(())
    }

    /// Checks one candidate against the current reservations. `None` means
    /// the route may be committed for `train`.
    pub fn evaluate(&self, route: &Route, train: &TrainProfile) -> Result<Option<Rejection>> {
        for (turnout, _) in route.turnouts() {
            match self.turnouts.owner(turnout)? {
                Some(owner) if owner != train.owner() => {
                    return Ok(Some(Rejection::TurnoutHeld { turnout, owner }))
                }
                _ => {}
            }
        }
        for (block, _) in route.path_blocks() {
            if let Some(owner) = self.blocks.owner(block)? {
                return Ok(Some(Rejection::BlockHeld { block, owner }));
            }
        }

        let destination = route.destination();
        let attrs = self.blocks.attributes(destination.0)?;
        if !attrs.station.permits(train.kind) {
            return Ok(Some(Rejection::Station(attrs.station)));
        }
        if attrs.forbidden.forbids(train.kind) {
            return Ok(Some(Rejection::Forbidden(attrs.forbidden)));
        }
        if attrs.length < train.length {
            return Ok(Some(Rejection::TooShort { length: attrs.length }));
        }
        if DeadlockAnalyzer::new(self.threats).is_unsafe(destination, train, &self.blocks)? {
            return Ok(Some(Rejection::DeadlockRisk));
        }
        Ok(None)
    }

    /// Tries to find and commit a route for one train.
    pub fn schedule_train(
        &mut self,
        train: TrainId,
        progress: &impl TrainProgress,
        state: RunState,
        park: bool,
    ) -> Result<Assignment> {
        let kind = match progress.decision(train) {
            Some(kind) => kind,
            None => return Ok(Assignment::NotDecided),
        };
        match state {
            RunState::Stopped => return Ok(Assignment::NotDecided),
            RunState::Stopping if !park => return Ok(Assignment::NotDecided),
            RunState::Stopping => {
                if progress.is_stopped(train) && self.parked(train, progress)? {
                    return Ok(Assignment::NotDecided);
                }
            }
            RunState::Running => {}
        }

        let origin = match progress.planning_origin(train) {
            Some(origin) => origin,
            None => {
                warn!("Train {} is at a decision point without a known origin", train);
                return Ok(Assignment::NotDecided);
            }
        };
        if kind == DecisionKind::Continuation && self.blocks.siding(origin.0)? == SidingKind::SingleEnded {
            trace!("Train {} must stop in single-ended siding {}", train, origin.0);
            return Ok(Assignment::NotDecided);
        }
        // Only park mode gets here while stopping. A train already bound for
        // a parking siding stays there.
        if state == RunState::Stopping && kind == DecisionKind::Continuation && self.blocks.is_parking(origin.0)? {
            trace!("Train {} parks in siding {}", train, origin.0);
            return Ok(Assignment::NotDecided);
        }

        let profile = match progress.profile(train) {
            Some(profile) => profile,
            None => {
                warn!("Train {} has no length or type on record", train);
                return Ok(Assignment::NotDecided);
            }
        };

        let catalog = self.catalog;
        let candidates = catalog.candidates(origin.0, origin.1).collect::<Vec<_>>();
        let ordered: Vec<&Route> = if park {
            let mut parking = Vec::new();
            let mut other = Vec::new();
            for route in candidates {
                if self.blocks.is_parking(route.destination().0)? {
                    parking.push(route);
                } else {
                    other.push(route);
                }
            }
            iter![..parking, ..other].collect()
        } else {
            candidates
        };

        for route in ordered {
            if let Some(rejection) = self.evaluate(route, &profile)? {
                trace!("Train {} skips route {}: {:?}", train, route.key(), rejection);
                continue;
            }
            reserve_route(&mut self.blocks, &mut self.turnouts, route, profile.owner())?;
            info!(
                "Train {} assigned route {} to block {} ({:?})",
                train,
                route.key(),
                route.destination().0,
                kind
            );
            self.execution.execute(train, route, kind);
            return Ok(Assignment::Committed {
                route: route.key(),
                kind,
            });
        }

        debug!("No route for train {} from block {} this pass", train, origin.0);
        Ok(Assignment::NoCandidate)
    }

    fn parked(&self, train: TrainId, progress: &impl TrainProgress) -> Result<bool> {
        match progress.current_block(train) {
            Some(block) => self.blocks.is_parking(block),
            None => Ok(false),
        }
    }

    fn at_rest(&self, progress: &impl TrainProgress, park: bool) -> Result<bool> {
        for train in progress.active_trains() {
            if !progress.is_stopped(train) {
                return Ok(false);
            }
            if park && !self.parked(train, progress)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// One pass of the dispatch loop.
    pub fn tick(
        &mut self,
        progress: &impl TrainProgress,
        mode: &mut impl ModeController,
    ) -> Result<TickReport> {
        let _p = hprof::enter("scheduler tick");
        let mut report = TickReport::default();
        let state = mode.state();
        if state == RunState::Stopped {
            return Ok(report);
        }
        let park = mode.park_mode();

        for train in progress.active_trains() {
            match self.schedule_train(train, progress, state, park)? {
                Assignment::Committed { route, kind } => {
                    report.assigned = Some((train, route, kind));
                    break;
                }
                Assignment::NoCandidate => report.waiting.push(train),
                Assignment::NotDecided => {}
            }
        }

        if state == RunState::Stopping && report.assigned.is_none() && self.at_rest(progress, park)? {
            info!("All trains at rest, requesting stop");
            mode.all_trains_stopped();
            report.stopped = true;
        }
        Ok(report)
    }
}
