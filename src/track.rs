//! Vocabulary shared by the reservation stores, the route catalog and the
//! scheduler.

use std::fmt;

pub type BlockId = u16;
pub type TurnoutId = u16;
pub type SensorId = u16;
pub type TrainId = u8;

/// Largest train id that fits in an owner byte. 0 marks "none" and 255
/// marks static equipment.
pub const MAX_TRAIN_ID: TrainId = 254;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    West,
    East,
}

impl Default for Direction {
    /// Reservation direction of an unreserved block.
    fn default() -> Self {
        Direction::West
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Normal,
    Reverse,
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::Normal
    }
}

/// Holder of a block or turnout reservation. An unreserved resource is
/// `Option::<Owner>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Train(TrainId),
    /// Permanently parked equipment that never takes part in dispatching.
    Static,
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Owner::Train(t) => write!(f, "train {}", t),
            Owner::Static => write!(f, "static equipment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidingKind {
    NotASiding,
    DoubleEnded,
    SingleEnded,
}

/// Which kinds of trains may stop in a block serving as a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationRestriction {
    None,
    Passenger,
    Freight,
    Either,
}

impl StationRestriction {
    pub fn permits(self, train: TrainType) -> bool {
        match self {
            StationRestriction::None | StationRestriction::Either => true,
            StationRestriction::Passenger => train.service == Service::Passenger,
            StationRestriction::Freight => train.service == Service::Freight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForbiddenType {
    None,
    Passenger,
    Freight,
    Local,
    Through,
}

impl ForbiddenType {
    pub fn forbids(self, train: TrainType) -> bool {
        match self {
            ForbiddenType::None => false,
            ForbiddenType::Passenger => train.service == Service::Passenger,
            ForbiddenType::Freight => train.service == Service::Freight,
            ForbiddenType::Local => train.stopping == Stopping::Local,
            ForbiddenType::Through => train.stopping == Stopping::Through,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    None,
    EastboundRising,
    WestboundRising,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Passenger,
    Freight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stopping {
    Local,
    Through,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct TrainType {
    pub service: Service,
    pub stopping: Stopping,
}

/// The parts of a train the scheduler needs when judging a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainProfile {
    pub id: TrainId,
    /// Length in mm.
    pub length: u16,
    pub kind: TrainType,
}

impl TrainProfile {
    pub fn owner(&self) -> Owner {
        Owner::Train(self.id)
    }

    /// Whether this train could physically and legally stand in a block with
    /// the given attributes.
    pub fn fits(&self, attrs: &BlockAttributes) -> bool {
        self.length <= attrs.length && !attrs.forbidden.forbids(self.kind)
    }
}

/// Immutable, authored attributes of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BlockAttributes {
    pub west_sensor: SensorId,
    pub east_sensor: SensorId,
    pub westbound_speed: u8,
    pub eastbound_speed: u8,
    /// Length in mm.
    pub length: u16,
    pub siding: SidingKind,
    pub parking: bool,
    pub station: StationRestriction,
    pub forbidden: ForbiddenType,
    pub tunnel: bool,
    pub grade: Grade,
}

impl Default for BlockAttributes {
    fn default() -> Self {
        BlockAttributes {
            west_sensor: 0,
            east_sensor: 0,
            westbound_speed: 0,
            eastbound_speed: 0,
            length: 0,
            siding: SidingKind::NotASiding,
            parking: false,
            station: StationRestriction::None,
            forbidden: ForbiddenType::None,
            tunnel: false,
            grade: Grade::None,
        }
    }
}
