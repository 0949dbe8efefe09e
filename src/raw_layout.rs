use crate::deadlock::Approach;
use crate::route::RouteElement;
use crate::track::{BlockAttributes, Direction, Service, Stopping};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Layout {
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub turnouts: u16,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub threats: Vec<ThreatList>,
    /// Blocks permanently occupied by equipment that is not dispatched.
    #[serde(default)]
    pub static_blocks: Vec<Placement>,
    #[serde(default)]
    pub trains: Vec<Train>,
}

#[derive(Deserialize, Debug)]
pub struct Block {
    pub id: u16,
    #[serde(flatten)]
    pub attrs: BlockAttributes,
}

#[derive(Deserialize, Debug)]
pub struct Route {
    pub group: Direction,
    pub record: u16,
    pub elements: Vec<RouteElement>,
}

#[derive(Deserialize, Debug)]
pub struct ThreatList {
    pub block: u16,
    pub direction: Direction,
    pub threats: Vec<Threat>,
}

#[derive(Deserialize, Debug)]
pub struct Threat {
    pub block: u16,
    pub direction: Approach,
}

#[derive(Deserialize, Debug)]
pub struct Placement {
    pub block: u16,
    pub direction: Direction,
}

#[derive(Deserialize, Debug)]
pub struct Train {
    pub id: u8,
    /// mm
    pub length: u16,
    pub service: Service,
    pub stopping: Stopping,
    pub block: u16,
    pub direction: Direction,
}
