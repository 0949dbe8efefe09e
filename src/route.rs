use crate::track::*;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteElement {
    End,
    Sensor(SensorId),
    BlockEast(BlockId),
    BlockWest(BlockId),
    TurnoutNormal(TurnoutId),
    TurnoutReverse(TurnoutId),
    DirectionForward,
    DirectionReverse,
    /// Speed level
    Velocity(u8),
    /// Milliseconds
    TimeDelay(u16),
}

impl RouteElement {
    pub fn block(&self) -> Option<(BlockId, Direction)> {
        match *self {
            RouteElement::BlockEast(b) => Some((b, Direction::East)),
            RouteElement::BlockWest(b) => Some((b, Direction::West)),
            _ => None,
        }
    }

    pub fn turnout(&self) -> Option<(TurnoutId, Orientation)> {
        match *self {
            RouteElement::TurnoutNormal(t) => Some((t, Orientation::Normal)),
            RouteElement::TurnoutReverse(t) => Some((t, Orientation::Reverse)),
            _ => None,
        }
    }
}

/// Routes are authored in two groups by compass direction, numbered within
/// each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct RouteKey {
    pub group: Direction,
    pub record: u16,
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let g = match self.group {
            Direction::East => 'E',
            Direction::West => 'W',
        };
        write!(f, "{}{}", g, self.record)
    }
}

/// An immutable route. The first block element is where the train stands
/// when the route is assigned (its origin); the last block element is its
/// destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    key: RouteKey,
    elements: Vec<RouteElement>,
    origin: (BlockId, Direction),
    destination: (BlockId, Direction),
}

impl Route {
    /// Builds a route from authored elements, cut at the first end marker.
    /// Returns `None` unless at least an origin and a destination block remain.
    pub fn new(key: RouteKey, mut elements: Vec<RouteElement>) -> Option<Route> {
        if let Some(end) = elements.iter().position(|e| *e == RouteElement::End) {
            elements.truncate(end);
        }
        let mut blocks = elements.iter().filter_map(RouteElement::block);
        let origin = blocks.next()?;
        let destination = blocks.last()?;
        Some(Route {
            key,
            elements,
            origin,
            destination,
        })
    }

    pub fn key(&self) -> RouteKey {
        self.key
    }

    pub fn elements(&self) -> &[RouteElement] {
        &self.elements
    }

    pub fn origin(&self) -> (BlockId, Direction) {
        self.origin
    }

    pub fn destination(&self) -> (BlockId, Direction) {
        self.destination
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, Direction)> + '_ {
        self.elements.iter().filter_map(RouteElement::block)
    }

    /// Blocks the train will enter: every block after the origin.
    pub fn path_blocks(&self) -> impl Iterator<Item = (BlockId, Direction)> + '_ {
        self.blocks().skip(1)
    }

    pub fn turnouts(&self) -> impl Iterator<Item = (TurnoutId, Orientation)> + '_ {
        self.elements.iter().filter_map(RouteElement::turnout)
    }
}

#[derive(Debug, Default)]
pub struct RouteCatalog {
    routes: BTreeMap<RouteKey, Route>,
}

impl RouteCatalog {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a route, handing it back if its key is taken.
    pub fn insert(&mut self, route: Route) -> Result<(), Route> {
        if self.routes.contains_key(&route.key) {
            return Err(route);
        }
        self.routes.insert(route.key, route);
        Ok(())
    }

    pub fn get(&self, key: RouteKey) -> Option<&Route> {
        self.routes.get(&key)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    /// Routes leaving `block` heading `direction`, in record order.
    pub fn candidates(
        &self,
        block: BlockId,
        direction: Direction,
    ) -> impl Iterator<Item = &Route> {
        self.routes
            .values()
            .filter(move |r| r.key.group == direction && r.origin == (block, direction))
    }
}
