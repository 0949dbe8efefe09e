use crate::deadlock::{DeadlockRecord, DeadlockTable, ThreatEntry};
use crate::error::{Error, Result};
use crate::raw_layout;
use crate::route::{Route, RouteCatalog, RouteElement, RouteKey};
use crate::track::*;
use log::*;
use std::collections::HashMap;
use std::path::Path;

/// Static description of a layout: everything authored up front that the
/// dispatcher only reads.
#[derive(Debug)]
pub struct Layout {
    /// Attributes of blocks `1..=blocks.len()`.
    pub blocks: Vec<BlockAttributes>,
    pub turnouts: u16,
    pub catalog: RouteCatalog,
    pub threats: DeadlockTable,
    pub static_blocks: Vec<(BlockId, Direction)>,
    pub trains: Vec<TrainSpec>,
}

/// A train as registered at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainSpec {
    pub profile: TrainProfile,
    pub block: BlockId,
    pub direction: Direction,
}

pub fn load(path: &Path) -> Result<Layout> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Layout(format!("cannot read {}: {}", path.display(), e)))?;
    from_json(&contents)
}

pub fn from_json(json: &str) -> Result<Layout> {
    let raw: raw_layout::Layout = serde_json::from_str(json)?;
    trace!(
        "Converting layout with {} blocks {} routes",
        raw.blocks.len(),
        raw.routes.len()
    );
    convert(&raw)
}

fn check_block(count: usize, block: u16, what: &str) -> Result<()> {
    if block == 0 || block as usize > count {
        return Err(Error::Layout(format!(
            "{} refers to block {} outside 1..={}",
            what, block, count
        )));
    }
    Ok(())
}

pub fn convert(raw: &raw_layout::Layout) -> Result<Layout> {
    let mut blocks = Vec::with_capacity(raw.blocks.len());
    for (idx, block) in raw.blocks.iter().enumerate() {
        if block.id as usize != idx + 1 {
            return Err(Error::Layout(format!(
                "block {} listed at position {}, blocks must be numbered 1..N in order",
                block.id,
                idx + 1
            )));
        }
        if block.attrs.length == 0 {
            warn!("Block {} has zero length and can hold no train", block.id);
        }
        blocks.push(block.attrs);
    }
    let n_blocks = blocks.len();

    let mut catalog = RouteCatalog::new();
    for route in raw.routes.iter() {
        let key = RouteKey {
            group: route.group,
            record: route.record,
        };
        for element in route.elements.iter() {
            if let Some((block, _)) = element.block() {
                check_block(n_blocks, block, &format!("route {}", key))?;
            }
            if let Some((turnout, _)) = element.turnout() {
                if turnout == 0 || turnout > raw.turnouts {
                    return Err(Error::Layout(format!(
                        "route {} refers to turnout {} outside 1..={}",
                        key, turnout, raw.turnouts
                    )));
                }
            }
        }
        if let Some(end) = route.elements.iter().position(|e| *e == RouteElement::End) {
            if end + 1 < route.elements.len() {
                warn!("Route {} has elements after its end marker, ignoring them", key);
            }
        }
        match Route::new(key, route.elements.clone()) {
            Some(r) => {
                if r.origin().1 != key.group {
                    warn!("Route {} starts heading {:?} but is filed under {:?}", key, r.origin().1, key.group);
                }
                catalog
                    .insert(r)
                    .map_err(|r| Error::Layout(format!("route {} defined twice", r.key())))?;
            }
            None => warn!("Route {} has fewer than two blocks, skipping", key),
        }
    }

    let mut threats = DeadlockTable::new();
    for list in raw.threats.iter() {
        check_block(n_blocks, list.block, "threat list")?;
        let entries = list
            .threats
            .iter()
            .map(|t| -> Result<ThreatEntry> {
                check_block(n_blocks, t.block, &format!("threat list for block {}", list.block))?;
                Ok(ThreatEntry {
                    block: t.block,
                    approach: t.direction,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        threats.insert(DeadlockRecord {
            destination: (list.block, list.direction),
            threats: entries,
        })?;
    }

    let mut occupied: HashMap<BlockId, Owner> = HashMap::new();
    let mut static_blocks = Vec::new();
    for placement in raw.static_blocks.iter() {
        check_block(n_blocks, placement.block, "static equipment")?;
        occupied.insert(placement.block, Owner::Static);
        static_blocks.push((placement.block, placement.direction));
    }

    let mut trains: Vec<TrainSpec> = Vec::new();
    for train in raw.trains.iter() {
        if train.id == 0 || train.id > MAX_TRAIN_ID {
            return Err(Error::Layout(format!("train id {} outside 1..={}", train.id, MAX_TRAIN_ID)));
        }
        if trains.iter().any(|t| t.profile.id == train.id) {
            return Err(Error::Layout(format!("train {} defined twice", train.id)));
        }
        check_block(n_blocks, train.block, &format!("train {}", train.id))?;
        if let Some(other) = occupied.insert(train.block, Owner::Train(train.id)) {
            return Err(Error::Layout(format!(
                "train {} starts in block {} already held by {}",
                train.id, train.block, other
            )));
        }
        trains.push(TrainSpec {
            profile: TrainProfile {
                id: train.id,
                length: train.length,
                kind: TrainType {
                    service: train.service,
                    stopping: train.stopping,
                },
            },
            block: train.block,
            direction: train.direction,
        });
    }

    debug!(
        "Layout: {} blocks, {} turnouts, {} routes, {} threat lists, {} static, {} trains",
        n_blocks,
        raw.turnouts,
        catalog.len(),
        threats.len(),
        static_blocks.len(),
        trains.len()
    );

    Ok(Layout {
        blocks,
        turnouts: raw.turnouts,
        catalog,
        threats,
        static_blocks,
        trains,
    })
}
