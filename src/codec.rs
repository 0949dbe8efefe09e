//! Fixed-layout record encodings.
//!
//! Block record, `BLOCK_RECORD_LEN` bytes:
//!
//! | byte  | field |
//! |-------|-------|
//! | 0     | layout version |
//! | 1-2   | west boundary sensor (LE) |
//! | 3-4   | east boundary sensor (LE) |
//! | 5     | westbound default speed |
//! | 6     | eastbound default speed |
//! | 7-8   | length in mm (LE) |
//! | 9     | siding kind |
//! | 10    | flags: bit 0 parking siding, bit 1 tunnel |
//! | 11    | station restriction |
//! | 12    | forbidden train type |
//! | 13    | grade |
//! | 14    | owner |
//! | 15    | reserved direction |
//!
//! Turnout record, `TURNOUT_RECORD_LEN` bytes: version, owner, last
//! orientation, one spare byte.
//!
//! Owner byte: 0 none, 1..=254 train id, 255 static equipment.

use crate::track::*;

pub const RECORD_VERSION: u8 = 1;
pub const BLOCK_RECORD_LEN: usize = 16;
pub const TURNOUT_RECORD_LEN: usize = 4;

const OWNER_NONE: u8 = 0;
const OWNER_STATIC: u8 = 255;

const FLAG_PARKING: u8 = 0b01;
const FLAG_TUNNEL: u8 = 0b10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    Version(u8),
    Field { field: &'static str, value: u8 },
}

/// An entity stored as one fixed-size record per 1-based id.
pub trait Record: Copy {
    const KIND: &'static str;
    const LEN: usize;
    fn encode(&self, buf: &mut [u8]);
    fn decode(buf: &[u8]) -> Result<Self, DecodeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRecord {
    pub attrs: BlockAttributes,
    pub owner: Option<Owner>,
    pub direction: Direction,
}

impl BlockRecord {
    pub fn unreserved(attrs: BlockAttributes) -> Self {
        BlockRecord {
            attrs,
            owner: None,
            direction: Direction::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnoutRecord {
    pub owner: Option<Owner>,
    pub orientation: Orientation,
}

fn field(field: &'static str, value: u8) -> DecodeError {
    DecodeError::Field { field, value }
}

fn check_version(buf: &[u8]) -> Result<(), DecodeError> {
    match buf[0] {
        RECORD_VERSION => Ok(()),
        v => Err(DecodeError::Version(v)),
    }
}

fn u16_at(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn encode_owner(owner: Option<Owner>) -> u8 {
    match owner {
        None => OWNER_NONE,
        Some(Owner::Static) => OWNER_STATIC,
        Some(Owner::Train(t)) => t,
    }
}

fn decode_owner(b: u8) -> Option<Owner> {
    match b {
        OWNER_NONE => None,
        OWNER_STATIC => Some(Owner::Static),
        t => Some(Owner::Train(t)),
    }
}

fn encode_direction(d: Direction) -> u8 {
    match d {
        Direction::West => 0,
        Direction::East => 1,
    }
}

fn decode_direction(b: u8) -> Result<Direction, DecodeError> {
    match b {
        0 => Ok(Direction::West),
        1 => Ok(Direction::East),
        v => Err(field("direction", v)),
    }
}

fn encode_siding(s: SidingKind) -> u8 {
    match s {
        SidingKind::NotASiding => 0,
        SidingKind::DoubleEnded => 1,
        SidingKind::SingleEnded => 2,
    }
}

fn decode_siding(b: u8) -> Result<SidingKind, DecodeError> {
    match b {
        0 => Ok(SidingKind::NotASiding),
        1 => Ok(SidingKind::DoubleEnded),
        2 => Ok(SidingKind::SingleEnded),
        v => Err(field("siding", v)),
    }
}

fn encode_station(s: StationRestriction) -> u8 {
    match s {
        StationRestriction::None => 0,
        StationRestriction::Passenger => 1,
        StationRestriction::Freight => 2,
        StationRestriction::Either => 3,
    }
}

fn decode_station(b: u8) -> Result<StationRestriction, DecodeError> {
    match b {
        0 => Ok(StationRestriction::None),
        1 => Ok(StationRestriction::Passenger),
        2 => Ok(StationRestriction::Freight),
        3 => Ok(StationRestriction::Either),
        v => Err(field("station", v)),
    }
}

fn encode_forbidden(f: ForbiddenType) -> u8 {
    match f {
        ForbiddenType::None => 0,
        ForbiddenType::Passenger => 1,
        ForbiddenType::Freight => 2,
        ForbiddenType::Local => 3,
        ForbiddenType::Through => 4,
    }
}

fn decode_forbidden(b: u8) -> Result<ForbiddenType, DecodeError> {
    match b {
        0 => Ok(ForbiddenType::None),
        1 => Ok(ForbiddenType::Passenger),
        2 => Ok(ForbiddenType::Freight),
        3 => Ok(ForbiddenType::Local),
        4 => Ok(ForbiddenType::Through),
        v => Err(field("forbidden", v)),
    }
}

fn encode_grade(g: Grade) -> u8 {
    match g {
        Grade::None => 0,
        Grade::EastboundRising => 1,
        Grade::WestboundRising => 2,
    }
}

fn decode_grade(b: u8) -> Result<Grade, DecodeError> {
    match b {
        0 => Ok(Grade::None),
        1 => Ok(Grade::EastboundRising),
        2 => Ok(Grade::WestboundRising),
        v => Err(field("grade", v)),
    }
}

impl Record for BlockRecord {
    const KIND: &'static str = "block";
    const LEN: usize = BLOCK_RECORD_LEN;

    fn encode(&self, buf: &mut [u8]) {
        let a = &self.attrs;
        buf[0] = RECORD_VERSION;
        buf[1..3].copy_from_slice(&a.west_sensor.to_le_bytes());
        buf[3..5].copy_from_slice(&a.east_sensor.to_le_bytes());
        buf[5] = a.westbound_speed;
        buf[6] = a.eastbound_speed;
        buf[7..9].copy_from_slice(&a.length.to_le_bytes());
        buf[9] = encode_siding(a.siding);
        let mut flags = 0;
        if a.parking {
            flags |= FLAG_PARKING;
        }
        if a.tunnel {
            flags |= FLAG_TUNNEL;
        }
        buf[10] = flags;
        buf[11] = encode_station(a.station);
        buf[12] = encode_forbidden(a.forbidden);
        buf[13] = encode_grade(a.grade);
        buf[14] = encode_owner(self.owner);
        buf[15] = encode_direction(self.direction);
    }

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        check_version(buf)?;
        let flags = buf[10];
        if flags & !(FLAG_PARKING | FLAG_TUNNEL) != 0 {
            return Err(field("flags", flags));
        }
        Ok(BlockRecord {
            attrs: BlockAttributes {
                west_sensor: u16_at(buf, 1),
                east_sensor: u16_at(buf, 3),
                westbound_speed: buf[5],
                eastbound_speed: buf[6],
                length: u16_at(buf, 7),
                siding: decode_siding(buf[9])?,
                parking: flags & FLAG_PARKING != 0,
                tunnel: flags & FLAG_TUNNEL != 0,
                station: decode_station(buf[11])?,
                forbidden: decode_forbidden(buf[12])?,
                grade: decode_grade(buf[13])?,
            },
            owner: decode_owner(buf[14]),
            direction: decode_direction(buf[15])?,
        })
    }
}

impl Record for TurnoutRecord {
    const KIND: &'static str = "turnout";
    const LEN: usize = TURNOUT_RECORD_LEN;

    fn encode(&self, buf: &mut [u8]) {
        buf[0] = RECORD_VERSION;
        buf[1] = encode_owner(self.owner);
        buf[2] = match self.orientation {
            Orientation::Normal => 0,
            Orientation::Reverse => 1,
        };
        buf[3] = 0;
    }

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        check_version(buf)?;
        let orientation = match buf[2] {
            0 => Orientation::Normal,
            1 => Orientation::Reverse,
            v => return Err(field("orientation", v)),
        };
        Ok(TurnoutRecord {
            owner: decode_owner(buf[1]),
            orientation,
        })
    }
}
