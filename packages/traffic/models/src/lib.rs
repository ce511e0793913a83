#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Crossing point and direction code tables.
//!
//! The compact serving payload replaces free-text categorical fields with
//! small integer codes from the tables in this crate. Both tables are
//! append-only: a code, once shipped, always names the same value. New
//! control points get the next unused code at the end of
//! [`ControlPoint::all`]; existing discriminants never move.
//!
//! Encoding is total. A name with no table entry encodes to
//! [`UNKNOWN_CODE`] rather than failing, so a payload can always be built
//! even after the feed starts reporting a facility this build has never
//! heard of.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Code assigned to any control point name missing from the table.
pub const UNKNOWN_CODE: i32 = -1;

/// A border control point with a stable compact code.
///
/// The discriminant of each variant *is* its wire code.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
)]
pub enum ControlPoint {
    /// Lo Wu rail crossing.
    #[strum(serialize = "Lo Wu")]
    #[serde(rename = "Lo Wu")]
    LoWu = 0,
    /// Lok Ma Chau Spur Line rail crossing.
    #[strum(serialize = "Lok Ma Chau Spur Line")]
    #[serde(rename = "Lok Ma Chau Spur Line")]
    LokMaChauSpurLine = 1,
    /// Hong Kong International Airport.
    #[strum(serialize = "Airport")]
    #[serde(rename = "Airport")]
    Airport = 2,
    /// Shenzhen Bay Port.
    #[strum(serialize = "Shenzhen Bay")]
    #[serde(rename = "Shenzhen Bay")]
    ShenzhenBay = 3,
    /// Hong Kong-Zhuhai-Macao Bridge.
    #[strum(serialize = "Hong Kong-Zhuhai-Macao Bridge")]
    #[serde(rename = "Hong Kong-Zhuhai-Macao Bridge")]
    HongKongZhuhaiMacaoBridge = 4,
    /// High-speed rail terminus at West Kowloon.
    #[strum(serialize = "Express Rail Link West Kowloon")]
    #[serde(rename = "Express Rail Link West Kowloon")]
    ExpressRailLinkWestKowloon = 5,
    /// Heung Yuen Wai road crossing.
    #[strum(serialize = "Heung Yuen Wai")]
    #[serde(rename = "Heung Yuen Wai")]
    HeungYuenWai = 6,
    /// Lok Ma Chau road crossing.
    #[strum(serialize = "Lok Ma Chau")]
    #[serde(rename = "Lok Ma Chau")]
    LokMaChau = 7,
    /// Macau Ferry Terminal (Sheung Wan).
    #[strum(serialize = "Macau Ferry Terminal")]
    #[serde(rename = "Macau Ferry Terminal")]
    MacauFerryTerminal = 8,
    /// Man Kam To road crossing.
    #[strum(serialize = "Man Kam To")]
    #[serde(rename = "Man Kam To")]
    ManKamTo = 9,
    /// China Ferry Terminal (Tsim Sha Tsui).
    #[strum(serialize = "China Ferry Terminal")]
    #[serde(rename = "China Ferry Terminal")]
    ChinaFerryTerminal = 10,
    /// Kai Tak Cruise Terminal.
    #[strum(serialize = "Kai Tak Cruise Terminal")]
    #[serde(rename = "Kai Tak Cruise Terminal")]
    KaiTakCruiseTerminal = 11,
    /// Harbour Control (river trade and small craft).
    #[strum(serialize = "Harbour Control")]
    #[serde(rename = "Harbour Control")]
    HarbourControl = 12,
    /// Sha Tau Kok road crossing.
    #[strum(serialize = "Sha Tau Kok")]
    #[serde(rename = "Sha Tau Kok")]
    ShaTauKok = 13,
    /// Hung Hom through-train station.
    #[strum(serialize = "Hung Hom")]
    #[serde(rename = "Hung Hom")]
    HungHom = 14,
    /// Tuen Mun Ferry Terminal.
    #[strum(serialize = "Tuen Mun Ferry Terminal")]
    #[serde(rename = "Tuen Mun Ferry Terminal")]
    TuenMunFerryTerminal = 15,
}

impl ControlPoint {
    /// Returns the compact wire code of this control point.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Looks up a control point by its compact code.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Self::all().iter().copied().find(|cp| cp.code() == code)
    }

    /// Looks up a control point by its exact feed name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }

    /// Returns all variants in code order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::LoWu,
            Self::LokMaChauSpurLine,
            Self::Airport,
            Self::ShenzhenBay,
            Self::HongKongZhuhaiMacaoBridge,
            Self::ExpressRailLinkWestKowloon,
            Self::HeungYuenWai,
            Self::LokMaChau,
            Self::MacauFerryTerminal,
            Self::ManKamTo,
            Self::ChinaFerryTerminal,
            Self::KaiTakCruiseTerminal,
            Self::HarbourControl,
            Self::ShaTauKok,
            Self::HungHom,
            Self::TuenMunFerryTerminal,
        ]
    }
}

/// Direction of travel through a control point.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Direction {
    /// Entering Hong Kong.
    Arrival = 0,
    /// Leaving Hong Kong.
    Departure = 1,
}

impl Direction {
    /// Returns the compact wire code of this direction.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Maps raw feed text onto a direction.
    ///
    /// Only the exact text `"Arrival"` is an arrival; everything else,
    /// including values the feed has never been seen to emit, folds into
    /// [`Direction::Departure`]. The second element is `true` when the
    /// input was neither canonical spelling, so callers can report it.
    #[must_use]
    pub fn normalize(text: &str) -> (Self, bool) {
        match text {
            "Arrival" => (Self::Arrival, false),
            "Departure" => (Self::Departure, false),
            _ => (Self::Departure, true),
        }
    }

    /// Returns both directions in code order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Arrival, Self::Departure]
    }
}

/// Encodes a control point name to its compact code, or [`UNKNOWN_CODE`]
/// when the name is not in the table.
#[must_use]
pub fn encode_control_point(name: &str) -> i32 {
    ControlPoint::from_name(name).map_or(UNKNOWN_CODE, ControlPoint::code)
}

/// Encodes direction text: `0` for exactly `"Arrival"`, `1` for anything
/// else.
#[must_use]
pub fn encode_direction(text: &str) -> i32 {
    Direction::normalize(text).0.code()
}

/// Decodes a compact control point code back to its feed name.
///
/// Returns `None` for [`UNKNOWN_CODE`] and any code past the end of the
/// table.
#[must_use]
pub fn decode_control_point(code: i32) -> Option<&'static str> {
    ControlPoint::from_code(code).map(<&'static str>::from)
}

/// Decodes a compact direction code.
#[must_use]
pub const fn decode_direction(code: i32) -> Option<Direction> {
    match code {
        0 => Some(Direction::Arrival),
        1 => Some(Direction::Departure),
        _ => None,
    }
}
