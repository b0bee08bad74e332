//! Stroke labels derived from device-reported type and spin codes.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SwingKind {
    Serve,
    Topspin,
    Slice,
    Flat,
    Volley,
    Smash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Forehand,
    Backhand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Stroke {
    pub kind: SwingKind,
    pub side: Side,
}

impl Stroke {
    pub const SERVE: Stroke = Stroke::new(SwingKind::Serve, Side::Forehand);
    pub const FALLBACK: Stroke = Stroke::new(SwingKind::Flat, Side::Forehand);

    pub const fn new(kind: SwingKind, side: Side) -> Self {
        Self { kind, side }
    }

    pub fn is_serve(&self) -> bool {
        *self == Stroke::SERVE
    }

    /// Babolat `type` × `spin`. Unspecified spin is flat; an unknown or
    /// missing type is a flat forehand.
    pub fn from_babolat(stroke_type: Option<&str>, spin: Option<&str>) -> Self {
        let stroke_type = stroke_type.unwrap_or("").trim().to_ascii_uppercase();
        let spin = spin.unwrap_or("").trim().to_ascii_uppercase();

        let side = match stroke_type.as_str() {
            "SERVE" => return Stroke::SERVE,
            "FOREHAND" => Side::Forehand,
            "BACKHAND" => Side::Backhand,
            _ => return Stroke::FALLBACK,
        };
        let kind = match spin.as_str() {
            "LIFTED" => SwingKind::Topspin,
            "SLICED" => SwingKind::Slice,
            _ => SwingKind::Flat,
        };
        Stroke::new(kind, side)
    }

    /// Zepp `swing_type` × `swing_side` codes.
    pub fn from_zepp(swing_type: Option<i64>, swing_side: Option<i64>) -> Self {
        let kind = match swing_type {
            Some(0) => SwingKind::Slice,
            Some(1) => SwingKind::Flat,
            Some(2) => SwingKind::Topspin,
            Some(3) => SwingKind::Serve,
            Some(4) => SwingKind::Volley,
            Some(5) => SwingKind::Smash,
            _ => return Stroke::FALLBACK,
        };
        let side = match swing_side {
            Some(1) => Side::Backhand,
            _ => Side::Forehand,
        };
        Stroke::new(kind, side)
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Stroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            SwingKind::Serve => "SERVE",
            SwingKind::Topspin => "TOPSPIN",
            SwingKind::Slice => "SLICE",
            SwingKind::Flat => "FLAT",
            SwingKind::Volley => "VOLLEY",
            SwingKind::Smash => "SMASH",
        };
        let side = match self.side {
            Side::Forehand => "FH",
            Side::Backhand => "BH",
        };
        write!(f, "{kind}{side}")
    }
}

impl FromStr for Stroke {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_uppercase();
        let (kind, side) = if let Some(k) = s.strip_suffix("FH") {
            (k, Side::Forehand)
        } else if let Some(k) = s.strip_suffix("BH") {
            (k, Side::Backhand)
        } else {
            return Err(format!("stroke label '{s}' must end in FH or BH"));
        };
        let kind = match kind {
            "SERVE" => SwingKind::Serve,
            "TOPSPIN" => SwingKind::Topspin,
            "SLICE" => SwingKind::Slice,
            "FLAT" => SwingKind::Flat,
            "VOLLEY" => SwingKind::Volley,
            "SMASH" => SwingKind::Smash,
            other => return Err(format!("unknown swing kind '{other}'")),
        };
        Ok(Stroke::new(kind, side))
    }
}

impl Serialize for Stroke {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}
