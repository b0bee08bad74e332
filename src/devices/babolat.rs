//! Babolat racket sensor, `motions` table.

use crate::project::{CategoryRule, DeviceSchema};
use crate::timebase::TimeEncoding;

pub const DEVICE: &str = "babolat";
pub const TAG: &str = "bab";

/// Babolat timestamps are epoch seconds x 10000.
pub const TIME_DIVISOR: i64 = 10_000;

pub const STYLE_SCORE: &str = "StyleScore";
pub const EFFECT_SCORE: &str = "EffectScore";
pub const SPEED_SCORE: &str = "SpeedScore";

const VALUES: [&str; 7] = [
    STYLE_SCORE,
    "StyleValue",
    EFFECT_SCORE,
    "EffectValue",
    SPEED_SCORE,
    "SpeedValue",
    "stroke_counter",
];

pub fn schema() -> DeviceSchema {
    DeviceSchema {
        device: DEVICE,
        tag: TAG,
        time_col: "time",
        encoding: TimeEncoding::EpochScaled {
            divisor: TIME_DIVISOR,
        },
        required: VALUES.iter().map(|c| (*c, *c)).collect(),
        optional: Vec::new(),
        category: CategoryRule::Babolat {
            type_col: "type",
            spin_col: "spin",
        },
    }
}
