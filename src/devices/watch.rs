//! Wrist motion logger, one row per fixed-interval sample.

use crate::project::{CategoryRule, DeviceSchema};
use crate::timebase::TimeEncoding;

pub const DEVICE: &str = "watch";
pub const TAG: &str = "watch";

pub const ACCELERATION_X: &str = "accelerationX";

const REQUIRED: [&str; 6] = [
    ACCELERATION_X,
    "accelerationY",
    "accelerationZ",
    "rotationRateX",
    "rotationRateY",
    "rotationRateZ",
];

const OPTIONAL: [&str; 8] = [
    "seconds_elapsed",
    "gravityX",
    "gravityY",
    "gravityZ",
    "quaternionW",
    "quaternionX",
    "quaternionY",
    "quaternionZ",
];

pub fn schema() -> DeviceSchema {
    DeviceSchema {
        device: DEVICE,
        tag: TAG,
        time_col: "time",
        encoding: TimeEncoding::EpochNanos,
        required: REQUIRED.iter().map(|c| (*c, *c)).collect(),
        optional: OPTIONAL.iter().map(|c| (*c, *c)).collect(),
        category: CategoryRule::None,
    }
}
