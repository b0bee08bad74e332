//! Zepp U swing sensor, `swings` table (tennis and golf firmware).

use crate::error::Result;
use crate::project::{CategoryRule, DeviceSchema};
use crate::table::EventTable;
use crate::timebase::TimeEncoding;

pub const DEVICE: &str = "zepp";
pub const TAG: &str = "zepp";

pub const BALL_SPIN: &str = "ball_spin";
pub const RACKET_SPEED: &str = "racket_speed";
pub const IMPACT_X: &str = "impact_position_x";
pub const IMPACT_Y: &str = "impact_position_y";
pub const ACC_1: &str = "dbg_acc_1";
pub const ACC_3: &str = "dbg_acc_3";
pub const GYRO_1: &str = "dbg_gyro_1";

/// Raw debug signals the tennis firmware writes alongside each swing.
pub const SENSOR_SIGNALS: [&str; 17] = [
    ACC_1,
    "dbg_acc_2",
    ACC_3,
    GYRO_1,
    "dbg_gyro_2",
    "dbg_var_1",
    "dbg_var_2",
    "dbg_var_3",
    "dbg_var_4",
    "dbg_sum_gx",
    "dbg_sum_gy",
    "dbg_sv_ax",
    "dbg_sv_ay",
    "dbg_max_ax",
    "dbg_max_ay",
    "dbg_min_az",
    "dbg_max_az",
];

/// Values the sensor computes itself.
pub const CALC_SIGNALS: [&str; 7] = [
    "backswing_time",
    "power",
    BALL_SPIN,
    IMPACT_X,
    IMPACT_Y,
    RACKET_SPEED,
    "impact_region",
];

pub fn tennis_schema() -> DeviceSchema {
    DeviceSchema {
        device: DEVICE,
        tag: TAG,
        time_col: "l_id",
        encoding: TimeEncoding::EpochMillis,
        required: SENSOR_SIGNALS
            .iter()
            .chain(CALC_SIGNALS.iter())
            .map(|c| (*c, *c))
            .collect(),
        optional: Vec::new(),
        category: CategoryRule::Zepp {
            type_col: "swing_type",
            side_col: "swing_side",
        },
    }
}

/// Impact offset skew, `0.5 * x - y`.
pub fn add_diffxy(t: &mut EventTable) -> Result<()> {
    let x = t.column(IMPACT_X)?;
    let y = t.column(IMPACT_Y)?;
    let diff = x.iter().zip(&y).map(|(x, y)| 0.5 * x - y).collect();
    t.add_column("diffxy", diff)
}

pub mod golf {
    use super::*;

    pub const DEVICE: &str = "zepp-golf";
    pub const TAG: &str = "zepp";

    pub const SIGNALS: [&str; 14] = [
        "IMPACT_SPEED",
        "HAND_SPEED",
        "TWIST_ROTATION_RATE",
        "BACK_SWING_TEMPO_SLOW",
        "TRANSITION_TEMPO_FAST",
        "UPSWING__A_TIME",
        "UPSWING__B_TIME",
        "TWIST_TIME",
        "DOWNSWING_IMPACT_TIME",
        "ENDSWING_TIME",
        "CLUB_PLANE",
        "HAND_PLANE",
        "FACE_ANGLE",
        "SCORE",
    ];

    const OPTIONAL: [&str; 12] = [
        "UP_DOWN_SWING__GOF",
        "CLUB_FACE_GESTURE__GOF",
        "IMPACT_DETECT",
        "HAND_FIT",
        "SWING_TYPE",
        "CLUB_TYPE_1",
        "CLUB_TYPE_2",
        "CLUB_LENGTH",
        "CLUB_POSITION",
        "HAND",
        "USER_HEIGHT",
        "CLIENT_HOUR",
    ];

    pub fn schema() -> DeviceSchema {
        DeviceSchema {
            device: DEVICE,
            tag: TAG,
            time_col: "L_ID",
            encoding: TimeEncoding::EpochMillis,
            required: SIGNALS.iter().map(|c| (*c, *c)).collect(),
            optional: OPTIONAL.iter().map(|c| (*c, *c)).collect(),
            category: CategoryRule::None,
        }
    }
}
