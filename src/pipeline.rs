//! Session pipelines: project, score, then align, over one bounded window.

use chrono_tz::Tz;
use log::info;
use serde::Serialize;

use crate::align::{AlignParams, FusedTable, Fusion};
use crate::devices::{babolat, watch, zepp};
use crate::error::{PipelineError, Result};
use crate::project::project;
use crate::rescale::rescale;
use crate::score::{self, OutlierClip};
use crate::table::{EventTable, RawTable};
use crate::timebase::AnalysisWindow;

// Clock offsets and tolerance were read off plotted sessions for one specific
// set of devices. They are not derived from anything.
/// Babolat runs this many seconds ahead of the Zepp.
pub const BABOLAT_ZEPP_CLOCK_OFFSET_S: f64 = 5.0;
/// Zepp runs this many seconds ahead of the watch.
pub const WATCH_ZEPP_CLOCK_OFFSET_S: f64 = 1.0;
pub const MATCH_TOLERANCE_S: f64 = 5.0;

pub const ACC_X_NORM: &str = "AccXNorm1";
pub const GYRO_X_NORM: &str = "Gyro1Norm1";

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub tz: Tz,
    pub babolat_zepp: AlignParams,
    pub watch_zepp: AlignParams,
    pub outliers: OutlierClip,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tz: chrono_tz::America::Phoenix,
            babolat_zepp: AlignParams::from_secs(MATCH_TOLERANCE_S, BABOLAT_ZEPP_CLOCK_OFFSET_S),
            watch_zepp: AlignParams::from_secs(MATCH_TOLERANCE_S, WATCH_ZEPP_CLOCK_OFFSET_S),
            outliers: OutlierClip::default(),
        }
    }
}

/// Fused table plus the column lists a charting layer offers per device.
#[derive(Debug, Clone)]
pub struct SessionOutput {
    pub table: FusedTable,
    pub probe_signals: Vec<String>,
    pub reference_signals: Vec<String>,
    pub calc_signals: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalLists<'a> {
    pub probe: &'a [String],
    pub reference: &'a [String],
    pub calc: &'a [String],
}

impl SessionOutput {
    pub fn signals(&self) -> SignalLists<'_> {
        SignalLists {
            probe: &self.probe_signals,
            reference: &self.reference_signals,
            calc: &self.calc_signals,
        }
    }
}

/// Zepp swings (probe) matched against Babolat strokes, with ZIQ and PIQ.
pub fn tennis_session(
    bab_raw: &RawTable,
    zepp_raw: &RawTable,
    window: &AnalysisWindow,
    settings: &SessionSettings,
) -> Result<SessionOutput> {
    let mut bab = project(bab_raw, &babolat::schema(), window, settings.tz)?;
    let mut zep = project(zepp_raw, &zepp::tennis_schema(), window, settings.tz)?;

    score::apply_piq(&mut bab)?;
    zepp::add_diffxy(&mut zep)?;
    score::apply_ziq(&mut zep, &bab)?;
    settings.outliers.apply(&mut zep)?;
    if zep.is_empty() {
        return Err(PipelineError::empty(&zep.device));
    }

    let table = Fusion::new(&zep).join(&bab, settings.babolat_zepp).finish();
    let calc: Vec<&str> = zepp::CALC_SIGNALS
        .iter()
        .copied()
        .chain(score::ZIQ_COLUMNS)
        .collect();
    let out = SessionOutput {
        probe_signals: resolve_all(&table, &zep, &zep.columns),
        reference_signals: resolve_all(&table, &bab, &bab.columns),
        calc_signals: resolve_all(&table, &zep, &calc),
        table,
    };
    log_output("tennis", &out);
    Ok(out)
}

/// Watch samples (probe) matched against Zepp raw sensor signals, with the
/// watch's x acceleration mapped onto the Zepp accelerometer and gyro ranges.
pub fn wrist_calibration(
    watch_raw: &RawTable,
    zepp_raw: &RawTable,
    window: &AnalysisWindow,
    settings: &SessionSettings,
) -> Result<SessionOutput> {
    let mut wrist = project(watch_raw, &watch::schema(), window, settings.tz)?;
    let mut zep = project(zepp_raw, &zepp::tennis_schema(), window, settings.tz)?;
    settings.outliers.clip_sensor(&mut zep)?;
    if zep.is_empty() {
        return Err(PipelineError::empty(&zep.device));
    }

    let acc = rescale(zepp::ACC_1, &zep, watch::ACCELERATION_X, &wrist)?;
    let gyro = rescale(zepp::GYRO_1, &zep, watch::ACCELERATION_X, &wrist)?;
    wrist.add_column(ACC_X_NORM, acc)?;
    wrist.add_column(GYRO_X_NORM, gyro)?;

    let table = Fusion::new(&wrist).join(&zep, settings.watch_zepp).finish();
    let out = SessionOutput {
        probe_signals: resolve_all(&table, &wrist, &wrist.columns),
        reference_signals: resolve_all(&table, &zep, &zepp::SENSOR_SIGNALS),
        calc_signals: resolve_all(&table, &wrist, &[ACC_X_NORM, GYRO_X_NORM]),
        table,
    };
    log_output("calibrate", &out);
    Ok(out)
}

/// Watch samples (probe) matched against Zepp golf swings.
pub fn golf_session(
    watch_raw: &RawTable,
    golf_raw: &RawTable,
    window: &AnalysisWindow,
    settings: &SessionSettings,
) -> Result<SessionOutput> {
    let wrist = project(watch_raw, &watch::schema(), window, settings.tz)?;
    let swings = project(golf_raw, &zepp::golf::schema(), window, settings.tz)?;

    let table = Fusion::new(&wrist).join(&swings, settings.watch_zepp).finish();
    let out = SessionOutput {
        probe_signals: resolve_all(&table, &wrist, &wrist.columns),
        reference_signals: resolve_all(&table, &swings, &swings.columns),
        calc_signals: Vec::new(),
        table,
    };
    log_output("golf", &out);
    Ok(out)
}

fn resolve_all<S: AsRef<str>>(table: &FusedTable, source: &EventTable, cols: &[S]) -> Vec<String> {
    cols.iter()
        .filter_map(|c| table.resolve(&source.tag, c.as_ref()))
        .map(str::to_string)
        .collect()
}

fn log_output(name: &str, out: &SessionOutput) {
    let matched: Vec<String> = out
        .table
        .matched
        .iter()
        .map(|(tag, n)| format!("{tag}={n}"))
        .collect();
    info!(
        "{name}: {} fused row(s), {} column(s), matched {}",
        out.table.rows.len(),
        out.table.columns.len(),
        matched.join(" ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::read_csv;
    use crate::table::Field;
    use chrono_tz::America::Phoenix;

    // 2024-06-12 17:00:00 Phoenix
    const T0_MS: i64 = 1_718_236_800_000;

    fn window() -> AnalysisWindow {
        AnalysisWindow::parse("2024-06-12", "2024-06-13", Phoenix, 30).unwrap()
    }

    fn babolat_csv(rows: &[(i64, &str, &str, [f64; 3])]) -> RawTable {
        let mut s = String::from(
            "time,type,spin,StyleScore,StyleValue,EffectScore,EffectValue,SpeedScore,SpeedValue,stroke_counter\n",
        );
        for (i, (secs, ty, spin, [style, effect, speed])) in rows.iter().enumerate() {
            let raw = (T0_MS / 1000 + secs) * babolat::TIME_DIVISOR;
            s.push_str(&format!("{raw},{ty},{spin},{style},1,{effect},1,{speed},1,{i}\n"));
        }
        read_csv("babolat", s.as_bytes()).unwrap()
    }

    /// (seconds after T0, swing_type, swing_side, ball_spin, racket_speed, x, y)
    fn zepp_csv(rows: &[(i64, i64, i64, f64, f64, f64, f64)]) -> RawTable {
        let mut header: Vec<&str> = vec!["l_id", "swing_type", "swing_side"];
        header.extend(zepp::SENSOR_SIGNALS);
        header.extend(zepp::CALC_SIGNALS);
        let mut s = header.join(",");
        s.push('\n');
        for (secs, ty, side, spin, speed, x, y) in rows {
            let mut cells = vec![
                (T0_MS + secs * 1000).to_string(),
                ty.to_string(),
                side.to_string(),
            ];
            cells.extend(zepp::SENSOR_SIGNALS.iter().map(|_| "100".to_string()));
            for c in zepp::CALC_SIGNALS {
                let v = match c {
                    zepp::BALL_SPIN => *spin,
                    zepp::RACKET_SPEED => *speed,
                    zepp::IMPACT_X => *x,
                    zepp::IMPACT_Y => *y,
                    _ => 1.0,
                };
                cells.push(v.to_string());
            }
            s.push_str(&cells.join(","));
            s.push('\n');
        }
        read_csv("zepp", s.as_bytes()).unwrap()
    }

    #[test]
    fn tennis_session_scores_and_aligns() {
        // Babolat clock runs 5s ahead: its 5s/15s/25s events belong to Zepp's 0s/10s/20s
        let bab = babolat_csv(&[
            (5, "FOREHAND", "LIFTED", [50.0, 20.0, 60.0]),
            (15, "SERVE", "FLAT", [70.0, 40.0, 80.0]),
            (25, "BACKHAND", "SLICED", [90.0, 60.0, 100.0]),
        ]);
        let zep = zepp_csv(&[
            (0, 2, 0, 100.0, 20.0, 0.0, 0.0),
            (10, 3, 0, 200.0, 30.0, 1.0, 1.0),
            (20, 0, 1, 300.0, 40.0, 2.0, 2.0),
            (60, 1, 0, 150.0, 25.0, 0.5, 0.5),
        ]);
        let out = tennis_session(&bab, &zep, &window(), &SessionSettings::default()).unwrap();

        let t = &out.table;
        assert_eq!(t.rows.len(), 4);
        assert_eq!(t.matched, vec![("bab".to_string(), 3)]);
        let labels: Vec<String> = t.rows.iter().map(|r| r.category.unwrap().label()).collect();
        assert_eq!(labels, vec!["TOPSPINFH", "SERVEFH", "SLICEBH", "FLATFH"]);

        let piq = t.column("PIQ").unwrap();
        assert_eq!(piq[0], Some(130.0));
        assert_eq!(piq[3], None);

        // row 0: spin min -> 20 (x2), speed min -> 60 (x1.6), dead centre -> 90
        let ziq = t.column("ZIQ").unwrap();
        assert!((ziq[0].unwrap() - (40.0 + 96.0 + 90.0)).abs() < 1e-9);

        assert!(out.calc_signals.contains(&"ZIQ".to_string()));
        assert!(out.reference_signals.contains(&"SpeedScore".to_string()));
        assert!(out.probe_signals.contains(&"diffxy".to_string()));
        assert!(t.rows.windows(2).all(|w| w[0].time <= w[1].time));
    }

    #[test]
    fn tennis_session_needs_both_devices_in_window() {
        let bab = babolat_csv(&[(86_400 * 5, "SERVE", "FLAT", [1.0, 1.0, 1.0])]);
        let zep = zepp_csv(&[(0, 2, 0, 100.0, 20.0, 0.0, 0.0)]);
        let err = tennis_session(&bab, &zep, &window(), &SessionSettings::default()).unwrap_err();
        match err {
            PipelineError::EmptyResult { device } => assert_eq!(device, "babolat"),
            other => panic!("unexpected {other:?}"),
        }
    }

    fn watch_csv(rows: &[(i64, f64)]) -> RawTable {
        let mut s = String::from(
            "time,accelerationX,accelerationY,accelerationZ,rotationRateX,rotationRateY,rotationRateZ\n",
        );
        for (secs, ax) in rows {
            let ns = (T0_MS + secs * 1000) * 1_000_000;
            s.push_str(&format!("{ns},{ax},0,0,0,0,0\n"));
        }
        read_csv("watch", s.as_bytes()).unwrap()
    }

    #[test]
    fn wrist_calibration_maps_watch_onto_zepp_ranges() {
        let wrist = watch_csv(&[(0, -1.0), (1, 0.0), (2, 1.0)]);
        let zep = zepp_csv(&[(3, 2, 0, 100.0, 20.0, 0.0, 0.0), (40, 1, 0, 100.0, 20.0, 0.0, 0.0)]);

        let out = wrist_calibration(&wrist, &zep, &window(), &SessionSettings::default()).unwrap();
        // every zepp dbg signal is the constant 100, so both targets collapse to it
        assert_eq!(
            out.table.column(ACC_X_NORM).unwrap(),
            vec![Some(100.0), Some(100.0), Some(100.0)]
        );
        // zepp t=3 shifted back 1s -> t=2, nearest watch sample wins it
        assert_eq!(out.table.matched, vec![("zepp".to_string(), 1)]);
        assert_eq!(out.table.rows[2].category.map(|c| c.label()), Some("TOPSPINFH".to_string()));
        assert_eq!(out.calc_signals, vec![ACC_X_NORM, GYRO_X_NORM]);
        assert_eq!(out.reference_signals.len(), zepp::SENSOR_SIGNALS.len());
    }

    #[test]
    fn wrist_calibration_ignores_accelerometer_artifacts() {
        let wrist = watch_csv(&[(0, -1.0), (1, 0.0), (2, 1.0)]);
        let mut zep = zepp_csv(&[
            (1, 2, 0, 100.0, 20.0, 0.0, 0.0),
            (3, 1, 0, 100.0, 20.0, 0.0, 0.0),
        ]);
        let acc1 = zep.find_column(zepp::ACC_1).unwrap();
        zep.rows[1][acc1] = Field::Int(25_000);

        let out = wrist_calibration(&wrist, &zep, &window(), &SessionSettings::default()).unwrap();
        assert_eq!(
            out.table.column(ACC_X_NORM).unwrap(),
            vec![Some(100.0), Some(100.0), Some(100.0)]
        );
        assert_eq!(
            out.table.column(zepp::ACC_1).unwrap(),
            vec![Some(100.0), None, None]
        );
        assert_eq!(out.table.matched, vec![("zepp".to_string(), 1)]);
    }

    #[test]
    fn golf_session_joins_swings_without_categories() {
        let wrist = watch_csv(&[(0, 0.5), (1, 0.5), (2, 0.5), (30, 0.5)]);
        let mut s = String::from("L_ID,");
        s.push_str(&zepp::golf::SIGNALS.join(","));
        s.push_str(",HAND\n");
        s.push_str(&(T0_MS + 3000).to_string());
        for _ in zepp::golf::SIGNALS {
            s.push_str(",7");
        }
        s.push_str(",1\n");
        let golf = read_csv("zepp-golf", s.as_bytes()).unwrap();

        let out = golf_session(&wrist, &golf, &window(), &SessionSettings::default()).unwrap();
        let t = &out.table;
        assert_eq!(t.rows.len(), 4);
        assert_eq!(t.matched, vec![("zepp".to_string(), 1)]);
        assert!(t.rows.iter().all(|r| r.category.is_none()));
        assert_eq!(t.column("SCORE").unwrap(), vec![None, None, Some(7.0), None]);
        assert!(out.reference_signals.contains(&"HAND".to_string()));
        assert!(out.calc_signals.is_empty());
    }
}
