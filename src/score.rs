//! Composite quality scores (ZIQ for Zepp, PIQ for Babolat).
//!
//! ZIQ grades a Zepp swing on spin, speed and sweet-spot placement, each axis
//! first mapped into the range of the matching Babolat score so the result
//! reads on the same scale as Babolat's PIQ.

use log::info;
use serde::{Deserialize, Serialize};

use crate::devices::{babolat, zepp};
use crate::error::Result;
use crate::rescale::{range_of, rescale, rescale_values};
use crate::stroke::Stroke;
use crate::table::EventTable;

pub const SPIN_MULTIPLIER: f64 = 2.0;
pub const SPEED_MULTIPLIER: f64 = 1.6;
pub const PLACEMENT_MULTIPLIER: f64 = 1.0;
/// Applied to the serve composite after summation.
pub const SERVE_DAMPING: f64 = 0.9;

pub const ABS_IMPACT: &str = "abs_imp";
pub const ZIQ_SPIN: &str = "ZIQspin";
pub const ZIQ_SPEED: &str = "ZIQspeed";
pub const ZIQ_POS: &str = "ZIQpos";
pub const ZIQ: &str = "ZIQ";
pub const PIQ: &str = "PIQ";

pub const ZIQ_COLUMNS: [&str; 4] = [ZIQ, ZIQ_SPIN, ZIQ_SPEED, ZIQ_POS];

/// Sweet-spot penalty: zero offset scores highest.
pub fn placement(x: f64, y: f64) -> f64 {
    -(x.abs() + y.abs())
}

/// Per-axis sub-scores after cross-scale rescaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubScores {
    pub speed: f64,
    pub spin: f64,
    pub placement: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Composite {
    /// Stored axis values, after their multipliers.
    pub speed: f64,
    pub spin: f64,
    pub placement: f64,
    pub total: f64,
}

pub fn composite(sub: SubScores, category: Option<Stroke>) -> Composite {
    let serve = category.is_some_and(|c| c.is_serve());
    let (spin, speed) = if serve {
        (sub.spin, sub.speed)
    } else {
        (sub.spin * SPIN_MULTIPLIER, sub.speed * SPEED_MULTIPLIER)
    };
    let placement = sub.placement * PLACEMENT_MULTIPLIER;
    let mut total = speed + spin + placement;
    if serve {
        total *= SERVE_DAMPING;
    }
    Composite {
        speed,
        spin,
        placement,
        total,
    }
}

/// Append the ZIQ columns to the Zepp table, using the Babolat batch as the
/// reference scale.
pub fn apply_ziq(zepp_t: &mut EventTable, bab: &EventTable) -> Result<()> {
    let spin = rescale(babolat::EFFECT_SCORE, bab, zepp::BALL_SPIN, zepp_t)?;
    let speed = rescale(babolat::SPEED_SCORE, bab, zepp::RACKET_SPEED, zepp_t)?;

    let xs = zepp_t.column(zepp::IMPACT_X)?;
    let ys = zepp_t.column(zepp::IMPACT_Y)?;
    let abs_imp: Vec<f64> = xs.iter().zip(&ys).map(|(x, y)| placement(*x, *y)).collect();
    let pos = rescale_values(range_of(bab, babolat::STYLE_SCORE)?, &abs_imp, &zepp_t.device)?;

    let scores: Vec<Composite> = zepp_t
        .events
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let sub = SubScores {
                speed: speed[i],
                spin: spin[i],
                placement: pos[i],
            };
            composite(sub, e.category)
        })
        .collect();

    zepp_t.add_column(ABS_IMPACT, abs_imp)?;
    zepp_t.add_column(ZIQ_SPIN, scores.iter().map(|c| c.spin).collect())?;
    zepp_t.add_column(ZIQ_SPEED, scores.iter().map(|c| c.speed).collect())?;
    zepp_t.add_column(ZIQ_POS, scores.iter().map(|c| c.placement).collect())?;
    zepp_t.add_column(ZIQ, scores.iter().map(|c| c.total).collect())?;
    Ok(())
}

/// Babolat's own quality index: the plain sum of its three scores.
pub fn apply_piq(bab: &mut EventTable) -> Result<()> {
    let speed = bab.column(babolat::SPEED_SCORE)?;
    let style = bab.column(babolat::STYLE_SCORE)?;
    let effect = bab.column(babolat::EFFECT_SCORE)?;
    let piq = speed
        .iter()
        .zip(&style)
        .zip(&effect)
        .map(|((a, b), c)| a + b + c)
        .collect();
    bab.add_column(PIQ, piq)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierClip {
    pub acc_limit: f64,
    pub score_limit: f64,
}

impl Default for OutlierClip {
    fn default() -> Self {
        Self {
            acc_limit: 10_000.0,
            score_limit: 10_000.0,
        }
    }
}

impl OutlierClip {
    /// Drop rows with raw accelerometer readings at or above `acc_limit`.
    pub fn clip_sensor(&self, zepp_t: &mut EventTable) -> Result<usize> {
        let acc1 = zepp_t.column_index(zepp::ACC_1)?;
        let acc3 = zepp_t.column_index(zepp::ACC_3)?;
        Ok(clip(zepp_t, "sensor", |v| v[acc1] < self.acc_limit && v[acc3] < self.acc_limit))
    }

    /// Drop rows whose `ZIQ` is at or above `score_limit`.
    pub fn clip_score(&self, zepp_t: &mut EventTable) -> Result<usize> {
        let ziq = zepp_t.column_index(ZIQ)?;
        Ok(clip(zepp_t, "score", |v| v[ziq] < self.score_limit))
    }

    /// Both clips, for a table that already carries `ZIQ`.
    pub fn apply(&self, zepp_t: &mut EventTable) -> Result<usize> {
        Ok(self.clip_sensor(zepp_t)? + self.clip_score(zepp_t)?)
    }
}

fn clip<F>(t: &mut EventTable, kind: &str, keep: F) -> usize
where
    F: Fn(&[f64]) -> bool,
{
    let before = t.len();
    t.retain(|e| keep(&e.values));
    let dropped = before - t.len();
    if dropped > 0 {
        info!("{}: clipped {dropped} {kind} outlier row(s)", t.device);
    }
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::{Side, SwingKind};
    use crate::table::tests::table;

    const TOPSPIN: Stroke = Stroke::new(SwingKind::Topspin, Side::Forehand);

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn rally_axes_are_boosted_before_summing() {
        let c = composite(
            SubScores {
                speed: 10.0,
                spin: 5.0,
                placement: 3.0,
            },
            Some(TOPSPIN),
        );
        assert!(approx(c.spin, 10.0));
        assert!(approx(c.speed, 16.0));
        assert!(approx(c.total, 29.0));
    }

    #[test]
    fn serve_is_damped_after_summing() {
        let sub = SubScores {
            speed: 10.0,
            spin: 5.0,
            placement: 3.0,
        };
        let serve = composite(sub, Some(Stroke::SERVE));
        assert!(approx(serve.total, 0.9 * (10.0 + 5.0 + 3.0)));

        // the serve formula is the rally formula with unit axis multipliers, then x0.9
        let rally = composite(
            SubScores {
                speed: sub.speed / SPEED_MULTIPLIER,
                spin: sub.spin / SPIN_MULTIPLIER,
                placement: sub.placement,
            },
            Some(TOPSPIN),
        );
        assert!(approx(serve.total, SERVE_DAMPING * rally.total));
    }

    #[test]
    fn uncategorized_events_use_rally_weights() {
        let c = composite(
            SubScores {
                speed: 1.0,
                spin: 1.0,
                placement: 0.0,
            },
            None,
        );
        assert!(approx(c.total, 3.6));
    }

    fn zepp_fixture(offsets: &[(f64, f64)]) -> EventTable {
        let rows: Vec<(i64, Vec<f64>)> = offsets
            .iter()
            .enumerate()
            .map(|(i, (x, y))| {
                let n = i as f64;
                (i as i64, vec![100.0 + n, 20.0 + n, *x, *y, 1.0, 1.0])
            })
            .collect();
        let rows_ref: Vec<(i64, &[f64])> = rows.iter().map(|(t, v)| (*t, v.as_slice())).collect();
        let mut t = table(
            "zepp",
            "zepp",
            &[
                zepp::BALL_SPIN,
                zepp::RACKET_SPEED,
                zepp::IMPACT_X,
                zepp::IMPACT_Y,
                zepp::ACC_1,
                zepp::ACC_3,
            ],
            &rows_ref,
        );
        for e in &mut t.events {
            e.category = Some(TOPSPIN);
        }
        t
    }

    fn babolat_fixture() -> EventTable {
        table(
            "babolat",
            "bab",
            &[babolat::STYLE_SCORE, babolat::EFFECT_SCORE, babolat::SPEED_SCORE],
            &[(0, &[10.0, 0.0, 30.0]), (1, &[90.0, 100.0, 70.0])],
        )
    }

    #[test]
    fn centered_contact_gets_top_placement_score() {
        let mut z = zepp_fixture(&[(3.0, -1.0), (0.0, 0.0), (-2.0, 0.5), (5.0, 5.0)]);
        apply_ziq(&mut z, &babolat_fixture()).unwrap();
        let pos = z.column(ZIQ_POS).unwrap();
        let abs_imp = z.column(ABS_IMPACT).unwrap();

        let best = pos.iter().cloned().fold(f64::MIN, f64::max);
        assert!(approx(pos[1], best));
        assert!(approx(best, 90.0));
        // larger total offset never scores higher
        for i in 0..pos.len() {
            for j in 0..pos.len() {
                if abs_imp[i] < abs_imp[j] {
                    assert!(pos[i] <= pos[j]);
                }
            }
        }
    }

    #[test]
    fn ziq_columns_are_appended() {
        let mut z = zepp_fixture(&[(0.0, 0.0), (1.0, 1.0)]);
        apply_ziq(&mut z, &babolat_fixture()).unwrap();
        for col in [ABS_IMPACT, ZIQ_SPIN, ZIQ_SPEED, ZIQ_POS, ZIQ] {
            assert!(z.has_column(col), "{col}");
        }
        // row 1: spin max -> 100 * 2, speed max -> 70 * 1.6, pos min -> 10
        let ziq = z.column(ZIQ).unwrap();
        assert!(approx(ziq[1], 200.0 + 112.0 + 10.0));
    }

    #[test]
    fn outliers_are_clipped() {
        let mut z = zepp_fixture(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        apply_ziq(&mut z, &babolat_fixture()).unwrap();
        let acc1 = z.column_index(zepp::ACC_1).unwrap();
        z.events[0].values[acc1] = 10_000.0;
        let dropped = OutlierClip::default().apply(&mut z).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(z.len(), 2);
    }

    #[test]
    fn sensor_clip_works_without_scores() {
        let mut z = zepp_fixture(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        let acc3 = z.column_index(zepp::ACC_3).unwrap();
        z.events[2].values[acc3] = 25_000.0;
        let clip = OutlierClip::default();
        assert_eq!(clip.clip_sensor(&mut z).unwrap(), 1);
        assert_eq!(z.len(), 2);
        assert!(clip.clip_score(&mut z).is_err());
    }

    #[test]
    fn piq_is_the_score_sum() {
        let mut b = babolat_fixture();
        apply_piq(&mut b).unwrap();
        assert_eq!(b.column(PIQ).unwrap(), vec![40.0, 260.0]);
    }
}
