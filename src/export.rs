//! Fused table output for the charting layer.

use std::io::Write;

use serde::Serialize;

use crate::align::FusedTable;
use crate::error::Result;
use crate::stroke::Stroke;

pub fn write_csv<W: Write>(table: &FusedTable, writer: W) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    let mut header = vec!["time".to_string(), "stroke".to_string()];
    header.extend(table.columns.iter().cloned());
    w.write_record(&header)?;

    for row in &table.rows {
        let mut rec = Vec::with_capacity(header.len());
        rec.push(row.time.to_rfc3339());
        rec.push(row.category.map(|c| c.label()).unwrap_or_default());
        rec.extend(row.values.iter().map(|v| v.map(|v| v.to_string()).unwrap_or_default()));
        w.write_record(&rec)?;
    }
    w.flush()?;
    Ok(())
}

/// Keep only rows labelled with one of `strokes`.
pub fn filter_strokes(table: &FusedTable, strokes: &[Stroke]) -> FusedTable {
    let mut out = table.clone();
    out.rows
        .retain(|r| r.category.is_some_and(|c| strokes.contains(&c)));
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

/// count / mean / sample std / min / quartiles / max over the non-null cells
/// of each named column. Unknown names are skipped.
pub fn describe<S: AsRef<str>>(table: &FusedTable, columns: &[S]) -> Vec<ColumnSummary> {
    columns
        .iter()
        .filter_map(|name| {
            let name = name.as_ref();
            let mut vals: Vec<f64> = table.column(name)?.into_iter().flatten().collect();
            vals.sort_by(f64::total_cmp);
            Some(summarize(name, &vals))
        })
        .collect()
}

fn summarize(name: &str, sorted: &[f64]) -> ColumnSummary {
    let n = sorted.len();
    let mean = (n > 0).then(|| sorted.iter().sum::<f64>() / n as f64);
    let std = mean.filter(|_| n > 1).map(|m| {
        let ss: f64 = sorted.iter().map(|v| (v - m).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    });
    ColumnSummary {
        column: name.to_string(),
        count: n,
        mean,
        std,
        min: sorted.first().copied(),
        p25: quantile(sorted, 0.25),
        p50: quantile(sorted, 0.50),
        p75: quantile(sorted, 0.75),
        max: sorted.last().copied(),
    }
}

/// Linear interpolation between closest ranks.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::{AlignParams, Fusion};
    use crate::stroke::{Side, SwingKind};
    use crate::table::tests::table;

    fn fused() -> FusedTable {
        let mut probe = table(
            "zepp",
            "zepp",
            &["power"],
            &[(0, &[1.0]), (10, &[2.0]), (20, &[3.0]), (30, &[4.0])],
        );
        probe.events[0].category = Some(Stroke::SERVE);
        probe.events[1].category = Some(Stroke::new(SwingKind::Slice, Side::Backhand));
        let reference = table("babolat", "bab", &["SpeedScore"], &[(0, &[50.0])]);
        Fusion::new(&probe)
            .join(&reference, AlignParams::from_secs(1.0, 0.0))
            .finish()
    }

    #[test]
    fn csv_leaves_unmatched_cells_empty() {
        let mut buf = Vec::new();
        write_csv(&fused(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time,stroke,power,SpeedScore");
        assert!(lines[1].ends_with(",SERVEFH,1,50"), "{}", lines[1]);
        assert!(lines[2].ends_with(",SLICEBH,2,"), "{}", lines[2]);
        assert!(lines[3].ends_with(",,3,"), "{}", lines[3]);
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn describe_skips_nulls() {
        let stats = describe(&fused(), &["power", "SpeedScore", "nope"]);
        assert_eq!(stats.len(), 2);
        let power = &stats[0];
        assert_eq!(power.count, 4);
        assert_eq!(power.mean, Some(2.5));
        assert_eq!(power.p50, Some(2.5));
        assert_eq!(power.p25, Some(1.75));
        assert!((power.std.unwrap() - 1.2909944487358056).abs() < 1e-12);
        let speed = &stats[1];
        assert_eq!(speed.count, 1);
        assert_eq!(speed.std, None);
        assert_eq!(speed.max, Some(50.0));
    }

    #[test]
    fn stroke_filter_drops_unlabelled_rows() {
        let out = filter_strokes(&fused(), &[Stroke::SERVE]);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.columns, fused().columns);
    }
}
