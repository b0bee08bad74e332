//! Raw rows -> canonical, windowed, deduplicated event table.

use std::collections::HashSet;

use chrono_tz::Tz;
use log::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::stroke::Stroke;
use crate::table::{DeviceEvent, EventTable, Field, RawTable};
use crate::timebase::{self, AnalysisWindow, TimeEncoding};

#[derive(Debug, Clone, Copy)]
pub enum CategoryRule {
    None,
    Babolat {
        type_col: &'static str,
        spin_col: &'static str,
    },
    Zepp {
        type_col: &'static str,
        side_col: &'static str,
    },
}

/// Fixed layout of one vendor table.
#[derive(Debug, Clone)]
pub struct DeviceSchema {
    pub device: &'static str,
    pub tag: &'static str,
    pub time_col: &'static str,
    pub encoding: TimeEncoding,
    /// (source column, canonical name)
    pub required: Vec<(&'static str, &'static str)>,
    /// Kept when present in the header, otherwise skipped silently.
    pub optional: Vec<(&'static str, &'static str)>,
    pub category: CategoryRule,
}

enum CategoryCols {
    None,
    Babolat(usize, usize),
    Zepp(usize, usize),
}

pub fn project(
    raw: &RawTable,
    schema: &DeviceSchema,
    window: &AnalysisWindow,
    tz: Tz,
) -> Result<EventTable> {
    let time_idx = raw.column_index(schema.time_col)?;

    let mut value_cols: Vec<(usize, &'static str)> = Vec::with_capacity(schema.required.len());
    for (src, canon) in &schema.required {
        value_cols.push((raw.column_index(src)?, canon));
    }
    let n_required = value_cols.len();
    for (src, canon) in &schema.optional {
        match raw.find_column(src) {
            Some(idx) => value_cols.push((idx, canon)),
            None => debug!("{}: optional column '{src}' not present", schema.device),
        }
    }

    let cats = match schema.category {
        CategoryRule::None => CategoryCols::None,
        CategoryRule::Babolat { type_col, spin_col } => {
            CategoryCols::Babolat(raw.column_index(type_col)?, raw.column_index(spin_col)?)
        }
        CategoryRule::Zepp { type_col, side_col } => {
            CategoryCols::Zepp(raw.column_index(type_col)?, raw.column_index(side_col)?)
        }
    };

    let columns = value_cols.iter().map(|(_, c)| c.to_string()).collect();
    let mut out = EventTable::new(schema.device, schema.tag, columns);

    let mut rejected = 0usize;
    let mut incomplete = 0usize;
    let mut outside = 0usize;
    let mut seen: HashSet<(i64, Option<Stroke>, Vec<u64>)> = HashSet::new();
    let mut duplicates = 0usize;

    for row in &raw.rows {
        let time = match timebase::normalize(cell(row, time_idx), schema.encoding, tz) {
            Ok(t) => t,
            Err(e) => {
                debug!("{}: rejected record: {e}", schema.device);
                rejected += 1;
                continue;
            }
        };

        let mut values = Vec::with_capacity(value_cols.len());
        let mut complete = true;
        for (i, (idx, _)) in value_cols.iter().enumerate() {
            match cell(row, *idx).as_f64() {
                Some(v) => values.push(v),
                None if i < n_required => {
                    complete = false;
                    break;
                }
                None => values.push(f64::NAN),
            }
        }
        if !complete {
            incomplete += 1;
            continue;
        }

        if !window.contains(&time) {
            outside += 1;
            continue;
        }

        let category = match cats {
            CategoryCols::None => None,
            CategoryCols::Babolat(t, s) => Some(Stroke::from_babolat(
                cell(row, t).as_text(),
                cell(row, s).as_text(),
            )),
            CategoryCols::Zepp(t, s) => {
                Some(Stroke::from_zepp(code(cell(row, t)), code(cell(row, s))))
            }
        };

        let key = (
            time.timestamp_nanos_opt().unwrap_or(i64::MIN),
            category,
            values.iter().map(|v| v.to_bits()).collect(),
        );
        if !seen.insert(key) {
            duplicates += 1;
            continue;
        }

        out.events.push(DeviceEvent { time, category, values });
    }

    if rejected > 0 {
        warn!("{}: rejected {rejected} record(s) with unusable timestamps", schema.device);
    }
    debug!(
        "{}: dropped {incomplete} incomplete, {outside} outside window, {duplicates} duplicate",
        schema.device
    );

    out.events.sort_by(|a, b| a.time.cmp(&b.time));

    if out.is_empty() {
        return Err(PipelineError::empty(schema.device));
    }
    info!("{}: {} event(s) in window", schema.device, out.len());
    Ok(out)
}

static NULL: Field = Field::Null;

fn cell(row: &[Field], idx: usize) -> &Field {
    row.get(idx).unwrap_or(&NULL)
}

fn code(f: &Field) -> Option<i64> {
    match f {
        Field::Int(i) => Some(*i),
        other => other.as_f64().filter(|v| v.fract() == 0.0).map(|v| v as i64),
    }
}
