//! Nearest-match time joins across devices with fixed clock corrections.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;
use log::{debug, info};

use crate::stroke::Stroke;
use crate::table::EventTable;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignParams {
    /// Largest accepted |probe - shifted reference|.
    pub tolerance: TimeDelta,
    /// Subtracted from every reference timestamp before matching.
    pub clock_offset: TimeDelta,
}

impl AlignParams {
    pub fn from_secs(tolerance_s: f64, clock_offset_s: f64) -> Self {
        Self {
            tolerance: secs(tolerance_s),
            clock_offset: secs(clock_offset_s),
        }
    }
}

fn secs(s: f64) -> TimeDelta {
    TimeDelta::nanoseconds((s * 1e9).round() as i64)
}

/// One probe row and at most one reference row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedPair {
    pub probe: usize,
    pub reference: Option<usize>,
    /// probe time - shifted reference time
    pub delta: Option<TimeDelta>,
}

/// Pair every probe event with its nearest shifted reference event within
/// tolerance. Output follows probe time order; each probe appears once.
///
/// A reference event wanted by several probes stays with the closest one
/// (earliest probe on ties); the others are left unmatched rather than moved
/// to their next-best candidate.
pub fn align_as_of(
    probe: &EventTable,
    reference: &EventTable,
    params: AlignParams,
) -> Vec<AlignedPair> {
    let mut shifted: Vec<(DateTime<Tz>, usize)> = reference
        .events
        .iter()
        .enumerate()
        .map(|(i, e)| (e.time - params.clock_offset, i))
        .collect();
    shifted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut order: Vec<usize> = (0..probe.len()).collect();
    order.sort_by(|a, b| probe.events[*a].time.cmp(&probe.events[*b].time));

    // candidate per probe position, (reference idx, delta)
    let mut candidates: Vec<Option<(usize, TimeDelta)>> = Vec::with_capacity(order.len());
    for &pi in &order {
        let t = probe.events[pi].time;
        candidates.push(nearest(&shifted, t).filter(|(_, d)| d.abs() <= params.tolerance));
    }

    // reference idx -> (probe position, |delta|) of the current winner
    let mut claims: HashMap<usize, (usize, TimeDelta)> = HashMap::new();
    for (pos, cand) in candidates.iter().enumerate() {
        let Some((ri, d)) = cand else { continue };
        let dist = d.abs();
        let held = claims.get(ri).is_some_and(|(_, best)| *best <= dist);
        if !held {
            claims.insert(*ri, (pos, dist));
        }
    }

    let mut out = Vec::with_capacity(order.len());
    let mut matched = 0usize;
    for (pos, &pi) in order.iter().enumerate() {
        let pair = match candidates[pos] {
            Some((ri, d)) if claims.get(&ri).is_some_and(|(p, _)| *p == pos) => {
                matched += 1;
                AlignedPair {
                    probe: pi,
                    reference: Some(ri),
                    delta: Some(d),
                }
            }
            Some((ri, _)) => {
                debug!(
                    "{}: probe row {pi} lost reference row {ri} to a closer probe",
                    probe.device
                );
                AlignedPair {
                    probe: pi,
                    reference: None,
                    delta: None,
                }
            }
            None => AlignedPair {
                probe: pi,
                reference: None,
                delta: None,
            },
        };
        out.push(pair);
    }

    info!(
        "aligned {} -> {}: {matched}/{} probe row(s) matched (tolerance {}ms, offset {}ms)",
        probe.device,
        reference.device,
        out.len(),
        params.tolerance.num_milliseconds(),
        params.clock_offset.num_milliseconds()
    );
    out
}

/// Closest entry of a time-sorted slice; an earlier candidate wins a tie.
fn nearest(sorted: &[(DateTime<Tz>, usize)], t: DateTime<Tz>) -> Option<(usize, TimeDelta)> {
    let after = sorted.partition_point(|(rt, _)| *rt <= t);
    let backward = after.checked_sub(1).map(|i| sorted[i]);
    let forward_at = sorted.partition_point(|(rt, _)| *rt < t);
    let forward = sorted.get(forward_at).copied();

    match (backward, forward) {
        (Some((bt, bi)), Some((ft, fi))) => {
            let bd = t - bt;
            let fd = ft - t;
            if fd < bd {
                Some((fi, t - ft))
            } else {
                Some((bi, bd))
            }
        }
        (Some((bt, bi)), None) => Some((bi, t - bt)),
        (None, Some((ft, fi))) => Some((fi, t - ft)),
        (None, None) => None,
    }
}

// ---------------- fused output ----------------

#[derive(Debug, Clone, PartialEq)]
pub struct FusedRow {
    pub time: DateTime<Tz>,
    pub category: Option<Stroke>,
    pub values: Vec<Option<f64>>,
}

/// Analysis-ready table: probe columns, then each reference's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedTable {
    pub columns: Vec<String>,
    /// (device tag, original column name) for every entry in `columns`
    pub origins: Vec<(String, String)>,
    pub rows: Vec<FusedRow>,
    /// matched row count per reference tag, in join order
    pub matched: Vec<(String, usize)>,
}

impl FusedTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// Name under which `tag`'s `column` ended up after collision suffixing.
    pub fn resolve(&self, tag: &str, column: &str) -> Option<&str> {
        self.origins
            .iter()
            .position(|(t, c)| t == tag && c == column)
            .map(|i| self.columns[i].as_str())
    }
}

/// Builder joining a probe table against one or more references.
pub struct Fusion<'a> {
    probe: &'a EventTable,
    joins: Vec<(&'a EventTable, Vec<AlignedPair>)>,
}

impl<'a> Fusion<'a> {
    pub fn new(probe: &'a EventTable) -> Self {
        Self {
            probe,
            joins: Vec::new(),
        }
    }

    pub fn join(mut self, reference: &'a EventTable, params: AlignParams) -> Self {
        let pairs = align_as_of(self.probe, reference, params);
        self.joins.push((reference, pairs));
        self
    }

    pub fn finish(self) -> FusedTable {
        let tables: Vec<&EventTable> = std::iter::once(self.probe)
            .chain(self.joins.iter().map(|(t, _)| *t))
            .collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for t in &tables {
            for c in &t.columns {
                *counts.entry(c.as_str()).or_default() += 1;
            }
        }
        let mut columns = Vec::new();
        let mut origins = Vec::new();
        for t in &tables {
            for c in &t.columns {
                if counts[c.as_str()] > 1 {
                    columns.push(format!("{c}_{}", t.tag));
                } else {
                    columns.push(c.clone());
                }
                origins.push((t.tag.clone(), c.clone()));
            }
        }

        // probe idx -> reference idx, per join
        let lookups: Vec<Vec<Option<usize>>> = self
            .joins
            .iter()
            .map(|(_, pairs)| {
                let mut v = vec![None; self.probe.len()];
                for p in pairs {
                    v[p.probe] = p.reference;
                }
                v
            })
            .collect();

        let mut order: Vec<usize> = (0..self.probe.len()).collect();
        order.sort_by(|a, b| self.probe.events[*a].time.cmp(&self.probe.events[*b].time));

        let rows = order
            .into_iter()
            .map(|pi| {
                let pe = &self.probe.events[pi];
                let mut category = pe.category;
                let mut values: Vec<Option<f64>> = pe.values.iter().map(|v| finite(*v)).collect();
                for ((reference, _), lookup) in self.joins.iter().zip(&lookups) {
                    match lookup[pi].map(|ri| &reference.events[ri]) {
                        Some(re) => {
                            category = category.or(re.category);
                            values.extend(re.values.iter().map(|v| finite(*v)));
                        }
                        None => values.extend(std::iter::repeat_n(None, reference.columns.len())),
                    }
                }
                FusedRow {
                    time: pe.time,
                    category,
                    values,
                }
            })
            .collect();

        let matched = self
            .joins
            .iter()
            .map(|(t, pairs)| {
                let n = pairs.iter().filter(|p| p.reference.is_some()).count();
                (t.tag.clone(), n)
            })
            .collect();

        FusedTable {
            columns,
            origins,
            rows,
            matched,
        }
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}
