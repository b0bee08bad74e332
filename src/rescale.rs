//! Min-max mapping of one device's value range onto another's.

use crate::error::{PipelineError, Result};
use crate::table::EventTable;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleRange {
    pub min: f64,
    pub max: f64,
}

impl ScaleRange {
    /// Range over the finite values of a full column, `None` if there are none.
    pub fn of(values: &[f64]) -> Option<Self> {
        values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<ScaleRange>, v| match acc {
                None => Some(ScaleRange { min: v, max: v }),
                Some(r) => Some(ScaleRange {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }
}

/// Affine map `from -> onto`, fixed for one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rescaler {
    pub from: ScaleRange,
    pub onto: ScaleRange,
}

impl Rescaler {
    /// A zero-variance `from` range maps everything to 0.
    pub fn apply(&self, x: f64) -> f64 {
        if self.from.is_degenerate() {
            return 0.0;
        }
        (x - self.from.min) * self.onto.span() / self.from.span() + self.onto.min
    }

    pub fn apply_all(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|x| self.apply(*x)).collect()
    }
}

/// Values of `target[target_col]` expressed in the range of
/// `source[source_col]`. Both ranges span the whole loaded batch.
pub fn rescale(
    source_col: &str,
    source: &EventTable,
    target_col: &str,
    target: &EventTable,
) -> Result<Vec<f64>> {
    let onto = range_of(source, source_col)?;
    let values = target.column(target_col)?;
    rescale_values(onto, &values, &target.device)
}

/// Same as [`rescale`] for a target column that is not stored in a table yet.
pub fn rescale_values(onto: ScaleRange, values: &[f64], device: &str) -> Result<Vec<f64>> {
    let from = ScaleRange::of(values).ok_or_else(|| PipelineError::empty(device))?;
    Ok(Rescaler { from, onto }.apply_all(values))
}

pub fn range_of(table: &EventTable, col: &str) -> Result<ScaleRange> {
    ScaleRange::of(&table.column(col)?).ok_or_else(|| PipelineError::empty(&table.device))
}
