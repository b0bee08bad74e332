//! Raw decoded rows and projected per-device event tables.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::error::{PipelineError, Result};
use crate::stroke::Stroke;

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Field {
    /// Parse one CSV cell: integer first, then float, empty is null.
    pub fn parse(cell: &str) -> Self {
        let s = cell.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("null") {
            return Field::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Field::Int(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Field::Float(f);
        }
        Field::Text(s.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Field::Int(i) => Some(*i as f64),
            Field::Float(f) if f.is_finite() => Some(*f),
            Field::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Field::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Rows of named fields as they came off one device export.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub device: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Field>>,
}

impl RawTable {
    pub fn new(device: &str, columns: Vec<String>) -> Self {
        Self {
            device: device.to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.find_column(name)
            .ok_or_else(|| PipelineError::missing_column(&self.device, name))
    }

    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn push(&mut self, row: Vec<Field>) {
        self.rows.push(row);
    }
}

/// One detected physical event reported by one sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceEvent {
    pub time: DateTime<Tz>,
    pub category: Option<Stroke>,
    /// Parallel to the owning table's `columns`.
    pub values: Vec<f64>,
}

/// Canonical per-device table, ascending by time.
#[derive(Debug, Clone)]
pub struct EventTable {
    pub device: String,
    /// Suffix used when a column name collides with another device's.
    pub tag: String,
    pub columns: Vec<String>,
    pub events: Vec<DeviceEvent>,
}

impl EventTable {
    pub fn new(device: &str, tag: &str, columns: Vec<String>) -> Self {
        Self {
            device: device.to_string(),
            tag: tag.to_string(),
            columns,
            events: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PipelineError::missing_column(&self.device, name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.column_index(name)?;
        Ok(self.events.iter().map(|e| e.values[idx]).collect())
    }

    /// Append a derived column. Replacing one goes through `set_column`.
    pub fn add_column(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if self.has_column(name) {
            return Err(PipelineError::DuplicateColumn {
                device: self.device.clone(),
                column: name.to_string(),
            });
        }
        self.check_len(name, values.len())?;
        self.columns.push(name.to_string());
        for (e, v) in self.events.iter_mut().zip(values) {
            e.values.push(v);
        }
        Ok(())
    }

    /// Overwrite a column in place, e.g. after applying a multiplier.
    pub fn set_column(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        let idx = self.column_index(name)?;
        self.check_len(name, values.len())?;
        for (e, v) in self.events.iter_mut().zip(values) {
            e.values[idx] = v;
        }
        Ok(())
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&DeviceEvent) -> bool,
    {
        self.events.retain(|e| keep(e));
    }

    fn check_len(&self, name: &str, got: usize) -> Result<()> {
        if got != self.events.len() {
            return Err(PipelineError::LengthMismatch {
                device: self.device.clone(),
                column: name.to_string(),
                got,
                want: self.events.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn at(secs: i64) -> DateTime<Tz> {
        chrono_tz::America::Phoenix.timestamp_opt(1_718_200_000 + secs, 0).unwrap()
    }

    pub(crate) fn table(
        device: &str,
        tag: &str,
        cols: &[&str],
        rows: &[(i64, &[f64])],
    ) -> EventTable {
        let mut t = EventTable::new(device, tag, cols.iter().map(|c| c.to_string()).collect());
        for (secs, vals) in rows {
            t.events.push(DeviceEvent {
                time: at(*secs),
                category: None,
                values: vals.to_vec(),
            });
        }
        t
    }

    #[test]
    fn field_parse_prefers_integers() {
        assert_eq!(Field::parse("1718200000000"), Field::Int(1_718_200_000_000));
        assert_eq!(Field::parse("1.5"), Field::Float(1.5));
        assert_eq!(Field::parse(""), Field::Null);
        assert_eq!(Field::parse("NaN"), Field::Null);
        assert_eq!(Field::parse("FOREHAND"), Field::Text("FOREHAND".into()));
    }

    #[test]
    fn add_column_appends_and_checks_length() {
        let mut t = table("zepp", "zepp", &["a"], &[(0, &[1.0]), (1, &[2.0])]);
        t.add_column("b", vec![10.0, 20.0]).unwrap();
        assert_eq!(t.column("b").unwrap(), vec![10.0, 20.0]);
        assert_eq!(t.column("a").unwrap(), vec![1.0, 2.0]);

        let err = t.add_column("c", vec![1.0]).unwrap_err();
        assert!(matches!(err, PipelineError::LengthMismatch { got: 1, want: 2, .. }));
    }

    #[test]
    fn add_column_refuses_to_replace() {
        let mut t = table("zepp", "zepp", &["a"], &[(0, &[1.0])]);
        let err = t.add_column("a", vec![5.0]).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateColumn { .. }));
        assert_eq!(t.column("a").unwrap(), vec![1.0]);

        t.set_column("a", vec![5.0]).unwrap();
        assert_eq!(t.column("a").unwrap(), vec![5.0]);
        assert_eq!(t.columns, vec!["a"]);
    }

    #[test]
    fn missing_column_names_device() {
        let t = table("babolat", "bab", &["a"], &[]);
        let err = t.column("SpeedScore").unwrap_err();
        assert_eq!(err.to_string(), "babolat: expected column 'SpeedScore' is missing");
    }
}
