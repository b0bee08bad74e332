//! CSV exports of the vendor tables.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::info;

use crate::error::Result;
use crate::table::{Field, RawTable};

pub fn read_csv<R: Read>(device: &str, reader: R) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let columns = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let mut table = RawTable::new(device, columns);
    for rec in rdr.records() {
        let rec = rec?;
        table.push(rec.iter().map(Field::parse).collect());
    }
    Ok(table)
}

pub fn open_csv(device: &str, path: &Path) -> Result<RawTable> {
    let file = File::open(path)?;
    let table = read_csv(device, file)?;
    info!(
        "{device}: loaded {} row(s) x {} column(s) from {}",
        table.rows.len(),
        table.columns.len(),
        path.display()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_header_and_typed_cells() {
        let csv = "time, type ,SpeedScore\n17182368000000,FOREHAND,41.5\n";
        let t = read_csv("babolat", csv.as_bytes()).unwrap();
        assert_eq!(t.columns, vec!["time", "type", "SpeedScore"]);
        assert_eq!(
            t.rows[0],
            vec![
                Field::Int(17_182_368_000_000),
                Field::Text("FOREHAND".into()),
                Field::Float(41.5)
            ]
        );
    }

    #[test]
    fn short_rows_read_as_missing_cells() {
        let t = read_csv("watch", "time,accelerationX,accelerationY\n1,2\n".as_bytes()).unwrap();
        assert_eq!(t.rows[0].len(), 2);
        assert_eq!(t.find_column("accelerationY"), Some(2));
    }
}
