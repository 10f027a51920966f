//! Tabular allocation data records
//!
//! Input is delimited text with a header row naming at least `date`, `lon`,
//! `lat`, `species`, and `value` columns, plus an optional `bin` column for
//! size-resolved data. Column order is free; unknown columns are ignored.

use crate::core::error::{PelagosError, Result};
use chrono::NaiveDate;
use std::path::Path;

/// One point observation from the allocation data source
#[derive(Debug, Clone)]
pub struct ObservationRecord {
    pub date: NaiveDate,
    pub lon: f64,
    pub lat: f64,
    pub value: f64,
    pub species: String,
    /// Age/size bin for size-resolved sources
    pub bin: Option<usize>,
}

struct ColumnLayout {
    date: usize,
    lon: usize,
    lat: usize,
    species: usize,
    value: usize,
    bin: Option<usize>,
}

impl ColumnLayout {
    fn from_header(header: &str) -> Result<Self> {
        let names: Vec<&str> = header.split(',').map(str::trim).collect();
        let find = |name: &str| {
            names
                .iter()
                .position(|n| n.eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    PelagosError::AllocationData(format!("missing required column: {name}"))
                })
        };
        Ok(Self {
            date: find("date")?,
            lon: find("lon")?,
            lat: find("lat")?,
            species: find("species")?,
            value: find("value")?,
            bin: names.iter().position(|n| n.eq_ignore_ascii_case("bin")),
        })
    }
}

/// Parse records from delimited text
pub fn read_observations_str(text: &str) -> Result<Vec<ObservationRecord>> {
    let mut lines = text.lines().enumerate();
    let (_, header) = lines.next().ok_or_else(|| {
        PelagosError::AllocationData("allocation data is empty (no header row)".into())
    })?;
    let layout = ColumnLayout::from_header(header)?;

    let mut records = Vec::new();
    for (line_no, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_line(line, line_no + 1, &layout)?);
    }
    Ok(records)
}

/// Read records from a file on disk
pub fn read_observations(path: &Path) -> Result<Vec<ObservationRecord>> {
    let content = std::fs::read_to_string(path)?;
    read_observations_str(&content)
}

fn parse_line(line: &str, line_no: usize, layout: &ColumnLayout) -> Result<ObservationRecord> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let field = |idx: usize, name: &str| {
        fields.get(idx).copied().ok_or_else(|| {
            PelagosError::AllocationData(format!("line {line_no}: missing {name} field"))
        })
    };
    let bad = |name: &str, raw: &str| {
        PelagosError::AllocationData(format!("line {line_no}: invalid {name} value {raw:?}"))
    };

    let date_raw = field(layout.date, "date")?;
    let date = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d")
        .map_err(|_| bad("date", date_raw))?;
    let lon_raw = field(layout.lon, "lon")?;
    let lon: f64 = lon_raw.parse().map_err(|_| bad("lon", lon_raw))?;
    let lat_raw = field(layout.lat, "lat")?;
    let lat: f64 = lat_raw.parse().map_err(|_| bad("lat", lat_raw))?;
    let value_raw = field(layout.value, "value")?;
    let value: f64 = value_raw.parse().map_err(|_| bad("value", value_raw))?;
    if !value.is_finite() || value < 0.0 {
        return Err(bad("value", value_raw));
    }
    let species = field(layout.species, "species")?.to_string();

    let bin = match layout.bin {
        Some(idx) => match fields.get(idx).copied().filter(|f| !f.is_empty()) {
            Some(raw) => Some(raw.parse::<usize>().map_err(|_| bad("bin", raw))?),
            None => None,
        },
        None => None,
    };

    Ok(ObservationRecord {
        date,
        lon,
        lat,
        value,
        species,
        bin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_basic_records() {
        let text = "date,lon,lat,species,value\n\
                    2017-01-01,120.5,-3.5,SKJ,10.0\n\
                    2017-01-01,121.5,-3.5,SKJ,5.0\n";
        let records = read_observations_str(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].species, "SKJ");
        assert_eq!(records[0].bin, None);
        assert!((records[1].value - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_column_order_is_free() {
        let text = "value,species,date,bin,lat,lon\n\
                    3.0,BET,2017-02-01,4,-1.0,122.0\n";
        let records = read_observations_str(text).unwrap();
        assert_eq!(records[0].bin, Some(4));
        assert!((records[0].lon - 122.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_column_fails() {
        let text = "date,lon,lat,value\n2017-01-01,1.0,1.0,1.0\n";
        assert!(read_observations_str(text).is_err());
    }

    #[test]
    fn test_negative_value_fails() {
        let text = "date,lon,lat,species,value\n2017-01-01,1.0,1.0,SKJ,-2.0\n";
        assert!(read_observations_str(text).is_err());
    }

    #[test]
    fn test_bad_date_reports_line() {
        let text = "date,lon,lat,species,value\n01/01/2017,1.0,1.0,SKJ,2.0\n";
        let err = read_observations_str(text).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let text = "date,lon,lat,species,value\n\n2017-01-01,1.0,1.0,SKJ,2.0\n\n";
        assert_eq!(read_observations_str(text).unwrap().len(), 1);
    }
}
