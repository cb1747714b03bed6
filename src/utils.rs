//! Utility functions.

use std::fs::{self, File};
use std::path::Path;
use std::io::{BufRead, BufReader, Read};

use flate2::read::MultiGzDecoder;

//-----------------------------------------------------------------------------

// Utilities for working with files.

/// Returns `true` if the file exists.
pub fn file_exists<P: AsRef<Path>>(filename: P) -> bool {
    fs::metadata(filename).is_ok()
}

/// Returns `true` if the file appears to be gzip-compressed.
pub fn is_gzipped<P: AsRef<Path>>(filename: P) -> bool {
    let file = File::open(filename).ok();
    if file.is_none() {
        return false;
    }
    let mut reader = BufReader::new(file.unwrap());
    let mut magic = [0; 2];
    let len = reader.read(&mut magic).ok();
    len == Some(2) && magic == [0x1F, 0x8B]
}

/// Returns a buffered reader for the file, which may be gzip-compressed.
pub fn open_file<P: AsRef<Path>>(filename: P) -> Result<Box<dyn BufRead>, String> {
    let file = File::open(&filename).map_err(|x| x.to_string())?;
    let inner = BufReader::new(file);
    if is_gzipped(&filename) {
        let inner = MultiGzDecoder::new(inner);
        Ok(Box::new(BufReader::new(inner)))
    } else {
        Ok(Box::new(inner))
    }
}

//-----------------------------------------------------------------------------

// Utilities for reporting percentages.

/// Rounds the value to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Returns `part / whole` as a percentage rounded to two decimal places, or 0 if `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2((part as f64 / whole as f64) * 100.0)
}

//-----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding() {
        assert_eq!(round2(33.333333), 33.33, "Wrong rounding for 33.333333");
        assert_eq!(round2(66.666666), 66.67, "Wrong rounding for 66.666666");
        assert_eq!(round2(100.0), 100.0, "Wrong rounding for 100.0");
    }

    #[test]
    fn percentages() {
        assert_eq!(percentage(1, 3), 33.33, "Wrong percentage for 1/3");
        assert_eq!(percentage(2, 2), 100.0, "Wrong percentage for 2/2");
        assert_eq!(percentage(5, 0), 0.0, "Percentage with zero denominator should be 0");
    }
}

//-----------------------------------------------------------------------------
