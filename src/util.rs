use chrono::NaiveDate;
use std::{fs, io, path::Path};

/// The only date format accepted anywhere in the input data.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date.
///
/// This is stricter than `NaiveDate::parse_from_str`, which happily accepts `2023-6-1` or a
/// five digit year. We want exactly four digits, a dash, two digits, a dash, two digits.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let bytes = input.as_bytes();
    if bytes.len() != 10 {
        return None;
    }
    let shape_ok = bytes.iter().enumerate().all(|(idx, ch)| match idx {
        4 | 7 => *ch == b'-',
        _ => ch.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }
    NaiveDate::parse_from_str(input, DATE_FORMAT).ok()
}

/// The inverse of `parse_date`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// `true` if the string has no non-whitespace characters.
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Converts a not found error to Ok(false)
pub fn path_exists(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound) => Ok(false),
        Err(e) => Err(e),
    }
}

// error printing helper.
//
pub trait ResultExt {
    fn print_error(self) -> Self;
}

impl<T> ResultExt for Result<T, anyhow::Error> {
    fn print_error(self) -> Self {
        match self {
            Ok(v) => Ok(v),
            Err(error) => {
                println!("error: {}", error);
                let mut err: &dyn std::error::Error = error.as_ref();
                while let Some(cause) = err.source() {
                    println!("caused by: {}", cause);
                    err = cause;
                }
                Err(error)
            }
        }
    }
}

pub fn header(header: &str) {
    let len = header.len();
    print!("\n{}\n", header);
    for _ in 0..len {
        print!("=");
    }
    println!("\n")
}
