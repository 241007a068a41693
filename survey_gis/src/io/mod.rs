//! File input and output helpers for point data.

pub mod gpx;
pub mod pnezd;

use std::fs::File;
use std::io::{self, Read, Write};

/// Reads a file to string.
pub fn read_to_string(path: &str) -> io::Result<String> {
    let mut buffer = String::new();
    File::open(path)?.read_to_string(&mut buffer)?;
    Ok(buffer)
}

/// Writes a string to a file, replacing any existing contents.
pub fn write_string(path: &str, data: &str) -> io::Result<()> {
    File::create(path)?.write_all(data.as_bytes())
}
