//! The adaptive-coordinates file format.
//!
//! A plain-text format, optionally gzip-compressed:
//!
//! ```text
//! $TYPE ADAPTIVE_COORDINATES
//! $FILE_FORMAT_VERSION 1.0
//! $XDIM 2
//! $YDIM 2
//! $ZDIM 2
//! $THRESHOLDS 1.0 2.0
//! 0 0 0.0 0.0 0.0 0.0
//! 1 0 0.7 0.1 1.0 0.0
//! ...
//! ```
//!
//! Header lines begin with `$`, comments with `#`; the first other line
//! starts the data. One data line per (x, y) cell in row-major order,
//! holding the adaptive position for every threshold. A file is rejected
//! when any (x, y) combination is missing or duplicated, or when `$ZDIM`
//! disagrees with the threshold count.

use crate::adaptive::AdaptiveCoordinates;
use crate::error::{KarttaError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Type tag of adaptive-coordinates files.
const TYPE_TAG: &str = "ADAPTIVE_COORDINATES";

/// Format version written by this crate.
const FORMAT_VERSION: &str = "1.0";

/// The gzip magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Reader/writer for adaptive-coordinates files.
pub struct CoordinatesFormat;

impl CoordinatesFormat {
    /// Writes the stack to a file, gzip-compressed when `compress` is
    /// set.
    pub fn write<P: AsRef<Path>>(
        path: P,
        coords: &AdaptiveCoordinates,
        compress: bool,
    ) -> Result<()> {
        let file = File::create(path)?;
        if compress {
            let mut writer = BufWriter::new(GzEncoder::new(file, Compression::default()));
            Self::write_to(&mut writer, coords)?;
            writer.flush()?;
        } else {
            let mut writer = BufWriter::new(file);
            Self::write_to(&mut writer, coords)?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Writes the stack to any writer.
    pub fn write_to<W: Write>(writer: &mut W, coords: &AdaptiveCoordinates) -> Result<()> {
        writeln!(writer, "$TYPE {}", TYPE_TAG)?;
        writeln!(writer, "$FILE_FORMAT_VERSION {}", FORMAT_VERSION)?;
        writeln!(writer, "$XDIM {}", coords.xsize())?;
        writeln!(writer, "$YDIM {}", coords.ysize())?;
        writeln!(writer, "$ZDIM {}", coords.layers().len())?;
        write!(writer, "$THRESHOLDS")?;
        for t in coords.thresholds() {
            write!(writer, " {}", t)?;
        }
        writeln!(writer)?;

        for y in 0..coords.ysize() {
            for x in 0..coords.xsize() {
                write!(writer, "{} {}", x, y)?;
                for layer in 0..coords.layers().len() {
                    let (ax, ay) = coords
                        .position(layer, x, y)
                        .expect("position inside own grid");
                    write!(writer, " {} {}", ax, ay)?;
                }
                writeln!(writer)?;
            }
        }
        Ok(())
    }

    /// Reads a file, transparently decompressing gzip content.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<AdaptiveCoordinates> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let head = reader.fill_buf()?;
        let gzipped = head.len() >= 2 && head[0..2] == GZIP_MAGIC;
        if gzipped {
            Self::read_from(BufReader::new(GzDecoder::new(reader)))
        } else {
            Self::read_from(reader)
        }
    }

    /// Reads the stack from any buffered reader.
    pub fn read_from<R: BufRead>(reader: R) -> Result<AdaptiveCoordinates> {
        let mut xdim: Option<usize> = None;
        let mut ydim: Option<usize> = None;
        let mut zdim: Option<usize> = None;
        let mut type_seen = false;
        let mut thresholds: Vec<f64> = Vec::new();
        let mut coords: Option<AdaptiveCoordinates> = None;
        let mut seen: Vec<bool> = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(header) = line.strip_prefix('$') {
                if coords.is_some() {
                    return Err(KarttaError::Format(format!(
                        "header line {} after data start",
                        line_no + 1
                    )));
                }
                let (key, value) = header.split_once(char::is_whitespace).unwrap_or((header, ""));
                match key {
                    "TYPE" => {
                        if value.trim() != TYPE_TAG {
                            return Err(KarttaError::Format(format!(
                                "unexpected $TYPE '{}'",
                                value.trim()
                            )));
                        }
                        type_seen = true;
                    }
                    "FILE_FORMAT_VERSION" => {
                        if value.trim() != FORMAT_VERSION {
                            return Err(KarttaError::Format(format!(
                                "unsupported format version '{}'",
                                value.trim()
                            )));
                        }
                    }
                    "XDIM" => xdim = Some(parse_usize(value, "$XDIM")?),
                    "YDIM" => ydim = Some(parse_usize(value, "$YDIM")?),
                    "ZDIM" => zdim = Some(parse_usize(value, "$ZDIM")?),
                    "THRESHOLDS" => {
                        thresholds = value
                            .split(|c: char| c == ',' || c.is_whitespace())
                            .filter(|s| !s.is_empty())
                            .map(|s| {
                                s.parse::<f64>().map_err(|_| {
                                    KarttaError::Format(format!("bad threshold value '{}'", s))
                                })
                            })
                            .collect::<Result<Vec<f64>>>()?;
                    }
                    other => {
                        log::debug!("Ignoring unknown header ${}", other);
                    }
                }
                continue;
            }

            // First data line: headers must be complete and consistent.
            if coords.is_none() {
                let (x, y, z) = match (xdim, ydim, zdim) {
                    (Some(x), Some(y), Some(z)) => (x, y, z),
                    _ => {
                        return Err(KarttaError::Format(
                            "missing $XDIM/$YDIM/$ZDIM header".to_string(),
                        ))
                    }
                };
                if !type_seen {
                    return Err(KarttaError::Format("missing $TYPE header".to_string()));
                }
                if thresholds.len() != z {
                    return Err(KarttaError::Format(format!(
                        "$ZDIM {} does not match {} threshold values",
                        z,
                        thresholds.len()
                    )));
                }
                coords = Some(AdaptiveCoordinates::new(x, y, &thresholds)?);
                seen = vec![false; x * y];
            }

            let coords_ref = coords.as_mut().expect("initialized above");
            let fields: Vec<&str> = line.split_whitespace().collect();
            let expected = 2 + 2 * thresholds.len();
            if fields.len() != expected {
                return Err(KarttaError::Format(format!(
                    "data line {}: expected {} fields, found {}",
                    line_no + 1,
                    expected,
                    fields.len()
                )));
            }

            let x = parse_usize(fields[0], "unit x")?;
            let y = parse_usize(fields[1], "unit y")?;
            if x >= coords_ref.xsize() || y >= coords_ref.ysize() {
                return Err(KarttaError::Format(format!(
                    "data line {}: unit ({}, {}) outside {}x{}",
                    line_no + 1,
                    x,
                    y,
                    coords_ref.xsize(),
                    coords_ref.ysize()
                )));
            }
            let cell = y * coords_ref.xsize() + x;
            if seen[cell] {
                return Err(KarttaError::Format(format!(
                    "duplicate unit ({}, {})",
                    x, y
                )));
            }
            seen[cell] = true;

            for layer in 0..thresholds.len() {
                let ax = parse_f64(fields[2 + 2 * layer], "adaptive x")?;
                let ay = parse_f64(fields[3 + 2 * layer], "adaptive y")?;
                coords_ref.set_position(layer, x, y, ax, ay);
            }
        }

        let coords = coords.ok_or_else(|| {
            KarttaError::Format("file contains no coordinate data".to_string())
        })?;
        if let Some(missing) = seen.iter().position(|&s| !s) {
            let (x, y) = (missing % coords.xsize(), missing / coords.xsize());
            return Err(KarttaError::Format(format!(
                "missing unit ({}, {})",
                x, y
            )));
        }
        Ok(coords)
    }
}

fn parse_usize(value: &str, what: &str) -> Result<usize> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| KarttaError::Format(format!("bad {} value '{}'", what, value.trim())))
}

fn parse_f64(value: &str, what: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| KarttaError::Format(format!("bad {} value '{}'", what, value.trim())))
}
