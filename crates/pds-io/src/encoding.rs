//! Text encodings accepted for input tables and result series.
//!
//! Optimization cases are commonly exported either as UTF-8 or as Latin-1
//! (ISO-8859-1). Latin-1 maps every byte to the code point of the same value,
//! so it is transcoded here without a lookup table.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use pds_core::{PdsError, PdsResult};
use serde::{Deserialize, Serialize};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
}

impl TextEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin1",
        }
    }

    /// Decode raw bytes into text. A leading UTF-8 byte-order mark is dropped.
    pub fn decode(&self, bytes: &[u8]) -> PdsResult<String> {
        match self {
            TextEncoding::Utf8 => {
                let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                String::from_utf8(bytes.to_vec()).map_err(|err| {
                    PdsError::Format(format!(
                        "input is not valid UTF-8 (byte {}); try --encoding latin1",
                        err.utf8_error().valid_up_to()
                    ))
                })
            }
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }

    /// Read a file and return its contents as UTF-8 bytes.
    pub fn read_to_utf8(&self, path: &Path) -> PdsResult<Vec<u8>> {
        let bytes = fs::read(path)?;
        match self.decode(&bytes) {
            Ok(text) => Ok(text.into_bytes()),
            Err(PdsError::Format(message)) => Err(PdsError::Format(format!(
                "{}: {}",
                path.display(),
                message
            ))),
            Err(other) => Err(other),
        }
    }

    /// Open a file as a stream of UTF-8 bytes, transcoding on the fly.
    pub fn open_utf8(&self, path: &Path) -> PdsResult<Box<dyn Read + Send>> {
        let file = File::open(path)?;
        Ok(match self {
            TextEncoding::Utf8 => Box::new(file),
            TextEncoding::Latin1 => Box::new(Latin1Reader::new(file)),
        })
    }
}

/// Adapts a Latin-1 byte stream into UTF-8.
pub struct Latin1Reader<R> {
    inner: R,
    pending: Vec<u8>,
    pos: usize,
}

impl<R: Read> Latin1Reader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            pos: 0,
        }
    }
}

impl<R: Read> Read for Latin1Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pos >= self.pending.len() {
            let mut raw = [0u8; 4096];
            let n = self.inner.read(&mut raw)?;
            if n == 0 {
                return Ok(0);
            }
            self.pending.clear();
            self.pos = 0;
            for &byte in &raw[..n] {
                if byte < 0x80 {
                    self.pending.push(byte);
                } else {
                    self.pending.push(0xC0 | (byte >> 6));
                    self.pending.push(0x80 | (byte & 0x3F));
                }
            }
        }
        let available = &self.pending[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextEncoding {
    type Err = PdsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" => Ok(TextEncoding::Latin1),
            other => Err(PdsError::Format(format!(
                "unsupported encoding '{}'; use utf-8 or latin1",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("UTF-8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert_eq!("utf8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert_eq!(
            "ISO_8859-1".parse::<TextEncoding>().unwrap(),
            TextEncoding::Latin1
        );
        assert!("cp1252".parse::<TextEncoding>().is_err());
    }

    #[test]
    fn latin1_decodes_high_bytes() {
        let text = TextEncoding::Latin1.decode(b"S\xe3o Sim\xe3o").unwrap();
        assert_eq!(text, "São Simão");
    }

    #[test]
    fn latin1_reader_matches_decode() {
        let raw: Vec<u8> = (0u8..=255).cycle().take(10_000).collect();
        let mut streamed = String::new();
        Latin1Reader::new(raw.as_slice())
            .read_to_string(&mut streamed)
            .unwrap();
        assert_eq!(streamed, TextEncoding::Latin1.decode(&raw).unwrap());
    }

    #[test]
    fn utf8_strips_bom_and_rejects_invalid() {
        let text = TextEncoding::Utf8.decode(b"\xEF\xBB\xBFstage").unwrap();
        assert_eq!(text, "stage");
        assert!(TextEncoding::Utf8.decode(b"S\xe3o").is_err());
    }
}
