//! Pax extended header records
//!
//! A pax extended header is an entry of type `x` whose payload is a list of
//! `"<len> <key>=<value>\n"` records, where `<len>` counts the whole record
//! including its own digits. Only `path` and `size` are interpreted.

use crate::error::{ArchiveError, ArchiveResult};

/// Overrides carried by a pax extended header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaxOverrides {
    /// Replacement entry path
    pub path: Option<Vec<u8>>,
    /// Replacement payload size
    pub size: Option<u64>,
}

fn decimal_digits(mut value: usize) -> usize {
    let mut digits = 1;
    while value >= 10 {
        value /= 10;
        digits += 1;
    }
    digits
}

/// Encode one record with its self-inclusive length prefix
pub fn encode_record(key: &str, value: &[u8]) -> Vec<u8> {
    // "<len> " + key + "=" + value + "\n"
    let base = key.len() + value.len() + 3;
    let mut digits = decimal_digits(base);
    while decimal_digits(base + digits) != digits {
        digits = decimal_digits(base + digits);
    }
    let total = base + digits;

    let mut record = Vec::with_capacity(total);
    record.extend_from_slice(total.to_string().as_bytes());
    record.push(b' ');
    record.extend_from_slice(key.as_bytes());
    record.push(b'=');
    record.extend_from_slice(value);
    record.push(b'\n');
    record
}

/// Parse the payload of an `x` entry
pub fn parse_records(mut data: &[u8]) -> ArchiveResult<PaxOverrides> {
    let mut overrides = PaxOverrides::default();

    while !data.is_empty() {
        if data.iter().all(|&b| b == 0) {
            break;
        }

        let space = data
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| ArchiveError::invalid_header("pax record without length"))?;
        let length: usize = std::str::from_utf8(&data[..space])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ArchiveError::invalid_header("pax record length is not a number"))?;

        if length <= space + 1 || length > data.len() || data[length - 1] != b'\n' {
            return Err(ArchiveError::invalid_header(format!(
                "pax record length {length} is inconsistent with its contents"
            )));
        }

        let body = &data[space + 1..length - 1];
        let equals = body
            .iter()
            .position(|&b| b == b'=')
            .ok_or_else(|| ArchiveError::invalid_header("pax record without '='"))?;
        let (key, value) = (&body[..equals], &body[equals + 1..]);

        match key {
            b"path" => overrides.path = Some(value.to_vec()),
            b"size" => {
                let size = std::str::from_utf8(value)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| ArchiveError::invalid_header("pax size is not a number"))?;
                overrides.size = Some(size);
            }
            _ => {}
        }

        data = &data[length..];
    }

    Ok(overrides)
}
