//! Byte-offset boundaries of one archive entry
//!
//! Every appended entry occupies three consecutive gzip members in the
//! compressed file:
//!
//! ```text
//! start        data_start       padding_start     end
//!   │ header      │ payload        │ padding        │
//!   └─────────────┴────────────────┴────────────────┘
//! ```
//!
//! The payload member alone decompresses to the entry's bytes, so
//! `dd if=archive bs=1 skip=$data_start count=$data_size | gunzip` retrieves
//! one entry without touching the rest of the archive.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, ArchiveResult};

/// Compressed-file offsets of one entry's header, payload and padding members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OffsetDescriptor {
    /// Offset of the header member
    pub start: u64,
    /// Offset of the payload member
    pub data_start: u64,
    /// Offset of the padding member
    pub padding_start: u64,
    /// Offset just past the padding member
    pub end: u64,
}

impl OffsetDescriptor {
    /// Create a descriptor, checking that boundaries are ordered
    pub fn new(start: u64, data_start: u64, padding_start: u64, end: u64) -> ArchiveResult<Self> {
        let descriptor = Self {
            start,
            data_start,
            padding_start,
            end,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Check `start <= data_start <= padding_start <= end`
    pub fn validate(&self) -> ArchiveResult<()> {
        if self.start <= self.data_start
            && self.data_start <= self.padding_start
            && self.padding_start <= self.end
        {
            Ok(())
        } else {
            Err(ArchiveError::InvalidDescriptor {
                start: self.start,
                data_start: self.data_start,
                padding_start: self.padding_start,
                end: self.end,
            })
        }
    }

    /// Compressed size of the header member
    pub fn header_size(&self) -> u64 {
        self.data_start - self.start
    }

    /// Compressed size of the payload member
    pub fn data_size(&self) -> u64 {
        self.padding_start - self.data_start
    }

    /// Compressed size of the padding member
    pub fn padding_size(&self) -> u64 {
        self.end - self.padding_start
    }

    /// Compressed size of all three members
    pub fn total_size(&self) -> u64 {
        self.end - self.start
    }

    /// Byte range of the header member
    pub fn header_range(&self) -> Range<u64> {
        self.start..self.data_start
    }

    /// Byte range of the payload member
    pub fn data_range(&self) -> Range<u64> {
        self.data_start..self.padding_start
    }

    /// Byte range of the padding member
    pub fn padding_range(&self) -> Range<u64> {
        self.padding_start..self.end
    }

    /// Whether `next` starts exactly where this entry ends
    pub fn is_followed_by(&self, next: &Self) -> bool {
        self.end == next.start
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        let descriptor = OffsetDescriptor::new(10, 40, 65, 85).expect("ordered offsets");
        assert_eq!(descriptor.header_size(), 30);
        assert_eq!(descriptor.data_size(), 25);
        assert_eq!(descriptor.padding_size(), 20);
        assert_eq!(descriptor.total_size(), 75);
        assert_eq!(descriptor.data_range(), 40..65);
        assert_eq!(descriptor.header_range(), 10..40);
        assert_eq!(descriptor.padding_range(), 65..85);
    }

    #[test]
    fn test_unordered_rejected() {
        let result = OffsetDescriptor::new(10, 5, 20, 30);
        assert!(matches!(
            result,
            Err(ArchiveError::InvalidDescriptor { data_start: 5, .. })
        ));
        assert!(OffsetDescriptor::new(0, 10, 30, 20).is_err());
    }

    #[test]
    fn test_contiguity() {
        let first = OffsetDescriptor::new(0, 20, 40, 60).unwrap();
        let second = OffsetDescriptor::new(60, 80, 100, 120).unwrap();
        assert!(first.is_followed_by(&second));
        assert!(!second.is_followed_by(&first));
    }

    #[test]
    fn test_json_field_names() {
        let descriptor = OffsetDescriptor::new(0, 1, 2, 3).unwrap();
        let json = serde_json::to_string(&descriptor).unwrap();
        assert_eq!(
            json,
            r#"{"start":0,"data_start":1,"padding_start":2,"end":3}"#
        );
    }
}
