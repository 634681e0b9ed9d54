//! Persistent config record layout
//!
//! One [`ConfigRecord`] fills exactly one flash page. The on-flash format is
//! fixed little-endian:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ magic:    u32                                │  Offset: 0
//! ├──────────────────────────────────────────────┤
//! │ version:  u32                                │  Offset: 4
//! ├──────────────────────────────────────────────┤
//! │ seq:      u32 (monotonic write counter)      │  Offset: 8
//! ├──────────────────────────────────────────────┤
//! │ crc:      u16 (CRC-16/CCITT-FALSE)           │  Offset: 12
//! ├──────────────────────────────────────────────┤
//! │ reserved: u16 (alignment padding)            │  Offset: 14
//! ├──────────────────────────────────────────────┤
//! │ payload:  [u8; 2032] (NUL-terminated text)   │  Offset: 16
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The CRC covers the 12 header bytes before the `crc` field plus the whole
//! payload buffer. Payload bytes after the first NUL are always zero-filled
//! before checksumming, so the CRC is reproducible from the logical content
//! alone.

use holdfast_hal::flash::{FlashError, PROGRAM_GRANULARITY};

use crate::integrity;

/// Record format identifier stored in flash
pub const CONFIG_MAGIC: u32 = u32::from_le_bytes(*b"HFCG");

/// Record schema version; bump if the layout changes
pub const CONFIG_VERSION: u32 = 0x0001_0000;

/// Flash erase-unit size the record is sized to
pub const PAGE_SIZE: usize = 2048;

/// Header bytes ahead of the payload: magic + version + seq + crc + reserved
pub const HEADER_LEN: usize = 16;

/// Payload capacity: the rest of the page, NUL terminator included
pub const PAYLOAD_CAPACITY: usize = PAGE_SIZE - HEADER_LEN;

/// Header bytes covered by the CRC (everything before the `crc` field)
const CRC_PREFIX_LEN: usize = 12;

// Layout sanity: the record must fill one page exactly and be programmable
// in whole doublewords
const _: () = {
    assert!(HEADER_LEN + PAYLOAD_CAPACITY == PAGE_SIZE);
    assert!(PAGE_SIZE % PROGRAM_GRANULARITY as usize == 0);
};

/// Persistent config record, exactly one flash page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    /// Format identifier; must equal [`CONFIG_MAGIC`]
    pub magic: u32,
    /// Schema version; must equal [`CONFIG_VERSION`]
    pub version: u32,
    /// Monotonic write counter, bumped on every write-back
    pub seq: u32,
    /// CRC-16/CCITT-FALSE over the header prefix and payload
    pub crc: u16,
    /// Alignment padding, not covered by the CRC
    pub reserved: u16,
    /// Opaque NUL-terminated application data
    pub payload: [u8; PAYLOAD_CAPACITY],
}

impl ConfigRecord {
    /// Build a clean default record: empty payload, sequence zero, CRC set
    pub fn defaults() -> Self {
        let mut record = Self {
            magic: CONFIG_MAGIC,
            version: CONFIG_VERSION,
            seq: 0,
            crc: 0,
            reserved: 0,
            payload: [0; PAYLOAD_CAPACITY],
        };
        record.crc = record.compute_crc();
        record
    }

    /// Serialize into one page-sized buffer, fixed little-endian layout
    pub fn encode(&self, out: &mut [u8; PAGE_SIZE]) {
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..8].copy_from_slice(&self.version.to_le_bytes());
        out[8..12].copy_from_slice(&self.seq.to_le_bytes());
        out[12..14].copy_from_slice(&self.crc.to_le_bytes());
        out[14..16].copy_from_slice(&self.reserved.to_le_bytes());
        out[HEADER_LEN..].copy_from_slice(&self.payload);
    }

    /// Deserialize from one page-sized buffer
    ///
    /// Decoding never fails; whether the result is trustworthy is a separate
    /// question answered by [`is_valid`](Self::is_valid).
    pub fn decode(buf: &[u8; PAGE_SIZE]) -> Self {
        let mut payload = [0u8; PAYLOAD_CAPACITY];
        payload.copy_from_slice(&buf[HEADER_LEN..]);

        Self {
            magic: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            version: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            seq: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            crc: u16::from_le_bytes([buf[12], buf[13]]),
            reserved: u16::from_le_bytes([buf[14], buf[15]]),
            payload,
        }
    }

    /// Recompute the checksum over the header prefix and payload
    pub fn compute_crc(&self) -> u16 {
        let mut prefix = [0u8; CRC_PREFIX_LEN];
        prefix[0..4].copy_from_slice(&self.magic.to_le_bytes());
        prefix[4..8].copy_from_slice(&self.version.to_le_bytes());
        prefix[8..12].copy_from_slice(&self.seq.to_le_bytes());

        let mut digest = integrity::CRC16.digest();
        digest.update(&prefix);
        digest.update(&self.payload);
        digest.finalize()
    }

    /// Validate magic, version, payload termination, and CRC
    ///
    /// All four checks must pass; a record failing any one of them is
    /// rejected outright with no partial recovery of fields.
    pub fn is_valid(&self) -> bool {
        if self.magic != CONFIG_MAGIC {
            return false;
        }
        if self.version != CONFIG_VERSION {
            return false;
        }
        // Payload must contain a terminator somewhere in range
        if !self.payload.contains(&0) {
            return false;
        }
        self.compute_crc() == self.crc
    }

    /// Enforce payload termination and zero-fill the tail
    ///
    /// Forces a NUL at the last byte, then clears everything after the first
    /// NUL so the CRC over the padding region is deterministic.
    pub fn normalize_payload(&mut self) {
        self.payload[PAYLOAD_CAPACITY - 1] = 0;

        let used = self
            .payload
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(PAYLOAD_CAPACITY - 1);
        self.payload[used..].fill(0);
    }

    /// Payload bytes up to (excluding) the first NUL
    pub fn payload_bytes(&self) -> &[u8] {
        let end = self
            .payload
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(PAYLOAD_CAPACITY);
        &self.payload[..end]
    }

    /// Replace the payload content, zero-filling the remainder
    ///
    /// Fails with `InvalidArgument` if `data` does not leave room for the
    /// NUL terminator.
    pub fn set_payload(&mut self, data: &[u8]) -> Result<(), FlashError> {
        if data.len() >= PAYLOAD_CAPACITY {
            return Err(FlashError::InvalidArgument);
        }
        self.payload[..data.len()].copy_from_slice(data);
        self.payload[data.len()..].fill(0);
        Ok(())
    }
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let record = ConfigRecord::defaults();
        assert!(record.is_valid());
        assert_eq!(record.seq, 0);
        assert_eq!(record.payload_bytes(), b"");
    }

    #[test]
    fn test_encode_layout() {
        let mut record = ConfigRecord::defaults();
        record.seq = 0x0102_0304;
        record.crc = record.compute_crc();

        let mut page = [0u8; PAGE_SIZE];
        record.encode(&mut page);

        assert_eq!(&page[0..4], b"HFCG");
        assert_eq!(page[8..12], 0x0102_0304u32.to_le_bytes());
        assert_eq!(page[12..14], record.crc.to_le_bytes());
    }

    #[test]
    fn test_decode_roundtrip() {
        let mut record = ConfigRecord::defaults();
        record.set_payload(b"{\"hv\":42}").unwrap();
        record.seq = 7;
        record.crc = record.compute_crc();

        let mut page = [0u8; PAGE_SIZE];
        record.encode(&mut page);
        assert_eq!(ConfigRecord::decode(&page), record);
    }

    #[test]
    fn test_validation_rejects_bad_magic() {
        let mut record = ConfigRecord::defaults();
        record.magic = 0xDEAD_BEEF;
        record.crc = record.compute_crc();
        assert!(!record.is_valid());
    }

    #[test]
    fn test_validation_rejects_version_skew() {
        let mut record = ConfigRecord::defaults();
        record.version = CONFIG_VERSION + 1;
        record.crc = record.compute_crc();
        assert!(!record.is_valid());
    }

    #[test]
    fn test_validation_rejects_crc_mismatch() {
        let mut record = ConfigRecord::defaults();
        record.crc ^= 0x0001;
        assert!(!record.is_valid());
    }

    #[test]
    fn test_validation_rejects_unterminated_payload() {
        let mut record = ConfigRecord::defaults();
        record.payload = [b'A'; PAYLOAD_CAPACITY];
        record.crc = record.compute_crc();
        assert!(!record.is_valid());
    }

    #[test]
    fn test_normalize_clears_tail_garbage() {
        let mut clean = ConfigRecord::defaults();
        clean.set_payload(b"net=1").unwrap();

        let mut dirty = ConfigRecord::defaults();
        dirty.payload[..6].copy_from_slice(b"net=1\0");
        dirty.payload[6..].fill(0x5A);
        dirty.normalize_payload();

        // Same logical content must produce the same CRC
        assert_eq!(dirty.payload, clean.payload);
        assert_eq!(dirty.compute_crc(), clean.compute_crc());
    }

    #[test]
    fn test_normalize_forces_terminator() {
        let mut record = ConfigRecord::defaults();
        record.payload = [b'A'; PAYLOAD_CAPACITY];
        record.normalize_payload();
        assert_eq!(record.payload[PAYLOAD_CAPACITY - 1], 0);
        assert!(record.payload.contains(&0));
    }

    #[test]
    fn test_set_payload_rejects_oversized() {
        let mut record = ConfigRecord::defaults();
        let too_big = [b'x'; PAYLOAD_CAPACITY];
        assert_eq!(
            record.set_payload(&too_big),
            Err(FlashError::InvalidArgument)
        );
        // Exactly capacity - 1 still leaves room for the NUL
        assert!(record.set_payload(&too_big[..PAYLOAD_CAPACITY - 1]).is_ok());
    }
}
