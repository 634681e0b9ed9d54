//! CRC16 integrity calculator
//!
//! The record checksum is CRC-16/CCITT-FALSE: poly 0x1021, init 0xFFFF, no
//! reflection, no final XOR. The `crc` crate ships this algorithm as
//! `CRC_16_IBM_3740`; the constant here pins the store to it so a crate
//! update cannot silently change what is persisted.

use crc::{Crc, CRC_16_IBM_3740};

/// CRC-16/CCITT-FALSE instance used for all record checksums.
///
/// Use [`checksum`] for a one-shot computation, or `CRC16.digest()` to feed
/// split regions (header bytes, then payload) incrementally.
pub const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Compute the checksum of a byte slice in one shot
pub fn checksum(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_check_vector() {
        // Standard check value for CRC-16/CCITT-FALSE
        assert_eq!(checksum(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_empty_input_is_init_value() {
        assert_eq!(checksum(&[]), 0xFFFF);
    }

    #[test]
    fn test_digest_matches_one_shot() {
        let data = b"holdfast config page";
        let mut digest = CRC16.digest();
        digest.update(&data[..8]);
        digest.update(&data[8..]);
        assert_eq!(digest.finalize(), checksum(data));
    }

    proptest! {
        #[test]
        fn prop_checksum_is_pure(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(checksum(&data), checksum(&data));
        }

        #[test]
        fn prop_single_bit_flip_changes_checksum(
            mut data in proptest::collection::vec(any::<u8>(), 1..512),
            flip in any::<u16>(),
        ) {
            let before = checksum(&data);
            let bit = flip as usize % (data.len() * 8);
            data[bit / 8] ^= 1 << (bit % 8);
            // CRC16 detects all single-bit errors
            prop_assert_ne!(checksum(&data), before);
        }
    }
}
