//! Flash primitives: erase, read, write
//!
//! Thin layer over a [`FlashController`] that turns the raw controller
//! surface into the three operations the store needs. It knows nothing about
//! the record's meaning; it only enforces the NOR-flash rules: erases cover
//! whole pages, writes are aligned doubleword programs against erased cells,
//! and every programmed chunk is read back and verified.
//!
//! The program/erase interface is unlocked for the duration of one operation
//! and relocked on every exit path, error returns included, via a drop guard.

use holdfast_hal::flash::{FlashController, FlashError, ERASED_BYTE, PROGRAM_GRANULARITY};

const GRAIN: usize = PROGRAM_GRANULARITY as usize;

/// Scoped unlock: relocks the peripheral when dropped
struct Unlocked<'a, C: FlashController> {
    flash: &'a mut C,
}

impl<'a, C: FlashController> Unlocked<'a, C> {
    fn acquire(flash: &'a mut C) -> Result<Self, FlashError> {
        flash.unlock()?;
        Ok(Self { flash })
    }
}

impl<C: FlashController> Drop for Unlocked<'_, C> {
    fn drop(&mut self) {
        self.flash.lock();
    }
}

/// Erase the pages covering the half-open range `[start, end_exclusive)`
///
/// Fails with `InvalidArgument` if the range is empty, inverted, or outside
/// the flash region. Controller errors propagate unmasked. On success the
/// covered pages read back all-`0xFF`.
pub fn erase<C: FlashController>(
    flash: &mut C,
    start: u32,
    end_exclusive: u32,
) -> Result<(), FlashError> {
    if end_exclusive <= start {
        return Err(FlashError::InvalidArgument);
    }
    let base = flash.base_address();
    if start < base || end_exclusive > base + flash.capacity() {
        return Err(FlashError::InvalidArgument);
    }

    let page_size = flash.page_size();
    let first = (start - base) / page_size;
    let last = (end_exclusive - 1 - base) / page_size;

    let guard = Unlocked::acquire(flash)?;
    guard.flash.erase_pages(first, last - first + 1)
}

/// Copy `dst.len()` bytes from flash into `dst`
///
/// Flash is memory-mapped; no unlock is needed.
pub fn read<C: FlashController>(flash: &C, address: u32, dst: &mut [u8]) -> Result<(), FlashError> {
    flash.read(address, dst)
}

/// Program `src` into flash starting at `address`
///
/// The destination range must have been erased. `address` must be aligned to
/// the program granularity; a final partial chunk is padded with the erased
/// byte pattern so the flash content after the requested bytes stays
/// deterministic. Each programmed chunk is read back immediately; a mismatch
/// fails with `Verification`, catching alignment and erase-state mistakes
/// before they persist silently.
pub fn write<C: FlashController>(
    flash: &mut C,
    address: u32,
    src: &[u8],
) -> Result<(), FlashError> {
    if src.is_empty() {
        return Ok(());
    }
    if address % PROGRAM_GRANULARITY != 0 {
        return Err(FlashError::InvalidArgument);
    }

    let guard = Unlocked::acquire(flash)?;
    let mut addr = address;

    for chunk in src.chunks(GRAIN) {
        let mut word = [ERASED_BYTE; GRAIN];
        word[..chunk.len()].copy_from_slice(chunk);

        guard.flash.program_dword(addr, u64::from_le_bytes(word))?;

        let mut readback = [0u8; GRAIN];
        guard.flash.read(addr, &mut readback)?;
        if readback != word {
            return Err(FlashError::Verification);
        }

        addr += PROGRAM_GRANULARITY;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdfast_hal::sim::SimFlash;

    const BASE: u32 = SimFlash::BASE;
    const PAGE: u32 = SimFlash::PAGE_SIZE;

    #[test]
    fn test_erase_rejects_empty_and_inverted_ranges() {
        let mut flash = SimFlash::new();
        assert_eq!(
            erase(&mut flash, BASE, BASE),
            Err(FlashError::InvalidArgument)
        );
        assert_eq!(
            erase(&mut flash, BASE + PAGE, BASE),
            Err(FlashError::InvalidArgument)
        );
        assert_eq!(flash.total_erase_count(), 0);
    }

    #[test]
    fn test_erase_covers_half_open_range() {
        let mut flash = SimFlash::new();
        // [page 1, page 3) touches pages 1 and 2 only
        erase(&mut flash, BASE + PAGE, BASE + 3 * PAGE).unwrap();
        assert_eq!(flash.erase_count(0), 0);
        assert_eq!(flash.erase_count(1), 1);
        assert_eq!(flash.erase_count(2), 1);
        assert_eq!(flash.erase_count(3), 0);
        assert!(flash.is_locked());
    }

    #[test]
    fn test_erase_single_byte_range_covers_one_page() {
        let mut flash = SimFlash::new();
        erase(&mut flash, BASE + PAGE, BASE + PAGE + 1).unwrap();
        assert_eq!(flash.erase_count(1), 1);
        assert_eq!(flash.total_erase_count(), 1);
    }

    #[test]
    fn test_write_misaligned_address_rejected_without_mutation() {
        let mut flash = SimFlash::new();
        erase(&mut flash, BASE, BASE + PAGE).unwrap();

        let result = write(&mut flash, BASE + 3, &[1, 2, 3, 4]);
        assert_eq!(result, Err(FlashError::InvalidArgument));

        let mut buf = [0u8; 16];
        read(&flash, BASE, &mut buf).unwrap();
        assert_eq!(buf, [ERASED_BYTE; 16]);
    }

    #[test]
    fn test_write_empty_is_noop() {
        let mut flash = SimFlash::new();
        write(&mut flash, BASE, &[]).unwrap();
        assert!(flash.is_locked());
    }

    #[test]
    fn test_write_pads_tail_with_erased_pattern() {
        let mut flash = SimFlash::new();
        erase(&mut flash, BASE, BASE + PAGE).unwrap();

        // 11 bytes: one full doubleword plus a 3-byte tail
        write(&mut flash, BASE, b"hello flash").unwrap();

        let mut buf = [0u8; 16];
        read(&flash, BASE, &mut buf).unwrap();
        assert_eq!(&buf[..11], b"hello flash");
        assert_eq!(&buf[11..], [ERASED_BYTE; 5]);
    }

    #[test]
    fn test_write_roundtrip() {
        let mut flash = SimFlash::new();
        erase(&mut flash, BASE, BASE + PAGE).unwrap();

        let data: [u8; 64] = core::array::from_fn(|i| i as u8);
        write(&mut flash, BASE + 8, &data).unwrap();

        let mut buf = [0u8; 64];
        read(&flash, BASE + 8, &mut buf).unwrap();
        assert_eq!(buf, data);
    }

    #[test]
    fn test_write_over_unerased_flash_fails_verification() {
        let mut flash = SimFlash::new();
        erase(&mut flash, BASE, BASE + PAGE).unwrap();
        write(&mut flash, BASE, &[0x0F; 8]).unwrap();

        // Programming without an erase can only clear bits; the read-back
        // check must catch the mismatch
        let result = write(&mut flash, BASE, &[0xF0; 8]);
        assert_eq!(result, Err(FlashError::Verification));
    }

    #[test]
    fn test_lock_released_on_error_paths() {
        let mut flash = SimFlash::new();
        erase(&mut flash, BASE, BASE + PAGE).unwrap();

        flash.fail_next_program();
        assert_eq!(write(&mut flash, BASE, &[0u8; 8]), Err(FlashError::Hardware));
        assert!(flash.is_locked());

        flash.fail_next_erase();
        assert_eq!(
            erase(&mut flash, BASE, BASE + PAGE),
            Err(FlashError::Hardware)
        );
        assert!(flash.is_locked());
    }
}
