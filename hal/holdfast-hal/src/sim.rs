//! In-memory flash simulation for host-side tests
//!
//! Models the NOR-flash behavior the store depends on: erase sets pages to
//! 0xFF, programming only clears bits (1 -> 0), program/erase require an
//! unlock, and alignment is enforced. Also supports corruption injection,
//! per-page erase counting, and one-shot fault injection so error paths can
//! be exercised deterministically.

use crate::flash::{FlashController, FlashError, ERASED_BYTE, PROGRAM_GRANULARITY};

/// Simulated flash geometry: 8 pages of 2 KB at an STM32-style base address.
const PAGE_SIZE: u32 = 2048;
const PAGE_COUNT: u32 = 8;
const CAPACITY: u32 = PAGE_SIZE * PAGE_COUNT;
const BASE: u32 = 0x0800_0000;

/// Simulated flash controller
///
/// # Example
///
/// ```
/// use holdfast_hal::flash::FlashController;
/// use holdfast_hal::sim::SimFlash;
///
/// let mut flash = SimFlash::new();
/// let addr = flash.base_address();
///
/// flash.unlock().unwrap();
/// flash.erase_pages(0, 1).unwrap();
/// flash.program_dword(addr, 0x1122_3344_5566_7788).unwrap();
/// flash.lock();
///
/// let mut buf = [0u8; 8];
/// flash.read(addr, &mut buf).unwrap();
/// assert_eq!(u64::from_le_bytes(buf), 0x1122_3344_5566_7788);
/// ```
#[derive(Clone)]
pub struct SimFlash {
    /// Flash contents, starts in the erased state
    storage: [u8; CAPACITY as usize],
    /// Erase count per page
    erase_counts: [u32; PAGE_COUNT as usize],
    /// Program/erase interface unlocked
    unlocked: bool,
    /// Fail the next erase with a hardware error
    fail_next_erase: bool,
    /// Fail the next program with a hardware error
    fail_next_program: bool,
}

impl SimFlash {
    /// Simulated page size in bytes.
    pub const PAGE_SIZE: u32 = PAGE_SIZE;
    /// Number of simulated pages.
    pub const PAGE_COUNT: u32 = PAGE_COUNT;
    /// Base address of the simulated region.
    pub const BASE: u32 = BASE;

    /// Create a fresh, fully erased simulated flash
    pub fn new() -> Self {
        Self {
            storage: [ERASED_BYTE; CAPACITY as usize],
            erase_counts: [0; PAGE_COUNT as usize],
            unlocked: false,
            fail_next_erase: false,
            fail_next_program: false,
        }
    }

    /// Address of the last page, a typical spot to reserve for config
    pub fn last_page_address(&self) -> u32 {
        BASE + CAPACITY - PAGE_SIZE
    }

    /// Whether the program/erase interface is currently locked
    pub fn is_locked(&self) -> bool {
        !self.unlocked
    }

    /// Erase count for the page at index `page`
    pub fn erase_count(&self, page: u32) -> u32 {
        self.erase_counts[page as usize]
    }

    /// Total erase count across all pages
    pub fn total_erase_count(&self) -> u32 {
        self.erase_counts.iter().sum()
    }

    /// Overwrite `len` bytes at `address` with a corruption pattern,
    /// bypassing the NOR bit-clearing rule
    pub fn corrupt(&mut self, address: u32, len: usize) {
        let offset = (address - BASE) as usize;
        for byte in &mut self.storage[offset..offset + len] {
            *byte = 0xAA;
        }
    }

    /// Make the next erase report a hardware error
    pub fn fail_next_erase(&mut self) {
        self.fail_next_erase = true;
    }

    /// Make the next program report a hardware error
    pub fn fail_next_program(&mut self) {
        self.fail_next_program = true;
    }

    fn offset_of(&self, address: u32, len: usize) -> Result<usize, FlashError> {
        if address < BASE {
            return Err(FlashError::InvalidArgument);
        }
        let offset = (address - BASE) as usize;
        if offset + len > CAPACITY as usize {
            return Err(FlashError::InvalidArgument);
        }
        Ok(offset)
    }
}

impl Default for SimFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashController for SimFlash {
    fn base_address(&self) -> u32 {
        BASE
    }

    fn capacity(&self) -> u32 {
        CAPACITY
    }

    fn page_size(&self) -> u32 {
        PAGE_SIZE
    }

    fn unlock(&mut self) -> Result<(), FlashError> {
        self.unlocked = true;
        Ok(())
    }

    fn lock(&mut self) {
        self.unlocked = false;
    }

    fn erase_pages(&mut self, first_page: u32, count: u32) -> Result<(), FlashError> {
        if self.fail_next_erase {
            self.fail_next_erase = false;
            return Err(FlashError::Hardware);
        }
        if !self.unlocked {
            return Err(FlashError::Hardware);
        }
        if count == 0 || first_page + count > PAGE_COUNT {
            return Err(FlashError::InvalidArgument);
        }

        let start = (first_page * PAGE_SIZE) as usize;
        let end = ((first_page + count) * PAGE_SIZE) as usize;
        self.storage[start..end].fill(ERASED_BYTE);

        for page in first_page..first_page + count {
            self.erase_counts[page as usize] += 1;
        }
        Ok(())
    }

    fn program_dword(&mut self, address: u32, word: u64) -> Result<(), FlashError> {
        if self.fail_next_program {
            self.fail_next_program = false;
            return Err(FlashError::Hardware);
        }
        if !self.unlocked {
            return Err(FlashError::Hardware);
        }
        if address % PROGRAM_GRANULARITY != 0 {
            return Err(FlashError::InvalidArgument);
        }
        let offset = self.offset_of(address, PROGRAM_GRANULARITY as usize)?;

        // NOR programming can only clear bits
        for (cell, byte) in self.storage[offset..offset + 8]
            .iter_mut()
            .zip(word.to_le_bytes())
        {
            *cell &= byte;
        }
        Ok(())
    }

    fn read(&self, address: u32, dst: &mut [u8]) -> Result<(), FlashError> {
        let offset = self.offset_of(address, dst.len())?;
        dst.copy_from_slice(&self.storage[offset..offset + dst.len()]);
        Ok(())
    }
}
