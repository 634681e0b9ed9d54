//! Flash controller abstraction
//!
//! Defines the raw controller surface a chip HAL must provide so the store
//! logic can erase, program, and read its config page. The trait models the
//! common NOR-flash contract: erase sets a whole page to 0xFF, programming
//! can only clear bits, and program/erase require the peripheral to be
//! unlocked first.

/// Minimum program granularity in bytes.
///
/// Programming happens in aligned doublewords, matching STM32L4-class
/// controllers. Write addresses must be aligned to this.
pub const PROGRAM_GRANULARITY: u32 = 8;

/// Byte value of erased flash.
pub const ERASED_BYTE: u8 = 0xFF;

/// Errors from flash operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Empty/inverted range, misaligned address, or out-of-bounds access
    InvalidArgument,
    /// The controller rejected the erase or program operation
    Hardware,
    /// Post-program read-back did not match the requested bytes
    Verification,
}

/// Raw flash controller trait
///
/// Implementations wrap the chip's flash peripheral. All operations are
/// blocking and run to completion on the calling context; erase and program
/// stall for the hardware-determined latency.
///
/// # Contract
///
/// - `erase_pages` and `program_dword` require a prior [`unlock`] and must
///   fail with [`FlashError::Hardware`] when the peripheral is locked.
/// - Erase leaves affected pages all-`0xFF`.
/// - Programming can only clear bits (1 -> 0); the destination must have
///   been erased for the result to match the requested word.
/// - Reads are memory-mapped and need no unlock.
///
/// [`unlock`]: FlashController::unlock
pub trait FlashController {
    /// First address of the flash region.
    fn base_address(&self) -> u32;

    /// Total capacity in bytes.
    fn capacity(&self) -> u32;

    /// Erase-unit (page) size in bytes.
    fn page_size(&self) -> u32;

    /// Unlock the program/erase interface.
    fn unlock(&mut self) -> Result<(), FlashError>;

    /// Relock the program/erase interface.
    ///
    /// Must be called on every exit path after an unlock, including error
    /// returns. Infallible: a relock cannot be refused by hardware.
    fn lock(&mut self);

    /// Erase `count` consecutive pages starting at page index `first_page`
    /// as one batched operation.
    fn erase_pages(&mut self, first_page: u32, count: u32) -> Result<(), FlashError>;

    /// Program one aligned doubleword.
    fn program_dword(&mut self, address: u32, word: u64) -> Result<(), FlashError>;

    /// Copy `dst.len()` bytes from flash starting at `address`.
    fn read(&self, address: u32, dst: &mut [u8]) -> Result<(), FlashError>;
}
