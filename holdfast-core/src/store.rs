//! Config store lifecycle
//!
//! [`ConfigStore`] owns the flash controller, one cached copy of the record,
//! and the loaded flag. The first access loads the reserved page from flash
//! and validates it; a blank or corrupt page is silently replaced with
//! defaults, which are persisted so a valid record exists at rest before the
//! store is used.
//!
//! Every mutation funnels through the same write-back: bump the sequence
//! counter, normalize the payload, recompute the CRC, erase the page, and
//! reprogram the whole record. There is no incremental update and no wear
//! leveling; each logical change costs one erase-program cycle on the same
//! page.
//!
//! The store is single-context by construction: all operations take
//! `&mut self`, so callers in a preemptive environment must serialize access
//! externally.

use holdfast_hal::flash::{FlashController, FlashError};

use crate::flash;
use crate::record::{ConfigRecord, CONFIG_MAGIC, CONFIG_VERSION, PAGE_SIZE, PAYLOAD_CAPACITY};

/// Flash-backed store for one [`ConfigRecord`]
pub struct ConfigStore<C: FlashController> {
    flash: C,
    /// First address of the page reserved for the record
    page_addr: u32,
    /// Cached copy of the most recently loaded or written record
    record: ConfigRecord,
    loaded: bool,
}

impl<C: FlashController> ConfigStore<C> {
    /// Create a store over the page at `page_addr`
    ///
    /// Fails with `InvalidArgument` if the controller's erase-unit size does
    /// not match the record size, or if `page_addr` is not a page boundary
    /// inside the flash region. Nothing is read from flash yet; loading is
    /// deferred to the first operation.
    pub fn new(flash: C, page_addr: u32) -> Result<Self, FlashError> {
        if flash.page_size() as usize != PAGE_SIZE {
            return Err(FlashError::InvalidArgument);
        }
        let base = flash.base_address();
        if page_addr < base
            || (page_addr - base) % flash.page_size() != 0
            || page_addr + PAGE_SIZE as u32 > base + flash.capacity()
        {
            return Err(FlashError::InvalidArgument);
        }

        Ok(Self {
            flash,
            page_addr,
            record: ConfigRecord::defaults(),
            loaded: false,
        })
    }

    /// Read-only view of the current record, loading it first if needed
    ///
    /// Never fails: a page that does not validate (blank flash, corruption,
    /// foreign format, version skew) is replaced with defaults, which are
    /// persisted best-effort before returning.
    pub fn get(&mut self) -> &ConfigRecord {
        self.ensure_loaded();
        &self.record
    }

    /// Full caller-owned copy of the current record
    ///
    /// The copy can be edited offline and handed back to [`save`].
    ///
    /// [`save`]: Self::save
    pub fn snapshot(&mut self) -> ConfigRecord {
        self.ensure_loaded();
        self.record.clone()
    }

    /// Merge a caller-edited record and write it back
    ///
    /// Only the payload is taken from `candidate`; magic and version are
    /// forced back to the expected constants, the payload is forcibly
    /// NUL-terminated at its last byte, and seq/CRC are regenerated during
    /// write-back. A stale or foreign candidate therefore cannot poison the
    /// header fields.
    ///
    /// On a write-back failure the RAM cache already holds the merged
    /// fields even though flash does not; [`commit`] retries the write.
    ///
    /// [`commit`]: Self::commit
    pub fn save(&mut self, candidate: &ConfigRecord) -> Result<(), FlashError> {
        self.ensure_loaded();

        self.record.magic = CONFIG_MAGIC;
        self.record.version = CONFIG_VERSION;
        self.record.payload = candidate.payload;
        self.record.payload[PAYLOAD_CAPACITY - 1] = 0;

        self.write_back()
    }

    /// Write back the currently cached record without merging
    ///
    /// Pairs with [`payload_mut`] for in-place edits, and retries a failed
    /// [`save`].
    ///
    /// [`payload_mut`]: Self::payload_mut
    /// [`save`]: Self::save
    pub fn commit(&mut self) -> Result<(), FlashError> {
        self.ensure_loaded();
        self.write_back()
    }

    /// Replace the record with fresh defaults and write them back
    pub fn factory_reset(&mut self) -> Result<(), FlashError> {
        self.ensure_loaded();
        self.record = ConfigRecord::defaults();
        self.write_back()
    }

    /// Exclusive access to the payload buffer for in-place edits
    ///
    /// The loan ends before [`commit`](Self::commit) can run, so the cache
    /// can never change behind the store's back.
    pub fn payload_mut(&mut self) -> &mut [u8; PAYLOAD_CAPACITY] {
        self.ensure_loaded();
        &mut self.record.payload
    }

    /// The underlying flash controller
    pub fn flash(&self) -> &C {
        &self.flash
    }

    /// Mutable access to the underlying flash controller
    pub fn flash_mut(&mut self) -> &mut C {
        &mut self.flash
    }

    /// Load and validate the record once; heal with defaults on failure
    fn ensure_loaded(&mut self) {
        if self.loaded {
            return;
        }

        let mut page = [0u8; PAGE_SIZE];
        let read_ok = flash::read(&self.flash, self.page_addr, &mut page).is_ok();
        if read_ok {
            self.record = ConfigRecord::decode(&page);
        }

        if !read_ok || !self.record.is_valid() {
            // First boot or corruption: regenerate defaults and persist them
            // as-is (sequence stays 0 at rest). A persist failure is
            // swallowed; the RAM cache stays usable either way.
            self.record = ConfigRecord::defaults();
            let _ = self.persist();
        }

        self.loaded = true;
    }

    /// Bump seq, normalize, recompute CRC, then rewrite the whole page
    fn write_back(&mut self) -> Result<(), FlashError> {
        self.record.seq = self.record.seq.wrapping_add(1);
        self.record.normalize_payload();
        self.record.crc = self.record.compute_crc();
        self.persist()
    }

    /// Erase the reserved page and program the cached record into it
    fn persist(&mut self) -> Result<(), FlashError> {
        let mut page = [0u8; PAGE_SIZE];
        self.record.encode(&mut page);

        flash::erase(
            &mut self.flash,
            self.page_addr,
            self.page_addr + PAGE_SIZE as u32,
        )?;
        flash::write(&mut self.flash, self.page_addr, &page)
    }
}
