//! Logical address layout for the paging engine.
//!
//! A logical address is a single integer: the low `offset_bits` bits
//! are the offset within a page and the next `page_bits` bits are the
//! page number. Physical addresses are `frame * page_size + offset`.

use crate::helpe::*;

/// Bit widths describing a paged memory. The defaults give 1024-unit
/// pages, 64 pages per job and 64 physical frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    pub offset_bits:    u32,
    pub page_bits:      u32,
    pub frame_bits:     u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            offset_bits:    10,
            page_bits:      6,
            frame_bits:     6,
        }
    }
}

impl PagingConfig {
    /// Checks the widths and, if they make sense, freezes them
    /// into an [AddressLayout].
    pub fn validate(&self) -> Result<AddressLayout, ConfigError> {
        if self.offset_bits == 0 { return Err(ConfigError::ZeroWidth("offset_bits")); }
        if self.page_bits == 0 { return Err(ConfigError::ZeroWidth("page_bits")); }
        if self.frame_bits == 0 { return Err(ConfigError::ZeroWidth("frame_bits")); }
        // Both logical and physical addresses must fit in a `Units`.
        let needed = self.offset_bits.saturating_add(self.page_bits.max(self.frame_bits));
        if needed >= Units::BITS {
            return Err(ConfigError::TooWide { needed, available: Units::BITS - 1 });
        }

        Ok(AddressLayout {
            offset_bits:    self.offset_bits,
            page_bits:      self.page_bits,
            frame_bits:     self.frame_bits,
        })
    }
}

/// A validated [PagingConfig].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressLayout {
    offset_bits:    u32,
    page_bits:      u32,
    frame_bits:     u32,
}

impl Default for AddressLayout {
    fn default() -> Self {
        let PagingConfig { offset_bits, page_bits, frame_bits } = PagingConfig::default();
        Self { offset_bits, page_bits, frame_bits }
    }
}

impl AddressLayout {
    #[inline(always)]
    pub fn page_size(&self) -> Units {
        1 << self.offset_bits
    }

    #[inline(always)]
    pub fn max_pages(&self) -> usize {
        1 << self.page_bits
    }

    #[inline(always)]
    pub fn max_frames(&self) -> usize {
        1 << self.frame_bits
    }

    /// Width of a logical address.
    #[inline(always)]
    pub fn logical_bits(&self) -> u32 {
        self.offset_bits + self.page_bits
    }

    #[inline(always)]
    pub fn offset_mask(&self) -> Units {
        self.page_size() - 1
    }

    pub fn config(&self) -> PagingConfig {
        PagingConfig {
            offset_bits:    self.offset_bits,
            page_bits:      self.page_bits,
            frame_bits:     self.frame_bits,
        }
    }

    /// Splits a raw logical address. Fails if bits above the page
    /// number are set.
    pub fn decode(&self, raw: Units) -> Result<LogicalAddress, PagingError> {
        if raw >> self.logical_bits() != 0 {
            return Err(PagingError::AddressOutOfRange {
                address:    raw,
                bits:       self.logical_bits(),
            });
        }

        Ok(LogicalAddress {
            raw,
            page:   raw >> self.offset_bits,
            offset: raw & self.offset_mask(),
        })
    }

    /// The inverse of [decode](AddressLayout::decode), for in-range components.
    pub fn encode(&self, page: PageNo, offset: Units) -> Option<Units> {
        if page >= self.max_pages() || offset >= self.page_size() {
            None
        } else {
            Some((page << self.offset_bits) | offset)
        }
    }

    #[inline(always)]
    pub fn physical(&self, frame: FrameId, offset: Units) -> Units {
        frame * self.page_size() + offset
    }
}

/// The decomposed components of a logical address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalAddress {
    pub raw:    Units,
    pub page:   PageNo,
    pub offset: Units,
}

impl fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LA({}) = (page={}, offset={})", self.raw, self.page, self.offset)
    }
}
