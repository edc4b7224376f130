//! SIM Phonebook Export
//!
//! This module reassembles contacts from the USIM phonebook files and hands
//! them to a [`PhonebookSink`] once every reference set has been read.
//!
//! ## Layout
//!
//! The USIM describes its phonebook in EF_PBR (`4F30` under `3F00 7F10 5F3A`).
//! Each EF_PBR record is a *reference set*: a list of files grouped by how
//! they relate to EF_ADN, the master file holding names and numbers:
//!
//! - **Type 1** (`A8`): record *n* belongs to ADN record *n* (SNE, ANR, EMAIL, IAP, ...)
//! - **Type 2** (`A9`): linked through the IAP file, whose byte *i* names the
//!   record of the *i*-th type 2 file
//! - **Type 3** (`AA`): shared pool (EXT1 number extensions, AAS, GAS)
//!
//! SIMs without EF_PBR are read from the legacy `6F3A`/`6F4A` files under
//! `3F00 7F10`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use callbird::phonebook::{PhonebookAssembler, PhonebookEntry};
//!
//! let mut assembler = PhonebookAssembler::new();
//! let summary = assembler
//!     .export(&sim, &mut |entry: &PhonebookEntry| {
//!         // write a vCard
//!     })
//!     .await?;
//! ```

pub mod assembler;
pub mod pbr;
pub mod records;

pub use assembler::{ExportSummary, PhonebookAssembler};
pub use pbr::{PbrLayout, ReferenceSet};

use crate::constants::{MAX_ALPHA_LENGTH, MAX_PHONE_NUMBER_LENGTH, MAX_PHONEBOOK_ENTRIES};
use crate::sim::SimError;
use heapless::{String, Vec};

/// Decoded name, second name or e-mail address
pub type AlphaString = String<MAX_ALPHA_LENGTH>;

/// Decoded dialling number
pub type NumberString = String<MAX_PHONE_NUMBER_LENGTH>;

/// Phonebook export errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhonebookError {
    /// A SIM read failed
    Sim(SimError),
    /// A phonebook file reports an unusable record length
    InvalidFile(u16),
    /// More linked records than the work queue holds
    QueueFull,
}

impl core::fmt::Display for PhonebookError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Sim(e) => write!(f, "{e}"),
            Self::InvalidFile(fileid) => write!(f, "Phonebook file {fileid:04X} is unusable"),
            Self::QueueFull => write!(f, "Too many linked phonebook records"),
        }
    }
}

impl From<SimError> for PhonebookError {
    fn from(e: SimError) -> Self {
        Self::Sim(e)
    }
}

/// Reference set block tags in EF_PBR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ConstructedTag {
    /// Record-aligned with EF_ADN
    Type1 = 0xA8,
    /// Linked through EF_IAP
    Type2 = 0xA9,
    /// Shared pool
    Type3 = 0xAA,
}

impl ConstructedTag {
    /// Parse a block tag
    #[must_use]
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0xA8 => Some(Self::Type1),
            0xA9 => Some(Self::Type2),
            0xAA => Some(Self::Type3),
            _ => None,
        }
    }
}

/// File tags inside an EF_PBR block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FileType {
    /// Abbreviated dialling numbers (names and numbers)
    Adn,
    /// Index administration (type 2 links)
    Iap,
    /// Number extensions
    Ext1,
    /// Second name entry
    Sne,
    /// Additional number entry
    Anr,
    /// Phonebook control
    Pbc,
    /// Grouping file
    Grp,
    /// Additional number alpha string
    Aas,
    /// Grouping information alpha string
    Gas,
    /// Unique identifier
    Uid,
    /// E-mail address
    Email,
    /// Capability configuration parameters
    Ccp1,
    /// Any other tag
    Unknown(u8),
}

impl FileType {
    /// Parse a file tag
    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0xC0 => Self::Adn,
            0xC1 => Self::Iap,
            0xC2 => Self::Ext1,
            0xC3 => Self::Sne,
            0xC4 => Self::Anr,
            0xC5 => Self::Pbc,
            0xC6 => Self::Grp,
            0xC7 => Self::Aas,
            0xC8 => Self::Gas,
            0xC9 => Self::Uid,
            0xCA => Self::Email,
            0xCB => Self::Ccp1,
            other => Self::Unknown(other),
        }
    }

    /// Raw file tag
    #[must_use]
    pub fn raw(&self) -> u8 {
        match self {
            Self::Adn => 0xC0,
            Self::Iap => 0xC1,
            Self::Ext1 => 0xC2,
            Self::Sne => 0xC3,
            Self::Anr => 0xC4,
            Self::Pbc => 0xC5,
            Self::Grp => 0xC6,
            Self::Aas => 0xC7,
            Self::Gas => 0xC8,
            Self::Uid => 0xC9,
            Self::Email => 0xCA,
            Self::Ccp1 => 0xCB,
            Self::Unknown(raw) => *raw,
        }
    }
}

/// One phonebook file of a reference set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PbFileInfo {
    /// Block the file was listed in
    pub constructed: ConstructedTag,
    /// Elementary file identifier
    pub file_id: u16,
    /// What the file holds
    pub file_type: FileType,
    /// Total size, filled in from the SIM
    pub file_length: u16,
    /// Record size, filled in from the SIM
    pub record_length: u8,
}

impl PbFileInfo {
    /// Describe a file whose size is not known yet
    #[must_use]
    pub const fn new(constructed: ConstructedTag, file_id: u16, file_type: FileType) -> Self {
        Self {
            constructed,
            file_id,
            file_type,
            file_length: 0,
            record_length: 0,
        }
    }
}

/// One record waiting to be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingRecord {
    /// File to read
    pub file_id: u16,
    /// What the file holds
    pub file_type: FileType,
    /// Record size of the file
    pub record_length: u8,
    /// 1-based record number
    pub record: u8,
    /// ADN record the result belongs to
    pub adn_index: u16,
    /// EXT1 record continues the additional number instead of the main number
    pub anr_extension: bool,
    /// Scheduled through the IAP; the record then ends in a 2-byte ADN link
    pub set_by_iap: bool,
    /// EXT1 records followed so far for this number
    pub extension_depth: u8,
}

/// A reassembled contact
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhonebookEntry {
    /// ADN record number
    pub index: u16,
    /// Contact name
    pub name: AlphaString,
    /// Main number
    pub number: NumberString,
    /// Additional number
    pub anr: NumberString,
    /// Second name
    pub sne: AlphaString,
    /// E-mail address
    pub email: AlphaString,
}

/// Receiver of exported entries
pub trait PhonebookSink {
    /// Called once per entry, in reference set then ADN index order
    fn entry(&mut self, entry: &PhonebookEntry);
}

impl<F: FnMut(&PhonebookEntry)> PhonebookSink for F {
    fn entry(&mut self, entry: &PhonebookEntry) {
        self(entry);
    }
}

/// Entries of all reference sets, kept sorted by (set, ADN index)
#[derive(Debug, Default)]
pub struct PhonebookEntries {
    entries: Vec<(u8, PhonebookEntry), MAX_PHONEBOOK_ENTRIES>,
    dropped: usize,
}

impl PhonebookEntries {
    /// Create an empty store
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            dropped: 0,
        }
    }

    fn search(&self, set: u8, index: u16) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|(s, entry)| (*s, entry.index).cmp(&(set, index)))
    }

    /// Store `entry` under `set`, replacing one with the same index
    ///
    /// Returns `false` if the store is full and the entry was dropped.
    pub fn insert(&mut self, set: u8, entry: PhonebookEntry) -> bool {
        match self.search(set, entry.index) {
            Ok(pos) => {
                self.entries[pos].1 = entry;
                true
            }
            Err(pos) => {
                if self.entries.insert(pos, (set, entry)).is_err() {
                    self.dropped += 1;
                    return false;
                }
                true
            }
        }
    }

    /// Entry for ADN record `index` of `set`
    pub fn get_mut(&mut self, set: u8, index: u16) -> Option<&mut PhonebookEntry> {
        let pos = self.search(set, index).ok()?;
        Some(&mut self.entries[pos].1)
    }

    /// Entries in export order
    pub fn iter(&self) -> impl Iterator<Item = &PhonebookEntry> {
        self.entries.iter().map(|(_, entry)| entry)
    }

    /// Number of stored entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries rejected because the store was full
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Discard everything
    pub fn clear(&mut self) {
        self.entries.clear();
        self.dropped = 0;
    }
}
