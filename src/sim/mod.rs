//! SIM file access
//!
//! The phonebook pipeline reads elementary files through the [`SimReader`]
//! trait. Implementations sit on top of whatever carries APDUs to the card
//! (a modem's `AT+CRSM`, a SAP client, a local reader); this crate only needs
//! file metadata and individual records of linear fixed files.
//!
//! Two decoding helpers live here as well:
//!
//! - [`alpha`]: SIM alpha identifiers (GSM default alphabet and the three UCS2
//!   encodings) to UTF-8
//! - [`bcd`]: semi-octet dialling numbers to digit strings

pub mod alpha;
pub mod bcd;

use crate::constants::MAX_RECORD_LENGTH;
use heapless::Vec;

/// Contents of one record
pub type SimRecord = Vec<u8, MAX_RECORD_LENGTH>;

/// Errors reported by SIM file access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SimError {
    /// The file does not exist under the given path
    NotFound,
    /// The record number is outside the file
    InvalidRecord,
    /// Access conditions are not fulfilled
    AccessDenied,
    /// The card or transport reported a failure
    Failed,
    /// No answer arrived in time
    Timeout,
}

impl core::fmt::Display for SimError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "SIM file not found"),
            Self::InvalidRecord => write!(f, "SIM record out of range"),
            Self::AccessDenied => write!(f, "SIM access denied"),
            Self::Failed => write!(f, "SIM read failed"),
            Self::Timeout => write!(f, "SIM read timed out"),
        }
    }
}

/// Elementary file structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FileStructure {
    /// Byte string
    Transparent,
    /// Numbered records of equal length
    LinearFixed,
    /// Ring of records
    Cyclic,
}

/// File metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FileInfo {
    /// Total file size in bytes
    pub file_length: u16,
    /// Size of one record, 0 for transparent files
    pub record_length: u8,
    /// Structure reported by the card
    pub structure: FileStructure,
}

impl FileInfo {
    /// Number of records in the file
    #[must_use]
    pub fn record_count(&self) -> u16 {
        if self.record_length == 0 {
            return 0;
        }
        self.file_length / u16::from(self.record_length)
    }
}

/// Read access to SIM elementary files
///
/// `path` is the concatenated file identifiers of the directories leading to
/// the file, starting at the MF (for example `3F00 7F10 5F3A`).
#[allow(async_fn_in_trait)]
pub trait SimReader {
    /// Read the metadata of `fileid`
    ///
    /// # Errors
    /// Returns the [`SimError`] the card or transport reported
    async fn read_file_info(
        &self,
        fileid: u16,
        structure: FileStructure,
        path: &[u8],
    ) -> Result<FileInfo, SimError>;

    /// Read record `record` (1-based) of `fileid`
    ///
    /// # Errors
    /// Returns the [`SimError`] the card or transport reported
    async fn read_record(
        &self,
        fileid: u16,
        structure: FileStructure,
        record: u8,
        record_length: u8,
        path: &[u8],
    ) -> Result<SimRecord, SimError>;
}
