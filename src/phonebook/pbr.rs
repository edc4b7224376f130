//! EF_PBR decoding
//!
//! Each EF_PBR record is a sequence of constructed blocks:
//!
//! ```text
//! A8 len  C0 02 4F 3A  C5 02 4F 09  C4 03 4F 11 02 ...   type 1 block
//! A9 len  CA 02 4F 50 ...                                 type 2 block
//! AA len  C2 02 4F 4A ...                                 type 3 block
//! FF FF ...                                               padding
//! ```
//!
//! Inside a block every file is `tag len fid_hi fid_lo [sfi]`. Decoding stops
//! at the first tag that is not a known block.

use heapless::Vec;

use super::{ConstructedTag, FileType, PbFileInfo};
use crate::constants::{
    MAX_PB_FILES, MAX_REFERENCE_SETS, SIM_EFADN_FILEID, SIM_EFEXT1_FILEID, SIM_EFPBR_FILEID,
    SIM_TELECOM_PATH, USIM_PHONEBOOK_PATH,
};
use crate::sim::{FileStructure, SimError, SimReader};

/// Files of one EF_PBR record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    /// Files in the order EF_PBR lists them
    pub files: Vec<PbFileInfo, MAX_PB_FILES>,
}

impl ReferenceSet {
    /// First file holding `file_type`
    #[must_use]
    pub fn find(&self, file_type: FileType) -> Option<&PbFileInfo> {
        self.files.iter().find(|file| file.file_type == file_type)
    }

    /// Type 2 files in IAP order
    pub fn type2_files(&self) -> impl Iterator<Item = &PbFileInfo> {
        self.files
            .iter()
            .filter(|file| file.constructed == ConstructedTag::Type2)
    }
}

/// Where the phonebook lives and how it is split up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbrLayout {
    /// Directory holding every file of every set
    pub path: &'static [u8],
    /// Reference sets in EF_PBR record order
    pub sets: Vec<ReferenceSet, MAX_REFERENCE_SETS>,
    /// Built from the fixed SIM files instead of EF_PBR
    pub legacy: bool,
}

impl PbrLayout {
    /// The fixed EF_ADN and EF_EXT1 of a SIM without EF_PBR
    #[must_use]
    pub fn legacy() -> Self {
        let mut set = ReferenceSet::default();
        let _ = set.files.push(PbFileInfo::new(
            ConstructedTag::Type1,
            SIM_EFADN_FILEID,
            FileType::Adn,
        ));
        let _ = set.files.push(PbFileInfo::new(
            ConstructedTag::Type3,
            SIM_EFEXT1_FILEID,
            FileType::Ext1,
        ));

        let mut sets = Vec::new();
        let _ = sets.push(set);
        Self {
            path: SIM_TELECOM_PATH,
            sets,
            legacy: true,
        }
    }

    /// Number of files across all sets
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.sets.iter().map(|set| set.files.len()).sum()
    }
}

/// Decode one EF_PBR record
#[must_use]
pub fn parse_record(data: &[u8]) -> ReferenceSet {
    let mut set = ReferenceSet::default();
    let mut pos = 0;

    while pos + 2 <= data.len() {
        let Some(constructed) = ConstructedTag::from_raw(data[pos]) else {
            break;
        };
        let block_end = (pos + 2 + usize::from(data[pos + 1])).min(data.len());
        let mut inner = pos + 2;

        while inner + 2 <= block_end {
            let tag = data[inner];
            let sub_len = usize::from(data[inner + 1]);
            if sub_len < 2 || inner + 2 + sub_len > block_end {
                warn!("[PBR] Truncated file descriptor {:#x}", tag);
                break;
            }

            let file_id = u16::from_be_bytes([data[inner + 2], data[inner + 3]]);
            let file = PbFileInfo::new(constructed, file_id, FileType::from_raw(tag));
            if set.files.push(file).is_err() {
                warn!("[PBR] Reference set holds more than {} files", MAX_PB_FILES);
                return set;
            }
            inner += 2 + sub_len;
        }

        pos = block_end;
    }

    set
}

/// Read EF_PBR, falling back to the legacy layout when it cannot be read
pub async fn read_layout<S: SimReader>(sim: &S) -> PbrLayout {
    match read_pbr(sim).await {
        Ok(layout) => layout,
        Err(e) => {
            info!("[PBR] EF_PBR unavailable ({}), using SIM phonebook", e);
            PbrLayout::legacy()
        }
    }
}

async fn read_pbr<S: SimReader>(sim: &S) -> Result<PbrLayout, SimError> {
    let info = sim
        .read_file_info(SIM_EFPBR_FILEID, FileStructure::LinearFixed, USIM_PHONEBOOK_PATH)
        .await?;
    let records = info.record_count();
    if records == 0 {
        return Err(SimError::InvalidRecord);
    }

    let mut layout = PbrLayout {
        path: USIM_PHONEBOOK_PATH,
        sets: Vec::new(),
        legacy: false,
    };
    for record in 1..=records.min(MAX_REFERENCE_SETS as u16) {
        // bounded by MAX_REFERENCE_SETS
        let record = record as u8;
        let data = sim
            .read_record(
                SIM_EFPBR_FILEID,
                FileStructure::LinearFixed,
                record,
                info.record_length,
                USIM_PHONEBOOK_PATH,
            )
            .await?;
        let _ = layout.sets.push(parse_record(&data));
    }
    if usize::from(records) > MAX_REFERENCE_SETS {
        warn!("[PBR] Ignoring EF_PBR records past {}", MAX_REFERENCE_SETS);
    }

    debug!(
        "[PBR] {} reference sets, {} files",
        layout.sets.len(),
        layout.file_count()
    );
    Ok(layout)
}
