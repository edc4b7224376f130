//! `Callbird` Constants
//!
//! This module contains all the constants used throughout the `Callbird` library.
//! These constants define buffer capacities, AT response prefixes, and the
//! standardized SIM file identifiers used by the phonebook pipeline.

/// Maximum length of a single AT response or unsolicited line
pub const MAX_AT_LINE_LENGTH: usize = 256;

/// Maximum number of intermediate lines collected for one AT command
pub const MAX_AT_RESPONSE_LINES: usize = 16;

/// Maximum length of an outgoing AT command
pub const MAX_AT_COMMAND_LENGTH: usize = 64;

/// Maximum number of HF indicators tracked from `AT+BIND=?`
pub const MAX_HF_INDICATORS: usize = 20;

/// Maximum number of subscriber numbers returned by `AT+CNUM`
pub const MAX_SUBSCRIBER_NUMBERS: usize = 4;

/// Maximum phone number length (digits plus optional `+`)
pub const MAX_PHONE_NUMBER_LENGTH: usize = 48;

/// Depth of the handsfree request, response and event channels
pub const MAX_CHANNELS: usize = 8;

/// Maximum number of EF_PBR records (reference sets) handled
pub const MAX_REFERENCE_SETS: usize = 4;

/// Maximum number of file descriptors in one reference set
pub const MAX_PB_FILES: usize = 16;

/// Maximum number of phonebook entries across all reference sets
pub const MAX_PHONEBOOK_ENTRIES: usize = 256;

/// Highest valid record number of a linear fixed file
pub const MAX_RECORD_NUMBER: u16 = 254;

/// Capacity of the pending record work queue
///
/// Every ADN record keeps at most one pending record per other file of its
/// set while the master file is read.
pub const MAX_PENDING_RECORDS: usize = MAX_RECORD_NUMBER as usize * MAX_PB_FILES;

/// Maximum size of a SIM record
pub const MAX_RECORD_LENGTH: usize = 255;

/// Maximum length of a decoded SIM alpha string
pub const MAX_ALPHA_LENGTH: usize = 64;

/// Maximum number of chained EF_EXT1 records followed for one number
pub const MAX_EXT1_CHAIN: u8 = 8;

/// `+BRSF:` supported features response prefix
pub const BRSF_PREFIX: &str = "+BRSF:";

/// `+CIND:` indicator response prefix
pub const CIND_PREFIX: &str = "+CIND:";

/// `+CHLD:` call hold response prefix
pub const CHLD_PREFIX: &str = "+CHLD:";

/// `+BIND:` HF indicator response prefix
pub const BIND_PREFIX: &str = "+BIND:";

/// `+CIEV:` indicator event prefix
pub const CIEV_PREFIX: &str = "+CIEV:";

/// `+BSIR:` in-band ring tone prefix
pub const BSIR_PREFIX: &str = "+BSIR:";

/// `+BVRA:` voice recognition prefix
pub const BVRA_PREFIX: &str = "+BVRA:";

/// `+CNUM:` subscriber number prefix
pub const CNUM_PREFIX: &str = "+CNUM:";

/// `+BINP:` phone number attachment prefix
pub const BINP_PREFIX: &str = "+BINP:";

/// CVSD codec identifier for `AT+BAC`
pub const HFP_CODEC_CVSD: u8 = 1;

/// mSBC codec identifier for `AT+BAC`
pub const HFP_CODEC_MSBC: u8 = 2;

/// `+CNUM` service value for voice
pub const CNUM_SERVICE_VOICE: u32 = 4;

/// EF_PBR file identifier
pub const SIM_EFPBR_FILEID: u16 = 0x4F30;

/// EF_ADN file identifier (legacy telecom directory)
pub const SIM_EFADN_FILEID: u16 = 0x6F3A;

/// EF_EXT1 file identifier (legacy telecom directory)
pub const SIM_EFEXT1_FILEID: u16 = 0x6F4A;

/// Path to DF_PHONEBOOK under DF_TELECOM on a USIM
pub const USIM_PHONEBOOK_PATH: &[u8] = &[0x3F, 0x00, 0x7F, 0x10, 0x5F, 0x3A];

/// Path to DF_TELECOM on a SIM
pub const SIM_TELECOM_PATH: &[u8] = &[0x3F, 0x00, 0x7F, 0x10];

/// Unused record byte
pub const UNUSED: u8 = 0xFF;
