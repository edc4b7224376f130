//! Phonebook record decoders
//!
//! Each handler decodes one record of a reference set file, updates the entry
//! it belongs to and schedules the linked records it points at.
//!
//! ## EF_ADN record
//!
//! ```text
//! | name (len - 14) | num len | TON/NPI | digits (10) | CCP | EXT1 |
//! ```
//!
//! `num len` counts the TON/NPI byte plus the digit bytes.
//!
//! ## EF_ANR record
//!
//! ```text
//! | AAS | num len | TON/NPI | digits (10) | CCP | EXT1 | [ADN link] |
//! ```
//!
//! ## EF_EXT1 record
//!
//! ```text
//! | type | len | digits (10) | next EXT1 |
//! ```

use heapless::Deque;

use super::pbr::ReferenceSet;
use super::{
    AlphaString, ConstructedTag, FileType, NumberString, PbFileInfo, PendingRecord,
    PhonebookEntries, PhonebookEntry, PhonebookError,
};
use crate::constants::{MAX_EXT1_CHAIN, MAX_PENDING_RECORDS, UNUSED};
use crate::sim::{alpha, bcd};

/// Work queue of linked records
pub type PendingQueue = Deque<PendingRecord, MAX_PENDING_RECORDS>;

const ADN_TRAILER_LENGTH: usize = 14;
const ANR_MIN_LENGTH: usize = 15;
const EXT1_MIN_LENGTH: usize = 13;
const MAX_NUMBER_BYTES: usize = 10;
const EXT1_ADDITIONAL_DATA: u8 = 0x02;
const IAP_LINK_LENGTH: usize = 2;

/// State shared by the handlers while one reference set is read
pub struct RecordContext<'a> {
    /// Set being read
    pub set: &'a ReferenceSet,
    /// Position of the set in EF_PBR
    pub set_index: u8,
    /// Entries of all sets read so far
    pub entries: &'a mut PhonebookEntries,
    /// Records still to read
    pub pending: &'a mut PendingQueue,
}

impl RecordContext<'_> {
    fn schedule(
        &mut self,
        file: &PbFileInfo,
        record: u8,
        adn_index: u16,
    ) -> Result<(), PhonebookError> {
        self.push(PendingRecord {
            file_id: file.file_id,
            file_type: file.file_type,
            record_length: file.record_length,
            record,
            adn_index,
            anr_extension: false,
            set_by_iap: false,
            extension_depth: 0,
        })
    }

    fn push(&mut self, pending: PendingRecord) -> Result<(), PhonebookError> {
        self.pending.push_back(pending).map_err(|_| {
            error!("[PHONEBOOK] Pending record queue full");
            PhonebookError::QueueFull
        })
    }

    fn schedule_extension(
        &mut self,
        record: u8,
        adn_index: u16,
        anr_extension: bool,
        extension_depth: u8,
    ) -> Result<(), PhonebookError> {
        let Some(ext1) = self.set.find(FileType::Ext1).copied() else {
            debug!("[PHONEBOOK] No EF_EXT1 for extension record {}", record);
            return Ok(());
        };
        if extension_depth >= MAX_EXT1_CHAIN {
            warn!("[PHONEBOOK] EF_EXT1 chain too long for entry {}", adn_index);
            return Ok(());
        }
        self.push(PendingRecord {
            file_id: ext1.file_id,
            file_type: FileType::Ext1,
            record_length: ext1.record_length,
            record,
            adn_index,
            anr_extension,
            set_by_iap: false,
            extension_depth: extension_depth + 1,
        })
    }

    fn entry(&mut self, adn_index: u16) -> Option<&mut PhonebookEntry> {
        self.entries.get_mut(self.set_index, adn_index)
    }
}

fn decode_number(ton_npi: u8, digits: &[u8], length: u8) -> NumberString {
    let count = usize::from(length.saturating_sub(1)).min(MAX_NUMBER_BYTES);
    bcd::decode_number(ton_npi, &digits[..count.min(digits.len())])
}

fn decode_alpha(data: &[u8]) -> AlphaString {
    alpha::decode(data).unwrap_or_else(|| {
        warn!("[PHONEBOOK] Undecodable alpha string");
        AlphaString::new()
    })
}

/// Decode ADN record `record` and schedule the records linked to it
///
/// # Errors
/// Returns [`PhonebookError::QueueFull`] if the linked records do not fit the queue
pub fn handle_adn(
    ctx: &mut RecordContext<'_>,
    record: u8,
    data: &[u8],
) -> Result<(), PhonebookError> {
    let len = data.len();
    if len < ADN_TRAILER_LENGTH {
        warn!("[PHONEBOOK] Short ADN record {}", record);
        return Ok(());
    }

    let number_start = len - ADN_TRAILER_LENGTH;
    let name = decode_alpha(&data[..number_start]);

    let number_length = data[number_start];
    let mut number = NumberString::new();
    let mut extension = UNUSED;
    if number_length != UNUSED && number_length != 0 {
        number = decode_number(data[number_start + 1], &data[number_start + 2..], number_length);
        extension = data[len - 1];
    }

    if name.is_empty() && number.is_empty() {
        return Ok(());
    }

    let index = u16::from(record);
    let entry = PhonebookEntry {
        index,
        name,
        number,
        ..PhonebookEntry::default()
    };
    if !ctx.entries.insert(ctx.set_index, entry) {
        warn!("[PHONEBOOK] Entry store full, dropping ADN {}", record);
        return Ok(());
    }

    if extension != UNUSED {
        ctx.schedule_extension(extension, index, false, 0)?;
    }

    let set = ctx.set;
    for file in set.files.iter().filter(|file| {
        file.constructed == ConstructedTag::Type1
            && !matches!(file.file_type, FileType::Adn | FileType::Ext1)
    }) {
        ctx.schedule(file, record, index)?;
    }
    Ok(())
}

/// Decode an IAP record, scheduling the type 2 records it links
///
/// # Errors
/// Returns [`PhonebookError::QueueFull`] if the linked records do not fit the queue
pub fn handle_iap(
    ctx: &mut RecordContext<'_>,
    pending: &PendingRecord,
    data: &[u8],
) -> Result<(), PhonebookError> {
    let set = ctx.set;
    for (i, file) in set.type2_files().enumerate() {
        let Some(&record) = data.get(i) else {
            error!("[PHONEBOOK] IAP record {} shorter than type 2 file list", pending.record);
            break;
        };
        if record == UNUSED {
            continue;
        }

        ctx.push(PendingRecord {
            file_id: file.file_id,
            file_type: file.file_type,
            record_length: file.record_length,
            record,
            adn_index: pending.adn_index,
            anr_extension: false,
            set_by_iap: true,
            extension_depth: 0,
        })?;
    }
    Ok(())
}

fn linked_text<'d>(pending: &PendingRecord, data: &'d [u8]) -> &'d [u8] {
    if pending.set_by_iap {
        &data[..data.len().saturating_sub(IAP_LINK_LENGTH)]
    } else {
        data
    }
}

/// Decode a second name record
pub fn handle_sne(ctx: &mut RecordContext<'_>, pending: &PendingRecord, data: &[u8]) {
    let sne = decode_alpha(linked_text(pending, data));
    if sne.is_empty() {
        return;
    }
    if let Some(entry) = ctx.entry(pending.adn_index) {
        entry.sne = sne;
    }
}

/// Decode an e-mail record
pub fn handle_email(ctx: &mut RecordContext<'_>, pending: &PendingRecord, data: &[u8]) {
    let email = decode_alpha(linked_text(pending, data));
    if email.is_empty() {
        return;
    }
    if let Some(entry) = ctx.entry(pending.adn_index) {
        entry.email = email;
    }
}

/// Decode an additional number record
///
/// # Errors
/// Returns [`PhonebookError::QueueFull`] if its extension does not fit the queue
pub fn handle_anr(
    ctx: &mut RecordContext<'_>,
    pending: &PendingRecord,
    data: &[u8],
) -> Result<(), PhonebookError> {
    if data.len() < ANR_MIN_LENGTH {
        warn!("[PHONEBOOK] Short ANR record {}", pending.record);
        return Ok(());
    }
    if data[0] == UNUSED {
        return Ok(());
    }

    let number_length = data[1];
    if number_length == UNUSED || number_length == 0 {
        return Ok(());
    }
    let anr = decode_number(data[2], &data[3..], number_length);

    let Some(entry) = ctx.entry(pending.adn_index) else {
        warn!("[PHONEBOOK] ANR for missing entry {}", pending.adn_index);
        return Ok(());
    };
    entry.anr = anr;

    let extension = data[14];
    if extension != UNUSED {
        ctx.schedule_extension(extension, pending.adn_index, true, 0)?;
    }
    Ok(())
}

/// Decode an extension record, appending its digits to the main or additional number
///
/// # Errors
/// Returns [`PhonebookError::QueueFull`] if the next extension does not fit the queue
pub fn handle_ext1(
    ctx: &mut RecordContext<'_>,
    pending: &PendingRecord,
    data: &[u8],
) -> Result<(), PhonebookError> {
    if data.len() < EXT1_MIN_LENGTH {
        warn!("[PHONEBOOK] Short EXT1 record {}", pending.record);
        return Ok(());
    }

    let next = data[12];
    if next != UNUSED {
        if next == pending.record {
            warn!("[PHONEBOOK] EXT1 record {} links to itself", next);
        } else {
            ctx.schedule_extension(
                next,
                pending.adn_index,
                pending.anr_extension,
                pending.extension_depth,
            )?;
        }
    }

    if data[0] != EXT1_ADDITIONAL_DATA {
        return Ok(());
    }

    let count = usize::from(data[1]).min(MAX_NUMBER_BYTES);
    let digits = &data[2..2 + count];
    if let Some(entry) = ctx.entry(pending.adn_index) {
        let target = if pending.anr_extension {
            &mut entry.anr
        } else {
            &mut entry.number
        };
        bcd::append_digits(target, digits);
    }
    Ok(())
}

/// Dispatch a linked record to its handler
///
/// # Errors
/// Returns [`PhonebookError::QueueFull`] if follow-up records do not fit the queue
pub fn handle_linked(
    ctx: &mut RecordContext<'_>,
    pending: &PendingRecord,
    data: &[u8],
) -> Result<(), PhonebookError> {
    match pending.file_type {
        FileType::Iap => handle_iap(ctx, pending, data),
        FileType::Sne => {
            handle_sne(ctx, pending, data);
            Ok(())
        }
        FileType::Email => {
            handle_email(ctx, pending, data);
            Ok(())
        }
        FileType::Anr => handle_anr(ctx, pending, data),
        FileType::Ext1 => handle_ext1(ctx, pending, data),
        other => {
            trace!("[PHONEBOOK] Ignoring record of file type {:#x}", other.raw());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    fn file(
        constructed: ConstructedTag,
        file_id: u16,
        file_type: FileType,
        record_length: u8,
    ) -> PbFileInfo {
        PbFileInfo {
            record_length,
            ..PbFileInfo::new(constructed, file_id, file_type)
        }
    }

    fn usim_set() -> ReferenceSet {
        let mut set = ReferenceSet::default();
        let files = [
            file(ConstructedTag::Type1, 0x4F3A, FileType::Adn, 30),
            file(ConstructedTag::Type1, 0x4F25, FileType::Iap, 2),
            file(ConstructedTag::Type1, 0x4F11, FileType::Anr, 15),
            file(ConstructedTag::Type2, 0x4F50, FileType::Email, 20),
            file(ConstructedTag::Type2, 0x4F19, FileType::Sne, 18),
            file(ConstructedTag::Type3, 0x4F4A, FileType::Ext1, 13),
        ];
        for f in files {
            set.files.push(f).unwrap();
        }
        set
    }

    /// ADN record with a 16-byte name field
    fn adn(name: &str, number_length: u8, ton: u8, digits: &[u8], ext: u8) -> Vec<u8, 30> {
        let mut data: Vec<u8, 30> = Vec::new();
        data.extend_from_slice(name.as_bytes()).unwrap();
        data.resize(16, 0xFF).unwrap();
        data.push(number_length).unwrap();
        data.push(ton).unwrap();
        data.extend_from_slice(digits).unwrap();
        data.resize(28, 0xFF).unwrap();
        data.push(0xFF).unwrap();
        data.push(ext).unwrap();
        data
    }

    fn pending(file_type: FileType, record: u8, adn_index: u16) -> PendingRecord {
        PendingRecord {
            file_id: 0,
            file_type,
            record_length: 0,
            record,
            adn_index,
            anr_extension: false,
            set_by_iap: false,
            extension_depth: 0,
        }
    }

    #[test]
    fn test_adn_international_number() {
        let set = ReferenceSet::default();
        let mut entries = PhonebookEntries::new();
        let mut queue = PendingQueue::new();
        let mut ctx = RecordContext {
            set: &set,
            set_index: 0,
            entries: &mut entries,
            pending: &mut queue,
        };

        let data = adn("Alice", 0x05, 0x91, &[0x21, 0x43, 0x65, 0x00], 0xFF);
        handle_adn(&mut ctx, 3, &data).unwrap();

        let entry = entries.get_mut(0, 3).unwrap();
        assert_eq!(entry.name.as_str(), "Alice");
        assert!(entry.number.starts_with('+'));
        assert_eq!(entry.number.as_str(), "+12345600");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_adn_empty_record_creates_nothing() {
        let set = usim_set();
        let mut entries = PhonebookEntries::new();
        let mut queue = PendingQueue::new();
        let mut ctx = RecordContext {
            set: &set,
            set_index: 0,
            entries: &mut entries,
            pending: &mut queue,
        };

        handle_adn(&mut ctx, 1, &[0xFF; 30]).unwrap();
        handle_adn(&mut ctx, 2, &[0x41; 10]).unwrap();
        assert!(entries.is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_adn_schedules_linked_records() {
        let set = usim_set();
        let mut entries = PhonebookEntries::new();
        let mut queue = PendingQueue::new();
        let mut ctx = RecordContext {
            set: &set,
            set_index: 0,
            entries: &mut entries,
            pending: &mut queue,
        };

        let data = adn("Bob", 0x02, 0x81, &[0x21], 0x04);
        handle_adn(&mut ctx, 7, &data).unwrap();

        let scheduled: Vec<(u16, u8), 8> = queue.iter().map(|p| (p.file_id, p.record)).collect();
        assert_eq!(scheduled.as_slice(), &[(0x4F4A, 4), (0x4F25, 7), (0x4F11, 7)]);
        assert!(queue.iter().all(|p| p.adn_index == 7));
    }

    #[test]
    fn test_adn_extension_ignored_without_number() {
        let set = usim_set();
        let mut entries = PhonebookEntries::new();
        let mut queue = PendingQueue::new();
        let mut ctx = RecordContext {
            set: &set,
            set_index: 0,
            entries: &mut entries,
            pending: &mut queue,
        };

        let data = adn("Carol", 0xFF, 0xFF, &[], 0x02);
        handle_adn(&mut ctx, 1, &data).unwrap();
        assert!(queue.iter().all(|p| p.file_type != FileType::Ext1));
        assert_eq!(entries.get_mut(0, 1).unwrap().number.as_str(), "");
    }

    #[test]
    fn test_iap_links_type2_files_in_order() {
        let set = usim_set();
        let mut entries = PhonebookEntries::new();
        let mut queue = PendingQueue::new();
        let mut ctx = RecordContext {
            set: &set,
            set_index: 0,
            entries: &mut entries,
            pending: &mut queue,
        };

        handle_iap(&mut ctx, &pending(FileType::Iap, 5, 5), &[0x02, 0xFF]).unwrap();
        assert_eq!(ctx.pending.len(), 1);
        let linked = ctx.pending.pop_front().unwrap();
        assert_eq!(linked.file_id, 0x4F50);
        assert_eq!(linked.record, 2);
        assert_eq!(linked.adn_index, 5);
        assert!(linked.set_by_iap);

        // shorter than the type 2 list: stops after the first file
        handle_iap(&mut ctx, &pending(FileType::Iap, 6, 6), &[0x01]).unwrap();
        assert_eq!(ctx.pending.len(), 1);
    }

    #[test]
    fn test_email_set_by_iap_drops_link_bytes() {
        let set = usim_set();
        let mut entries = PhonebookEntries::new();
        entries.insert(
            0,
            PhonebookEntry {
                index: 5,
                ..PhonebookEntry::default()
            },
        );
        let mut queue = PendingQueue::new();
        let mut ctx = RecordContext {
            set: &set,
            set_index: 0,
            entries: &mut entries,
            pending: &mut queue,
        };

        let mut email = pending(FileType::Email, 2, 5);
        email.set_by_iap = true;
        handle_email(&mut ctx, &email, b"a\x00b.c\xFF\xFF\x01\x05");
        assert_eq!(ctx.entry(5).unwrap().email.as_str(), "a@b.c");

        // empty value keeps the previous one
        handle_email(&mut ctx, &email, &[0xFF; 8]);
        assert_eq!(ctx.entry(5).unwrap().email.as_str(), "a@b.c");
    }

    #[test]
    fn test_anr_with_extension() {
        let set = usim_set();
        let mut entries = PhonebookEntries::new();
        entries.insert(
            0,
            PhonebookEntry {
                index: 4,
                ..PhonebookEntry::default()
            },
        );
        let mut queue = PendingQueue::new();
        let mut ctx = RecordContext {
            set: &set,
            set_index: 0,
            entries: &mut entries,
            pending: &mut queue,
        };

        let data = [
            0x00, 0x03, 0x81, 0x55, 0x66, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
            0x09,
        ];
        handle_anr(&mut ctx, &pending(FileType::Anr, 4, 4), &data).unwrap();
        assert_eq!(ctx.entry(4).unwrap().anr.as_str(), "5566");

        let ext = queue.pop_front().unwrap();
        assert_eq!(ext.file_type, FileType::Ext1);
        assert_eq!(ext.record, 9);
        assert!(ext.anr_extension);
    }

    #[test]
    fn test_anr_requires_entry_and_length() {
        let set = usim_set();
        let mut entries = PhonebookEntries::new();
        let mut queue = PendingQueue::new();
        let mut ctx = RecordContext {
            set: &set,
            set_index: 0,
            entries: &mut entries,
            pending: &mut queue,
        };

        let data = [
            0x00, 0x02, 0x81, 0x21, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
            0x03,
        ];
        handle_anr(&mut ctx, &pending(FileType::Anr, 1, 1), &data).unwrap();
        handle_anr(&mut ctx, &pending(FileType::Anr, 1, 1), &data[..14]).unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_ext1_appends_and_chains() {
        let set = usim_set();
        let mut entries = PhonebookEntries::new();
        entries.insert(
            0,
            PhonebookEntry {
                index: 2,
                number: NumberString::try_from("+1234").unwrap(),
                ..PhonebookEntry::default()
            },
        );
        let mut queue = PendingQueue::new();
        let mut ctx = RecordContext {
            set: &set,
            set_index: 0,
            entries: &mut entries,
            pending: &mut queue,
        };

        let data = [0x02, 0x02, 0x65, 0x87, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x06];
        let mut ext = pending(FileType::Ext1, 3, 2);
        ext.extension_depth = 1;
        handle_ext1(&mut ctx, &ext, &data).unwrap();

        assert_eq!(ctx.entry(2).unwrap().number.as_str(), "+12345678");
        let next = queue.pop_front().unwrap();
        assert_eq!(next.record, 6);
        assert_eq!(next.extension_depth, 2);
        assert!(!next.anr_extension);
    }

    #[test]
    fn test_ext1_schedules_before_type_check() {
        let set = usim_set();
        let mut entries = PhonebookEntries::new();
        let mut queue = PendingQueue::new();
        let mut ctx = RecordContext {
            set: &set,
            set_index: 0,
            entries: &mut entries,
            pending: &mut queue,
        };

        // called party subaddress record, still chained
        let data = [0x01, 0x02, 0x65, 0x87, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x08];
        handle_ext1(&mut ctx, &pending(FileType::Ext1, 3, 2), &data).unwrap();
        assert_eq!(ctx.pending.len(), 1);

        // self link and chain limit
        let looping = [
            0x02, 0x01, 0x11, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x05,
        ];
        handle_ext1(&mut ctx, &pending(FileType::Ext1, 5, 2), &looping).unwrap();
        let mut deep = pending(FileType::Ext1, 4, 2);
        deep.extension_depth = MAX_EXT1_CHAIN;
        handle_ext1(&mut ctx, &deep, &looping).unwrap();
        assert_eq!(ctx.pending.len(), 1);
    }
}
