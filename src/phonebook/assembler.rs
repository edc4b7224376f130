//! Phonebook export pipeline
//!
//! [`PhonebookAssembler::export`] runs the whole read:
//!
//! 1. EF_PBR (or the legacy layout) gives the reference sets
//! 2. per set, the size of every listed file is read
//! 3. EF_ADN is read record by record; each decoded entry schedules its
//!    linked records (type 1 siblings, EXT1 extensions)
//! 4. the pending queue is drained one record at a time; IAP records add
//!    their type 2 links to the queue
//! 5. once every set is done, entries go to the sink in (set, index) order
//!
//! Any failed read aborts the export and discards what was assembled.

use super::pbr::{self, PbrLayout, ReferenceSet};
use super::records::{self, PendingQueue, RecordContext};
use super::{FileType, PhonebookEntries, PhonebookError, PhonebookSink};
use crate::constants::MAX_RECORD_NUMBER;
use crate::sim::{FileStructure, SimReader};

/// Outcome of a completed export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExportSummary {
    /// Entries handed to the sink
    pub entries: usize,
    /// Reference sets found
    pub reference_sets: usize,
    /// Phonebook files listed across all sets
    pub files: usize,
    /// Read from the fixed SIM files because EF_PBR was unavailable
    pub legacy_layout: bool,
    /// Entries lost because the entry store was full
    pub dropped: usize,
}

impl ExportSummary {
    /// Whether the SIM lists any phonebook file at all
    #[must_use]
    pub fn has_phonebook(&self) -> bool {
        self.files > 0
    }

    /// Whether nothing was exported
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

/// Working storage for phonebook exports
///
/// The assembler is large; firmware typically keeps one in a `static`.
pub struct PhonebookAssembler {
    entries: PhonebookEntries,
    pending: PendingQueue,
}

impl Default for PhonebookAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PhonebookAssembler {
    /// Create an assembler with empty storage
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: PhonebookEntries::new(),
            pending: PendingQueue::new(),
        }
    }

    /// Read the whole phonebook from `sim` and pass every entry to `sink`
    ///
    /// A SIM without any phonebook file completes with an [`ExportSummary`]
    /// whose [`ExportSummary::has_phonebook`] is `false`.
    ///
    /// # Errors
    /// Returns the first failed read or [`PhonebookError::QueueFull`]; the
    /// sink is not called in that case.
    pub async fn export<S: SimReader, K: PhonebookSink>(
        &mut self,
        sim: &S,
        sink: &mut K,
    ) -> Result<ExportSummary, PhonebookError> {
        self.reset();

        let mut layout = pbr::read_layout(sim).await;
        let mut summary = ExportSummary {
            reference_sets: layout.sets.len(),
            files: layout.file_count(),
            legacy_layout: layout.legacy,
            ..ExportSummary::default()
        };
        if !summary.has_phonebook() {
            info!("[PHONEBOOK] No phonebook files on SIM");
            return Ok(summary);
        }

        if let Err(e) = self.read_sets(sim, &mut layout).await {
            error!("[PHONEBOOK] Export failed: {}", e);
            self.reset();
            return Err(e);
        }

        for entry in self.entries.iter() {
            sink.entry(entry);
        }
        summary.entries = self.entries.len();
        summary.dropped = self.entries.dropped();
        self.reset();

        info!(
            "[PHONEBOOK] Exported {} entries from {} reference sets",
            summary.entries, summary.reference_sets
        );
        Ok(summary)
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.pending.clear();
    }

    async fn read_sets<S: SimReader>(
        &mut self,
        sim: &S,
        layout: &mut PbrLayout,
    ) -> Result<(), PhonebookError> {
        let path = layout.path;
        for (set_index, set) in layout.sets.iter_mut().enumerate() {
            if set.files.is_empty() {
                continue;
            }
            read_file_sizes(sim, path, set).await?;
            // bounded by MAX_REFERENCE_SETS
            self.read_set(sim, path, set_index as u8, set).await?;
        }
        Ok(())
    }

    async fn read_set<S: SimReader>(
        &mut self,
        sim: &S,
        path: &[u8],
        set_index: u8,
        set: &ReferenceSet,
    ) -> Result<(), PhonebookError> {
        let Some(adn) = set.find(FileType::Adn).copied() else {
            warn!("[PHONEBOOK] Reference set {} has no EF_ADN", set_index);
            return Ok(());
        };
        if adn.record_length == 0 {
            return Err(PhonebookError::InvalidFile(adn.file_id));
        }

        let mut ctx = RecordContext {
            set,
            set_index,
            entries: &mut self.entries,
            pending: &mut self.pending,
        };

        let record_count =
            (adn.file_length / u16::from(adn.record_length)).min(MAX_RECORD_NUMBER);
        debug!(
            "[PHONEBOOK] Set {}: {} ADN records of {} bytes",
            set_index, record_count, adn.record_length
        );
        for record in 1..=record_count {
            // bounded by MAX_RECORD_NUMBER
            let record = record as u8;
            let data = sim
                .read_record(
                    adn.file_id,
                    FileStructure::LinearFixed,
                    record,
                    adn.record_length,
                    path,
                )
                .await?;
            records::handle_adn(&mut ctx, record, &data)?;
        }

        while let Some(pending) = ctx.pending.pop_front() {
            if pending.record == 0 || pending.record_length == 0 {
                debug!(
                    "[PHONEBOOK] Skipping link to record {} of {:#x}",
                    pending.record, pending.file_id
                );
                continue;
            }
            let data = sim
                .read_record(
                    pending.file_id,
                    FileStructure::LinearFixed,
                    pending.record,
                    pending.record_length,
                    path,
                )
                .await?;
            records::handle_linked(&mut ctx, &pending, &data)?;
        }
        Ok(())
    }
}

async fn read_file_sizes<S: SimReader>(
    sim: &S,
    path: &[u8],
    set: &mut ReferenceSet,
) -> Result<(), PhonebookError> {
    for file in &mut set.files {
        let info = sim
            .read_file_info(file.file_id, FileStructure::LinearFixed, path)
            .await?;
        file.file_length = info.file_length;
        file.record_length = info.record_length;
    }
    Ok(())
}
