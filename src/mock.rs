//! In-memory AT channel and SIM used by the unit tests

use core::cell::RefCell;
use core::future::poll_fn;
use core::task::Poll;

use heapless::{Deque, String, Vec};

use crate::at::{AtChannel, AtError, AtLine, AtResponse};
use crate::sim::{FileInfo, FileStructure, SimError, SimReader, SimRecord};

type Command = String<64>;

/// AT channel replaying a script of expected commands and their replies
pub struct ScriptedChannel {
    script: RefCell<Deque<(Command, Result<AtResponse, AtError>), 16>>,
    sent: RefCell<Vec<Command, 32>>,
    posted: RefCell<Vec<Command, 8>>,
    registered: RefCell<Vec<&'static str, 8>>,
    unsolicited: RefCell<Deque<AtLine, 8>>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self {
            script: RefCell::new(Deque::new()),
            sent: RefCell::new(Vec::new()),
            posted: RefCell::new(Vec::new()),
            registered: RefCell::new(Vec::new()),
            unsolicited: RefCell::new(Deque::new()),
        }
    }

    /// Expect `command` next and answer with `lines` followed by `OK`
    pub fn expect(&self, command: &str, lines: &[&str]) -> &Self {
        let response = AtResponse::from_lines(lines).unwrap();
        self.expect_result(command, Ok(response))
    }

    /// Expect `command` next and fail it with `error`
    pub fn expect_error(&self, command: &str, error: AtError) -> &Self {
        self.expect_result(command, Err(error))
    }

    fn expect_result(&self, command: &str, result: Result<AtResponse, AtError>) -> &Self {
        self.script
            .borrow_mut()
            .push_back((Command::try_from(command).unwrap(), result))
            .unwrap();
        self
    }

    /// Queue an unsolicited line
    pub fn push_unsolicited(&self, line: &str) {
        self.unsolicited
            .borrow_mut()
            .push_back(AtLine::try_from(line).unwrap())
            .unwrap();
    }

    /// Commands sent so far, in order
    pub fn sent(&self) -> Vec<Command, 32> {
        self.sent.borrow().clone()
    }

    /// Commands posted without waiting for a reply
    pub fn posted(&self) -> Vec<Command, 8> {
        self.posted.borrow().clone()
    }

    /// Prefixes registered for unsolicited delivery
    pub fn registered(&self) -> Vec<&'static str, 8> {
        self.registered.borrow().clone()
    }

    /// Whether every scripted command was consumed
    pub fn script_done(&self) -> bool {
        self.script.borrow().is_empty()
    }
}

impl AtChannel for ScriptedChannel {
    async fn send(&self, command: &str, _prefixes: &[&str]) -> Result<AtResponse, AtError> {
        self.sent
            .borrow_mut()
            .push(Command::try_from(command).unwrap())
            .unwrap();
        let (expected, result) = self
            .script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected command {command}"));
        assert_eq!(expected.as_str(), command);
        result
    }

    fn post(&self, command: &str) -> Result<(), AtError> {
        self.posted
            .borrow_mut()
            .push(Command::try_from(command).unwrap())
            .map_err(|_| AtError::NotQueued)
    }

    fn register(&self, prefix: &'static str) -> Result<(), AtError> {
        self.registered
            .borrow_mut()
            .push(prefix)
            .map_err(|_| AtError::Overflow)
    }

    async fn unsolicited(&self) -> AtLine {
        poll_fn(|_| match self.unsolicited.borrow_mut().pop_front() {
            Some(line) => Poll::Ready(line),
            None => Poll::Pending,
        })
        .await
    }
}

struct SimFile {
    fileid: u16,
    path: &'static [u8],
    record_length: u8,
    records: Vec<Vec<u8, 64>, 8>,
    failing: bool,
}

/// SIM holding linear fixed files in memory
pub struct MemorySim {
    files: RefCell<Vec<SimFile, 16>>,
    reads: RefCell<Vec<(u16, u8), 128>>,
}

impl MemorySim {
    pub fn new() -> Self {
        Self {
            files: RefCell::new(Vec::new()),
            reads: RefCell::new(Vec::new()),
        }
    }

    /// Add a linear fixed file; every record is padded to `record_length` with 0xFF
    pub fn add_file(
        &self,
        fileid: u16,
        path: &'static [u8],
        record_length: u8,
        records: &[&[u8]],
    ) -> &Self {
        let mut stored = Vec::new();
        for record in records {
            let mut data: Vec<u8, 64> = Vec::from_slice(record).unwrap();
            data.resize(usize::from(record_length), 0xFF).unwrap();
            stored.push(data).unwrap();
        }
        self.files
            .borrow_mut()
            .push(SimFile {
                fileid,
                path,
                record_length,
                records: stored,
                failing: false,
            })
            .ok()
            .unwrap();
        self
    }

    /// Make every read of `fileid` fail
    pub fn fail_file(&self, fileid: u16) {
        for file in self.files.borrow_mut().iter_mut() {
            if file.fileid == fileid {
                file.failing = true;
            }
        }
    }

    /// Record reads so far as `(fileid, record)`
    pub fn reads(&self) -> Vec<(u16, u8), 128> {
        self.reads.borrow().clone()
    }
}

impl SimReader for MemorySim {
    async fn read_file_info(
        &self,
        fileid: u16,
        _structure: FileStructure,
        path: &[u8],
    ) -> Result<FileInfo, SimError> {
        let files = self.files.borrow();
        let file = files
            .iter()
            .find(|file| file.fileid == fileid && file.path == path)
            .ok_or(SimError::NotFound)?;
        if file.failing {
            return Err(SimError::Failed);
        }
        let file_length = u16::from(file.record_length) * file.records.len() as u16;
        Ok(FileInfo {
            file_length,
            record_length: file.record_length,
            structure: FileStructure::LinearFixed,
        })
    }

    async fn read_record(
        &self,
        fileid: u16,
        _structure: FileStructure,
        record: u8,
        _record_length: u8,
        path: &[u8],
    ) -> Result<SimRecord, SimError> {
        self.reads.borrow_mut().push((fileid, record)).unwrap();
        let files = self.files.borrow();
        let file = files
            .iter()
            .find(|file| file.fileid == fileid && file.path == path)
            .ok_or(SimError::NotFound)?;
        if file.failing {
            return Err(SimError::Failed);
        }
        let data = file
            .records
            .get(usize::from(record).wrapping_sub(1))
            .ok_or(SimError::InvalidRecord)?;
        Ok(SimRecord::from_slice(data).unwrap())
    }
}
