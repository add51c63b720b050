//! The persisted credential record and two stores for it.
//!
//! The record is 6 bytes: the five digits at offsets `0..5` followed by the
//! status byte at offset `5`, which holds `PASSWORD_SAVED` once a credential
//! was provisioned. Digits are written before the status byte, so a record
//! only ever becomes configured after its digits are in place.
//!
//! ```text
//!  offset   0    1    2    3    4    5
//!         +----+----+----+----+----+------+
//!         | d0 | d1 | d2 | d3 | d4 | 0x23 |
//!         +----+----+----+----+----+------+
//! ```

use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use log::{debug, warn};

use crate::{
    error::StoreError,
    peripherals::CredentialStore,
    protocol::{Credential, Status, DIGITS},
};

pub const RECORD_LEN: usize = DIGITS + 1;
pub const STATUS_OFFSET: usize = DIGITS;

const ERASED: u8 = 0xFF;

// =============================================================================
// Record access
// =============================================================================

pub fn read_status(store: &mut dyn CredentialStore) -> Result<Status, StoreError> {
    Ok(Status::from(store.read_byte(STATUS_OFFSET)?))
}

/// Read the stored credential, `None` when the record is not configured or
/// its digits are corrupt. The control node reports a corrupt record as
/// unconfigured, so the HMI node provisions it again.
pub fn load(store: &mut dyn CredentialStore) -> Result<Option<Credential>, StoreError> {
    if read_status(store)? != Status::Configured {
        return Ok(None);
    }
    let mut digits = [0_u8; DIGITS];
    for (offset, slot) in digits.iter_mut().enumerate() {
        *slot = store.read_byte(offset)?;
    }
    match Credential::new(digits) {
        Ok(credential) => Ok(Some(credential)),
        Err(e) => {
            warn!("stored credential is corrupt ({}), ignoring it", e);
            Ok(None)
        }
    }
}

/// Replace the whole record with `credential`.
pub fn save(store: &mut dyn CredentialStore, credential: &Credential) -> Result<(), StoreError> {
    for (offset, &digit) in credential.digits().iter().enumerate() {
        store.write_byte(offset, digit)?;
    }
    store.write_byte(STATUS_OFFSET, Status::Configured.into())?;
    debug!("credential record saved");
    Ok(())
}

fn check_offset(offset: usize) -> Result<(), StoreError> {
    if offset < RECORD_LEN {
        Ok(())
    } else {
        Err(StoreError::OutOfRange(offset))
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// A record in RAM. Clones share the same record, so a test can keep a handle
/// while the control node owns another.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    record: Arc<Mutex<[u8; RECORD_LEN]>>,
}

impl MemoryStore {
    /// An erased store (unconfigured).
    pub fn new() -> Self {
        MemoryStore {
            record: Arc::new(Mutex::new([ERASED; RECORD_LEN])),
        }
    }

    /// A store already holding `credential`.
    pub fn with_credential(credential: &Credential) -> Self {
        let mut record = [ERASED; RECORD_LEN];
        record[..DIGITS].copy_from_slice(credential.digits());
        record[STATUS_OFFSET] = Status::Configured.into();
        MemoryStore {
            record: Arc::new(Mutex::new(record)),
        }
    }

    /// Copy of the raw record.
    pub fn snapshot(&self) -> [u8; RECORD_LEN] {
        *self.record.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryStore {
    fn read_byte(&mut self, offset: usize) -> Result<u8, StoreError> {
        check_offset(offset)?;
        Ok(self.snapshot()[offset])
    }

    fn write_byte(&mut self, offset: usize, value: u8) -> Result<(), StoreError> {
        check_offset(offset)?;
        self.record.lock().unwrap_or_else(|e| e.into_inner())[offset] = value;
        Ok(())
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// A record kept in a 6-byte file, standing in for the control node's EEPROM.
/// A missing or short file reads as erased.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    file: File,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        let len = file.metadata()?.len() as usize;
        if len < RECORD_LEN {
            file.seek(SeekFrom::Start(len as u64))?;
            file.write_all(&[ERASED; RECORD_LEN][len..])?;
            file.sync_all()?;
        }
        debug!("credential store at {}", path.display());
        Ok(FileStore { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    fn read_byte(&mut self, offset: usize) -> Result<u8, StoreError> {
        check_offset(offset)?;
        let mut buf = [0_u8; 1];
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn write_byte(&mut self, offset: usize, value: u8) -> Result<(), StoreError> {
        check_offset(offset)?;
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.write_all(&[value])?;
        self.file.sync_data()?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
