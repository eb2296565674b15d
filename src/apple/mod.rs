//! AppleSingle containers.
//!
//! An AppleSingle file is a 26 byte header followed by a directory of
//! 12 byte entry descriptors, each pointing at one typed block of the
//! same file. Everything on the wire is big endian.

use num_enum::{
    TryFromPrimitive,
    IntoPrimitive,
};
use strum::{
    Display,
    EnumIter,
};
use thiserror::Error;

mod extract;
mod header;

pub use extract::{
    extract,
    ExtractMode,
    Forks,
};
pub use header::{
    parse,
    parse_with,
    sniff,
    Container,
    ContainerIndex,
    DirectoryEntry,
    EntryDescriptor,
    Header,
    HEADER_SIZE,
    MAGIC,
    VERSION,
};

#[derive(
    Debug,
    Copy, Clone,
    Eq, PartialEq,
    Ord, PartialOrd,
    Hash,
    TryFromPrimitive, IntoPrimitive,
    Display, EnumIter,
)]
#[repr(u32)]
pub enum EntryKind {
    #[strum(to_string = "Data Fork")]
    DataFork = 1,
    #[strum(to_string = "Resource Fork")]
    ResourceFork,
    #[strum(to_string = "Real Name")]
    RealName,
    #[strum(to_string = "Comment")]
    Comment,
    #[strum(to_string = "Icon, B&W")]
    IconBW,
    #[strum(to_string = "Icon, Color")]
    IconColor,
    #[strum(to_string = "Obsolete v1 File Info")]
    ObsoleteFileInfo,
    #[strum(to_string = "File Dates Info")]
    FileDatesInfo,
    #[strum(to_string = "Finder Info")]
    FinderInfo,
    #[strum(to_string = "Macintosh File Info")]
    MacintoshFileInfo,
    #[strum(to_string = "ProDOS File Info")]
    ProDOSFileInfo,
    #[strum(to_string = "MS-DOS File Info")]
    MSDOSFileInfo,
    #[strum(to_string = "Short Name")]
    ShortName,
    #[strum(to_string = "AFP File Info")]
    AFPFileInfo,
    #[strum(to_string = "Directory ID")]
    DirectoryID,
}

impl EntryKind {
    pub fn is_fork(self) -> bool {
        matches!(self, Self::DataFork | Self::ResourceFork)
    }
}

/// Names a wire field, so a short read can say what it was reading.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
pub enum Field {
    #[strum(to_string = "magic")]
    Magic,
    #[strum(to_string = "version")]
    Version,
    #[strum(to_string = "filler")]
    Filler,
    #[strum(to_string = "entries")]
    EntryCount,
    #[strum(to_string = "entry_id")]
    EntryId,
    #[strum(to_string = "offset")]
    EntryOffset,
    #[strum(to_string = "length")]
    EntryLength,
}

/// Parser configuration, handed in by the caller on every parse.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Options {
    /// Log every field and entry block name at debug level.
    pub verbose: bool,
}

impl Options {
    pub fn verbose() -> Self {
        Self { verbose: true }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("magic not {expected:#x} (found {0:#x})", expected = MAGIC)]
    BadMagic(u32),
    #[error("version not {expected:#x} (found {0:#x})", expected = VERSION)]
    BadVersion(u32),
    #[error("filler {index} not 0x0 (found {value:#x})")]
    BadFiller { index: usize, value: u32 },
    #[error("entry id cannot be 0")]
    InvalidEntryId,
    #[error("entry id {0} not in type table")]
    UnknownEntryId(u32),
    #[error("entry {0} already existed in this AppleSingle")]
    DuplicateEntryId(EntryKind),
    #[error("file not long enough for entries: length = {actual}, expected = {expected}")]
    TruncatedFile { expected: u64, actual: u64 },
    #[error("couldn't read bytes when getting {0}")]
    UnexpectedEof(Field),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no {0} in this file")]
    ForkNotPresent(EntryKind),
    #[error("internal error: {kind} extracted {actual} bytes, expected {expected}")]
    InternalSliceMismatch { kind: EntryKind, expected: u64, actual: u64 },
}
