use std::{
    collections::{btree_map, BTreeMap},
    ops::Range,
};

use bytes::Bytes;
use deku::prelude::*;
use derive_more::{From, Into};
use nom::{
    IResult,
    number::complete::{be_u16, be_u32},
};
use tracing::{debug, trace};

use super::{
    EntryKind,
    Field,
    Options,
    ParseError,
};

type Result<T> = ::core::result::Result<T, ParseError>;
type BIResult<'a, T> = IResult<&'a [u8], T>;

pub const MAGIC: u32 = 0x0005_1600;
pub const VERSION: u32 = 0x0002_0000;
/// Magic, version, four fillers and the entry count.
pub const HEADER_SIZE: usize = 26;

const FILLERS: usize = 4;

/// One 12 byte record of the entry directory, as it appears on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "big")]
pub struct EntryDescriptor {
    pub id: u32,
    pub offset: u32,
    pub length: u32,
}

impl EntryDescriptor {
    pub const SIZE: usize = 12;

    /// First byte past the described block. Never overflows.
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.length as u64
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub kind: EntryKind,
    pub offset: u32,
    pub length: u32,
}

impl DirectoryEntry {
    fn kind_of(id: u32) -> Result<EntryKind> {
        match id {
            0 => Err(ParseError::InvalidEntryId),
            id => EntryKind::try_from(id).or(Err(ParseError::UnknownEntryId(id))),
        }
    }
    pub fn end(&self) -> u64 {
        EntryDescriptor::from(*self).end()
    }
    /// Byte range of the block, saturated where `usize` is too narrow.
    pub fn range(&self) -> Range<usize> {
        let start = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let end = usize::try_from(self.end()).unwrap_or(usize::MAX);
        start..end
    }
}

impl TryFrom<EntryDescriptor> for DirectoryEntry {
    type Error = ParseError;
    fn try_from(descriptor: EntryDescriptor) -> Result<Self> {
        let EntryDescriptor { id, offset, length } = descriptor;
        let kind = Self::kind_of(id)?;
        Ok(Self { kind, offset, length })
    }
}

impl From<DirectoryEntry> for EntryDescriptor {
    fn from(entry: DirectoryEntry) -> Self {
        let DirectoryEntry { kind, offset, length } = entry;
        Self {
            id: kind.into(),
            offset,
            length,
        }
    }
}

/// Entries of one container, at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, From, Into)]
pub struct ContainerIndex(BTreeMap<EntryKind, DirectoryEntry>);

impl ContainerIndex {
    fn insert(&mut self, entry: DirectoryEntry) -> Result<()> {
        let Self(entries) = self;
        match entries.entry(entry.kind) {
            btree_map::Entry::Occupied(_) => Err(ParseError::DuplicateEntryId(entry.kind)),
            btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            },
        }
    }
    pub fn get(&self, kind: EntryKind) -> Option<&DirectoryEntry> {
        self.0.get(&kind)
    }
    pub fn contains(&self, kind: EntryKind) -> bool {
        self.0.contains_key(&kind)
    }
    pub fn kinds(&self) -> impl Iterator<Item = EntryKind> + '_ {
        self.0.keys().copied()
    }
    pub fn iter(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.0.values()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, From, Into)]
pub struct Header {
    pub magic: u32,
    pub version: u32,
}

impl Header {
    pub const fn calculate_size(n_entries: usize) -> usize {
        HEADER_SIZE + n_entries * EntryDescriptor::SIZE
    }
}

/// A fully validated AppleSingle file.
///
/// Only [`parse`] builds one, so every entry in the index lies inside the
/// retained buffer.
#[derive(Debug, Clone)]
pub struct Container {
    header: Header,
    index: ContainerIndex,
    buffer: Bytes,
    high_water: u64,
}

impl Container {
    pub fn header(&self) -> Header {
        self.header
    }
    pub fn index(&self) -> &ContainerIndex {
        &self.index
    }
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }
    pub fn len(&self) -> usize {
        self.buffer.len()
    }
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
    /// Largest `offset + length` over all entries.
    pub fn high_water(&self) -> u64 {
        self.high_water
    }

    /// Skips every check, so tests can hand `extract` a broken index.
    #[cfg(test)]
    pub(crate) fn unchecked(buffer: impl Into<Bytes>, entries: &[DirectoryEntry]) -> Self {
        let index = entries.iter()
            .map(|entry| (entry.kind, *entry))
            .collect::<BTreeMap<_, _>>();
        let high_water = entries.iter()
            .map(DirectoryEntry::end)
            .max()
            .unwrap_or(0);
        Self {
            header: Header { magic: MAGIC, version: VERSION },
            index: index.into(),
            buffer: buffer.into(),
            high_water,
        }
    }
}

/// Sequential big endian field reader over the raw container.
struct Fields<'a> {
    bytes: &'a [u8],
    options: Options,
}

impl<'a> Fields<'a> {
    fn new(bytes: &'a [u8], options: Options) -> Self {
        Self { bytes, options }
    }
    fn read<T>(
        &mut self,
        field: Field,
        parser: fn(&'a [u8]) -> BIResult<'a, T>,
    ) -> Result<T>
        where T: Into<u64> + Copy {
        let (bytes, value) = parser(self.bytes)
            .map_err(|_| ParseError::UnexpectedEof(field))?;
        self.bytes = bytes;
        if self.options.verbose {
            debug!("{field} = {:#x}", Into::<u64>::into(value));
        }
        Ok(value)
    }
    fn u32(&mut self, field: Field) -> Result<u32> {
        self.read(field, be_u32)
    }
    fn u16(&mut self, field: Field) -> Result<u16> {
        self.read(field, be_u16)
    }
    /// A zero id is refused as soon as it is read.
    fn descriptor(&mut self) -> Result<EntryDescriptor> {
        let id = self.u32(Field::EntryId)?;
        if id == 0 {
            return Err(ParseError::InvalidEntryId);
        }
        let offset = self.u32(Field::EntryOffset)?;
        let length = self.u32(Field::EntryLength)?;
        Ok(EntryDescriptor { id, offset, length })
    }
}

/// Cheap pre-check: do these bytes start with the AppleSingle magic?
pub fn sniff(bytes: &[u8]) -> bool {
    matches!(be_u32::<_, nom::error::Error<_>>(bytes), Ok((_, MAGIC)))
}

pub fn parse(buffer: impl Into<Bytes>) -> Result<Container> {
    parse_with(buffer, Options::default())
}

/// Validates the header and entry directory of `buffer`.
///
/// Every check is fatal; the first failure is returned and nothing of the
/// partially read directory escapes. The whole directory is read before
/// any record is validated, so a zero entry id anywhere in it always
/// yields [`ParseError::InvalidEntryId`].
pub fn parse_with(buffer: impl Into<Bytes>, options: Options) -> Result<Container> {
    let buffer = buffer.into();
    let mut fields = Fields::new(&buffer, options);

    let magic = fields.u32(Field::Magic)?;
    if magic != MAGIC {
        return Err(ParseError::BadMagic(magic));
    }
    let version = fields.u32(Field::Version)?;
    if version != VERSION {
        return Err(ParseError::BadVersion(version));
    }
    for index in 0..FILLERS {
        let value = fields.u32(Field::Filler)?;
        if value != 0 {
            return Err(ParseError::BadFiller { index, value });
        }
    }

    let n_entries = fields.u16(Field::EntryCount)?;
    let descriptors = (0..n_entries)
        .map(|_| fields.descriptor())
        .collect::<Result<Vec<_>>>()?;

    let mut index = ContainerIndex::default();
    let mut high_water = 0u64;
    for descriptor in descriptors {
        let entry = DirectoryEntry::try_from(descriptor)?;
        if options.verbose {
            debug!("block name: {}", entry.kind);
        }
        high_water = high_water.max(descriptor.end());
        index.insert(entry)?;
    }

    let actual = buffer.len() as u64;
    if high_water > actual {
        return Err(ParseError::TruncatedFile {
            expected: high_water,
            actual,
        });
    }
    trace!(entries = index.len(), high_water, len = actual, "container ok");

    Ok(Container {
        header: Header { magic, version },
        index,
        buffer,
        high_water,
    })
}
