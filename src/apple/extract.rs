use bytes::Bytes;
use strum::{
    Display,
    EnumString,
};
use tracing::debug;

use super::{
    Container,
    EntryKind,
    ExtractError,
};

type Result<T> = ::core::result::Result<T, ExtractError>;

/// How much of a container the caller wants written out.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumString)]
pub enum ExtractMode {
    #[strum(serialize = "verify")]
    Verify,
    #[strum(serialize = "extract_datafork")]
    DataFork,
    #[strum(serialize = "extract_resfork")]
    ResourceFork,
    #[strum(serialize = "extract_both_forks")]
    BothForks,
}

/// Forks pulled out of one container. Each is an owned copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forks {
    pub data: Option<Bytes>,
    pub resource: Option<Bytes>,
}

impl Forks {
    pub const HEADER_BYTES: usize = 8;

    /// Leading bytes of a fork, for a quick look at what was extracted.
    pub fn header_bytes(fork: &[u8]) -> &[u8] {
        &fork[..fork.len().min(Self::HEADER_BYTES)]
    }
}

/// Copies the bytes of the `kind` entry out of `container`.
pub fn extract(container: &Container, kind: EntryKind) -> Result<Bytes> {
    let entry = container.index()
        .get(kind)
        .ok_or(ExtractError::ForkNotPresent(kind))?;
    let bytes = container.as_bytes();
    let range = entry.range();
    let end = range.end.min(bytes.len());
    let start = range.start.min(end);
    let fork = &bytes[start..end];
    if fork.len() as u64 != entry.length as u64 {
        return Err(ExtractError::InternalSliceMismatch {
            kind,
            expected: entry.length as u64,
            actual: fork.len() as u64,
        });
    }
    debug!(%kind, offset = entry.offset, length = entry.length, "extracted");
    Ok(Bytes::copy_from_slice(fork))
}

impl Container {
    pub fn extract(&self, kind: EntryKind) -> Result<Bytes> {
        extract(self, kind)
    }
    /// Runs every extraction `mode` calls for. Nothing is returned unless
    /// all of them succeed.
    pub fn extract_mode(&self, mode: ExtractMode) -> Result<Forks> {
        let forks = match mode {
            ExtractMode::Verify => Forks::default(),
            ExtractMode::DataFork => Forks {
                data: Some(self.extract(EntryKind::DataFork)?),
                resource: None,
            },
            ExtractMode::ResourceFork => Forks {
                data: None,
                resource: Some(self.extract(EntryKind::ResourceFork)?),
            },
            ExtractMode::BothForks => {
                let data = self.extract(EntryKind::DataFork)?;
                let resource = self.extract(EntryKind::ResourceFork)?;
                Forks {
                    data: Some(data),
                    resource: Some(resource),
                }
            },
        };
        Ok(forks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apple::{
        header::tests::{container_bytes, descriptor},
        parse,
        DirectoryEntry,
    };

    fn hello() -> Container {
        let bytes = container_bytes(&[descriptor(1, 38, 5)], b"hello");
        parse(bytes).expect("could not parse valid container")
    }

    fn both_forks() -> Container {
        // directory is 26 + 3 * 12 = 62 bytes
        let bytes = container_bytes(
            &[descriptor(3, 62, 4), descriptor(2, 66, 8), descriptor(1, 74, 6)],
            b"nameRSRCRSRCdata!!",
        );
        parse(bytes).expect("could not parse valid container")
    }

    #[test]
    fn extract_hello() {
        let container = hello();
        let fork = extract(&container, EntryKind::DataFork)
            .expect("could not extract data fork");
        assert_eq!(&fork[..], b"hello");
    }

    #[test]
    fn extract_is_idempotent() {
        let container = both_forks();
        let first = container.extract(EntryKind::ResourceFork)
            .expect("first extraction failed");
        let second = container.extract(EntryKind::ResourceFork)
            .expect("second extraction failed");
        assert_eq!(first, second);
        assert_eq!(&first[..], b"RSRCRSRC");
    }

    #[test]
    fn extracted_bytes_outlive_the_container() {
        let fork = {
            let container = hello();
            container.extract(EntryKind::DataFork)
                .expect("could not extract data fork")
        };
        assert_eq!(&fork[..], b"hello");
    }

    #[test]
    fn extract_non_fork_entry() {
        let container = both_forks();
        let name = container.extract(EntryKind::RealName)
            .expect("could not extract real name");
        assert_eq!(&name[..], b"name");
    }

    #[test]
    fn zero_length_entry() {
        let bytes = container_bytes(&[descriptor(4, 38, 0)], &[]);
        let container = parse(bytes).expect("could not parse valid container");
        let comment = container.extract(EntryKind::Comment)
            .expect("could not extract empty comment");
        assert!(comment.is_empty());
    }

    #[test]
    fn fork_not_present() {
        let bytes = container_bytes(&[], &[]);
        let container = parse(bytes).expect("could not parse empty container");
        assert_eq!(
            extract(&container, EntryKind::DataFork).unwrap_err(),
            ExtractError::ForkNotPresent(EntryKind::DataFork),
        );
    }

    #[test]
    fn slice_mismatch_when_entry_runs_past_the_buffer() {
        let container = Container::unchecked(
            &b"hello"[..],
            &[DirectoryEntry { kind: EntryKind::DataFork, offset: 3, length: 10 }],
        );
        assert_eq!(
            extract(&container, EntryKind::DataFork).unwrap_err(),
            ExtractError::InternalSliceMismatch {
                kind: EntryKind::DataFork,
                expected: 10,
                actual: 2,
            },
        );
    }

    #[test]
    fn slice_mismatch_when_entry_starts_past_the_buffer() {
        let container = Container::unchecked(
            &b"hello"[..],
            &[
                DirectoryEntry { kind: EntryKind::ResourceFork, offset: 20, length: 4 },
                DirectoryEntry { kind: EntryKind::Comment, offset: u32::MAX, length: u32::MAX },
            ],
        );
        assert_eq!(
            container.extract(EntryKind::ResourceFork).unwrap_err(),
            ExtractError::InternalSliceMismatch {
                kind: EntryKind::ResourceFork,
                expected: 4,
                actual: 0,
            },
        );
        assert_eq!(
            container.extract(EntryKind::Comment).unwrap_err(),
            ExtractError::InternalSliceMismatch {
                kind: EntryKind::Comment,
                expected: u32::MAX as u64,
                actual: 0,
            },
        );
    }

    #[test]
    fn verify_extracts_nothing() {
        let forks = both_forks().extract_mode(ExtractMode::Verify)
            .expect("verify cannot fail on a parsed container");
        assert_eq!(forks, Forks::default());
    }

    #[test]
    fn single_fork_modes() {
        let container = both_forks();
        let forks = container.extract_mode(ExtractMode::DataFork)
            .expect("could not extract data fork");
        assert_eq!(forks.data.as_deref(), Some(&b"data!!"[..]));
        assert_eq!(forks.resource, None);

        let forks = container.extract_mode(ExtractMode::ResourceFork)
            .expect("could not extract resource fork");
        assert_eq!(forks.data, None);
        assert_eq!(forks.resource.as_deref(), Some(&b"RSRCRSRC"[..]));
    }

    #[test]
    fn both_forks_mode() {
        let forks = both_forks().extract_mode(ExtractMode::BothForks)
            .expect("could not extract both forks");
        assert_eq!(forks.data.as_deref(), Some(&b"data!!"[..]));
        assert_eq!(forks.resource.as_deref(), Some(&b"RSRCRSRC"[..]));
    }

    #[test]
    fn both_forks_mode_needs_both() {
        let container = hello();
        assert_eq!(
            container.extract_mode(ExtractMode::BothForks).unwrap_err(),
            ExtractError::ForkNotPresent(EntryKind::ResourceFork),
        );
    }

    #[test]
    fn mode_words() {
        assert_eq!("verify".parse::<ExtractMode>(), Ok(ExtractMode::Verify));
        assert_eq!("extract_datafork".parse::<ExtractMode>(), Ok(ExtractMode::DataFork));
        assert_eq!("extract_resfork".parse::<ExtractMode>(), Ok(ExtractMode::ResourceFork));
        assert_eq!("extract_both_forks".parse::<ExtractMode>(), Ok(ExtractMode::BothForks));
        assert!("extract_everything".parse::<ExtractMode>().is_err());
        assert_eq!(ExtractMode::BothForks.to_string(), "extract_both_forks");
    }

    #[test]
    fn header_bytes_preview() {
        assert_eq!(Forks::header_bytes(b"0123456789"), b"01234567");
        assert_eq!(Forks::header_bytes(b"abc"), b"abc");
        assert!(Forks::header_bytes(b"").is_empty());
    }
}
