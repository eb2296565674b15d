pub mod apple;
pub mod scan;

pub use apple::{
    extract,
    parse,
    parse_with,
    sniff,
    Container,
    EntryKind,
    ExtractError,
    ExtractMode,
    Forks,
    Options,
    ParseError,
};
