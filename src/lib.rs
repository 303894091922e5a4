pub mod error;
pub mod cursor;
pub mod checksum;
pub mod delta;
pub mod signature;
pub mod block;
pub mod directory;
pub mod legacy;
pub mod table;
pub mod parse;
pub mod writer;
pub mod source;
pub mod config;
pub mod loader;

pub use error::{LutError, SourceError, LoadError};
pub use signature::{Format, sniff};
pub use table::{LutTable, TableInfo, ChecksumStatus, MethodId, bank_code_key};
pub use parse::{ParseOptions, parse, parse_with};
pub use config::LoaderConfig;
pub use loader::{LutLoader, LoaderState, LoadOutcome};
pub use source::{ByteSource, MemorySource, CachedFileSource, Downloader, CommandDownloader};
