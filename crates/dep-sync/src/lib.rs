//! Incremental sync engines for Dependency Manager
//!
//! Every download is described by a [`Watermark`]: the observed state of each
//! fetched item plus the artifacts the download created. A later run only
//! fetches what changed; a revert deletes exactly what the download created.
//!
//! - **Contract**: [`Downloader`] with file-share, version-control and
//!   Subversion engines
//! - **Archives**: [`ArchiveDownloader`] wraps any engine and unpacks archives
//! - **Selection**: [`DownloaderFactory`] picks the engine for a component
//! - **Sessions**: [`SyncSession`] downloads a flattened graph and persists
//!   watermarks through a [`WatermarkStore`]

pub mod archive;
pub mod config;
pub mod downloader;
mod engine;
pub mod error;
pub mod factory;
pub mod file_share;
pub mod filter;
pub mod mapping;
pub mod memory;
pub mod remote;
pub mod session;
pub mod subversion;
pub mod version_control;
pub mod watermark;

pub use archive::{ARCHIVE_KEY_PREFIX, ArchiveDownloader, ArchiveKind};
pub use config::{DEFAULT_WATERMARK_FILE, EngineConfig};
pub use downloader::{DEFAULT_MAX_PARALLEL_FETCHES, Downloader, OperationType, SyncOptions};
pub use error::{Error, Result};
pub use factory::{BackendClients, DownloaderFactory};
pub use file_share::{FILE_SHARE, FileShareCopier};
pub use filter::FileFilter;
pub use mapping::{FolderMapping, FolderMappings};
pub use memory::MemoryRemote;
pub use remote::{RemoteItem, RemoteRepository};
pub use session::{SyncReport, SyncSession};
pub use subversion::{REVISION_TAG, SUBVERSION, SubversionDownloader};
pub use version_control::{
    MAPPING_TAG_PREFIX, SOURCE_CONTROL, SOURCE_CONTROL_COPY, VERSION_TAG, VersionControlCopier,
    VersionControlMapper,
};
pub use watermark::{Watermark, WatermarkStore};
