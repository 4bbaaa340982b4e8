//! Sync, library and playback services

pub mod channels;
pub mod contract;
pub mod library;
pub mod manifest;
pub mod player;
pub mod prompter;
pub mod readme;
pub mod record_info;
pub mod selection;
pub mod slicer;
pub mod sync_pipeline;
pub mod time_window;

pub use channels::ChannelCatalog;
pub use contract::{Contract, ContractMerger, TagInfo, CONTRACT_FILE_NAME};
pub use library::{CacheEnvelope, FragmentRef, LibraryCache, LibraryEntry};
pub use manifest::{sanitize_name, ManifestStore, Task};
pub use player::{PlayItem, PlaybackPlan, Player};
pub use prompter::{PresetPrompter, Prompter};
pub use record_info::{parse_record_info, ChannelStat, RecordInfo, RecordInfoError, RecordInspector};
pub use selection::{parse_range, parse_selection};
pub use slicer::{SliceOrchestrator, SliceOutcome, CORRUPTION_SIGNATURES};
pub use sync_pipeline::{
    DiskSpace, ProgressTracker, SyncPipeline, SyncReport, TaskFailure, VolumeSpace,
};
pub use time_window::{playback_window, tag_window, PlaybackMode, PlaybackWindow, TagWindow, TimelineSegment};
