//! Channel catalog across several fragments
//!
//! Fragments in one directory share a channel layout, so `info` runs once
//! per directory. Counts of channels present in several directories add up.

use crate::error::SyncResult;
use crate::services::prompter::Prompter;
use crate::services::record_info::{ChannelStat, RecordInspector};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Builds the channel union of a fragment set
pub struct ChannelCatalog<'a> {
    inspector: &'a RecordInspector,
}

impl<'a> ChannelCatalog<'a> {
    pub fn new(inspector: &'a RecordInspector) -> Self {
        Self { inspector }
    }

    /// Channels of `fragments`, sorted by name
    pub async fn collect(&self, fragments: &[PathBuf]) -> SyncResult<Vec<ChannelStat>> {
        let mut seen_dirs: BTreeSet<&Path> = BTreeSet::new();
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();

        for fragment in fragments {
            let dir = fragment.parent().unwrap_or_else(|| Path::new(""));
            if !seen_dirs.insert(dir) {
                continue;
            }
            tracing::info!(dir = %dir.display(), "Reading channel list");
            let info = self.inspector.info(fragment).await?;
            for channel in info.channels {
                *counts.entry(channel.name).or_insert(0) += channel.messages;
            }
        }

        Ok(counts
            .into_iter()
            .map(|(name, messages)| ChannelStat { name, messages })
            .collect())
    }

    /// Ask `prompter` which channels of `fragments` to drop
    ///
    /// The catalog is only read when the operator wants to filter.
    pub async fn choose_excluded(
        &self,
        prompter: &dyn Prompter,
        fragments: &[PathBuf],
    ) -> SyncResult<Vec<String>> {
        if !prompter.confirm("Filter channels?") {
            return Ok(Vec::new());
        }
        let candidates = self.collect(fragments).await?;
        Ok(prompter.select_channels(&candidates))
    }
}
