//! Operator decision port
//!
//! The pipeline never talks to a terminal. Decisions that need an operator
//! (which channels to drop, whether to go ahead) go through [`Prompter`].

use crate::services::record_info::ChannelStat;

/// Answers operator questions
pub trait Prompter: Send + Sync {
    /// Pick the channels to drop from `candidates`
    fn select_channels(&self, candidates: &[ChannelStat]) -> Vec<String>;

    /// Yes/no question
    fn confirm(&self, prompt: &str) -> bool;
}

/// Prompter answering from values fixed up front (command-line flags)
#[derive(Debug, Clone, Default)]
pub struct PresetPrompter {
    channels: Vec<String>,
    assume_yes: bool,
}

impl PresetPrompter {
    pub fn new(channels: Vec<String>, assume_yes: bool) -> Self {
        Self {
            channels,
            assume_yes,
        }
    }
}

impl Prompter for PresetPrompter {
    fn select_channels(&self, candidates: &[ChannelStat]) -> Vec<String> {
        if candidates.is_empty() {
            return self.channels.clone();
        }
        self.channels
            .iter()
            .filter(|name| {
                let known = candidates.iter().any(|c| &c.name == *name);
                if !known {
                    tracing::warn!(channel = %name, "Channel not present in the selected fragments, ignored");
                }
                known
            })
            .cloned()
            .collect()
    }

    fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!(prompt, answer = self.assume_yes, "Preset confirmation");
        self.assume_yes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(name: &str) -> ChannelStat {
        ChannelStat {
            name: name.to_string(),
            messages: 1,
        }
    }

    #[test]
    fn test_unknown_channels_filtered() {
        let prompter = PresetPrompter::new(vec!["/a".to_string(), "/zzz".to_string()], true);
        assert_eq!(prompter.select_channels(&[stat("/a"), stat("/b")]), vec!["/a"]);
    }

    #[test]
    fn test_no_candidates_passes_presets_through() {
        let prompter = PresetPrompter::new(vec!["/a".to_string()], false);
        assert_eq!(prompter.select_channels(&[]), vec!["/a"]);
        assert!(!prompter.confirm("Filter channels?"));
    }
}
