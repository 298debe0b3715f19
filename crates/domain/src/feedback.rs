//! Feedback guard: recognizes the bus's own commands when they echo back.
//!
//! Commands are published on the same control topics the bus subscribes to,
//! so every outbound payload carries an origin tag in its `source` field and
//! inbound control messages carrying one of those tags are discarded.

use std::collections::BTreeSet;

use crate::command::{Command, CommandPayload, Origin};

/// Tags older deployments wrote for HTTP and predictive commands.
const LEGACY_TAGS: [&str; 2] = ["api", "ai"];

/// Pure filter keyed on the declared origin of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackGuard {
    own_tags: BTreeSet<String>,
}

impl Default for FeedbackGuard {
    fn default() -> Self {
        let tags = [Origin::ExternalApi.tag(), Origin::AutoControl.tag()]
            .into_iter()
            .chain(LEGACY_TAGS);
        Self::new(tags)
    }
}

impl FeedbackGuard {
    /// Create a guard recognizing exactly `tags`.
    #[must_use]
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            own_tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Default tags plus `extra`.
    #[must_use]
    pub fn with_extra_tags<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.own_tags.extend(extra.into_iter().map(Into::into));
        self
    }

    /// Wire payload for `command`, carrying its origin tag.
    #[must_use]
    pub fn tag(&self, command: &Command) -> CommandPayload {
        command.to_payload()
    }

    /// Whether a message declaring `source` originated from this bus.
    #[must_use]
    pub fn is_echo(&self, source: Option<&str>) -> bool {
        source.is_some_and(|tag| self.own_tags.contains(tag.trim()))
    }
}
