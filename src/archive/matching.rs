use chrono::{DateTime, Duration, Utc};

use super::provider::ConversationSummary;

/// Time window around a session start in which its remote conversation is expected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchWindow {
    /// How far before the session start a conversation may have been created
    pub backward: Duration,

    /// How far past "now" a conversation may claim to have been created
    pub forward: Duration,
}

impl Default for MatchWindow {
    fn default() -> Self {
        Self {
            backward: Duration::minutes(5),
            forward: Duration::minutes(10),
        }
    }
}

impl MatchWindow {
    /// Inclusive bounds of the window for a session started at `started_at`
    pub fn bounds(&self, started_at: DateTime<Utc>, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (started_at - self.backward, now + self.forward)
    }
}

/// Pick the remote conversation that belongs to a session
///
/// Summaries are ranked by `sort_date`, newest first. Without a start time the
/// newest summary wins outright. With one, the newest summary whose
/// `created_at` lies inside the window is chosen; a summary without
/// `created_at` counts as inside.
pub fn select_summary<'a>(
    summaries: &'a [ConversationSummary],
    started_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: &MatchWindow,
) -> Option<&'a ConversationSummary> {
    let mut ranked: Vec<&ConversationSummary> = summaries.iter().collect();
    ranked.sort_by(|a, b| b.sort_date.cmp(&a.sort_date));

    let Some(started_at) = started_at else {
        return ranked.first().copied();
    };

    let (lower, upper) = window.bounds(started_at, now);

    ranked.into_iter().find(|summary| match summary.created_at {
        Some(created_at) => created_at >= lower && created_at <= upper,
        None => true,
    })
}
