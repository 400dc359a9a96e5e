//! engine::resume
//!
//! Resume-point detection.
//!
//! Every destination commit this tool creates carries the replayed origin
//! commit's identifier as the final line of its message:
//!
//! ```text
//! <origin commit message>
//!
//! <origin commit identifier>
//! ```
//!
//! Scanning the destination log for those markers yields the set of origin
//! commits already applied, which makes repeated runs idempotent without
//! any state outside the two repositories. Destination commits without a
//! recognizable marker (manual commits, merges from elsewhere) are simply
//! ignored; they never block the sync.

use std::collections::HashSet;

use crate::core::types::Oid;
use crate::vcs::CommitEntry;

/// Build the destination commit message for a replayed origin commit.
pub fn destination_message(origin: &CommitEntry) -> String {
    format!("{}\n\n{}", origin.message.trim_end(), origin.id)
}

/// Extract the resume marker from a destination commit message, if any.
///
/// The marker is the final line of the trimmed message; a line that is not
/// a full hex object id means the commit carries no marker.
pub fn extract_marker(message: &str) -> Option<Oid> {
    let last_line = message.trim().lines().next_back()?;
    Oid::new(last_line.trim()).ok()
}

/// Origin commit identifiers already replayed into the destination.
pub fn applied_markers(dest_log: &[CommitEntry]) -> HashSet<Oid> {
    dest_log
        .iter()
        .filter_map(|commit| extract_marker(&commit.message))
        .collect()
}

/// Origin commits not yet replayed, ordered oldest first.
///
/// `origin_log` arrives newest first (log order) and is reversed here so
/// replay proceeds chronologically.
pub fn outstanding(origin_log: Vec<CommitEntry>, dest_log: &[CommitEntry]) -> Vec<CommitEntry> {
    let applied = applied_markers(dest_log);

    let mut pending: Vec<CommitEntry> = origin_log
        .into_iter()
        .filter(|commit| !applied.contains(&commit.id))
        .collect();
    pending.reverse();
    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn oid(n: u64) -> Oid {
        Oid::new(format!("{:040x}", n)).unwrap()
    }

    fn entry(id: Oid, message: &str) -> CommitEntry {
        CommitEntry {
            id,
            message: message.to_string(),
            timestamp: Utc::now(),
            changed_paths: Vec::new(),
        }
    }

    #[test]
    fn marker_round_trips_through_message() {
        let origin = entry(oid(7), "update config\n\nwith a body\n");
        let message = destination_message(&origin);
        assert_eq!(extract_marker(&message), Some(oid(7)));
        assert!(message.starts_with("update config\n\nwith a body"));
    }

    #[test]
    fn marker_survives_trailing_whitespace() {
        let message = format!("some message\n\n{}\n\n  ", oid(3));
        assert_eq!(extract_marker(&message), Some(oid(3)));
    }

    #[test]
    fn unmarked_messages_yield_nothing() {
        assert_eq!(extract_marker("manual commit"), None);
        assert_eq!(extract_marker(""), None);
        assert_eq!(extract_marker("short hex on last line\n\nabc123"), None);
    }

    #[test]
    fn outstanding_is_origin_minus_markers_oldest_first() {
        let (h1, h2, h3) = (oid(1), oid(2), oid(3));

        // Origin log is newest first: [h3, h2, h1].
        let origin_log = vec![
            entry(h3.clone(), "three"),
            entry(h2.clone(), "two"),
            entry(h1.clone(), "one"),
        ];

        let dest_log = vec![
            entry(oid(20), &format!("two\n\n{}", h2)),
            entry(oid(10), &format!("one\n\n{}", h1)),
        ];

        let pending = outstanding(origin_log, &dest_log);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, h3);
    }

    #[test]
    fn manual_destination_commits_are_ignored() {
        let h1 = oid(1);
        let origin_log = vec![entry(h1.clone(), "one")];
        let dest_log = vec![
            entry(oid(30), "manual tweak, no marker"),
            entry(oid(10), &format!("one\n\n{}", h1)),
        ];

        assert!(outstanding(origin_log, &dest_log).is_empty());
    }

    #[test]
    fn empty_destination_replays_everything() {
        let origin_log = vec![entry(oid(2), "two"), entry(oid(1), "one")];
        let pending = outstanding(origin_log, &[]);
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, oid(1));
        assert_eq!(pending[1].id, oid(2));
    }
}
