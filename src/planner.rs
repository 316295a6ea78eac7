//! Decides which candidates a sync run imports.

use chrono::{DateTime, Utc};

use crate::models::DocumentCandidate;

/// Candidates to import, in scan order.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub cursor: DateTime<Utc>,
    pub force: bool,
    pub candidates: Vec<DocumentCandidate>,
}

impl SyncPlan {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.candidates.iter().map(|c| c.size_bytes).sum()
    }
}

/// Keep every candidate when `force`, otherwise those changed at or after `cursor`.
pub fn plan(candidates: Vec<DocumentCandidate>, cursor: DateTime<Utc>, force: bool) -> SyncPlan {
    let candidates = if force {
        candidates
    } else {
        candidates
            .into_iter()
            .filter(|c| c.effective_modified_at >= cursor)
            .collect()
    };
    SyncPlan {
        cursor,
        force,
        candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::path::PathBuf;

    fn candidate(name: &str, at: DateTime<Utc>) -> DocumentCandidate {
        DocumentCandidate {
            path: PathBuf::from(name),
            name: name.to_string(),
            extension: "md".to_string(),
            size_bytes: 10,
            effective_modified_at: at,
        }
    }

    fn cursor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn boundary_is_inclusive() {
        let c = cursor();
        let planned = plan(
            vec![
                candidate("before.md", c - Duration::seconds(1)),
                candidate("equal.md", c),
                candidate("after.md", c + Duration::seconds(1)),
            ],
            c,
            false,
        );
        let names: Vec<&str> = planned.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["equal.md", "after.md"]);
    }

    #[test]
    fn force_plans_everything() {
        let c = cursor();
        let all = vec![
            candidate("old.md", c - Duration::days(400)),
            candidate("new.md", c + Duration::days(1)),
        ];
        let planned = plan(all.clone(), c, true);
        assert_eq!(planned.candidates, all);
        assert!(planned.force);
    }

    #[test]
    fn total_bytes_sums_sizes() {
        let c = cursor();
        let planned = plan(vec![candidate("a.md", c), candidate("b.md", c)], c, false);
        assert_eq!(planned.total_bytes(), 20);
        assert_eq!(planned.len(), 2);
    }
}
