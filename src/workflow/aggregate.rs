// src/workflow/aggregate.rs
use crate::models::{MediaStatus, ScriptStatus};

/// Script status from the statuses of one media kind across its scenes.
///
/// Binary on purpose: `completed` only when every scene completed, `failed`
/// otherwise. A script without scenes counts as completed.
pub fn aggregate_script_status(statuses: &[MediaStatus]) -> ScriptStatus {
    if statuses.iter().all(|status| *status == MediaStatus::Completed) {
        ScriptStatus::Completed
    } else {
        ScriptStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_completed_is_completed() {
        let statuses = [MediaStatus::Completed, MediaStatus::Completed];
        assert_eq!(aggregate_script_status(&statuses), ScriptStatus::Completed);
    }

    #[test]
    fn any_other_status_fails_the_script() {
        for other in [MediaStatus::Failed, MediaStatus::Pending, MediaStatus::Processing] {
            let statuses = [MediaStatus::Completed, other, MediaStatus::Completed];
            assert_eq!(aggregate_script_status(&statuses), ScriptStatus::Failed);
        }
    }

    #[test]
    fn no_scenes_is_completed() {
        assert_eq!(aggregate_script_status(&[]), ScriptStatus::Completed);
    }
}
