use crate::model::accomplishment::{ACCOMPLISHMENTS, Accomplishment};
use crate::model::stats::TaskStatistics;

/// Catalog ids whose rule is met but which are not unlocked yet, in catalog
/// order. Does not record anything; see [`unlock`].
pub fn evaluate(stats: &TaskStatistics) -> Vec<&'static str> {
    ACCOMPLISHMENTS
        .iter()
        .filter(|a| !stats.is_unlocked(a.id))
        .filter(|a| a.is_met(stats))
        .map(|a| a.id)
        .collect()
}

/// Record an unlock. Returns `false` when the id was already unlocked.
pub fn unlock(stats: &mut TaskStatistics, id: &str) -> bool {
    stats.unlocked_achievements.insert(id.to_string())
}

/// Admin path: take an unlock back. Returns `false` when it was not unlocked.
pub fn revoke(stats: &mut TaskStatistics, id: &str) -> bool {
    stats.unlocked_achievements.shift_remove(id)
}

/// Every catalog entry with its unlock state
pub fn catalog(stats: &TaskStatistics) -> Vec<(&'static Accomplishment, bool)> {
    ACCOMPLISHMENTS
        .iter()
        .map(|a| (a, stats.is_unlocked(a.id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_completion_unlocks_only_the_first_entry() {
        let stats = TaskStatistics {
            total_completed: 1,
            ..Default::default()
        };
        assert_eq!(evaluate(&stats), vec!["1"]);
    }

    #[test]
    fn thresholds_per_counter() {
        let stats = TaskStatistics {
            total_completed: 30,
            completed_faster_than_timer: 10,
            consecutive_completed: 5,
            completed_in_evening: 5,
            completed_in_afternoon: 4,
            completed_in_morning: 5,
            ..Default::default()
        };
        assert_eq!(evaluate(&stats), vec!["1", "2", "3", "4", "6", "8"]);
    }

    #[test]
    fn ids_keep_their_stored_meaning() {
        let faster = TaskStatistics {
            completed_faster_than_timer: 5,
            unlocked_achievements: ["1".to_string()].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(evaluate(&faster), vec!["2"]);

        let streak = TaskStatistics {
            consecutive_completed: 5,
            ..Default::default()
        };
        assert_eq!(evaluate(&streak), vec!["4"]);

        let streak = TaskStatistics {
            consecutive_completed: 10,
            ..Default::default()
        };
        assert_eq!(evaluate(&streak), vec!["4", "5"]);
    }

    #[test]
    fn entry_without_rule_never_unlocks() {
        let stats = TaskStatistics {
            total_completed: 1000,
            completed_faster_than_timer: 1000,
            consecutive_completed: 1000,
            completed_in_morning: 1000,
            completed_in_afternoon: 1000,
            completed_in_evening: 1000,
            ..Default::default()
        };
        let ids = evaluate(&stats);
        assert_eq!(ids.len(), 8);
        assert!(!ids.contains(&"9"));
    }

    #[test]
    fn unlocked_ids_are_never_returned_again() {
        let mut stats = TaskStatistics {
            total_completed: 3,
            ..Default::default()
        };
        for id in evaluate(&stats) {
            assert!(unlock(&mut stats, id));
        }
        assert!(evaluate(&stats).is_empty());

        stats.total_completed = 50;
        assert!(evaluate(&stats).is_empty());
    }

    #[test]
    fn unlock_is_idempotent() {
        let mut stats = TaskStatistics::default();
        assert!(unlock(&mut stats, "1"));
        assert!(!unlock(&mut stats, "1"));
        assert_eq!(stats.unlocked_achievements.len(), 1);
    }

    #[test]
    fn revoke_makes_an_entry_eligible_again() {
        let mut stats = TaskStatistics {
            total_completed: 1,
            ..Default::default()
        };
        unlock(&mut stats, "1");
        assert!(revoke(&mut stats, "1"));
        assert!(!revoke(&mut stats, "1"));
        assert_eq!(evaluate(&stats), vec!["1"]);
    }

    #[test]
    fn catalog_reports_state() {
        let mut stats = TaskStatistics::default();
        unlock(&mut stats, "3");
        let unlocked: Vec<&str> = catalog(&stats)
            .into_iter()
            .filter(|(_, on)| *on)
            .map(|(a, _)| a.id)
            .collect();
        assert_eq!(unlocked, vec!["3"]);
    }
}
