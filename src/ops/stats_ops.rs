use chrono::Timelike;

use crate::model::stats::{CompletionEntry, TaskStatistics, TimeOfDay};

/// Fold one completion into the counters.
pub fn record_completion(stats: &TaskStatistics, entry: &CompletionEntry) -> TaskStatistics {
    let mut next = stats.clone();
    next.total_completed += 1;
    match TimeOfDay::from_hour(entry.completed_at.hour()) {
        TimeOfDay::Morning => next.completed_in_morning += 1,
        TimeOfDay::Afternoon => next.completed_in_afternoon += 1,
        TimeOfDay::Evening => next.completed_in_evening += 1,
    }
    if entry.actual_time < entry.duration {
        next.completed_faster_than_timer += 1;
    }
    if entry.is_consecutive {
        next.consecutive_completed += 1;
    } else {
        next.consecutive_completed = 0;
    }
    next
}

/// Break the streak. `None` when it was already zero, so callers can skip
/// the write.
pub fn reset_consecutive_streak(stats: &TaskStatistics) -> Option<TaskStatistics> {
    if stats.consecutive_completed == 0 {
        return None;
    }
    Some(TaskStatistics {
        consecutive_completed: 0,
        ..stats.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(hour, 30, 0)
            .unwrap()
    }

    fn entry(hour: u32, duration: u64, actual: u64, consecutive: bool) -> CompletionEntry {
        CompletionEntry {
            duration,
            actual_time: actual,
            completed_at: at(hour),
            is_consecutive: consecutive,
        }
    }

    #[test]
    fn buckets_by_local_hour() {
        let cases = [
            (4, "evening"),
            (5, "morning"),
            (11, "morning"),
            (12, "afternoon"),
            (16, "afternoon"),
            (17, "evening"),
        ];
        for (hour, bucket) in cases {
            let stats = record_completion(&TaskStatistics::default(), &entry(hour, 60, 60, false));
            let got = match (
                stats.completed_in_morning,
                stats.completed_in_afternoon,
                stats.completed_in_evening,
            ) {
                (1, 0, 0) => "morning",
                (0, 1, 0) => "afternoon",
                (0, 0, 1) => "evening",
                other => panic!("unexpected buckets {:?}", other),
            };
            assert_eq!(got, bucket, "hour {}", hour);
        }
    }

    #[test]
    fn faster_than_timer_is_strict() {
        let stats = record_completion(&TaskStatistics::default(), &entry(9, 60, 59, false));
        assert_eq!(stats.completed_faster_than_timer, 1);
        let stats = record_completion(&stats, &entry(9, 60, 60, false));
        assert_eq!(stats.completed_faster_than_timer, 1);
        assert_eq!(stats.total_completed, 2);
    }

    #[test]
    fn streak_counts_and_resets() {
        let mut stats = TaskStatistics::default();
        for _ in 0..3 {
            stats = record_completion(&stats, &entry(9, 60, 30, true));
        }
        assert_eq!(stats.consecutive_completed, 3);

        let stats = record_completion(&stats, &entry(9, 60, 30, false));
        assert_eq!(stats.consecutive_completed, 0);
        assert_eq!(stats.total_completed, 4);
    }

    #[test]
    fn reset_streak_only_when_nonzero() {
        assert!(reset_consecutive_streak(&TaskStatistics::default()).is_none());
        let stats = TaskStatistics {
            consecutive_completed: 7,
            total_completed: 9,
            ..Default::default()
        };
        let reset = reset_consecutive_streak(&stats).unwrap();
        assert_eq!(reset.consecutive_completed, 0);
        assert_eq!(reset.total_completed, 9);
    }
}
