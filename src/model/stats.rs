use chrono::NaiveDateTime;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Process-wide completion counters, persisted under their own key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatistics {
    #[serde(default)]
    pub total_completed: u32,
    #[serde(default)]
    pub completed_in_morning: u32,
    #[serde(default)]
    pub completed_in_afternoon: u32,
    #[serde(default)]
    pub completed_in_evening: u32,
    #[serde(default)]
    pub completed_faster_than_timer: u32,
    #[serde(default)]
    pub consecutive_completed: u32,
    /// Insertion-ordered, no duplicates
    #[serde(default)]
    pub unlocked_achievements: IndexSet<String>,
}

impl TaskStatistics {
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked_achievements.contains(id)
    }
}

/// One finished task as seen by the statistics engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEntry {
    /// Estimated seconds
    pub duration: u64,
    /// Seconds actually spent
    pub actual_time: u64,
    /// Local wall-clock time of completion
    pub completed_at: NaiveDateTime,
    pub is_consecutive: bool,
}

/// Bucket a completion falls into by local hour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    /// `[5, 12)`
    Morning,
    /// `[12, 17)`
    Afternoon,
    /// `[17, 24)` and `[0, 5)`
    Evening,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_record_defaults_missing_fields() {
        let stats: TaskStatistics = serde_json::from_str(r#"{"totalCompleted":4}"#).unwrap();
        assert_eq!(stats.total_completed, 4);
        assert_eq!(stats.consecutive_completed, 0);
        assert!(stats.unlocked_achievements.is_empty());
    }

    #[test]
    fn unlocked_achievements_serialize_as_list() {
        let mut stats = TaskStatistics::default();
        stats.unlocked_achievements.insert("1".into());
        stats.unlocked_achievements.insert("3".into());
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains(r#""unlockedAchievements":["1","3"]"#));
    }

    #[test]
    fn hour_boundaries() {
        assert_eq!(TimeOfDay::from_hour(0), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(4), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(16), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(23), TimeOfDay::Evening);
    }
}
