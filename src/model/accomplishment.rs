use super::stats::TaskStatistics;

/// Statistics counter an unlock rule is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    TotalCompleted,
    FasterThanTimer,
    Consecutive,
    Morning,
    Afternoon,
    Evening,
}

impl Metric {
    pub fn read(self, stats: &TaskStatistics) -> u32 {
        match self {
            Metric::TotalCompleted => stats.total_completed,
            Metric::FasterThanTimer => stats.completed_faster_than_timer,
            Metric::Consecutive => stats.consecutive_completed,
            Metric::Morning => stats.completed_in_morning,
            Metric::Afternoon => stats.completed_in_afternoon,
            Metric::Evening => stats.completed_in_evening,
        }
    }
}

/// Unlock condition: `metric >= threshold`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub metric: Metric,
    pub threshold: u32,
}

/// A static catalog entry. Unlock state lives in
/// [`TaskStatistics::unlocked_achievements`], never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accomplishment {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub image: &'static str,
    /// `None` for an entry that is listed but never unlocks on its own
    pub rule: Option<Rule>,
}

impl Accomplishment {
    pub fn is_met(&self, stats: &TaskStatistics) -> bool {
        self.rule
            .is_some_and(|rule| rule.metric.read(stats) >= rule.threshold)
    }
}

const CAT: &str = "/assets/cat.jpeg";

const fn rule(metric: Metric, threshold: u32) -> Option<Rule> {
    Some(Rule { metric, threshold })
}

// Ids are stored in `unlockedAchievements`, so each id keeps its rule.
pub const ACCOMPLISHMENTS: &[Accomplishment] = &[
    Accomplishment {
        id: "1",
        title: "Success",
        description: "Complete your first task",
        image: CAT,
        rule: rule(Metric::TotalCompleted, 1),
    },
    Accomplishment {
        id: "2",
        title: "Champion",
        description: "Beat the timer on 5 tasks",
        image: CAT,
        rule: rule(Metric::FasterThanTimer, 5),
    },
    Accomplishment {
        id: "3",
        title: "Super Champion",
        description: "Beat the timer on 10 tasks",
        image: CAT,
        rule: rule(Metric::FasterThanTimer, 10),
    },
    Accomplishment {
        id: "4",
        title: "In Order",
        description: "Complete 5 tasks in a row",
        image: CAT,
        rule: rule(Metric::Consecutive, 5),
    },
    Accomplishment {
        id: "5",
        title: "Mountain of Work",
        description: "Complete 10 tasks in a row",
        image: CAT,
        rule: rule(Metric::Consecutive, 10),
    },
    Accomplishment {
        id: "6",
        title: "Party",
        description: "Complete 5 tasks in the evening",
        image: CAT,
        rule: rule(Metric::Evening, 5),
    },
    Accomplishment {
        id: "7",
        title: "Sunshine",
        description: "Complete 5 tasks in the afternoon",
        image: CAT,
        rule: rule(Metric::Afternoon, 5),
    },
    Accomplishment {
        id: "8",
        title: "Early Bird",
        description: "Complete 5 tasks in the morning",
        image: CAT,
        rule: rule(Metric::Morning, 5),
    },
    Accomplishment {
        id: "9",
        title: "One Thing at a Time",
        description: "Awarded by hand",
        image: CAT,
        rule: None,
    },
];

pub fn find_accomplishment(id: &str) -> Option<&'static Accomplishment> {
    ACCOMPLISHMENTS.iter().find(|a| a.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_ids_are_unique() {
        let ids: HashSet<&str> = ACCOMPLISHMENTS.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), ACCOMPLISHMENTS.len());
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(
            find_accomplishment("8").and_then(|a| a.rule).map(|r| r.metric),
            Some(Metric::Morning)
        );
        assert_eq!(find_accomplishment("9").map(|a| a.rule), Some(None));
        assert!(find_accomplishment("42").is_none());
    }
}
