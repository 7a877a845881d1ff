use serde::Serialize;

use crate::model::accomplishment::Accomplishment;
use crate::model::stats::TaskStatistics;
use crate::model::task::{ImageStatus, Task, TaskImage, TaskStatus};
use crate::ops::duration::format_short;
use crate::ops::leaves::count_completed_leaves;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub status: TaskStatus,
    pub duration: u64,
    pub effective_duration: u64,
    pub progress: ProgressJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<&'a TaskImage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<TaskJson<'a>>,
}

#[derive(Serialize)]
pub struct ProgressJson {
    pub completed: usize,
    pub total: usize,
}

#[derive(Serialize)]
pub struct ShowJson<'a> {
    #[serde(flatten)]
    pub task: TaskJson<'a>,
    pub parent: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Serialize)]
pub struct AchievementJson {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub unlocked: bool,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(task: &Task) -> TaskJson<'_> {
    let (completed, total) = count_completed_leaves(task);
    TaskJson {
        id: &task.id,
        name: &task.name,
        status: task.status,
        duration: task.duration,
        effective_duration: task.effective_duration(),
        progress: ProgressJson { completed, total },
        image: task.image.as_ref(),
        subtasks: task.subtasks.iter().map(task_to_json).collect(),
    }
}

pub fn achievement_to_json((a, unlocked): (&'static Accomplishment, bool)) -> AchievementJson {
    AchievementJson {
        id: a.id,
        title: a.title,
        description: a.description,
        unlocked,
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// First 8 characters of an id, enough to address a task on the command line
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// `[x] Name  25m  2/3  img  #1a2b3c4d`
pub fn format_task_line(task: &Task) -> String {
    let mut line = format!(
        "[{}] {}  {}",
        task.status.checkbox_char(),
        task.display_name(),
        format_short(task.effective_duration())
    );
    if !task.is_leaf() {
        let (completed, total) = count_completed_leaves(task);
        line.push_str(&format!("  {}/{}", completed, total));
    }
    match task.image.as_ref().map(|i| i.status) {
        Some(ImageStatus::Ready) => line.push_str("  img"),
        Some(ImageStatus::Generating) => line.push_str("  img\u{2026}"),
        None => {}
    }
    line.push_str(&format!("  #{}", short_id(&task.id)));
    line
}

/// The tree, two spaces of indent per level. `open_only` hides finished
/// subtrees.
pub fn format_tree(tasks: &[Task], open_only: bool) -> Vec<String> {
    let mut lines = Vec::new();
    push_tree(&mut lines, tasks, 0, open_only);
    lines
}

fn push_tree(lines: &mut Vec<String>, tasks: &[Task], depth: usize, open_only: bool) {
    for task in tasks {
        if open_only && task.status == TaskStatus::Done {
            continue;
        }
        lines.push(format!("{}{}", "  ".repeat(depth), format_task_line(task)));
        push_tree(lines, &task.subtasks, depth + 1, open_only);
    }
}

pub fn format_task_detail(task: &Task, parent: Option<&Task>, image_url: Option<&str>) -> Vec<String> {
    let mut lines = vec![
        task.display_name().to_string(),
        format!("id:        {}", task.id),
        format!("status:    {}", task.status.as_str()),
    ];
    if task.is_leaf() {
        lines.push(format!("duration:  {}", format_short(task.duration)));
    } else {
        let (completed, total) = count_completed_leaves(task);
        lines.push(format!(
            "duration:  {} (sum of {} leaves)",
            format_short(task.effective_duration()),
            total
        ));
        lines.push(format!("progress:  {}/{} done", completed, total));
    }
    if let Some(parent) = parent {
        lines.push(format!(
            "parent:    {} #{}",
            parent.display_name(),
            short_id(&parent.id)
        ));
    }
    if let Some(image) = &task.image {
        let state = match image.status {
            ImageStatus::Ready => image_url.unwrap_or("ready (blob missing)"),
            ImageStatus::Generating => "generating",
        };
        lines.push(format!("image:     {}", state));
        if let Some(description) = &image.description {
            lines.push(format!("           {}", description));
        }
    }
    if !task.subtasks.is_empty() {
        lines.push("subtasks:".to_string());
        for sub in &task.subtasks {
            lines.push(format!("  {}", format_task_line(sub)));
        }
    }
    lines
}

pub fn format_stats(stats: &TaskStatistics) -> Vec<String> {
    vec![
        format!("completed:            {}", stats.total_completed),
        format!("  morning:            {}", stats.completed_in_morning),
        format!("  afternoon:          {}", stats.completed_in_afternoon),
        format!("  evening:            {}", stats.completed_in_evening),
        format!("faster than timer:    {}", stats.completed_faster_than_timer),
        format!("current streak:       {}", stats.consecutive_completed),
        format!("achievements:         {}", stats.unlocked_achievements.len()),
    ]
}

pub fn format_achievements(catalog: &[(&'static Accomplishment, bool)]) -> Vec<String> {
    catalog
        .iter()
        .map(|(a, unlocked)| {
            format!(
                "[{}] {}  {}: {}",
                if *unlocked { 'x' } else { ' ' },
                a.id,
                a.title,
                a.description
            )
        })
        .collect()
}
