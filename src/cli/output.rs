use crate::model::tree::descendant_ids;
use crate::model::{Priority, Project, Task, TaskTree};
use crate::ops::move_ops::MoveTarget;

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn check_char(task: &Task) -> char {
    if task.completed { 'x' } else { ' ' }
}

/// Format a single task as a one-line summary
pub fn format_task_line(task: &Task) -> String {
    let priority = match task.priority {
        Priority::Medium => String::new(),
        other => format!(" !{}", other),
    };
    format!("- [{}] {} {}{}", check_char(task), task.id, task.title, priority)
}

/// Format a task with its subtasks, indented two spaces per level.
///
/// Subtasks of a folded task are replaced by a count unless `show_all`.
pub fn format_task_tree(task: &Task, indent: usize, show_all: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let prefix = "  ".repeat(indent);

    if task.collapsed && task.has_children() && !show_all {
        let hidden = descendant_ids(task).len();
        lines.push(format!("{}{} (+{} hidden)", prefix, format_task_line(task), hidden));
        return lines;
    }

    lines.push(format!("{}{}", prefix, format_task_line(task)));
    for sub in &task.children {
        lines.extend(format_task_tree(sub, indent + 1, show_all));
    }
    lines
}

pub fn format_tree(tree: &TaskTree, show_all: bool) -> Vec<String> {
    if tree.is_empty() {
        return vec![format!("No tasks in project {}.", tree.project_id)];
    }
    tree.roots
        .iter()
        .flat_map(|task| format_task_tree(task, 0, show_all))
        .collect()
}

/// Format move candidates, ineligible ones annotated with the reason
pub fn format_targets(targets: &[MoveTarget]) -> Vec<String> {
    let mut lines = vec!["(top level)".to_string()];
    for target in targets {
        let prefix = "  ".repeat(target.depth + 1);
        let note = target
            .reason
            .map(|r| format!("  [{}]", r.describe()))
            .unwrap_or_default();
        lines.push(format!("{}{} {}{}", prefix, target.task, target.title, note));
    }
    lines
}

pub fn format_project_line(project: &Project) -> String {
    format!("{:>4}  {}", project.id.0, project.name)
}
