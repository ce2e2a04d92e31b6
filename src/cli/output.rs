//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;
use generational_arena::Index;
use termtree::Tree;

use crate::domain::{FlatNode, Forest, ForestArena, ACCENT_COLOR};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print completed action (green label)
pub fn action(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Station label: bold for the accent root, dimmed id, marker for collapsed children.
pub fn station_label(name: &str, id: &str, color: &str, collapsed: bool) -> String {
    let name = if color == ACCENT_COLOR {
        name.bold().to_string()
    } else {
        name.to_string()
    };
    let marker = if collapsed { " [+]" } else { "" };
    format!("{}{} {} {}", name, marker, color.dimmed(), id.dimmed())
}

/// One `termtree` per root; collapsed subtrees are shown folded.
pub fn forest_trees(forest: &Forest) -> Vec<Tree<String>> {
    let arena = ForestArena::from_forest(forest);

    fn build(arena: &ForestArena<'_>, idx: Index) -> Tree<String> {
        let Some(record) = arena.get_node(idx) else {
            return Tree::new(String::new());
        };
        let node = record.node;
        let mut tree = Tree::new(station_label(
            &node.name,
            &node.id,
            &node.color,
            node.children_hidden && !node.children.is_empty(),
        ));
        if !node.children_hidden {
            for &child in &record.children {
                tree.push(build(arena, child));
            }
        }
        tree
    }

    arena.roots().iter().map(|&root| build(&arena, root)).collect()
}

/// Indented listing line for a flattened node.
pub fn list_line(flat: &FlatNode) -> String {
    format!(
        "{}{}",
        "  ".repeat(flat.depth),
        station_label(
            &flat.name,
            &flat.id,
            &flat.color,
            flat.children_hidden && flat.child_count > 0
        )
    )
}
