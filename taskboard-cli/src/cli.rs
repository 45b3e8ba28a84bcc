use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "taskboard")]
#[command(version)]
#[command(about = "Arrange kanban lists and tasks stored on disk")]
#[command(long_about = "
taskboard drives a kanban board kept in a record store. Lists and tasks are
kept in dense order; every move is applied locally first and then written
to the store, and a failed write restores the previous order.

Lists and tasks can be named by id or by title.

Example usage:
  taskboard init \"Launch\"                        # Create a board
  taskboard add-list Todo                        # Append a list
  taskboard add-task Todo \"Write changelog\"      # Append a task
  taskboard move-task \"Write changelog\" Done 0   # Move a task
  taskboard drag '{\"draggableId\": ...}'         # Replay a raw drag-end event
  taskboard --format json show                   # Dump the board as JSON
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store root directory (overrides store.root)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Board id; defaults to the oldest board in the store
    #[arg(long, global = true)]
    pub board: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a board
    Init {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Background colour, e.g. #10B981
        #[arg(long)]
        background: Option<String>,
    },
    /// List every board in the store
    Boards,
    /// Show the board with its lists and tasks
    Show,
    /// Append a list to the board
    AddList { title: String },
    /// Append a task to a list
    AddTask {
        /// List id or title
        list: String,
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Due date as YYYY-MM-DD
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long = "label")]
        labels: Vec<String>,
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Replay a drag-end event given as JSON (`-` reads stdin)
    #[command(long_about = "
Replay a drag-end event as emitted by the UI's drag library:

  {
    \"draggableId\": \"<task or list id>\",
    \"type\": \"task\",
    \"source\": { \"droppableId\": \"<list id>\", \"index\": 0 },
    \"destination\": { \"droppableId\": \"<list id>\", \"index\": 1 },
    \"reason\": \"DROP\"
  }

A null destination or a CANCEL reason changes nothing. List drags use the
board id as both droppable ids.
")]
    Drag { event: String },
    /// Move a list to a new index
    MoveList {
        /// List id or title
        list: String,
        to: usize,
    },
    /// Move a task to an index of a list
    MoveTask {
        /// Task id or title
        task: String,
        /// Destination list id or title
        list: String,
        to: usize,
    },
    /// Edit a task's title, description, due date, labels or assignee
    EditTask {
        /// Task id or title
        task: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,
        #[arg(long)]
        clear_due: bool,
        /// Replace the labels
        #[arg(long = "label")]
        labels: Option<Vec<String>>,
        #[arg(long, conflicts_with = "clear_assignee")]
        assignee: Option<String>,
        #[arg(long)]
        clear_assignee: bool,
    },
    /// Delete a list and all of its tasks
    DeleteList {
        /// List id or title
        list: String,
    },
    /// Delete a task
    DeleteTask {
        /// Task id or title
        task: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_move_task_with_globals() {
        let cli = Cli::try_parse_from([
            "taskboard", "--root", "/tmp/data", "move-task", "Ship", "Done", "2", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/data")));
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::MoveTask { task, list, to } => {
                assert_eq!(task, "Ship");
                assert_eq!(list, "Done");
                assert_eq!(to, 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_due_date() {
        let cli = Cli::try_parse_from(["taskboard", "add-task", "Todo", "Ship", "--due", "2024-05-01"])
            .unwrap();
        match cli.command {
            Commands::AddTask { due, .. } => {
                assert_eq!(due, NaiveDate::from_ymd_opt(2024, 5, 1));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["taskboard", "add-task", "Todo", "Ship", "--due", "soon"]).is_err());
    }

    #[test]
    fn test_edit_rejects_conflicting_flags() {
        assert!(Cli::try_parse_from([
            "taskboard",
            "edit-task",
            "Ship",
            "--description",
            "x",
            "--clear-description"
        ])
        .is_err());
    }
}
