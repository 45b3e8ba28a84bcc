//! Subcommand execution against a configured record store

use crate::cli::{Cli, Commands, OutputFormat};
use anyhow::{anyhow, bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::Serialize;
use std::io::Read;
use std::sync::Arc;
use taskboard::store::{self, EntityKind, RecordStore};
use taskboard::types::{Board, BoardId, List, ListId, NewBoard, NewTask, Task, TaskDetails, TaskId};
use taskboard::{Applied, BoardSession, BoardSnapshot};
use taskboard_config::TaskboardConfig;
use tracing::debug;

/// Board as printed by `show --format json`: lists in order, each with its tasks
#[derive(Debug, Serialize)]
struct BoardView<'a> {
    board: &'a Board,
    lists: Vec<ListView<'a>>,
}

#[derive(Debug, Serialize)]
struct ListView<'a> {
    #[serde(flatten)]
    list: &'a List,
    tasks: &'a [Task],
}

impl<'a> BoardView<'a> {
    fn of(snapshot: &'a BoardSnapshot) -> Self {
        Self {
            board: snapshot.board(),
            lists: snapshot
                .lists()
                .iter()
                .map(|list| ListView {
                    list,
                    tasks: snapshot.tasks_in(&list.id),
                })
                .collect(),
        }
    }
}

struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    fn message(&self, text: impl AsRef<str>) {
        if !self.quiet && self.format == OutputFormat::Table {
            println!("{}", text.as_ref());
        }
    }

    fn json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Settled board after a mutation; JSON mode prints it, table mode prints `text`
    fn settled(&self, snapshot: &BoardSnapshot, text: impl AsRef<str>) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.json(&BoardView::of(snapshot)),
            OutputFormat::Table => {
                self.message(text);
                Ok(())
            }
        }
    }
}

pub async fn run(cli: Cli, config: TaskboardConfig) -> Result<()> {
    let out = Output {
        format: cli.format,
        quiet: cli.quiet,
    };
    let store = store::open(&config.store)
        .await
        .with_context(|| format!("failed to open store at {}", config.store.root.display()))?;

    match cli.command {
        Commands::Init {
            title,
            description,
            background,
        } => {
            let mut new_board = NewBoard::new(title);
            if let Some(description) = description {
                new_board = new_board.with_description(description);
            }
            if let Some(background) = background {
                new_board = new_board.with_background(background);
            }
            let board = BoardSession::create_board(store.as_ref(), new_board, &config.sync).await?;
            match out.format {
                OutputFormat::Json => out.json(&board)?,
                OutputFormat::Table => println!("{}", board.id),
            }
            Ok(())
        }
        Commands::Boards => list_boards(store.as_ref(), &out).await,
        command => {
            let board_id = resolve_board(store.as_ref(), cli.board.as_deref()).await?;
            let session = BoardSession::load(Arc::clone(&store), &board_id, config.sync.clone())
                .await
                .with_context(|| format!("failed to load board {}", board_id))?;
            run_on_board(command, &session, &out).await
        }
    }
}

async fn run_on_board(command: Commands, session: &BoardSession, out: &Output) -> Result<()> {
    let snapshot = session.snapshot();
    match command {
        Commands::Show => match out.format {
            OutputFormat::Json => out.json(&BoardView::of(&snapshot)),
            OutputFormat::Table => {
                print_board(&snapshot);
                Ok(())
            }
        },
        Commands::AddList { title } => {
            let after = session.add_list(title).await?;
            let list = after
                .lists()
                .last()
                .ok_or_else(|| anyhow!("list missing after insert"))?;
            match out.format {
                OutputFormat::Json => out.json(list),
                OutputFormat::Table => {
                    println!("{}", list.id);
                    Ok(())
                }
            }
        }
        Commands::AddTask {
            list,
            title,
            description,
            due,
            labels,
            assignee,
        } => {
            let list_id = resolve_list(&snapshot, &list)?;
            let mut task = NewTask::new(title).with_labels(labels);
            task.description = description;
            task.due_date = due;
            task.assignee = assignee;
            let after = session.add_task(&list_id, task).await?;
            let task = after
                .tasks_in(&list_id)
                .last()
                .ok_or_else(|| anyhow!("task missing after insert"))?;
            match out.format {
                OutputFormat::Json => out.json(task),
                OutputFormat::Table => {
                    println!("{}", task.id);
                    Ok(())
                }
            }
        }
        Commands::Drag { event } => {
            let raw = if event == "-" {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .context("failed to read drag event from stdin")?;
                buffer
            } else {
                event
            };
            let applied = session.on_drag_end_json(&raw)?;
            settle(applied, out, "Drag applied").await
        }
        Commands::MoveList { list, to } => {
            let id = resolve_list(&snapshot, &list)?;
            let applied = session.move_list(&id, to)?;
            settle(applied, out, format!("Moved list {} to {}", list, to)).await
        }
        Commands::MoveTask { task, list, to } => {
            let id = resolve_task(&snapshot, &task)?;
            let list_id = resolve_list(&snapshot, &list)?;
            let applied = session.move_task(&id, &list_id, to)?;
            settle(applied, out, format!("Moved task {} to {} at {}", task, list, to)).await
        }
        Commands::EditTask {
            task,
            title,
            description,
            clear_description,
            due,
            clear_due,
            labels,
            assignee,
            clear_assignee,
        } => {
            let id = resolve_task(&snapshot, &task)?;
            let mut details = TaskDetails::new();
            details.title = title;
            if clear_description || description.is_some() {
                details.description = Some(description);
            }
            if clear_due || due.is_some() {
                details.due_date = Some(due);
            }
            details.labels = labels;
            if clear_assignee || assignee.is_some() {
                details.assignee = Some(assignee);
            }
            if details.is_empty() {
                bail!("nothing to edit; pass at least one field");
            }
            let applied = session.update_task(&id, details)?;
            settle(applied, out, format!("Updated task {}", task)).await
        }
        Commands::DeleteList { list } => {
            let id = resolve_list(&snapshot, &list)?;
            let applied = session.delete_list(&id)?;
            settle(applied, out, format!("Deleted list {}", list)).await
        }
        Commands::DeleteTask { task } => {
            let id = resolve_task(&snapshot, &task)?;
            let applied = session.delete_task(&id)?;
            settle(applied, out, format!("Deleted task {}", task)).await
        }
        Commands::Init { .. } | Commands::Boards => bail!("command does not operate on a board"),
    }
}

/// Wait for the background sync so the process never exits mid-write
async fn settle(applied: Applied, out: &Output, done: impl AsRef<str>) -> Result<()> {
    if applied.is_noop() {
        debug!("nothing to persist");
        return out.settled(&applied.snapshot, "No change");
    }
    let settled = applied
        .settle()
        .await
        .context("change was rolled back")?;
    out.settled(&settled, done)
}

async fn list_boards(store: &dyn RecordStore, out: &Output) -> Result<()> {
    let boards: Vec<Board> = store
        .fetch_many(EntityKind::Board, "")
        .await?
        .into_iter()
        .map(|r| r.into_board())
        .collect::<std::result::Result<_, _>>()?;

    if out.format == OutputFormat::Json {
        return out.json(&boards);
    }
    if boards.is_empty() {
        out.message("No boards yet. Create one with `taskboard init <title>`.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Title", "Created"]);
    for board in &boards {
        table.add_row(vec![
            Cell::new(&board.id),
            Cell::new(&board.title),
            Cell::new(board.created_at.format("%Y-%m-%d %H:%M")),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn print_board(snapshot: &BoardSnapshot) {
    let board = snapshot.board();
    println!("{} ({})", board.title, board.id);
    if let Some(description) = &board.description {
        println!("{}", description);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["List", "#", "Task", "Due", "Labels", "Id"]);
    for list in snapshot.lists() {
        let tasks = snapshot.tasks_in(&list.id);
        if tasks.is_empty() {
            table.add_row(vec![Cell::new(&list.title), Cell::new(""), Cell::new("(empty)")]);
        }
        for task in tasks {
            table.add_row(vec![
                Cell::new(&list.title),
                Cell::new(task.position),
                Cell::new(&task.title),
                Cell::new(task.due_date.map(|d| d.to_string()).unwrap_or_default()),
                Cell::new(task.labels.join(", ")),
                Cell::new(&task.id),
            ]);
        }
    }
    println!("{table}");
}

/// `--board`, or the oldest board in the store
async fn resolve_board(store: &dyn RecordStore, requested: Option<&str>) -> Result<BoardId> {
    if let Some(id) = requested {
        return Ok(BoardId::from_string(id));
    }
    let first = store
        .fetch_many(EntityKind::Board, "")
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no board found; create one with `taskboard init <title>`"))?;
    Ok(BoardId::from_string(first.key().id))
}

/// Exact id first, then exact title
fn resolve_list(snapshot: &BoardSnapshot, name: &str) -> Result<ListId> {
    if let Some(list) = snapshot.lists().iter().find(|l| l.id.as_str() == name) {
        return Ok(list.id.clone());
    }
    let matches: Vec<&List> = snapshot.lists().iter().filter(|l| l.title == name).collect();
    match matches.as_slice() {
        [list] => Ok(list.id.clone()),
        [] => bail!("list '{}' not found", name),
        _ => bail!("list title '{}' is ambiguous; use its id", name),
    }
}

/// Exact id first, then exact title
fn resolve_task(snapshot: &BoardSnapshot, name: &str) -> Result<TaskId> {
    if let Some(task) = snapshot.tasks().find(|t| t.id.as_str() == name) {
        return Ok(task.id.clone());
    }
    let matches: Vec<&Task> = snapshot.tasks().filter(|t| t.title == name).collect();
    match matches.as_slice() {
        [task] => Ok(task.id.clone()),
        [] => bail!("task '{}' not found", name),
        _ => bail!("task title '{}' is ambiguous; use its id", name),
    }
}
