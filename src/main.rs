//! `stackplan`: command-line front end for the layout engine.
//!
//! Every command boots an editor from the draft file (seeding it when absent),
//! runs one operation through the same operators an interactive host uses,
//! and prints the result as JSON. Commits autosave back to the draft.

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use layout::config::{ConfigError, EditorConfig};
use layout::doc::{Document, PieceId};
use layout::editor::{EditError, Editor, ErrorCode, NewPiece, Outcome};
use layout::geom::{InvalidRotation, Point, Rotation};
use layout::persist::{self, DraftFile, DraftStore, FileDraftStore, PersistError};
use layout::validate::{self, Problem, Severity};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Rotation(#[from] InvalidRotation),
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("cannot render output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("layer {index} does not exist (document has {count})")]
    NoLayer { index: usize, count: usize },
    #[error("document has no materials")]
    NoMaterial,
    #[error("draft {0} already exists; pass --force to overwrite")]
    DraftExists(PathBuf),
}

impl ErrorCode for CliError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Edit(e) => e.error_code(),
            Self::Persist(e) => e.error_code(),
            Self::Rotation(_) => "E_ROTATION",
            Self::Read { .. } => "E_READ",
            Self::Json(_) => "E_OUTPUT",
            Self::NoLayer { .. } => "E_LAYER_NOT_FOUND",
            Self::NoMaterial => "E_MATERIAL_NOT_FOUND",
            Self::DraftExists(_) => "E_DRAFT_EXISTS",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "stackplan", about = "Stacked-layer layout editor")]
struct Cli {
    /// Draft file the document is loaded from and autosaved to.
    #[arg(long, env = "STACKPLAN_DRAFT", default_value = "stackplan.json")]
    draft: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the default document to the draft file.
    Seed {
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    #[command(flatten)]
    Edit(EditCommand),
}

/// Commands that run against a booted editor.
#[derive(Subcommand, Debug)]
enum EditCommand {
    /// Print the draft.
    Show,
    /// List every problem; exits non-zero if any blocks.
    Validate,
    /// Insert a piece, at a free spot unless --x/--y are given.
    Place {
        /// Layer number, 1 = bottom.
        #[arg(long)]
        layer: usize,
        #[arg(long)]
        width: f64,
        #[arg(long)]
        height: f64,
        #[arg(long, default_value_t = 0)]
        rotation: u16,
        #[arg(long, requires = "y", allow_hyphen_values = true)]
        x: Option<f64>,
        #[arg(long, requires = "x", allow_hyphen_values = true)]
        y: Option<f64>,
    },
    /// Move a piece by a fixed offset.
    Nudge {
        #[arg(long)]
        piece: PieceId,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        dx: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        dy: f64,
    },
    /// Rotate a piece by clockwise quarter turns.
    Rotate {
        #[arg(long)]
        piece: PieceId,
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        quarter_turns: i32,
    },
    /// Duplicate a piece with the offset escape search.
    Duplicate {
        #[arg(long)]
        piece: PieceId,
    },
    /// Delete a piece.
    Delete {
        #[arg(long)]
        piece: PieceId,
    },
    /// Replace the document with a draft file.
    Import { file: PathBuf },
}

/// What a command prints, and whether the process should fail.
#[derive(Debug)]
struct Report {
    output: Value,
    failed: bool,
}

impl Report {
    fn ok(output: Value) -> Self {
        Self { output, failed: false }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).and_then(|report| Ok((serde_json::to_string_pretty(&report.output)?, report.failed))) {
        Ok((rendered, failed)) => {
            println!("{rendered}");
            if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
        }
        Err(e) => {
            eprintln!("{}: {e}", e.error_code());
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<Report, CliError> {
    let config = EditorConfig::from_env()?;
    let store = FileDraftStore::new(&cli.draft);
    match cli.command {
        Command::Seed { force } => seed(&store, force),
        Command::Edit(command) => {
            let mut editor = Editor::boot(Box::new(store), config);
            execute(&mut editor, command)
        }
    }
}

fn seed(store: &FileDraftStore, force: bool) -> Result<Report, CliError> {
    if !force && store.load()?.is_some() {
        return Err(CliError::DraftExists(store.path().to_path_buf()));
    }
    store.save(&persist::encode(&DraftFile::new(Document::seeded(), false))?)?;
    tracing::info!(path = %store.path().display(), "seeded draft");
    Ok(Report::ok(json!({ "seeded": store.path().display().to_string() })))
}

fn execute(editor: &mut Editor, command: EditCommand) -> Result<Report, CliError> {
    match command {
        EditCommand::Show => Ok(Report::ok(serde_json::from_str(&editor.export_json()?)?)),
        EditCommand::Validate => {
            let problems = editor.problems();
            Ok(Report {
                failed: validate::has_block(&problems),
                output: Value::Array(problems.iter().map(problem_json).collect()),
            })
        }
        EditCommand::Place { layer, width, height, rotation, x, y } => {
            let doc = editor.document();
            let layer_id = layer
                .checked_sub(1)
                .and_then(|index| doc.layer_at(index))
                .ok_or(CliError::NoLayer { index: layer, count: doc.layer_count() })?;
            let material = doc.materials().next().map(|m| m.id).ok_or(CliError::NoMaterial)?;
            let position = x.zip(y).map(|(x, y)| Point::new(x, y));
            let id = editor.insert_piece(NewPiece {
                layer: layer_id,
                material,
                width,
                height,
                rotation: Rotation::try_from(rotation)?,
                position,
            })?;
            let bbox = editor.document().piece(&id).map(layout::doc::Piece::bbox);
            Ok(Report::ok(json!({ "id": id, "bbox": bbox, "revision": editor.document().revision() })))
        }
        EditCommand::Nudge { piece, dx, dy } => {
            editor.select(piece)?;
            Ok(outcome_report(&editor.nudge(dx, dy)?))
        }
        EditCommand::Rotate { piece, quarter_turns } => {
            editor.select(piece)?;
            Ok(outcome_report(&editor.rotate_selection(quarter_turns)?))
        }
        EditCommand::Duplicate { piece } => {
            editor.select(piece)?;
            let outcome = editor.duplicate_selection()?;
            let mut report = outcome_report(&outcome);
            report.output["copies"] = json!(editor.selection().ids());
            Ok(report)
        }
        EditCommand::Delete { piece } => {
            editor.select(piece)?;
            Ok(outcome_report(&editor.delete_selected()?))
        }
        EditCommand::Import { file } => {
            let text = std::fs::read_to_string(&file).map_err(|source| CliError::Read { path: file, source })?;
            Ok(outcome_report(&editor.import_json(&text)?))
        }
    }
}

fn outcome_report(outcome: &Outcome) -> Report {
    match outcome {
        Outcome::Committed { revision, problems } => Report::ok(json!({
            "outcome": "committed",
            "revision": revision,
            "problems": problems.iter().map(problem_json).collect::<Vec<_>>(),
        })),
        Outcome::Rejected { problems } => Report {
            output: json!({
                "outcome": "rejected",
                "problems": problems.iter().map(problem_json).collect::<Vec<_>>(),
            }),
            failed: true,
        },
        Outcome::Cancelled => Report::ok(json!({ "outcome": "cancelled" })),
        Outcome::Unchanged => Report::ok(json!({ "outcome": "unchanged" })),
    }
}

fn problem_json(problem: &Problem) -> Value {
    let severity = match problem.severity() {
        Severity::Block => "block",
        Severity::Warn => "warn",
    };
    json!({ "code": problem.code(), "severity": severity, "pieces": problem.pieces() })
}
