//! Offline tool for persisted board snapshots: summarize one, or rewrite
//! it in normalized form with malformed and duplicate entries dropped.


use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use board_canvas::camera::ViewTransform;
use board_canvas::comments::{Anchor, CommentSystem};
use board_canvas::doc::ObjectKind;
use board_canvas::error::SnapshotError;
use board_canvas::scene::SceneGraph;
use board_canvas::snapshot::{self, RestoreReport};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("cannot write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("{path}: snapshot has {skipped} unusable entries")]
    Unclean { path: PathBuf, skipped: usize },
}

#[derive(Parser, Debug)]
#[command(name = "board-cli", about = "Inspect and normalize board snapshots")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of a snapshot file.
    Inspect {
        file: PathBuf,
        /// Fail when any entry had to be skipped.
        #[arg(long)]
        strict: bool,
    },
    /// Rewrite a snapshot in canonical form.
    Normalize {
        file: PathBuf,
        /// Output path; defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Indent the output.
        #[arg(long, env = "BOARD_CLI_PRETTY")]
        pretty: bool,
    },
}

/// A snapshot restored into fresh engine state.
struct Board {
    scene: SceneGraph,
    view: ViewTransform,
    comments: CommentSystem,
    report: RestoreReport,
}

impl Board {
    fn parse(raw: &str) -> Result<Self, CliError> {
        let value = snapshot::parse_snapshot(raw)?;
        let mut scene = SceneGraph::new();
        let mut view = ViewTransform::default();
        let mut comments = CommentSystem::new();
        let report = snapshot::restore_snapshot(&value, &mut scene, &mut view, &mut comments);
        // A fresh view has no viewport of its own; keep the stored one.
        view.set_viewport(report.view_state.viewport);
        Ok(Self { scene, view, comments, report })
    }

    fn read(path: &Path) -> Result<Self, CliError> {
        let raw = fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_owned(), source })?;
        Self::parse(&raw)
    }

    fn skipped(&self) -> usize {
        self.report.objects_skipped + self.report.comments_skipped
    }

    fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let r = &self.report;
        lines.push(format!("version: {}", r.version.as_deref().unwrap_or("(none)")));

        let mut kinds: BTreeMap<ObjectKind, usize> = BTreeMap::new();
        for obj in self.scene.get_all_objects() {
            *kinds.entry(obj.kind()).or_default() += 1;
        }
        let by_kind: Vec<String> = kinds.iter().map(|(k, n)| format!("{k:?}={n}").to_lowercase()).collect();
        lines.push(format!("objects: {} [{}] skipped={}", r.objects_loaded, by_kind.join(" "), r.objects_skipped));

        if let Some(bounds) = self
            .scene
            .get_all_objects()
            .iter()
            .map(board_canvas::doc::BoardObject::bounds)
            .reduce(|a, b| a.union(&b))
        {
            lines.push(format!(
                "extent: x={} y={} w={} h={}",
                bounds.x, bounds.y, bounds.width, bounds.height
            ));
        }

        let all = self.comments.get_all_comments();
        let resolved = all.iter().filter(|c| c.resolved).count();
        let detached = all
            .iter()
            .filter(|c| matches!(c.anchor, Anchor::Position { detached_from: Some(_), .. }))
            .count();
        lines.push(format!(
            "comments: {} open={} resolved={} detached={} skipped={}",
            r.comments_loaded,
            all.len() - resolved,
            resolved,
            detached,
            r.comments_skipped
        ));

        let state = self.view.view_state();
        let defaulted = if r.view_defaulted { " (default)" } else { "" };
        lines.push(format!("view: pan=({}, {}) zoom={}{defaulted}", state.pan.x, state.pan.y, state.zoom));
        lines
    }

    fn normalized(&self, pretty: bool) -> Result<String, CliError> {
        let snap = snapshot::create_snapshot(&self.scene, &self.view, &self.comments);
        let json = if pretty { snap.to_json_pretty()? } else { snap.to_json()? };
        Ok(json)
    }
}

fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect { file, strict } => run_inspect(&file, strict),
        Command::Normalize { file, output, pretty } => run_normalize(&file, output.as_deref(), pretty),
    }
}

fn run_inspect(file: &Path, strict: bool) -> Result<(), CliError> {
    let board = Board::read(file)?;
    for line in board.summary() {
        println!("{line}");
    }
    if strict && board.skipped() > 0 {
        return Err(CliError::Unclean { path: file.to_owned(), skipped: board.skipped() });
    }
    Ok(())
}

fn run_normalize(file: &Path, output: Option<&Path>, pretty: bool) -> Result<(), CliError> {
    let board = Board::read(file)?;
    if board.skipped() > 0 {
        warn!(skipped = board.skipped(), "dropping unusable entries");
    }
    let json = board.normalized(pretty)?;
    match output {
        Some(path) => {
            fs::write(path, json).map_err(|source| CliError::Write { path: path.to_owned(), source })?;
            info!(path = %path.display(), objects = board.report.objects_loaded, "snapshot written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
