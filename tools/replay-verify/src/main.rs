//! Replay store verification harness.
//!
//! Drives the store through its three cross-process contract checks:
//! bounded growth under expiry, independent concurrent writers, and
//! same-tag races. Workers are separate OS processes re-executing this
//! binary through a hidden subcommand, so the whole-file lock is exercised
//! between real processes, not just threads.
//!
//! Exit code 0 means every assertion held; anything else is a violation or
//! an I/O failure.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{Child, Command};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use replay_store::{
    StoreError, SystemTimeSource, Tag, TagStore, TagStoreApi, TimeSource, FIRST_TABLE_RECORDS,
    RECORD_LEN, TAG_LEN,
};

/// Exit status a race worker uses to report a replay answer.
const EXIT_REPLAY: i32 = 42;

#[derive(Parser, Debug)]
#[command(name = "replay-verify")]
#[command(about = "Verification harness for the replay tag store")]
struct Args {
    /// Store file the checks run against (recreated per check)
    filename: PathBuf,

    /// Allowable clock skew in seconds
    #[arg(long, default_value_t = 300)]
    skew: u32,

    /// Emit a JSON summary line on success
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: CheckCommand,
}

#[derive(Subcommand, Debug)]
enum CheckCommand {
    /// Store tags far apart in time; the file must never grow past one table
    Expiry { nreps: u64 },

    /// N workers store disjoint tags at one timestamp; every tag must then replay
    Concurrent { nprocesses: u32, nreps: u64 },

    /// Rounds of N workers storing one identical tag; exactly one may win
    Race { nprocesses: u32, nreps: u64 },

    /// Internal worker entry point (spawned by concurrent/race)
    #[command(hide = true)]
    Worker {
        #[arg(long, value_enum)]
        kind: WorkerKind,
        #[arg(long)]
        worker: u32,
        #[arg(long, default_value_t = 0)]
        nreps: u64,
        #[arg(long, default_value_t = 0)]
        round: u64,
        #[arg(long)]
        timestamp: u32,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum WorkerKind {
    Concurrent,
    Race,
}

#[derive(Serialize, Debug)]
struct Summary {
    check: &'static str,
    stores: u64,
    replays: u64,
    file_bytes: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        CheckCommand::Expiry { nreps } => {
            let summary = check_expiry(&args.filename, args.skew, nreps)?;
            report(&summary, args.json);
        }
        CheckCommand::Concurrent { nprocesses, nreps } => {
            let summary = check_concurrent(&args.filename, args.skew, nprocesses, nreps)?;
            report(&summary, args.json);
        }
        CheckCommand::Race { nprocesses, nreps } => {
            let summary = check_race(&args.filename, args.skew, nprocesses, nreps)?;
            report(&summary, args.json);
        }
        CheckCommand::Worker {
            kind,
            worker,
            nreps,
            round,
            timestamp,
        } => {
            let code = run_worker(&args.filename, args.skew, kind, worker, nreps, round, timestamp)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}

fn report(summary: &Summary, json: bool) {
    if json {
        // Summary serialization cannot fail for this plain struct.
        if let Ok(line) = serde_json::to_string(summary) {
            println!("{}", line);
        }
    }
    info!(
        "{}: ok ({} stores, {} replays, {} file bytes)",
        summary.check, summary.stores, summary.replays, summary.file_bytes
    );
}

/// Deterministic per-worker tag, reproducible by the parent for the replay
/// pass.
fn worker_tag(worker: u32, rep: u64) -> Tag {
    let mut bytes = [0u8; TAG_LEN];
    bytes[..4].copy_from_slice(&worker.to_be_bytes());
    bytes[4..12].copy_from_slice(&rep.to_be_bytes());
    Tag::new(bytes)
}

/// The single contended tag for a race round.
fn race_tag(round: u64) -> Tag {
    worker_tag(u32::MAX, round)
}

fn open_store(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)
        .with_context(|| format!("open store file {}", path.display()))
}

fn fresh_store(path: &Path) -> Result<File> {
    let _ = fs::remove_file(path);
    open_store(path)
}

/// Bounded growth: with every entry expired before the next store, the
/// file must stay within one table regardless of how many tags pass
/// through it.
fn check_expiry(path: &Path, skew: u32, nreps: u64) -> Result<Summary> {
    let file = fresh_store(path)?;
    let store = TagStore::new();
    let base = SystemTimeSource.now();
    let growth_limit = (FIRST_TABLE_RECORDS + 1) * RECORD_LEN as u64;

    for rep in 0..nreps {
        // Strictly increasing stamps, spaced past the skew so the previous
        // entry is always expired.
        let now = base.wrapping_add((rep as u32).wrapping_mul(skew.wrapping_add(1)));
        store
            .store(&file, &worker_tag(0, rep), now, skew)
            .with_context(|| format!("store rep {}", rep))?;

        let size = file.metadata()?.len();
        if size > growth_limit {
            bail!(
                "rep {}: store file grew to {} bytes, limit {}",
                rep,
                size,
                growth_limit
            );
        }
    }

    Ok(Summary {
        check: "expiry",
        stores: nreps,
        replays: 0,
        file_bytes: file.metadata()?.len(),
    })
}

/// Independent writers: each worker's tags must be accepted exactly once,
/// and the parent's replay pass must see every one of them.
fn check_concurrent(path: &Path, skew: u32, nprocesses: u32, nreps: u64) -> Result<Summary> {
    fresh_store(path)?;
    let timestamp = SystemTimeSource.now();

    let children: Vec<(u32, Child)> = (0..nprocesses)
        .map(|worker| {
            let child = spawn_worker(path, skew, WorkerKind::Concurrent, worker, nreps, 0, timestamp)?;
            Ok((worker, child))
        })
        .collect::<Result<_>>()?;

    let store = TagStore::new();
    let file = open_store(path)?;
    let mut replays = 0u64;
    for (worker, mut child) in children {
        let status = child.wait().context("wait for worker")?;
        if !status.success() {
            bail!("worker {} exited with {}", worker, status);
        }

        // The worker is done; every tag it stored must now replay.
        for rep in 0..nreps {
            match store.store(&file, &worker_tag(worker, rep), timestamp, skew) {
                Err(StoreError::Replay) => replays += 1,
                Ok(()) => bail!("tag {}/{} was accepted twice", worker, rep),
                Err(err) => {
                    return Err(err).with_context(|| format!("replay pass {}/{}", worker, rep))
                }
            }
        }
        info!("worker {}: {} tags stored and replayed", worker, nreps);
    }

    Ok(Summary {
        check: "concurrent",
        stores: nprocesses as u64 * nreps,
        replays,
        file_bytes: file.metadata()?.len(),
    })
}

/// Same-tag race: per round, all workers contend on one tag and exactly
/// one store may succeed.
fn check_race(path: &Path, skew: u32, nprocesses: u32, nreps: u64) -> Result<Summary> {
    fresh_store(path)?;
    let mut replays = 0u64;

    for round in 0..nreps {
        let timestamp = SystemTimeSource.now();
        let children: Vec<Child> = (0..nprocesses)
            .map(|worker| spawn_worker(path, skew, WorkerKind::Race, worker, 0, round, timestamp))
            .collect::<Result<_>>()?;

        let mut winners = 0u32;
        for mut child in children {
            match child.wait().context("wait for race worker")?.code() {
                Some(0) => winners += 1,
                Some(EXIT_REPLAY) => replays += 1,
                code => bail!("round {}: worker exited abnormally ({:?})", round, code),
            }
        }
        if winners != 1 {
            bail!("round {}: {} winners, expected exactly 1", round, winners);
        }
    }

    Ok(Summary {
        check: "race",
        stores: nreps,
        replays,
        file_bytes: open_store(path)?.metadata()?.len(),
    })
}

fn spawn_worker(
    path: &Path,
    skew: u32,
    kind: WorkerKind,
    worker: u32,
    nreps: u64,
    round: u64,
    timestamp: u32,
) -> Result<Child> {
    let exe = std::env::current_exe().context("locate current executable")?;
    let kind_arg = match kind {
        WorkerKind::Concurrent => "concurrent",
        WorkerKind::Race => "race",
    };
    Command::new(exe)
        .arg(path)
        .arg("--skew")
        .arg(skew.to_string())
        .arg("worker")
        .arg("--kind")
        .arg(kind_arg)
        .arg("--worker")
        .arg(worker.to_string())
        .arg("--nreps")
        .arg(nreps.to_string())
        .arg("--round")
        .arg(round.to_string())
        .arg("--timestamp")
        .arg(timestamp.to_string())
        .spawn()
        .with_context(|| format!("spawn {} worker {}", kind_arg, worker))
}

fn run_worker(
    path: &Path,
    skew: u32,
    kind: WorkerKind,
    worker: u32,
    nreps: u64,
    round: u64,
    timestamp: u32,
) -> Result<i32> {
    let store = TagStore::new();
    let file = open_store(path)?;

    match kind {
        WorkerKind::Concurrent => {
            for rep in 0..nreps {
                store
                    .store(&file, &worker_tag(worker, rep), timestamp, skew)
                    .with_context(|| format!("worker {} rep {}", worker, rep))?;
            }
            Ok(0)
        }
        WorkerKind::Race => match store.store(&file, &race_tag(round), timestamp, skew) {
            Ok(()) => Ok(0),
            Err(StoreError::Replay) => Ok(EXIT_REPLAY),
            Err(err) => Err(err).with_context(|| format!("race worker {} round {}", worker, round)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_tags_disjoint_across_workers() {
        assert_ne!(worker_tag(0, 1), worker_tag(1, 0));
        assert_ne!(worker_tag(2, 7), worker_tag(3, 7));
        assert_eq!(worker_tag(5, 9), worker_tag(5, 9));
    }

    #[test]
    fn test_race_tag_stable_per_round() {
        assert_eq!(race_tag(4), race_tag(4));
        assert_ne!(race_tag(4), race_tag(5));
    }
}
