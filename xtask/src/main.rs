use anyhow::{Context, Result};
use clap::Parser;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Parser)]
enum Cmd {
    /// Build the agent library
    Build {
        #[arg(long)]
        release: bool,
    },
    /// Load the agent into a running JVM
    Attach {
        #[arg(long)]
        pid: u32,
        #[arg(long)]
        events_file: Option<PathBuf>,
        #[arg(long)]
        log_file: Option<PathBuf>,
        #[arg(long)]
        release: bool,
    },
    /// Stop recording in a JVM the agent is attached to
    Shutdown {
        #[arg(long)]
        pid: u32,
        /// Skip the final thread dump
        #[arg(long)]
        force: bool,
        #[arg(long)]
        release: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Cmd::Build { release } => build(release)?,
        Cmd::Attach { pid, events_file, log_file, release } => {
            let mut options = Vec::new();
            if let Some(path) = events_file {
                options.push(format!("events_file={}", path.display()));
            }
            if let Some(path) = log_file {
                options.push(format!("log_file={}", path.display()));
            }
            load_agent(pid, &library_path(release)?, &options.join(","))?;
        }
        Cmd::Shutdown { pid, force, release } => {
            let command = if force { "forceshutdown" } else { "shutdown" };
            load_agent(pid, &library_path(release)?, command)?;
        }
    }

    Ok(())
}

fn build(release: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("build").arg("--package").arg("jitmap");
    if release {
        cmd.arg("--release");
    }

    let status = cmd.status().context("Failed to run cargo build")?;

    if !status.success() {
        anyhow::bail!("Failed to build agent library");
    }

    println!("✓ agent library built successfully");
    println!("  Profile: {}", profile(release));

    Ok(())
}

fn profile(release: bool) -> &'static str {
    if release {
        "release"
    } else {
        "debug"
    }
}

/// Absolute path of the built agent library
fn library_path(release: bool) -> Result<PathBuf> {
    let workspace = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .context("xtask is not inside a workspace")?;
    let path = workspace
        .join("target")
        .join(profile(release))
        .join(format!("{DLL_PREFIX}jitmap{DLL_SUFFIX}"));
    if !path.exists() {
        anyhow::bail!("{} not found, run `cargo run -p xtask -- build` first", path.display());
    }
    Ok(path)
}

/// `jcmd <pid> JVMTI.agent_load <library> [options]`
fn load_agent(pid: u32, library: &Path, options: &str) -> Result<()> {
    let mut cmd = Command::new("jcmd");
    cmd.arg(pid.to_string()).arg("JVMTI.agent_load").arg(library);
    if !options.is_empty() {
        cmd.arg(options);
    }

    let status = cmd.status().context("Failed to run jcmd; is a JDK on PATH?")?;

    if !status.success() {
        anyhow::bail!("jcmd exited with {status}");
    }

    println!("✓ agent loaded into {pid}");
    if !options.is_empty() {
        println!("  Options: {options}");
    }

    Ok(())
}
