//! Build with `cargo run --release --bin config_dump -- <path\to\FE.toml>`.
//! Resolves the file exactly as the plugin would and prints the result.

use anyhow::{Context, Result};
use std::{env, path::PathBuf, process};

fn run() -> Result<()> {
    /*── arguments ──────────────────────────────*/
    let path = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: config_dump <path-to-FE.toml>")?;

    /*── resolve ────────────────────────────────*/
    let settings = fe::config::load_strict(&path)
        .with_context(|| format!("reading {}", path.display()))?;

    /*── report ─────────────────────────────────*/
    println!("{}", serde_json::to_string_pretty(&settings)?);
    for line in settings.summary() {
        eprintln!("• {}", line);
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("❌ {:#}", e);
        process::exit(1);
    }
}
