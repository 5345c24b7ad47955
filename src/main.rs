// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! skylab CLI - inspect module resolution over a mounted directory

mod host;

use clap::{Parser, Subcommand};
use host::{display_path, FsHost};
use owo_colors::OwoColorize;
use skylab_core::Module;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "skylab",
    about = "CommonJS module graph loader and resolver",
    version,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    /// Directory mounted as the virtual module root
    #[arg(long, global = true, env = "SKYLAB_DIR", default_value = ".")]
    dir: PathBuf,

    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a request to a module id without loading dependencies
    Resolve {
        /// Request string (relative or bare specifier)
        request: String,

        /// Module id to resolve from
        #[arg(long, default_value = "/main.js")]
        from: String,
    },
    /// Load an entry module and print every module it pulled in
    Graph {
        /// Entry request, e.g. ./app
        entry: String,

        /// Print the graph as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("skylab=debug,skylab_core=trace")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("skylab=warn,skylab_core=warn")
            .init();
    }

    let root = Module::root(Arc::new(FsHost::new(&cli.dir)));

    match cli.command {
        Command::Resolve { request, from } => {
            let require = root.create_require(&from)?;
            match require.resolve(&request) {
                Ok(id) => println!("{}", id.green()),
                Err(err) => {
                    eprintln!("{}: {}", "Error".red().bold(), err);
                    std::process::exit(1);
                }
            }
        }
        Command::Graph { entry, json } => {
            if let Err(err) = root.require(&entry) {
                eprintln!("{}: {}", "Error".red().bold(), err);
                std::process::exit(1);
            }
            let ids = root.cached_ids();
            if json {
                let graph: Vec<serde_json::Value> = ids
                    .iter()
                    .map(|id| {
                        serde_json::json!({
                            "id": id,
                            "file": display_path(&cli.dir, id),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&graph)?);
            } else {
                println!(
                    "{} {} module(s) loaded from {}",
                    "ok".green().bold(),
                    ids.len(),
                    cli.dir.display()
                );
                for id in ids {
                    println!("  {}", id.cyan());
                }
            }
        }
    }

    Ok(())
}
