// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # graph-part
//!
//! Command-line interface for the backend partitioner.
//!
//! ## Usage
//! ```bash
//! # Inspect a graph document
//! graph-part inspect --graph ./graphs/add_relu.json
//!
//! # List registered backends and their operators
//! graph-part backends
//!
//! # Partition a graph across backends
//! graph-part partition --graph ./graphs/add_relu.json --priority ft
//! graph-part --config partition.toml partition --graph ./graphs/add_relu.json --json
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "graph-part",
    about = "Partition computation graphs across accelerator backends",
    version,
    author
)]
struct Cli {
    /// Path to a TOML partitioner configuration (CLI flags override it).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a graph document's nodes, operators and outputs.
    Inspect {
        /// Path to the JSON graph document.
        #[arg(short, long)]
        graph: PathBuf,
    },

    /// List registered backends, their operators and pattern tables.
    Backends,

    /// Partition a graph and print the assignment.
    Partition {
        /// Path to the JSON graph document.
        #[arg(short, long)]
        graph: PathBuf,

        /// Comma-separated backend priority (e.g. "ft"). An empty string
        /// sends everything to the host.
        #[arg(short, long)]
        priority: Option<String>,

        /// Disable merging of adjacent same-backend partitions.
        #[arg(long)]
        no_merge: bool,

        /// Print the assignment as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);
    commands::register_backends()?;

    match cli.command {
        Commands::Inspect { graph } => commands::inspect::execute(graph),
        Commands::Backends => commands::backends::execute(),
        Commands::Partition {
            graph,
            priority,
            no_merge,
            json,
        } => commands::partition::execute(graph, cli.config, priority, no_merge, json),
    }
}
