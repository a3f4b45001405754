/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! lambda-signer - sign function and layer packages before deployment.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

/// Sign deployment packages and wire code-signing configuration into templates
#[derive(Parser)]
#[command(name = "lambda-signer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Service manifest (defaults to the first one found on the search path)
    #[arg(short, long, env = "LAMBDA_SIGNER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Directory holding local buckets and signing profiles
    #[arg(long, env = "LAMBDA_SIGNER_STATE_DIR", global = true)]
    state_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign the packaged artifacts of the service
    Sign {
        /// Only sign this function or layer
        #[arg(short, long)]
        function: Option<String>,
    },

    /// Add code-signing configuration resources to a generated template
    Annotate {
        /// CloudFormation template (JSON)
        #[arg(short, long)]
        template: PathBuf,

        /// Write the result here instead of updating the template in place
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove signing buckets and revoke signing profiles
    Remove,

    /// Manifest helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write an example manifest
    Init {
        /// Destination file
        #[arg(short, long, default_value = "lambda-signer.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the resolved signing configuration of every unit as JSON
    Resolve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let options = commands::GlobalOptions {
        config: cli.config,
        state_dir: cli.state_dir,
    };

    match cli.command {
        Commands::Sign { function } => commands::sign::run(&options, function.as_deref()).await?,
        Commands::Annotate { template, output } => {
            commands::annotate::run(&options, &template, output.as_deref()).await?
        }
        Commands::Remove => commands::remove::run(&options).await?,
        Commands::Config { command } => match command {
            ConfigCommands::Init { output, force } => commands::config::init(&output, force)?,
            ConfigCommands::Resolve => commands::config::resolve(&options)?,
        },
    }

    Ok(())
}
