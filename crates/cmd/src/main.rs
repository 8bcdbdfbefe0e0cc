// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::Result;
use bytes::Bytes;
use clap::{Args, Parser, Subcommand};

use cmd::Context;
use cmd::commands;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "wfs")]
struct Cli {
    /// Local store holding the root directory
    #[arg(long, env = "WFS_DB", default_value = "wfs.duckdb", global = true)]
    db: PathBuf,

    /// Access token for remote folders
    #[arg(long, env = "WFS_DRIVE_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// YAML file with remote driver settings
    #[arg(long, global = true)]
    drive_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a directory
    Ls {
        #[arg(default_value = "")]
        path: String,
    },
    /// Show metadata of an entry
    Stat { path: String },
    /// Print a file
    Cat { path: String },
    /// Create a file from text or standard input
    Put(PutArgs),
    /// Overwrite part of an existing file
    Write(WriteArgs),
    /// Create a directory
    Mkdir { path: String },
    /// Remove an entry, unlinking mount points
    Rm { path: String },
    /// Mount a driver's directory
    Mount {
        path: String,
        driver: String,
        /// Driver params, parsed as JSON when possible
        params: Vec<String>,
    },
}

#[derive(Args)]
struct PutArgs {
    path: String,
    /// Content; standard input is read when absent
    #[arg(long)]
    text: Option<String>,
    #[arg(long)]
    mime: Option<String>,
}

#[derive(Args)]
struct WriteArgs {
    path: String,
    text: String,
    /// Byte offset of the first replaced byte
    #[arg(long, default_value_t = 0)]
    offset: u64,
    /// Bytes replaced; defaults to the rest of the file
    #[arg(long)]
    count: Option<u64>,
}

fn read_stdin() -> Result<Bytes> {
    let mut content = Vec::new();
    _ = io::stdin().read_to_end(&mut content)?;
    Ok(Bytes::from(content))
}

#[tokio::main]
async fn main() -> Result<()> {
    diagnostics::init();
    let cli = Cli::parse();
    let ctx = Context::new(cli.db)
        .with_token(cli.token)
        .with_drive_config(cli.drive_config);
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Ls { path } => commands::list_command(&ctx, &path, &mut out).await,
        Commands::Stat { path } => commands::stat_command(&ctx, &path, &mut out).await,
        Commands::Cat { path } => commands::cat_command(&ctx, &path, &mut out).await,
        Commands::Put(args) => {
            let content = match args.text {
                Some(text) => Bytes::from(text),
                None => read_stdin()?,
            };
            _ = commands::put_command(&ctx, &args.path, content, args.mime.as_deref()).await?;
            Ok(())
        }
        Commands::Write(args) => {
            let content = Bytes::from(args.text);
            _ = commands::write_command(&ctx, &args.path, content, args.offset, args.count).await?;
            Ok(())
        }
        Commands::Mkdir { path } => commands::mkdir_command(&ctx, &path).await,
        Commands::Rm { path } => commands::remove_command(&ctx, &path).await,
        Commands::Mount { path, driver, params } => {
            commands::mount_command(&ctx, &path, &driver, &params).await
        }
    }
}
