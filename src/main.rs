use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::AsyncReadExt;

use invoice_templates::error::ErrorKind;
use invoice_templates::{parse_id, AppError, Config, RenameRequest, TemplateService};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to the per-user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a PDF and print the new template
    Upload {
        file: PathBuf,
        /// Filename to record instead of the file's own name
        #[arg(long)]
        filename: Option<String>,
    },
    /// Print all templates, oldest first
    List,
    /// Print one template
    Show { id: String },
    /// Rename a template from a JSON body such as {"name": "..."}
    Rename { id: String, body: String },
    /// Overwrite a template's HTML with the contents of FILE ("-" for stdin)
    ReplaceHtml { id: String, file: PathBuf },
    /// Delete a template and its artifacts
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    let service = TemplateService::open(&config)
        .await
        .context("Failed to open template store")?;

    match run(&service, args.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("Error ({}): {}", e.status_code(), e);
            Ok(exit_code(e.kind()))
        }
    }
}

async fn run(service: &TemplateService, command: Command) -> Result<(), AppError> {
    match command {
        Command::Upload { file, filename } => {
            let filename = match filename {
                Some(name) => name,
                None => file
                    .file_name()
                    .map(|f| f.to_string_lossy().to_string())
                    .ok_or_else(|| AppError::InvalidInput(format!("{:?} has no file name", file)))?,
            };
            let upload = tokio::fs::File::open(&file).await?;
            let size = upload.metadata().await?.len();
            print_json(&service.upload(upload, &filename, size).await?)?;
        }
        Command::List => print_json(&service.list().await?)?,
        Command::Show { id } => print_json(&service.retrieve(parse_id(&id)?).await?)?,
        Command::Rename { id, body } => {
            let id = parse_id(&id)?;
            let request: RenameRequest = serde_json::from_str(&body)
                .map_err(|e| AppError::InvalidInput(format!("Invalid request body: {}", e)))?;
            print_json(&service.rename(id, &request.name).await?)?;
        }
        Command::ReplaceHtml { id, file } => {
            let id = parse_id(&id)?;
            let body = if file.as_os_str() == "-" {
                let mut buf = Vec::new();
                tokio::io::stdin().read_to_end(&mut buf).await?;
                buf
            } else {
                tokio::fs::read(&file).await?
            };
            service.replace_html(id, &body).await?;
        }
        Command::Delete { id } => service.delete(parse_id(&id)?).await?,
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(kind: ErrorKind) -> ExitCode {
    match kind {
        ErrorKind::InvalidInput => ExitCode::from(2),
        ErrorKind::NotFound => ExitCode::from(3),
        ErrorKind::DependencyFailure => ExitCode::from(4),
        ErrorKind::OrphanedArtifact => ExitCode::from(5),
    }
}
