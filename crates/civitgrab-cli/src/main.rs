//! civitgrab - fetch Civitai models into a local library and keep the
//! InvokeAI import catalog in sync.

use anyhow::{bail, Result};
use civitgrab_core::{
    delete_model, load_jobs, run_batch, CivitClient, ClientConfig, GrabJob, GrabOptions, Grabber,
    Reconciler,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "civitgrab")]
#[command(about = "Download Civitai models and maintain an InvokeAI models.yaml")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download a model (or every model of a .yml batch file)
    Grab(GrabArgs),

    /// Merge every invokeImport.yml under a folder into a catalog file
    Collect {
        /// Folder searched recursively for fragments
        root_folder: PathBuf,

        /// Existing catalog file to update
        target_file: PathBuf,
    },

    /// Delete a downloaded model and its catalog entries
    Delete {
        /// Model URL or id
        input: String,

        /// Library root the model was downloaded into
        #[arg(long, default_value = ".")]
        root_folder: PathBuf,

        /// Catalog file to remove the model's entries from
        #[arg(long)]
        target_file: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct GrabArgs {
    /// Model URL, id, `id:version` or path to a .yml batch file
    input: String,

    /// Library root
    #[arg(short, long, default_value = ".")]
    output_root: PathBuf,

    /// Version to download instead of the default generation's
    #[arg(long)]
    version_id: Option<u64>,

    /// Name to use instead of the model's own
    #[arg(long)]
    name: Option<String>,

    /// Mark the model as NSFW in file and catalog names
    #[arg(long)]
    nsfw: bool,

    /// Do not append the creator's username to the model name
    #[arg(long)]
    no_author_name: bool,

    /// Do not prefix LoRA names with their category tag
    #[arg(long)]
    no_lora_type: bool,

    /// Rewrite invokeImport.yml even when nothing was downloaded
    #[arg(long)]
    force_catalog: bool,

    /// Check downloaded files against their published SHA256
    #[arg(long)]
    verify_hashes: bool,

    /// Civitai API token
    #[arg(long, env = "CIVITAI_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

impl GrabArgs {
    fn options(&self) -> GrabOptions {
        GrabOptions {
            output_root: self.output_root.clone(),
            append_author_name: !self.no_author_name,
            prepend_lora_type: !self.no_lora_type,
            force_catalog: self.force_catalog,
            verify_hashes: self.verify_hashes,
            ..Default::default()
        }
    }

    fn job(&self) -> GrabJob {
        GrabJob {
            input: self.input.clone(),
            version_id: self.version_id,
            name: self.name.clone(),
            nsfw: self.nsfw,
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();
}

async fn grab(args: GrabArgs) -> Result<()> {
    let client = CivitClient::with_config(ClientConfig::default().with_token(args.token.clone()))?;
    let grabber = Grabber::new(client, args.options());

    let jobs = load_jobs(args.job()).await?;
    let report = run_batch(&grabber, jobs).await;

    if report.failed() > 0 {
        bail!("{} of {} jobs failed", report.failed(), report.outcomes.len());
    }
    Ok(())
}

fn collect(root_folder: PathBuf, target_file: PathBuf) -> Result<()> {
    let report = Reconciler::new(root_folder, target_file).run()?;
    if !report.written {
        info!("Nothing to do");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli.command {
        Command::Grab(args) => grab(args).await,
        Command::Collect {
            root_folder,
            target_file,
        } => collect(root_folder, target_file),
        Command::Delete {
            input,
            root_folder,
            target_file,
        } => {
            delete_model(&input, &root_folder, target_file.as_deref())?;
            Ok(())
        }
    }
}
