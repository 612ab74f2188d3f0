// Entrypoint for the CLI application.
// - Parses arguments, sets up logging and loads settings.
// - Without a subcommand it hands over to the interactive menu.

use anyhow::Context;
use clap::{Parser, Subcommand};
use hfbackup_cli::files::{files_with_extension, FileSelection, SelectedFile};
use hfbackup_cli::form::{FormValues, UploadForm};
use hfbackup_cli::hub::HubClient;
use hfbackup_cli::settings::Settings;
use hfbackup_cli::ui::{main_menu, run_verify, LogWriter};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Back up model files to the Hugging Face Hub")]
struct Args {
    /// How verbose the output should be, can be set up to 3 times. Has no effect if RUST_LOG is set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file to use instead of the one in the config directory
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive menu (the default)
    Menu,
    /// Upload files once and exit
    Upload {
        /// Hugging Face username, defaults to the stored one
        #[arg(short, long)]
        username: Option<String>,

        /// Repository name, defaults to the stored one
        #[arg(short, long)]
        repository: Option<String>,

        /// Write key, falls back to HF_TOKEN or the stored key when empty
        #[arg(short, long, default_value = "")]
        write_key: String,

        /// Also upload every `*.<type>` file in this directory
        #[arg(long)]
        dir: Option<PathBuf>,

        /// File type used with --dir
        #[arg(long = "type", default_value = "safetensors")]
        file_type: String,

        /// Files to upload
        files: Vec<PathBuf>,
    },
    /// Check settings and the stored write key
    Verify,
}

fn tracing_init(args: &Args) {
    let filter = EnvFilter::builder()
        .with_default_directive(
            match args.verbose {
                0 => "hfbackup_cli=info",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
            .parse()
            .expect("static filter directive"),
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(LogWriter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_init(&args);

    let settings_path = args.settings.clone().unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load_from(&settings_path)?;
    settings.apply_env();
    debug!(?settings, path = %settings_path.display(), "loaded settings");

    let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    match args.command.unwrap_or(Command::Menu) {
        Command::Menu => main_menu(&rt, settings, &settings_path)?,
        Command::Upload {
            username,
            repository,
            write_key,
            dir,
            file_type,
            files,
        } => {
            let mut selection = FileSelection::from_paths(files);
            if let Some(dir) = dir {
                for path in files_with_extension(&dir, &file_type) {
                    selection.push(SelectedFile::new(path));
                }
            }
            let fields = FormValues {
                username: username.unwrap_or_else(|| settings.default_username.clone()),
                repository: repository.unwrap_or_else(|| settings.default_repo.clone()),
                write_key,
                files: selection,
            };
            let form = UploadForm::new(HubClient::new(settings)?);
            rt.block_on(form.submit(&fields));
        }
        Command::Verify => {
            if !run_verify(&rt, &settings, &settings_path)? {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
