use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facer_aws::{AwsSession, DynamoIdentityStore, RekognitionIndex};
use facer_core::{BatchPolicy, CollectionId, Orchestrator};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod capture;
mod config;
mod report;

use capture::CameraSource;
use config::Config;

#[derive(Parser)]
#[command(
    name = "facer",
    about = "Enroll and recognize faces with Amazon Rekognition and DynamoDB"
)]
struct Cli {
    /// The name of the AWS profile to use. Configure one with
    /// `aws configure --profile <profile_name>`.
    #[arg(
        long,
        global = true,
        env = "AWS_DEFAULT_PROFILE",
        default_value = "default",
        value_name = "AWS_PROFILE"
    )]
    profile: String,

    /// Configuration file (default: $XDG_CONFIG_HOME/facer/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sets up a collection with faces (pictures) from the local filesystem
    Setup {
        /// Name of the collection to add the faces to
        #[arg(long)]
        collection: Option<String>,
        /// Path to a directory containing the face images
        #[arg(long)]
        path: Option<PathBuf>,
        /// Continue with the remaining images when one fails
        #[arg(long)]
        keep_going: bool,
    },
    /// Captures an image from the camera and adds it to the collection
    Add {
        /// Full name of the person being added
        #[arg(long, num_args = 2, value_names = ["FIRST", "LAST"])]
        name: Option<Vec<String>>,
        /// Name of the collection to add the face to
        #[arg(long)]
        collection: Option<String>,
    },
    /// Captures an image from the camera and compares it to the faces in the collection
    Capture {
        /// Name of the collection to compare the face to
        #[arg(long)]
        collection: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Setup {
            collection,
            path,
            keep_going,
        } => {
            let collection = collection_or_prompt(collection, "Please enter the collection name")?;
            let path = match path {
                Some(path) => path,
                None => PathBuf::from(prompt("Please enter the path to the images")?),
            };
            let policy = if keep_going {
                BatchPolicy::KeepGoing
            } else {
                config.batch_policy
            };

            let orchestrator = orchestrator(&cli.profile, &config)
                .await
                .with_batch_policy(policy);
            let batch = orchestrator
                .enroll_directory(&path, &collection, &mut |event| {
                    report::setup_event(&event).print()
                })
                .await
                .with_context(|| format!("setting up collection {collection}"))?;

            if let Some(summary) = report::batch_summary(&batch) {
                summary.print();
            }
        }
        Commands::Add { name, collection } => {
            let name = match name {
                Some(parts) => parts.join(" "),
                None => prompt("Please enter the full name")?,
            };
            let collection = collection_or_prompt(collection, "Please enter the collection name")?;

            let orchestrator = orchestrator(&cli.profile, &config).await;
            let camera = CameraSource::from_config(&config);
            let outcome = orchestrator
                .capture_and_enroll(&camera, &collection, &name)
                .await
                .with_context(|| format!("adding {name} to {collection}"))?;
            report::enrolled(&outcome).print();
        }
        Commands::Capture { collection } => {
            let collection = collection_or_prompt(collection, "Please enter the collection name")?;

            let orchestrator = orchestrator(&cli.profile, &config).await;
            let camera = CameraSource::from_config(&config);
            let outcome = orchestrator
                .capture_and_recognize(&camera, &collection)
                .await
                .with_context(|| format!("recognizing against {collection}"))?;
            report::recognized(&outcome, &collection).print();
        }
    }

    Ok(())
}

async fn orchestrator(
    profile: &str,
    config: &Config,
) -> Orchestrator<RekognitionIndex, DynamoIdentityStore> {
    let session = AwsSession::load(profile, config.region.as_deref()).await;
    Orchestrator::new(
        session.rekognition(),
        session.dynamodb(config.table_options()),
    )
    .with_match_threshold(config.match_threshold)
}

fn collection_or_prompt(arg: Option<String>, label: &str) -> Result<CollectionId> {
    let name = match arg {
        Some(name) => name,
        None => prompt(label)?,
    };
    CollectionId::new(name).context("invalid collection name")
}

fn prompt(label: &str) -> Result<String> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "{label}: ")?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim();
    if value.is_empty() {
        bail!("{label}: no value given");
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_add_takes_first_and_last_name() {
        let cli = Cli::try_parse_from([
            "facer", "--profile", "ops", "add", "--name", "Ada", "Lovelace", "--collection",
            "lobby",
        ])
        .unwrap();
        assert_eq!(cli.profile, "ops");
        match cli.command {
            Commands::Add { name, collection } => {
                assert_eq!(name.unwrap().join(" "), "Ada Lovelace");
                assert_eq!(collection.as_deref(), Some("lobby"));
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_add_rejects_single_name() {
        assert!(Cli::try_parse_from(["facer", "add", "--name", "Ada", "--collection", "lobby"])
            .is_err());
    }

    #[test]
    fn test_setup_flags() {
        let cli = Cli::try_parse_from([
            "facer",
            "setup",
            "--collection",
            "lobby",
            "--path",
            "faces",
            "--keep-going",
        ])
        .unwrap();
        match cli.command {
            Commands::Setup {
                collection,
                path,
                keep_going,
            } => {
                assert_eq!(collection.as_deref(), Some("lobby"));
                assert_eq!(path, Some(PathBuf::from("faces")));
                assert!(keep_going);
            }
            _ => panic!("expected setup"),
        }
    }

    #[test]
    fn test_profile_after_subcommand() {
        let cli = Cli::try_parse_from(["facer", "capture", "--profile", "kiosk"]).unwrap();
        assert_eq!(cli.profile, "kiosk");
    }

    #[test]
    fn test_collection_name_validated() {
        assert!(collection_or_prompt(Some("front door".into()), "unused").is_err());
        assert!(collection_or_prompt(Some("lobby".into()), "unused").is_ok());
    }
}
