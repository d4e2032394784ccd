use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cloudinary_signed_upload::client::{
    destroy, DestroyOutcome, HttpSignatureClient, UploadPayload, Uploader,
};
use cloudinary_signed_upload::endpoint::{server, SigningEndpoint};
use cloudinary_signed_upload::models::Config;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "signed-upload")]
#[command(about = "Signed direct uploads to Cloudinary")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the signing endpoint.
    Serve {
        /// Address to bind, overrides SIGNING_BIND_ADDR.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Upload a file through the signing endpoint.
    Upload {
        #[arg(value_name = "PATH")]
        path: PathBuf,
        #[arg(long)]
        preset: Option<String>,
        #[arg(long)]
        folder: Option<String>,
    },
    /// Delete an uploaded asset by its public id.
    Destroy {
        #[arg(value_name = "PUBLIC_ID")]
        public_id: String,
    },
}

fn read_payload(path: &Path) -> Result<UploadPayload> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(UploadPayload::data_uri_from_bytes(&data))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloudinary_signed_upload=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();
    let config = Config::from_env()?;

    let outcome = match args.command {
        Command::Serve { bind } => {
            let bind_addr = bind.unwrap_or(config.bind_addr);
            server::run(&bind_addr, SigningEndpoint::new(config.signing)).await
        }
        Command::Upload {
            path,
            preset,
            folder,
        } => {
            let mut client = config.client;
            client.upload_preset = preset.or(client.upload_preset);
            client.folder = folder.or(client.folder);

            Uploader::with_remote_signing(client, read_payload(&path)?)
                .on_progress(|percent| info!("Upload progress: {}%", percent))
                .start()
                .await
                .map(|response| {
                    println!(
                        "{}",
                        response.secure_url.unwrap_or(response.public_id)
                    );
                })
        }
        Command::Destroy { public_id } => {
            let signer = HttpSignatureClient::new(config.client.signature_url.clone());
            destroy(&reqwest::Client::new(), &config.client, &signer, &public_id)
                .await
                .map(|outcome| match outcome {
                    DestroyOutcome::Skipped(reason) => println!("{}", reason),
                    DestroyOutcome::Requested(id) => println!("{}", id),
                })
        }
    };

    if let Err(e) = outcome {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
