use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use thiserror::Error;
use zarr_checksum::errors::S3Error;
use zarr_checksum::sources::local::DEFAULT_THREADS;
use zarr_checksum::{
    ChecksumError, DigestReport, LocalOptions, LocalZarr, S3Credentials, S3Options, S3Url,
    S3Zarr, ZarrChecksumTree,
};

/// Compute the Dandi Zarr checksum of a local directory or S3 prefix
#[derive(Clone, Debug, Eq, Parser, PartialEq)]
#[command(version)]
struct Arguments {
    /// Set logging level
    #[arg(
        short,
        long,
        default_value = "WARN",
        value_name = "OFF|ERROR|WARN|INFO|DEBUG|TRACE"
    )]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Eq, PartialEq, Subcommand)]
enum Command {
    /// Checksum a Zarr directory on the local filesystem
    Local {
        /// Number of worker threads to use; 1 walks the directory
        /// sequentially
        #[arg(short = 'J', long, default_value_t = DEFAULT_THREADS)]
        threads: NonZeroUsize,

        /// Also print the checksum of every directory as a tree
        #[arg(long)]
        tree: bool,

        dirpath: PathBuf,
    },
    /// Checksum a Zarr stored under an s3://bucket/prefix URL
    Remote {
        /// Base URL of an S3-compatible service to use instead of AWS
        #[arg(long, value_name = "URL")]
        endpoint_url: Option<String>,

        /// AWS region of the bucket
        #[arg(long, default_value = "us-east-1")]
        region: String,

        /// Timeout in seconds for each listing request
        #[arg(long, default_value_t = 60, value_name = "SECS")]
        timeout: u64,

        /// AWS access key ID for signing requests
        #[arg(long, env = "AWS_ACCESS_KEY_ID", value_name = "KEY")]
        access_key_id: Option<String>,

        /// AWS secret access key for signing requests
        #[arg(
            long,
            env = "AWS_SECRET_ACCESS_KEY",
            hide_env_values = true,
            value_name = "SECRET"
        )]
        secret_access_key: Option<String>,

        /// AWS session token for temporary credentials
        #[arg(
            long,
            env = "AWS_SESSION_TOKEN",
            hide_env_values = true,
            value_name = "TOKEN"
        )]
        session_token: Option<String>,

        /// Send anonymous requests even if credentials are available
        #[arg(long)]
        no_sign_request: bool,

        /// Also print the checksum of every directory as a tree
        #[arg(long)]
        tree: bool,

        url: String,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Failed to initialize logging: {0}")]
    Logging(#[from] log::SetLoggerError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error("Both an access key ID and a secret access key are required for signing requests")]
    PartialCredentials,

    #[error(transparent)]
    S3(#[from] S3Error),

    #[error(transparent)]
    Checksum(#[from] ChecksumError),
}

fn main() -> ExitCode {
    let args = Arguments::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("zarrsum: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Arguments) -> Result<(), CliError> {
    init_logging(args.log_level)?;
    let (tree, show_tree) = match args.command {
        Command::Local {
            threads,
            tree,
            dirpath,
        } => {
            let zarr = LocalZarr::new(dirpath).map_err(ChecksumError::from)?;
            (zarr.checksum_tree(LocalOptions { threads })?, tree)
        }
        Command::Remote {
            endpoint_url,
            region,
            timeout,
            access_key_id,
            secret_access_key,
            session_token,
            no_sign_request,
            tree,
            url,
        } => {
            let url = url.parse::<S3Url>()?;
            let credentials = if no_sign_request {
                None
            } else {
                credentials(access_key_id, secret_access_key, session_token)?
            };
            let opts = S3Options {
                endpoint_url,
                region,
                timeout: Duration::from_secs(timeout),
                credentials,
            };
            (remote_checksum_tree(url, opts)?, tree)
        }
    };
    if show_tree {
        let report = DigestReport::from_tree(tree).map_err(ChecksumError::from)?;
        println!("{}", report.checksum());
        print!("{report}");
    } else {
        let checksum = tree.process().map_err(ChecksumError::from)?;
        println!("{checksum}");
    }
    Ok(())
}

fn credentials(
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    session_token: Option<String>,
) -> Result<Option<S3Credentials>, CliError> {
    match (access_key_id, secret_access_key) {
        (Some(access_key_id), Some(secret_access_key)) => Ok(Some(S3Credentials {
            access_key_id,
            secret_access_key,
            session_token,
        })),
        (None, None) => Ok(None),
        _ => Err(CliError::PartialCredentials),
    }
}

fn remote_checksum_tree(url: S3Url, opts: S3Options) -> Result<ZarrChecksumTree, CliError> {
    let zarr = S3Zarr::new(url, opts)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    Ok(runtime.block_on(zarr.checksum_tree())?)
}

fn init_logging(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{:<5}] {}: {message}",
                record.level(),
                record.target(),
            ));
        })
        .level(level)
        .chain(io::stderr())
        .apply()
}
