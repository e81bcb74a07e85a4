//! Command-line front end for the envelope codec. It only wraps library calls;
//! sending the request is left to whatever transport the caller uses.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use envelope_codec::crypto::literal::{decode_literal, encode_literal, LiteralError};
use envelope_codec::nonce::new_request_id_with;
use envelope_codec::{Codec, CodecConfig, CodecError, RequestOptions};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("literal error: {0}")]
    Literal(#[from] LiteralError),
    #[error("output serialization failed: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Debug, Parser)]
#[command(name = "envelope-codec", version, about = "Sign, encrypt and decrypt service payloads")]
struct Cli {
    /// JSON file overriding the compiled-in key material and options.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a signed, encrypted request envelope and print it as JSON.
    Sign {
        /// Query-string payload such as `page=1&limit=50`.
        #[arg(long)]
        data: Option<String>,
    },
    /// Decrypt a base64 response payload.
    Decrypt { ciphertext: String },
    /// Decode a digit-pair literal.
    DecodeLiteral { literal: String },
    /// Encode text as a digit-pair literal.
    EncodeLiteral { text: String },
    /// Print a fresh request id.
    RequestId,
}

fn load_config(path: Option<&PathBuf>) -> Result<CodecConfig, CodecError> {
    match path {
        Some(path) => Ok(CodecConfig::load(path)?),
        None => Ok(CodecConfig::default()),
    }
}

fn run(cli: Cli) -> Result<String, AppError> {
    let config = load_config(cli.config.as_ref())?;
    match cli.command {
        Command::Sign { data } => {
            let codec = Codec::new(&config)?;
            let options = RequestOptions {
                data,
                ..RequestOptions::default()
            };
            let envelope = codec.build_envelope(&options)?;
            Ok(serde_json::to_string_pretty(&envelope)?)
        }
        Command::Decrypt { ciphertext } => {
            let codec = Codec::new(&config)?;
            Ok(codec.decrypt(&ciphertext)?)
        }
        Command::DecodeLiteral { literal } => Ok(decode_literal(&literal)?),
        Command::EncodeLiteral { text } => Ok(encode_literal(&text)?),
        Command::RequestId => Ok(new_request_id_with(&mut rand::thread_rng(), config.nonce_variant)),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
