//! Vault behaviour: sessions, second factor, uploads and demo seeding.

use crate::vault::SecondFactorMode;
use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};

pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SECOND_FACTOR: &str = "second-factor";
pub const ARG_MAX_UPLOAD_BYTES: &str = "max-upload-bytes";
pub const ARG_SEED_DEMO: &str = "seed-demo";

#[derive(Debug)]
pub struct Options {
    pub session_ttl_seconds: u64,
    pub second_factor: SecondFactorMode,
    pub max_upload_bytes: usize,
    pub seed_demo: bool,
}

impl Options {
    /// Parse vault arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a value is missing or not recognised.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let session_ttl_seconds = matches
            .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .ok_or_else(|| anyhow!("missing required argument: --{ARG_SESSION_TTL_SECONDS}"))?;

        let second_factor = matches
            .get_one::<String>(ARG_SECOND_FACTOR)
            .map_or(Ok(SecondFactorMode::default()), |mode| {
                mode.parse::<SecondFactorMode>()
            })
            .map_err(|err| anyhow!(err))?;

        let max_upload_bytes = matches
            .get_one::<usize>(ARG_MAX_UPLOAD_BYTES)
            .copied()
            .ok_or_else(|| anyhow!("missing required argument: --{ARG_MAX_UPLOAD_BYTES}"))?;

        Ok(Self {
            session_ttl_seconds,
            second_factor,
            max_upload_bytes,
            seed_demo: matches.get_flag(ARG_SEED_DEMO),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session TTL in seconds")
                .env("CLOUDSHIELD_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SECOND_FACTOR)
                .long(ARG_SECOND_FACTOR)
                .help("Second factor verifier: placeholder accepts any code, code sends a one-time code")
                .env("CLOUDSHIELD_SECOND_FACTOR")
                .default_value("placeholder")
                .value_parser(["placeholder", "code"]),
        )
        .arg(
            Arg::new(ARG_MAX_UPLOAD_BYTES)
                .long(ARG_MAX_UPLOAD_BYTES)
                .help("Maximum size of an upload request body in bytes")
                .env("CLOUDSHIELD_MAX_UPLOAD_BYTES")
                .default_value("26214400")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new(ARG_SEED_DEMO)
                .long(ARG_SEED_DEMO)
                .help("Register the demo operator cyber_ninja with two sample files")
                .env("CLOUDSHIELD_SEED_DEMO")
                .action(ArgAction::SetTrue),
        )
}
