//! Map validated CLI arguments to an action.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{vault, ARG_FRONTEND_BASE_URL, ARG_PORT};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let frontend_base_url = matches
        .get_one::<String>(ARG_FRONTEND_BASE_URL)
        .cloned()
        .filter(|url| !url.trim().is_empty())
        .context("missing required argument: --frontend-base-url")?;

    let vault_opts = vault::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        frontend_base_url,
        session_ttl_seconds: vault_opts.session_ttl_seconds,
        second_factor: vault_opts.second_factor,
        max_upload_bytes: vault_opts.max_upload_bytes,
        seed_demo: vault_opts.seed_demo,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::SecondFactorMode;

    #[test]
    fn handler_builds_server_action() {
        temp_env::with_vars(
            [
                ("CLOUDSHIELD_PORT", Some("9443")),
                ("CLOUDSHIELD_SECOND_FACTOR", Some("code")),
                ("CLOUDSHIELD_SEED_DEMO", None),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["cloudshield"]);
                let action = handler(&matches);
                assert!(action.is_ok());
                if let Ok(Action::Server(args)) = action {
                    assert_eq!(args.port, 9443);
                    assert_eq!(args.second_factor, SecondFactorMode::OneTimeCode);
                    assert!(!args.seed_demo);
                }
            },
        );
    }

    #[test]
    fn handler_rejects_empty_frontend_url() {
        temp_env::with_vars([("CLOUDSHIELD_FRONTEND_BASE_URL", None::<&str>)], || {
            let matches = crate::cli::commands::new().get_matches_from(vec![
                "cloudshield",
                "--frontend-base-url",
                " ",
            ]);
            let result = handler(&matches);
            assert!(result.is_err());
            if let Err(err) = result {
                assert!(err
                    .to_string()
                    .contains("missing required argument: --frontend-base-url"));
            }
        });
    }
}
