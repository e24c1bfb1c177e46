use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to the server action.
///
/// # Errors
/// Returns an error if a required argument is missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let identity_url = matches
        .get_one::<String>("identity-url")
        .cloned()
        .context("missing required argument: --identity-url")?;

    let mut globals = GlobalArgs::new(identity_url);

    let service_key = matches
        .get_one::<String>("identity-service-key")
        .cloned()
        .context("missing required argument: --identity-service-key")?;
    globals.set_service_key(SecretString::from(service_key));

    globals.relay_url = matches
        .get_one::<String>("relay-url")
        .cloned()
        .unwrap_or_default();
    globals.relay_api_key = matches
        .get_one::<String>("relay-api-key")
        .cloned()
        .map(SecretString::from);
    globals.sender_email = matches
        .get_one::<String>("sender-email")
        .cloned()
        .unwrap_or_default();
    globals.sender_name = matches
        .get_one::<String>("sender-name")
        .cloned()
        .unwrap_or_default();

    Ok(Action::Server { port, dsn, globals })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn handler_builds_server_action() {
        temp_env::with_vars([("CODEKRAFTS_RELAY_API_KEY", None::<&str>)], || {
            let command = crate::cli::commands::new();
            let matches = command.get_matches_from(vec![
                "codekrafts",
                "--dsn",
                "postgres://user@localhost:5432/codekrafts",
                "--identity-url",
                "https://identity.codekrafts.dev",
                "--identity-service-key",
                "service-key",
            ]);

            let action = handler(&matches).expect("action");
            let Action::Server { port, dsn, globals } = action;
            assert_eq!(port, 8080);
            assert_eq!(dsn, "postgres://user@localhost:5432/codekrafts");
            assert_eq!(globals.identity_url, "https://identity.codekrafts.dev");
            assert_eq!(globals.identity_service_key.expose_secret(), "service-key");
            assert!(globals.relay_api_key.is_none());
            assert_eq!(globals.sender_name, "CodeKrafts");
        });
    }
}
