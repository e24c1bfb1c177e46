use crate::{api, cli::actions::Action};
use anyhow::{ensure, Result};
use url::Url;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server { port, dsn, globals } => {
            // Fail fast on malformed endpoints instead of at first use.
            let dsn = Url::parse(&dsn)?;
            let identity = Url::parse(&globals.identity_url)?;
            ensure!(
                identity.scheme() == "http" || identity.scheme() == "https",
                "identity URL must be http(s), got {}",
                identity.scheme()
            );

            api::new(port, dsn.to_string(), globals).await?;
        }
    }

    Ok(())
}
