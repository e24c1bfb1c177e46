use secrecy::SecretString;

/// Shared configuration resolved once at startup and carried into handlers.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub identity_url: String,
    pub identity_service_key: SecretString,
    pub relay_url: String,
    pub relay_api_key: Option<SecretString>,
    pub sender_email: String,
    pub sender_name: String,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(identity_url: String) -> Self {
        Self {
            identity_url,
            identity_service_key: SecretString::default(),
            relay_url: String::new(),
            relay_api_key: None,
            sender_email: String::new(),
            sender_name: String::new(),
        }
    }

    pub fn set_service_key(&mut self, key: SecretString) {
        self.identity_service_key = key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let url = "https://identity.codekrafts.dev".to_string();
        let args = GlobalArgs::new(url);
        assert_eq!(args.identity_url, "https://identity.codekrafts.dev");
        assert_eq!(args.identity_service_key.expose_secret(), "");
        assert!(args.relay_api_key.is_none());
    }
}
