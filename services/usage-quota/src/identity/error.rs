use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("No credentials found in request")]
    MissingCredentials,

    #[error("Resolved identity is empty")]
    EmptyIdentity,

    #[error("Hub rejected token (status {0})")]
    Rejected(u16),

    #[error("Hub unreachable: {0}")]
    HubUnreachable(String),

    #[error("Unexpected hub response: {0}")]
    InvalidHubResponse(String),
}

impl IdentityError {
    /// The hub could not answer, as opposed to the request carrying bad credentials.
    pub fn is_hub_outage(&self) -> bool {
        matches!(
            self,
            IdentityError::HubUnreachable(_) | IdentityError::InvalidHubResponse(_)
        )
    }
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            IdentityError::InvalidHubResponse(err.to_string())
        } else {
            IdentityError::HubUnreachable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outages_are_told_apart_from_bad_credentials() {
        assert!(IdentityError::HubUnreachable("connection refused".into()).is_hub_outage());
        assert!(IdentityError::InvalidHubResponse("hub responded with 502".into()).is_hub_outage());

        assert!(!IdentityError::MissingCredentials.is_hub_outage());
        assert!(!IdentityError::EmptyIdentity.is_hub_outage());
        assert!(!IdentityError::Rejected(403).is_hub_outage());
    }
}
