use tempadmin_core::{AppError, AppResult};
use url::Url;

/// Builds approval link URLs under a public base URL.
#[derive(Debug, Clone)]
pub struct ApprovalLinkBuilder {
    base: Url,
}

impl ApprovalLinkBuilder {
    /// Parses the public base URL of the approval endpoint.
    pub fn new(public_base_url: &str) -> AppResult<Self> {
        let mut base = Url::parse(public_base_url).map_err(|error| {
            AppError::validation(format!(
                "public base url '{public_base_url}' is invalid: {error}"
            ))
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(path.as_str());
        }

        Ok(Self { base })
    }

    /// Returns `<base>/approval?token=<token>`.
    pub fn link(&self, token: &str) -> AppResult<String> {
        let mut link = self
            .base
            .join("approval")
            .map_err(|error| {
                AppError::Internal(format!("failed to build approval link: {error}"))
            })?;
        link.query_pairs_mut().append_pair("token", token);
        Ok(link.into())
    }
}
