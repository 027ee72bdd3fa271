use url::Url;

use crate::error::{ModelError, ModelResult};

pub const BASE_URL: &str = "https://api.openai.com/";
pub const USER_AGENT: &str = "goppy/1.0";
pub const DEFAULT_API_VERSION: &str = "v1";

pub const API_KEY_ENV: &str = "OPEN_AI_API_KEY";
pub const PROJECT_ID_ENV: &str = "OPEN_AI_PROJECT_ID";
pub const ORGANIZATION_ID_ENV: &str = "OPEN_AI_ORGANIZATION_ID";

/// Resolved client configuration. Built once and read-only afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    api_version: String,
    api_key: String,
    project_id: String,
    org_id: String,
    base_url: String,
    user_agent: String,
}

impl ClientConfig {
    /// Resolve each field from the explicit argument, then the process
    /// environment. Empty strings count as absent.
    pub fn resolve(
        api_version: Option<&str>,
        api_key: Option<&str>,
        project_id: Option<&str>,
        org_id: Option<&str>,
    ) -> ModelResult<Self> {
        Self::resolve_with(api_version, api_key, project_id, org_id, |name| {
            std::env::var(name).ok()
        })
    }

    /// Same as [`ClientConfig::resolve`] with an injectable env lookup.
    pub fn resolve_with<F>(
        api_version: Option<&str>,
        api_key: Option<&str>,
        project_id: Option<&str>,
        org_id: Option<&str>,
        env_lookup: F,
    ) -> ModelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_version = non_empty(api_version).unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let api_key = non_empty(api_key)
            .or_else(|| non_empty(env_lookup(API_KEY_ENV).as_deref()))
            .ok_or(ModelError::MissingApiKey)?;
        let project_id = non_empty(project_id)
            .or_else(|| env_lookup(PROJECT_ID_ENV))
            .unwrap_or_default();
        let org_id = non_empty(org_id)
            .or_else(|| env_lookup(ORGANIZATION_ID_ENV))
            .unwrap_or_default();

        Ok(Self {
            api_version,
            api_key,
            project_id,
            org_id,
            base_url: BASE_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
        })
    }

    /// Point the client at another host, e.g. a proxy or a mock server.
    /// A missing trailing slash is added so the version joins cleanly.
    pub fn with_base_url(mut self, base_url: &str) -> ModelResult<Self> {
        let parsed = Url::parse(base_url)?;
        let mut base = parsed.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        self.base_url = base;
        Ok(self)
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// `base_url` joined with the API version, without a trailing slash.
    pub fn api_url(&self) -> String {
        format!("{}{}", self.base_url, self.api_version)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_version", &self.api_version)
            .field("api_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("org_id", &self.org_id)
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
