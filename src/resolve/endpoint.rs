//! Endpoint resolution
//!
//! Artifacts are authored once against a loopback address but executed on a
//! bare host, inside a container next to the service, or in CI with an
//! explicit base URL. The resolver rewrites the declared URL's authority so
//! the artifact never has to be edited.

use reqwest::Url;

use crate::common::config::TargetConfig;
use crate::common::paths;

/// Hosts treated as "this machine"
const LOOPBACK_HOSTS: &[&str] = &["127.0.0.1", "localhost"];

/// Rewrites declared URLs for the current execution environment
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    base_override: Option<Url>,
    in_container: bool,
    container_host: String,
}

impl EndpointResolver {
    /// Build a resolver; an unparseable override is ignored with a warning
    pub fn new(base_override: Option<&str>, in_container: bool, container_host: &str) -> Self {
        let base_override = base_override.and_then(|raw| match Url::parse(raw.trim()) {
            Ok(url) if url.has_host() => Some(url),
            Ok(_) | Err(_) => {
                tracing::warn!(base_url = raw, "Ignoring base URL override without a valid host");
                None
            }
        });

        Self {
            base_override,
            in_container,
            container_host: container_host.to_string(),
        }
    }

    /// Build a resolver from target configuration, probing the container marker
    pub fn from_config(target: &TargetConfig) -> Self {
        let in_container = paths::running_in_container(&target.container_marker);
        if in_container {
            tracing::debug!(
                host = %target.container_host,
                "Container detected; loopback URLs will be rewritten"
            );
        }
        Self::new(
            target.base_url.as_deref(),
            in_container,
            &target.container_host,
        )
    }

    /// The URL to actually dial for a declared URL
    ///
    /// URLs needing no rewrite, and unparseable ones, are returned unchanged.
    pub fn resolve(&self, declared: &str) -> String {
        let declared = declared.trim();
        let Ok(url) = Url::parse(declared) else {
            return declared.to_string();
        };

        if let Some(base) = &self.base_override {
            let mut rewritten = base.clone();
            rewritten.set_path(url.path());
            rewritten.set_query(url.query());
            rewritten.set_fragment(url.fragment());
            return rewritten.to_string();
        }

        if self.in_container {
            let is_loopback = url
                .host_str()
                .is_some_and(|host| LOOPBACK_HOSTS.contains(&host));
            if is_loopback {
                let mut rewritten = url.clone();
                if rewritten.set_host(Some(&self.container_host)).is_ok() {
                    return rewritten.to_string();
                }
            }
        }

        declared.to_string()
    }
}
