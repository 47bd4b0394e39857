//! Environment-driven server configuration.

use toolbridge_session::RoutingPolicy;
use toolbridge_tools::{GitHubConfig, TelegramConfig};

/// Server configuration.
///
/// Upstream credentials are optional: a missing set degrades the matching
/// tools to a not-configured error instead of failing startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Bind 0.0.0.0 instead of localhost (container deployments).
    pub bind_all: bool,
    pub routing_policy: RoutingPolicy,
    pub telegram: Option<TelegramConfig>,
    pub github: Option<GitHubConfig>,
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(name: &str) -> bool {
    env_opt(name).is_some_and(|v| {
        matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
    })
}

fn routing_policy_from(value: Option<&str>) -> RoutingPolicy {
    match value {
        Some("fallback" | "single-tenant") => RoutingPolicy::SingleTenantFallback,
        _ => RoutingPolicy::ExplicitOnly,
    }
}

impl ServerConfig {
    /// Read configuration from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let port = env_opt("PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);

        let routing_policy = routing_policy_from(env_opt("ROUTING_POLICY").as_deref());

        let telegram = match (env_opt("TELEGRAM_BOT_TOKEN"), env_opt("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
            _ => None,
        };

        let github = match (
            env_opt("GITHUB_TOKEN"),
            env_opt("GITHUB_OWNER"),
            env_opt("GITHUB_REPO"),
        ) {
            (Some(token), Some(owner), Some(repo)) => Some(GitHubConfig { token, owner, repo }),
            _ => None,
        };

        Self {
            port,
            bind_all: env_flag("BIND_ALL") || env_flag("DOCKER_ENV"),
            routing_policy,
            telegram,
            github,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_policy_defaults_to_explicit() {
        assert_eq!(routing_policy_from(None), RoutingPolicy::ExplicitOnly);
        assert_eq!(
            routing_policy_from(Some("explicit")),
            RoutingPolicy::ExplicitOnly
        );
        assert_eq!(
            routing_policy_from(Some("fallback")),
            RoutingPolicy::SingleTenantFallback
        );
        assert_eq!(
            routing_policy_from(Some("single-tenant")),
            RoutingPolicy::SingleTenantFallback
        );
    }
}
