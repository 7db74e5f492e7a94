use clap::{Args, Subcommand};

use crate::config::{AppConfig, OAuthApp};
use crate::domain::repository::ScmProviderKind;
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Show the effective configuration (secrets masked).
    Show,
}

pub fn run(config: &AppConfig, command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Show => {
            for line in render(config) {
                println!("{line}");
            }
            Ok(())
        }
    }
}

fn render(config: &AppConfig) -> Vec<String> {
    let mut lines = vec![
        format!("Octane URL: {}", display_value(&config.octane.url)),
        format!(
            "Octane branch support: {}",
            if config.octane.supports_branches { "enabled" } else { "disabled" }
        ),
    ];
    if config.octane.shared_spaces.is_empty() {
        lines.push("Octane shared spaces: <not set>".to_string());
    }
    for space in &config.octane.shared_spaces {
        lines.push(format!(
            "Octane shared space {}: user {}, password {}",
            space.id,
            space.user,
            mask_secret(&Some(space.password.clone()))
        ));
    }

    for provider in ScmProviderKind::ALL {
        match config.oauth_app(provider) {
            Some(app) => push_oauth(&mut lines, provider, app),
            None => lines.push(format!(
                "{provider} access token: {}",
                mask_secret(&config.bitbucket_server_token)
            )),
        }
        let paging = config.paging.for_provider(provider);
        let repositories = config.repositories.for_provider(provider);
        lines.push(format!(
            "{provider} repositories: {}",
            if repositories.is_empty() {
                "<not set>".to_string()
            } else {
                repositories.join(", ")
            }
        ));
        lines.push(format!(
            "{provider} page size: {}, order: {}",
            paging.page_size,
            display_value(&paging.order)
        ));
    }
    lines
}

fn push_oauth(lines: &mut Vec<String>, provider: ScmProviderKind, app: &OAuthApp) {
    lines.push(format!("{provider} client id: {}", display_value(&app.client_id)));
    lines.push(format!(
        "{provider} client secret: {}",
        mask_secret(&app.client_secret)
    ));
    if provider == ScmProviderKind::GithubCloud {
        lines.push(format!(
            "{provider} redirect URI: {}",
            display_value(&app.redirect_uri)
        ));
    }
}

fn display_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<not set>".to_string())
}

fn mask_secret(value: &Option<String>) -> String {
    match value {
        Some(token) if token.chars().count() > 6 => {
            let chars: Vec<char> = token.chars().collect();
            let prefix: String = chars[..3].iter().collect();
            let suffix: String = chars[chars.len() - 3..].iter().collect();
            format!("{prefix}***{suffix}")
        }
        Some(token) if !token.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn masks_secrets() {
        assert_eq!(mask_secret(&Some("abcdefghij".into())), "abc***hij");
        assert_eq!(mask_secret(&Some("short".into())), "***");
        assert_eq!(mask_secret(&None), "<not set>");
    }

    #[test]
    fn rendered_config_never_shows_secrets() {
        let vars = HashMap::from([
            ("OCTANE_URL", "https://octane.example.com/ui/"),
            ("OCTANE_SHARED_SPACES", "1001"),
            ("OCTANE_USERS", "ci"),
            ("OCTANE_PASSWORDS", "very-secret-password"),
            ("GITHUB_CLOUD_CLIENT_SECRET", "github-client-secret"),
            ("BITBUCKET_SERVER_PERSONAL_ACCESS_TOKEN", "server-token-value"),
            ("GITHUB_CLOUD_REPOSITORIES", "https://github.com/o/r.git"),
        ]);
        let config = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        let output = render(&config).join("\n");

        assert!(!output.contains("very-secret-password"));
        assert!(!output.contains("github-client-secret"));
        assert!(!output.contains("server-token-value"));
        assert!(output.contains("Octane shared space 1001: user ci, password ver***ord"));
        assert!(output.contains("GitHub Cloud repositories: https://github.com/o/r.git"));
        assert!(output.contains("Bitbucket Server page size: 1000, order: MODIFICATION"));
    }
}
