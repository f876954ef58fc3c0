use std::path::Path;

use config::{Config, File, FileFormat};
use eyre::{Context, Result};

use crate::config::{models::ProxyConfig, validation::ProxyConfigValidator};

/// Load the declarative document using the config crate
/// Supports multiple formats: YAML, JSON, TOML, etc.
pub async fn load_config(config_path: &str) -> Result<ProxyConfig> {
    load_config_sync(config_path)
}

/// Load and validate the document synchronously
pub fn load_config_sync(config_path: &str) -> Result<ProxyConfig> {
    let config = parse_config_sync(config_path)?;

    ProxyConfigValidator::validate(&config)
        .with_context(|| format!("Invalid configuration in {config_path}"))?;

    Ok(config)
}

/// Parse the document without validation (used for the validate command)
pub fn parse_config_sync(config_path: &str) -> Result<ProxyConfig> {
    let config_path = Path::new(config_path);

    // Determine file format based on extension
    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        _ => FileFormat::Toml, // Default to TOML
    };

    let settings = Config::builder()
        .add_source(File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            format,
        ))
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let proxy_config: ProxyConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    Ok(proxy_config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[tokio::test]
    async fn test_load_toml_config() {
        let toml_content = r#"
name = "edge"

[[listeners]]
name = "ingress"
address = "0.0.0.0"
port = 10000
routes = ["api"]

[[routes]]
name = "api"
prefix = "/"
cluster_header = "x-route"

[[clusters]]
name = "svc-a"
use_tls = true
discovery_kind = "logical_dns"

[[clusters.endpoints]]
host = "svc-a.internal"
port = 443
"#;

        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.name, "edge");
        assert_eq!(config.listeners.len(), 1);
        assert_eq!(config.clusters[0].endpoints[0].port, 443);
    }

    #[tokio::test]
    async fn test_load_yaml_config_with_authorization() {
        let yaml_content = r#"
name: edge
listeners:
  - name: ingress
    address: 0.0.0.0
    port: 10000
    routes: [api]
routes:
  - name: api
    prefix: /
    cluster: svc-a
clusters:
  - name: svc-a
    discovery_kind: strict_dns
    endpoints:
      - host: svc-a.internal
        port: 8080
authorization:
  owner: edge
  routes:
    - cluster: svc-a
      required_token: abc
      outgoing_token: xyz
"#;

        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        let authorization = config.authorization.unwrap();
        assert_eq!(authorization.routes[0].required_token, "abc");
        assert_eq!(
            authorization.routes[0].outgoing_token.as_deref(),
            Some("xyz")
        );
    }

    #[tokio::test]
    async fn test_unknown_discovery_kind_fails() {
        let toml_content = r#"
[[clusters]]
name = "svc-a"
discovery_kind = "multicast"

[[clusters.endpoints]]
host = "svc-a.internal"
port = 443
"#;

        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let result = load_config(temp_file.path().to_str().unwrap()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_by_validation() {
        // Listener references a route that is never defined.
        let toml_content = r#"
[[listeners]]
name = "ingress"
address = "0.0.0.0"
port = 10000
routes = ["missing"]
"#;

        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let result = load_config(temp_file.path().to_str().unwrap()).await;
        assert!(result.is_err());
    }
}
