use std::net::SocketAddr;

use serde::Deserialize;

/// Service configuration, layered from environment variables with the
/// `WHITELIST` prefix via `config::Environment`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Listen address for the HTTP API.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// S3 bucket holding whitelist CSV blobs.
    pub s3_bucket_name: String,

    /// DynamoDB table for Merkle root rows.
    pub dynamodb_roots_table_name: String,

    /// DynamoDB table for Merkle proof rows.
    pub dynamodb_proofs_table_name: String,

    /// Authorized-group configuration, one entry per route group
    ///. An empty list leaves the group open, matching
    /// the upstream system's default-open behavior where no groups
    /// are configured.
    #[serde(default)]
    pub authorized_groups: AuthorizedGroupsConfig,

    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,

    /// HMAC secret used to verify the `groups` claim on bearer JWTs.
    /// Required only when at least one `authorized_groups` list is
    /// non-empty.
    #[serde(default)]
    pub jwt_secret: Option<String>,
}

fn default_listen_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().unwrap()
}

/// One `AUTHORIZED_GROUPS_*` entry per gated route group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizedGroupsConfig {
    #[serde(default)]
    pub upload_whitelist: Vec<String>,
    #[serde(default)]
    pub delete_whitelist: Vec<String>,
    #[serde(default)]
    pub create_tree: Vec<String>,
    #[serde(default)]
    pub delete_tree: Vec<String>,
    #[serde(default)]
    pub read_root: Vec<String>,
    #[serde(default)]
    pub read_roots: Vec<String>,
    #[serde(default)]
    pub read_proof: Vec<String>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allow_all_origins: bool,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_allowed_methods")]
    pub allowed_methods: Vec<String>,
    #[serde(default = "default_allowed_headers")]
    pub allowed_headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_all_origins: false,
            allowed_origins: Vec::new(),
            allowed_methods: default_allowed_methods(),
            allowed_headers: default_allowed_headers(),
        }
    }
}

fn default_allowed_methods() -> Vec<String> {
    vec![
        "GET".to_string(),
        "POST".to_string(),
        "PUT".to_string(),
        "DELETE".to_string(),
        "OPTIONS".to_string(),
    ]
}

fn default_allowed_headers() -> Vec<String> {
    vec!["Authorization".to_string(), "Content-Type".to_string()]
}

/// Load configuration from an optional file plus `WHITELIST__`-prefixed
/// environment variables, refusing to start on a missing required field.
pub fn load_config(path: Option<&str>) -> eyre::Result<AppConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path));
    }
    let config = builder
        .add_source(config::Environment::with_prefix("WHITELIST").separator("__"))
        .build()?
        .try_deserialize()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_bucket_name_fails_to_load() {
        std::env::remove_var("WHITELIST__S3_BUCKET_NAME");
        std::env::remove_var("WHITELIST__DYNAMODB_ROOTS_TABLE_NAME");
        std::env::remove_var("WHITELIST__DYNAMODB_PROOFS_TABLE_NAME");
        assert!(load_config(None).is_err());
    }

    #[test]
    fn loads_from_environment_with_prefix() {
        std::env::set_var("WHITELIST__S3_BUCKET_NAME", "my-whitelist-bucket");
        std::env::set_var("WHITELIST__DYNAMODB_ROOTS_TABLE_NAME", "whitelist-roots");
        std::env::set_var("WHITELIST__DYNAMODB_PROOFS_TABLE_NAME", "whitelist-proofs");
        let config = load_config(None).unwrap();
        assert_eq!(config.s3_bucket_name, "my-whitelist-bucket");
        std::env::remove_var("WHITELIST__S3_BUCKET_NAME");
        std::env::remove_var("WHITELIST__DYNAMODB_ROOTS_TABLE_NAME");
        std::env::remove_var("WHITELIST__DYNAMODB_PROOFS_TABLE_NAME");
    }
}
