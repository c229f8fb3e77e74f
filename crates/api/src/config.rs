use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the deploy block have sensible defaults suitable for
/// local development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). Does not apply to
    /// the live log channel, which outlives any single-request timeout.
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    /// Deployment target settings.
    pub deploy: DeployConfig,
}

/// Where and how build tasks run, and where their artifacts land.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Domain suffix for derived deploy URLs (`https://{project}.{domain}`).
    pub app_domain: String,
    /// Bucket holding published sites and archived build logs.
    pub bucket: String,
    /// Log group the build task definition writes to.
    pub log_group: String,
    /// Orchestrator cluster the build tasks run on.
    pub cluster: String,
    /// Task definition reference for the build task.
    pub task_definition: String,
    /// Container within the task definition that receives env overrides.
    pub container_name: String,
    /// Subnets for task network placement.
    pub subnets: Vec<String>,
    /// Security groups for task network placement.
    pub security_groups: Vec<String>,
    /// Whether build tasks get a public IP.
    pub assign_public_ip: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            deploy: DeployConfig::from_env(),
        }
    }
}

impl DeployConfig {
    /// Load deployment settings from environment variables.
    ///
    /// | Env Var                | Required | Default           |
    /// |------------------------|----------|-------------------|
    /// | `APP_DOMAIN`           | **yes**  | --                |
    /// | `DEPLOY_BUCKET`        | **yes**  | --                |
    /// | `ECS_CLUSTER`          | **yes**  | --                |
    /// | `ECS_SUBNETS`          | **yes**  | -- (comma list)   |
    /// | `ECS_SECURITY_GROUPS`  | **yes**  | -- (comma list)   |
    /// | `BUILD_LOG_GROUP`      | no       | `/slipway/builds` |
    /// | `ECS_TASK_DEFINITION`  | no       | `slipway-builder` |
    /// | `BUILD_CONTAINER_NAME` | no       | `builder`         |
    /// | `ASSIGN_PUBLIC_IP`     | no       | `true`            |
    ///
    /// # Panics
    ///
    /// Panics when a required variable is missing -- deployment cannot
    /// work without a target, so fail at startup.
    pub fn from_env() -> Self {
        let app_domain =
            std::env::var("APP_DOMAIN").expect("APP_DOMAIN must be set in the environment");
        let bucket =
            std::env::var("DEPLOY_BUCKET").expect("DEPLOY_BUCKET must be set in the environment");
        let cluster =
            std::env::var("ECS_CLUSTER").expect("ECS_CLUSTER must be set in the environment");

        let subnets = split_list(
            &std::env::var("ECS_SUBNETS").expect("ECS_SUBNETS must be set in the environment"),
        );
        let security_groups = split_list(
            &std::env::var("ECS_SECURITY_GROUPS")
                .expect("ECS_SECURITY_GROUPS must be set in the environment"),
        );

        let log_group =
            std::env::var("BUILD_LOG_GROUP").unwrap_or_else(|_| "/slipway/builds".into());
        let task_definition =
            std::env::var("ECS_TASK_DEFINITION").unwrap_or_else(|_| "slipway-builder".into());
        let container_name =
            std::env::var("BUILD_CONTAINER_NAME").unwrap_or_else(|_| "builder".into());

        let assign_public_ip: bool = std::env::var("ASSIGN_PUBLIC_IP")
            .unwrap_or_else(|_| "true".into())
            .parse()
            .expect("ASSIGN_PUBLIC_IP must be true or false");

        Self {
            app_domain,
            bucket,
            log_group,
            cluster,
            task_definition,
            container_name,
            subnets,
            security_groups,
            assign_public_ip,
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
