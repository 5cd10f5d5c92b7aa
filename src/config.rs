/*
 * Responsibility
 * - CLI フラグ / 環境変数 (.env 含む) の読み込み
 * - 設定値のバリデーション (不正なら起動失敗)
 * - 起動後は不変の Config として各コンポーネントへ渡す
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::http::StatusCode;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "relayhook",
    version,
    about = "Policy-driven Slack notifications for inbound HTTP webhooks"
)]
pub struct Cli {
    #[arg(long, env = "RELAYHOOK_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[arg(
        long,
        env = "RELAYHOOK_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Console,
        global = true
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server
    #[command(alias = "s")]
    Serve(ServeArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Console,
    Json,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// HTTP server address
    #[arg(short, long, env = "RELAYHOOK_ADDR", default_value = "127.0.0.1:8080")]
    pub addr: String,

    /// Slack OAuth token
    #[arg(long, env = "RELAYHOOK_SLACK_OAUTH_TOKEN", hide_env_values = true)]
    pub slack_oauth_token: String,

    /// Rego policy file(s). Directories are walked for `.rego` files.
    #[arg(short, long, env = "RELAYHOOK_RULE", value_delimiter = ',')]
    pub rule: Vec<PathBuf>,

    /// Remote OPA server base URL (alternative to --rule)
    #[arg(long, env = "RELAYHOOK_OPA_URL")]
    pub opa_url: Option<String>,

    /// GitHub webhook secret (repeatable)
    #[arg(
        long,
        env = "RELAYHOOK_GITHUB_SECRET",
        value_delimiter = ',',
        hide_env_values = true
    )]
    pub github_secret: Vec<String>,

    /// Enable GitHub Actions OIDC token verification
    #[arg(long, env = "RELAYHOOK_GITHUB_ACTION_TOKEN")]
    pub github_action_token: bool,

    /// Enable Google ID token verification
    #[arg(long, env = "RELAYHOOK_GOOGLE_ID_TOKEN")]
    pub google_id_token: bool,

    /// Enable Amazon SNS message verification
    #[arg(long, env = "RELAYHOOK_AWS_SNS")]
    pub aws_sns: bool,

    /// HTTP status returned when the policy denies a request
    #[arg(long, env = "RELAYHOOK_AUTH_ERR_STATUS", default_value_t = 403)]
    pub auth_err_status: u16,

    /// Return 200 OK when the policy denies a request
    #[arg(long, env = "RELAYHOOK_AUTH_ERR_OK")]
    pub auth_err_ok: bool,

    #[arg(long, env = "RELAYHOOK_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "RELAYHOOK_BODY_LIMIT_BYTES", default_value_t = 1024 * 1024)]
    pub body_limit_bytes: usize,

    #[arg(long, env = "RELAYHOOK_SHUTDOWN_GRACE_SECS", default_value_t = 30)]
    pub shutdown_grace_secs: u64,

    /// Sentry DSN for error reporting
    #[arg(long, env = "RELAYHOOK_SENTRY_DSN")]
    pub sentry_dsn: Option<String>,

    /// Sentry environment
    #[arg(long, env = "RELAYHOOK_SENTRY_ENV")]
    pub sentry_env: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
    Conflict(&'static str, &'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
            ConfigError::Conflict(a, b) => {
                write!(f, "conflicting configuration: {} and {}", a, b)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Secret string that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

/// Which schemes the verifier chain runs.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub github_secrets: Vec<Secret>,
    pub github_action_token: bool,
    pub google_id_token: bool,
    pub aws_sns: bool,
}

#[derive(Debug, Clone)]
pub enum PolicySource {
    Files(Vec<PathBuf>),
    Remote(url::Url),
}

#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub dsn: Option<Secret>,
    pub environment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub slack_token: Secret,
    pub policy: PolicySource,
    pub auth: AuthConfig,
    pub auth_err_status: StatusCode,
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
    pub shutdown_grace: Duration,
    pub sentry: SentryConfig,
}

impl Config {
    pub fn from_args(args: ServeArgs) -> Result<Self, ConfigError> {
        let addr: SocketAddr = args
            .addr
            .parse()
            .map_err(|_| ConfigError::Invalid("RELAYHOOK_ADDR"))?;

        if args.slack_oauth_token.trim().is_empty() {
            return Err(ConfigError::Missing("RELAYHOOK_SLACK_OAUTH_TOKEN"));
        }

        let policy = match (args.rule.is_empty(), args.opa_url) {
            (false, Some(_)) => {
                return Err(ConfigError::Conflict("RELAYHOOK_RULE", "RELAYHOOK_OPA_URL"));
            }
            (false, None) => PolicySource::Files(args.rule),
            (true, Some(raw)) => PolicySource::Remote(
                url::Url::parse(&raw).map_err(|_| ConfigError::Invalid("RELAYHOOK_OPA_URL"))?,
            ),
            (true, None) => return Err(ConfigError::Missing("RELAYHOOK_RULE")),
        };

        let auth_err_status = if args.auth_err_ok {
            StatusCode::OK
        } else {
            StatusCode::from_u16(args.auth_err_status)
                .map_err(|_| ConfigError::Invalid("RELAYHOOK_AUTH_ERR_STATUS"))?
        };

        let github_secrets = args
            .github_secret
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(Secret::new)
            .collect();

        Ok(Self {
            addr,
            slack_token: Secret::new(args.slack_oauth_token),
            policy,
            auth: AuthConfig {
                github_secrets,
                github_action_token: args.github_action_token,
                google_id_token: args.google_id_token,
                aws_sns: args.aws_sns,
            },
            auth_err_status,
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            body_limit_bytes: args.body_limit_bytes,
            shutdown_grace: Duration::from_secs(args.shutdown_grace_secs),
            sentry: SentryConfig {
                dsn: args.sentry_dsn.filter(|s| !s.is_empty()).map(Secret::new),
                environment: args.sentry_env.filter(|s| !s.is_empty()),
            },
        })
    }
}
