use std::{env, io::Write, time::Duration};

use bb_common::{
    helpers::{env_flag, env_or_default},
    Secret,
};
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use razorpay_tools::RazorpayConfig;
use serde_json::json;
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_BB_HOST: &str = "127.0.0.1";
const DEFAULT_BB_PORT: u16 = 5000;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_NOTIFY_QUEUE_SIZE: usize = 64;
const DEFAULT_NOTIFY_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_NOTIFY_BACKOFF_MS: u64 = 500;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Razorpay API credentials. The key secret also signs checkout callbacks.
    pub razorpay: RazorpayConfig,
    /// The secret Razorpay uses to sign webhook deliveries. Defaults to the API key secret.
    pub webhook_secret: Secret<String>,
    pub auth: AuthConfig,
    /// When false, the admin routes do not check for the Admin role. **Development only**
    pub admin_auth: bool,
    /// Upper bound for any single order store operation.
    pub store_timeout: Duration,
    pub notifications: NotificationConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BB_HOST.to_string(),
            port: DEFAULT_BB_PORT,
            database_url: String::default(),
            razorpay: RazorpayConfig::default(),
            webhook_secret: Secret::default(),
            auth: AuthConfig::default(),
            admin_auth: true,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            notifications: NotificationConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BB_HOST").ok().unwrap_or_else(|| DEFAULT_BB_HOST.into());
        let port = env_or_default("BB_PORT", DEFAULT_BB_PORT);
        let database_url = env::var("BB_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BB_DATABASE_URL is not set. Please set it to the URL for the order database.");
            String::default()
        });
        let razorpay = RazorpayConfig::new_from_env_or_default();
        let webhook_secret = match env::var("BB_RAZORPAY_WEBHOOK_SECRET") {
            Ok(s) if !s.trim().is_empty() => Secret::new(s),
            _ => {
                info!("🪛️ BB_RAZORPAY_WEBHOOK_SECRET is not set. Webhooks will be verified with the API key secret.");
                razorpay.key_secret.clone()
            },
        };
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let admin_auth = env_flag("BB_ADMIN_AUTH", true);
        if !admin_auth {
            warn!("🚨️ BB_ADMIN_AUTH is off. Anyone can list orders and change their status. Never do this in production.");
        }
        let store_timeout = Duration::from_millis(env_or_default("BB_STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT_MS));
        let notifications = NotificationConfig::from_env_or_default();
        let use_x_forwarded_for = env_flag("BB_USE_X_FORWARDED_FOR", false);
        let use_forwarded = env_flag("BB_USE_FORWARDED", false);
        Self {
            host,
            port,
            database_url,
            razorpay,
            webhook_secret,
            auth,
            admin_auth,
            store_timeout,
            notifications,
            use_x_forwarded_for,
            use_forwarded,
        }
    }
}

//-----------------------------------------------  NotificationConfig  ------------------------------------------------
/// Settings for the order confirmation email queue.
#[derive(Clone, Copy, Debug)]
pub struct NotificationConfig {
    /// Confirmations waiting beyond this many are dropped (and logged).
    pub queue_size: usize,
    /// Delivery attempts per email, including the first.
    pub max_attempts: u32,
    /// The wait before the first retry. It doubles on every subsequent retry.
    pub backoff: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            queue_size: DEFAULT_NOTIFY_QUEUE_SIZE,
            max_attempts: DEFAULT_NOTIFY_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_NOTIFY_BACKOFF_MS),
        }
    }
}

impl NotificationConfig {
    pub fn from_env_or_default() -> Self {
        let queue_size = env_or_default("BB_NOTIFY_QUEUE_SIZE", DEFAULT_NOTIFY_QUEUE_SIZE).max(1);
        let max_attempts = env_or_default("BB_NOTIFY_MAX_ATTEMPTS", DEFAULT_NOTIFY_MAX_ATTEMPTS).max(1);
        let backoff = Duration::from_millis(env_or_default("BB_NOTIFY_BACKOFF_MS", DEFAULT_NOTIFY_BACKOFF_MS));
        Self { queue_size, max_attempts, backoff }
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HMAC key the identity provider signs bearer tokens with. Shared with the provider.
    pub token_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The auth token secret has not been set. I'm using a random value for this session. Tokens issued \
             by the identity provider will NOT be accepted. DO NOT operate on production like this. 🚨️🚨️🚨️"
        );
        let secret: String = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
        match &mut tmpfile {
            Some((f, p)) => {
                let key_data = json!({ "auth_token_secret": secret }).to_string();
                match writeln!(f, "{key_data}") {
                    Ok(()) => warn!(
                        "🚨️🚨️🚨️ The auth token secret for this session was written to {}. If this is a production \
                         instance, you are doing it wrong! Set the BB_AUTH_TOKEN_SECRET environment variable \
                         instead. 🚨️🚨️🚨️",
                        p.to_str().unwrap_or("???")
                    ),
                    Err(e) => warn!("🪛️ Could not write the auth token secret to the temporary file. {e}"),
                }
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the auth token secret.");
            },
        }
        Self { token_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn new(token_secret: Secret<String>) -> Self {
        Self { token_secret }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("BB_AUTH_TOKEN_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [BB_AUTH_TOKEN_SECRET]")))?;
        let secret = Secret::new(secret);
        if secret.is_empty() {
            return Err(ServerError::ConfigurationError("BB_AUTH_TOKEN_SECRET is empty".to_string()));
        }
        Ok(Self { token_secret: secret })
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub admin_auth: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            admin_auth: config.admin_auth,
        }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self { use_x_forwarded_for: false, use_forwarded: false, admin_auth: true }
    }
}
