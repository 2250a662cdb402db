use secrecy::Secret;
use service_core::config::{get_env, get_env_parsed, Config as CoreConfig, Environment};
use service_core::error::AppError;

#[derive(Debug, Clone)]
pub struct RentalConfig {
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub port: u16,
    pub environment: Environment,
    pub storage: StorageBackend,
    pub mongodb: MongoConfig,
    pub jwt: JwtConfig,
    pub admin: Option<AdminBootstrap>,
    pub smtp: SmtpConfig,
    pub booking: BookingPolicy,
    pub login_rate_limit: RateLimitConfig,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: Secret<String>,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    pub expiry_minutes: i64,
}

/// Admin account created at startup when it does not exist yet.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct BookingPolicy {
    pub currency: String,
    pub max_rental_days: u32,
    pub invoice_due_days: u32,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            currency: "INR".to_string(),
            max_rental_days: 90,
            invoice_due_days: 14,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub attempts: u32,
    pub window_seconds: u64,
}

impl RentalConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let core = CoreConfig::load()?;
        let is_prod = get_env("ENVIRONMENT", Some("dev"), false)? == "prod" || core.environment.is_prod();
        let environment = if is_prod {
            Environment::Prod
        } else {
            Environment::Dev
        };

        let storage = match get_env("STORAGE", Some("mongo"), false)?.as_str() {
            "memory" => StorageBackend::Memory,
            "mongo" => StorageBackend::Mongo,
            other => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "STORAGE must be 'mongo' or 'memory', got '{}'",
                    other
                )))
            }
        };

        let admin = match (
            std::env::var("ADMIN_EMAIL").ok(),
            std::env::var("ADMIN_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                email,
                password: Secret::new(password),
            }),
            _ => None,
        };

        let smtp_enabled = get_env_parsed("SMTP_ENABLED", false);

        Ok(Self {
            service_name: get_env("SERVICE_NAME", Some("rental-service"), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: std::env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            port: core.port,
            environment,
            storage,
            mongodb: MongoConfig {
                uri: Secret::new(get_env(
                    "MONGODB_URI",
                    Some("mongodb://localhost:27017/?replicaSet=rs0"),
                    is_prod,
                )?),
                database: get_env("MONGODB_DATABASE", Some("rental_db"), false)?,
            },
            jwt: JwtConfig {
                secret: Secret::new(get_env(
                    "JWT_SECRET",
                    Some("dev-only-jwt-secret-change-me"),
                    is_prod,
                )?),
                expiry_minutes: get_env_parsed("JWT_EXPIRY_MINUTES", 60),
            },
            admin,
            smtp: SmtpConfig {
                enabled: smtp_enabled,
                host: get_env("SMTP_HOST", Some("localhost"), is_prod && smtp_enabled)?,
                port: get_env_parsed("SMTP_PORT", 587),
                user: get_env("SMTP_USER", Some(""), is_prod && smtp_enabled)?,
                password: Secret::new(get_env(
                    "SMTP_PASSWORD",
                    Some(""),
                    is_prod && smtp_enabled,
                )?),
                from: get_env(
                    "SMTP_FROM",
                    Some("Rental Studio <bookings@localhost>"),
                    is_prod && smtp_enabled,
                )?,
            },
            booking: BookingPolicy {
                currency: get_env("CURRENCY", Some("INR"), false)?,
                max_rental_days: get_env_parsed("MAX_RENTAL_DAYS", 90),
                invoice_due_days: get_env_parsed("INVOICE_DUE_DAYS", 14),
            },
            login_rate_limit: RateLimitConfig {
                attempts: get_env_parsed("LOGIN_RATE_LIMIT_ATTEMPTS", 5),
                window_seconds: get_env_parsed("LOGIN_RATE_LIMIT_WINDOW_SECONDS", 60),
            },
            allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:5173"), false)?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }

    /// In-memory configuration with fixed secrets, for tests and local runs.
    pub fn for_memory() -> Self {
        Self {
            service_name: "rental-service".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            port: 0,
            environment: Environment::Dev,
            storage: StorageBackend::Memory,
            mongodb: MongoConfig {
                uri: Secret::new(String::new()),
                database: "rental_test".to_string(),
            },
            jwt: JwtConfig {
                secret: Secret::new("test-jwt-secret".to_string()),
                expiry_minutes: 60,
            },
            admin: None,
            smtp: SmtpConfig {
                enabled: false,
                host: "localhost".to_string(),
                port: 587,
                user: String::new(),
                password: Secret::new(String::new()),
                from: "Rental Studio <bookings@localhost>".to_string(),
            },
            booking: BookingPolicy::default(),
            login_rate_limit: RateLimitConfig {
                attempts: 5,
                window_seconds: 60,
            },
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}
