use std::fmt::Display;
use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

const DEFAULT_JWT_TTL: i64 = 86_400;
const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

/// Where uploaded CSV bytes live.
#[derive(Debug, Clone, Deserialize)]
pub enum StorageConfig {
    Local { root: String },
    S3(S3Config),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub max_file_size: usize,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "csvplot".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "csvplot-users".into()),
            ttl_seconds: positive_ttl(number_or_default(
                "JWT_EXPIRATION_TIME",
                std::env::var("JWT_EXPIRATION_TIME").ok().as_deref(),
                DEFAULT_JWT_TTL,
            )),
        };

        let storage = match std::env::var("STORAGE_BACKEND").as_deref() {
            Ok("s3") => StorageConfig::S3(S3Config {
                endpoint: std::env::var("S3_ENDPOINT").context("S3_ENDPOINT is not set")?,
                bucket: std::env::var("S3_BUCKET").context("S3_BUCKET is not set")?,
                access_key: std::env::var("S3_ACCESS_KEY").context("S3_ACCESS_KEY is not set")?,
                secret_key: std::env::var("S3_SECRET_KEY").context("S3_SECRET_KEY is not set")?,
                region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            }),
            Ok("local") | Err(_) => StorageConfig::Local {
                root: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into()),
            },
            Ok(other) => anyhow::bail!("unknown STORAGE_BACKEND {other:?}"),
        };

        let max_file_size = number_or_default(
            "MAX_FILE_SIZE",
            std::env::var("MAX_FILE_SIZE").ok().as_deref(),
            DEFAULT_MAX_FILE_SIZE,
        );

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".into()),
        );

        Ok(Self {
            database_url,
            jwt,
            storage,
            max_file_size,
            cors_origins,
        })
    }
}

/// Parses a numeric setting; an unset or blank value means the default.
fn number_or_default<T>(setting: &str, raw: Option<&str>, default: T) -> T
where
    T: FromStr + Display,
{
    match raw.map(str::trim) {
        None | Some("") => default,
        Some(value) => value.parse().unwrap_or_else(|_| {
            warn!(setting, value, default = %default, "unparsable setting, using default");
            default
        }),
    }
}

fn positive_ttl(ttl: i64) -> i64 {
    if ttl > 0 {
        ttl
    } else {
        warn!(ttl, default = DEFAULT_JWT_TTL, "JWT_EXPIRATION_TIME must be positive, using default");
        DEFAULT_JWT_TTL
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
