use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("CONFIDENCE_THRESHOLD must be between 0 and 1, got {0}")]
    ThresholdOutOfRange(f32),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub model_path: PathBuf,
    pub model_apply_softmax: bool,
    pub labels_config: Option<PathBuf>,
    pub confidence_threshold: f32,
    pub image_size: u32,
    pub max_upload_bytes: usize,
    pub static_dir: PathBuf,
    pub predict_per_minute: u32,
    pub requests_per_hour: u32,
    pub requests_per_day: u32,
    pub trust_proxy_headers: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            host: string("HOST", "0.0.0.0"),
            port: parse(&lookup, "PORT", 5000)?,
            database_path: string("DATABASE_PATH", "predictions.db").into(),
            model_path: string("MODEL_PATH", "models/disease_detection_model.pt").into(),
            model_apply_softmax: parse(&lookup, "MODEL_APPLY_SOFTMAX", true)?,
            labels_config: lookup("LABELS_CONFIG").filter(|p| !p.is_empty()).map(PathBuf::from),
            confidence_threshold: parse(&lookup, "CONFIDENCE_THRESHOLD", 0.5)?,
            image_size: parse(&lookup, "IMAGE_SIZE", 224)?,
            max_upload_bytes: parse(&lookup, "MAX_UPLOAD_BYTES", 16 * 1024 * 1024)?,
            static_dir: string("STATIC_DIR", "static").into(),
            predict_per_minute: parse(&lookup, "RATE_LIMIT_PREDICT_PER_MINUTE", 10)?,
            requests_per_hour: parse(&lookup, "RATE_LIMIT_PER_HOUR", 50)?,
            requests_per_day: parse(&lookup, "RATE_LIMIT_PER_DAY", 200)?,
            trust_proxy_headers: parse(&lookup, "TRUST_PROXY_HEADERS", false)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.confidence_threshold));
        }
        if self.image_size == 0 {
            return Err(ConfigError::Zero("IMAGE_SIZE"));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Zero("MAX_UPLOAD_BYTES"));
        }
        for (key, value) in [
            ("RATE_LIMIT_PREDICT_PER_MINUTE", self.predict_per_minute),
            ("RATE_LIMIT_PER_HOUR", self.requests_per_hour),
            ("RATE_LIMIT_PER_DAY", self.requests_per_day),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(key));
            }
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
