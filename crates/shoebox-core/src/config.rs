//! Configuration module
//!
//! Environment-driven configuration for storage, thumbnails, enrichment
//! services, retrieval sessions and cost estimation. Per-run options
//! (`UploadOptions`, `DownloadOptions`) come from the command line instead.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::constants::{
    DEFAULT_CONTAINER, DEFAULT_DIRECTORY_FORMAT, DEFAULT_SESSIONS_DIR,
    DEFAULT_THUMBNAIL_CONTAINER,
};
use crate::models::key::validate_directory_format;
use crate::storage_types::StorageBackend;

const DEFAULT_LOCAL_STORAGE_PATH: &str = "./storage";
const DEFAULT_VISION_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_FACE_CONFIDENCE_THRESHOLD: f32 = 80.0;
const DEFAULT_CURRENCY: &str = "$";

/// Thumbnail upload settings. Thumbnails are produced only when both bounds are set.
#[derive(Clone, Debug, PartialEq)]
pub struct ThumbnailConfig {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    pub container: String,
    /// Upload thumbnails even for files that were not freshly uploaded
    pub force: bool,
}

impl ThumbnailConfig {
    pub fn is_enabled(&self) -> bool {
        self.max_width.is_some() && self.max_height.is_some()
    }

    /// `(max_width, max_height)` when enabled
    pub fn bounds(&self) -> Option<(u32, u32)> {
        Some((self.max_width?, self.max_height?))
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_width: None,
            max_height: None,
            container: DEFAULT_THUMBNAIL_CONTAINER.to_string(),
            force: false,
        }
    }
}

/// Image description through Claude vision
#[derive(Clone, Debug, PartialEq)]
pub struct VisionConfig {
    pub anthropic_api_key: Option<String>,
    pub anthropic_vision_model: String,
}

impl VisionConfig {
    pub fn is_enabled(&self) -> bool {
        self.anthropic_api_key.is_some()
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            anthropic_vision_model: DEFAULT_VISION_MODEL.to_string(),
        }
    }
}

/// Face identification against an AWS Rekognition collection
#[derive(Clone, Debug, PartialEq)]
pub struct FaceConfig {
    pub collection_id: Option<String>,
    pub region: Option<String>,
    /// Minimum match similarity (0-100)
    pub confidence_threshold: f32,
}

impl FaceConfig {
    pub fn is_enabled(&self) -> bool {
        self.collection_id.is_some()
    }
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            collection_id: None,
            region: None,
            confidence_threshold: DEFAULT_FACE_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Unit prices for the cost summary. Unset prices are left out of the estimate.
#[derive(Clone, Debug, PartialEq)]
pub struct CostPrices {
    pub currency: String,
    pub list_or_create_container_per_10000: Option<Decimal>,
    pub read_per_10000: Option<Decimal>,
    pub write_per_10000: Option<Decimal>,
    pub other_per_10000: Option<Decimal>,
    pub data_storage_per_gb: Option<Decimal>,
    pub grs_data_transfer_per_gb: Option<Decimal>,
    pub outbound_data_transfer_per_gb: Option<Decimal>,
    pub describe_per_1000: Option<Decimal>,
    pub face_per_1000: Option<Decimal>,
}

impl Default for CostPrices {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            list_or_create_container_per_10000: None,
            read_per_10000: None,
            write_per_10000: None,
            other_per_10000: None,
            data_storage_per_gb: None,
            grs_data_transfer_per_gb: None,
            outbound_data_transfer_per_gb: None,
            describe_per_1000: None,
            face_per_1000: None,
        }
    }
}

impl CostPrices {
    fn from_env() -> Self {
        Self {
            currency: env::var("COST_CURRENCY").unwrap_or_else(|_| DEFAULT_CURRENCY.to_string()),
            list_or_create_container_per_10000: env_decimal(
                "COST_LIST_OR_CREATE_CONTAINER_PER_10000",
            ),
            read_per_10000: env_decimal("COST_READ_PER_10000"),
            write_per_10000: env_decimal("COST_WRITE_PER_10000"),
            other_per_10000: env_decimal("COST_OTHER_PER_10000"),
            data_storage_per_gb: env_decimal("COST_DATA_STORAGE_PER_GB"),
            grs_data_transfer_per_gb: env_decimal("COST_GRS_DATA_TRANSFER_PER_GB"),
            outbound_data_transfer_per_gb: env_decimal("COST_OUTBOUND_DATA_TRANSFER_PER_GB"),
            describe_per_1000: env_decimal("COST_DESCRIBE_PER_1000"),
            face_per_1000: env_decimal("COST_FACE_PER_1000"),
        }
    }
}

/// Archiver configuration
#[derive(Clone, Debug, PartialEq)]
pub struct ArchiverConfig {
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    /// Container (bucket prefix) holding the archived files
    pub container: String,
    /// strftime pattern turning a capture date into a directory
    pub directory_format: String,
    pub thumbnails: ThumbnailConfig,
    pub vision: VisionConfig,
    pub face: FaceConfig,
    pub sessions_dir: PathBuf,
    pub costs: CostPrices,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::Local,
            local_storage_path: Some(DEFAULT_LOCAL_STORAGE_PATH.to_string()),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            container: DEFAULT_CONTAINER.to_string(),
            directory_format: DEFAULT_DIRECTORY_FORMAT.to_string(),
            thumbnails: ThumbnailConfig::default(),
            vision: VisionConfig::default(),
            face: FaceConfig::default(),
            sessions_dir: PathBuf::from(DEFAULT_SESSIONS_DIR),
            costs: CostPrices::default(),
        }
    }
}

impl ArchiverConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let storage_backend = match env_string("STORAGE_BACKEND") {
            Some(value) => StorageBackend::from_str(&value)?,
            None => StorageBackend::Local,
        };

        let thumbnails = ThumbnailConfig {
            max_width: env_parse("THUMBNAIL_MAX_WIDTH"),
            max_height: env_parse("THUMBNAIL_MAX_HEIGHT"),
            container: env::var("THUMBNAIL_CONTAINER")
                .unwrap_or_else(|_| DEFAULT_THUMBNAIL_CONTAINER.to_string()),
            force: env::var("THUMBNAIL_FORCE")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
        };

        let vision = VisionConfig {
            anthropic_api_key: env_string("ANTHROPIC_API_KEY"),
            anthropic_vision_model: env::var("ANTHROPIC_VISION_MODEL")
                .unwrap_or_else(|_| DEFAULT_VISION_MODEL.to_string()),
        };

        let face = FaceConfig {
            collection_id: env_string("FACE_COLLECTION_ID"),
            region: env_string("FACE_REGION").or_else(|| env_string("AWS_REGION")),
            confidence_threshold: env::var("FACE_CONFIDENCE_THRESHOLD")
                .unwrap_or_else(|_| DEFAULT_FACE_CONFIDENCE_THRESHOLD.to_string())
                .parse()
                .unwrap_or(DEFAULT_FACE_CONFIDENCE_THRESHOLD),
        };

        let config = Self {
            storage_backend,
            local_storage_path: env_string("LOCAL_STORAGE_PATH")
                .or_else(|| Some(DEFAULT_LOCAL_STORAGE_PATH.to_string())),
            s3_bucket: env_string("S3_BUCKET"),
            s3_region: env_string("S3_REGION").or_else(|| env_string("AWS_REGION")),
            s3_endpoint: env_string("S3_ENDPOINT"),
            container: env::var("SHOEBOX_CONTAINER")
                .unwrap_or_else(|_| DEFAULT_CONTAINER.to_string()),
            directory_format: env::var("SHOEBOX_DIRECTORY_FORMAT")
                .unwrap_or_else(|_| DEFAULT_DIRECTORY_FORMAT.to_string()),
            thumbnails,
            vision,
            face,
            sessions_dir: PathBuf::from(
                env::var("SESSIONS_DIR").unwrap_or_else(|_| DEFAULT_SESSIONS_DIR.to_string()),
            ),
            costs: CostPrices::from_env(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.s3_endpoint.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION (or AWS_REGION) or S3_ENDPOINT must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        if self.container.trim().is_empty() {
            return Err(anyhow::anyhow!("SHOEBOX_CONTAINER must not be empty"));
        }

        validate_directory_format(&self.directory_format)
            .map_err(|e| anyhow::anyhow!("SHOEBOX_DIRECTORY_FORMAT is invalid: {}", e))?;

        if self.thumbnails.max_width.is_some() != self.thumbnails.max_height.is_some() {
            return Err(anyhow::anyhow!(
                "THUMBNAIL_MAX_WIDTH and THUMBNAIL_MAX_HEIGHT must be set together"
            ));
        }
        if self.thumbnails.max_width == Some(0) || self.thumbnails.max_height == Some(0) {
            return Err(anyhow::anyhow!("Thumbnail bounds must be greater than zero"));
        }
        if self.thumbnails.is_enabled() && self.thumbnails.container == self.container {
            return Err(anyhow::anyhow!(
                "THUMBNAIL_CONTAINER must differ from SHOEBOX_CONTAINER"
            ));
        }

        if !(0.0..=100.0).contains(&self.face.confidence_threshold) {
            return Err(anyhow::anyhow!(
                "FACE_CONFIDENCE_THRESHOLD must be between 0 and 100"
            ));
        }

        Ok(())
    }
}

/// Unset and blank variables both read as `None`.
fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let value = env_string(key)?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value = %value, "Ignoring unparseable environment value");
            None
        }
    }
}

fn env_decimal(key: &str) -> Option<Decimal> {
    env_parse::<Decimal>(key)
}
