use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum StorageBackend {
    S3,
    Local,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub storage_backend: StorageBackend,
    /// Bucket to serve; required when the backend is S3.
    pub s3_bucket_name: Option<String>,
    pub local_storage_path: String,
    pub rest_port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let storage_backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "s3".to_string())
            .to_lowercase()
            .as_str()
        {
            "s3" => StorageBackend::S3,
            "local" => StorageBackend::Local,
            other => anyhow::bail!("unknown STORAGE_BACKEND: {other} (expected 's3' or 'local')"),
        };

        Ok(Config {
            storage_backend,
            s3_bucket_name: std::env::var("S3_BUCKET_NAME").ok(),
            local_storage_path: std::env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "./data/objects".to_string()),
            rest_port: std::env::var("REST_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
        })
    }
}
