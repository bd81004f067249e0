use crate::constants::*;

/// Settings for the local development backend.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: String,
    pub data_path: String,
    /// When set, every request must carry a matching `apikey` header
    pub api_key: Option<String>,
    pub frontend_origin: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let host = std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = std::env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
        port.parse::<u16>()
            .map_err(|_| format!("PORT must be a valid port number, got '{}'", port))?;

        let data_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| DEFAULT_DATA_PATH.to_string());
        let api_key = std::env::var("SUPABASE_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let frontend_origin = std::env::var("FRONTEND_ORIGIN")
            .unwrap_or_else(|_| DEFAULT_FRONTEND_ORIGIN.to_string());

        Ok(Self {
            host,
            port,
            data_path,
            api_key,
            frontend_origin,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Connection settings for the hosted REST table backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub supabase_url: String,
    pub supabase_key: String,
}

impl ClientConfig {
    pub fn new(supabase_url: impl Into<String>, supabase_key: impl Into<String>) -> Result<Self, String> {
        let supabase_url = supabase_url.into().trim().trim_end_matches('/').to_string();
        let supabase_key = supabase_key.into().trim().to_string();

        if !(supabase_url.starts_with("http://") || supabase_url.starts_with("https://")) {
            return Err(format!(
                "SUPABASE_URL must start with http:// or https://, got '{}'",
                supabase_url
            ));
        }
        if supabase_key.is_empty() {
            return Err("SUPABASE_KEY cannot be empty".to_string());
        }

        Ok(Self {
            supabase_url,
            supabase_key,
        })
    }

    pub fn from_env() -> Result<Self, String> {
        let url = std::env::var("SUPABASE_URL").map_err(|_| "SUPABASE_URL not set".to_string())?;
        let key = std::env::var("SUPABASE_KEY").map_err(|_| "SUPABASE_KEY not set".to_string())?;
        Self::new(url, key)
    }
}
