use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MODEL_PATH: &str = "models/1.onnx";

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub cors: CorsConfig,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Upload cap in bytes. `None` disables the limit entirely.
    pub max_upload_bytes: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: "0.0.0.0".to_string(),
            max_upload_bytes: None,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ModelConfig {
    pub path: String,
    pub labels: Vec<String>,
    pub input: InputConfig,
    pub output: OutputKind,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_MODEL_PATH.to_string(),
            labels: crate::model::labels::DEFAULT_LABELS
                .iter()
                .map(|l| l.to_string())
                .collect(),
            input: InputConfig::default(),
            output: OutputKind::default(),
        }
    }
}

/// Shape and value range the model was trained on.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub width: u32,
    pub height: u32,
    pub layout: TensorLayout,
    pub scaling: PixelScaling,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            layout: TensorLayout::default(),
            scaling: PixelScaling::default(),
        }
    }
}

#[derive(Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[1, H, W, 3]`
    #[default]
    Nhwc,
    /// `[1, 3, H, W]`
    Nchw,
}

#[derive(Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum PixelScaling {
    /// 0..=255, rescaling happens inside the graph
    #[default]
    Raw,
    /// 0..=1
    Unit,
    /// 0..=1 followed by ImageNet mean/std
    Imagenet,
}

#[derive(Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    Probabilities,
    Logits,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Reads `path` if it exists, falling back to defaults otherwise.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: AppConfig = serde_yaml::from_str(content)?;
        if config.model.labels.is_empty() {
            anyhow::bail!("model.labels must not be empty");
        }
        Ok(config)
    }

    /// Applies `PORT` and `MODEL_PATH` on top of the file values.
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(
            std::env::var("PORT").ok().as_deref(),
            std::env::var("MODEL_PATH").ok().as_deref(),
        )
    }

    fn apply_overrides(
        &mut self,
        port: Option<&str>,
        model_path: Option<&str>,
    ) -> anyhow::Result<()> {
        if let Some(port) = port {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PORT {port:?}: {e}"))?;
        }
        if let Some(path) = model_path {
            self.model.path = path.to_string();
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
