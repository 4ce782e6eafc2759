use crate::config::Config;
use crate::services::ml::{DeviceManager, Seq2SeqSummarizer, StubSummarizer, SummaryModel};
use crate::services::template::engine::TemplateEngine;
use crate::services::{MetricsService, SessionManager};
use anyhow::Result;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// The one model instance. Runs lock it for their whole duration.
pub type SharedModel = Arc<Mutex<Box<dyn SummaryModel>>>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub model: SharedModel,
    pub model_loaded: bool,
    pub sessions: Arc<RwLock<SessionManager>>,
    pub templates: Arc<TemplateEngine>,
    pub metrics: Arc<MetricsService>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        tracing::info!("[STATE] Initializing AppState...");
        tracing::info!("[STATE]   Model dir: {}", config.model_dir);
        tracing::info!("[STATE]   Device: {:?}", config.device);

        // Try to load the model, but keep serving if it doesn't work
        let (model, loaded): (Box<dyn SummaryModel>, bool) = match load_model(&config) {
            Ok(model) => {
                tracing::info!("[STATE] ✅ Model loaded successfully");
                (Box::new(model), true)
            }
            Err(e) => {
                tracing::error!("[STATE] ⚠️ Model loading failed: {:#}", e);
                tracing::info!("[STATE] 🌐 Server will start with the stub summarizer");
                (Box::new(StubSummarizer::new()), false)
            }
        };

        Self::with_model(config, model, loaded)
    }

    /// State around an already constructed model
    pub fn with_model(config: Config, model: Box<dyn SummaryModel>, model_loaded: bool) -> Result<Self> {
        let templates = TemplateEngine::new()?;

        Ok(Self {
            config: Arc::new(config),
            model: Arc::new(Mutex::new(model)),
            model_loaded,
            sessions: Arc::new(RwLock::new(SessionManager::new())),
            templates: Arc::new(templates),
            metrics: Arc::new(MetricsService::new()),
        })
    }
}

pub fn load_model(config: &Config) -> Result<Seq2SeqSummarizer> {
    let device = DeviceManager::resolve(&config.device)?;
    tracing::info!("[STATE] 🎮 Using device: {}", DeviceManager::device_info(&device));
    Seq2SeqSummarizer::load(&config.model_dir, device)
}
