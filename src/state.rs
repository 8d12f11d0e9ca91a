//! Application state: activity registry, attempt store, gradebook and the optional OpenAI oracle.
//!
//! This module owns:
//!   - the activities (from TOML config, else built-in seeds)
//!   - the attempt store (in-memory, optionally mirrored to a JSON snapshot)
//!   - the in-memory gradebook
//!   - the optional OpenAI client and the oracle timeout

use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::activities::{build_activity, ActivityDraft, ActivityRegistry};
use crate::config::{load_config_from_env, AppConfig};
use crate::gradebook::Gradebook;
use crate::openai::OpenAI;
use crate::seeds::seed_activities;
use crate::store::AttemptStore;

pub struct AppState {
    pub activities: ActivityRegistry,
    pub attempts: AttemptStore,
    pub gradebook: Gradebook,
    pub openai: Option<OpenAI>,
    pub oracle_timeout: Duration,
    /// Submissions hold this shared; deleting an activity takes it exclusively,
    /// so a cascade never races an in-flight save or grade.
    pub lifecycle: RwLock<()>,
}

impl AppState {
    /// Build state from env: load config, seed activities, open the store, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_config_from_env().unwrap_or_default();

        // Build optional OpenAI client (if API key present).
        let openai = OpenAI::from_env(&cfg.oracle);
        if let Some(oa) = &openai {
            info!(target: "yesno_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "yesno_backend", "OpenAI disabled (no OPENAI_API_KEY). Only direct matches can be answered.");
        }

        Self::from_config(cfg, openai)
    }

    pub fn from_config(cfg: AppConfig, openai: Option<OpenAI>) -> Self {
        let mut activities = Vec::new();
        for ac in cfg.activities {
            let id = ac.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
            match build_activity(id.clone(), ActivityDraft::from(ac), &cfg.defaults) {
                Ok(a) => activities.push(a),
                Err(e) => {
                    error!(target: "yesno_backend", %id, error = %e, "Skipping configured activity");
                }
            }
        }
        if activities.is_empty() {
            info!(target: "yesno_backend", "No activities configured; using built-in seeds");
            activities = seed_activities();
        }
        for a in &activities {
            info!(target: "yesno_backend", id = %a.id, name = %a.name, max_questions = a.max_questions, max_grade = a.max_grade, "Activity available");
        }

        Self {
            activities: ActivityRegistry::with_activities(cfg.defaults, activities),
            attempts: AttemptStore::open(cfg.storage.data_path),
            gradebook: Gradebook::new(),
            openai,
            oracle_timeout: cfg.oracle.timeout(),
            lifecycle: RwLock::new(()),
        }
    }
}
