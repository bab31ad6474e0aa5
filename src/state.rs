//! Application state: exercise bank, submission outcomes, prompts, scoring config and evaluator.
//!
//! This module owns:
//!   - the exercise bank (config entries first, then built-in seeds; ids are unique)
//!   - submission outcomes, looked up by the id handed back to the page (bounded, oldest evicted)
//!   - the prompts and scoring config (from TOML or defaults)
//!   - the optional evaluator client

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::{load_config_from_env, CourseConfig, Prompts, ScoringConfig};
use crate::domain::ExerciseDefinition;
use crate::openai::OpenAI;
use crate::protocol::RemedialSubmissionOut;
use crate::seeds::seed_exercises;

/// Stored outcome of a remedial submission. Stands in for cross-page scratch state.
#[derive(Clone, Debug)]
pub struct SubmissionRecord {
    pub phase: String,
    pub step_id: String,
    pub level: String,
    pub activity_id: String,
    pub outcome: RemedialSubmissionOut,
}

/// Insertion-ordered outcome store that evicts the oldest record past `capacity`.
#[derive(Debug, Default)]
pub struct SubmissionStore {
    by_id: HashMap<String, SubmissionRecord>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SubmissionStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { by_id: HashMap::new(), order: VecDeque::new(), capacity: capacity.max(1) }
    }

    /// Returns how many old records were evicted.
    pub fn insert(&mut self, record: SubmissionRecord) -> usize {
        let id = record.outcome.submission_id.clone();
        if self.by_id.insert(id.clone(), record).is_none() {
            self.order.push_back(id);
        }
        let mut evicted = 0;
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.by_id.remove(&oldest);
                evicted += 1;
            }
        }
        evicted
    }

    pub fn get(&self, id: &str) -> Option<&SubmissionRecord> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub exercises: Arc<RwLock<HashMap<String, ExerciseDefinition>>>,
    pub order: Arc<RwLock<Vec<String>>>,
    pub submissions: Arc<RwLock<SubmissionStore>>,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
    pub scoring: ScoringConfig,
}

impl AppState {
    /// Build state from env: load config, seed exercises, init evaluator.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_config_from_env().unwrap_or_default();

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "course_backend", base_url = %oa.base_url, model = %oa.model, "Evaluator enabled.");
        } else {
            info!(target: "course_backend", "Evaluator disabled (no OPENAI_API_KEY). Using local scoring only.");
        }

        Self::from_config(cfg, openai)
    }

    /// Build state from an explicit config; built-in seeds fill ids the config does not use.
    pub fn from_config(cfg: CourseConfig, openai: Option<OpenAI>) -> Self {
        let mut by_id = HashMap::<String, ExerciseDefinition>::new();
        let mut order = Vec::<String>::new();

        for mut ex in cfg.exercises.into_iter().chain(seed_exercises()) {
            if ex.id.trim().is_empty() {
                ex.id = Uuid::new_v4().to_string();
            }
            if by_id.contains_key(&ex.id) {
                warn!(target: "course_backend", id = %ex.id, "Duplicate exercise id; keeping the first definition");
                continue;
            }
            order.push(ex.id.clone());
            by_id.insert(ex.id.clone(), ex);
        }

        let mut count_by_type: HashMap<&str, usize> = HashMap::new();
        for ex in by_id.values() {
            *count_by_type.entry(ex.task_type.as_tag()).or_default() += 1;
        }
        for (task_type, count) in count_by_type {
            info!(target: "course_backend", %task_type, count, "Startup exercise inventory");
        }

        Self {
            exercises: Arc::new(RwLock::new(by_id)),
            order: Arc::new(RwLock::new(order)),
            submissions: Arc::new(RwLock::new(SubmissionStore::with_capacity(cfg.submissions.capacity))),
            openai,
            prompts: cfg.prompts,
            scoring: cfg.scoring,
        }
    }

    #[instrument(level = "debug", skip_all, fields(%id))]
    pub async fn get_exercise(&self, id: &str) -> Option<ExerciseDefinition> {
        self.exercises.read().await.get(id).cloned()
    }

    /// Exercises in load order.
    pub async fn list_exercises(&self) -> Vec<ExerciseDefinition> {
        let order = self.order.read().await;
        let by_id = self.exercises.read().await;
        order.iter().filter_map(|id| by_id.get(id).cloned()).collect()
    }

    #[instrument(level = "debug", skip(self, record), fields(id = %record.outcome.submission_id))]
    pub async fn record_submission(&self, record: SubmissionRecord) {
        let evicted = self.submissions.write().await.insert(record);
        if evicted > 0 {
            debug!(target: "course_backend", evicted, "Submission store at capacity; dropped oldest");
        }
    }

    pub async fn get_submission(&self, id: &str) -> Option<SubmissionRecord> {
        self.submissions.read().await.get(id).cloned()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::from_config(CourseConfig::default(), None)
    }
}
