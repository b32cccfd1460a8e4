use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::types::{ContentType, Schedule, ScheduledSearch, SearchResult, SearchTag};

/// The slice of state that survives restarts. Serialized wholesale to one
/// JSON file and rewritten on every change — full read, full overwrite,
/// last-writer-wins.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub saved_results: Vec<SearchResult>,
    pub search_tags: Vec<SearchTag>,
    pub scheduled_searches: Vec<ScheduledSearch>,
}

/// The live view: what a client would currently render.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ResultView {
    pub results: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Holds UI-visible state (results, tags, schedules, bookmarks) and persists
/// the durable part to a local JSON file.
#[derive(Debug)]
pub struct StateStore {
    path: Option<PathBuf>,
    persisted: RwLock<PersistedState>,
    view: RwLock<ResultView>,
}

impl StateStore {
    /// Load persisted state from `path`, starting fresh if the file is
    /// missing or unreadable.
    pub async fn load(path: PathBuf) -> Self {
        let persisted = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<PersistedState>(&contents) {
                Ok(state) => {
                    info!(
                        "loaded state from {}: {} tags, {} schedules, {} saved results",
                        path.display(),
                        state.search_tags.len(),
                        state.scheduled_searches.len(),
                        state.saved_results.len()
                    );
                    state
                }
                Err(e) => {
                    warn!("state file {} is unreadable ({}), starting fresh", path.display(), e);
                    PersistedState::default()
                }
            },
            Err(_) => PersistedState::default(),
        };

        Self {
            path: Some(path),
            persisted: RwLock::new(persisted),
            view: RwLock::new(ResultView::default()),
        }
    }

    /// In-memory store with no backing file.
    pub fn ephemeral() -> Self {
        Self {
            path: None,
            persisted: RwLock::new(PersistedState::default()),
            view: RwLock::new(ResultView::default()),
        }
    }

    async fn persist(&self) {
        let Some(path) = &self.path else { return };

        let snapshot = self.persisted.read().await.clone();
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => {
                if let Err(e) = tokio::fs::write(path, json).await {
                    warn!("failed to persist state to {}: {}", path.display(), e);
                }
            }
            Err(e) => warn!("failed to serialize state: {}", e),
        }
    }

    // Tags

    pub async fn search_tags(&self) -> Vec<SearchTag> {
        self.persisted.read().await.search_tags.clone()
    }

    pub async fn add_tag(&self, keyword: String, content_type: ContentType) -> SearchTag {
        let tag = SearchTag {
            id: Uuid::new_v4().to_string(),
            keyword,
            content_type,
        };
        self.persisted.write().await.search_tags.push(tag.clone());
        self.persist().await;
        tag
    }

    /// Remove a tag and cascade: the tag disappears from every schedule's
    /// tag list, and a schedule left with no tags is removed entirely.
    pub async fn remove_tag(&self, id: &str) -> bool {
        let removed = {
            let mut state = self.persisted.write().await;
            let before = state.search_tags.len();
            state.search_tags.retain(|tag| tag.id != id);

            for schedule in &mut state.scheduled_searches {
                schedule.search_tags.retain(|tag| tag.id != id);
            }
            state
                .scheduled_searches
                .retain(|schedule| !schedule.search_tags.is_empty());

            state.search_tags.len() != before
        };
        if removed {
            self.persist().await;
        }
        removed
    }

    // Schedules

    pub async fn scheduled_searches(&self) -> Vec<ScheduledSearch> {
        self.persisted.read().await.scheduled_searches.clone()
    }

    pub async fn add_schedule(
        &self,
        search_tags: Vec<SearchTag>,
        schedule: Schedule,
        is_active: bool,
    ) -> ScheduledSearch {
        let scheduled = ScheduledSearch {
            id: Uuid::new_v4().to_string(),
            search_tags,
            schedule,
            is_active,
            last_run: None,
        };
        self.persisted
            .write()
            .await
            .scheduled_searches
            .push(scheduled.clone());
        self.persist().await;
        scheduled
    }

    pub async fn remove_schedule(&self, id: &str) -> bool {
        let removed = {
            let mut state = self.persisted.write().await;
            let before = state.scheduled_searches.len();
            state.scheduled_searches.retain(|s| s.id != id);
            state.scheduled_searches.len() != before
        };
        if removed {
            self.persist().await;
        }
        removed
    }

    /// Flip a schedule between active and inactive. Returns the new state,
    /// or `None` when the id is unknown.
    pub async fn toggle_schedule(&self, id: &str) -> Option<bool> {
        let toggled = {
            let mut state = self.persisted.write().await;
            let schedule = state.scheduled_searches.iter_mut().find(|s| s.id == id)?;
            schedule.is_active = !schedule.is_active;
            Some(schedule.is_active)
        };
        self.persist().await;
        toggled
    }

    pub async fn mark_ran(&self, id: &str, at: String) {
        {
            let mut state = self.persisted.write().await;
            if let Some(schedule) = state.scheduled_searches.iter_mut().find(|s| s.id == id) {
                schedule.last_run = Some(at);
            }
        }
        self.persist().await;
    }

    // Bookmarks

    pub async fn saved_results(&self) -> Vec<SearchResult> {
        self.persisted.read().await.saved_results.clone()
    }

    /// Save a result, or un-save it when already present. Returns whether
    /// the result is saved afterwards.
    pub async fn toggle_saved(&self, result: SearchResult) -> bool {
        let saved = {
            let mut state = self.persisted.write().await;
            if state.saved_results.iter().any(|r| r.id == result.id) {
                state.saved_results.retain(|r| r.id != result.id);
                false
            } else {
                state.saved_results.push(result);
                true
            }
        };
        self.persist().await;
        saved
    }

    // Live view

    pub async fn view(&self) -> ResultView {
        self.view.read().await.clone()
    }

    pub async fn set_results(&self, results: Vec<SearchResult>) {
        let mut view = self.view.write().await;
        view.results = results;
        view.error = None;
    }

    /// A failed search surfaces its message and clears the result list. Tags,
    /// schedules, and saved results are untouched.
    pub async fn set_search_error(&self, message: String) {
        let mut view = self.view.write().await;
        view.results.clear();
        view.error = Some(message);
    }
}
