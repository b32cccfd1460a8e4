use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::RemoteConfig;
use crate::error::GatewayError;
use crate::types::{Recurrence, Schedule, ScheduledSearch, SearchResult, SearchTag};

/// Client for the optional remote datastore, a PostgREST-style API keyed by
/// an anonymous access key.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

/// Row shape of the `scheduled_searches` table.
#[derive(Debug, Deserialize)]
struct ScheduleRow {
    id: String,
    is_active: bool,
    #[serde(rename = "type")]
    recurrence: Recurrence,
    time: String,
    #[serde(default)]
    days: Option<Vec<u8>>,
    #[serde(default)]
    search_tags: Vec<SearchTag>,
}

impl From<ScheduleRow> for ScheduledSearch {
    fn from(row: ScheduleRow) -> Self {
        ScheduledSearch {
            id: row.id,
            search_tags: row.search_tags,
            schedule: Schedule {
                recurrence: row.recurrence,
                time: row.time,
                days: row.days,
            },
            is_active: row.is_active,
            last_run: None,
        }
    }
}

/// Row shape of the `search_results` table: the result fields plus the
/// schedule and tag that produced them and the search timestamp.
#[derive(Debug, Serialize)]
struct StoredResult<'a> {
    #[serde(flatten)]
    result: &'a SearchResult,
    schedule_id: &'a str,
    search_tag: &'a SearchTag,
    searched_at: String,
}

impl RemoteStore {
    pub fn new(config: &RemoteConfig, client: reqwest::Client) -> Result<Self, GatewayError> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| GatewayError::configuration(format!("invalid datastore URL: {}", e)))?;

        Ok(Self {
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// All scheduled searches with `is_active = true`.
    pub async fn fetch_active_schedules(&self) -> Result<Vec<ScheduledSearch>, GatewayError> {
        let url = self.table_url("scheduled_searches");
        debug!("fetching active schedules from {}", url);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .query(&[("select", "*"), ("is_active", "eq.true")])
            .send()
            .await
            .map_err(|e| GatewayError::upstream(None, format!("failed to reach datastore: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(GatewayError::upstream(
                Some(status),
                format!("datastore responded with status {}", status),
            ));
        }

        let rows: Vec<ScheduleRow> = response
            .json()
            .await
            .map_err(|e| GatewayError::upstream(None, format!("failed to parse datastore response: {}", e)))?;

        Ok(rows.into_iter().map(ScheduledSearch::from).collect())
    }

    /// Append one tag invocation's results, keyed by the schedule and tag
    /// that produced them.
    pub async fn insert_results(
        &self,
        schedule_id: &str,
        tag: &SearchTag,
        results: &[SearchResult],
        searched_at: &DateTime<Local>,
    ) -> Result<(), GatewayError> {
        if results.is_empty() {
            return Ok(());
        }

        let rows: Vec<StoredResult<'_>> = results
            .iter()
            .map(|result| StoredResult {
                result,
                schedule_id,
                search_tag: tag,
                searched_at: searched_at.to_rfc3339(),
            })
            .collect();

        let url = self.table_url("search_results");
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await
            .map_err(|e| GatewayError::upstream(None, format!("failed to reach datastore: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::upstream(
                Some(status),
                if body.is_empty() {
                    format!("datastore insert failed with status {}", status)
                } else {
                    body
                },
            ));
        }

        debug!("stored {} results for schedule {}", rows.len(), schedule_id);
        Ok(())
    }
}
