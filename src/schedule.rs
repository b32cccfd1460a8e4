use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Local, NaiveTime};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::search;
use crate::types::{Recurrence, Schedule, ScheduledSearch};
use crate::AppState;

/// Wall clock abstraction so evaluation can be tested at arbitrary instants.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Shape checks applied when a schedule is created: zero-padded 24-hour
/// "HH:mm", and weekly schedules must name at least one valid weekday.
pub fn validate_schedule(schedule: &Schedule) -> Result<(), GatewayError> {
    if schedule.time.len() != 5 || NaiveTime::parse_from_str(&schedule.time, "%H:%M").is_err() {
        return Err(GatewayError::Validation(
            "schedule time must be in HH:mm format".to_string(),
        ));
    }

    if schedule.recurrence == Recurrence::Weekly {
        let days = schedule.days.as_deref().unwrap_or_default();
        if days.is_empty() {
            return Err(GatewayError::Validation(
                "weekly schedules require at least one day".to_string(),
            ));
        }
        if days.iter().any(|&day| day > 6) {
            return Err(GatewayError::Validation(
                "schedule days must be in the range 0-6".to_string(),
            ));
        }
    }

    Ok(())
}

/// Whether a schedule fires at `now`. The comparison is exact string
/// equality on the "HH:mm" minute — an evaluation that skips past the minute
/// does not catch up. Weekly schedules additionally require today's index
/// (0 = Sunday) to be listed.
pub fn is_due(scheduled: &ScheduledSearch, now: &DateTime<Local>) -> bool {
    if !scheduled.is_active {
        return false;
    }

    if scheduled.schedule.time != now.format("%H:%M").to_string() {
        return false;
    }

    match scheduled.schedule.recurrence {
        Recurrence::Daily => true,
        Recurrence::Weekly => {
            let today = now.weekday().num_days_from_sunday() as u8;
            scheduled
                .schedule
                .days
                .as_deref()
                .is_some_and(|days| days.contains(&today))
        }
    }
}

/// Outcome of one tag search inside a due schedule.
#[derive(Debug)]
pub struct TagOutcome {
    pub schedule_id: String,
    pub tag_id: String,
    pub keyword: String,
    pub result_count: usize,
    pub error: Option<String>,
}

impl TagOutcome {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// One evaluation tick over the locally stored schedules. Due schedules fire
/// one search per tag, sequentially; each invocation's outcome becomes the
/// live view, so the last tag wins. A failing tag never aborts the rest of
/// the batch.
pub async fn evaluate(state: &Arc<AppState>, now: &DateTime<Local>) -> Vec<TagOutcome> {
    let schedules = state.store.scheduled_searches().await;
    let mut outcomes = Vec::new();

    for scheduled in schedules.iter().filter(|s| is_due(s, now)) {
        info!(
            "schedule {} due at {} with {} tags",
            scheduled.id,
            now.format("%H:%M"),
            scheduled.search_tags.len()
        );

        for tag in &scheduled.search_tags {
            match search::search(state, &tag.keyword, tag.content_type, 1).await {
                Ok(results) => {
                    let count = results.len();
                    state.store.set_results(results).await;
                    outcomes.push(TagOutcome {
                        schedule_id: scheduled.id.clone(),
                        tag_id: tag.id.clone(),
                        keyword: tag.keyword.clone(),
                        result_count: count,
                        error: None,
                    });
                }
                Err(e) => {
                    warn!("scheduled search for '{}' failed: {}", tag.keyword, e);
                    state.store.set_search_error(e.to_string()).await;
                    outcomes.push(TagOutcome {
                        schedule_id: scheduled.id.clone(),
                        tag_id: tag.id.clone(),
                        keyword: tag.keyword.clone(),
                        result_count: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        state.store.mark_ran(&scheduled.id, now.to_rfc3339()).await;
    }

    outcomes
}

/// Remote-execution variant: schedules come from the remote datastore and
/// every tag's results are appended there, keyed by the schedule and the tag
/// that produced them. Overlapping passes are not deduplicated.
pub async fn evaluate_remote(
    state: &Arc<AppState>,
    now: &DateTime<Local>,
) -> Result<Vec<TagOutcome>, GatewayError> {
    let Some(remote) = &state.remote else {
        return Err(GatewayError::configuration(
            "remote datastore is not configured",
        ));
    };

    let schedules = remote.fetch_active_schedules().await?;
    debug!("remote pass over {} active schedules", schedules.len());
    let mut outcomes = Vec::new();

    for scheduled in schedules.iter().filter(|s| is_due(s, now)) {
        for tag in &scheduled.search_tags {
            let outcome = match search::search(state, &tag.keyword, tag.content_type, 1).await {
                Ok(results) => {
                    let count = results.len();
                    match remote.insert_results(&scheduled.id, tag, &results, now).await {
                        Ok(()) => TagOutcome {
                            schedule_id: scheduled.id.clone(),
                            tag_id: tag.id.clone(),
                            keyword: tag.keyword.clone(),
                            result_count: count,
                            error: None,
                        },
                        Err(e) => {
                            warn!("failed to store results for '{}': {}", tag.keyword, e);
                            TagOutcome {
                                schedule_id: scheduled.id.clone(),
                                tag_id: tag.id.clone(),
                                keyword: tag.keyword.clone(),
                                result_count: count,
                                error: Some(e.to_string()),
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("scheduled search for '{}' failed: {}", tag.keyword, e);
                    TagOutcome {
                        schedule_id: scheduled.id.clone(),
                        tag_id: tag.id.clone(),
                        keyword: tag.keyword.clone(),
                        result_count: 0,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }
    }

    Ok(outcomes)
}

/// Timer loop driving the evaluator once per configured interval. Missed
/// ticks are skipped, never replayed.
pub async fn run(state: Arc<AppState>, clock: Arc<dyn Clock>) {
    let period = Duration::from_secs(state.config.scheduler.interval_secs.max(1));
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("schedule evaluator running every {:?}", period);

    loop {
        ticker.tick().await;
        let now = clock.now();

        let outcomes = evaluate(&state, &now).await;
        if !outcomes.is_empty() {
            let failures = outcomes.iter().filter(|o| o.failed()).count();
            info!(
                "schedule tick fired {} tag searches ({} failed)",
                outcomes.len(),
                failures
            );
        }

        if state.remote.is_some() {
            match evaluate_remote(&state, &now).await {
                Ok(outcomes) if !outcomes.is_empty() => {
                    info!("remote pass fired {} tag searches", outcomes.len());
                }
                Ok(_) => {}
                Err(e) => warn!("remote schedule pass failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentType, SearchTag};
    use chrono::TimeZone;

    struct FixedClock(DateTime<Local>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Local> {
            self.0
        }
    }

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
    }

    fn scheduled(recurrence: Recurrence, time: &str, days: Option<Vec<u8>>) -> ScheduledSearch {
        ScheduledSearch {
            id: "s1".to_string(),
            search_tags: vec![SearchTag {
                id: "t1".to_string(),
                keyword: "rust".to_string(),
                content_type: ContentType::Blog,
            }],
            schedule: Schedule {
                recurrence,
                time: time.to_string(),
                days,
            },
            is_active: true,
            last_run: None,
        }
    }

    #[test]
    fn daily_schedule_fires_only_on_the_exact_minute() {
        let schedule = scheduled(Recurrence::Daily, "09:00", None);

        // 2026-08-03 is a Monday.
        assert!(is_due(&schedule, &at(2026, 8, 3, 9, 0)));
        assert!(!is_due(&schedule, &at(2026, 8, 3, 8, 59)));
        assert!(!is_due(&schedule, &at(2026, 8, 3, 9, 1)));
    }

    #[test]
    fn weekly_schedule_requires_a_listed_day() {
        let schedule = scheduled(Recurrence::Weekly, "10:00", Some(vec![1, 3]));

        // Monday (1) and Wednesday (3) fire, Tuesday does not.
        assert!(is_due(&schedule, &at(2026, 8, 3, 10, 0)));
        assert!(!is_due(&schedule, &at(2026, 8, 4, 10, 0)));
        assert!(is_due(&schedule, &at(2026, 8, 5, 10, 0)));
        assert!(!is_due(&schedule, &at(2026, 8, 3, 10, 1)));
    }

    #[test]
    fn inactive_schedules_never_fire() {
        let mut schedule = scheduled(Recurrence::Daily, "09:00", None);
        schedule.is_active = false;
        assert!(!is_due(&schedule, &at(2026, 8, 3, 9, 0)));
    }

    #[test]
    fn weekly_without_days_never_fires() {
        let schedule = scheduled(Recurrence::Weekly, "10:00", None);
        assert!(!is_due(&schedule, &at(2026, 8, 3, 10, 0)));

        let schedule = scheduled(Recurrence::Weekly, "10:00", Some(vec![]));
        assert!(!is_due(&schedule, &at(2026, 8, 3, 10, 0)));
    }

    #[test]
    fn clock_is_injectable() {
        let clock = FixedClock(at(2026, 8, 3, 9, 0));
        let schedule = scheduled(Recurrence::Daily, "09:00", None);
        assert!(is_due(&schedule, &clock.now()));
    }

    #[test]
    fn validate_rejects_malformed_time() {
        let bad = Schedule {
            recurrence: Recurrence::Daily,
            time: "9:00".to_string(),
            days: None,
        };
        assert!(validate_schedule(&bad).is_err());

        let bad = Schedule {
            recurrence: Recurrence::Daily,
            time: "25:00".to_string(),
            days: None,
        };
        assert!(validate_schedule(&bad).is_err());

        let good = Schedule {
            recurrence: Recurrence::Daily,
            time: "09:00".to_string(),
            days: None,
        };
        assert!(validate_schedule(&good).is_ok());
    }

    #[test]
    fn validate_enforces_the_weekly_days_invariant() {
        let empty = Schedule {
            recurrence: Recurrence::Weekly,
            time: "10:00".to_string(),
            days: Some(vec![]),
        };
        assert!(validate_schedule(&empty).is_err());

        let out_of_range = Schedule {
            recurrence: Recurrence::Weekly,
            time: "10:00".to_string(),
            days: Some(vec![7]),
        };
        assert!(validate_schedule(&out_of_range).is_err());

        let good = Schedule {
            recurrence: Recurrence::Weekly,
            time: "10:00".to_string(),
            days: Some(vec![1, 3]),
        };
        assert!(validate_schedule(&good).is_ok());

        // Daily schedules ignore days entirely.
        let daily = Schedule {
            recurrence: Recurrence::Daily,
            time: "10:00".to_string(),
            days: Some(vec![9]),
        };
        assert!(validate_schedule(&daily).is_ok());
    }

    #[tokio::test]
    async fn evaluation_with_nothing_due_fires_nothing() {
        use crate::config;
        use crate::store::StateStore;

        let store = StateStore::ephemeral();
        store
            .add_schedule(
                vec![SearchTag {
                    id: "t1".to_string(),
                    keyword: "rust".to_string(),
                    content_type: ContentType::Blog,
                }],
                Schedule {
                    recurrence: Recurrence::Daily,
                    time: "09:00".to_string(),
                    days: None,
                },
                true,
            )
            .await;

        let state = Arc::new(
            AppState::new(
                config::test_config("http://localhost:9"),
                reqwest::Client::new(),
                store,
            )
            .unwrap(),
        );

        let outcomes = evaluate(&state, &at(2026, 8, 3, 9, 1)).await;
        assert!(outcomes.is_empty());
        assert!(state.store.scheduled_searches().await[0].last_run.is_none());
    }
}
