//! Candidate retrieval policy: date-windowed when the query carried a date
//! range, recency-bounded otherwise.

use {
    crate::{
        error::EngineError,
        store::MemoryStore,
        types::{DateRange, MemoryRecord},
    },
    chrono::Duration,
    tracing::debug,
};

/// Fetch the records worth scoring. A parsed date range is widened by
/// `slack_days` on each side to absorb timezone drift around midnight;
/// without one, the `recency_window` most recent records are scored.
pub async fn fetch_candidates(
    store: &dyn MemoryStore,
    owner_id: &str,
    date_range: Option<&DateRange>,
    slack_days: i64,
    recency_window: usize,
) -> Result<Vec<MemoryRecord>, EngineError> {
    match date_range {
        Some(range) => {
            let start = range.start - Duration::days(slack_days);
            let end = range.end + Duration::days(slack_days);
            debug!(%start, %end, "retrieving date-windowed candidates");
            store.list_between(owner_id, start, end).await.map_err(EngineError::Store)
        }
        None => {
            debug!(window = recency_window, "retrieving recent candidates");
            store.list_recent(owner_id, recency_window).await.map_err(EngineError::Store)
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::store_mem::InMemoryStore,
        crate::types::MemoryRecord,
        chrono::{NaiveDate, TimeZone, Utc},
    };

    fn dated(id: &str, day: u32) -> MemoryRecord {
        MemoryRecord {
            id: id.into(),
            owner_id: "alice".into(),
            raw_text: format!("memory {id}"),
            summary: None,
            context: None,
            mood: None,
            embedding: None,
            created_at: Utc.with_ymd_and_hms(2026, 2, day, 10, 0, 0).unwrap(),
        }
    }

    async fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        for day in 1..=6 {
            store.seed(dated(&format!("d{day}"), day)).await;
        }
        store
    }

    #[tokio::test]
    async fn date_window_gains_slack_on_both_sides() {
        let store = seeded_store().await;
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
        };
        let hits = fetch_candidates(&store, "alice", Some(&range), 1, 500).await.unwrap();
        let mut ids: Vec<&str> = hits.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["d2", "d3", "d4"]);
    }

    #[tokio::test]
    async fn no_range_falls_back_to_recency_window() {
        let store = seeded_store().await;
        let hits = fetch_candidates(&store, "alice", None, 1, 3).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["d6", "d5", "d4"]);
    }

    #[tokio::test]
    async fn zero_slack_keeps_the_window_tight() {
        let store = seeded_store().await;
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 2, 4).unwrap(),
        };
        let hits = fetch_candidates(&store, "alice", Some(&range), 0, 500).await.unwrap();
        let mut ids: Vec<&str> = hits.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["d3", "d4"]);
    }
}
