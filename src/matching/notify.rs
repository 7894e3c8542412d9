//! Turns scan results into persisted notifications and exposes the
//! operator-facing trigger used after a property import.

use chrono::Utc;

use crate::config::MailConfig;
use crate::db::models::Property;
use crate::error::{AppError, AppResult};
use crate::listings::repository::PropertyRepository;
use crate::matching::{scan, SearchMatch};
use crate::prefs::repository::PreferenceRepository;

/// Exact notification text; the web client string-matches on this.
pub fn notification_message(count: usize, location: &str) -> String {
    let location = if location.is_empty() {
        "any location"
    } else {
        location
    };
    format!(
        "We found {} new properties matching your saved search for {}.",
        count, location
    )
}

/// Append one notification per match to the owning user's document and
/// persist it. Best effort: a failed save is logged and skipped, so a partial
/// run can leave some users notified and others not. Returns the distinct
/// user ids that received at least one notification.
pub async fn append_notifications(
    prefs: &dyn PreferenceRepository,
    mail: &MailConfig,
    matches: &[SearchMatch],
) -> Vec<String> {
    let mut notified: Vec<String> = Vec::new();

    for m in matches {
        let user_id = &m.preference.user_id;
        let message = notification_message(m.properties.len(), &m.search.location);

        // Re-read the document so a user with several matching searches
        // accumulates every notification, not just the last one written.
        let result = async {
            let mut doc = prefs
                .load(user_id)
                .await?
                .unwrap_or_else(|| m.preference.clone());
            doc.push_notification(message.clone(), Utc::now().to_rfc3339());
            prefs.save(&doc).await
        }
        .await;

        match result {
            Ok(()) => {
                if mail.enabled {
                    tracing::info!("Queueing alert email to user {}: {}", user_id, message);
                } else {
                    tracing::debug!("Mail disabled; notification stored for user {}", user_id);
                }
                if !notified.contains(user_id) {
                    notified.push(user_id.clone());
                }
            }
            Err(e) => {
                tracing::error!("Failed to persist notification for user {}: {}", user_id, e);
            }
        }
    }

    notified
}

/// Result of one admin-triggered match scan.
#[derive(Debug)]
pub struct NotifyOutcome {
    pub notified_users: Vec<String>,
    pub properties: Vec<Property>,
}

/// Admin entry point: resolve the given property ids, scan every
/// notify-enabled saved search against them, and append notifications.
/// Deliberately non-idempotent: triggering twice appends twice.
pub async fn notify_matching_users(
    properties: &dyn PropertyRepository,
    prefs: &dyn PreferenceRepository,
    mail: &MailConfig,
    property_ids: &[String],
) -> AppResult<NotifyOutcome> {
    if property_ids.is_empty() {
        return Err(AppError::BadRequest(
            "propertyIds must be a non-empty list".into(),
        ));
    }

    let resolved = properties.find_by_ids(property_ids).await?;
    if resolved.is_empty() {
        return Err(AppError::NotFound(
            "No properties found for the given ids".into(),
        ));
    }

    let subscribed = prefs.find_notify_enabled().await?;
    let matches = scan(&resolved, &subscribed);
    tracing::info!(
        "Match scan over {} properties and {} subscribed users produced {} matches",
        resolved.len(),
        subscribed.len(),
        matches.len()
    );

    let notified_users = append_notifications(prefs, mail, &matches).await;

    Ok(NotifyOutcome {
        notified_users,
        properties: resolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{SavedSearch, UserPreference};
    use crate::db::RepositoryError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[test]
    fn message_format_is_exact() {
        assert_eq!(
            notification_message(3, "Mumbai"),
            "We found 3 new properties matching your saved search for Mumbai."
        );
        assert_eq!(
            notification_message(1, ""),
            "We found 1 new properties matching your saved search for any location."
        );
    }

    /// In-memory preference store; user ids listed in `failing` reject saves.
    struct MemPrefs {
        docs: Mutex<HashMap<String, UserPreference>>,
        failing: Vec<String>,
    }

    impl MemPrefs {
        fn new() -> Self {
            Self {
                docs: Mutex::new(HashMap::new()),
                failing: Vec::new(),
            }
        }

        fn insert(&self, prefs: UserPreference) {
            self.docs
                .lock()
                .unwrap()
                .insert(prefs.user_id.clone(), prefs);
        }
    }

    #[async_trait]
    impl PreferenceRepository for MemPrefs {
        async fn load(&self, user_id: &str) -> Result<Option<UserPreference>, RepositoryError> {
            Ok(self.docs.lock().unwrap().get(user_id).cloned())
        }

        async fn save(&self, prefs: &UserPreference) -> Result<(), RepositoryError> {
            if self.failing.contains(&prefs.user_id) {
                return Err(RepositoryError::NotFound("simulated failure".into()));
            }
            self.insert(prefs.clone());
            Ok(())
        }

        async fn find_notify_enabled(&self) -> Result<Vec<UserPreference>, RepositoryError> {
            Ok(self
                .docs
                .lock()
                .unwrap()
                .values()
                .filter(|p| p.notify_enabled_searches().next().is_some())
                .cloned()
                .collect())
        }
    }

    fn pref_with_search(user_id: &str, location: &str) -> UserPreference {
        let mut prefs = UserPreference::new(user_id);
        prefs
            .add_saved_search(SavedSearch {
                location: location.to_string(),
                property_type: "all".to_string(),
                status: "all".to_string(),
                min_price: None,
                max_price: None,
                min_bedrooms: None,
                notify_by_email: true,
                created_at: String::new(),
            })
            .unwrap();
        prefs
    }

    fn match_for(prefs: &UserPreference, location: &str) -> SearchMatch {
        let mut search = prefs.saved_searches[0].clone();
        search.location = location.to_string();
        SearchMatch {
            preference: prefs.clone(),
            search,
            properties: vec![],
        }
    }

    #[tokio::test]
    async fn appender_prepends_and_reports_distinct_users() {
        let store = MemPrefs::new();
        let prefs = pref_with_search("u1", "Mumbai");
        store.insert(prefs.clone());

        let matches = vec![match_for(&prefs, "Mumbai"), match_for(&prefs, "Mumbai")];
        let notified = append_notifications(&store, &MailConfig::default(), &matches).await;

        // Two match events, one distinct user, two stored notifications
        assert_eq!(notified, vec!["u1".to_string()]);
        let doc = store.load("u1").await.unwrap().unwrap();
        assert_eq!(doc.notifications.len(), 2);
        assert!(!doc.notifications[0].read);
    }

    #[tokio::test]
    async fn appender_skips_failed_saves() {
        let mut store = MemPrefs::new();
        store.failing = vec!["bad".to_string()];
        let good = pref_with_search("good", "Mumbai");
        let bad = pref_with_search("bad", "Mumbai");
        store.insert(good.clone());

        let matches = vec![match_for(&bad, "Mumbai"), match_for(&good, "Mumbai")];
        let notified = append_notifications(&store, &MailConfig::default(), &matches).await;

        assert_eq!(notified, vec!["good".to_string()]);
        assert_eq!(store.load("good").await.unwrap().unwrap().notifications.len(), 1);
    }
}
