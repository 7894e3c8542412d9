use serde::{Deserialize, Serialize};

/// Recent searches are a bounded log; only the newest entries are kept.
pub const RECENT_SEARCH_CAP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Flat,
    Villa,
    House,
    Plot,
    Commercial,
    Pg,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Flat => "flat",
            PropertyType::Villa => "villa",
            PropertyType::House => "house",
            PropertyType::Plot => "plot",
            PropertyType::Commercial => "commercial",
            PropertyType::Pg => "pg",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "flat" => Some(PropertyType::Flat),
            "villa" => Some(PropertyType::Villa),
            "house" => Some(PropertyType::House),
            "plot" => Some(PropertyType::Plot),
            "commercial" => Some(PropertyType::Commercial),
            "pg" => Some(PropertyType::Pg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Sale,
    Rent,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Sale => "sale",
            ListingStatus::Rent => "rent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sale" => Some(ListingStatus::Sale),
            "rent" => Some(ListingStatus::Rent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnerContact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub title: String,
    pub description: String,
    pub property_type: PropertyType,
    pub status: ListingStatus,
    pub price: f64,
    pub area: f64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub location: Location,
    pub amenities: Vec<String>,
    pub features: Vec<String>,
    pub images: Vec<String>,
    pub owner: Option<OwnerContact>,
    pub is_active: bool,
    pub views: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub id: String,
    pub name: String,
    pub state: String,
    pub property_count: i64,
    pub search_count: i64,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub oauth_provider_id: Option<String>,
    pub created_at: String,
}

/// One saved filter set a user wants alerts for. Empty string or "all" in a
/// text field means that dimension is unconstrained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSearch {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub property_type: String,
    #[serde(default)]
    pub status: String,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<u32>,
    #[serde(default)]
    pub notify_by_email: bool,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentSearch {
    pub query: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub searched_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub read: bool,
    pub created_at: String,
}

/// The per-user preference document. Persisted whole as one JSON column;
/// every mutation is read-modify-write against the owning user's row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreference {
    pub user_id: String,
    #[serde(default)]
    pub saved_searches: Vec<SavedSearch>,
    #[serde(default)]
    pub recent_searches: Vec<RecentSearch>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

impl UserPreference {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            saved_searches: Vec::new(),
            recent_searches: Vec::new(),
            notifications: Vec::new(),
        }
    }

    /// Add a saved search, rejecting an exact duplicate of location+type+status.
    pub fn add_saved_search(&mut self, search: SavedSearch) -> Result<(), DuplicateSavedSearch> {
        let duplicate = self.saved_searches.iter().any(|s| {
            s.location.eq_ignore_ascii_case(&search.location)
                && s.property_type == search.property_type
                && s.status == search.status
        });
        if duplicate {
            return Err(DuplicateSavedSearch);
        }
        self.saved_searches.push(search);
        Ok(())
    }

    /// Record a search query, newest first, keeping only the most recent
    /// RECENT_SEARCH_CAP entries.
    pub fn add_recent_search(&mut self, search: RecentSearch) {
        self.recent_searches.insert(0, search);
        self.recent_searches.truncate(RECENT_SEARCH_CAP);
    }

    /// Prepend a notification (newest first, unbounded).
    pub fn push_notification(&mut self, message: String, created_at: String) {
        self.notifications.insert(
            0,
            Notification {
                message,
                read: false,
                created_at,
            },
        );
    }

    pub fn notify_enabled_searches(&self) -> impl Iterator<Item = &SavedSearch> {
        self.saved_searches.iter().filter(|s| s.notify_by_email)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateSavedSearch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BugStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl BugStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BugStatus::Open => "open",
            BugStatus::InProgress => "in-progress",
            BugStatus::Resolved => "resolved",
            BugStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(BugStatus::Open),
            "in-progress" => Some(BugStatus::InProgress),
            "resolved" => Some(BugStatus::Resolved),
            "closed" => Some(BugStatus::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugReport {
    pub id: String,
    pub title: String,
    pub description: String,
    pub steps: Option<String>,
    pub severity: Severity,
    pub reporter_name: String,
    pub reporter_email: String,
    pub status: BugStatus,
    pub notes: String,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(location: &str, property_type: &str, status: &str) -> SavedSearch {
        SavedSearch {
            location: location.to_string(),
            property_type: property_type.to_string(),
            status: status.to_string(),
            min_price: None,
            max_price: None,
            min_bedrooms: None,
            notify_by_email: true,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn duplicate_saved_search_rejected() {
        let mut prefs = UserPreference::new("u1");
        prefs.add_saved_search(search("Mumbai", "flat", "rent")).unwrap();
        let result = prefs.add_saved_search(search("mumbai", "flat", "rent"));
        assert_eq!(result, Err(DuplicateSavedSearch));
        assert_eq!(prefs.saved_searches.len(), 1);
    }

    #[test]
    fn saved_search_differs_by_status_allowed() {
        let mut prefs = UserPreference::new("u1");
        prefs.add_saved_search(search("Mumbai", "flat", "rent")).unwrap();
        prefs.add_saved_search(search("Mumbai", "flat", "sale")).unwrap();
        assert_eq!(prefs.saved_searches.len(), 2);
    }

    #[test]
    fn recent_searches_capped_at_ten_newest_first() {
        let mut prefs = UserPreference::new("u1");
        for i in 0..11 {
            prefs.add_recent_search(RecentSearch {
                query: format!("query-{}", i),
                params: serde_json::Value::Null,
                searched_at: format!("2026-01-01T00:00:{:02}Z", i),
            });
        }
        assert_eq!(prefs.recent_searches.len(), RECENT_SEARCH_CAP);
        // Newest (query-10) first, oldest surviving entry is query-1
        assert_eq!(prefs.recent_searches[0].query, "query-10");
        assert_eq!(prefs.recent_searches[9].query, "query-1");
    }

    #[test]
    fn notifications_prepend_newest_first() {
        let mut prefs = UserPreference::new("u1");
        prefs.push_notification("first".into(), "t1".into());
        prefs.push_notification("second".into(), "t2".into());
        assert_eq!(prefs.notifications[0].message, "second");
        assert_eq!(prefs.notifications[1].message, "first");
        assert!(!prefs.notifications[0].read);
    }

    #[test]
    fn notify_enabled_filters_opt_outs() {
        let mut prefs = UserPreference::new("u1");
        let mut quiet = search("Pune", "all", "all");
        quiet.notify_by_email = false;
        prefs.add_saved_search(quiet).unwrap();
        prefs.add_saved_search(search("Mumbai", "all", "all")).unwrap();
        assert_eq!(prefs.notify_enabled_searches().count(), 1);
    }

    #[test]
    fn preference_document_round_trips() {
        let mut prefs = UserPreference::new("u1");
        prefs.add_saved_search(search("Mumbai", "flat", "rent")).unwrap();
        prefs.push_notification("hello".into(), "t1".into());
        let json = serde_json::to_string(&prefs).unwrap();
        let back: UserPreference = serde_json::from_str(&json).unwrap();
        assert_eq!(back.user_id, "u1");
        assert_eq!(back.saved_searches.len(), 1);
        assert_eq!(back.notifications.len(), 1);
    }

    #[test]
    fn enum_strings_round_trip() {
        assert_eq!(PropertyType::parse("pg"), Some(PropertyType::Pg));
        assert_eq!(PropertyType::Pg.as_str(), "pg");
        assert_eq!(ListingStatus::parse("sale"), Some(ListingStatus::Sale));
        assert_eq!(BugStatus::parse("in-progress"), Some(BugStatus::InProgress));
        assert_eq!(BugStatus::InProgress.as_str(), "in-progress");
        assert_eq!(Severity::parse("bogus"), None);
    }
}
