use basera::config::MailConfig;
use basera::db;
use basera::db::models::{
    ListingStatus, Location, Property, PropertyType, SavedSearch, UserPreference,
};
use basera::listings::repository::{PropertyRepository, SqlitePropertyRepository};
use basera::matching::notify::notify_matching_users;
use basera::prefs::repository::{PreferenceRepository, SqlitePreferenceRepository};
use basera::state::DbPool;
use tempfile::TempDir;

fn test_db() -> (DbPool, TempDir) {
    let tmp = TempDir::new().unwrap();
    let pool = db::create_pool(&tmp.path().join("test.db")).expect("create pool");
    db::run_migrations(&pool).expect("run migrations");
    (pool, tmp)
}

fn seed_user(pool: &DbPool, id: &str) {
    let conn = pool.get().unwrap();
    conn.execute(
        "INSERT INTO users (id, name, email) VALUES (?1, ?1, ?1 || '@example.com')",
        rusqlite::params![id],
    )
    .unwrap();
}

fn listing(city: &str) -> Property {
    Property {
        id: uuid::Uuid::now_v7().to_string(),
        title: format!("2BHK in {}", city),
        description: String::new(),
        property_type: PropertyType::Flat,
        status: ListingStatus::Rent,
        price: 22000.0,
        area: 900.0,
        bedrooms: 2,
        bathrooms: 2,
        location: Location {
            address: format!("7 Station Road, {}", city),
            city: city.to_string(),
            state: String::new(),
            pincode: String::new(),
            lat: None,
            lng: None,
        },
        amenities: vec![],
        features: vec![],
        images: vec![],
        owner: None,
        is_active: true,
        views: 0,
        created_at: String::new(),
        updated_at: String::new(),
    }
}

fn mumbai_alert(user_id: &str) -> UserPreference {
    let mut prefs = UserPreference::new(user_id);
    prefs
        .add_saved_search(SavedSearch {
            location: "Mumbai".to_string(),
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

#[tokio::test]
async fn trigger_notifies_only_matching_user_searches() {
    let (pool, _tmp) = test_db();
    let properties = SqlitePropertyRepository::new(pool.clone());
    let prefs = SqlitePreferenceRepository::new(pool.clone());

    seed_user(&pool, "watcher");
    prefs.save(&mumbai_alert("watcher")).await.unwrap();

    let mumbai = listing("Mumbai");
    let delhi = listing("Delhi");
    properties.insert(&mumbai).await.unwrap();
    properties.insert(&delhi).await.unwrap();

    let outcome = notify_matching_users(
        &properties,
        &prefs,
        &MailConfig::default(),
        &[mumbai.id.clone(), delhi.id.clone()],
    )
    .await
    .unwrap();

    assert_eq!(outcome.notified_users, vec!["watcher".to_string()]);
    assert_eq!(outcome.properties.len(), 2);

    let doc = prefs.load("watcher").await.unwrap().unwrap();
    assert_eq!(doc.notifications.len(), 1);
    // Only the Mumbai property matched the saved search
    assert_eq!(
        doc.notifications[0].message,
        "We found 1 new properties matching your saved search for Mumbai."
    );
    assert!(!doc.notifications[0].read);
}

#[tokio::test]
async fn trigger_is_not_idempotent() {
    let (pool, _tmp) = test_db();
    let properties = SqlitePropertyRepository::new(pool.clone());
    let prefs = SqlitePreferenceRepository::new(pool.clone());

    seed_user(&pool, "watcher");
    prefs.save(&mumbai_alert("watcher")).await.unwrap();

    let mumbai = listing("Mumbai");
    properties.insert(&mumbai).await.unwrap();

    let ids = vec![mumbai.id.clone()];
    let mail = MailConfig::default();
    notify_matching_users(&properties, &prefs, &mail, &ids)
        .await
        .unwrap();
    notify_matching_users(&properties, &prefs, &mail, &ids)
        .await
        .unwrap();

    // Two triggers append two distinct entries; newest first
    let doc = prefs.load("watcher").await.unwrap().unwrap();
    assert_eq!(doc.notifications.len(), 2);
    assert_eq!(doc.notifications[0].message, doc.notifications[1].message);
}

#[tokio::test]
async fn empty_property_ids_fails_before_touching_preferences() {
    let (pool, _tmp) = test_db();
    let properties = SqlitePropertyRepository::new(pool.clone());
    let prefs = SqlitePreferenceRepository::new(pool.clone());

    seed_user(&pool, "watcher");
    prefs.save(&mumbai_alert("watcher")).await.unwrap();

    let result = notify_matching_users(&properties, &prefs, &MailConfig::default(), &[]).await;
    assert!(matches!(
        result,
        Err(basera::error::AppError::BadRequest(_))
    ));

    let doc = prefs.load("watcher").await.unwrap().unwrap();
    assert!(doc.notifications.is_empty());
}

#[tokio::test]
async fn unknown_property_ids_are_not_found() {
    let (pool, _tmp) = test_db();
    let properties = SqlitePropertyRepository::new(pool.clone());
    let prefs = SqlitePreferenceRepository::new(pool.clone());

    let result = notify_matching_users(
        &properties,
        &prefs,
        &MailConfig::default(),
        &["ghost-id".to_string()],
    )
    .await;
    assert!(matches!(result, Err(basera::error::AppError::NotFound(_))));
}

#[tokio::test]
async fn unmatched_search_leaves_notifications_unchanged() {
    let (pool, _tmp) = test_db();
    let properties = SqlitePropertyRepository::new(pool.clone());
    let prefs = SqlitePreferenceRepository::new(pool.clone());

    seed_user(&pool, "chennai-watcher");
    let mut doc = UserPreference::new("chennai-watcher");
    doc.add_saved_search(SavedSearch {
        location: "Chennai".to_string(),
        property_type: "all".to_string(),
        status: "all".to_string(),
        min_price: None,
        max_price: None,
        min_bedrooms: None,
        notify_by_email: true,
        created_at: String::new(),
    })
    .unwrap();
    prefs.save(&doc).await.unwrap();

    let mumbai = listing("Mumbai");
    let delhi = listing("Delhi");
    properties.insert(&mumbai).await.unwrap();
    properties.insert(&delhi).await.unwrap();

    let outcome = notify_matching_users(
        &properties,
        &prefs,
        &MailConfig::default(),
        &[mumbai.id.clone(), delhi.id.clone()],
    )
    .await
    .unwrap();

    assert!(outcome.notified_users.is_empty());
    let doc = prefs.load("chennai-watcher").await.unwrap().unwrap();
    assert!(doc.notifications.is_empty());
}

#[tokio::test]
async fn user_with_two_matching_searches_gets_two_notifications() {
    let (pool, _tmp) = test_db();
    let properties = SqlitePropertyRepository::new(pool.clone());
    let prefs = SqlitePreferenceRepository::new(pool.clone());

    seed_user(&pool, "watcher");
    let mut doc = mumbai_alert("watcher");
    doc.add_saved_search(SavedSearch {
        location: String::new(),
        property_type: "flat".to_string(),
        status: "rent".to_string(),
        min_price: None,
        max_price: None,
        min_bedrooms: None,
        notify_by_email: true,
        created_at: String::new(),
    })
    .unwrap();
    prefs.save(&doc).await.unwrap();

    let mumbai = listing("Mumbai");
    properties.insert(&mumbai).await.unwrap();

    let outcome = notify_matching_users(
        &properties,
        &prefs,
        &MailConfig::default(),
        &[mumbai.id.clone()],
    )
    .await
    .unwrap();

    // One distinct user, two stored notifications (one per matching search)
    assert_eq!(outcome.notified_users.len(), 1);
    let doc = prefs.load("watcher").await.unwrap().unwrap();
    assert_eq!(doc.notifications.len(), 2);
    assert!(doc
        .notifications
        .iter()
        .any(|n| n.message.contains("any location")));
}
