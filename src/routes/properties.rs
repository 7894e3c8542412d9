use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{
    ListingStatus, Location, OwnerContact, Property, PropertyType,
};
use crate::error::{AppError, AppResult};
use crate::extractors::AdminUser;
use crate::listings;
use crate::listings::repository::ListingFilter;
use crate::routes::ok;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/properties", get(list).post(create))
        .route(
            "/api/properties/{id}",
            get(detail).put(update).delete(delete),
        )
        .route("/api/properties/import", post(import))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub status: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<u32>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct PropertyInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub property_type: PropertyType,
    pub status: ListingStatus,
    pub price: f64,
    #[serde(default)]
    pub area: f64,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: u32,
    pub location: Location,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub owner: Option<OwnerContact>,
}

#[derive(Deserialize)]
pub struct PropertyPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub property_type: Option<PropertyType>,
    pub status: Option<ListingStatus>,
    pub price: Option<f64>,
    pub area: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub location: Option<Location>,
    pub amenities: Option<Vec<String>>,
    pub features: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub owner: Option<OwnerContact>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
pub struct ImportRequest {
    pub properties: Vec<PropertyInput>,
}

fn build_property(input: PropertyInput) -> AppResult<Property> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title is required".into()));
    }
    if input.location.city.trim().is_empty() {
        return Err(AppError::BadRequest("City is required".into()));
    }
    if input.price < 0.0 {
        return Err(AppError::BadRequest("Price must be non-negative".into()));
    }

    Ok(Property {
        id: uuid::Uuid::now_v7().to_string(),
        title,
        description: input.description,
        property_type: input.property_type,
        status: input.status,
        price: input.price,
        area: input.area,
        bedrooms: input.bedrooms,
        bathrooms: input.bathrooms,
        location: input.location,
        amenities: input.amenities,
        features: input.features,
        images: input.images,
        owner: input.owner,
        is_active: true,
        views: 0,
        created_at: String::new(),
        updated_at: String::new(),
    })
}

/// GET /api/properties — filtered, paginated listing search
async fn list(State(state): State<AppState>, Query(q): Query<ListQuery>) -> AppResult<Response> {
    let property_type = match q.property_type.as_deref() {
        None | Some("") | Some("all") => None,
        Some(s) => Some(
            PropertyType::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown property type: {}", s)))?,
        ),
    };
    let status = match q.status.as_deref() {
        None | Some("") | Some("all") => None,
        Some(s) => Some(
            ListingStatus::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown status: {}", s)))?,
        ),
    };

    let filter = ListingFilter {
        location: q.location.clone().filter(|s| !s.is_empty()),
        property_type,
        status,
        min_price: q.min_price,
        max_price: q.max_price,
        min_bedrooms: q.min_bedrooms,
        page: q.page,
        limit: q.limit,
    };

    let (properties, total) = state.properties.search(&filter).await?;

    // Track search interest per city; missing city rows are a no-op
    if let Some(ref location) = filter.location {
        listings::bump_city_search_count(&state.db, location)?;
    }

    Ok(ok(
        "Properties",
        json!({
            "properties": properties,
            "total": total,
            "page": filter.page.unwrap_or(1),
            "limit": filter.limit.unwrap_or(20),
        }),
    )
    .into_response())
}

/// GET /api/properties/{id} — detail fetch, increments the view counter
async fn detail(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Response> {
    let property = state
        .properties
        .get(&id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound(format!("Property {} not found", id)))?;

    state.properties.bump_views(&id).await?;

    let mut property = property;
    property.views += 1;

    Ok(ok("Property", json!({ "property": property })).into_response())
}

/// POST /api/properties — admin create; upserts the city row
async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(input): Json<PropertyInput>,
) -> AppResult<Response> {
    let property = build_property(input)?;
    state.properties.insert(&property).await?;
    listings::upsert_city_for_property(
        &state.db,
        &property.location.city,
        &property.location.state,
    )?;

    Ok(ok("Property created", json!({ "property": property })).into_response())
}

/// PUT /api/properties/{id} — admin partial update
async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(patch): Json<PropertyPatch>,
) -> AppResult<Response> {
    let mut property = state
        .properties
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Property {} not found", id)))?;

    if let Some(title) = patch.title {
        property.title = title;
    }
    if let Some(description) = patch.description {
        property.description = description;
    }
    if let Some(t) = patch.property_type {
        property.property_type = t;
    }
    if let Some(s) = patch.status {
        property.status = s;
    }
    if let Some(price) = patch.price {
        if price < 0.0 {
            return Err(AppError::BadRequest("Price must be non-negative".into()));
        }
        property.price = price;
    }
    if let Some(area) = patch.area {
        property.area = area;
    }
    if let Some(b) = patch.bedrooms {
        property.bedrooms = b;
    }
    if let Some(b) = patch.bathrooms {
        property.bathrooms = b;
    }
    if let Some(location) = patch.location {
        property.location = location;
    }
    if let Some(a) = patch.amenities {
        property.amenities = a;
    }
    if let Some(f) = patch.features {
        property.features = f;
    }
    if let Some(i) = patch.images {
        property.images = i;
    }
    if let Some(owner) = patch.owner {
        property.owner = Some(owner);
    }
    if let Some(active) = patch.is_active {
        property.is_active = active;
    }

    state.properties.update(&property).await?;

    Ok(ok("Property updated", json!({ "property": property })).into_response())
}

/// DELETE /api/properties/{id} — admin hard delete, decrements the city counter
async fn delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let property = state
        .properties
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Property {} not found", id)))?;

    state.properties.delete(&id).await?;
    listings::decrement_city_property_count(&state.db, &property.location.city)?;

    Ok(ok("Property deleted", json!({ "id": id })).into_response())
}

/// POST /api/properties/import — admin bulk create
async fn import(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<ImportRequest>,
) -> AppResult<Response> {
    if req.properties.is_empty() {
        return Err(AppError::BadRequest("No properties to import".into()));
    }

    let mut ids = Vec::with_capacity(req.properties.len());
    for input in req.properties {
        let property = build_property(input)?;
        state.properties.insert(&property).await?;
        listings::upsert_city_for_property(
            &state.db,
            &property.location.city,
            &property.location.state,
        )?;
        ids.push(property.id);
    }

    tracing::info!("Imported {} properties", ids.len());
    Ok(ok(
        "Properties imported",
        json!({ "imported": ids.len(), "propertyIds": ids }),
    )
    .into_response())
}
