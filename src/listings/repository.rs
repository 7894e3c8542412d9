// Repository pattern - isolates all property-store side effects
use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Row, ToSql};
use std::sync::Arc;

use crate::db::models::{ListingStatus, Location, OwnerContact, Property, PropertyType};
use crate::db::RepositoryError;
use crate::state::DbPool;

/// Filters for the public listing search. All optional; page is 1-based.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub location: Option<String>,
    pub property_type: Option<PropertyType>,
    pub status: Option<ListingStatus>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<u32>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[async_trait]
pub trait PropertyRepository: Send + Sync {
    /// Resolve an explicit identifier list. Unknown ids are silently dropped.
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Property>, RepositoryError>;

    async fn get(&self, id: &str) -> Result<Option<Property>, RepositoryError>;

    /// Increment the view counter on a detail fetch.
    async fn bump_views(&self, id: &str) -> Result<(), RepositoryError>;

    async fn insert(&self, property: &Property) -> Result<(), RepositoryError>;

    async fn update(&self, property: &Property) -> Result<(), RepositoryError>;

    /// Hard delete; returns false when nothing matched.
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;

    /// Active listings matching the filter, with the total row count for
    /// pagination.
    async fn search(&self, filter: &ListingFilter) -> Result<(Vec<Property>, i64), RepositoryError>;
}

pub struct SqlitePropertyRepository {
    pool: DbPool,
}

impl SqlitePropertyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const PROPERTY_COLUMNS: &str = "id, title, description, property_type, status, price, area, \
     bedrooms, bathrooms, address, city, state, pincode, lat, lng, \
     amenities_json, features_json, images_json, owner_json, is_active, views, \
     created_at, updated_at";

fn json_column<T: serde::de::DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_property(row: &Row<'_>) -> rusqlite::Result<Property> {
    let type_str: String = row.get(3)?;
    let status_str: String = row.get(4)?;
    let owner_raw: Option<String> = row.get(18)?;

    let property_type = PropertyType::parse(&type_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, type_str.clone().into())
    })?;
    let status = ListingStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, status_str.clone().into())
    })?;

    let owner: Option<OwnerContact> = match owner_raw {
        Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(18, Type::Text, Box::new(e))
        })?),
        None => None,
    };

    Ok(Property {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        property_type,
        status,
        price: row.get(5)?,
        area: row.get(6)?,
        bedrooms: row.get::<_, i64>(7)? as u32,
        bathrooms: row.get::<_, i64>(8)? as u32,
        location: Location {
            address: row.get(9)?,
            city: row.get(10)?,
            state: row.get(11)?,
            pincode: row.get(12)?,
            lat: row.get(13)?,
            lng: row.get(14)?,
        },
        amenities: json_column(row, 15)?,
        features: json_column(row, 16)?,
        images: json_column(row, 17)?,
        owner,
        is_active: row.get(19)?,
        views: row.get(20)?,
        created_at: row.get(21)?,
        updated_at: row.get(22)?,
    })
}

#[async_trait]
impl PropertyRepository for SqlitePropertyRepository {
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Property>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.pool.get()?;
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM properties WHERE id IN ({})",
            PROPERTY_COLUMNS, placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let properties = stmt
            .query_map(params_from_iter(ids.iter()), row_to_property)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(properties)
    }

    async fn get(&self, id: &str) -> Result<Option<Property>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {} FROM properties WHERE id = ?1", PROPERTY_COLUMNS);

        match conn.query_row(&sql, params![id], row_to_property) {
            Ok(p) => Ok(Some(p)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn bump_views(&self, id: &str) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE properties SET views = views + 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    async fn insert(&self, property: &Property) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        let owner_json = property
            .owner
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        conn.execute(
            "INSERT INTO properties (id, title, description, property_type, status, price, area,
                 bedrooms, bathrooms, address, city, state, pincode, lat, lng,
                 amenities_json, features_json, images_json, owner_json, is_active, views)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                 ?16, ?17, ?18, ?19, ?20, ?21)",
            params![
                property.id,
                property.title,
                property.description,
                property.property_type.as_str(),
                property.status.as_str(),
                property.price,
                property.area,
                property.bedrooms as i64,
                property.bathrooms as i64,
                property.location.address,
                property.location.city,
                property.location.state,
                property.location.pincode,
                property.location.lat,
                property.location.lng,
                serde_json::to_string(&property.amenities)?,
                serde_json::to_string(&property.features)?,
                serde_json::to_string(&property.images)?,
                owner_json,
                property.is_active,
                property.views,
            ],
        )?;
        Ok(())
    }

    async fn update(&self, property: &Property) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        let owner_json = property
            .owner
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let rows = conn.execute(
            "UPDATE properties SET
                 title = ?2, description = ?3, property_type = ?4, status = ?5, price = ?6,
                 area = ?7, bedrooms = ?8, bathrooms = ?9, address = ?10, city = ?11,
                 state = ?12, pincode = ?13, lat = ?14, lng = ?15, amenities_json = ?16,
                 features_json = ?17, images_json = ?18, owner_json = ?19, is_active = ?20,
                 updated_at = datetime('now')
             WHERE id = ?1",
            params![
                property.id,
                property.title,
                property.description,
                property.property_type.as_str(),
                property.status.as_str(),
                property.price,
                property.area,
                property.bedrooms as i64,
                property.bathrooms as i64,
                property.location.address,
                property.location.city,
                property.location.state,
                property.location.pincode,
                property.location.lat,
                property.location.lng,
                serde_json::to_string(&property.amenities)?,
                serde_json::to_string(&property.features)?,
                serde_json::to_string(&property.images)?,
                owner_json,
                property.is_active,
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound(format!(
                "property {}",
                property.id
            )));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM properties WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    async fn search(
        &self,
        filter: &ListingFilter,
    ) -> Result<(Vec<Property>, i64), RepositoryError> {
        let conn = self.pool.get()?;

        let mut clauses: Vec<String> = vec!["is_active = 1".to_string()];
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(ref location) = filter.location {
            let pattern = format!("%{}%", location);
            clauses.push(format!(
                "(city LIKE ?{n} OR address LIKE ?{n})",
                n = values.len() + 1
            ));
            values.push(Box::new(pattern));
        }
        if let Some(ptype) = filter.property_type {
            clauses.push(format!("property_type = ?{}", values.len() + 1));
            values.push(Box::new(ptype.as_str().to_string()));
        }
        if let Some(status) = filter.status {
            clauses.push(format!("status = ?{}", values.len() + 1));
            values.push(Box::new(status.as_str().to_string()));
        }
        if let Some(min) = filter.min_price {
            clauses.push(format!("price >= ?{}", values.len() + 1));
            values.push(Box::new(min));
        }
        if let Some(max) = filter.max_price {
            clauses.push(format!("price <= ?{}", values.len() + 1));
            values.push(Box::new(max));
        }
        if let Some(beds) = filter.min_bedrooms {
            clauses.push(format!("bedrooms >= ?{}", values.len() + 1));
            values.push(Box::new(beds as i64));
        }

        let where_clause = clauses.join(" AND ");

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM properties WHERE {}", where_clause),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let limit = i64::from(filter.limit.unwrap_or(20).min(100));
        let page = i64::from(filter.page.unwrap_or(1).max(1));
        // Widen before multiplying; a huge ?page= must not overflow
        let offset = (page - 1) * limit;

        let sql = format!(
            "SELECT {} FROM properties WHERE {} ORDER BY created_at DESC LIMIT {} OFFSET {}",
            PROPERTY_COLUMNS, where_clause, limit, offset
        );
        let mut stmt = conn.prepare(&sql)?;
        let properties = stmt
            .query_map(params_from_iter(values.iter()), row_to_property)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((properties, total))
    }
}

/// Type alias for Arc-wrapped repository (for handlers and services)
pub type DynPropertyRepository = Arc<dyn PropertyRepository>;
