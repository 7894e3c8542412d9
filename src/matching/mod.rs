//! Saved-search matching: decides which stored searches a batch of
//! properties satisfies, and who should hear about it.

pub mod notify;

use crate::db::models::{Property, SavedSearch, UserPreference};

/// A saved search that matched at least one candidate property.
#[derive(Debug, Clone)]
pub struct SearchMatch {
    pub preference: UserPreference,
    pub search: SavedSearch,
    pub properties: Vec<Property>,
}

/// Empty string and "all" are wildcard values for text criteria.
fn is_wildcard(value: &str) -> bool {
    value.is_empty() || value == "all"
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Does `property` satisfy every dimension of `search`? Pure; absent or
/// wildcard criteria always pass.
pub fn matches(search: &SavedSearch, property: &Property) -> bool {
    if !search.location.is_empty()
        && !contains_ignore_case(&property.location.city, &search.location)
        && !contains_ignore_case(&property.location.address, &search.location)
    {
        return false;
    }

    if !is_wildcard(&search.property_type) && search.property_type != property.property_type.as_str()
    {
        return false;
    }

    if !is_wildcard(&search.status) && search.status != property.status.as_str() {
        return false;
    }

    if let Some(min) = search.min_price {
        if property.price < min {
            return false;
        }
    }
    if let Some(max) = search.max_price {
        if property.price > max {
            return false;
        }
    }

    if let Some(min) = search.min_bedrooms {
        if property.bedrooms < min {
            return false;
        }
    }

    true
}

/// Run every notify-enabled saved search in `preferences` over `candidates`.
/// Each (user, search) pair with a non-empty matching subset yields one
/// SearchMatch; a user with several matching searches gets several entries.
pub fn scan(candidates: &[Property], preferences: &[UserPreference]) -> Vec<SearchMatch> {
    let mut results = Vec::new();

    for preference in preferences {
        for search in preference.notify_enabled_searches() {
            let matched: Vec<Property> = candidates
                .iter()
                .filter(|p| matches(search, p))
                .cloned()
                .collect();

            if !matched.is_empty() {
                results.push(SearchMatch {
                    preference: preference.clone(),
                    search: search.clone(),
                    properties: matched,
                });
            }
        }
    }

    results
}
