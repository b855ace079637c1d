//! Startup seeding for the catalog collections.
//!
//! The workflows only read the catalog, so a fresh deployment gets a small
//! fixed set of rows to be usable immediately. Seeding is skipped entirely
//! when any catalog data already exists.

use crate::{
    error::Result,
    models::{AvailableGood, AvailableGoodId, AvailablePolicy, AvailablePolicyId},
    store::RecordStore,
};

/// The goods catalog a fresh deployment starts with.
fn seed_goods() -> Vec<AvailableGood> {
    [("sports", "golf_set"), ("electronics", "mobile"), ("home", "tv"), ("mobility", "bike")]
        .into_iter()
        .map(|(category, kind)| AvailableGood {
            id: AvailableGoodId::new(),
            category: category.to_string(),
            kind: kind.to_string(),
            price: None,
        })
        .collect()
}

/// The policy templates a fresh deployment starts with.
fn seed_templates() -> Vec<AvailablePolicy> {
    [("Poliza Bienes - Seguro Total", "Seguro Total"), ("Poliza Bienes - Seguro Parcial", "Seguro Parcial")]
        .into_iter()
        .map(|(name, coverage)| AvailablePolicy {
            id: AvailablePolicyId::new(),
            name: name.to_string(),
            coverages: sqlx::types::Json(vec![coverage.to_string()]),
        })
        .collect()
}

/// Seeds the catalog when it is empty.
///
/// Returns whether seeding ran.
///
/// # Errors
///
/// Returns error if any insert fails.
pub async fn seed_catalog(store: &dyn RecordStore) -> Result<bool> {
    if !store.catalog_is_empty().await? {
        return Ok(false);
    }

    for good in seed_goods() {
        store.create_available_good(good).await?;
    }
    for template in seed_templates() {
        store.create_available_policy(template).await?;
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn seeds_empty_catalog_once() {
        let store = MemoryStore::new();

        assert!(seed_catalog(&store).await.unwrap());
        assert_eq!(store.list_available_goods().await.unwrap().len(), 4);
        assert_eq!(store.list_available_policies().await.unwrap().len(), 2);

        // A second run must not duplicate rows
        assert!(!seed_catalog(&store).await.unwrap());
        assert_eq!(store.list_available_goods().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn seeded_templates_carry_coverages() {
        let store = MemoryStore::new();
        seed_catalog(&store).await.unwrap();

        let templates = store.list_available_policies().await.unwrap();
        assert!(templates.iter().any(|t| t.name == "Poliza Bienes - Seguro Total"
            && t.coverages() == ["Seguro Total".to_string()]));
    }
}
