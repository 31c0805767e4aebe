use crate::errors::CatalogError;
use crate::item::{CatalogItem, NewItem};

/// Durable storage for catalog items. Every method completes its write before
/// returning, so callers can treat a returned `Ok` as catalog truth.
pub trait CatalogStore: Send + Sync {
    fn list(&self) -> Result<Vec<CatalogItem>, CatalogError>;
    fn count(&self) -> Result<usize, CatalogError>;
    /// Appends a new item, assigning `max(id) + 1`.
    fn append(&self, draft: NewItem, date_added: String) -> Result<CatalogItem, CatalogError>;
    /// Removes the item with `id` and reports whether it existed. Removing an
    /// unknown id is not an error.
    fn remove(&self, id: u64) -> Result<bool, CatalogError>;
    fn update_progress(&self, id: u64, progress: u32) -> Result<CatalogItem, CatalogError>;
}

/// Simple in-memory catalog for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    items: parking_lot::RwLock<Vec<CatalogItem>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<CatalogItem>) -> Self {
        Self {
            items: parking_lot::RwLock::new(items),
        }
    }
}

impl CatalogStore for MemoryCatalog {
    fn list(&self) -> Result<Vec<CatalogItem>, CatalogError> {
        Ok(self.items.read().clone())
    }

    fn count(&self) -> Result<usize, CatalogError> {
        Ok(self.items.read().len())
    }

    fn append(&self, draft: NewItem, date_added: String) -> Result<CatalogItem, CatalogError> {
        let mut items = self.items.write();
        let id = items.iter().map(|item| item.id).max().unwrap_or(0) + 1;
        let item = CatalogItem::from_draft(id, draft, date_added);
        items.push(item.clone());
        Ok(item)
    }

    fn remove(&self, id: u64) -> Result<bool, CatalogError> {
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|item| item.id != id);
        Ok(items.len() < before)
    }

    fn update_progress(&self, id: u64, progress: u32) -> Result<CatalogItem, CatalogError> {
        let mut items = self.items.write();
        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(CatalogError::ItemNotFound(id))?;
        item.progress = progress;
        Ok(item.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_stay_unique_after_removal() {
        let catalog = MemoryCatalog::new();
        for title in ["Alien", "Aliens", "Alien 3"] {
            catalog.append(NewItem::new(title), String::new()).expect("append");
        }
        assert!(catalog.remove(2).expect("remove"));
        let added = catalog.append(NewItem::new("Prometheus"), String::new()).expect("append");
        assert_eq!(added.id, 4);
        assert_eq!(catalog.count().expect("count"), 3);
    }

    #[test]
    fn removing_unknown_id_keeps_items() {
        let catalog = MemoryCatalog::new();
        catalog.append(NewItem::new("Heat"), String::new()).expect("append");
        assert!(!catalog.remove(99).expect("remove"));
        assert_eq!(catalog.count().expect("count"), 1);
    }

    #[test]
    fn progress_update_requires_existing_item() {
        let catalog = MemoryCatalog::new();
        let item = catalog.append(NewItem::new("Heat"), String::new()).expect("append");
        let updated = catalog.update_progress(item.id, 42).expect("update");
        assert_eq!(updated.progress, 42);
        assert!(matches!(
            catalog.update_progress(7, 1),
            Err(CatalogError::ItemNotFound(7))
        ));
    }

    #[test]
    fn preloaded_catalog_continues_after_highest_id() {
        let seeded = vec![
            CatalogItem::from_draft(3, NewItem::new("Ronin"), "2025-01-02"),
            CatalogItem::from_draft(9, NewItem::new("Heat"), "2025-01-03"),
        ];
        let catalog = MemoryCatalog::with_items(seeded);
        let added = catalog.append(NewItem::new("Collateral"), String::new()).expect("append");
        assert_eq!(added.id, 10);
    }
}
