/// Domain errors for ReelTrack core
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Item {0} not found")]
    ItemNotFound(u64),

    #[error("Catalog storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("Authentication required")]
    Unauthenticated,
}
