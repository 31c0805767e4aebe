mod sqlite;

pub use sqlite::DbCatalog;
