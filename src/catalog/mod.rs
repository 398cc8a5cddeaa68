mod catalog;
mod song;

pub use catalog::{Catalog, CatalogFile};
pub use song::SongMetadata;
