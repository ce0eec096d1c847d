mod genres;
mod google_books;
mod merger;

pub use genres::{find_genre, Genre, GENRES};
pub use google_books::GoogleBooksClient;
pub use merger::{merge_entries, CatalogCacheMerger, FRESHNESS_WINDOW_HOURS};
