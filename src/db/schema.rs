pub const SCHEMA: &str = r#"
-- vote_ledgers table (one row per voted-on target)
CREATE TABLE IF NOT EXISTS vote_ledgers (
    target_kind TEXT NOT NULL,
    target_id TEXT NOT NULL,
    upvoters TEXT NOT NULL DEFAULT '[]',
    downvoters TEXT NOT NULL DEFAULT '[]',
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (target_kind, target_id)
);

-- reviews table (created_at is microseconds since the epoch)
CREATE TABLE IF NOT EXISTS reviews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    book_id TEXT NOT NULL,
    author_id TEXT NOT NULL,
    author_display_name TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reviews_book_created ON reviews(book_id, created_at DESC, id DESC);

-- catalog_cache table (one merged listing per genre)
CREATE TABLE IF NOT EXISTS catalog_cache (
    genre_key TEXT PRIMARY KEY,
    entries TEXT NOT NULL,
    last_refreshed_at TEXT NOT NULL
);
"#;
