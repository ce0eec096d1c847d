use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Genre {
    pub key: &'static str,
    pub title: &'static str,
    /// Query sent to the catalog provider for this genre's listing.
    pub query: &'static str,
    pub description: &'static str,
}

pub const GENRES: &[Genre] = &[
    Genre {
        key: "lightnovels",
        title: "Light Novels",
        query: "light novel",
        description: "Explore Japanese light novels and their translations",
    },
    Genre {
        key: "novels",
        title: "Novels",
        query: "novel",
        description: "Discover traditional novels across all genres",
    },
    Genre {
        key: "comics",
        title: "Comics",
        query: "comic",
        description: "Browse comics, graphic novels, and manga",
    },
    Genre {
        key: "fanfiction",
        title: "Fanfiction",
        query: "fanfiction",
        description: "Read fan-created stories from your favorite universes",
    },
];

pub fn find_genre(key: &str) -> Result<&'static Genre> {
    GENRES
        .iter()
        .find(|g| g.key == key)
        .ok_or_else(|| AppError::NotFound(format!("genre '{}'", key)))
}
