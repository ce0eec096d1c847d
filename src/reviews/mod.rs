mod feed;

pub use feed::ReviewFeed;
