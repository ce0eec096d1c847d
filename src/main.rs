use inkreads::catalog::GENRES;
use inkreads::error::{AppError, Result};
use inkreads::models::{NewReview, ReviewRecord, TargetKind, VoteType};
use inkreads::{App, Config};

const USAGE: &str = "usage: inkreads [--user <id>] <command>

commands:
  genres                              list browsable genres
  genre <key> [--refresh]             show a genre listing
  tag <genre> <entry-id> <tags>       attach comma-separated tags to a cached entry
  reviews <book-id> [--page-size N] [--all]
                                      show reviews of a book, newest first
  review <book-id> <text>             post a review
  delete-review <review-id>           delete a review
  vote <kind> <target-id> <up|down>   toggle a vote (kind: book, review, fanfiction, comment)";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let user_override = take_flag_value(&mut args, "--user");

    let config = Config::load()?;
    let user_id = user_override.or_else(|| config.user_id.clone());

    let Some((command, rest)) = args.split_first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let app = App::new(config).await?;

    let result = run(&app, command, rest, user_id.as_deref()).await;
    app.wait_background().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(app: &App, command: &str, rest: &[String], user_id: Option<&str>) -> Result<()> {
    match (command, rest) {
        ("genres", _) => {
            for genre in GENRES {
                println!("{:<12} {:<14} {}", genre.key, genre.title, genre.description);
            }
        }

        ("genre", [key, flags @ ..]) => {
            let entries = if flags.iter().any(|f| f == "--refresh") {
                app.refresh_genre(key).await?
            } else {
                let listing = app.genre_listing(key).await?;
                tracing::debug!("Genre {} served as {:?}", key, listing.freshness);
                listing.entries
            };

            let ids: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
            let counts = app.aggregator.counts(TargetKind::Book, &ids).await?;
            for entry in &entries {
                let upvotes = counts.get(&entry.id).map(|c| c.upvotes).unwrap_or_default();
                let tags = if entry.local_tags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", entry.local_tags.join(", "))
                };
                println!(
                    "{:>4}  {}  {} by {}{}",
                    upvotes,
                    entry.id,
                    entry.title,
                    entry.authors.join(", "),
                    tags
                );
            }
        }

        ("tag", [genre, entry_id, tags]) => {
            let tags = tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            app.catalog.curate_tags(genre, entry_id, tags).await?;
            println!("Tagged {} in {}", entry_id, genre);
        }

        ("reviews", [book_id, flags @ ..]) => {
            let mut flags = flags.to_vec();
            let page_size = page_size_flag(&mut flags, app.config.review_page_size)?;
            let follow_all = flags.iter().any(|f| f == "--all");
            let mut cursor: Option<ReviewRecord> = None;

            loop {
                let page = app.reviews.get_page(book_id, page_size, cursor.as_ref()).await?;
                print_reviews(app, &page.reviews, user_id).await?;

                if !page.has_more {
                    break;
                }
                if !follow_all {
                    println!("(more reviews available, pass --all to show them)");
                    break;
                }
                match page.reviews.last() {
                    Some(last) => cursor = Some(last.clone()),
                    None => break,
                }
            }
        }

        ("review", [book_id, words @ ..]) if !words.is_empty() => {
            let author_id = user_id.ok_or(AppError::Unauthorized)?;
            let record = app
                .reviews
                .append(NewReview {
                    book_id: book_id.clone(),
                    author_id: author_id.to_string(),
                    author_display_name: app.config.display_name.clone().unwrap_or_default(),
                    content: words.join(" "),
                })
                .await?;
            println!("Posted review {} at {}", record.id, record.created_at);
        }

        ("delete-review", [review_id]) => {
            let id: i64 = review_id
                .parse()
                .map_err(|_| AppError::InvalidInput(format!("'{}' is not a review id", review_id)))?;
            app.reviews.remove(id).await?;
            println!("Deleted review {}", id);
        }

        ("vote", [kind, target_id, vote]) => {
            let kind: TargetKind = kind.parse()?;
            let vote: VoteType = vote.parse()?;
            let counts = app
                .ledger
                .toggle_vote(kind, target_id, user_id.unwrap_or_default(), vote)
                .await?;
            println!("{} {}: +{} / -{}", kind, target_id, counts.upvotes, counts.downvotes);
        }

        _ => println!("{}", USAGE),
    }

    Ok(())
}

async fn print_reviews(app: &App, reviews: &[ReviewRecord], user_id: Option<&str>) -> Result<()> {
    let ids: Vec<String> = reviews.iter().map(|r| r.id.to_string()).collect();
    let counts = app.aggregator.counts(TargetKind::Review, &ids).await?;
    let states = match user_id {
        Some(user) => app.aggregator.user_vote_states(TargetKind::Review, &ids, user).await?,
        None => Default::default(),
    };

    for (review, id) in reviews.iter().zip(&ids) {
        let c = counts.get(id).copied().unwrap_or_default();
        let mine = states.get(id).copied().unwrap_or_default();
        println!(
            "#{} {} ({}) +{}/-{} {:?}\n    {}",
            review.id,
            review.author_display_name,
            review.created_at.format("%Y-%m-%d %H:%M"),
            c.upvotes,
            c.downvotes,
            mine,
            review.content
        );
    }
    Ok(())
}

/// `--page-size N` from `flags`, or `default` when absent.
fn page_size_flag(flags: &mut Vec<String>, default: usize) -> Result<usize> {
    if !flags.iter().any(|f| f == "--page-size") {
        return Ok(default);
    }
    let value = take_flag_value(flags, "--page-size")
        .ok_or_else(|| AppError::InvalidInput("--page-size needs a value".to_string()))?;
    match value.parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(AppError::InvalidInput(format!(
            "'{}' is not a valid page size",
            value
        ))),
    }
}

/// Remove `--flag value` from `args`, returning the value.
fn take_flag_value(args: &mut Vec<String>, flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    if pos + 1 >= args.len() {
        args.remove(pos);
        return None;
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Some(value)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn page_size_defaults_to_config() {
        let mut flags = args(&["--all"]);
        assert_eq!(page_size_flag(&mut flags, 10).unwrap(), 10);
        assert_eq!(flags, args(&["--all"]));
    }

    #[test]
    fn page_size_flag_overrides_and_is_consumed() {
        let mut flags = args(&["--page-size", "3", "--all"]);
        assert_eq!(page_size_flag(&mut flags, 10).unwrap(), 3);
        assert_eq!(flags, args(&["--all"]));
    }

    #[test]
    fn page_size_rejects_zero_missing_and_garbage() {
        for bad in [&["--page-size", "0"][..], &["--page-size"], &["--page-size", "ten"]] {
            let err = page_size_flag(&mut args(bad), 10).unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)), "{:?}", bad);
        }
    }
}
