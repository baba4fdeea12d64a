use std::sync::Arc;

use anyhow::{Context, Result};
use catalog_core::{
    FavoriteSet, HttpFetcher, InfiniteFeedController, MemoryLocation, PageCache,
    PaginationController,
};
use clap::{Parser, Subcommand};
use shared::{
    color,
    domain::{BeerId, BeerSummary},
};
use tracing::info;

mod config;

#[derive(Parser, Debug)]
#[command(name = "catalog", about = "Browse the beer catalog from the terminal")]
struct Args {
    /// API base URL; overrides catalog.toml and CATALOG_API_URL.
    #[arg(long)]
    api_url: Option<String>,
    /// Items per page; overrides catalog.toml and CATALOG_PER_PAGE.
    #[arg(long)]
    per_page: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show one page of the catalog.
    Page {
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Mark these record ids as favorites for this run.
        #[arg(long = "favorite")]
        favorites: Vec<i64>,
    },
    /// Stream the catalog page by page until the last page.
    Feed {
        /// Stop after this many pages even if more remain.
        #[arg(long)]
        max_pages: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    if let Some(per_page) = args.per_page {
        settings.per_page = per_page;
    }
    let api_url = config::validate_api_url(&settings.api_url)?;

    let fetcher = Arc::new(HttpFetcher::new(api_url.as_str()));
    let cache = PageCache::new(fetcher);

    match args.command {
        Command::Page { page, favorites } => {
            show_page(cache, settings.per_page, page, &favorites).await
        }
        Command::Feed { max_pages } => stream_feed(cache, settings.per_page, max_pages).await,
    }
}

async fn show_page(
    cache: Arc<PageCache>,
    per_page: u32,
    page: u32,
    favorite_ids: &[i64],
) -> Result<()> {
    let favorites = FavoriteSet::new();
    for id in favorite_ids {
        favorites.toggle(BeerId(*id));
    }

    let location = Arc::new(MemoryLocation::new());
    let controller = PaginationController::new(cache, location, per_page);
    controller
        .set_page(page)
        .await
        .context("failed to jump to the requested page")?;
    let loaded = controller
        .load_current()
        .await
        .context("failed to load the requested page")?;

    for beer in &loaded.items {
        println!("{}", render_line(beer, favorites.is_favorite(beer.id)));
    }

    let position = if loaded.has_next {
        "more pages follow"
    } else {
        "last page"
    };
    println!(
        "\npage {} · {} items · {position}",
        loaded.key.page,
        loaded.items.len()
    );
    Ok(())
}

async fn stream_feed(cache: Arc<PageCache>, per_page: u32, max_pages: Option<u32>) -> Result<()> {
    let feed = InfiniteFeedController::new(cache, per_page);
    let mut fetched = 0u32;

    loop {
        if max_pages.is_some_and(|limit| fetched >= limit) {
            break;
        }
        match feed
            .notify_near_end()
            .await
            .context("feed fetch failed")?
        {
            Some(page) => {
                fetched += 1;
                for beer in &page.items {
                    println!("{}", render_line(beer, false));
                }
            }
            None => break,
        }
    }

    let items = feed.items().await;
    info!(
        pages = feed.page_count().await,
        items = items.len(),
        exhausted = feed.is_exhausted().await,
        "feed complete"
    );
    Ok(())
}

fn render_line(beer: &BeerSummary, is_favorite: bool) -> String {
    let (swatch, hex) = match beer.ebc.map(|ebc| color::convert(ebc, 1.0)) {
        Some(rgb) => (
            format!("\x1b[38;2;{};{};{}m\u{2588}\u{2588}\x1b[0m", rgb.r, rgb.g, rgb.b),
            rgb.hex(),
        ),
        None => ("  ".to_string(), "-------".to_string()),
    };
    let abv = beer
        .abv
        .map(|abv| format!("{abv:.1}%"))
        .unwrap_or_else(|| "--".to_string());
    let mark = if is_favorite { "\u{2665}" } else { " " };
    format!(
        "{swatch} {hex} {mark} [{:>5}] {:<32} {:>6}  {}",
        beer.id.0, beer.name, abv, beer.tagline
    )
}
