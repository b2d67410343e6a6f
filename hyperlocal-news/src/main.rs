use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hyperlocal_news::locations::{set_area_location, unmapped_areas};
use hyperlocal_news::{
    submit_post, AppConfig, AppContext, AreaFeed, PgNewsStore, ReclassifyOptions, RegenerateOptions,
    ResolveStatus,
};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Hyperlocal news: resident posts in, generated articles out")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Resolve an area name, creating it when nothing is close
    Resolve { name: String },
    /// Submit a resident post
    Post {
        area: String,
        content: String,
        #[arg(short, long)]
        reporter: Option<String>,
    },
    /// Generate articles from the posts that arrived since the last run
    Generate { area: String },
    /// Rebuild articles from all posts, ignoring the watermark
    Regenerate {
        #[arg(long)]
        area: Vec<String>,
        #[arg(long)]
        skip_existing_check: bool,
    },
    /// Refresh cover images of every article
    UpdateCoverImages,
    /// Submit a classified advertisement
    Advertise {
        area: String,
        content: String,
        #[arg(short, long)]
        advertiser: Option<String>,
    },
    /// Re-run categorization over stored advertisements
    ReclassifyAds {
        #[arg(long)]
        area: Option<String>,
        #[arg(long, default_value_t = 10)]
        batch_size: usize,
        #[arg(long, default_value_t = 1.0)]
        delay: f64,
        #[arg(long)]
        dry_run: bool,
    },
    /// Set an area's coordinates
    SetLocation { area: String, latitude: f64, longitude: f64 },
    /// List areas without coordinates
    ListUnmapped {
        #[arg(long)]
        show_zero: bool,
    },
    /// Show what an area page would list
    Feed { area: String },
    /// Most viewed articles
    Trending {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    if let Commands::Migrate = cli.command {
        let store = PgNewsStore::new(&config.database_url)
            .await
            .context("failed to connect to the database")?;
        store.migrate().await?;
        info!("Migrations applied");
        return Ok(());
    }

    let ctx = AppContext::connect(&config)
        .await
        .context("failed to connect to the database")?;

    match cli.command {
        Commands::Migrate => {}
        Commands::Resolve { name } => {
            let resolution = ctx.resolver().resolve(&name).await?;
            println!("{:?}: '{}' (id {}, ratio {:.2})", resolution.status, resolution.area.name, resolution.area.id, resolution.ratio);
            if let Some(suggestion) = resolution.suggestion {
                println!("Did you mean '{}'?", suggestion);
            }
        }
        Commands::Post { area, content, reporter } => {
            let (post, resolution) = submit_post(ctx.store.clone(), &area, &content, reporter.as_deref()).await?;
            println!("Stored post {} in '{}'", post.id, resolution.area.name);
            if resolution.status == ResolveStatus::Suggested {
                if let Some(suggestion) = resolution.suggestion {
                    println!("Did you mean '{}'?", suggestion);
                }
            }
        }
        Commands::Generate { area } => {
            let outcome = ctx.pipeline().generate(&area).await?;
            println!("Created {} articles", outcome.created_count);
            for article in &outcome.articles {
                println!("  [{}] {} ({})", article.id, article.title, article.category);
            }
        }
        Commands::Regenerate { area, skip_existing_check } => {
            let options = RegenerateOptions {
                area_names: area,
                skip_existing_check,
            };
            let report = ctx.pipeline().regenerate(&options).await?;
            println!(
                "Processed {} areas, skipped {}, created {} articles",
                report.areas_processed, report.areas_skipped, report.articles_created
            );
        }
        Commands::UpdateCoverImages => {
            let report = ctx.pipeline().update_cover_images().await?;
            println!(
                "{} articles: {} updated, {} unchanged, {} failed, {} skipped",
                report.total, report.updated, report.unchanged, report.failed, report.skipped
            );
        }
        Commands::Advertise { area, content, advertiser } => {
            let (ad, resolution) = ctx
                .ad_board()
                .submit_advertisement(&area, &content, advertiser.as_deref())
                .await?;
            println!("Stored advertisement {} in '{}' as {}", ad.id, resolution.area.name, ad.category);
        }
        Commands::ReclassifyAds { area, batch_size, delay, dry_run } => {
            let options = ReclassifyOptions {
                area,
                batch_size,
                delay: Duration::try_from_secs_f64(delay).context("invalid --delay")?,
                dry_run,
            };
            let report = ctx.ad_board().reclassify(&options).await?;
            println!(
                "Processed {}: {} updated, {} unchanged, {} errors",
                report.processed, report.updated, report.unchanged, report.errors
            );
            if dry_run {
                println!("This was a dry run. Use without --dry-run to apply changes.");
            }
        }
        Commands::SetLocation { area, latitude, longitude } => {
            let area = set_area_location(ctx.store.as_ref(), &area, latitude, longitude).await?;
            println!("Updated location for '{}' to ({}, {})", area.name, latitude, longitude);
        }
        Commands::ListUnmapped { show_zero } => {
            let areas = unmapped_areas(ctx.store.as_ref(), show_zero).await?;
            if areas.is_empty() {
                println!("All areas have latitude and longitude set.");
            }
            for area in areas {
                let fmt_coord = |c: Option<f64>| c.map(|v| v.to_string()).unwrap_or_else(|| "NULL".to_string());
                println!(
                    "- {} (id={}) -> lat: {}, lon: {}",
                    area.name,
                    area.id,
                    fmt_coord(area.latitude),
                    fmt_coord(area.longitude)
                );
            }
        }
        Commands::Feed { area } => match ctx.area_feed().for_area(&area).await? {
            AreaFeed::Local(articles) => {
                for article in articles {
                    println!("[{}] {} ({} likes)", article.id, article.title, article.likes);
                }
            }
            AreaFeed::External(stories) => {
                if stories.is_empty() {
                    error!("No local articles and no outside news for '{}'", area);
                }
                for story in stories {
                    println!("{} <{}>", story.title, story.url);
                }
            }
        },
        Commands::Trending { limit } => {
            for article in ctx.page_views().trending_articles(limit).await? {
                println!("[{}] {}", article.id, article.title);
            }
        }
    }

    Ok(())
}
