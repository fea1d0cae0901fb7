//! Example: Resolve YouTube tracks from the command line
//!
//! Run with:
//!   cargo run -p pmoyoutube --example resolve -- search "Daft Punk Around the World"
//!   cargo run -p pmoyoutube --example resolve -- track dQw4w9WgXcQ
//!   cargo run -p pmoyoutube --example resolve -- mix dQw4w9WgXcQ
//!   cargo run -p pmoyoutube --example resolve -- next dQw4w9WgXcQ [played_id...]
//!
//! Settings come from the PMOMusic configuration (`sources.youtube`).

use pmoconfig::get_config;
use pmoyoutube::{ErrorBody, Track, YoutubeClient, YoutubeConfigExt, YoutubeError};
use std::collections::HashSet;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: resolve <search|track|mix|next> <query or video id> [played ids...]";

fn print_track(track: &Track) {
    println!("{} ({})", track.title, track.video_id);
    println!("  artist:     {}", track.artist.as_deref().unwrap_or("-"));
    println!("  duration:   {}s", track.duration_ms / 1000);
    println!("  expires_at: {}", track.expires_at);
    println!("  stream:     {}", track.stream_url);
    if track.best_effort {
        println!("  (best effort: no audio-only rendition)");
    }
}

fn print_error(err: &YoutubeError) {
    let body = ErrorBody::from(err);
    match serde_json::to_string_pretty(&body) {
        Ok(json) => eprintln!("{} {}", err.http_status(), json),
        Err(_) => eprintln!("{}", err),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_config();

    // Initialize logging
    let level = config.get_log_min_level()?.to_lowercase();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    if !config.get_youtube_enabled()? {
        println!("YouTube source is disabled in the configuration");
        return Ok(());
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, rest) = match args.split_first() {
        Some((command, rest)) if !rest.is_empty() => (command.as_str(), rest),
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    let client = YoutubeClient::from_config()?;
    if let Some(version) = client.extractor_version().await {
        println!("Extractor: {} {}\n", client.extractor().name(), version);
    }

    let result = match command {
        "search" => client.resolve_by_query(&rest.join(" ")).await.map(|t| print_track(&t)),
        "track" => client.resolve_by_id(&rest[0]).await.map(|t| print_track(&t)),
        "mix" => client.get_recommendation_set(&rest[0]).await.map(|mix| {
            println!("Mix {} ({} candidates)", mix.mix_id, mix.video_ids.len());
            for (i, id) in mix.video_ids.iter().enumerate() {
                println!("  {:2}. {}", i + 1, id);
            }
        }),
        "next" => {
            let played: HashSet<String> = rest[1..].iter().cloned().collect();
            client
                .get_next_track(&rest[0], &played)
                .await
                .map(|t| print_track(&t))
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    if let Err(err) = result {
        print_error(&err);
        std::process::exit(1);
    }

    Ok(())
}
