mod messages;
mod requests;
mod resolver;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

use crate::requests::{PendingAutorun, RequesterGate};
use crate::resolver::SiteProfile;
use crate::resolver::link::{EpisodeDescriptor, looks_like_series};
use crate::resolver::pipeline::{EpisodeResolver, ResolutionOutcome, ResolvedEpisode, SitePipeline};
use crate::resolver::sequencer::{EpisodeSequencer, SequencerEvent};

/// Profile from the environment, defaulting to the built-in site constants.
fn load_profile() -> Result<SiteProfile> {
    match std::env::var("RESOLVER_PROFILE") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read profile {}", path))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse profile {}", path))
        }
        Err(_) => Ok(SiteProfile::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let url = std::env::args()
        .nth(1)
        .with_context(|| format!("Usage: arabseed_resolver <content-url>\n{}", messages::HELP))?;
    let profile = load_profile()?;

    // This binary stands in for the chat transport: same token handshake
    // and yes/no question, stdin instead of inline buttons, a single local
    // requester instead of chat ids.
    let pending = PendingAutorun::new();
    let gate = RequesterGate::new();
    let Some(_slot) = gate.try_acquire(0) else {
        println!("{}", messages::BUSY);
        return Ok(());
    };

    if looks_like_series(&url, &profile) {
        let descriptor = EpisodeDescriptor::parse(&url).context("Invalid content URL")?;
        tracing::debug!("Queued autorun question for {}", descriptor.url());
        let token = pending.insert(descriptor);
        tracing::debug!("Pending autorun questions: {}", pending.len());

        println!("{}", messages::AUTORUN_QUESTION);
        let mut answer = String::new();
        std::io::stdin()
            .read_line(&mut answer)
            .context("Failed to read the answer")?;

        let Some(descriptor) = pending.take(&token) else {
            println!("{}", messages::EXPIRED);
            return Ok(());
        };
        if answer.trim().eq_ignore_ascii_case("y") {
            println!("{}", messages::AUTORUN_STARTED);
            run_autorun(profile, descriptor).await;
            return Ok(());
        }
    }

    println!("{}", messages::SINGLE_STARTED);
    resolve_single(&profile, &url).await;
    Ok(())
}

async fn resolve_single(profile: &SiteProfile, url: &str) {
    let pipeline = SitePipeline::new(profile.clone());
    match pipeline.resolve(url).await {
        ResolutionOutcome::Found(result) => print_result(&result, None),
        ResolutionOutcome::NotFound => println!("{}", messages::NOT_FOUND),
        ResolutionOutcome::Indeterminate => println!("{}", messages::TRANSIENT),
    }
}

async fn run_autorun(profile: SiteProfile, descriptor: EpisodeDescriptor) {
    let mut next_episode = descriptor.episode();

    let (events_tx, mut events_rx) = mpsc::channel(8);
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let sequencer =
        EpisodeSequencer::new(SitePipeline::new(profile.clone()), descriptor, &profile);
    let runner = tokio::spawn(sequencer.run(events_tx, cancel_rx));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancelled = false;

    loop {
        tokio::select! {
            event = events_rx.recv() => match event {
                Some(SequencerEvent::Resolved { episode, result }) => {
                    next_episode = Some(episode + 1);
                    print_result(&result, Some(episode));
                }
                Some(SequencerEvent::Stopped { reason }) => {
                    println!("{}", messages::stop_message(reason, next_episode));
                    break;
                }
                None => break,
            },
            _ = &mut ctrl_c, if !cancelled => {
                tracing::info!("Cancelling the running sequence");
                cancelled = true;
                let _ = cancel_tx.send(true);
            }
        }
    }

    let _ = runner.await;
}

fn print_result(result: &ResolvedEpisode, episode: Option<u32>) {
    println!("{}", messages::result_header(result, episode));
    for candidate in &result.candidates {
        println!("  {}  {}", candidate.label(), candidate.direct_link);
    }
}
