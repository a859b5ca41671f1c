//! Sequential autorun over consecutive episode numbers.
//!
//! One cooperative task per sequence: rewrite the URL for the current
//! episode, resolve it, emit the result, advance. The only suspension
//! points are network calls and the politeness pauses between steps.

use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, sleep};

use super::SiteProfile;
use super::link::EpisodeDescriptor;
use super::pipeline::{EpisodeResolver, ResolutionOutcome, ResolvedEpisode};

/// Why a sequence stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The starting URL carries no detectable episode number.
    CannotDetermineEpisode,
    /// Rewriting the URL for the next episode failed.
    CannotBuildUrl,
    /// The next episode does not exist. The expected end of a run.
    EpisodeNotFound,
    /// Two transient faults in a row on the same episode.
    TransientError,
    /// The requester went away or asked to stop.
    Cancelled,
}

/// Sequencer state. Terminal states are never re-entered; a stopped
/// sequence can only be replaced by a brand-new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Active(u32),
    Stopped(StopReason),
}

/// One event emitted while a sequence runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerEvent {
    Resolved { episode: u32, result: ResolvedEpisode },
    Stopped { reason: StopReason },
}

pub struct EpisodeSequencer<R> {
    resolver: R,
    descriptor: EpisodeDescriptor,
    state: SequencerState,
    retry_pause: Duration,
    step_pause: Duration,
}

impl<R: EpisodeResolver> EpisodeSequencer<R> {
    pub fn new(resolver: R, descriptor: EpisodeDescriptor, profile: &SiteProfile) -> Self {
        let state = match descriptor.episode() {
            Some(episode) => SequencerState::Active(episode),
            None => SequencerState::Stopped(StopReason::CannotDetermineEpisode),
        };
        Self {
            resolver,
            descriptor,
            state,
            retry_pause: Duration::from_millis(profile.retry_pause_ms),
            step_pause: Duration::from_millis(profile.step_pause_ms),
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Runs one episode step. `None` once the sequence has stopped.
    pub async fn step(&mut self) -> Option<SequencerEvent> {
        let episode = match self.state {
            SequencerState::Active(episode) => episode,
            SequencerState::Stopped(_) => return None,
        };

        let Some(url) = self.descriptor.url_for(episode) else {
            return Some(self.stop(StopReason::CannotBuildUrl));
        };

        match self.resolver.resolve(&url).await {
            ResolutionOutcome::Found(result) => Some(self.advance(episode, result)),
            ResolutionOutcome::NotFound => Some(self.stop(StopReason::EpisodeNotFound)),
            ResolutionOutcome::Indeterminate => {
                // Transient: slightly longer pause, then one retry of the
                // same episode number.
                sleep(self.retry_pause).await;
                match self.resolver.resolve(&url).await {
                    ResolutionOutcome::Found(result) => Some(self.advance(episode, result)),
                    ResolutionOutcome::NotFound => Some(self.stop(StopReason::EpisodeNotFound)),
                    ResolutionOutcome::Indeterminate => {
                        Some(self.stop(StopReason::TransientError))
                    }
                }
            }
        }
    }

    fn advance(&mut self, episode: u32, result: ResolvedEpisode) -> SequencerEvent {
        self.state = SequencerState::Active(episode + 1);
        SequencerEvent::Resolved { episode, result }
    }

    fn stop(&mut self, reason: StopReason) -> SequencerEvent {
        tracing::debug!("Sequence stopped: {:?}", reason);
        self.state = SequencerState::Stopped(reason);
        SequencerEvent::Stopped { reason }
    }

    /// Drives the sequence to completion, forwarding events to `events`.
    ///
    /// The cancel flag is checked before every step and during the
    /// politeness pause, so a cancelled sequence never starts the next
    /// step's network calls; a step already in flight is dropped and its
    /// result discarded rather than emitted. A closed event receiver counts
    /// as cancellation.
    pub async fn run(
        mut self,
        events: mpsc::Sender<SequencerEvent>,
        mut cancel: watch::Receiver<bool>,
    ) -> SequencerState {
        loop {
            if *cancel.borrow_and_update() {
                self.state = SequencerState::Stopped(StopReason::Cancelled);
                return self.state;
            }

            let stepped = tokio::select! {
                event = self.step() => Some(event),
                _ = cancel.changed() => None,
            };
            let event = match stepped {
                Some(event) => event,
                None => {
                    self.state = SequencerState::Stopped(StopReason::Cancelled);
                    return self.state;
                }
            };
            let Some(event) = event else {
                // Started in a terminal state: surface the reason once.
                if let SequencerState::Stopped(reason) = self.state {
                    let _ = events.send(SequencerEvent::Stopped { reason }).await;
                }
                return self.state;
            };

            let stopped = matches!(event, SequencerEvent::Stopped { .. });
            if events.send(event).await.is_err() {
                self.state = SequencerState::Stopped(StopReason::Cancelled);
                return self.state;
            }
            if stopped {
                return self.state;
            }

            // Politeness pause toward the source site between episodes.
            let paused = tokio::select! {
                _ = sleep(self.step_pause) => true,
                _ = cancel.changed() => false,
            };
            if !paused {
                self.state = SequencerState::Stopped(StopReason::Cancelled);
                return self.state;
            }
        }
    }
}
