//! # Playback Pipeline
//!
//! Drives one track at a time from a [`ByteSource`] through a fresh
//! [`DfpwmDecoder`] into a [`SampleBuffer`], then hands the completed buffer to
//! the host's [`AudioSink`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        PlaybackPipeline::play(url)      │
//! │                                         │
//! │  1. Bump generation, cancel old token   │
//! │  2. Open stream (cache, then source)    │
//! │  3. Read chunk ─▶ decode ─▶ append      │
//! │     (append only if still current)      │
//! └────────────┬────────────────────────────┘
//!              │ completed PcmBuffer
//!              ▼
//! ┌─────────────────────────────────────────┐
//! │     AudioSink::load, then play()        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Cancellation
//!
//! Every request is tagged with a generation id taken from a monotonically
//! increasing counter. A newer request, [`abort`](PlaybackPipeline::abort) or
//! [`stop`](PlaybackPipeline::stop) advances the counter and cancels the old
//! request's token. The old request notices within one chunk: either its
//! pending read loses the `select!` race against the token, or its next append
//! is refused because the generation no longer matches. It then aborts its
//! stream and returns [`PlaybackOutcome::Superseded`], never an error.
//!
//! Generation checks and buffer mutations happen under one lock, and that lock
//! is never held across an `.await`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::{PlaybackOutcome, PlaybackPipeline, StreamingConfig};
//!
//! let pipeline = PlaybackPipeline::new(source, sink, StreamingConfig::default())?;
//! match pipeline.play("https://music.example/track.dfpwm").await? {
//!     PlaybackOutcome::Completed(pcm) => println!("{:?} of audio", pcm.duration()),
//!     PlaybackOutcome::Superseded { .. } => {}
//! }
//! ```

use crate::config::{StreamingConfig, StreamingState, StreamingStats};
use crate::decoder::DfpwmDecoder;
use crate::error::{PlaybackError, Result};
use crate::sample_buffer::SampleBuffer;
#[cfg(feature = "offline-cache")]
use crate::cache::{CacheConfig, TrackCache};
use bridge_traits::{AudioSink, BridgeError, ByteSource, ByteStream, PcmBuffer};
use bytes::BytesMut;
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

// ============================================================================
// Outcome Types
// ============================================================================

/// How a [`PlaybackPipeline::play`] call ended, short of a transport failure.
#[derive(Debug, Clone)]
pub enum PlaybackOutcome {
    /// The whole track was decoded and handed to the sink.
    Completed(PcmBuffer),
    /// A newer request or an abort replaced this one first.
    Superseded { generation: u64 },
}

impl PlaybackOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// The decoded buffer, if the track completed.
    pub fn into_pcm(self) -> Option<PcmBuffer> {
        match self {
            Self::Completed(pcm) => Some(pcm),
            Self::Superseded { .. } => None,
        }
    }
}

// ============================================================================
// Shared State
// ============================================================================

struct CurrentTrack {
    generation: u64,
    url: String,
    buffer: SampleBuffer,
    token: CancellationToken,
}

struct Shared {
    track: Option<CurrentTrack>,
    state: StreamingState,
}

/// Streaming decode-and-play pipeline for a single current track.
pub struct PlaybackPipeline {
    source: Arc<dyn ByteSource>,
    sink: Arc<dyn AudioSink>,
    config: StreamingConfig,
    #[cfg(feature = "offline-cache")]
    cache: Option<Arc<TrackCache>>,
    event_bus: Option<EventBus>,
    /// Latest issued generation. Only advanced while `shared` is locked.
    generation: AtomicU64,
    shared: Mutex<Shared>,
    /// Serializes sink handoff (load, play) against `stop`.
    handoff: tokio::sync::Mutex<()>,
    stats: Mutex<StreamingStats>,
}

impl PlaybackPipeline {
    /// Create a pipeline reading from `source` and playing through `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidConfig`] if `config` fails validation.
    pub fn new(
        source: Arc<dyn ByteSource>,
        sink: Arc<dyn AudioSink>,
        config: StreamingConfig,
    ) -> Result<Self> {
        config.validate().map_err(PlaybackError::InvalidConfig)?;

        Ok(Self {
            source,
            sink,
            config,
            #[cfg(feature = "offline-cache")]
            cache: None,
            event_bus: None,
            generation: AtomicU64::new(0),
            shared: Mutex::new(Shared {
                track: None,
                state: StreamingState::Idle,
            }),
            handoff: tokio::sync::Mutex::new(()),
            stats: Mutex::new(StreamingStats::default()),
        })
    }

    /// Build a pipeline from the runtime configuration.
    ///
    /// Creates an event bus sized by `event_buffer_size` and, when a blob
    /// store is configured and the offline cache is enabled, a [`TrackCache`].
    pub fn from_core_config(core: &CoreConfig, config: StreamingConfig) -> Result<Self> {
        let event_bus = EventBus::new(core.event_buffer_size);
        let pipeline = Self::new(core.byte_source.clone(), core.audio_sink.clone(), config)?
            .with_event_bus(event_bus.clone());

        #[cfg(feature = "offline-cache")]
        let pipeline = match &core.blob_store {
            Some(store) if core.features.enable_offline_cache => pipeline.with_cache(
                TrackCache::new(store.clone(), CacheConfig::default()).with_event_bus(event_bus),
            ),
            _ => pipeline,
        };

        Ok(pipeline)
    }

    /// Serve repeat requests from `cache` and store completed network tracks in it.
    #[cfg(feature = "offline-cache")]
    pub fn with_cache(mut self, cache: TrackCache) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Publish `PlaybackEvent`s on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    #[cfg(feature = "offline-cache")]
    pub fn cache(&self) -> Option<&TrackCache> {
        self.cache.as_deref()
    }

    pub fn event_bus(&self) -> Option<&EventBus> {
        self.event_bus.as_ref()
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Latest generation id issued by `play`, `abort` or `stop`.
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// URL of the track currently held by the pipeline.
    pub fn current_url(&self) -> Option<String> {
        self.shared.lock().track.as_ref().map(|t| t.url.clone())
    }

    /// Handle to the current track's buffer, partial or complete.
    pub fn current_buffer(&self) -> Option<SampleBuffer> {
        self.shared.lock().track.as_ref().map(|t| t.buffer.clone())
    }

    pub fn state(&self) -> StreamingState {
        self.shared.lock().state
    }

    pub fn stats(&self) -> StreamingStats {
        self.stats.lock().clone()
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// Fetch, decode and play `url`, superseding any request in flight.
    ///
    /// Resolves once the track is fully decoded and handed to the sink, or as
    /// soon as a newer request replaces it.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::Transport`] if the stream cannot be opened, fails
    ///   mid-read or stalls longer than `read_timeout`
    /// - [`PlaybackError::Sink`] if the sink rejects the completed buffer
    #[instrument(skip(self, url), fields(url = %redact_url(url)))]
    pub async fn play(&self, url: &str) -> Result<PlaybackOutcome> {
        let buffer = SampleBuffer::with_capacity(
            self.config.sample_rate,
            self.config.initial_capacity_samples(),
        );
        let token = CancellationToken::new();

        let generation = {
            let mut shared = self.shared.lock();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(previous) = shared.track.replace(CurrentTrack {
                generation,
                url: url.to_string(),
                buffer: buffer.clone(),
                token: token.clone(),
            }) {
                previous.token.cancel();
            }
            shared.state = StreamingState::Buffering;
            generation
        };

        self.stats.lock().tracks_requested += 1;
        info!(generation, "Playback requested");
        self.emit(PlaybackEvent::Requested {
            generation,
            url: redact_url(url),
        });

        let cached = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(self.superseded(generation)),
            cached = self.open_cached(url) => cached,
        };

        let (mut stream, from_cache) = match cached {
            Some(stream) => (stream, true),
            None => {
                let opened = tokio::select! {
                    biased;
                    _ = token.cancelled() => return Ok(self.superseded(generation)),
                    opened = self.source.open(url) => opened,
                };
                match opened {
                    Ok(stream) => (stream, false),
                    Err(e) => return self.fail(generation, url, e),
                }
            }
        };

        {
            let mut shared = self.shared.lock();
            if !self.is_current(&shared, generation) {
                drop(shared);
                stream.abort();
                return Ok(self.superseded(generation));
            }
            shared.state = StreamingState::Streaming;
        }

        // Compressed body kept for the write-behind cache.
        let mut body = (!from_cache && self.caches_writes()).then(BytesMut::new);
        let mut decoder = DfpwmDecoder::new();
        let mut decoded = Vec::new();

        loop {
            let read = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                read = tokio::time::timeout(self.config.read_timeout, stream.next_chunk()) => Some(read),
            };

            let chunk = match read {
                None => {
                    stream.abort();
                    return Ok(self.superseded(generation));
                }
                Some(Err(_elapsed)) => Err(BridgeError::Timeout(self.config.read_timeout)),
                Some(Ok(chunk)) => chunk,
            };

            match chunk {
                Ok(Some(bytes)) => {
                    self.stats.lock().total_bytes_received += bytes.len() as u64;

                    decoded.clear();
                    decoder.decode_into(&bytes, &mut decoded);
                    if !self.append_if_current(generation, &decoded) {
                        stream.abort();
                        return Ok(self.superseded(generation));
                    }
                    if let Some(body) = body.as_mut() {
                        body.extend_from_slice(&bytes);
                    }
                    debug!(generation, bytes = bytes.len(), samples = decoded.len(), "Decoded chunk");
                }
                Ok(None) => break,
                Err(e) => {
                    stream.abort();
                    return self.fail(generation, url, e);
                }
            }
        }

        let pcm = {
            let mut shared = self.shared.lock();
            if !self.is_current(&shared, generation) {
                drop(shared);
                return Ok(self.superseded(generation));
            }
            let Some(track) = shared.track.as_ref() else {
                return Err(PlaybackError::Internal("current track vanished".to_string()));
            };
            track.buffer.mark_complete();
            let pcm = track.buffer.to_pcm();
            shared.state = StreamingState::Completed;
            pcm
        };

        {
            // Held through load and play so stop() cannot interleave with the handoff.
            let _handoff = self.handoff.lock().await;

            let current = self.is_current(&self.shared.lock(), generation);
            if !current {
                debug!(generation, "Superseded before handoff, not loading sink");
                return Ok(self.superseded(generation));
            }

            self.sink
                .load(pcm.clone())
                .await
                .map_err(PlaybackError::Sink)?;

            let current = self.is_current(&self.shared.lock(), generation);
            if !current {
                debug!(generation, "Superseded while loading, not starting sink");
                return Ok(self.superseded(generation));
            }

            {
                let mut stats = self.stats.lock();
                stats.tracks_completed += 1;
                if from_cache {
                    stats.cache_hits += 1;
                }
            }
            let duration_ms = pcm.duration().as_millis() as u64;
            info!(generation, samples = pcm.len(), duration_ms, from_cache, "Track decoded");
            self.emit(PlaybackEvent::Completed {
                generation,
                url: redact_url(url),
                samples: pcm.len() as u64,
                duration_ms,
                from_cache,
            });

            if self.config.autoplay {
                self.sink.play().await.map_err(PlaybackError::Sink)?;

                let mut shared = self.shared.lock();
                if self.is_current(&shared, generation) {
                    shared.state = StreamingState::Playing;
                }
                drop(shared);

                self.emit(PlaybackEvent::Started {
                    generation,
                    url: redact_url(url),
                });
            }
        }

        if let Some(body) = body {
            self.store_cached(url, body).await;
        }

        Ok(PlaybackOutcome::Completed(pcm))
    }

    /// Invalidate any request in flight.
    ///
    /// An unfinished track's partial buffer is discarded and the state returns
    /// to `Idle`. A completed track, its buffer and the state are left as they
    /// are. Safe to call any number of times.
    pub fn abort(&self) {
        let generation = self.abort_inner();
        debug!(generation, "Playback aborted");
    }

    /// Abort any request in flight and stop the sink.
    pub async fn stop(&self) -> Result<()> {
        let generation = self.abort_inner();
        self.shared.lock().state = StreamingState::Stopped;

        let _handoff = self.handoff.lock().await;
        self.sink.stop().await.map_err(PlaybackError::Sink)?;

        info!(generation, "Playback stopped");
        self.emit(PlaybackEvent::Stopped { generation });
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn abort_inner(&self) -> u64 {
        let mut shared = self.shared.lock();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let in_flight = shared
            .track
            .as_ref()
            .is_some_and(|track| !track.buffer.is_complete());

        if let Some(track) = shared.track.as_ref() {
            track.token.cancel();
        }
        if in_flight {
            shared.track = None;
            shared.state = StreamingState::Idle;
        }
        generation
    }

    fn is_current(&self, shared: &Shared, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
            && shared
                .track
                .as_ref()
                .is_some_and(|track| track.generation == generation)
    }

    fn append_if_current(&self, generation: u64, samples: &[f32]) -> bool {
        let shared = self.shared.lock();
        let appended = self.is_current(&shared, generation)
            && shared
                .track
                .as_ref()
                .is_some_and(|track| track.buffer.append(samples));
        drop(shared);

        let mut stats = self.stats.lock();
        if appended {
            stats.total_samples_decoded += samples.len() as u64;
        } else {
            stats.stale_chunks_dropped += 1;
        }
        appended
    }

    fn superseded(&self, generation: u64) -> PlaybackOutcome {
        let by = self.current_generation();
        self.stats.lock().tracks_superseded += 1;
        info!(generation, by, "Playback request superseded");
        self.emit(PlaybackEvent::Superseded { generation, by });
        PlaybackOutcome::Superseded { generation }
    }

    fn fail(&self, generation: u64, url: &str, source: BridgeError) -> Result<PlaybackOutcome> {
        {
            let mut shared = self.shared.lock();
            if !self.is_current(&shared, generation) {
                drop(shared);
                debug!(generation, error = %source, "Ignoring transport error from stale request");
                return Ok(self.superseded(generation));
            }
            shared.track = None;
            shared.state = StreamingState::Error;
        }

        self.stats.lock().tracks_failed += 1;
        error!(generation, error = %source, "Transport failed");
        self.emit(PlaybackEvent::Failed {
            generation,
            url: redact_url(url),
            message: source.to_string(),
        });

        Err(PlaybackError::Transport {
            url: redact_url(url),
            source,
        })
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Playback(event)).ok();
        }
    }

    #[cfg(feature = "offline-cache")]
    fn caches_writes(&self) -> bool {
        self.cache.as_ref().is_some_and(|cache| cache.config().enabled)
    }

    #[cfg(not(feature = "offline-cache"))]
    fn caches_writes(&self) -> bool {
        false
    }

    #[cfg(feature = "offline-cache")]
    async fn open_cached(&self, url: &str) -> Option<Box<dyn ByteStream>> {
        let cache = self.cache.as_ref()?;
        let stream = cache.open(url).await?;
        Some(Box::new(stream))
    }

    #[cfg(not(feature = "offline-cache"))]
    async fn open_cached(&self, _url: &str) -> Option<Box<dyn ByteStream>> {
        None
    }

    #[cfg(feature = "offline-cache")]
    async fn store_cached(&self, url: &str, body: BytesMut) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        if !cache.store(url, body.freeze()).await {
            tracing::warn!(url = %redact_url(url), "Completed track was not cached");
        }
    }

    #[cfg(not(feature = "offline-cache"))]
    async fn store_cached(&self, _url: &str, _body: BytesMut) {}
}
