//! Offline cache behaviour as seen through the playback pipeline.

#![cfg(feature = "offline-cache")]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AudioSink, BlobStore, ByteSource, ByteStream, MemoryByteStream, PcmBuffer, SinkState,
};
use bytes::Bytes;
use core_playback::{
    decode_all, CacheConfig, PlaybackOutcome, PlaybackPipeline, StreamingConfig, StreamingState,
    TrackCache,
};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus, PlaybackEvent};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Serves a fixed body per URL in 2-byte chunks and counts opens.
struct FixedSource {
    bodies: BTreeMap<String, Bytes>,
    opened: AtomicUsize,
}

impl FixedSource {
    fn new(bodies: &[(&str, &'static [u8])]) -> Self {
        Self {
            bodies: bodies
                .iter()
                .map(|(url, body)| (url.to_string(), Bytes::from_static(body)))
                .collect(),
            opened: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ByteSource for FixedSource {
    async fn open(&self, url: &str) -> BridgeResult<Box<dyn ByteStream>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let body = self.bodies.get(url).cloned().unwrap_or_default();
        Ok(Box::new(MemoryByteStream::chunked(body, 2)))
    }
}

#[derive(Default)]
struct MemoryStore {
    blobs: Mutex<BTreeMap<String, Bytes>>,
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn get(&self, key: &str) -> BridgeResult<Option<Bytes>> {
        Ok(self.blobs.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, data: Bytes) -> BridgeResult<()> {
        self.blobs.lock().insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> BridgeResult<bool> {
        Ok(self.blobs.lock().remove(key).is_some())
    }

    async fn list(&self) -> BridgeResult<Vec<String>> {
        Ok(self.blobs.lock().keys().cloned().collect())
    }
}

struct NullSink;

#[async_trait]
impl AudioSink for NullSink {
    async fn load(&self, _buffer: PcmBuffer) -> BridgeResult<()> {
        Ok(())
    }
    async fn play(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn pause(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn stop(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn elapsed(&self) -> BridgeResult<Duration> {
        Ok(Duration::ZERO)
    }
    async fn state(&self) -> BridgeResult<SinkState> {
        Ok(SinkState::Idle)
    }
}

/// Memory store that parks `get` or `put` for one key until released.
#[derive(Default)]
struct GatedStore {
    inner: MemoryStore,
    park_get: Option<&'static str>,
    park_put: Option<&'static str>,
    gate: Notify,
    parked: AtomicUsize,
}

impl GatedStore {
    async fn park_if(&self, key: &str, parked_key: Option<&str>) {
        if parked_key == Some(key) {
            self.parked.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
        }
    }
}

#[async_trait]
impl BlobStore for GatedStore {
    async fn get(&self, key: &str) -> BridgeResult<Option<Bytes>> {
        self.park_if(key, self.park_get).await;
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> BridgeResult<()> {
        self.park_if(key, self.park_put).await;
        self.inner.put(key, data).await
    }

    async fn delete(&self, key: &str) -> BridgeResult<bool> {
        self.inner.delete(key).await
    }

    async fn list(&self) -> BridgeResult<Vec<String>> {
        self.inner.list().await
    }
}

/// Sink that logs each call by name.
#[derive(Default)]
struct LogSink {
    log: Mutex<Vec<&'static str>>,
}

#[async_trait]
impl AudioSink for LogSink {
    async fn load(&self, _buffer: PcmBuffer) -> BridgeResult<()> {
        self.log.lock().push("load");
        Ok(())
    }
    async fn play(&self) -> BridgeResult<()> {
        self.log.lock().push("play");
        Ok(())
    }
    async fn pause(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn stop(&self) -> BridgeResult<()> {
        self.log.lock().push("stop");
        Ok(())
    }
    async fn elapsed(&self) -> BridgeResult<Duration> {
        Ok(Duration::ZERO)
    }
    async fn state(&self) -> BridgeResult<SinkState> {
        Ok(SinkState::Idle)
    }
}

const TRACK_A: &[u8] = &[0x00, 0xFF, 0xA5, 0x3C, 0x99];
const TRACK_B: &[u8] = &[0x5A, 0x5A, 0x01];

fn pipeline(
    source: Arc<FixedSource>,
    store: Arc<MemoryStore>,
    cache_config: CacheConfig,
    bus: EventBus,
) -> PlaybackPipeline {
    let cache = TrackCache::new(store, cache_config).with_event_bus(bus.clone());
    PlaybackPipeline::new(source, Arc::new(NullSink), StreamingConfig::default())
        .unwrap()
        .with_cache(cache)
        .with_event_bus(bus)
}

fn gated_pipeline(
    source: Arc<FixedSource>,
    store: Arc<GatedStore>,
    sink: Arc<LogSink>,
) -> Arc<PlaybackPipeline> {
    let cache = TrackCache::new(store, CacheConfig::default());
    Arc::new(
        PlaybackPipeline::new(source, sink, StreamingConfig::default())
            .unwrap()
            .with_cache(cache),
    )
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached");
}

#[tokio::test]
async fn test_second_play_is_served_from_cache() {
    let source = Arc::new(FixedSource::new(&[("https://cdn.example/a.dfpwm", TRACK_A)]));
    let store = Arc::new(MemoryStore::default());
    let bus = EventBus::new(64);
    let mut events = bus.subscribe();
    let pipeline = pipeline(
        source.clone(),
        store.clone(),
        CacheConfig::default().with_cached_chunk_bytes(3),
        bus,
    );

    let first = pipeline.play("https://cdn.example/a.dfpwm").await.unwrap().into_pcm().unwrap();
    assert_eq!(
        store.get("https://cdn.example/a.dfpwm").await.unwrap(),
        Some(Bytes::from_static(TRACK_A))
    );

    let second = pipeline.play("https://cdn.example/a.dfpwm").await.unwrap().into_pcm().unwrap();

    assert_eq!(source.opened.load(Ordering::SeqCst), 1);
    assert_eq!(&first.samples[..], &second.samples[..]);
    assert_eq!(&second.samples[..], &decode_all(TRACK_A)[..]);
    assert_eq!(pipeline.stats().cache_hits, 1);

    let cache_stats = pipeline.cache().unwrap().stats();
    assert_eq!(cache_stats.hits, 1);
    assert_eq!(cache_stats.misses, 1);
    assert_eq!(cache_stats.stores, 1);

    let mut from_cache = Vec::new();
    let mut saw_hit = false;
    while let Ok(event) = events.try_recv() {
        match event {
            CoreEvent::Playback(PlaybackEvent::Completed { from_cache: hit, .. }) => {
                from_cache.push(hit)
            }
            CoreEvent::Cache(CacheEvent::Hit { bytes, .. }) => {
                saw_hit = true;
                assert_eq!(bytes, TRACK_A.len() as u64);
            }
            _ => {}
        }
    }
    assert_eq!(from_cache, vec![false, true]);
    assert!(saw_hit);
}

#[tokio::test]
async fn test_cache_keeps_most_recent_tracks() {
    let source = Arc::new(FixedSource::new(&[("a", TRACK_A), ("b", TRACK_B)]));
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline(
        source,
        store.clone(),
        CacheConfig::default().with_max_entries(1),
        EventBus::new(16),
    );

    pipeline.play("a").await.unwrap();
    pipeline.play("b").await.unwrap();

    assert_eq!(store.list().await.unwrap(), vec!["b".to_string()]);
    assert_eq!(pipeline.cache().unwrap().stats().evictions, 1);
}

#[tokio::test]
async fn test_disabled_cache_always_streams() {
    let source = Arc::new(FixedSource::new(&[("a", TRACK_A)]));
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline(source.clone(), store.clone(), CacheConfig::disabled(), EventBus::new(16));

    pipeline.play("a").await.unwrap();
    pipeline.play("a").await.unwrap();

    assert_eq!(source.opened.load(Ordering::SeqCst), 2);
    assert!(store.list().await.unwrap().is_empty());
    assert_eq!(pipeline.stats().cache_hits, 0);
}

#[tokio::test]
async fn test_oversized_track_is_streamed_but_not_stored() {
    let source = Arc::new(FixedSource::new(&[("a", TRACK_A)]));
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline(
        source,
        store.clone(),
        CacheConfig::default().with_max_entry_bytes(2),
        EventBus::new(16),
    );

    let pcm = pipeline.play("a").await.unwrap().into_pcm().unwrap();
    assert_eq!(pcm.len(), TRACK_A.len() * 8);
    assert!(store.list().await.unwrap().is_empty());
}


#[tokio::test]
async fn test_abort_while_cache_lookup_pending() {
    let source = Arc::new(FixedSource::new(&[("a", TRACK_A)]));
    let store = Arc::new(GatedStore {
        park_get: Some("a"),
        ..Default::default()
    });
    let sink = Arc::new(LogSink::default());
    let pipeline = gated_pipeline(source.clone(), store.clone(), sink.clone());

    let task = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.play("a").await })
    };
    wait_until(|| store.parked.load(Ordering::SeqCst) == 1).await;

    pipeline.abort();

    // The lookup is never released; the request must still end.
    let outcome = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("play stayed parked in the cache lookup")
        .unwrap()
        .unwrap();
    assert!(matches!(outcome, PlaybackOutcome::Superseded { generation: 1 }));
    assert_eq!(source.opened.load(Ordering::SeqCst), 0);
    assert!(sink.log.lock().is_empty());
    assert_eq!(pipeline.state(), StreamingState::Idle);
    assert_eq!(pipeline.stats().tracks_superseded, 1);
}

#[tokio::test]
async fn test_new_request_while_cache_lookup_pending() {
    let source = Arc::new(FixedSource::new(&[("a", TRACK_A), ("b", TRACK_B)]));
    let store = Arc::new(GatedStore {
        park_get: Some("a"),
        ..Default::default()
    });
    let sink = Arc::new(LogSink::default());
    let pipeline = gated_pipeline(source.clone(), store.clone(), sink.clone());

    let task_a = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.play("a").await })
    };
    wait_until(|| store.parked.load(Ordering::SeqCst) == 1).await;

    let pcm_b = pipeline.play("b").await.unwrap().into_pcm().unwrap();
    assert_eq!(&pcm_b.samples[..], &decode_all(TRACK_B)[..]);

    let outcome_a = tokio::time::timeout(Duration::from_secs(5), task_a)
        .await
        .expect("play stayed parked in the cache lookup")
        .unwrap()
        .unwrap();
    assert!(matches!(outcome_a, PlaybackOutcome::Superseded { generation: 1 }));

    // Only B's source was opened and only B reached the sink.
    assert_eq!(source.opened.load(Ordering::SeqCst), 1);
    assert_eq!(*sink.log.lock(), vec!["load", "play"]);
    assert_eq!(pipeline.current_url().as_deref(), Some("b"));
}

#[tokio::test]
async fn test_stop_during_slow_cache_write_keeps_sink_stopped() {
    let source = Arc::new(FixedSource::new(&[("a", TRACK_A)]));
    let store = Arc::new(GatedStore {
        park_put: Some("a"),
        ..Default::default()
    });
    let sink = Arc::new(LogSink::default());
    let pipeline = gated_pipeline(source, store.clone(), sink.clone());

    let task = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.play("a").await })
    };
    wait_until(|| store.parked.load(Ordering::SeqCst) == 1).await;

    // The write is still parked, so stop must not wait on it.
    tokio::time::timeout(Duration::from_secs(5), pipeline.stop())
        .await
        .expect("stop waited on the cache write")
        .unwrap();
    store.gate.notify_one();

    // The track reached the sink before the write began, so it completed.
    let outcome = task.await.unwrap().unwrap();
    assert!(outcome.is_completed());

    // Nothing is loaded or started once the sink has been stopped.
    assert_eq!(*sink.log.lock(), vec!["load", "play", "stop"]);
    assert_eq!(pipeline.state(), StreamingState::Stopped);
    assert_eq!(pipeline.stats().tracks_completed, 1);
    assert_eq!(
        store.get("a").await.unwrap(),
        Some(Bytes::from_static(TRACK_A))
    );
}
