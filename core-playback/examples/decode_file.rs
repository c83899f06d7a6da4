//! # Decode a DFPWM File
//!
//! Streams a local `.dfpwm` file through the playback pipeline and reports
//! what the sink received.
//!
//! Run with: `cargo run --example decode_file --package core-playback -- track.dfpwm`

use async_trait::async_trait;
use bridge_desktop::FileByteSource;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{AudioSink, PcmBuffer, SinkState};
use core_playback::{PlaybackOutcome, PlaybackPipeline, SampleConverter, StreamingConfig};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::Arc;
use std::time::Duration;

/// Sink that summarises the buffer instead of rendering it.
struct ReportingSink;

#[async_trait]
impl AudioSink for ReportingSink {
    async fn load(&self, buffer: PcmBuffer) -> BridgeResult<()> {
        let pcm = SampleConverter::to_i16_vec(&buffer.samples);
        let peak = pcm.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
        println!(
            "Loaded {} samples ({:.2}s at {} Hz), peak {}",
            buffer.len(),
            buffer.duration().as_secs_f64(),
            buffer.sample_rate,
            peak
        );
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        println!("Playback started");
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default().with_format(LogFormat::Compact))?;

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: decode_file <track.dfpwm>"))?;

    let pipeline = PlaybackPipeline::new(
        Arc::new(FileByteSource::new()),
        Arc::new(ReportingSink),
        StreamingConfig::default(),
    )?;

    match pipeline.play(&path).await? {
        PlaybackOutcome::Completed(pcm) => {
            println!("Decoded {} in {:?}", path, pcm.duration());
        }
        PlaybackOutcome::Superseded { generation } => {
            println!("Request {} was superseded", generation);
        }
    }

    println!("{:#?}", pipeline.stats());
    Ok(())
}
