//! Heartbeat generator with a live-adjustable interval.
//!
//! The pinger writes one framed text payload to its sink every interval.
//! It waits on exactly three sources at once:
//!
//! ```text
//!                ┌──────────────┐
//!  cancel ──────►│              │
//!  overrides ───►│  biased wait │──► write frame ──► sink
//!  timer ───────►│              │
//!                └──────────────┘
//! ```
//!
//! - cancellation wins over everything else, so no heartbeat is written
//!   once the token fires
//! - an override discards the pending countdown and rearms with a full
//!   interval; a zero override keeps the previous interval
//! - a failed write stops the pinger and is returned, never retried
//! - a write blocked on a stalled sink is abandoned on cancellation; the
//!   sink may then hold a partial frame and should be dropped
//!
//! # Example
//!
//! ```ignore
//! use pingwire::config::PingerConfig;
//! use pingwire::heartbeat::spawn_pinger;
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let (handle, task) = spawn_pinger(write_half, PingerConfig::default(), cancel.clone());
//! handle.set_interval(Duration::from_secs(1)).await?;
//! cancel.cancel();
//! let report = task.await??;
//! ```

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::codec::FrameCodec;
use crate::config::PingerConfig;
use crate::error::{Result, WireError};
use crate::payload::TextPayload;

/// Capacity of the interval override queue.
const OVERRIDE_CHANNEL_CAPACITY: usize = 8;

/// Summary returned when a pinger stops on cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingerReport {
    /// Heartbeats written.
    pub ticks: u64,
    /// Interval in force when the pinger stopped.
    pub interval: Duration,
}

/// Handle for adjusting a running pinger's interval.
#[derive(Debug, Clone)]
pub struct PingerHandle {
    tx: mpsc::Sender<Duration>,
}

impl PingerHandle {
    /// Queue an interval override.
    ///
    /// Returns `ConnectionClosed` if the pinger has stopped.
    pub async fn set_interval(&self, interval: Duration) -> Result<()> {
        self.tx
            .send(interval)
            .await
            .map_err(|_| WireError::ConnectionClosed)
    }

    /// Queue an override without waiting for queue space.
    pub fn try_set_interval(&self, interval: Duration) -> Result<()> {
        self.tx.try_send(interval).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                WireError::Io(std::io::Error::new(std::io::ErrorKind::WouldBlock, "override queue full"))
            }
            mpsc::error::TrySendError::Closed(_) => WireError::ConnectionClosed,
        })
    }

    /// Whether the pinger has stopped.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Per-run state, owned by the pinger task.
struct PingerState {
    current_interval: Duration,
    started: Instant,
    last_tick: Instant,
    ticks: u64,
}

impl PingerState {
    fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            current_interval: interval,
            started: now,
            last_tick: now,
            ticks: 0,
        }
    }

    fn report(&self) -> PingerReport {
        PingerReport {
            ticks: self.ticks,
            interval: self.current_interval,
        }
    }
}

/// Heartbeat generator over a writable sink.
pub struct Pinger<W> {
    sink: W,
    config: PingerConfig,
    codec: FrameCodec,
    overrides: mpsc::Receiver<Duration>,
    cancel: CancellationToken,
}

impl<W> Pinger<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(
        sink: W,
        config: PingerConfig,
        overrides: mpsc::Receiver<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            sink,
            config,
            codec: FrameCodec::new(),
            overrides,
            cancel,
        }
    }

    /// Use a custom codec for the heartbeat frame.
    pub fn with_codec(mut self, codec: FrameCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Run until cancelled or until the sink fails.
    ///
    /// Returns a report on cancellation and `Encode` on a write failure.
    pub async fn run(self) -> Result<PingerReport> {
        let Pinger {
            mut sink,
            config,
            codec,
            mut overrides,
            cancel,
        } = self;

        let heartbeat = codec.encode(&TextPayload::new(config.message.clone()))?;
        let mut state = PingerState::new(config.effective_interval());
        let mut overrides_open = true;

        tracing::debug!("Started pinger with interval {:?}", state.current_interval);

        let timer = tokio::time::sleep(state.current_interval);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tracing::debug!("Pinger cancelled after {} heartbeats", state.ticks);
                    return Ok(state.report());
                }

                next = overrides.recv(), if overrides_open => match next {
                    Some(interval) => {
                        if interval.is_zero() {
                            tracing::debug!("Ignoring zero interval override");
                        } else {
                            tracing::debug!("Pinger interval {:?} -> {:?}", state.current_interval, interval);
                            state.current_interval = interval;
                        }
                        timer.as_mut().reset(Instant::now() + state.current_interval);
                    }
                    None => overrides_open = false,
                },

                () = &mut timer => {
                    let written = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            tracing::debug!(
                                "Pinger cancelled during write after {} heartbeats",
                                state.ticks
                            );
                            return Ok(state.report());
                        }
                        written = write_heartbeat(&mut sink, &heartbeat) => written,
                    };
                    if let Err(e) = written {
                        tracing::warn!("Failed to write heartbeat: {}", e);
                        return Err(WireError::Encode(e));
                    }
                    state.ticks += 1;
                    state.last_tick = Instant::now();
                    tracing::trace!(
                        "tick #{} ({:?} since start)",
                        state.ticks,
                        state.last_tick.duration_since(state.started)
                    );
                    timer.as_mut().reset(state.last_tick + state.current_interval);
                }
            }
        }
    }
}

async fn write_heartbeat<W>(sink: &mut W, frame: &Bytes) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    sink.write_all(frame).await?;
    sink.flush().await
}

/// Spawn a pinger task and return a handle for interval overrides.
///
/// The task ends when `cancel` fires or the sink fails; the handle reports
/// `is_stopped()` afterwards.
pub fn spawn_pinger<W>(
    sink: W,
    config: PingerConfig,
    cancel: CancellationToken,
) -> (PingerHandle, JoinHandle<Result<PingerReport>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(OVERRIDE_CHANNEL_CAPACITY);
    let pinger = Pinger::new(sink, config, rx, cancel);
    let task = tokio::spawn(pinger.run());
    (PingerHandle { tx }, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, DuplexStream};

    const SLACK: Duration = Duration::from_millis(5);

    async fn next_ping(codec: &FrameCodec, source: &mut DuplexStream) -> String {
        codec.decode(source).await.unwrap().to_string()
    }

    fn assert_near(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual <= expected + SLACK,
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cadence_without_overrides() {
        let codec = FrameCodec::new();
        let (sink, mut source) = duplex(1024);
        let cancel = CancellationToken::new();
        let interval = Duration::from_millis(100);

        let start = Instant::now();
        let (_handle, task) = spawn_pinger(sink, PingerConfig::new(interval), cancel.clone());

        for k in 1..=3u32 {
            assert_eq!(next_ping(&codec, &mut source).await, "ping");
            assert_near(start.elapsed(), interval * k);
        }

        cancel.cancel();
        let report = task.await.unwrap().unwrap();
        assert_eq!(report.ticks, 3);
        assert_eq!(report.interval, interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_override_resets_countdown() {
        let codec = FrameCodec::new();
        let (sink, mut source) = duplex(1024);
        let cancel = CancellationToken::new();

        let start = Instant::now();
        let (handle, task) = spawn_pinger(
            sink,
            PingerConfig::new(Duration::from_secs(10)),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.set_interval(Duration::from_secs(1)).await.unwrap();

        next_ping(&codec, &mut source).await;
        assert_near(start.elapsed(), Duration::from_millis(1200));

        next_ping(&codec, &mut source).await;
        assert_near(start.elapsed(), Duration::from_millis(2200));

        cancel.cancel();
        let report = task.await.unwrap().unwrap();
        assert_eq!(report.interval, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_override_keeps_interval_but_rearms() {
        let codec = FrameCodec::new();
        let (sink, mut source) = duplex(1024);
        let cancel = CancellationToken::new();

        let start = Instant::now();
        let (handle, task) = spawn_pinger(
            sink,
            PingerConfig::new(Duration::from_secs(1)),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.set_interval(Duration::ZERO).await.unwrap();

        next_ping(&codec, &mut source).await;
        assert_near(start.elapsed(), Duration::from_millis(1500));

        cancel.cancel();
        assert_eq!(task.await.unwrap().unwrap().interval, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_suppresses_pending_heartbeat() {
        let codec = FrameCodec::new();
        let (sink, mut source) = duplex(1024);
        let cancel = CancellationToken::new();

        let (handle, task) = spawn_pinger(
            sink,
            PingerConfig::new(Duration::from_secs(1)),
            cancel.clone(),
        );

        next_ping(&codec, &mut source).await;
        tokio::time::sleep(Duration::from_millis(950)).await;
        cancel.cancel();

        let report = task.await.unwrap().unwrap();
        assert_eq!(report.ticks, 1);
        assert!(handle.is_stopped());

        // Sink is dropped with the task: the next read sees a clean EOF.
        tokio::time::sleep(Duration::from_secs(5)).await;
        let err = codec.decode(&mut source).await.unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_has_priority_over_ready_override() {
        let (sink, mut source) = duplex(1024);
        let (tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        tx.send(Duration::from_millis(1)).await.unwrap();
        cancel.cancel();

        let report = Pinger::new(
            sink,
            PingerConfig::new(Duration::from_secs(3)),
            rx,
            cancel,
        )
        .run()
        .await
        .unwrap();

        assert_eq!(report.ticks, 0);
        assert_eq!(report.interval, Duration::from_secs(3));

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut source, &mut buf)
            .await
            .unwrap();
        assert!(buf.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_initial_interval_uses_default() {
        let codec = FrameCodec::new();
        let (sink, mut source) = duplex(1024);
        let cancel = CancellationToken::new();

        let start = Instant::now();
        let (_handle, task) = spawn_pinger(sink, PingerConfig::new(Duration::ZERO), cancel.clone());

        next_ping(&codec, &mut source).await;
        assert_near(start.elapsed(), crate::config::DEFAULT_PING_INTERVAL);

        cancel.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_stalled_write() {
        // Nothing reads the other end; a 9-byte frame never fits.
        let (sink, _source) = duplex(4);
        let cancel = CancellationToken::new();

        let (_handle, task) = spawn_pinger(
            sink,
            PingerConfig::new(Duration::from_millis(10)),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!task.is_finished());
        cancel.cancel();

        let report = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("pinger did not stop after cancel")
            .unwrap()
            .unwrap();
        assert_eq!(report.ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_stops_pinger() {
        let (sink, source) = duplex(1024);
        drop(source);

        let (handle, task) = spawn_pinger(
            sink,
            PingerConfig::new(Duration::from_millis(10)),
            CancellationToken::new(),
        );

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, WireError::Encode(_)));
        assert!(handle.is_stopped());
        assert!(matches!(
            handle.set_interval(Duration::from_secs(1)).await,
            Err(WireError::ConnectionClosed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_keeps_pinging() {
        let codec = FrameCodec::new();
        let (sink, mut source) = duplex(1024);
        let cancel = CancellationToken::new();

        let (handle, task) = spawn_pinger(
            sink,
            PingerConfig::new(Duration::from_millis(50)).message("hb"),
            cancel.clone(),
        );
        drop(handle);

        assert_eq!(next_ping(&codec, &mut source).await, "hb");
        assert_eq!(next_ping(&codec, &mut source).await, "hb");

        cancel.cancel();
        assert_eq!(task.await.unwrap().unwrap().ticks, 2);
    }
}
