//! Recording session
//!
//! Runs the servo loop and the log flusher on two threads joined by a split
//! [`ChunkedAppendBuffer`]. The servo thread only appends; the flusher
//! periodically writes finished blocks to the sink and, at shutdown, drains
//! whatever is left.

use crate::{RecorderConfig, RecorderError};
use chunk_buffer::{ChunkedAppendBuffer, Consumer, Producer, Sink};
use haptic_log::HapticSample;
use serde::Serialize;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const SERVO_THREAD: &str = "servo-loop";
const FLUSHER_THREAD: &str = "log-flusher";

/// Supplies one sample per servo tick; `None` ends the session.
pub trait SampleSource: Send + 'static {
    fn next_sample(&mut self) -> Option<HapticSample>;
}

impl<F> SampleSource for F
where
    F: FnMut() -> Option<HapticSample> + Send + 'static,
{
    fn next_sample(&mut self) -> Option<HapticSample> {
        self()
    }
}

/// Summary of a finished session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    /// Samples appended by the servo loop
    pub samples_recorded: u64,
    /// Samples accepted by the sink
    pub samples_written: u64,
    /// Drains that returned an error and were retried later
    pub drain_failures: u32,
    pub elapsed: Duration,
}

/// Counts elements the inner sink accepted
struct Counted<S> {
    inner: S,
    written: u64,
}

impl<S: Sink<HapticSample>> Sink<HapticSample> for Counted<S> {
    fn write_block(&mut self, items: &[HapticSample]) -> io::Result<()> {
        self.inner.write_block(items)?;
        self.written += items.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct Flusher<S> {
    consumer: Consumer<HapticSample>,
    sink: Counted<S>,
    failures: u32,
}

/// A running recording. Dropping it stops the servo loop and drains.
pub struct RecordingSession<S>
where
    S: Sink<HapticSample> + Send + 'static,
{
    servo: Option<JoinHandle<u64>>,
    flusher: Option<JoinHandle<Flusher<S>>>,
    stop_servo: Arc<AtomicBool>,
    stop_flusher: Arc<AtomicBool>,
    final_drain_retries: u32,
    started: Instant,
}

impl<S> RecordingSession<S>
where
    S: Sink<HapticSample> + Send + 'static,
{
    /// Spawn the servo and flusher threads.
    pub fn start<Src: SampleSource>(
        config: &RecorderConfig,
        sink: S,
        source: Src,
    ) -> Result<Self, RecorderError> {
        config.validate()?;

        let (producer, consumer) = ChunkedAppendBuffer::new(config.chunk_size).split();
        let stop_servo = Arc::new(AtomicBool::new(false));
        let stop_flusher = Arc::new(AtomicBool::new(false));

        let flusher = Flusher {
            consumer,
            sink: Counted {
                inner: sink,
                written: 0,
            },
            failures: 0,
        };
        let interval = config.flush_interval();
        let stop = Arc::clone(&stop_flusher);
        let flusher = thread::Builder::new()
            .name(FLUSHER_THREAD.into())
            .spawn(move || flush_loop(flusher, interval, &stop))
            .map_err(|source| RecorderError::Spawn {
                name: FLUSHER_THREAD,
                source,
            })?;

        let pacing = config.realtime.then(|| config.servo_period());
        let stop = Arc::clone(&stop_servo);
        let servo = match thread::Builder::new()
            .name(SERVO_THREAD.into())
            .spawn(move || servo_loop(producer, source, pacing, &stop))
        {
            Ok(handle) => handle,
            Err(source) => {
                stop_flusher.store(true, Ordering::Release);
                flusher.thread().unpark();
                let _ = flusher.join();
                return Err(RecorderError::Spawn {
                    name: SERVO_THREAD,
                    source,
                });
            }
        };

        info!(
            "Recording session started: chunk_size={}, flush every {:?}, {}",
            config.chunk_size,
            interval,
            match pacing {
                Some(period) => format!("servo period {:?}", period),
                None => "unpaced".to_string(),
            }
        );

        Ok(Self {
            servo: Some(servo),
            flusher: Some(flusher),
            stop_servo,
            stop_flusher,
            final_drain_retries: config.final_drain_retries,
            started: Instant::now(),
        })
    }

    /// True until the sample source is exhausted or the session is stopped
    pub fn is_recording(&self) -> bool {
        self.servo.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the servo loop now, drain everything and return the sink.
    pub fn stop(mut self) -> Result<(SessionReport, S), RecorderError> {
        self.stop_servo.store(true, Ordering::Release);
        self.shutdown()
    }

    /// Wait for the sample source to run out, then drain as [`stop`](Self::stop) does.
    ///
    /// Never returns for a source that never yields `None`.
    pub fn finish(mut self) -> Result<(SessionReport, S), RecorderError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(SessionReport, S), RecorderError> {
        let servo = self.servo.take();
        let flusher = self.flusher.take();

        // The producer is dropped even when the servo thread unwinds
        let recorded = servo.map(|handle| handle.join());

        self.stop_flusher.store(true, Ordering::Release);
        let mut flusher = match flusher {
            Some(handle) => {
                handle.thread().unpark();
                handle
                    .join()
                    .map_err(|_| RecorderError::ThreadPanicked(FLUSHER_THREAD))?
            }
            None => return Err(RecorderError::ThreadPanicked(FLUSHER_THREAD)),
        };

        let attempts = self.final_drain_retries + 1;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match flusher.consumer.drain_all(&mut flusher.sink) {
                Ok(written) => {
                    debug!("Final drain wrote {} samples", written);
                    break;
                }
                Err(e) if attempt < attempts => {
                    flusher.failures += 1;
                    warn!("Final drain attempt {}/{} failed: {}", attempt, attempts, e);
                }
                Err(source) => return Err(RecorderError::FinalDrain { attempts, source }),
            }
        }

        let samples_recorded = match recorded {
            Some(Ok(count)) => count,
            _ => return Err(RecorderError::ThreadPanicked(SERVO_THREAD)),
        };

        let report = SessionReport {
            samples_recorded,
            samples_written: flusher.sink.written,
            drain_failures: flusher.failures,
            elapsed: self.started.elapsed(),
        };
        info!(
            "Recording session finished: {} recorded, {} written, {} drain failures in {:.2?}",
            report.samples_recorded, report.samples_written, report.drain_failures, report.elapsed
        );
        Ok((report, flusher.sink.inner))
    }
}

impl<S> Drop for RecordingSession<S>
where
    S: Sink<HapticSample> + Send + 'static,
{
    fn drop(&mut self) {
        if self.servo.is_none() && self.flusher.is_none() {
            return;
        }
        self.stop_servo.store(true, Ordering::Release);
        if let Err(e) = self.shutdown() {
            error!("Recording session shutdown failed: {}", e);
        }
    }
}

fn servo_loop<Src: SampleSource>(
    mut producer: Producer<HapticSample>,
    mut source: Src,
    pacing: Option<Duration>,
    stop: &AtomicBool,
) -> u64 {
    let mut deadline = Instant::now();

    while !stop.load(Ordering::Acquire) {
        let Some(sample) = source.next_sample() else {
            break;
        };
        producer.append(sample);

        if let Some(period) = pacing {
            deadline += period;
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            } else {
                // Overran the tick; do not try to catch up
                deadline = now;
            }
        }
    }

    debug!("Servo loop exiting after {} samples", producer.total_appended());
    producer.total_appended()
}

fn flush_loop<S: Sink<HapticSample>>(
    mut flusher: Flusher<S>,
    interval: Duration,
    stop: &AtomicBool,
) -> Flusher<S> {
    loop {
        match flusher.consumer.drain_safe(&mut flusher.sink) {
            Ok(0) => {}
            Ok(written) => debug!("Flushed {} samples", written),
            Err(e) => {
                flusher.failures += 1;
                warn!(
                    "Drain failed, {} samples stay buffered: {}",
                    flusher.consumer.size(),
                    e
                );
            }
        }

        if stop.load(Ordering::Acquire) {
            return flusher;
        }
        thread::park_timeout(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: u64) -> HapticSample {
        HapticSample {
            time: i as f64,
            ..Default::default()
        }
    }

    fn counting_source(limit: u64) -> impl SampleSource {
        let mut next = 0;
        move || {
            (next < limit).then(|| {
                next += 1;
                sample(next - 1)
            })
        }
    }

    fn fast_config(chunk_size: usize) -> RecorderConfig {
        RecorderConfig {
            chunk_size,
            flush_interval_ms: 1,
            realtime: false,
            ..Default::default()
        }
    }

    /// Fails a fixed number of writes, then accepts everything
    struct FlakySink {
        failures_left: usize,
        items: Vec<HapticSample>,
    }

    impl Sink<HapticSample> for FlakySink {
        fn write_block(&mut self, items: &[HapticSample]) -> io::Result<()> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(io::Error::new(io::ErrorKind::Other, "device busy"));
            }
            self.items.extend_from_slice(items);
            Ok(())
        }
    }

    #[test]
    fn test_finish_writes_every_sample_in_order() {
        let session =
            RecordingSession::start(&fast_config(64), Vec::new(), counting_source(10_000)).unwrap();
        let (report, written) = session.finish().unwrap();

        assert_eq!(report.samples_recorded, 10_000);
        assert_eq!(report.samples_written, 10_000);
        assert_eq!(report.drain_failures, 0);
        assert_eq!(written.len(), 10_000);
        assert!(written
            .iter()
            .enumerate()
            .all(|(i, s)| s.time == i as f64));
    }

    #[test]
    fn test_stop_ends_unbounded_source() {
        let mut tick = 0;
        let source = move || {
            tick += 1;
            Some(sample(tick))
        };
        let config = RecorderConfig {
            realtime: true,
            servo_rate_hz: 10_000.0,
            ..fast_config(100)
        };
        let session = RecordingSession::start(&config, Vec::new(), source).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(session.is_recording());

        let (report, written) = session.stop().unwrap();
        assert!(report.samples_recorded > 0);
        assert_eq!(report.samples_written, report.samples_recorded);
        assert_eq!(written.len() as u64, report.samples_recorded);
    }

    #[test]
    fn test_failed_drains_are_retried() {
        let sink = FlakySink {
            failures_left: 3,
            items: Vec::new(),
        };
        let session = RecordingSession::start(&fast_config(8), sink, counting_source(500)).unwrap();
        let (report, sink) = session.finish().unwrap();

        assert_eq!(report.drain_failures, 3);
        assert_eq!(report.samples_written, 500);
        assert_eq!(sink.items.len(), 500);
        assert!(sink.items.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn test_final_drain_gives_up_after_retries() {
        let config = RecorderConfig {
            final_drain_retries: 2,
            ..fast_config(8)
        };
        let sink = FlakySink {
            failures_left: usize::MAX,
            items: Vec::new(),
        };
        let session = RecordingSession::start(&config, sink, counting_source(20)).unwrap();

        match session.finish() {
            Err(RecorderError::FinalDrain { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected FinalDrain, got {:?}", other.map(|(r, _)| r)),
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = RecorderConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            RecordingSession::start(&config, Vec::new(), counting_source(1)),
            Err(RecorderError::InvalidConfig(_))
        ));
    }
}
