use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver};
use rayon::prelude::*;
use tracing::{debug, error, span, Level};
use typed_builder::TypedBuilder;

use crate::bitbuffer::BitRowSet;
use crate::decoder::DecodeContext;
use crate::prelude::*;
use crate::registry::{detect, DecoderDescriptor, Detection, Registry};

const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Cooperative stop signal for a running [Dispatcher].
///
/// Once stopped no new captures are taken from the input. Captures already in flight are
/// still decoded and returned.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs a [Registry] over a stream of captures.
///
/// Captures are decoded on a thread pool, with the enabled decoders of a single capture
/// evaluated in parallel. Results come back in capture order.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use sensorframe::{BitRowSet, Dispatcher, Registry};
///
/// let captures: Vec<BitRowSet> = vec!["{16}ffff".parse().unwrap()];
/// let decoded: Vec<_> = Dispatcher::builder()
///     .num_threads(2)
///     .build()
///     .decode(Arc::new(Registry::default()), captures.into_iter())
///     .unwrap()
///     .collect();
/// assert_eq!(decoded.len(), 1);
/// assert!(decoded[0].detections.is_empty());
/// ```
#[derive(TypedBuilder)]
pub struct Dispatcher {
    /// Number of decode threads. 0 lets the thread pool decide.
    #[builder(default)]
    num_threads: usize,
    /// Maximum number of captures in flight.
    #[builder(default = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,
    #[builder(default)]
    context: DecodeContext,
    #[builder(default)]
    stop: StopHandle,
}

impl Dispatcher {
    /// Handle that can stop this dispatcher after decoding has started.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Starts decoding `captures` in the background and returns an iterator of results,
    /// one per capture, in input order.
    ///
    /// # Errors
    /// If the thread pool or the background thread cannot be started.
    pub fn decode<C>(self, registry: Arc<Registry>, captures: C) -> Result<DecodedCaptureIter>
    where
        C: Iterator<Item = BitRowSet> + Send + 'static,
    {
        let pool = {
            let mut pool = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("decode-{i}"));
            if self.num_threads > 0 {
                pool = pool.num_threads(self.num_threads);
            }
            pool
        }
        .build()?;

        let (jobs_tx, jobs_rx) = bounded(self.buffer_size.max(1));
        let ctx = self.context;
        let stop = self.stop;

        let handle = thread::Builder::new()
            .name("dispatcher".into())
            .spawn(move || {
                for (index, rows) in captures.enumerate() {
                    if stop.is_stopped() {
                        debug!(index, "stop requested; no further captures accepted");
                        break;
                    }
                    let (future_tx, future_rx) = bounded(1);
                    let registry = registry.clone();

                    // spawn_fifo keeps captures in submission order
                    pool.spawn_fifo(move || {
                        let span = span!(Level::DEBUG, "capture", index);
                        let _guard = span.enter();

                        let enabled: Vec<&DecoderDescriptor> = registry.enabled().collect();
                        let detections: Vec<Detection> = enabled
                            .par_iter()
                            .filter_map(|desc| detect(desc, &ctx, &rows))
                            .collect();

                        if future_tx.send(DecodedCapture { index, detections }).is_err() {
                            debug!(index, "failed to send decoded capture");
                        }
                    });

                    if let Err(err) = jobs_tx.send(future_rx) {
                        debug!("failed to send capture future: {err}");
                        break;
                    }
                }
            })?;

        Ok(DecodedCaptureIter {
            jobs: jobs_rx,
            handle: Some(handle),
        })
    }
}

/// Everything detected in one capture.
#[derive(Debug)]
pub struct DecodedCapture {
    /// Zero based position of the capture in the input.
    pub index: usize,
    /// Detections in registry order. Empty if no decoder recognized the capture.
    pub detections: Vec<Detection>,
}

/// Iterator over [DecodedCapture]s returned by [Dispatcher::decode].
pub struct DecodedCaptureIter {
    jobs: Receiver<Receiver<DecodedCapture>>,
    handle: Option<JoinHandle<()>>,
}

impl Iterator for DecodedCaptureIter {
    type Item = DecodedCapture;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // recv blocks until the next capture is submitted or the dispatcher exits
            let Ok(rx) = self.jobs.recv() else {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        error!("dispatcher thread panicked");
                    }
                }
                return None;
            };
            match rx.recv() {
                Ok(decoded) => return Some(decoded),
                Err(_) => error!("decode task exited without a result"),
            }
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Error::ThreadPool(err.to_string())
    }
}
