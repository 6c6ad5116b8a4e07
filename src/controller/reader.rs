use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace};

use super::mirror::StateMirror;
use crate::backend::InputBackend;

// Reader settings
#[derive(Clone, Debug)]
pub struct ReaderSettings {
    /// Sleep between two polls. Also bounds how long a stop request waits.
    pub poll_interval: Duration,
    /// Window over which throughput statistics are logged.
    pub stats_interval: chrono::Duration,
    /// Reader thread stack size, platform default when `None`.
    pub stack_size: Option<usize>,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            stats_interval: chrono::Duration::seconds(10),
            stack_size: None,
        }
    }
}

// Reader errors
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("Failed to spawn reader thread: {0}")]
    SpawnError(#[from] std::io::Error),

    #[error("Reader thread panicked, device handle lost")]
    Panicked,

    #[error("Reader thread exited before receiving the backend")]
    BackendNotReceived,
}

/// Spawn failure; the backend never reached a thread and is returned as-is.
#[derive(Debug)]
pub struct SpawnFailure<B> {
    pub error: ReaderError,
    pub backend: B,
}

/// A running reader thread.
///
/// The thread owns the backend until [`ReaderHandle::stop`] joins it and hands
/// the backend back.
#[derive(Debug)]
pub struct ReaderHandle<B: InputBackend> {
    stop_flag: Arc<AtomicBool>,
    thread: JoinHandle<Option<B>>,
}

impl<B: InputBackend> ReaderHandle<B> {
    /// Move `backend` into a new reader thread writing into `mirror`.
    ///
    /// The backend is handed over through a channel only after the thread
    /// exists, so a failed spawn gives it back in [`SpawnFailure`].
    pub fn spawn(
        backend: B,
        mirror: Arc<StateMirror>,
        settings: ReaderSettings,
    ) -> Result<Self, SpawnFailure<B>> {
        debug!("Spawning reader thread with settings: {:?}", settings);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let thread_flag = Arc::clone(&stop_flag);
        let (backend_tx, backend_rx) = mpsc::channel::<B>();

        let mut builder = thread::Builder::new().name("joystick-reader".to_string());
        if let Some(size) = settings.stack_size {
            builder = builder.stack_size(size);
        }

        let spawned = builder.spawn(move || {
            let backend = backend_rx.recv().ok()?;
            Some(run_reader_loop(backend, &mirror, &thread_flag, &settings))
        });
        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                error!("Failed to spawn reader thread: {}", e);
                return Err(SpawnFailure {
                    error: e.into(),
                    backend,
                });
            }
        };

        if let Err(mpsc::SendError(backend)) = backend_tx.send(backend) {
            error!("Reader thread gone before receiving the backend");
            return Err(SpawnFailure {
                error: ReaderError::BackendNotReceived,
                backend,
            });
        }

        info!("Reader thread started");
        Ok(Self { stop_flag, thread })
    }

    /// Signal the loop to stop and block until the thread has exited.
    pub fn stop(self) -> Result<B, ReaderError> {
        self.stop_flag.store(true, Ordering::SeqCst);
        match self.thread.join() {
            Ok(Some(backend)) => {
                info!("Reader thread stopped");
                Ok(backend)
            }
            Ok(None) => Err(ReaderError::BackendNotReceived),
            Err(e) => {
                error!("Reader thread panicked: {:?}", e);
                Err(ReaderError::Panicked)
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

// Poll, classify, sleep until the stop flag is raised. Returns the backend so
// the caller can close the device after the join.
fn run_reader_loop<B: InputBackend>(
    mut backend: B,
    mirror: &StateMirror,
    stop_flag: &AtomicBool,
    settings: &ReaderSettings,
) -> B {
    info!("Starting reader loop");

    // For performance monitoring
    let mut event_count: u64 = 0;
    let mut applied_count: u64 = 0;
    let mut last_log_time = Local::now();

    while !stop_flag.load(Ordering::SeqCst) {
        if let Some(event) = backend.poll_event() {
            trace!("Polled event: {:?}", event);
            event_count += 1;
            if mirror.apply(&event) {
                applied_count += 1;
            }
        }

        let now = Local::now();
        if now - last_log_time > settings.stats_interval {
            let window = settings.stats_interval.num_seconds().max(1);
            debug!(
                "Reader stats: {} events ({} applied) in last {} seconds (avg {:.2}/sec)",
                event_count,
                applied_count,
                window,
                event_count as f64 / window as f64
            );
            event_count = 0;
            applied_count = 0;
            last_log_time = now;
        }

        thread::sleep(settings.poll_interval);
    }

    info!("Reader loop exited");
    backend
}
