//! Background planner thread with one request in flight at a time.

use crate::model::player::PlayerId;
use crate::model::round::Round;
use crate::pairing::{
    CancelToken, Checkpoint, GenerationError, PlannerConfig, RoundRequest, plan_next_round_with,
};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{Level, event};

/// Owned input for the worker thread.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanRequest {
    pub rounds: Vec<Round>,
    pub roster: Vec<PlayerId>,
    pub courts: usize,
    pub volunteers: Vec<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// A request is already in flight.
    Busy,
    /// The worker thread is gone.
    Disconnected,
    Failed(GenerationError),
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::Busy => write!(f, "planner is busy with another request"),
            WorkerError::Disconnected => write!(f, "planner thread has stopped"),
            WorkerError::Failed(err) => write!(f, "planning failed: {err}"),
        }
    }
}

impl std::error::Error for WorkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkerError::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub completed: u64,
    pub last_elapsed: Duration,
    pub last_succeeded: bool,
}

type Reply = Result<Round, GenerationError>;

struct Job {
    request: PlanRequest,
    reply: Sender<Reply>,
}

pub struct PlannerWorker {
    sender: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
    busy: Arc<AtomicBool>,
    token: CancelToken,
    stats: Arc<Mutex<Option<WorkerStats>>>,
}

impl PlannerWorker {
    /// Starts the thread. Without a seed the generator is seeded from the OS.
    pub fn spawn(config: PlannerConfig, seed: Option<u64>) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let busy = Arc::new(AtomicBool::new(false));
        let token = CancelToken::new();
        let stats = Arc::new(Mutex::new(None));

        let handle = {
            let busy = Arc::clone(&busy);
            let checkpoint = Checkpoint::with_token(token.clone());
            let stats = Arc::clone(&stats);
            thread::Builder::new()
                .name("courtmix-planner".into())
                .spawn(move || {
                    let rng = match seed {
                        Some(seed) => StdRng::seed_from_u64(seed),
                        None => StdRng::from_entropy(),
                    };
                    serve(receiver, config, rng, checkpoint, busy, stats);
                })?
        };

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            busy,
            token,
            stats,
        })
    }

    pub fn submit(&self, request: PlanRequest) -> Result<PendingPlan, WorkerError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WorkerError::Busy);
        }
        self.token.reset();

        let (reply, receiver) = mpsc::channel();
        let sent = self
            .sender
            .as_ref()
            .is_some_and(|sender| sender.send(Job { request, reply }).is_ok());
        if !sent {
            self.busy.store(false, Ordering::Release);
            return Err(WorkerError::Disconnected);
        }
        Ok(PendingPlan { receiver })
    }

    /// Stops the request in flight at its next checkpoint.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Timing of the most recently finished request.
    pub fn last_stats(&self) -> Option<WorkerStats> {
        *self.stats.lock()
    }
}

impl Drop for PlannerWorker {
    fn drop(&mut self) {
        self.token.cancel();
        self.sender.take();
        if let Some(handle) = self.handle.take()
            && let Err(payload) = handle.join()
        {
            event!(
                target: "courtmix_core::worker",
                Level::WARN,
                reason = %panic_reason(payload.as_ref()),
                "planner thread panicked"
            );
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|text| (*text).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn serve(
    receiver: Receiver<Job>,
    config: PlannerConfig,
    mut rng: StdRng,
    checkpoint: Checkpoint,
    busy: Arc<AtomicBool>,
    stats: Arc<Mutex<Option<WorkerStats>>>,
) {
    for job in receiver {
        let started = Instant::now();
        let request = RoundRequest::new(&job.request.rounds, &job.request.roster, job.request.courts)
            .with_volunteers(&job.request.volunteers);
        let result = plan_next_round_with(request, &config, &mut rng, &checkpoint);

        {
            let mut guard = stats.lock();
            let completed = guard.as_ref().map_or(0, |previous| previous.completed) + 1;
            *guard = Some(WorkerStats {
                completed,
                last_elapsed: started.elapsed(),
                last_succeeded: result.is_ok(),
            });
        }
        busy.store(false, Ordering::Release);
        let _ = job.reply.send(result);
    }
}

/// Handle to a submitted request.
pub struct PendingPlan {
    receiver: Receiver<Reply>,
}

impl PendingPlan {
    /// Blocks until the worker answers.
    pub fn wait(self) -> Result<Round, WorkerError> {
        match self.receiver.recv() {
            Ok(reply) => reply.map_err(WorkerError::Failed),
            Err(_) => Err(WorkerError::Disconnected),
        }
    }

    /// Returns the answer if it is ready.
    pub fn try_take(&self) -> Option<Result<Round, WorkerError>> {
        match self.receiver.try_recv() {
            Ok(reply) => Some(reply.map_err(WorkerError::Failed)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(WorkerError::Disconnected)),
        }
    }
}
