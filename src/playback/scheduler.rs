//! Tick scheduling for playback.
//!
//! The controller never sleeps itself; it asks a [`Scheduler`] to start or
//! stop a periodic tick and consumes the [`Tick`]s it delivers. Every call
//! to [`Scheduler::start`] opens a new generation so ticks still in flight
//! from a replaced timer can be recognised and dropped.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// A tick delivered by a scheduler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Generation of the run that produced the tick.
    pub generation: u64,
}

/// Periodic timer abstraction.
pub trait Scheduler {
    /// Start ticking every `period`, replacing any current run.
    ///
    /// Returns the generation of the new run.
    fn start(&mut self, period: Duration) -> u64;

    /// Stop the current run, if any.
    fn stop(&mut self);

    /// Whether a run is active.
    fn is_running(&self) -> bool;
}

/// Scheduler backed by a tokio interval task.
pub struct TokioScheduler {
    sender: mpsc::Sender<Tick>,
    task: Option<JoinHandle<()>>,
    generation: u64,
}

impl TokioScheduler {
    /// Create a scheduler and the receiving end of its tick channel.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Tick>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let scheduler = Self {
            sender,
            task: None,
            generation: 0,
        };
        (scheduler, receiver)
    }
}

impl Scheduler for TokioScheduler {
    fn start(&mut self, period: Duration) -> u64 {
        self.stop();
        self.generation += 1;

        let generation = self.generation;
        let sender = self.sender.clone();

        self.task = Some(tokio::spawn(async move {
            // First tick one period from now, not immediately.
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                timer.tick().await;
                if sender.send(Tick { generation }).await.is_err() {
                    break;
                }
            }
        }));

        debug!("Scheduler run {} started ({:?})", generation, period);
        generation
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Scheduler run {} stopped", self.generation);
        }
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Scheduler that only records what it was asked to do.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pub generation: u64,
    pub running: bool,
    pub periods: Vec<Duration>,
    pub stops: usize,
}

#[cfg(test)]
impl ManualScheduler {
    /// A tick from the current run.
    pub fn tick(&self) -> Tick {
        Tick {
            generation: self.generation,
        }
    }
}

#[cfg(test)]
impl Scheduler for ManualScheduler {
    fn start(&mut self, period: Duration) -> u64 {
        self.generation += 1;
        self.running = true;
        self.periods.push(period);
        self.generation
    }

    fn stop(&mut self) {
        if self.running {
            self.stops += 1;
        }
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_tokio_scheduler_ticks_with_generation() {
        let (mut scheduler, mut ticks) = TokioScheduler::channel(8);
        let generation = scheduler.start(Duration::from_millis(5));
        assert!(scheduler.is_running());

        let tick = timeout(Duration::from_secs(2), ticks.recv())
            .await
            .expect("tick should arrive")
            .expect("channel open");
        assert_eq!(tick.generation, generation);

        scheduler.stop();
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_restart_opens_new_generation() {
        let (mut scheduler, mut ticks) = TokioScheduler::channel(8);
        let first = scheduler.start(Duration::from_millis(5));
        let second = scheduler.start(Duration::from_millis(5));
        assert!(second > first);

        // Anything from the first run was sent before the restart; the
        // newest run keeps delivering.
        let mut saw_second = false;
        for _ in 0..8 {
            let tick = timeout(Duration::from_secs(2), ticks.recv())
                .await
                .expect("tick should arrive")
                .expect("channel open");
            if tick.generation == second {
                saw_second = true;
                break;
            }
        }
        assert!(saw_second);
    }

    #[test]
    fn test_manual_scheduler_records_calls() {
        let mut scheduler = ManualScheduler::default();
        assert_eq!(scheduler.start(Duration::from_millis(200)), 1);
        scheduler.stop();
        scheduler.stop();
        assert_eq!(scheduler.stops, 1);
        assert_eq!(scheduler.periods, vec![Duration::from_millis(200)]);
    }
}
