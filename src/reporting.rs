//! Thread-safe reporting from workers to the display
//!
//! Workers are plain OS threads; the display lives on the async runtime. The
//! two meet over an unbounded tokio channel: sending never blocks a worker,
//! and events from one worker arrive in the order that worker sent them.

use crate::models::{LatencySample, WorkerExit, WorkerSummary};
use crate::stats::{RollingHistory, RollingStats};
use std::time::Duration;
use tokio::sync::mpsc;

/// Everything a worker or the orchestrator can tell the display
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    /// A new run with `threads` workers; clears previous rows
    RunStarted { threads: usize },
    Sample(LatencySample),
    WorkerExited(WorkerExit),
}

/// Cloneable sending half, one clone per worker
#[derive(Debug, Clone)]
pub struct ReportingSink {
    tx: mpsc::UnboundedSender<ReportEvent>,
}

/// Receiving half, owned by the display loop
#[derive(Debug)]
pub struct ReportReceiver {
    rx: mpsc::UnboundedReceiver<ReportEvent>,
}

/// Create a connected sink and receiver
pub fn channel() -> (ReportingSink, ReportReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ReportingSink { tx }, ReportReceiver { rx })
}

impl ReportingSink {
    pub fn run_started(&self, threads: usize) {
        self.send(ReportEvent::RunStarted { threads });
    }

    pub fn sample(&self, sample: LatencySample) {
        self.send(ReportEvent::Sample(sample));
    }

    pub fn worker_exited(&self, exit: WorkerExit) {
        self.send(ReportEvent::WorkerExited(exit));
    }

    /// A closed receiver means nobody is displaying; drop the event
    fn send(&self, event: ReportEvent) {
        let _ = self.tx.send(event);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl ReportReceiver {
    /// Next event; `None` once every sink is dropped and the queue is empty
    pub async fn recv(&mut self) -> Option<ReportEvent> {
        self.rx.recv().await
    }

    /// Non-blocking receive for synchronous callers
    pub fn try_recv(&mut self) -> Option<ReportEvent> {
        self.rx.try_recv().ok()
    }
}

/// Display state for one worker
#[derive(Debug, Clone)]
pub struct WorkerRow {
    pub worker: usize,
    /// Latest latency; `None` until the first sample arrives
    pub last_ms: Option<f64>,
    pub last_sequence: Option<u64>,
    pub history: RollingHistory,
    pub stats: RollingStats,
    pub exit: Option<WorkerExit>,
}

impl WorkerRow {
    fn new(worker: usize, capacity: usize) -> Self {
        Self {
            worker,
            last_ms: None,
            last_sequence: None,
            history: RollingHistory::new(capacity),
            stats: RollingStats::new(),
            exit: None,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.exit.is_some()
    }

    pub fn summary(&self) -> WorkerSummary {
        WorkerSummary {
            worker: self.worker,
            samples: self.stats.count,
            last_ms: self.last_ms,
            mean_ms: self.stats.mean(),
            min_ms: self.stats.min(),
            max_ms: self.stats.max(),
            std_dev_ms: self.stats.std_dev(),
            history: self.history.as_vec(),
            stopped: self.is_stopped(),
        }
    }
}

/// Per-worker rows, updated only by the display loop
#[derive(Debug, Clone)]
pub struct ResultsBoard {
    history_capacity: usize,
    rows: Vec<WorkerRow>,
    events_applied: u64,
}

impl ResultsBoard {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history_capacity,
            rows: Vec::new(),
            events_applied: 0,
        }
    }

    pub fn apply(&mut self, event: ReportEvent) {
        self.events_applied += 1;
        match event {
            ReportEvent::RunStarted { threads } => {
                self.rows = (0..threads).map(|i| WorkerRow::new(i, self.history_capacity)).collect();
            }
            ReportEvent::Sample(sample) => {
                // Out-of-range indices are ignored
                if let Some(row) = self.rows.get_mut(sample.worker) {
                    row.last_ms = Some(sample.elapsed_ms);
                    row.last_sequence = Some(sample.sequence);
                    row.history.push(sample.elapsed_ms);
                    row.stats.add_value(sample.elapsed_ms);
                }
            }
            ReportEvent::WorkerExited(exit) => {
                if let Some(row) = self.rows.get_mut(exit.worker()) {
                    row.exit = Some(exit);
                }
            }
        }
    }

    pub fn rows(&self) -> &[WorkerRow] {
        &self.rows
    }

    pub fn row(&self, worker: usize) -> Option<&WorkerRow> {
        self.rows.get(worker)
    }

    pub fn events_applied(&self) -> u64 {
        self.events_applied
    }

    pub fn all_stopped(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(WorkerRow::is_stopped)
    }

    pub fn summaries(&self) -> Vec<WorkerSummary> {
        self.rows.iter().map(WorkerRow::summary).collect()
    }
}

/// Apply events to `board` as they arrive and call `on_refresh` every
/// `refresh`, plus once more at the end. Returns when all sinks are gone.
pub async fn drain<F>(
    mut receiver: ReportReceiver,
    mut board: ResultsBoard,
    refresh: Duration,
    mut on_refresh: F,
) -> ResultsBoard
where
    F: FnMut(&ResultsBoard),
{
    let mut ticker = tokio::time::interval(refresh.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            event = receiver.recv() => match event {
                Some(event) => board.apply(event),
                None => break,
            },
            _ = ticker.tick() => on_refresh(&board),
        }
    }

    on_refresh(&board);
    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn sample(worker: usize, ms: u64, sequence: u64) -> LatencySample {
        LatencySample::new(worker, Duration::from_millis(ms), sequence)
    }

    #[test]
    fn test_board_last_write_wins() {
        let mut board = ResultsBoard::new(30);
        board.apply(ReportEvent::RunStarted { threads: 2 });
        board.apply(ReportEvent::Sample(sample(1, 10, 1)));
        board.apply(ReportEvent::Sample(sample(1, 25, 2)));

        let row = board.row(1).unwrap();
        assert_eq!(row.last_ms, Some(25.0));
        assert_eq!(row.history.as_vec(), vec![10.0, 25.0]);
        assert_eq!(board.row(0).unwrap().last_ms, None);
    }

    #[test]
    fn test_board_history_bounded() {
        let mut board = ResultsBoard::new(2);
        board.apply(ReportEvent::RunStarted { threads: 1 });
        for (i, ms) in [10, 20, 30].into_iter().enumerate() {
            board.apply(ReportEvent::Sample(sample(0, ms, i as u64 + 1)));
        }
        let row = board.row(0).unwrap();
        assert_eq!(row.history.as_vec(), vec![20.0, 30.0]);
        assert_eq!(row.stats.count, 3);
    }

    #[test]
    fn test_board_ignores_out_of_range_worker() {
        let mut board = ResultsBoard::new(5);
        board.apply(ReportEvent::RunStarted { threads: 1 });
        board.apply(ReportEvent::Sample(sample(7, 10, 1)));
        board.apply(ReportEvent::WorkerExited(WorkerExit::Panicked { worker: 9 }));
        assert_eq!(board.rows().len(), 1);
        assert_eq!(board.row(0).unwrap().last_ms, None);
    }

    #[test]
    fn test_run_started_clears_rows() {
        let mut board = ResultsBoard::new(5);
        board.apply(ReportEvent::RunStarted { threads: 3 });
        board.apply(ReportEvent::Sample(sample(2, 10, 1)));
        board.apply(ReportEvent::RunStarted { threads: 1 });
        assert_eq!(board.rows().len(), 1);
        assert_eq!(board.row(0).unwrap().last_ms, None);
    }

    #[test]
    fn test_summaries_mark_stopped() {
        let mut board = ResultsBoard::new(5);
        board.apply(ReportEvent::RunStarted { threads: 2 });
        board.apply(ReportEvent::Sample(sample(0, 4, 1)));
        board.apply(ReportEvent::WorkerExited(WorkerExit::Stopped {
            worker: 0,
            samples: 1,
            failures: 0,
        }));
        assert!(!board.all_stopped());
        board.apply(ReportEvent::WorkerExited(WorkerExit::LoadFailed {
            worker: 1,
            reason: "missing".into(),
        }));
        assert!(board.all_stopped());

        let summaries = board.summaries();
        assert_eq!(summaries[0].samples, 1);
        assert_eq!(summaries[0].mean_ms, Some(4.0));
        assert!(summaries[1].stopped);
        assert_eq!(summaries[1].last_ms, None);
    }

    #[test]
    fn test_sink_ignores_closed_receiver() {
        let (sink, receiver) = channel();
        drop(receiver);
        assert!(sink.is_closed());
        sink.sample(sample(0, 1, 1));
    }

    #[tokio::test]
    async fn test_drain_preserves_per_producer_order() {
        let (sink, receiver) = channel();
        sink.run_started(3);

        let producers: Vec<_> = (0..3)
            .map(|worker| {
                let sink = sink.clone();
                thread::spawn(move || {
                    for seq in 1..=50 {
                        sink.sample(sample(worker, seq, seq));
                    }
                    sink.worker_exited(WorkerExit::Stopped {
                        worker,
                        samples: 50,
                        failures: 0,
                    });
                })
            })
            .collect();
        drop(sink);

        let mut seen: Vec<Vec<u64>> = vec![Vec::new(); 3];
        let mut receiver = receiver;
        let mut board = ResultsBoard::new(10);
        while let Some(event) = receiver.recv().await {
            if let ReportEvent::Sample(s) = &event {
                seen[s.worker].push(s.sequence);
            }
            board.apply(event);
        }
        for p in producers {
            p.join().unwrap();
        }

        for sequences in &seen {
            assert_eq!(sequences, &(1..=50).collect::<Vec<u64>>());
        }
        assert!(board.all_stopped());
    }

    #[tokio::test]
    async fn test_drain_returns_final_board() {
        let (sink, receiver) = channel();
        sink.run_started(1);
        sink.sample(sample(0, 12, 1));
        drop(sink);

        let mut refreshes = 0;
        let board = drain(receiver, ResultsBoard::new(30), Duration::from_millis(10), |_| refreshes += 1).await;
        assert_eq!(board.row(0).unwrap().last_ms, Some(12.0));
        assert_eq!(board.events_applied(), 2);
        assert!(refreshes >= 1);
    }
}
