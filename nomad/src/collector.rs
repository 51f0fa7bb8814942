//! Completion collector
//!
//! Waits for one completion per worker on a channel, then joins every worker
//! and turns the returned records into a report.

use std::collections::HashMap;
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;
use tracing::{debug, error, warn};

use libpopcorn::{NodeId, PageBox, Tid};

use crate::config::ExitPolicy;
use crate::error::FAILURE;
use crate::record::{Phase, ThreadRecord};
use crate::worker::Completion;

/// Final state of one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOutcome {
    pub index: usize,
    pub source_nid: NodeId,
    pub tid: Option<Tid>,
    pub code: i32,
    /// Phase the worker was in when it finished
    pub phase: Phase,
    pub rounds: u64,
}

impl WorkerOutcome {
    pub fn passed(&self) -> bool {
        self.code == 0
    }
}

/// Outcomes of a run, in spawn order
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: Vec<WorkerOutcome>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(WorkerOutcome::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &WorkerOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }

    pub fn total_rounds(&self) -> u64 {
        self.outcomes.iter().map(|o| o.rounds).sum()
    }

    /// Process exit code under `policy`
    pub fn exit_code(&self, policy: ExitPolicy) -> i32 {
        match policy {
            ExitPolicy::Last => self.outcomes.last().map_or(0, |o| o.code),
            ExitPolicy::FirstFailure => self.failures().next().map_or(0, |o| o.code),
        }
    }

    /// Per-worker lines and the verdict, on stdout
    pub fn print(&self, label: &str, policy: ExitPolicy) {
        for outcome in &self.outcomes {
            println!(
                "TEST at NODE {} Thread {} exited with CODE {}",
                outcome.source_nid,
                outcome.tid.unwrap_or(Tid(-1)),
                outcome.code
            );
        }

        if self.passed() {
            println!("{} PASSED", label);
        } else {
            println!("{} FAILED with CODE {}", label, self.exit_code(policy));
        }
    }
}

/// Block until every worker reports, then join them all
///
/// A worker that dies without reporting disconnects its sender; once every
/// sender is gone the wait ends early and the join picks up the panic.
pub fn collect(
    completions: Receiver<Completion>,
    workers: Vec<JoinHandle<PageBox<ThreadRecord>>>,
    source_nid: NodeId,
) -> RunReport {
    let expected = workers.len();
    let mut reported = HashMap::with_capacity(expected);

    while reported.len() < expected {
        match completions.recv() {
            Ok(completion) => {
                debug!(
                    worker = completion.index,
                    code = completion.code,
                    "Worker reported ({}/{})",
                    reported.len() + 1,
                    expected
                );
                reported.insert(completion.index, completion);
            }
            Err(_) => {
                warn!(
                    "Completion channel closed with {} of {} reports",
                    reported.len(),
                    expected
                );
                break;
            }
        }
    }

    let outcomes = workers
        .into_iter()
        .enumerate()
        .map(|(index, handle)| match handle.join() {
            Ok(record) => WorkerOutcome {
                index: record.index,
                source_nid: record.source_nid,
                tid: record.tid,
                code: record.err,
                phase: reported.get(&record.index).map_or(record.phase, |c| c.phase),
                rounds: record.rounds,
            },
            Err(_) => {
                error!(worker = index, "Worker panicked");
                let completion = reported.get(&index);
                WorkerOutcome {
                    index,
                    source_nid,
                    tid: completion.and_then(|c| c.tid),
                    code: FAILURE,
                    phase: completion.map_or(Phase::Start, |c| c.phase),
                    rounds: 0,
                }
            }
        })
        .collect();

    RunReport { outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(index: usize, code: i32) -> WorkerOutcome {
        WorkerOutcome {
            index,
            source_nid: NodeId::new(0).unwrap(),
            tid: Some(Tid(100 + index as i32)),
            code,
            phase: Phase::VerifyBackAtSource,
            rounds: 1,
        }
    }

    #[test]
    fn test_exit_code_policies() {
        let report = RunReport {
            outcomes: vec![outcome(0, 0), outcome(1, -11), outcome(2, -1), outcome(3, 0)],
        };

        assert!(!report.passed());
        assert_eq!(report.exit_code(ExitPolicy::Last), 0);
        assert_eq!(report.exit_code(ExitPolicy::FirstFailure), -11);
        assert_eq!(report.failures().count(), 2);
        assert_eq!(report.total_rounds(), 4);
    }

    #[test]
    fn test_empty_report_passes() {
        let report = RunReport::default();
        assert!(report.passed());
        assert_eq!(report.exit_code(ExitPolicy::Last), 0);
        assert_eq!(report.exit_code(ExitPolicy::FirstFailure), 0);
    }

    #[test]
    fn test_collects_and_joins() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let source = NodeId::new(0).unwrap();
        let sink = NodeId::new(1).unwrap();

        let workers = (0..3)
            .map(|index| {
                let tx = tx.clone();
                std::thread::spawn(move || {
                    let mut record = PageBox::try_new(ThreadRecord::new(index, source, sink)).unwrap();
                    record.tid = Some(Tid(10 + index as i32));
                    record.finish(&Ok(()));
                    tx.send(Completion {
                        index,
                        tid: record.tid,
                        code: record.err,
                        phase: Phase::VerifyBackAtSource,
                    })
                    .unwrap();
                    record
                })
            })
            .collect();
        drop(tx);

        let report = collect(rx, workers, source);
        assert!(report.passed());
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.outcomes[2].tid, Some(Tid(12)));
        assert_eq!(report.outcomes[0].phase, Phase::VerifyBackAtSource);
    }

    #[test]
    fn test_panicked_worker_fails() {
        let (tx, rx) = crossbeam_channel::unbounded::<Completion>();
        let worker = std::thread::spawn(move || -> PageBox<ThreadRecord> {
            let _tx = tx;
            panic!("worker blew up");
        });

        let report = collect(rx, vec![worker], NodeId::new(0).unwrap());
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].code, FAILURE);
        assert_eq!(report.exit_code(ExitPolicy::Last), FAILURE);
    }
}
