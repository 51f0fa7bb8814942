//! Worker routines
//!
//! Each worker waits at the start gate, checks where it is, migrates to the
//! sink and back, and verifies its identity survived each hop. The round-trip
//! worker does this once; the stress worker repeats it until stopped.
//!
//! No step is retried. The first failure is the worker's verdict.

use std::sync::{Arc, Barrier};
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{error, info};

use libpopcorn::{Facility, NodeId, PageBox, Tid};

use crate::check::{node_sanity_check, thread_sanity_check};
use crate::error::{HarnessError, Result};
use crate::record::{Phase, ThreadRecord};
use crate::shutdown::StopToken;

/// Report a worker sends exactly once, when it is done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub index: usize,
    pub tid: Option<Tid>,
    pub code: i32,
    pub phase: Phase,
}

/// Stress loop tuning
#[derive(Debug, Clone, Copy)]
pub struct StressSettings {
    pub rest: Duration,
    pub max_rounds: Option<u64>,
}

/// Everything a worker shares with the rest of the run
#[derive(Clone)]
pub struct WorkerContext {
    pub facility: Arc<dyn Facility>,
    pub barrier: Arc<Barrier>,
    pub completions: Sender<Completion>,
    /// Repeat the node check on the sink side
    pub remote_checks: bool,
}

impl WorkerContext {
    /// Close out the record and report to the collector
    fn complete(&self, record: &mut ThreadRecord, result: Result<()>) {
        if let Err(e) = &result {
            error!(
                worker = record.index,
                check = e.check(),
                phase = %record.phase,
                "FAILED: {}",
                e
            );
        }

        record.finish(&result);
        let phase = record.phase;
        record.enter(Phase::Done);

        // The collector only goes away once every report is in
        let _ = self.completions.send(Completion {
            index: record.index,
            tid: record.tid,
            code: record.err,
            phase,
        });
    }

    /// Current identity, which must be a valid id
    fn identity(&self, nid: NodeId) -> Result<Tid> {
        match self.facility.gettid() {
            Ok(tid) if tid.is_valid() => Ok(tid),
            _ => Err(HarnessError::IdentityLost { nid }),
        }
    }

    /// Identity after a hop, which must match the one taken at the source
    fn verify_identity(&self, nid: NodeId, expected: Tid) -> Result<Tid> {
        let actual = self.identity(nid)?;
        if actual != expected {
            return Err(HarnessError::IdentityMismatch { expected, actual });
        }
        Ok(actual)
    }

    fn migrate(&self, tid: Tid, target: NodeId) -> Result<()> {
        self.facility
            .migrate(target)
            .map_err(|reason| HarnessError::MigrationRejected {
                tid,
                target,
                reason,
            })
    }

    fn wait_at_barrier(&self, record: &mut ThreadRecord) {
        record.enter(Phase::WaitAtBarrier);
        self.barrier.wait();
    }

    /// Identity and node check at the source; returns the source identity
    fn verify_local(&self, record: &mut ThreadRecord) -> Result<Tid> {
        let (source, sink) = (record.source_nid, record.sink_nid);

        record.enter(Phase::VerifyLocalNode);
        let tid = self.identity(source)?;
        record.tid = Some(tid);
        info!("Thread ID is {}", tid);

        let archs = node_sanity_check(self.facility.as_ref(), source, sink)?;
        record.arch[source.index()] = archs.local;
        record.arch[sink.index()] = archs.remote;

        Ok(tid)
    }

    /// Hop to the sink and confirm identity there
    fn leg_to_sink(&self, record: &mut ThreadRecord, tid: Tid) -> Result<()> {
        let (source, sink) = (record.source_nid, record.sink_nid);

        record.enter(Phase::MigrateToSink);
        self.migrate(tid, sink)?;

        record.enter(Phase::VerifyAtSink);
        record.last_sink_tid = Some(self.verify_identity(sink, tid)?);
        if self.remote_checks {
            node_sanity_check(self.facility.as_ref(), sink, source)?;
        }
        Ok(())
    }

    /// Hop back to the source and confirm identity there
    fn leg_to_source(&self, record: &mut ThreadRecord, tid: Tid) -> Result<()> {
        record.enter(Phase::MigrateToSource);
        self.migrate(tid, record.source_nid)?;

        record.enter(Phase::VerifyBackAtSource);
        self.verify_identity(record.source_nid, tid)?;
        Ok(())
    }
}

/// Single source -> sink -> source trip
pub fn roundtrip_worker(
    ctx: WorkerContext,
    mut record: PageBox<ThreadRecord>,
) -> PageBox<ThreadRecord> {
    ctx.wait_at_barrier(&mut record);
    let result = roundtrip(&ctx, &mut record);
    ctx.complete(&mut record, result);
    record
}

fn roundtrip(ctx: &WorkerContext, record: &mut ThreadRecord) -> Result<()> {
    let tid = ctx.verify_local(record)?;

    record.enter(Phase::VerifyLocalThread);
    thread_sanity_check(ctx.facility.as_ref(), record.source_nid, tid)?;

    ctx.leg_to_sink(record, tid)?;
    ctx.leg_to_source(record, tid)?;
    info!("We should have arrived back at source node.");

    node_sanity_check(ctx.facility.as_ref(), record.source_nid, record.sink_nid)?;
    record.rounds = 1;

    info!("Thread {} PASSED at NODE {}", tid, record.source_nid);
    Ok(())
}

/// Back and forth until stopped, failed, or out of rounds
pub fn stress_worker(
    ctx: WorkerContext,
    settings: StressSettings,
    stop: StopToken,
    mut record: PageBox<ThreadRecord>,
) -> PageBox<ThreadRecord> {
    ctx.wait_at_barrier(&mut record);
    let result = stress(&ctx, settings, &stop, &mut record);
    ctx.complete(&mut record, result);
    record
}

fn stress(
    ctx: &WorkerContext,
    settings: StressSettings,
    stop: &StopToken,
    record: &mut ThreadRecord,
) -> Result<()> {
    let tid = ctx.verify_local(record)?;
    let (source, sink) = (record.source_nid, record.sink_nid);

    loop {
        if stop.is_stopped() || settings.max_rounds.is_some_and(|max| record.rounds >= max) {
            break;
        }

        ctx.leg_to_sink(record, tid)?;
        info!(
            "[{}]: Touched {} line, pivot and run back to source node",
            tid,
            record.arch_of(sink)
        );

        ctx.leg_to_source(record, tid)?;
        info!(
            "[{}]: Touched {} line, pivot and run back to sink node",
            tid,
            record.arch_of(source)
        );
        record.rounds += 1;

        record.enter(Phase::Rest);
        if stop.rest(settings.rest) {
            break;
        }
    }

    info!("Thread {} stopped after {} rounds", tid, record.rounds);
    Ok(())
}
