//! Test runs
//!
//! Validated arguments in, report out: allocate the records, start the
//! workers, open the start gate and collect.

use std::sync::Arc;
use std::thread;

use tracing::{debug, info};

use libpopcorn::{Facility, NodeId, PageBox, Tid};

use crate::args::{RoundTripArgs, StressArgs};
use crate::collector::{self, RunReport};
use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::pool::ThreadPool;
use crate::record::ThreadRecord;
use crate::shutdown::StopToken;
use crate::worker::{self, StressSettings, WorkerContext};

/// Runs tests against one facility
pub struct Harness {
    facility: Arc<dyn Facility>,
    config: HarnessConfig,
}

impl Harness {
    pub fn new(facility: Arc<dyn Facility>, config: HarnessConfig) -> Self {
        Self { facility, config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Identity of the launching thread, which must be valid before any
    /// worker starts
    pub fn announce_process(&self, source: NodeId) -> Result<Tid> {
        match self.facility.gettid() {
            Ok(tid) if tid.is_valid() => {
                info!("Process ID is {}", tid);
                Ok(tid)
            }
            _ => Err(HarnessError::IdentityLost { nid: source }),
        }
    }

    /// One worker, one source -> sink -> source trip
    pub fn run_roundtrip(&self, args: RoundTripArgs) -> Result<RunReport> {
        info!("Single thread migration test: {} -> {}", args.source, args.sink);
        self.run(1, args.source, args.sink, worker::roundtrip_worker)
    }

    /// `args.threads` workers looping between the nodes until `stop` trips
    /// or the configured round limit is reached
    pub fn run_stress(&self, args: StressArgs, stop: StopToken) -> Result<RunReport> {
        info!(
            "Multi thread migration test: {} workers, {} <-> {}",
            args.threads, args.source, args.sink
        );

        let settings = StressSettings {
            rest: self.config.rest(),
            max_rounds: self.config.max_rounds,
        };
        self.run(args.threads, args.source, args.sink, move |ctx, record| {
            worker::stress_worker(ctx, settings, stop.clone(), record)
        })
    }

    fn run<F>(&self, count: usize, source: NodeId, sink: NodeId, routine: F) -> Result<RunReport>
    where
        F: Fn(WorkerContext, PageBox<ThreadRecord>) -> PageBox<ThreadRecord>
            + Clone
            + Send
            + 'static,
    {
        self.announce_process(source)?;

        let pool = ThreadPool::init(count, source, sink)?;
        let (tx, rx) = crossbeam_channel::bounded(count);
        let ctx = WorkerContext {
            facility: self.facility.clone(),
            barrier: pool.barrier.clone(),
            completions: tx,
            remote_checks: self.config.remote_checks,
        };

        let mut workers = Vec::with_capacity(count);
        for record in pool.records {
            let ctx = ctx.clone();
            let routine = routine.clone();
            let handle = thread::Builder::new()
                .name(format!("nomad-worker-{}", record.index))
                .spawn(move || routine(ctx, record))
                .map_err(HarnessError::Spawn)?;
            workers.push(handle);
        }
        // Workers hold the only senders from here on
        drop(ctx);

        debug!("Spawned {} workers, opening the start gate", workers.len());
        pool.barrier.wait();

        Ok(collector::collect(rx, workers, source))
    }
}
