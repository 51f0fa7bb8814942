//! Thread pool initialization
//!
//! Allocates one page-aligned record per worker and the start barrier shared
//! by the workers and the main thread.

use std::sync::{Arc, Barrier};

use tracing::debug;

use libpopcorn::{AllocError, NodeId, PageBox};

use crate::error::Result;
use crate::record::ThreadRecord;

/// Records and start gate for a run
pub struct ThreadPool {
    pub records: Vec<PageBox<ThreadRecord>>,
    /// Sized for every worker plus the main thread
    pub barrier: Arc<Barrier>,
}

impl ThreadPool {
    /// Allocate `count` records for workers migrating between `source` and `sink`
    pub fn init(count: usize, source: NodeId, sink: NodeId) -> Result<Self> {
        let mut records = Vec::new();
        records.try_reserve_exact(count).map_err(|_| AllocError {
            size: count.saturating_mul(std::mem::size_of::<PageBox<ThreadRecord>>()),
        })?;

        for index in 0..count {
            records.push(PageBox::try_new(ThreadRecord::new(index, source, sink))?);
        }

        let barrier = Arc::new(Barrier::new(count + 1));
        debug!("Initialized {} thread records, barrier of {}", count, count + 1);

        Ok(Self { records, barrier })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use libpopcorn::PAGE_SIZE;

    #[test]
    fn test_records_are_page_aligned() {
        let source = NodeId::new(0).unwrap();
        let sink = NodeId::new(1).unwrap();
        let pool = ThreadPool::init(4, source, sink).unwrap();

        assert_eq!(pool.len(), 4);
        for (i, record) in pool.records.iter().enumerate() {
            assert_eq!(record.addr() % PAGE_SIZE, 0);
            assert_eq!(record.index, i);
            assert_eq!(record.source_nid, source);
            assert_eq!(record.sink_nid, sink);
        }
    }

    #[test]
    fn test_oversized_pool_reports_allocation_failure() {
        let result = ThreadPool::init(usize::MAX / 2, NodeId::new(0).unwrap(), NodeId::new(1).unwrap());
        match result {
            Err(HarnessError::Allocation(err)) => {
                assert_eq!(err.size, usize::MAX);
                assert_eq!(err.code(), -12);
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("reserved half the address space"),
        }
    }

    #[test]
    fn test_records_do_not_share_pages() {
        let pool = ThreadPool::init(2, NodeId::new(0).unwrap(), NodeId::new(1).unwrap()).unwrap();
        let a = pool.records[0].addr();
        let b = pool.records[1].addr();
        assert!(a.abs_diff(b) >= PAGE_SIZE);
    }
}
