use std::sync::atomic::{AtomicUsize, Ordering};

// Single static counter for all pixel sources
static NEXT_SOURCE_ID: AtomicUsize = AtomicUsize::new(1);

pub fn generate_source_id() -> usize {
    NEXT_SOURCE_ID.fetch_add(1, Ordering::SeqCst)
}
