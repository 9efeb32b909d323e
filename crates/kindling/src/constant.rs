/// # Constants with reserved meanings in kindling

/// Queue capacity used when none is configured
pub const DEFAULT_QUEUE_SIZE: usize = 2;

/// Name given to the prefetch worker thread when none is configured
pub const DEFAULT_THREAD_NAME: &str = "kindling-prefetch";
