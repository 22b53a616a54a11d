//! Streams stored as lists in a [`rangestream_storage::ListStore`].
//!
//! Each stream is one list whose key is the stream name. The engine offers
//! only append, positional read and trim-to-window, so a delete in the
//! middle of a stream is done in three steps:
//!
//! 1. read the tail after the deleted range
//! 2. trim the list to the prefix before it
//! 3. append the saved tail again
//!
//! Step 3 failing after step 2 loses the tail; that is reported as
//! [`crate::StreamError::PartialDeleteDataLoss`]. Engines with a native
//! range delete skip all three steps.

mod backend;
mod iter;
mod stream;

pub use backend::{ListBackend, STREAM_SCAN_LIMIT};
pub use iter::RangeIter;
pub use stream::ListStream;
