// Engine orchestration — shell staging, reconciliation, bulk download, lifecycle.

mod fetch;
pub mod offline;
pub mod stats;
pub mod sync;
pub mod worker;
