// Derived track lists: search filter and shuffle order
// Both are pure over the catalog and hand back shared track handles

pub mod filter;
pub mod shuffle;

pub use filter::filter;
pub use shuffle::shuffle;
