pub mod diff;
pub mod select;

pub use diff::SnapshotDiff;
pub use select::select;
