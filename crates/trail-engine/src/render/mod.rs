pub mod jsonl;
pub mod log;
pub mod text;

pub use jsonl::{serialize_snapshot, JsonlRenderer};
pub use log::LogRenderer;
pub use text::{render_chart, TextRenderer};
