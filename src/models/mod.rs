pub mod assessment;
pub mod record;

pub use assessment::{Assessment, Section};
pub use record::{ErrorEntry, FigureRef, RebuiltEntry, RebuiltRecord, Record, RecordEntry};
