pub mod figure_classifier;
pub mod id_resolver;
pub mod storage;
pub mod text_flattener;

pub use figure_classifier::{classify, ElementProbe, FigureClassifier, FigureKind, Region};
pub use id_resolver::IdResolver;
pub use storage::Storage;
pub use text_flattener::TextFlattener;
