pub mod ocr;
pub mod router;
pub mod server;
pub mod stages;
pub mod storage;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use router::{PipelineDeps, PipelineRouter, PipelineSettings, Stage};
