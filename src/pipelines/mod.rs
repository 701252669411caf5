pub use self::spread_pipeline::{SpreadError, SpreadPipeline, SpreadTimings};

mod spread_pipeline;
