pub mod chunker;
pub mod observation_flattener;
pub mod parallel_processor;
pub mod record_composer;
pub mod sanity_checker;

pub use chunker::{chunk_by_size, chunk_by_station, default_chunk_size, load_or_build_station_map};
pub use observation_flattener::{FlattenOptions, ObservationFlattener};
pub use parallel_processor::{ChunkReport, ChunkResult, ParallelProcessor, RunReport};
pub use record_composer::RecordComposer;
pub use sanity_checker::{SanityChecker, SanityOutcome, SanityReport};
