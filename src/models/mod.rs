pub mod chunk;
pub mod policy;
pub mod quality;
pub mod record;
pub mod station;

pub use chunk::{Chunk, ChunkBy, ChunkMapping, ChunkPlan, FileFailure};
pub use policy::{FieldPolicy, OnMissing};
pub use quality::{QaCategory, QaCounts, QaOutcome, QaTally, SummaryStats};
pub use record::{FieldValue, FlatMap, FlatRecord, ObservationField, RecordKey};
pub use station::{inverse, with_folder_prefix, FileStationMap, StationFileMap, StationScan};
