pub mod batch_writer;

pub use batch_writer::{Batch, BatchFileInfo, BatchWriter, StoredBatch};
