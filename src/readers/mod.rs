pub mod derived_reader;
pub mod document;
pub mod metadata_reader;
pub mod station_reader;
pub mod summary_reader;

pub use derived_reader::DerivedReader;
pub use document::{find_child, find_children, Document, ElementFilter, MatchRule, XmlFile};
pub use metadata_reader::{identification_value, MetadataReader, IDENTIFICATION_FIELDS};
pub use station_reader::StationReader;
pub use summary_reader::read_summary_stats;
