/// Input files with names at or below this length are control files, not observations
pub const MIN_DATA_FILENAME_LEN: usize = 38;

/// Path component marking raw input, and its replacement for extracted output
pub const RAW_SEGMENT: &str = "raw";
pub const OUTPUT_SEGMENT: &str = "interim";

/// Side artifact holding the file → station mapping of an input folder
pub const STATION_CACHE_FILE: &str = "mapping_filename2station.json";

/// Extension of persisted batch artifacts
pub const BATCH_EXTENSION: &str = "json";

/// Processing defaults
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1000;

/// Document version of the original schema (no status indicators)
pub const ORIGINAL_SCHEMA_VERSION: &str = "0";

/// Sensor type whose origin identifier is reused across instances
pub const DUMMY_BYPASS_SENSOR: &str = "dummy_bypass_sensor";

/// source_uri path segments (by index after splitting on '/') naming the station, in join order
pub const STATION_URI_SEGMENTS: [usize; 2] = [10, 9];

/// source_uri path segments naming one observation file, in join order
pub const FILE_ID_URI_SEGMENTS: [usize; 3] = [10, 9, 8];
pub const FILE_ID_TRAILING_SEGMENT: usize = 12;
