pub mod constants;
pub mod paths;
pub mod progress;
pub mod source_uri;

pub use constants::*;
pub use paths::{ensure_folder_exists, file_name_of, list_input_files, output_dir_for};
pub use progress::ProgressReporter;
pub use source_uri::{station_from_uri, unique_file_id};
