mod files;
mod process;
mod web;

pub use files::{check_file_exists, delete_file, list_directory, read_file, write_file};
pub use process::{analyze_code, run_command, run_tests};
pub use web::{read_url, search_web};
