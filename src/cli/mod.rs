mod toolset;
mod types;

pub use types::{available_tools, load_env_file, load_env_file_from, Cli};
