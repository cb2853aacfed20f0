mod config;
mod filter;
mod scenarios;

use std::path::PathBuf;

pub fn init_logger() {
    if pretty_env_logger::try_init().is_err() {
        println!("could not init env_logger");
    }
}

pub fn data_path(file: &str) -> PathBuf {
    PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap_or(".".to_string()))
        .join("data")
        .join(file)
}
