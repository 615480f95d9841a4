use std::fs::{self, File};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use keyzerchief::core::config;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

#[derive(Parser)]
#[command(name = "keyzerchief", about = "Terminal keystore manager built on keytool and openssl")]
struct Args {
    /// Keystore to open at startup
    keystore: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // The terminal belongs to the UI, so everything is logged to a file
    let log_path = config::log_path();
    if let Some(dir) = log_path.parent() {
        let _ = fs::create_dir_all(dir);
    }
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(log_file) = File::create(&log_path) {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    log::info!("Keyzerchief starting with keystore: {:?}", args.keystore);

    match keyzerchief::tui::run(config::resolve(args.keystore)) {
        Ok(code) => code,
        Err(e) => {
            log::error!("Terminal error: {e}");
            eprintln!("keyzerchief: {e}");
            ExitCode::from(1)
        }
    }
}
