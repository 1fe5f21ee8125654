//! Frontscan Binary

use frontscan::{EnhancedCli, ScanError};
use std::process;

fn main() {
    let mut cli = EnhancedCli::new();

    match cli.run() {
        Ok(()) => {}
        Err(ScanError::Io(e)) => {
            eprintln!("IO Error: {}", e);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Scan failed: {}", e);
            process::exit(1);
        }
    }
}
