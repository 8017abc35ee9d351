#![forbid(unsafe_code)]

//! dircapd — folder size-cap purge daemon entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        eprintln!("dircapd: {e}");
        std::process::exit(1);
    }
}
