//! levoyage binary entry point

use clap::Parser;
use lepasserelle::{format_anyhow, Cli};

fn main() {
    let cli = Cli::parse();
    if let Err(err) = cli.run() {
        eprintln!("{}", format_anyhow(&err));
        std::process::exit(1);
    }
}
