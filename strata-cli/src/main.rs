//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    if let Err(err) = strata_cli::run() {
        eprintln!("strata: {err}");
        std::process::exit(1);
    }
}
