//! eemc entry point.

fn main() {
    if let Err(e) = eemc::cli::run_cli() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
