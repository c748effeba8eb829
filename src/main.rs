//! regtest CLI entry point

fn main() {
    // Logging is initialized by the CLI once `--verbose` is known
    regtest::cli::run();
}
