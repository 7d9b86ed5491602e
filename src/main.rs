//! ovnci CLI binary
//!
//! All logic is in the library; main.rs only invokes cli::run().

fn main() {
    if let Err(code) = ovnci::cli::run() {
        std::process::exit(code.as_i32());
    }
}
