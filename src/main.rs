// src/main.rs
//
// Binary entry point; all logic lives in the library crate.

fn main() {
    if let Err(e) = weighbridge::run() {
        eprintln!("weighbridge: {}", e);
        std::process::exit(1);
    }
}
