use std::process;

fn main() {
    if let Err(e) = dirrun::cli::run() {
        eprintln!("Error: {:?}", anyhow::Error::new(e).context("dirrun failed"));
        process::exit(1);
    }
}
