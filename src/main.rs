fn main() {
    if let Err(err) = trace_recon::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
