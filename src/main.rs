fn main() {
    if let Err(err) = ncbi_mapper::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
