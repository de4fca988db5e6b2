fn main() {
    env_logger::init();
    if let Err(e) = afterglow::cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
