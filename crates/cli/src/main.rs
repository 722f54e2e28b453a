fn main() {
    viewport_cli::init_logging();

    if let Err(error) = viewport_cli::run(std::env::args_os()) {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}
