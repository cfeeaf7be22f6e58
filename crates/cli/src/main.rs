fn main() {
    earmark_app::init_logging(&["earmark=info"]);

    if let Err(error) = earmark_cli::run(std::env::args_os()) {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}
