fn main() {
    #[cfg(feature = "cli")]
    oxircs::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("oxircs: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
