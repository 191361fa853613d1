/// Damage Labeler entry point for native builds
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;
    use damage_labeler::native::{self, Cli};

    let cli = Cli::parse();

    let config = match native::load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };

    env_logger::Builder::new()
        .filter_level(config.preferences.log_level.to_level_filter())
        .parse_env("RUST_LOG")
        .init();

    if let Err(e) = native::run(&cli, config) {
        log::error!("{}", e);
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}
