/// Example program to print the loaded configuration
///
/// Run with: cargo run -p glide-config --example print_config

fn main() {
    let config = glide_config::GlideConfig::load();

    println!("=== Glide Configuration ===\n");

    println!("Scroll Settings:");
    println!("  Smooth: {}", config.scroll.smooth);
    println!("  Mode: {:?}", config.scroll.mode);
    println!("  Smoothing: {}", config.scroll.smoothing);
    println!("  Scrub Smoothing: {}", config.scroll.scrub_smoothing);
    println!("  Settle Epsilon: {}", config.scroll.settle_epsilon);
    println!("  Persist: {}", config.scroll.persist);
    println!();

    println!("Frame Settings:");
    println!("  Target FPS: {:?}", config.frame.target_fps);
    println!();

    match toml::to_string_pretty(&config) {
        Ok(toml_str) => {
            println!("=== Serialized Configuration ===");
            println!("{}", toml_str);
        }
        Err(e) => {
            eprintln!("Failed to serialize config: {}", e);
        }
    }
}
