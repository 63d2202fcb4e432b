use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(taskboard_sync::config::default_config_path);

    if let Err(e) = taskboard_sync::run(config_path).await {
        eprintln!("taskboard-sync: {}", e);
        std::process::exit(1);
    }
}
