mod app;
mod cli;
mod console;
mod logging;

use app::App;
use clap::Parser;
use cli::Cli;
use epimem_experiment::load_or_sample;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let config = cli.load_config()?;
    let catalog = load_or_sample(cli.catalog.as_deref());
    tracing::info!(
        "Catalog '{}': {} rooms, sessions go to {}",
        catalog.experiment_name,
        catalog.rooms.len(),
        config.sessions_dir.display()
    );

    let app = App::new(config, catalog);
    app.run().await?;

    Ok(())
}
