mod align;
mod cli;
mod config;
mod devices;
mod error;
mod export;
mod load;
mod logging;
mod pipeline;
mod project;
mod rescale;
mod score;
mod stroke;
mod table;
mod timebase;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}
