use clap::Parser;
use upscaler_app::cli::Cli;
use upscaler_app::commands;
use upscaler_app::config::AppConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_overrides(cli.api_base_url, cli.auth_base_url);
    config.validate()?;

    engine_logging::initialize(config.destination()?, config.level()?, &config.log_file);
    commands::run(cli.command, &config)
}
