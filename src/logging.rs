use anyhow::Result;
use colored::Colorize;
use fern::Dispatch;
use log::LevelFilter;

pub fn set_up_logging(verbose: bool) -> Result<()> {
    Dispatch::new()
        .format(|out, message, record| {
            let level = match record.level() {
                log::Level::Error => "error".red().bold(),
                log::Level::Warn => "warn".yellow().bold(),
                log::Level::Info => "info".green(),
                log::Level::Debug => "debug".cyan(),
                log::Level::Trace => "trace".normal(),
            };
            out.finish(format_args!("[{}][{}] {}", record.target(), level, message));
        })
        .level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}
