//! Terminal logging setup.

use log::LevelFilter;

/// Map the `-v` count to a log level.
pub fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the terminal logger.
///
/// Errors go to stderr, routine output to stdout.
pub fn init(verbose: u8) -> anyhow::Result<()> {
    let log_config = simplelog::ConfigBuilder::new()
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .set_location_level(LevelFilter::Off)
        .add_filter_ignore_str("mio")
        .build();

    simplelog::TermLogger::init(
        level_for(verbose),
        log_config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}
