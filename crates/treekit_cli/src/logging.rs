use log::LevelFilter;

fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the stderr logger. `RUST_LOG` directives still apply per module.
pub fn init(verbose: u8) -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(level_for(verbose))
        .format_timestamp_secs()
        .format_module_path(true)
        .format_target(false)
        .try_init()?;

    log::debug!("logger ready at {}", log::max_level());
    Ok(())
}
