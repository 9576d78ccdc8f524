use cadence::logger::*;

fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    println!("bootstrap filter: {:?}", logger.current_filter());
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!("bootstrap info log");

    let config = LogConfig {
        filter: "cadence=trace,info".to_string(),
    };
    logger.reload_from_config(&config)?;
    println!("reloaded filter: {:?}", logger.current_filter());
    trace!(target: "cadence", "session trace log");
    debug!(target: "cadence", "session debug log");
    info!("application info log");

    // invalid directives are rejected and the previous filter stays
    let bad = LogConfig {
        filter: "cadence=loud".to_string(),
    };
    println!("invalid filter rejected: {}", logger.reload_from_config(&bad).is_err());

    Ok(())
}
