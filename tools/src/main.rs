use flexi_logger::Logger;
use tools::cat::cat_cmd;
use tools::config::Config;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _logger = Logger::try_with_env_or_str("warn")?.start()?;
    let cfg = Config::from_env()?;
    log::trace!("Init config: {:?}", cfg);
    cat_cmd(&cfg)?;
    Ok(())
}
