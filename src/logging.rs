use log::LevelFilter;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

pub fn init(log_file: &str, level: LevelFilter) {
    let logfile = match FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d}   {l} - {m}\n")))
        .build(log_file)
    {
        Ok(file) => file,
        Err(e) => panic!("Error while creating log file {}: {}", log_file, e),
    };

    let config = match Config::builder()
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .build(Root::builder().appender("logfile").build(level))
    {
        Ok(config) => config,
        Err(e) => panic!("invalid logging configuration: {}", e),
    };

    if let Err(e) = log4rs::init_config(config) {
        panic!("logger already initialized: {}", e);
    }

    log::info!("Logging initialized to {}, level: {}", log_file, level);
}
