use clap::{App, Arg, ArgMatches};
use linksim::control::{
    DEFAULT_BASE_DELAY_MS, DEFAULT_PER_BYTE_DELAY_MS, DEFAULT_PROPAGATION_DELAY_MS,
};
use linksim::traffic::TrafficPattern;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

pub enum LogLevel {
    Info,
    Warning,
    Debug,
}

impl From<&LogLevel> for log::LevelFilter {
    fn from(level: &LogLevel) -> Self {
        match level {
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Debug => log::LevelFilter::Debug,
        }
    }
}

pub struct Config {
    pub propagation_ms: u32,
    pub base_ms: u32,
    pub per_byte_ms: u32,
    pub traffic: TrafficPattern,
    pub gateway: Ipv4Addr,
    pub log_level: LogLevel,
    pub log_file: String,
}

fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> T {
    let raw = matches.value_of(name).unwrap_or_default();
    match raw.parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            eprintln!("invalid value for --{}: {}", name, raw);
            std::process::exit(1);
        }
    }
}

impl Config {
    pub fn from_cli() -> Config {
        let default_propagation = DEFAULT_PROPAGATION_DELAY_MS.to_string();
        let default_base = DEFAULT_BASE_DELAY_MS.to_string();
        let default_per_byte = DEFAULT_PER_BYTE_DELAY_MS.to_string();

        let matches = App::new("linksim")
            .version("1.0.0")
            .author("Holger Kaden <holger.kaden@logmein.com>")
            .about("simulated network link with serialization and propagation delay")
            .arg(
                Arg::with_name("propdelay")
                    .long("propdelay")
                    .takes_value(true)
                    .default_value(&default_propagation)
                    .help("fixed propagation delay in ms, 0 sends right after serialization"),
            )
            .arg(
                Arg::with_name("basedelay")
                    .long("basedelay")
                    .takes_value(true)
                    .default_value(&default_base)
                    .help("transmit time per packet in ms"),
            )
            .arg(
                Arg::with_name("perbyte")
                    .long("perbyte")
                    .takes_value(true)
                    .default_value(&default_per_byte)
                    .help("transmit time per byte in ms"),
            )
            .arg(
                Arg::with_name("pattern_file")
                    .long("pattern_file")
                    .takes_value(true)
                    .help("csv traffic pattern with offset_ms, size and tos per packet"),
            )
            .arg(
                Arg::with_name("count")
                    .long("count")
                    .takes_value(true)
                    .default_value("10")
                    .help("number of generated packets, ignored with --pattern_file"),
            )
            .arg(
                Arg::with_name("size")
                    .long("size")
                    .takes_value(true)
                    .default_value("100")
                    .help("size in bytes of a generated ip packet (includes protocol headers)"),
            )
            .arg(
                Arg::with_name("interval_ms")
                    .long("interval_ms")
                    .takes_value(true)
                    .default_value("20")
                    .help("distance between two generated packets"),
            )
            .arg(
                Arg::with_name("tos")
                    .long("tos")
                    .takes_value(true)
                    .default_value("0")
                    .help("type of service of generated packets"),
            )
            .arg(
                Arg::with_name("gateway")
                    .long("gateway")
                    .takes_value(true)
                    .default_value("127.0.0.1")
                    .help("next hop gateway recorded in the queue header"),
            )
            .arg(
                Arg::with_name("log_level")
                    .long("log_level")
                    .takes_value(true)
                    .possible_values(&["info", "debug", "warn"])
                    .default_value("info")
                    .help("log level"),
            )
            .arg(
                Arg::with_name("log_file")
                    .long("log_file")
                    .takes_value(true)
                    .default_value("linksim.log")
                    .help("file the log is written to"),
            )
            .get_matches();

        let log_level = match matches.value_of("log_level") {
            Some("debug") => LogLevel::Debug,
            Some("warn") => LogLevel::Warning,
            _ => LogLevel::Info,
        };

        let traffic = if let Some(pattern_file) = matches.value_of("pattern_file") {
            match TrafficPattern::parse(pattern_file) {
                Ok(pattern) => pattern,
                Err(e) => {
                    eprintln!("error parsing {}: {}", pattern_file, e);
                    std::process::exit(1);
                }
            }
        } else {
            let size = value::<usize>(&matches, "size");
            if size > u16::MAX as usize {
                eprintln!("ip packet size must not exceed {} bytes", u16::MAX);
                std::process::exit(1);
            }
            TrafficPattern::constant(
                value(&matches, "count"),
                size,
                Duration::from_millis(value(&matches, "interval_ms")),
                value(&matches, "tos"),
            )
        };

        Config {
            propagation_ms: value(&matches, "propdelay"),
            base_ms: value(&matches, "basedelay"),
            per_byte_ms: value(&matches, "perbyte"),
            traffic,
            gateway: value(&matches, "gateway"),
            log_level,
            log_file: value(&matches, "log_file"),
        }
    }
}
