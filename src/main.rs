mod config;
mod logging;

use linksim::iface::Interface;
use linksim::sim_tx;
use linksim::sink::LoggingSink;
use linksim::SimControl;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;

async fn read_commands(control: Arc<SimControl>) {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let args: Vec<&str> = line.split_whitespace().collect();
        if args.is_empty() {
            continue;
        }
        match control.command(&args) {
            Ok(reply) => println!("{}", reply),
            Err(e) => eprintln!("{}", e),
        }
    }
}

async fn run(cfg: config::Config) {
    let control = Arc::new(SimControl::new(cfg.propagation_ms, cfg.base_ms, cfg.per_byte_ms));
    let iface = Arc::new(Interface::new("sim0", LoggingSink::new()));

    log::info!("{}", cfg.traffic);
    let tx = sim_tx::start(Arc::clone(&iface), Arc::clone(&control));
    tokio::spawn(read_commands(Arc::clone(&control)));

    let queued = match cfg.traffic.replay(&iface, cfg.gateway).await {
        Ok(queued) => queued as u64,
        Err(e) => {
            log::error!("traffic replay aborted: {}", e);
            eprintln!("{}", e);
            iface.stats().queued
        }
    };

    while iface.stats().sent < queued {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    iface.detach();
    if let Err(e) = tx.await {
        log::error!("transmit task failed: {}", e);
    }

    log::info!("{}", iface);
    println!("{}", iface);
}

fn main() {
    println!("Start link simulator");
    let cfg = config::Config::from_cli();
    logging::init(&cfg.log_file, (&cfg.log_level).into());

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("cannot start runtime: {}", e);
            std::process::exit(1);
        }
    };

    runtime.block_on(run(cfg));
    // stdin reader may still be blocked on a read
    runtime.shutdown_timeout(Duration::from_millis(100));
}
