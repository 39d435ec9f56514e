use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{env, process, time};
use theseus_dns::resolver::*;
use theseus_dns::shared::logs::{init_log, set_max_level};
use theseus_dns::shared::net::*;

fn main() {
    init_log();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        print_usage();
        process::exit(1);
    }

    let conf = match conf::Conf::from_file(&args[1]) {
        Ok(conf) => {
            set_max_level(conf.log_level);
            log::info!("Parsed configuration: {:?}.", conf);
            conf
        }
        Err(err) => {
            log::error!("Parsing configuration file: {}", err);
            process::exit(1);
        }
    };

    // Instantiate the shared cache and server tracker, collecting all the
    // necessary configuration values. Start the cache reclaim thread.
    let cache_conf = CacheConf {
        ttl_cap: time::Duration::from_secs(conf.resolver.cache.ttl_cap),
        reclaim_period: time::Duration::from_secs(conf.resolver.cache.reclaim_period),
    };
    let tracker_conf = TrackerConf {
        retry_interval: time::Duration::from_millis(conf.resolver.tracker.retry_interval_ms),
    };
    let cache = Arc::new(ResolverCache::new(cache_conf));
    let tracker = Arc::new(ServerTracker::new(tracker_conf));
    let stop = Arc::new(AtomicBool::new(false));
    let reclaim_handle = cache.start_reclaim_routine(Arc::clone(&stop));

    // Instantiate the resolver and wrap it in the request handler.
    let resolver_conf = ResolverParams {
        exchange_timeout: time::Duration::from_millis(conf.resolver.exchange_timeout_ms),
        max_retries: conf.resolver.max_retries,
        max_depth: conf.resolver.max_depth,
        budget: time::Duration::from_millis(conf.resolver.budget_ms),
        negative_ttl: conf.resolver.negative_ttl,
        ..ResolverParams::default()
    };
    let resolver = Resolver::new(&cache, &tracker, resolver_conf);
    let resolver_handler = Arc::new(ResolverHandler(resolver));

    // Start the server. The call blocks until a termination signal raises
    // the stop flag (exit code 0); a setup failure, typically binding the
    // privileged port, exits with code 1.
    let udp_params = UdpParams {
        address: conf.udp_server.address,
        port: conf.udp_server.port,
        write_timeout: time::Duration::from_secs(conf.udp_server.write_timeout),
        threads: conf.udp_server.threads,
    };
    install_stop_handler(&stop, &udp_params);
    match start_udp_server(resolver_handler, udp_params, &stop) {
        Ok(()) => {
            log::warn!("UDP server shut down.");
            stop.store(true, Ordering::SeqCst);
            let _ = reclaim_handle.join();
            process::exit(0);
        }
        Err(err) => {
            log::error!("Cannot setup UDP server: {}", err);
            process::exit(1);
        }
    }
}

fn print_usage() {
    log::error!(
        "One argument should be provided when starting the resolver: the path of the configuration file.
Usage: {} {}",
        "path/to/resolver/binary".bold(),
        "path/to/config/file".bold().bright_green()
    )
}
