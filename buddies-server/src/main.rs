use buddies_common::db::{self, create_db_async_pool};
use buddies_common::directory::{CandidateDirectory, ShipmentLedger};
use buddies_common::lifecycle::{BuddyRequestManager, LifecycleConfig};
use buddies_common::role::RoleResolver;
use buddies_common::store::RelationshipStore;

use actix_web::web::Data;
use actix_web::{App, HttpServer};
use flexi_logger::{
    Age, Cleanup, Criterion, Duplicate, FileSpec, LogSpecification, Logger, Naming, WriteMode,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

mod env;
mod handlers;
mod middleware;
mod services;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let mut port = 9000u16;

    let mut args = std::env::args();

    // Eat the first argument, which is the relative path to the executable
    args.next();

    while let Some(arg) = args.next() {
        match arg.to_lowercase().as_str() {
            "--port" => {
                let port_str = {
                    let next_arg = args.next();

                    match next_arg {
                        Some(s) => s,
                        None => {
                            eprintln!("ERROR: --port option specified but no port was given");
                            std::process::exit(1);
                        }
                    }
                };

                port = {
                    let port_result = port_str.parse::<u16>();

                    match port_result {
                        Ok(p) => p,
                        Err(_) => {
                            eprintln!("ERROR: Incorrect format for port. Integer expected");
                            std::process::exit(1);
                        }
                    }
                };

                continue;
            }
            a => {
                eprintln!("ERROR: Invalid argument: {}", &a);
                std::process::exit(1);
            }
        }
    }

    let base_addr = format!("127.0.0.1:{}", &port);

    // Surface config errors here rather than as a panic on first use of `CONF`
    match env::Config::from_env() {
        Ok(conf) => unsafe { conf.zeroize() },
        Err(e) => {
            eprintln!("ERROR: Failed to load config: {e}");
            std::process::exit(1);
        }
    }

    let log_spec = LogSpecification::parse(&env::CONF.log_level).unwrap_or_else(|_| {
        eprintln!(
            "WARNING: Invalid log level '{}'. Defaulting to info",
            env::CONF.log_level
        );
        LogSpecification::info()
    });

    let logger = Logger::with(log_spec)
        .log_to_file(FileSpec::default().directory(&env::CONF.log_directory))
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Timestamps,
            Cleanup::KeepLogAndCompressedFiles(60, 365),
        )
        .cleanup_in_background_thread(true)
        .duplicate_to_stdout(Duplicate::All)
        .write_mode(WriteMode::Async)
        .format(|writer, now, record| {
            write!(
                writer,
                "{:5} | {} | {}:{} | {}",
                record.level(),
                now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                record.module_path().unwrap_or("<unknown>"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .use_utc()
        .start();

    let _logger = match logger {
        Ok(l) => l,
        Err(e) => {
            eprintln!("ERROR: Failed to start logger: {e}");
            std::process::exit(1);
        }
    };

    let actix_workers = env::CONF.actix_worker_count;

    // To prevent resource starvation, max connections must be at least as large as the number of
    // actix workers
    let db_max_connections = env::CONF.db_max_connections.max(actix_workers as u32);

    log::info!("Connecting to database...");

    let db_async_pool = match create_db_async_pool(
        &env::CONF.db_uri(),
        db_max_connections,
        env::CONF.db_idle_timeout,
    )
    .await
    {
        Ok(p) => p,
        Err(e) => {
            eprintln!("ERROR: Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };

    log::info!("Successfully connected to database");

    let store: Arc<dyn RelationshipStore> = Arc::new(db::buddy_request::Dao::new(&db_async_pool));
    let directory: Arc<dyn CandidateDirectory> = Arc::new(db::user::Dao::new(&db_async_pool));
    let ledger: Arc<dyn ShipmentLedger> = Arc::new(db::shipment::Dao::new(&db_async_pool));

    let lifecycle_config = LifecycleConfig {
        min_cutoff_lead_time: env::CONF.min_cutoff_lead_time,
        event_channel_capacity: env::CONF.event_channel_capacity,
    };

    let manager = Arc::new(BuddyRequestManager::new(
        Arc::clone(&store),
        Arc::clone(&directory),
        Arc::clone(&ledger),
        lifecycle_config,
    ));
    let resolver = Arc::new(RoleResolver::new(store, ledger, Arc::clone(&manager)));

    let mut events = manager.subscribe();
    actix_web::rt::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log::info!("{event}"),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Buddy event log fell behind; skipped {skipped} events")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let db_async_pool = Data::new(db_async_pool);
    let manager = Data::from(manager);
    let resolver = Data::from(resolver);
    let directory = Data::from(directory);

    HttpServer::new(move || {
        App::new()
            .app_data(db_async_pool.clone())
            .app_data(manager.clone())
            .app_data(resolver.clone())
            .app_data(directory.clone())
            .configure(services::api::configure)
            .wrap(actix_web::middleware::Logger::default())
    })
    .workers(actix_workers)
    .bind(base_addr)?
    .run()
    .await?;

    // All workers have been joined at this point
    unsafe {
        env::CONF.zeroize();
    }

    Ok(())
}
