use std::process;

use msgspool::config::AppConfig;
use msgspool::logging::{LogLevel, Logger, LoggerConfig};
use msgspool::message::{Message, MessageId};
use msgspool::storage::{replay, write_message_to_backend, StorageFacade};
use msgspool::wire::envelope::EnvelopeFormat;
use serde_json::json;

#[derive(Debug, Default, PartialEq, Eq)]
struct EnqueueRequest {
    body: String,
    routing_key: String,
}

fn main() {
    let (enqueue, config_args) = split_enqueue_args(std::env::args().skip(1)).unwrap_or_else(|error| {
        eprintln!("argument error: {error}");
        process::exit(2);
    });

    let app_config = AppConfig::load_with_discovery(config_args).unwrap_or_else(|error| {
        eprintln!("configuration error: {error}");
        process::exit(2);
    });
    let log_level = LogLevel::from_config_value(&app_config.logging.level).unwrap_or_else(|| {
        eprintln!(
            "invalid logging.level '{}'. Allowed values: error, warn, info, debug, verbose",
            app_config.logging.level
        );
        process::exit(2);
    });
    let envelope_format = EnvelopeFormat::parse(&app_config.envelope.format).unwrap_or_else(|| {
        eprintln!(
            "invalid envelope.format '{}'. Allowed values: extended, legacy",
            app_config.envelope.format
        );
        process::exit(2);
    });

    let logger = Logger::new(LoggerConfig {
        min_level: log_level,
        human_friendly: app_config.logging.human_friendly,
    });
    logger.log(
        LogLevel::Info,
        "main",
        &format!("{} v{} starting", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        Some(json!({ "envelope_format": envelope_format.as_str() })),
    );

    let storage = StorageFacade::initialize(&app_config, &logger).unwrap_or_else(|error| {
        eprintln!("storage initialization error: {error}");
        process::exit(2);
    });

    if let Some(request) = enqueue {
        let message = Message::with_routing(
            MessageId::generate(),
            request.body.into_bytes(),
            &request.routing_key,
            None,
        );
        let mut buffer = Vec::new();
        if let Err(error) =
            write_message_to_backend(&mut buffer, &message, storage.backend(), envelope_format)
        {
            logger.error("main::enqueue", &format!("message was not persisted: {error}"));
            process::exit(1);
        }
        if let Err(error) = storage.flush() {
            logger.error("main::enqueue", &format!("spool flush failed: {error}"));
            process::exit(1);
        }
        logger.log(
            LogLevel::Info,
            "main::enqueue",
            "Message appended to spool",
            Some(json!({
                "id": message.id().to_string(),
                "routing_hash": message.routing_hash(),
                "bytes": buffer.len(),
            })),
        );
    }

    match replay(storage.backend(), &logger) {
        Ok(summary) => {
            if let Some(latest) = summary.messages.last() {
                logger.debug(
                    "main::replay",
                    &format!("latest message {} with {} attempts", latest.id(), latest.attempts()),
                );
            }
        }
        Err(error) => {
            eprintln!("spool replay error: {error}");
            process::exit(2);
        }
    }
}

/// Pulls `--enqueue <body>` and `--routing-key <key>` out of argv and leaves the
/// rest for config discovery and overrides.
fn split_enqueue_args(
    args: impl IntoIterator<Item = String>,
) -> Result<(Option<EnqueueRequest>, Vec<String>), String> {
    let mut body = None;
    let mut routing_key = String::new();
    let mut rest = Vec::new();
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--enqueue" => {
                body = Some(iter.next().ok_or("missing value for '--enqueue'")?);
            }
            "--routing-key" => {
                routing_key = iter.next().ok_or("missing value for '--routing-key'")?;
            }
            _ => rest.push(arg),
        }
    }

    if body.is_none() && !routing_key.is_empty() {
        return Err("'--routing-key' requires '--enqueue'".to_owned());
    }

    Ok((body.map(|body| EnqueueRequest { body, routing_key }), rest))
}
