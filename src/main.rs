//! CLI for popsub-udp
//!
//! Subcommands:
//! - `broker`: run the broker
//! - `producer`: announce a topic and publish one file to it
//! - `consumer`: subscribe to topics and log every payload received

use std::path::PathBuf;

use clap::Parser;
use popsub_udp::actor::{Consumer, LogSink, Producer, ProducerEvent};
use popsub_udp::config::{Settings, load_config};
use popsub_udp::transport::start_broker_server;
use popsub_udp::utils::logging;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "popsub-udp")]
enum Command {
    /// Run the broker
    Broker,
    /// Register as a producer, announce a topic and publish a file to it
    Producer {
        /// Topic name; the broker prefixes it with the producer's id
        #[arg(long)]
        suffix: String,
        /// File whose contents are published
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value_t = 0)]
        sequence: u32,
        /// Gzip the payload before fragmenting it
        #[arg(long)]
        compress: bool,
        #[arg(long, default_value = "")]
        description: String,
        /// Let consumers message this producer through the topic
        #[arg(long)]
        allow_messaging: bool,
    },
    /// Register as a consumer and log every payload received
    Consumer {
        /// Topic ids to subscribe to
        #[arg(long, required = true)]
        subscribe: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return;
        }
    };
    logging::init(&config.log.level);

    let cmd = Command::parse();

    let outcome = tokio::select! {
        outcome = run(cmd, config) => outcome,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
            Ok(())
        }
    };

    if let Err(e) = outcome {
        error!("Exited with error: {e}");
    }
}

async fn run(cmd: Command, config: Settings) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Command::Broker => {
            start_broker_server(&config.server.addr()).await?;
        }
        Command::Producer {
            suffix,
            file,
            sequence,
            compress,
            description,
            allow_messaging,
        } => {
            let payload = tokio::fs::read(&file).await?;
            let mut producer = Producer::connect(&config.actor).await?;
            let topic_id = producer
                .announce(&suffix, allow_messaging, &description)
                .await?;
            producer
                .publish(&topic_id, sequence, &payload, compress)
                .await?;

            loop {
                match producer.next_event().await? {
                    ProducerEvent::Published(ack) => {
                        info!("Broker accepted {}#{}", ack.topic_id, ack.sequence)
                    }
                    ProducerEvent::Message { topic_id, message } => {
                        info!("[{topic_id}] {message}")
                    }
                    ProducerEvent::Error(e) => warn!("{e}"),
                }
            }
        }
        Command::Consumer { subscribe } => {
            let mut consumer = Consumer::connect(&config.actor, LogSink).await?;
            for topic in consumer.list().await? {
                info!(
                    "Available: {} ({}){}",
                    topic.topic_id,
                    topic.description,
                    if topic.allow_messaging { " [messaging]" } else { "" }
                );
            }
            for topic_id in &subscribe {
                if let Err(e) = consumer.subscribe(topic_id).await {
                    warn!("Could not subscribe to {topic_id}: {e}");
                }
            }
            consumer.run().await?;
        }
    }
    Ok(())
}
