//! Reference "hello-world" client for a gateway.
//!
//! Connects over WebSocket, enumerates the devices, reads one property and
//! optionally watches it for a while before disconnecting.
//!
//! Usage:
//!   gw-hello-client --host 192.168.1.10 --user installer --password secret \
//!       --property demo.inv.3136 --watch 30
//!
//! Settings come from `--config <file.toml>` (`[websocket]` section) and are
//! overridden by flags. Set `RUST_LOG=gw_client=debug` to see every frame.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use gw_client::{GatewayCallbacks, GatewayClient, TungsteniteTransport};
use gw_domain::config::Config;
use gw_domain::{AccessLevel, DeviceMessage, PropertyValue, Status};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

/// Minimal gateway client: enumerate, read, watch.
#[derive(Debug, Parser)]
#[command(name = "gw-hello-client", version, about)]
struct Cli {
    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    password: Option<String>,
    /// Property to read once connected.
    #[arg(long, default_value = "demo.inv.3136")]
    property: String,
    /// Subscribe and print updates for this many seconds (0 = read once).
    #[arg(long, default_value_t = 0)]
    watch: u64,
}

/// What the callbacks report back to the main loop.
#[derive(Debug)]
enum Notice {
    Connected,
    Enumerated(Status, u32),
    Read(Status, String, Option<PropertyValue>),
    Subscribed(Status, String),
    Updated(String, PropertyValue),
    Message(DeviceMessage),
    Error(String),
    Disconnected,
}

struct Forward(mpsc::UnboundedSender<Notice>);

impl GatewayCallbacks for Forward {
    fn on_connected(&self, access_level: AccessLevel, gateway_version: &str) {
        tracing::info!(access_level = %access_level, gateway_version, "connected");
        let _ = self.0.send(Notice::Connected);
    }

    fn on_disconnected(&self) {
        let _ = self.0.send(Notice::Disconnected);
    }

    fn on_error(&self, reason: &str) {
        let _ = self.0.send(Notice::Error(reason.to_string()));
    }

    fn on_enumerated(&self, status: Status, device_count: u32) {
        let _ = self.0.send(Notice::Enumerated(status, device_count));
    }

    fn on_property_read(&self, status: Status, property_id: &str, value: Option<&PropertyValue>) {
        let _ = self
            .0
            .send(Notice::Read(status, property_id.to_string(), value.cloned()));
    }

    fn on_property_subscribed(&self, status: Status, property_id: &str) {
        let _ = self.0.send(Notice::Subscribed(status, property_id.to_string()));
    }

    fn on_property_updated(&self, property_id: &str, value: &PropertyValue) {
        let _ = self
            .0
            .send(Notice::Updated(property_id.to_string(), value.clone()));
    }

    fn on_device_message(&self, message: &DeviceMessage) {
        let _ = self.0.send(Notice::Message(message.clone()));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?.websocket,
        None => Default::default(),
    };
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.user.is_some() {
        config.user = cli.user;
    }
    if cli.password.is_some() {
        config.password = cli.password;
    }

    let (notices_tx, mut notices) = mpsc::unbounded_channel();
    let (mut client, mut events) = TungsteniteTransport::client();
    client.set_callback(Arc::new(Forward(notices_tx)));
    client.connect_with_config(&config)?;

    let mut watch_until: Option<Instant> = None;

    loop {
        let deadline = watch_until;
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => client.handle_event(event),
                None => break,
            },
            notice = notices.recv() => match notice {
                Some(Notice::Connected) => client.enumerate()?,
                Some(Notice::Enumerated(status, count)) => {
                    println!("enumerate [{status}]: {count} device(s)");
                    client.read_property(&cli.property)?;
                }
                Some(Notice::Read(status, id, value)) => {
                    match value {
                        Some(value) => println!("{id} [{status}] = {value}"),
                        None => println!("{id} [{status}]"),
                    }
                    if cli.watch > 0 && status.is_success() {
                        client.subscribe_to_property(&id)?;
                        watch_until = Some(Instant::now() + Duration::from_secs(cli.watch));
                    } else {
                        client.disconnect()?;
                    }
                }
                Some(Notice::Subscribed(status, id)) => {
                    tracing::info!(property = %id, status = %status, "watching");
                }
                Some(Notice::Updated(id, value)) => println!("{id} = {value}"),
                Some(Notice::Message(m)) => {
                    println!(
                        "[{}] {}.{} #{}: {}",
                        m.timestamp, m.access_id, m.device_id, m.message_id, m.message
                    );
                }
                Some(Notice::Error(reason)) => tracing::warn!(reason = %reason, "gateway error"),
                Some(Notice::Disconnected) | None => break,
            },
            _ = async move {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            } => {
                watch_until = None;
                client.disconnect()?;
            }
        }
    }

    tracing::info!("client exiting");
    Ok(())
}
