//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use bus_http_channel::bus::{self, BusEvent};
use bus_http_channel::config::ServerConfig;
use bus_http_channel::{HttpServer, HttpServerChannel, Shutdown};

/// A running channel server bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub channel: Arc<HttpServerChannel>,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a server; the returned receiver sees everything the channel forwards to the bus.
pub async fn start_server(config: ServerConfig) -> (TestServer, mpsc::UnboundedReceiver<BusEvent>) {
    let (link, events) = bus::link();
    let channel = Arc::new(HttpServerChannel::new(config.channel.clone(), link));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, channel.clone());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (TestServer { addr, channel, shutdown }, events)
}

/// Wait until the channel has `count` pending requests.
pub async fn wait_for_pending(channel: &HttpServerChannel, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while channel.pending().len() != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("pending requests never reached expected count");
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
