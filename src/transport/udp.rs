//! UDP transport
//!
//! This file implements the datagram side of the overlay:
//! - `UdpTransport`: a cloneable handle over one `tokio::net::UdpSocket`
//! - `BrokerServer`: binds the broker's socket, feeds every received
//!   datagram to the `Broker`, and drains the broker's outbox on a separate
//!   task so a slow send never holds up the next datagram
//!
//! Delivery is neither ordered nor guaranteed. Nothing here retries.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{ToSocketAddrs, UdpSocket};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{error, info, warn};

use crate::broker::{Broker, Outbound};
use crate::utils::Result;

/// Receive buffer size; large enough for any UDP datagram.
pub const MAX_DATAGRAM: usize = 65_536;

#[derive(Debug, Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn send_to(&self, bytes: &[u8], addr: SocketAddr) -> Result<()> {
        self.socket.send_to(bytes, addr).await?;
        Ok(())
    }

    pub async fn recv_from(&self) -> Result<(Vec<u8>, SocketAddr)> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (len, from) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        Ok((buf, from))
    }
}

/// The broker bound to its socket.
#[derive(Debug)]
pub struct BrokerServer {
    transport: UdpTransport,
    broker: Broker,
    outbox: UnboundedReceiver<Outbound>,
}

impl BrokerServer {
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let transport = UdpTransport::bind(addr).await?;
        let (tx, outbox) = mpsc::unbounded_channel();
        Ok(Self {
            transport,
            broker: Broker::new(tx),
            outbox,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Serves datagrams until the task is dropped.
    pub async fn run(self) {
        let Self {
            transport,
            mut broker,
            mut outbox,
        } = self;

        match transport.local_addr() {
            Ok(addr) => info!("Broker listening on udp://{addr}"),
            Err(e) => warn!("Broker listening on an unknown address: {e}"),
        }

        // Spawn a task to push queued datagrams out to clients
        let sender = transport.clone();
        tokio::spawn(async move {
            while let Some(out) = outbox.recv().await {
                if let Err(e) = sender.send_to(&out.bytes, out.addr).await {
                    error!("Failed to send datagram to {}: {e}", out.addr);
                }
            }
            info!("Send loop closed");
        });

        loop {
            match transport.recv_from().await {
                Ok((bytes, from)) => broker.handle_datagram(&bytes, from),
                Err(e) => error!("Failed to receive datagram: {e}"),
            }
        }
    }
}

/// Binds `addr` and serves the broker on it.
pub async fn start_broker_server(addr: &str) -> Result<()> {
    let server = BrokerServer::bind(addr).await?;
    server.run().await;
    Ok(())
}
