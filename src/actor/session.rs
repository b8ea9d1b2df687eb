//! Actor session
//!
//! A `Session` is one actor's link to the broker: a UDP socket bound to an
//! ephemeral port, the broker's address, and the client id handed out at
//! registration.
//!
//! Registration is at-least-once. `register` sends Register, waits
//! `register_timeout` for a RegisterResponse and sends again if none came,
//! with no cap on attempts. A late duplicate response simply replaces the
//! stored id.
//!
//! A failed send is logged and the session reconnects: the socket is
//! rebound after `reconnect_delay`, which gives it a new port, and since the
//! broker knows clients by address the session registers again before the
//! error is returned to the caller. The broker hands out a new client id, so
//! topics announced under the previous id stay owned by that id.

use std::net::SocketAddr;

use tokio::net::lookup_host;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, error, info, warn};

use crate::config::ActorSettings;
use crate::protocol::{Frame, Role};
use crate::transport::UdpTransport;
use crate::utils::{PopsubError, Result};

#[derive(Debug)]
pub struct Session {
    transport: UdpTransport,
    broker: SocketAddr,
    settings: ActorSettings,
    role: Option<Role>,
    client_id: Option<String>,
}

impl Session {
    /// Resolves the broker address and binds a local socket.
    pub async fn open(settings: &ActorSettings) -> Result<Self> {
        let broker = lookup_host(settings.broker_addr())
            .await?
            .next()
            .ok_or_else(|| {
                PopsubError::not_found(format!(
                    "broker address {} did not resolve",
                    settings.broker_addr()
                ))
            })?;
        let transport = UdpTransport::bind(local_bind_addr(broker)).await?;
        debug!(
            "Session bound to {} for broker {broker}",
            transport.local_addr()?
        );

        Ok(Self {
            transport,
            broker,
            settings: settings.clone(),
            role: None,
            client_id: None,
        })
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn settings(&self) -> &ActorSettings {
        &self.settings
    }

    pub fn broker_addr(&self) -> SocketAddr {
        self.broker
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Registers with `role`, retrying until the broker answers.
    pub async fn register(&mut self, role: Role) -> Result<String> {
        self.role = Some(role);
        let request = Frame::Register { role };
        let mut attempt = 0u64;

        loop {
            attempt += 1;
            if let Err(e) = self.send_once(&request).await {
                warn!("Register attempt {attempt} could not be sent: {e}");
                self.rebind().await;
                continue;
            }

            let deadline = Instant::now() + self.settings.register_timeout();
            loop {
                match self.recv_until(deadline).await {
                    Ok(Some(Frame::RegisterResponse(body))) => {
                        info!("Registered successfully. Client ID: {}", body.client_id);
                        self.client_id = Some(body.client_id.clone());
                        return Ok(body.client_id);
                    }
                    Ok(Some(frame)) => {
                        if let Some(e) = frame.rejection() {
                            warn!("Register attempt {attempt} rejected: {e}");
                        } else {
                            debug!(
                                "Ignoring frame {:#04x} while registering",
                                frame.discriminant()
                            );
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Receive failed while registering: {e}");
                        break;
                    }
                }
            }

            warn!(
                "No RegisterResponse within {}ms, resending (attempt {attempt})",
                self.settings.register_timeout_ms
            );
        }
    }

    /// Records the id from a RegisterResponse that arrives after `register`
    /// already returned.
    pub fn observe_registration(&mut self, client_id: &str) {
        if self.client_id.as_deref() != Some(client_id) {
            info!("Client ID replaced by late RegisterResponse: {client_id}");
            self.client_id = Some(client_id.to_string());
        }
    }

    /// Sends one frame to the broker without waiting for a reply.
    pub async fn send(&mut self, frame: &Frame) -> Result<()> {
        match self.send_once(frame).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Error sending message: {e}");
                self.reconnect().await?;
                Err(e)
            }
        }
    }

    /// Rebinds the socket and, if the session had registered, registers
    /// again from the new address. Returns the client id now in use.
    pub async fn reconnect(&mut self) -> Result<Option<String>> {
        self.rebind().await;
        match self.role {
            Some(role) => self.register(role).await.map(Some),
            None => Ok(None),
        }
    }

    /// Waits for the next decodable frame from the broker.
    pub async fn recv(&self) -> Result<Frame> {
        loop {
            let (bytes, from) = self.transport.recv_from().await?;
            if from != self.broker {
                debug!("Ignoring datagram from {from}: not the broker");
                continue;
            }
            match Frame::decode(&bytes) {
                Ok(frame) => return Ok(frame),
                Err(e) => warn!("Dropping datagram from broker: {e}"),
            }
        }
    }

    /// Like `recv`, but gives up at `deadline` and returns `None`.
    pub async fn recv_until(&self, deadline: Instant) -> Result<Option<Frame>> {
        match timeout_at(deadline, self.recv()).await {
            Ok(frame) => frame.map(Some),
            Err(_) => Ok(None),
        }
    }

    async fn send_once(&self, frame: &Frame) -> Result<()> {
        let bytes = frame.encode()?;
        self.transport.send_to(&bytes, self.broker).await
    }

    async fn rebind(&mut self) {
        loop {
            sleep(self.settings.reconnect_delay()).await;
            info!("Trying to reconnect...");
            match UdpTransport::bind(local_bind_addr(self.broker)).await {
                Ok(transport) => {
                    self.transport = transport;
                    return;
                }
                Err(e) => error!("Reconnect failed: {e}"),
            }
        }
    }
}

/// The error carried by a reply the caller already knows is an error frame.
pub(crate) fn rejected(frame: &Frame) -> PopsubError {
    frame.rejection().unwrap_or_else(|| {
        PopsubError::protocol(format!(
            "unexpected frame {:#04x} in place of an error",
            frame.discriminant()
        ))
    })
}

fn local_bind_addr(broker: SocketAddr) -> SocketAddr {
    match broker {
        SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
        SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
    }
}
