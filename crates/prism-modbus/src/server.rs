// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus TCP slave engine.
//!
//! The server accepts master connections, decodes one request frame per
//! read, and answers from the register bank. Every connection gets its own
//! task; responses within a connection are emitted in strict request order
//! because the handler is a sequential loop.
//!
//! Request validation happens in two stages: the exception gate here
//! (unit identifier, function code, quantity bounds), then the bank's own
//! address check which yields `IllegalDataAddress` for sparse gaps.
//!
//! Write functions (0x05, 0x06, 0x0F, 0x10) are recognized on the wire but
//! produce no state change; they are answered with an empty data response.
//! The bridge's registers are populated exclusively from OPC UA.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use prism_core::error::{ServerError, ServerResult};
use prism_core::types::UnitId;

use crate::bank::RegisterBank;
use crate::frame::{
    Exception, RegisterKind, RequestFrame, MAX_FRAME_LEN, MAX_READ_QUANTITY, MIN_FRAME_LEN,
    WRITE_MULTIPLE_COILS, WRITE_MULTIPLE_REGISTERS, WRITE_SINGLE_COIL, WRITE_SINGLE_REGISTER,
};

/// Receive buffer size per connection.
const READ_BUFFER_SIZE: usize = 512;

/// Default idle deadline; a connection with no request for this long is
/// closed.
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// ModbusServer
// =============================================================================

/// The Modbus TCP slave engine.
///
/// # Example
///
/// ```rust,ignore
/// let bank = Arc::new(RegisterBank::new());
/// let server = ModbusServer::new(bank, "0.0.0.0", 1502);
/// let listener = server.bind().await?;
/// tokio::spawn(server.run(listener, shutdown.subscribe()));
/// ```
pub struct ModbusServer {
    host: String,
    port: u16,
    idle_timeout: Duration,
    bank: Arc<RegisterBank>,
}

impl ModbusServer {
    /// Creates a server for the given bind host and port.
    ///
    /// An empty host binds all interfaces.
    pub fn new(bank: Arc<RegisterBank>, host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let host = if host.is_empty() {
            "0.0.0.0".to_string()
        } else {
            host
        };
        Self {
            host,
            port,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            bank,
        }
    }

    /// Overrides the idle deadline.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Returns the configured bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Binds the TCP listener.
    ///
    /// A bind failure is fatal to the process; callers must not retry.
    pub async fn bind(&self) -> ServerResult<TcpListener> {
        let address = self.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| ServerError::bind(&address, e))?;
        info!(address = %address, "modbus server listening");
        Ok(listener)
    }

    /// Accepts connections until the shutdown signal fires.
    ///
    /// Each accepted connection runs in its own task; accept errors are
    /// logged and the loop continues.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(peer = %peer, "modbus client connected");
                            let bank = self.bank.clone();
                            let idle_timeout = self.idle_timeout;
                            tokio::spawn(async move {
                                handle_connection(bank, stream, idle_timeout).await;
                                debug!(peer = %peer, "modbus client disconnected");
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept client connection");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("modbus server stopping");
                    return;
                }
            }
        }
    }
}

// =============================================================================
// Connection Handler
// =============================================================================

/// Serves one master connection until error, close, or idle deadline.
async fn handle_connection(bank: Arc<RegisterBank>, mut stream: TcpStream, idle_timeout: Duration) {
    let mut packet = [0u8; READ_BUFFER_SIZE];

    loop {
        // The deadline restarts with every read.
        let bytes_read = match tokio::time::timeout(idle_timeout, stream.read(&mut packet)).await {
            Ok(Ok(0)) => return,
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                debug!(error = %e, "read error");
                return;
            }
            Err(_) => {
                debug!(timeout = ?idle_timeout, "idle deadline elapsed");
                return;
            }
        };

        // A frame outside 12..=260 bytes cannot be reframed: the protocol
        // has no delimiter, so the only safe move is to drop the connection.
        if bytes_read < MIN_FRAME_LEN || bytes_read > MAX_FRAME_LEN {
            info!(len = bytes_read, "bad frame length, closing connection");
            return;
        }

        let frame = match RequestFrame::decode(&packet[..bytes_read]) {
            Some(frame) => frame,
            None => return,
        };

        let response = service(&bank, &frame);
        if let Err(e) = stream.write_all(&response).await {
            debug!(error = %e, "write error");
            return;
        }
    }
}

/// Resolves one request into a response, applying the exception gate.
fn service(bank: &RegisterBank, frame: &RequestFrame) -> Vec<u8> {
    // Unit gate: 0 and 248..=255 are never valid, and a valid identifier
    // must address a configured unit.
    let unit = match UnitId::new(frame.unit_id) {
        Some(unit) if bank.contains_unit(unit) => unit,
        _ => {
            info!(unit = frame.unit_id, "unit id exception: SlaveDeviceFailure");
            return frame.exception_response(Exception::SlaveDeviceFailure);
        }
    };

    if let Some(kind) = RegisterKind::from_function_code(frame.function) {
        if frame.quantity < 1
            || frame.quantity > MAX_READ_QUANTITY
            || frame.starting_address as u32 + frame.quantity as u32 > 65535
        {
            return frame.exception_response(Exception::IllegalDataValue);
        }
        return match bank.read(unit, kind, frame.starting_address, frame.quantity) {
            Ok(payload) => frame.data_response(&payload),
            Err(exception) => {
                debug!(
                    unit = %unit,
                    table = %kind,
                    start = frame.starting_address,
                    quantity = frame.quantity,
                    exception = %exception,
                    "read rejected"
                );
                frame.exception_response(exception)
            }
        };
    }

    match frame.function {
        WRITE_SINGLE_COIL | WRITE_MULTIPLE_COILS | WRITE_SINGLE_REGISTER
        | WRITE_MULTIPLE_REGISTERS => {
            // Recognized, but the bridge is read-only from the Modbus side.
            warn!(unit = %unit, function = frame.function, "write request ignored");
            frame.data_response(&[])
        }
        _ => frame.exception_response(Exception::IllegalFunction),
    }
}

// =============================================================================
// Tests
// =============================================================================
