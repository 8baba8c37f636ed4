use async_trait::async_trait;
use log::{debug, error, info};
use std::fmt::{Debug, Display};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;

use crate::utils::error::ModuleError;

/// Raw coil/register access to one Modbus unit. Link failures surface as
/// [`ModuleError::ConnectionError`], exception replies as
/// [`ModuleError::InvalidResponse`]. Implementations never retry.
#[async_trait]
pub trait ModbusTransport: Send {
    async fn connect(&mut self) -> Result<(), ModuleError>;

    async fn disconnect(&mut self) -> Result<(), ModuleError>;

    async fn read_coils(&mut self, address: u16, count: u16) -> Result<Vec<bool>, ModuleError>;

    async fn write_single_coil(&mut self, address: u16, value: bool) -> Result<(), ModuleError>;

    async fn read_discrete_inputs(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>, ModuleError>;

    async fn read_input_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ModuleError>;
}

/// Modbus-TCP transport backed by a tokio-modbus client context.
pub struct TcpTransport {
    addr: SocketAddr,
    unit_id: u8,
    timeout: Duration,
    ctx: Option<Context>,
}

impl TcpTransport {
    pub fn new(addr: SocketAddr, unit_id: u8, timeout: Duration) -> Self {
        Self {
            addr,
            unit_id,
            timeout,
            ctx: None,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_open(&self) -> bool {
        self.ctx.is_some()
    }

    fn context(&mut self) -> Result<&mut Context, ModuleError> {
        self.ctx
            .as_mut()
            .ok_or_else(|| ModuleError::ConnectionError(format!("not connected to {}", self.addr)))
    }
}

/// Runs one request/response round trip. Timeouts and I/O failures become
/// `ConnectionError`; a Modbus exception reply becomes `InvalidResponse`.
async fn exchange<F, R, E, X>(timeout: Duration, op: &str, request: F) -> Result<R, ModuleError>
where
    F: Future<Output = Result<Result<R, X>, E>>,
    E: Display,
    X: Debug,
{
    tokio::time::timeout(timeout, request)
        .await
        .map_err(|_| ModuleError::ConnectionError(format!("{} timed out after {:?}", op, timeout)))?
        .map_err(|e| ModuleError::ConnectionError(format!("{} failed: {}", op, e)))?
        .map_err(|e| ModuleError::InvalidResponse(format!("{} exception: {:?}", op, e)))
}

#[async_trait]
impl ModbusTransport for TcpTransport {
    async fn connect(&mut self) -> Result<(), ModuleError> {
        info!("🔌 Connecting to Modbus TCP module at {} (unit {})", self.addr, self.unit_id);

        let connecting = tcp::connect_slave(self.addr, Slave(self.unit_id));
        let ctx = tokio::time::timeout(self.timeout, connecting)
            .await
            .map_err(|_| {
                error!("❌ Connection to {} timed out", self.addr);
                ModuleError::ConnectionError(format!("connection to {} timed out", self.addr))
            })?
            .map_err(|e| {
                error!("❌ Failed to connect to {}: {}", self.addr, e);
                ModuleError::ConnectionError(format!("failed to connect to {}: {}", self.addr, e))
            })?;

        self.ctx = Some(ctx);
        info!("Modbus TCP connection to {} established", self.addr);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ModuleError> {
        if let Some(mut ctx) = self.ctx.take() {
            ctx.disconnect()
                .await
                .map_err(|e| ModuleError::ConnectionError(format!("disconnect failed: {}", e)))?;
            info!("Closed Modbus TCP connection to {}", self.addr);
        }
        Ok(())
    }

    async fn read_coils(&mut self, address: u16, count: u16) -> Result<Vec<bool>, ModuleError> {
        debug!("Reading {} coil(s) at {}", count, address);
        let timeout = self.timeout;
        let ctx = self.context()?;
        exchange(timeout, "read coils", ctx.read_coils(address, count)).await
    }

    async fn write_single_coil(&mut self, address: u16, value: bool) -> Result<(), ModuleError> {
        debug!("Writing coil {} = {}", address, value);
        let timeout = self.timeout;
        let ctx = self.context()?;
        exchange(timeout, "write coil", ctx.write_single_coil(address, value)).await
    }

    async fn read_discrete_inputs(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>, ModuleError> {
        debug!("Reading {} discrete input(s) at {}", count, address);
        let timeout = self.timeout;
        let ctx = self.context()?;
        exchange(timeout, "read discrete inputs", ctx.read_discrete_inputs(address, count)).await
    }

    async fn read_input_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ModuleError> {
        debug!("Reading {} input register(s) at {}", count, address);
        let timeout = self.timeout;
        let ctx = self.context()?;
        exchange(timeout, "read input registers", ctx.read_input_registers(address, count)).await
    }
}
