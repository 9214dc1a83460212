//! Serial link to an ELM327 adapter via tokio-serial

use crate::error::ObdError;
use crate::transport::ChannelTransport;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, error, info};

/// Default ELM327 baud rate
pub const DEFAULT_BAUD_RATE: u32 = 38400;

const READ_BUFFER_SIZE: usize = 256;
const CHUNK_CHANNEL_CAPACITY: usize = 64;

/// Open `device` and spawn the reader and writer tasks.
///
/// Must be called from within a Tokio runtime. The returned receiver yields
/// raw chunks as they arrive and closes when the port does.
pub fn open(
    device: &str,
    baud_rate: u32,
) -> Result<(ChannelTransport, mpsc::Receiver<Vec<u8>>), ObdError> {
    info!("Opening serial adapter {} at {} baud", device, baud_rate);

    let port = tokio_serial::new(device, baud_rate).open_native_async()?;
    let (mut reader, mut writer) = tokio::io::split(port);

    let (transport, mut outgoing) = ChannelTransport::new();
    let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        while let Some(bytes) = outgoing.recv().await {
            if let Err(e) = writer.write_all(&bytes).await {
                error!("Serial write failed: {}", e);
                break;
            }
        }
        debug!("Serial writer stopped");
    });

    tokio::spawn(async move {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    info!("Serial port closed");
                    break;
                }
                Ok(n) => {
                    if chunk_tx.send(buf[..n].to_vec()).await.is_err() {
                        debug!("Chunk receiver dropped, stopping serial reader");
                        break;
                    }
                }
                Err(e) => {
                    error!("Serial read failed: {}", e);
                    break;
                }
            }
        }
    });

    Ok((transport, chunk_rx))
}
