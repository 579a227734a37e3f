//! BLE client for a board running the blocks firmware.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use btleplug::api::{
    Central, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::time::timeout;
use uuid::Uuid;

use crate::profile::{is_microbit_name, UART_RX, UART_TX};

pub struct MicrobitClient {
    name: String,
    peripheral: Peripheral,
    rx_char: Characteristic,
    tx_char: Characteristic,
    /// Bytes notified on UART TX, not yet consumed
    inbound: Arc<Mutex<Vec<u8>>>,
}

impl MicrobitClient {
    /// Scan for `name`, or for any micro:bit if `name` is None, and connect.
    pub async fn connect(name: Option<&str>, scan_timeout: Duration) -> Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No Bluetooth adapters found"))?;

        adapter.start_scan(ScanFilter::default()).await?;
        let (peripheral, name) = Self::find_device(&adapter, name, scan_timeout).await?;
        adapter.stop_scan().await?;

        peripheral.connect().await?;
        peripheral.discover_services().await?;

        let characteristics = peripheral.characteristics();
        let find = |uuid: Uuid, what: &str| {
            characteristics
                .iter()
                .find(|c| c.uuid == uuid)
                .cloned()
                .ok_or_else(|| anyhow!("UART {} characteristic not found", what))
        };
        let rx_char = find(UART_RX, "RX")?;
        let tx_char = find(UART_TX, "TX")?;

        peripheral.subscribe(&tx_char).await?;

        let inbound = Arc::new(Mutex::new(Vec::new()));
        let sink = inbound.clone();
        let mut stream = peripheral.notifications().await?;
        tokio::spawn(async move {
            while let Some(data) = stream.next().await {
                if data.uuid == UART_TX {
                    sink.lock().await.extend_from_slice(&data.value);
                }
            }
        });

        Ok(Self {
            name,
            peripheral,
            rx_char,
            tx_char,
            inbound,
        })
    }

    async fn find_device(
        adapter: &Adapter,
        name: Option<&str>,
        scan_timeout: Duration,
    ) -> Result<(Peripheral, String)> {
        let start = std::time::Instant::now();

        while start.elapsed() < scan_timeout {
            for peripheral in adapter.peripherals().await? {
                let Some(local_name) = peripheral
                    .properties()
                    .await?
                    .and_then(|props| props.local_name)
                else {
                    continue;
                };

                let wanted = match name {
                    Some(name) => local_name == name,
                    None => is_microbit_name(&local_name),
                };
                if wanted {
                    return Ok((peripheral, local_name));
                }
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Err(anyhow!("No matching device found within timeout"))
    }

    /// Advertised name of the connected board
    pub fn name(&self) -> &str {
        &self.name
    }

    /// UUIDs of the services the board exposes
    pub fn services(&self) -> HashSet<Uuid> {
        self.peripheral.services().iter().map(|s| s.uuid).collect()
    }

    /// UUIDs of the characteristics the board exposes
    pub fn characteristics(&self) -> HashSet<Uuid> {
        self.peripheral
            .characteristics()
            .iter()
            .map(|c| c.uuid)
            .collect()
    }

    pub fn rx_properties(&self) -> CharPropFlags {
        self.rx_char.properties
    }

    pub fn tx_properties(&self) -> CharPropFlags {
        self.tx_char.properties
    }

    /// Write raw bytes to UART RX, one write per chunk
    pub async fn write(&self, data: &[u8], chunk: usize) -> Result<()> {
        for part in data.chunks(chunk) {
            self.peripheral
                .write(&self.rx_char, part, WriteType::WithoutResponse)
                .await?;
        }
        Ok(())
    }

    /// Wait for a line ending in `\n` on UART TX
    pub async fn read_line(&self, line_timeout: Duration) -> Result<Vec<u8>> {
        let result = timeout(line_timeout, async {
            loop {
                {
                    let mut inbound = self.inbound.lock().await;
                    if let Some(pos) = inbound.iter().position(|&b| b == b'\n') {
                        return inbound.drain(..=pos).collect::<Vec<u8>>();
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        result.map_err(|_| anyhow!("Timeout waiting for UART line"))
    }

    /// Send `line` and wait for the board's reply line
    pub async fn exchange(&self, line: &[u8], chunk: usize, reply_timeout: Duration) -> Result<Vec<u8>> {
        self.clear().await;
        self.write(line, chunk).await?;
        self.read_line(reply_timeout).await
    }

    /// Drop any notified bytes not yet read
    pub async fn clear(&self) {
        self.inbound.lock().await.clear();
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.peripheral.unsubscribe(&self.tx_char).await?;
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
