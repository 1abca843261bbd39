// Wireless Link Implementation
// GATT-style single-peer link: connected iff exactly one peer is subscribed

use crate::clock::{Clock, SystemClock};
use crate::link::queue::{OutboundQueue, QueueReject};
use crate::link::traits::deliver;
use crate::link::{Link, LinkError, LinkKind, LinkStats, FRAME_QUEUE_SIZE, MAX_FRAME_SIZE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// WIRELESS CONFIG
// ============================================================================

/// Configuration for the wireless link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WirelessConfig {
    /// Name the peripheral advertises under
    pub device_name: String,
    /// Six-digit pairing passcode
    pub pin_code: u32,
    /// Service UUID the mesh channel is exposed on
    pub service_uuid: String,
    /// Minimum spacing between two notifications, in milliseconds
    pub write_interval_ms: u64,
    /// Outbound queue capacity
    pub queue_capacity: usize,
}

impl Default for WirelessConfig {
    fn default() -> Self {
        Self {
            device_name: "MeshLink".to_string(),
            pin_code: 123456,
            service_uuid: "6e400001-b5a3-f393-e0a9-e50e24dcca9e".to_string(), // Nordic UART
            write_interval_ms: 60,
            queue_capacity: FRAME_QUEUE_SIZE,
        }
    }
}

impl WirelessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device_name(mut self, name: &str) -> Self {
        self.device_name = name.to_string();
        self
    }

    pub fn with_pin_code(mut self, pin: u32) -> Self {
        self.pin_code = pin;
        self
    }

    pub fn with_service_uuid(mut self, uuid: &str) -> Self {
        self.service_uuid = uuid.to_string();
        self
    }

    pub fn with_write_interval_ms(mut self, ms: u64) -> Self {
        self.write_interval_ms = ms;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn write_interval(&self) -> Duration {
        Duration::from_millis(self.write_interval_ms)
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if self.device_name.is_empty() {
            return Err(LinkError::InvalidConfig("device_name cannot be empty".to_string()));
        }
        if !(100_000..=999_999).contains(&self.pin_code) {
            return Err(LinkError::InvalidConfig(format!(
                "pin_code must have six digits, got {}",
                self.pin_code
            )));
        }
        if self.queue_capacity == 0 {
            return Err(LinkError::InvalidConfig("queue_capacity cannot be 0".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// GATT PERIPHERAL
// ============================================================================

/// Downward contract of the wireless stack.
///
/// Pairing, bonding and security live inside the stack. Each characteristic
/// write from the peer carries exactly one frame.
pub trait GattPeripheral {
    fn begin(&mut self, config: &WirelessConfig) -> Result<(), LinkError>;

    fn start_advertising(&mut self);

    fn stop_advertising(&mut self);

    /// Peers currently paired and subscribed to notifications
    fn subscribed_peers(&self) -> usize;

    /// Send one frame as a notification. `false` if the stack refused it.
    fn notify(&mut self, frame: &[u8]) -> bool;

    /// Next frame written by the peer, if any
    fn take_written(&mut self) -> Option<Vec<u8>>;

    fn disconnect_all(&mut self);
}

// ============================================================================
// WIRELESS LINK
// ============================================================================

/// Wireless adapter
pub struct WirelessLink<P, K = SystemClock> {
    peripheral: P,
    clock: K,
    config: WirelessConfig,
    enabled: bool,
    connected: bool,
    advertising: bool,
    queue: OutboundQueue,
    last_write: Option<Duration>,
    stats: LinkStats,
}

impl<P: GattPeripheral> WirelessLink<P, SystemClock> {
    pub fn new(peripheral: P, config: WirelessConfig) -> Self {
        Self::with_clock(peripheral, config, SystemClock::new())
    }
}

impl<P: GattPeripheral, K: Clock> WirelessLink<P, K> {
    pub fn with_clock(peripheral: P, config: WirelessConfig, clock: K) -> Self {
        let queue = OutboundQueue::new(config.queue_capacity);
        Self {
            peripheral,
            clock,
            config,
            enabled: false,
            connected: false,
            advertising: false,
            queue,
            last_write: None,
            stats: LinkStats::default(),
        }
    }

    /// Initialise the wireless stack with the configured name and passcode
    pub fn begin(&mut self) -> Result<(), LinkError> {
        self.config.validate()?;
        self.peripheral.begin(&self.config)?;
        tracing::info!(name = %self.config.device_name, "wireless link initialised");
        Ok(())
    }

    pub fn config(&self) -> &WirelessConfig {
        &self.config
    }

    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    pub fn peripheral_mut(&mut self) -> &mut P {
        &mut self.peripheral
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn start_advertising(&mut self) {
        if !self.advertising {
            self.peripheral.start_advertising();
            self.advertising = true;
        }
    }

    fn stop_advertising(&mut self) {
        if self.advertising {
            self.peripheral.stop_advertising();
            self.advertising = false;
        }
    }

    fn write_due(&self) -> bool {
        match self.last_write {
            Some(at) => self.clock.now() >= at + self.config.write_interval(),
            None => true,
        }
    }

    /// Re-evaluate the peer state reported by the stack
    fn refresh_connection(&mut self) {
        let peers = self.peripheral.subscribed_peers();
        let now_connected = peers == 1;
        if peers > 1 {
            tracing::debug!(peers, "more than one wireless peer subscribed");
        }

        if now_connected && !self.connected {
            tracing::info!("wireless peer connected");
            self.connected = true;
            self.stats.peers_accepted += 1;
            self.stop_advertising();
        } else if !now_connected && self.connected {
            tracing::info!("wireless peer disconnected");
            self.connected = false;
            self.last_write = None;
            if self.enabled {
                self.start_advertising();
            }
        }
    }

    /// Notify the head of the queue if pacing allows. Returns true if a frame went out.
    fn flush_one(&mut self) -> bool {
        if self.queue.is_empty() || !self.write_due() {
            return false;
        }
        let Some(frame) = self.queue.front() else {
            return false;
        };
        let len = frame.len();
        if self.peripheral.notify(frame) {
            self.queue.dequeue();
            self.last_write = Some(self.clock.now());
            self.stats.record_sent(len);
            tracing::debug!(len, queued = self.queue.len(), "wireless frame notified");
            true
        } else {
            tracing::debug!(len, "wireless stack refused notification, will retry");
            false
        }
    }
}

impl<P: GattPeripheral, K: Clock> Link for WirelessLink<P, K> {
    fn kind(&self) -> LinkKind {
        LinkKind::Wireless
    }

    fn enable(&mut self) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        self.queue.clear();
        while self.peripheral.take_written().is_some() {}
        self.last_write = None;
        self.connected = false;
        self.start_advertising();
    }

    fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        self.stop_advertising();
        self.peripheral.disconnect_all();
        self.connected = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_connected(&self) -> bool {
        self.enabled && self.connected
    }

    fn is_write_busy(&self) -> bool {
        !self.write_due()
    }

    fn write_frame(&mut self, frame: &[u8]) -> usize {
        if frame.len() > MAX_FRAME_SIZE {
            tracing::warn!(len = frame.len(), "wireless write_frame: frame too big");
            self.stats.record_dropped();
            return 0;
        }
        if !self.is_connected() {
            return 0;
        }
        match self.queue.enqueue(frame) {
            Ok(len) => len,
            Err(QueueReject::Full) => {
                tracing::warn!("wireless write_frame: send queue is full");
                self.stats.record_dropped();
                0
            }
            Err(_) => 0,
        }
    }

    fn check_recv_frame(&mut self, dest: &mut [u8]) -> usize {
        if !self.enabled {
            return 0;
        }
        self.refresh_connection();
        if !self.connected {
            return 0;
        }

        if self.flush_one() {
            return 0;
        }

        match self.peripheral.take_written() {
            Some(frame) if frame.len() > MAX_FRAME_SIZE => {
                tracing::warn!(len = frame.len(), "wireless peer wrote oversize frame, dropped");
                self.stats.record_dropped();
                0
            }
            Some(frame) if !frame.is_empty() => {
                tracing::debug!(len = frame.len(), "wireless frame received");
                deliver(&frame, dest, &mut self.stats)
            }
            _ => 0,
        }
    }

    fn needs_service(&self) -> bool {
        self.enabled
    }

    fn service(&mut self) {
        if !self.enabled {
            return;
        }
        self.refresh_connection();
        if self.connected {
            self.flush_one();
        }
    }

    fn stats(&self) -> LinkStats {
        self.stats.clone()
    }
}
