//! Network connectivity manager.
//!
//! Owns the connection/retry state machine around a hardware driver and
//! publishes state changes to a broadcast event bus. The state lives in an
//! explicitly constructed `Connectivity` value handed to whoever needs it -
//! there is no ambient global, and teardown is just dropping the value.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Reconnect attempts while a connection is in progress before giving up
/// with [`ConnectivityEvent::NoAp`].
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Event bus depth; slow subscribers lag rather than block the manager.
const EVENT_BUS_CAPACITY: usize = 16;

/// One access point seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub ssid: String,
    /// Signal strength in dBm.
    pub rssi: i32,
    /// Whether the network is unauthenticated.
    pub open: bool,
}

/// State changes published to the event bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityEvent {
    /// A station connection attempt has begun.
    Connecting,
    /// The station got an address.
    Connected { ip: String },
    /// The fallback access point is up and accepting clients.
    ApReady,
    /// A scan finished with the networks it saw.
    ScanDone { networks: Vec<NetworkInfo> },
    /// The retry budget ran out without a connection.
    NoAp,
}

/// Asynchronous notifications from the hardware driver.
#[derive(Debug, Clone)]
pub enum DriverEvent {
    StationStarted,
    ApStarted,
    ScanCompleted(Vec<NetworkInfo>),
    Disconnected,
    GotIp(String),
}

/// Hardware abstraction for the wireless interface.
#[async_trait]
pub trait WifiDriver: Send {
    /// Bring up the network stack. Called once before any other command.
    async fn init(&mut self) -> Result<()>;
    /// Configure station mode and start connecting.
    async fn start_station(&mut self, ssid: &str, password: &str) -> Result<()>;
    /// Retry the current station connection.
    async fn reconnect(&mut self) -> Result<()>;
    /// Configure and start the fallback access point.
    async fn start_access_point(&mut self, ssid: &str, password: &str) -> Result<()>;
    /// Kick off an asynchronous scan; completion arrives as a
    /// [`DriverEvent::ScanCompleted`].
    async fn start_scan(&mut self) -> Result<()>;
    /// Station hardware address.
    fn mac_address(&self) -> [u8; 6];
    /// Advertise `name` as the device hostname.
    async fn set_hostname(&mut self, name: &str) -> Result<()>;
}

/// Connection/retry state machine over a [`WifiDriver`].
pub struct Connectivity<D: WifiDriver> {
    driver: D,
    events: broadcast::Sender<ConnectivityEvent>,
    connecting: bool,
    connected: bool,
    from_ap: bool,
    reconnects: u32,
}

impl<D: WifiDriver> Connectivity<D> {
    pub fn new(driver: D) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            driver,
            events,
            connecting: false,
            connected: false,
            from_ap: false,
            reconnects: 0,
        }
    }

    /// Subscribe to state-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events.subscribe()
    }

    /// Bring up the network stack.
    pub async fn init(&mut self) -> Result<()> {
        tracing::info!("initializing network stack");
        self.driver.init().await
    }

    /// Begin connecting to `ssid` as a station.
    pub async fn connect(&mut self, ssid: &str, password: &str) -> Result<()> {
        tracing::info!(ssid, "connecting to network");
        self.reconnects = 0;
        self.connecting = true;
        self.driver.start_station(ssid, password).await
    }

    /// Start the fallback access point.
    pub async fn start_access_point(&mut self, ssid: &str, password: &str) -> Result<()> {
        self.connecting = false;
        self.driver.start_access_point(ssid, password).await
    }

    /// Start a scan, unless a connection is already up or in progress.
    pub async fn start_scan(&mut self) -> Result<()> {
        if self.connected || self.connecting {
            return Ok(());
        }
        self.driver.start_scan().await
    }

    /// Colon-separated lowercase hardware address.
    pub fn mac_address(&self) -> String {
        let mac = self.driver.mac_address();
        mac.iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Set the advertised hostname.
    pub async fn set_hostname(&mut self, name: &str) -> Result<()> {
        tracing::info!(hostname = name, "setting hostname");
        self.driver.set_hostname(name).await
    }

    /// Whether the station currently holds an address.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Feed one driver notification through the state machine.
    pub async fn handle_driver_event(&mut self, event: DriverEvent) -> Result<()> {
        match event {
            DriverEvent::StationStarted => {
                if self.connecting {
                    self.driver.reconnect().await?;
                    self.publish(ConnectivityEvent::Connecting);
                }
            }
            DriverEvent::ApStarted => {
                if !self.connecting {
                    self.from_ap = true;
                    self.publish(ConnectivityEvent::ApReady);
                }
            }
            DriverEvent::ScanCompleted(networks) => {
                self.publish(ConnectivityEvent::ScanDone { networks });
            }
            DriverEvent::Disconnected => {
                if self.connecting {
                    if self.reconnects < MAX_RECONNECT_ATTEMPTS {
                        self.reconnects += 1;
                        tracing::warn!(attempt = self.reconnects, "connection lost, retrying");
                        self.driver.reconnect().await?;
                    } else {
                        tracing::error!("retry budget exhausted, giving up");
                        self.connecting = false;
                        self.reconnects = 0;
                        self.publish(ConnectivityEvent::NoAp);
                    }
                }
            }
            DriverEvent::GotIp(ip) => {
                self.connected = true;
                self.connecting = false;
                tracing::info!(%ip, "connected");
                self.publish(ConnectivityEvent::Connected { ip });
            }
        }
        Ok(())
    }

    fn publish(&self, event: ConnectivityEvent) {
        // No subscribers is fine; events are advisory.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MockDriver {
        station_starts: u32,
        reconnects: u32,
        scans: u32,
        hostname: Option<String>,
    }

    #[async_trait]
    impl WifiDriver for MockDriver {
        async fn init(&mut self) -> Result<()> {
            Ok(())
        }

        async fn start_station(&mut self, _ssid: &str, _password: &str) -> Result<()> {
            self.station_starts += 1;
            Ok(())
        }

        async fn reconnect(&mut self) -> Result<()> {
            self.reconnects += 1;
            Ok(())
        }

        async fn start_access_point(&mut self, _ssid: &str, _password: &str) -> Result<()> {
            Ok(())
        }

        async fn start_scan(&mut self) -> Result<()> {
            self.scans += 1;
            Ok(())
        }

        fn mac_address(&self) -> [u8; 6] {
            [0xde, 0xad, 0xbe, 0xef, 0x00, 0x42]
        }

        async fn set_hostname(&mut self, name: &str) -> Result<()> {
            self.hostname = Some(name.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_connect_then_got_ip_publishes_connected() {
        let mut conn = Connectivity::new(MockDriver::default());
        let mut events = conn.subscribe();

        conn.connect("home", "secret").await.unwrap();
        conn.handle_driver_event(DriverEvent::StationStarted)
            .await
            .unwrap();
        conn.handle_driver_event(DriverEvent::GotIp("10.0.0.7".into()))
            .await
            .unwrap();

        assert_eq!(events.recv().await.unwrap(), ConnectivityEvent::Connecting);
        assert_eq!(
            events.recv().await.unwrap(),
            ConnectivityEvent::Connected {
                ip: "10.0.0.7".into()
            }
        );
        assert!(conn.is_connected());
    }

    #[tokio::test]
    async fn test_retry_budget_then_no_ap() {
        let mut conn = Connectivity::new(MockDriver::default());
        let mut events = conn.subscribe();

        conn.connect("home", "secret").await.unwrap();
        for _ in 0..=MAX_RECONNECT_ATTEMPTS {
            conn.handle_driver_event(DriverEvent::Disconnected)
                .await
                .unwrap();
        }

        assert_eq!(conn.driver.reconnects, MAX_RECONNECT_ATTEMPTS);
        assert_eq!(events.recv().await.unwrap(), ConnectivityEvent::NoAp);
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_when_idle_is_ignored() {
        let mut conn = Connectivity::new(MockDriver::default());
        conn.handle_driver_event(DriverEvent::Disconnected)
            .await
            .unwrap();
        assert_eq!(conn.driver.reconnects, 0);
    }

    #[tokio::test]
    async fn test_scan_suppressed_while_connecting() {
        let mut conn = Connectivity::new(MockDriver::default());
        conn.connect("home", "secret").await.unwrap();
        conn.start_scan().await.unwrap();
        assert_eq!(conn.driver.scans, 0);
    }

    #[tokio::test]
    async fn test_scan_results_reach_subscribers() {
        let mut conn = Connectivity::new(MockDriver::default());
        let mut events = conn.subscribe();
        let seen = vec![NetworkInfo {
            ssid: "cafe".into(),
            rssi: -61,
            open: true,
        }];

        conn.handle_driver_event(DriverEvent::ScanCompleted(seen.clone()))
            .await
            .unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            ConnectivityEvent::ScanDone { networks: seen }
        );
    }

    #[tokio::test]
    async fn test_ap_start_marks_ready_and_formats_mac() {
        let mut conn = Connectivity::new(MockDriver::default());
        let mut events = conn.subscribe();

        conn.start_access_point("setup", "").await.unwrap();
        conn.handle_driver_event(DriverEvent::ApStarted)
            .await
            .unwrap();

        assert_eq!(events.recv().await.unwrap(), ConnectivityEvent::ApReady);
        assert_eq!(conn.mac_address(), "de:ad:be:ef:00:42");
    }
}
