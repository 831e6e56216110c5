//! Network-facing collaborators. The storage core does not depend on
//! anything here.

pub mod connectivity;

pub use connectivity::{
    Connectivity, ConnectivityEvent, DriverEvent, NetworkInfo, WifiDriver, MAX_RECONNECT_ATTEMPTS,
};
