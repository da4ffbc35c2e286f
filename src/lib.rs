//! mini-kvm - drive a remote machine's keyboard and mouse through a CH9329
//!
//! Shared pieces of the CLI: config file handling and the relay line
//! protocol. The wire format lives in `ch9329-protocol` and the input
//! mapping in `kvm-input`.

pub mod config;
pub mod relay;

pub use config::Config;
pub use relay::{parse_line, RelayCommand, RelayError, RelayStats};
