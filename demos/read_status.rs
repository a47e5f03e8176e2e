//! Example: Reading the full status of a SiOt device
//!
//! Run with: cargo run --example read_status -- 192.168.0.10 1025
//!
//! Set RUST_LOG=siot=debug to see every frame on the wire.

use siot::{Client, ClientConfig, FlagPage};
use std::net::IpAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let ip: IpAddr = args.next().ok_or("usage: read_status <ip> <port>")?.parse()?;
    let port: u16 = args.next().ok_or("usage: read_status <ip> <port>")?.parse()?;

    // =========================================================================
    // Connect
    // =========================================================================

    let config = ClientConfig::new(ip, port).with_timeout(Duration::from_secs(3));
    let mut client = Client::new(config)?;

    // =========================================================================
    // Bit vectors
    // =========================================================================

    let io = client.io_state()?;
    println!("I/O:   {}", io);
    println!("  ON:  {:?}", io.on_indices());

    let flags = client.flag_state()?;
    println!("Flags: {}", flags);

    let ether = client.ether_flags()?;
    println!("Ether: {}", ether);

    // =========================================================================
    // Counters and state
    // =========================================================================

    println!("Uptime: {}", client.uptime()?);
    println!("State:  {}", client.run_state()?);

    for (i, value) in client.out_counters()?.iter().enumerate() {
        println!("OUT{:<2} = {}", i + 1, value);
    }

    for page in FlagPage::ALL {
        let counters = client.flag_counters(page)?;
        for (i, value) in counters.iter().enumerate() {
            println!("FLAG{:<2} = {}", usize::from(page.first_flag()) + i, value);
        }
    }

    Ok(())
}
