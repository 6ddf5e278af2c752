//! Manage command line arguments here.
use std::net::Ipv4Addr;
use std::str::FromStr;

use clap::{App, Arg};

use mdns_sd::error::Result;

/// This structure holds the command line arguments.
#[derive(Debug)]
pub struct CliOptions {
    pub service_type: String,
    pub interface: Ipv4Addr,
    pub ttl_cap: u32,
    pub runtime_seconds: u32,
    pub debug: bool,
}

impl CliOptions {
    pub fn options() -> Result<Self> {
        let matches = App::new("mdns-browse")
            .version("0.1")
            .about("Browses a DNS-SD service type over multicast DNS")
            .arg(
                Arg::new("service-type")
                    .short('t')
                    .long("type")
                    .required(true)
                    .long_help("Service type to browse, e.g. _airplay._tcp.local")
                    .takes_value(true),
            )
            .arg(
                Arg::new("interface")
                    .short('i')
                    .long("interface")
                    .required(false)
                    .default_value("0.0.0.0")
                    .long_help("IPv4 address of the interface to bind multicast to")
                    .takes_value(true),
            )
            .arg(
                Arg::new("ttl-cap")
                    .long("ttl-cap")
                    .required(false)
                    .default_value("0")
                    .long_help("Cap on how long (seconds) an advertisement is believed; 0 = no cap")
                    .takes_value(true),
            )
            .arg(
                Arg::new("runtime")
                    .short('r')
                    .long("runtime")
                    .required(false)
                    .default_value("0")
                    .long_help("How long to browse, in seconds; 0 = forever")
                    .takes_value(true),
            )
            .arg(
                Arg::new("debug")
                    .short('g')
                    .long("debug")
                    .required(false)
                    .long_help("Debug mode")
                    .takes_value(false),
            )
            .get_matches();

        Ok(CliOptions {
            service_type: matches.value_of("service-type").unwrap().to_string(),
            interface: Ipv4Addr::from_str(matches.value_of("interface").unwrap())
                .map_err(|e| mdns_sd::error::DnsSdError::protocol(e.to_string()))?,
            ttl_cap: matches.value_of("ttl-cap").unwrap().parse().unwrap_or(0),
            runtime_seconds: matches.value_of("runtime").unwrap().parse().unwrap_or(0),
            debug: matches.is_present("debug"),
        })
    }
}
