//! Browses a service type on the local network and prints each snapshot as
//! it arrives, in the style of the teacher's `dnsquery` demo binary.
use log::debug;

use mdns_sd::error::Result;

mod args;
use args::CliOptions;

fn main() -> Result<()> {
    env_logger::init();

    let options = CliOptions::options()?;
    debug!("options: {:?}", &options);

    let handle = mdns_sd::init(options.interface, options.debug)?;

    mdns_sd::query(&handle, &options.service_type, options.ttl_cap, options.runtime_seconds, |services| {
        for svc in services {
            if svc.expired {
                println!("- {} ({}) expired", svc.name, svc.hostname);
            } else {
                println!("+ {} ({}) {}:{}", svc.name, svc.hostname, svc.addr, svc.port);
                for attr in &svc.attributes {
                    match &attr.value {
                        Some(v) => println!("    {}={}", attr.name, v),
                        None => println!("    {}", attr.name),
                    }
                }
            }
        }
        false
    })?;

    Ok(())
}
