use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use structopt::StructOpt;
use usbids::{update_store, FileSource, HttpSource, UsbIdStore, UsbIdsSource};

#[derive(structopt::StructOpt)]
#[structopt(name = "usb-lookup", about = "USB vendor and device ID lookup")]
struct Args {
    /// Update the database with the latest vendor and device information
    #[structopt(short = "u")]
    update: bool,

    /// List the devices of a vendor
    #[structopt(short = "v", value_name = "vendor_id")]
    vendor: Option<String>,

    /// Find devices with this ID and the vendors they belong to
    #[structopt(short = "d", value_name = "device_id")]
    device: Option<String>,

    /// Look up a vendor ID and a device ID together
    #[structopt(short = "c", value_name = "id", number_of_values = 2)]
    complete: Vec<String>,

    /// Prompt for IDs until end of input
    #[structopt(short = "i")]
    interactive: bool,

    #[structopt(long = "db", default_value = "usb_ids.db", parse(from_os_str))]
    db: PathBuf,

    #[structopt(long = "url", default_value = "http://www.linux-usb.org/usb.ids")]
    url: String,

    /// Read usb.ids from this file instead of downloading it
    #[structopt(long = "usb-ids-file", parse(from_os_str))]
    usb_ids_file: Option<PathBuf>,

    #[structopt(long = "timeout-secs", default_value = "30")]
    timeout_secs: u64,
}

#[paw::main]
fn main(args: Args) -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut store = UsbIdStore::open(&args.db)
        .with_context(|| format!("Cannot open database {}", args.db.display()))?;
    let source: Box<dyn UsbIdsSource> = match &args.usb_ids_file {
        Some(path) => Box::new(FileSource::new(path)),
        None => Box::new(HttpSource::new(
            &args.url,
            Duration::from_secs(args.timeout_secs),
        )),
    };

    let complete_pair = complete_ids(&args.complete)?;

    if args.update {
        println!("\nUpdating Database...");
        let summary =
            update_store(source.as_ref(), &mut store).context("Database update failed!")?;
        println!(
            "\nDatabase updated! vendors({}) devices({})",
            summary.vendors, summary.devices
        );
        return Ok(());
    }

    if let Some(vendor_id) = &args.vendor {
        ensure_snapshot(source.as_ref(), &mut store)?;
        vendor_only(&store, vendor_id)?;
    } else if let Some(device_id) = &args.device {
        ensure_snapshot(source.as_ref(), &mut store)?;
        device_only(&store, device_id)?;
    } else if let Some((vendor_id, device_id)) = complete_pair {
        ensure_snapshot(source.as_ref(), &mut store)?;
        complete(&store, vendor_id, device_id)?;
    } else if args.interactive {
        ensure_snapshot(source.as_ref(), &mut store)?;
        interactive_mode(&store)?;
    } else {
        Args::clap().print_help()?;
        println!();
    }
    Ok(())
}

/// `-c` may be repeated on the command line, so the value count is checked here.
fn complete_ids(values: &[String]) -> Result<Option<(&str, &str)>> {
    match values {
        [] => Ok(None),
        [vendor_id, device_id] => Ok(Some((vendor_id.as_str(), device_id.as_str()))),
        _ => bail!(
            "-c takes one vendor ID and one device ID, got {} values",
            values.len()
        ),
    }
}

fn ensure_snapshot(source: &dyn UsbIdsSource, store: &mut UsbIdStore) -> Result<()> {
    if store.has_snapshot()? {
        return Ok(());
    }
    println!("Database not found! Updating...");
    update_store(source, store).context("Database update failed!")?;
    println!("Database updated!");
    Ok(())
}

fn vendor_only(store: &UsbIdStore, vendor_id: &str) -> Result<()> {
    println!("\nDatabase Reverse Device Search:");
    let vendor = store.vendor_by_id(vendor_id)?;
    let devices = store.devices_by_vendor(vendor_id, None)?;
    match vendor {
        Some(vendor) => println!("\n{} {}", vendor.id, vendor.name),
        None if devices.is_empty() => {
            println!("\nVendor {} not found!", vendor_id);
            return Ok(());
        }
        None => println!("\nUnknown Vendor"),
    }
    for device in devices {
        println!("\t{} {}", device.id, device.name);
    }
    Ok(())
}

fn device_only(store: &UsbIdStore, device_id: &str) -> Result<()> {
    println!("\nDatabase Device Search:");
    let devices = store.devices_by_id(device_id)?;
    if devices.is_empty() {
        println!("\nDevice {} not found!", device_id);
    }
    for device in devices {
        match store.vendor_by_id(&device.vendor_id)? {
            Some(vendor) => println!(
                "\n{} {}\n\t{} {}",
                vendor.id, vendor.name, device.id, device.name
            ),
            None => println!("\nUnknown Vendor\n\t{} {}", device.id, device.name),
        }
    }
    Ok(())
}

fn complete(store: &UsbIdStore, vendor_id: &str, device_id: &str) -> Result<()> {
    println!("\nDatabase Complete Search:");
    match store.complete(vendor_id, device_id)? {
        (Some(vendor), Some(device)) => println!(
            "\n{} {}\n\t{} {}",
            vendor.id, vendor.name, device.id, device.name
        ),
        (Some(vendor), None) => println!(
            "\n{} {}\n\tDevice {} not found!",
            vendor.id, vendor.name, device_id
        ),
        (None, Some(device)) => println!("\nUnknown Vendor\n\t{} {}", device.id, device.name),
        (None, None) => println!(
            "\nVendor {} and Device {} not found!",
            vendor_id, device_id
        ),
    }
    Ok(())
}

fn interactive_mode(store: &UsbIdStore) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        let vendor_id = match prompt(&mut lines, "\nEnter Vendor ID: ")? {
            Some(vendor_id) => vendor_id,
            None => break,
        };
        let device_id = match prompt(&mut lines, "Enter Device ID: ")? {
            Some(device_id) => device_id,
            None => break,
        };

        match (vendor_id.is_empty(), device_id.is_empty()) {
            (false, true) => vendor_only(store, &vendor_id)?,
            (true, false) => device_only(store, &device_id)?,
            (false, false) => complete(store, &vendor_id, &device_id)?,
            (true, true) => println!("\nNo input provided!"),
        }

        if prompt(&mut lines, "\nPress enter to continue...")?.is_none() {
            break;
        }
    }
    println!("\n\nGoodbye!\n");
    Ok(())
}

/// Returns `None` once stdin is exhausted.
fn prompt<B: BufRead>(lines: &mut io::Lines<B>, message: &str) -> Result<Option<String>> {
    print!("{}", message);
    io::stdout().flush()?;
    Ok(lines.next().transpose()?.map(|line| line.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_from(argv: &[&str]) -> Args {
        Args::from_iter(std::iter::once("usb-lookup").chain(argv.iter().copied()))
    }

    #[test]
    fn test_complete_takes_a_vendor_and_a_device() -> Result<()> {
        let args = args_from(&["-c", "8086", "0a2b"]);
        assert_eq!(complete_ids(&args.complete)?, Some(("8086", "0a2b")));
        let no_args = args_from(&[]);
        assert_eq!(complete_ids(&no_args.complete)?, None);
        Ok(())
    }

    #[test]
    fn test_repeated_complete_is_rejected() -> Result<()> {
        let args = args_from(&["-c", "8086", "0a2b", "-c", "1d6b", "0001"]);
        assert!(complete_ids(&args.complete).is_err());
        Ok(())
    }
}
