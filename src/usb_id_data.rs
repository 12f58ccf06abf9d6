use log::{debug, info};
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vendor {
    pub id: String,
    pub name: String,
}

impl Vendor {
    pub fn new(id: &str, name: &str) -> Self {
        Vendor {
            id: String::from(id),
            name: String::from(name),
        }
    }

    fn from_vendor_pairs(vendor_pairs: &mut Pairs<Rule>, line: usize, text: &str) -> Result<Self> {
        let vendor_id = vendor_pairs
            .next()
            .ok_or_else(|| malformed(line, text))?
            .as_str();
        let vendor_name = vendor_pairs
            .next()
            .ok_or_else(|| malformed(line, text))?
            .as_str();
        if vendor_name.trim().is_empty() {
            return Err(malformed(line, text));
        }
        Ok(Vendor::new(vendor_id, vendor_name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    pub name: String,
    /// Id of the owning vendor. Storage does not enforce that it exists.
    pub vendor_id: String,
}

impl Device {
    pub fn new(id: &str, name: &str, vendor_id: &str) -> Self {
        Device {
            id: String::from(id),
            name: String::from(name),
            vendor_id: String::from(vendor_id),
        }
    }

    fn from_device_pairs(
        device_pairs: &mut Pairs<Rule>,
        vendor: &Vendor,
        line: usize,
        text: &str,
    ) -> Result<Self> {
        let device_id = device_pairs
            .next()
            .ok_or_else(|| malformed(line, text))?
            .as_str();
        let device_name = device_pairs
            .next()
            .ok_or_else(|| malformed(line, text))?
            .as_str()
            .trim_end();
        if device_name.is_empty() {
            return Err(malformed(line, text));
        }
        Ok(Device::new(device_id, device_name, &vendor.id))
    }
}

/// One device line of usb.ids together with the vendor it was listed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub vendor: Vendor,
    pub device: Device,
}

/// Parses the vendor/device section of a usb.ids document.
///
/// Associations come back in document order. Parsing stops at the device
/// class catalogue heading. A device line with no vendor above it fails with
/// [`Error::OrphanDevice`]; a line that can't be split on a double space
/// fails with [`Error::MalformedLine`].
pub fn parse_usb_ids(unparsed_data: &str) -> Result<Vec<Association>> {
    info!("Parsing usb.ids data!");
    let unparsed_data = unparsed_data
        .strip_prefix('\u{feff}')
        .unwrap_or(unparsed_data);
    let mut parsed = UsbIdsParser::parse(Rule::file, unparsed_data)
        .map_err(|e| malformed_from_pest_error(unparsed_data, &e))?;
    let file_pair = match parsed.next() {
        Some(pair) => pair,
        None => return Ok(Vec::new()),
    };

    let mut num_vendors = 0;
    let mut current_vendor: Option<Vendor> = None;
    let mut associations = Vec::new();
    for line_pair in file_pair.into_inner() {
        match line_pair.as_rule() {
            Rule::vendor => {
                num_vendors += 1;
                let (line, text) = line_of(&line_pair);
                let vendor = Vendor::from_vendor_pairs(&mut line_pair.into_inner(), line, &text)?;
                debug!("vendor: {:?}", &vendor);
                current_vendor = Some(vendor);
            }
            Rule::device => {
                let (line, text) = line_of(&line_pair);
                let vendor = current_vendor
                    .as_ref()
                    .ok_or_else(|| Error::OrphanDevice {
                        line,
                        text: text.clone(),
                    })?;
                let device =
                    Device::from_device_pairs(&mut line_pair.into_inner(), vendor, line, &text)?;
                debug!("device: {:?}", &device);
                associations.push(Association {
                    vendor: vendor.clone(),
                    device,
                });
            }
            Rule::class_section => {
                info!("Reached the device class list, ignoring the rest of the data.");
                break;
            }
            Rule::EOI => info!("End of input reached."),
            _ => unreachable!(),
        }
    }
    info!(
        "Number of objects imported from the usb.ids data: vendors({}) and devices({})",
        num_vendors,
        associations.len()
    );

    Ok(associations)
}

#[derive(Parser)]
#[grammar = "usbids.pest"]
struct UsbIdsParser;

fn malformed(line: usize, text: &str) -> Error {
    Error::MalformedLine {
        line,
        text: String::from(text),
    }
}

fn line_of(pair: &Pair<Rule>) -> (usize, String) {
    let (line, _) = pair.line_col();
    (line, String::from(pair.as_str()))
}

fn malformed_from_pest_error(unparsed_data: &str, error: &pest::error::Error<Rule>) -> Error {
    let line = match error.line_col {
        pest::error::LineColLocation::Pos((line, _)) => line,
        pest::error::LineColLocation::Span((line, _), _) => line,
    };
    let text = unparsed_data
        .lines()
        .nth(line.saturating_sub(1))
        .unwrap_or_default();
    malformed(line, text.trim_end_matches('\r'))
}
