//! Local SQLite snapshot of the usb.ids registry.
//!
//! [`update_store`] pulls the registry text from a [`UsbIdsSource`], parses it
//! with [`parse_usb_ids`] and swaps it into a [`UsbIdStore`], which then
//! answers vendor and device lookups.

pub mod error;
pub mod source;
pub mod store;
pub mod usb_id_data;

#[cfg(test)]
mod test_utils;

pub use error::{Error, Result};
pub use source::{FileSource, HttpSource, UsbIdsSource, USB_IDS_URL};
pub use store::{ReplaceSummary, UsbIdStore};
pub use usb_id_data::{parse_usb_ids, Association, Device, Vendor};

use log::info;

/// Fetches, parses and stores a fresh snapshot.
///
/// The store is only touched once the document has been fetched and parsed
/// into at least one association.
pub fn update_store(source: &dyn UsbIdsSource, store: &mut UsbIdStore) -> Result<ReplaceSummary> {
    info!("Updating usb.ids store from {}", source.describe());
    let unparsed_data = source.fetch()?;
    let associations = parse_usb_ids(&unparsed_data)?;
    if associations.is_empty() {
        return Err(Error::EmptyRegistry);
    }
    store.replace(&associations)
}
