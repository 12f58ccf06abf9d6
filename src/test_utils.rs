use crate::store::UsbIdStore;
use crate::usb_id_data::parse_usb_ids;

pub const SAMPLE_USB_IDS: &str = concat!(
    "#\n",
    "#\tList of USB ID's\n",
    "#\n",
    "# Version: 2024.01.01\n",
    "\n",
    "# Syntax:\n",
    "# vendor  vendor_name\n",
    "#\tdevice  device_name\t\t\t\t<-- single tab\n",
    "\n",
    "8086  Intel Corp.\n",
    "\t0001  AnyPoint (TM) Home Network 1.6 Mbps Wireless Adapter\n",
    "\t0a2b  Device  With Spaces\n",
    "\t0dad  Cherry MiniatureCard Keyboard\n",
    "\n",
    "1d6b  Linux Foundation\n",
    "\t0001  1.1 root hub\n",
    "\n",
    "# List of known device classes, subclasses and protocols\n",
    "\n",
    "C 00  (Defined at Interface level)\n",
    "C 01  Audio\n",
    "\t01  Control Device\n",
    "dead  Not A Vendor\n",
    "\tbeef  Not A Device\n",
);

pub fn sample_store() -> anyhow::Result<UsbIdStore> {
    let mut store = UsbIdStore::open_in_memory()?;
    store.replace(&parse_usb_ids(SAMPLE_USB_IDS)?)?;
    Ok(store)
}
