use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::usb_id_data::{Association, Device, Vendor};

const STAGING_SCHEMA: &str = r#"
DROP TABLE IF EXISTS vendors_staging;
DROP TABLE IF EXISTS devices_staging;
CREATE TABLE vendors_staging (id TEXT, name TEXT);
CREATE TABLE devices_staging (id TEXT, name TEXT, vendor TEXT);
"#;

// Dropping the live tables also drops their indexes.
const SWAP_SCHEMA: &str = r#"
DROP TABLE IF EXISTS vendors;
DROP TABLE IF EXISTS devices;
ALTER TABLE vendors_staging RENAME TO vendors;
ALTER TABLE devices_staging RENAME TO devices;
CREATE INDEX idx_vendors_id ON vendors (id);
CREATE INDEX idx_devices_id ON devices (id);
CREATE INDEX idx_devices_vendor ON devices (vendor);
"#;

/// Row counts of a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    pub vendors: usize,
    pub devices: usize,
}

/// SQLite snapshot of usb.ids with a `vendors` and a `devices` table.
pub struct UsbIdStore {
    conn: Connection,
    path: PathBuf,
}

impl UsbIdStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        info!("Opening usb.ids store at: {:?}", path);
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        Ok(UsbIdStore { conn, path })
    }

    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        info!("Opening usb.ids store read-only at: {:?}", path);
        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(UsbIdStore { conn, path })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(UsbIdStore {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether both snapshot tables exist.
    pub fn has_snapshot(&self) -> Result<bool> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('vendors', 'devices')",
            [],
            |row| row.get(0),
        )?;
        Ok(tables == 2)
    }

    pub fn counts(&self) -> Result<ReplaceSummary> {
        let vendors: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM vendors", [], |row| row.get(0))?;
        let devices: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM devices", [], |row| row.get(0))?;
        Ok(ReplaceSummary {
            vendors: vendors as usize,
            devices: devices as usize,
        })
    }

    /// Replaces the whole snapshot with `associations`.
    ///
    /// The new rows are written to staging tables and renamed over the live
    /// ones inside a single transaction, so on failure the previous snapshot
    /// is still there. Vendors are written once per distinct id. Every
    /// failure is reported as [`Error::StoreUpdateFailed`].
    pub fn replace(&mut self, associations: &[Association]) -> Result<ReplaceSummary> {
        info!(
            "Replacing usb.ids snapshot in {:?} with {} devices",
            self.path,
            associations.len()
        );
        let summary = self.stage_and_swap(associations).map_err(|e| {
            error!("Failed to replace usb.ids snapshot: {}", e);
            match e {
                Error::StoreUpdateFailed(_) => e,
                other => Error::StoreUpdateFailed(other.to_string()),
            }
        })?;
        info!(
            "Stored vendors({}) and devices({})",
            summary.vendors, summary.devices
        );
        Ok(summary)
    }

    fn stage_and_swap(&mut self, associations: &[Association]) -> Result<ReplaceSummary> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(STAGING_SCHEMA)?;

        let mut summary = ReplaceSummary::default();
        {
            let mut insert_vendor =
                tx.prepare("INSERT INTO vendors_staging (id, name) VALUES (?1, ?2)")?;
            let mut insert_device =
                tx.prepare("INSERT INTO devices_staging (id, name, vendor) VALUES (?1, ?2, ?3)")?;
            let mut vendor_names: HashMap<&str, &str> = HashMap::new();

            for Association { vendor, device } in associations {
                if device.vendor_id != vendor.id {
                    return Err(Error::StoreUpdateFailed(format!(
                        "device {} claims vendor {} but is listed under vendor {}",
                        device.id, device.vendor_id, vendor.id
                    )));
                }
                match vendor_names.get(vendor.id.as_str()) {
                    None => {
                        insert_vendor.execute(params![vendor.id, vendor.name])?;
                        vendor_names.insert(&vendor.id, &vendor.name);
                        summary.vendors += 1;
                    }
                    Some(&name) if name != vendor.name => warn!(
                        "Vendor {} listed again as {:?}, keeping {:?}",
                        vendor.id, vendor.name, name
                    ),
                    Some(_) => {}
                }
                insert_device.execute(params![device.id, device.name, vendor.id])?;
                summary.devices += 1;
            }
        }

        tx.execute_batch(SWAP_SCHEMA)?;
        tx.commit()?;
        Ok(summary)
    }

    pub fn vendor_by_id(&self, vendor_id: &str) -> Result<Option<Vendor>> {
        let vendor = self
            .conn
            .query_row(
                "SELECT id, name FROM vendors WHERE id = ?1 ORDER BY rowid LIMIT 1",
                [vendor_id],
                vendor_from_row,
            )
            .optional()?;
        Ok(vendor)
    }

    /// All devices with this id, across vendors.
    pub fn devices_by_id(&self, device_id: &str) -> Result<Vec<Device>> {
        self.query_devices(
            "SELECT id, name, vendor FROM devices WHERE id = ?1 ORDER BY rowid",
            &[device_id],
        )
    }

    pub fn device_by_id_and_vendor(
        &self,
        device_id: &str,
        vendor_id: &str,
    ) -> Result<Option<Device>> {
        let device = self
            .conn
            .query_row(
                "SELECT id, name, vendor FROM devices WHERE id = ?1 AND vendor = ?2 ORDER BY rowid LIMIT 1",
                [device_id, vendor_id],
                device_from_row,
            )
            .optional()?;
        Ok(device)
    }

    /// Devices listed under a vendor, optionally only those with exactly this name.
    pub fn devices_by_vendor(&self, vendor_id: &str, name: Option<&str>) -> Result<Vec<Device>> {
        match name {
            Some(name) => self.query_devices(
                "SELECT id, name, vendor FROM devices WHERE vendor = ?1 AND name = ?2 ORDER BY rowid",
                &[vendor_id, name],
            ),
            None => self.query_devices(
                "SELECT id, name, vendor FROM devices WHERE vendor = ?1 ORDER BY rowid",
                &[vendor_id],
            ),
        }
    }

    pub fn complete(
        &self,
        vendor_id: &str,
        device_id: &str,
    ) -> Result<(Option<Vendor>, Option<Device>)> {
        let vendor = self.vendor_by_id(vendor_id)?;
        let device = self.device_by_id_and_vendor(device_id, vendor_id)?;
        Ok((vendor, device))
    }

    fn query_devices(&self, sql: &str, args: &[&str]) -> Result<Vec<Device>> {
        let mut stmt = self.conn.prepare(sql)?;
        let devices = stmt
            .query_map(rusqlite::params_from_iter(args), device_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(devices)
    }
}

fn vendor_from_row(row: &Row) -> rusqlite::Result<Vendor> {
    Ok(Vendor {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn device_from_row(row: &Row) -> rusqlite::Result<Device> {
    Ok(Device {
        id: row.get(0)?,
        name: row.get(1)?,
        vendor_id: row.get(2)?,
    })
}
