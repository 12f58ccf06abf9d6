use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;

use crate::error::{Error, Result};

pub const USB_IDS_URL: &str = "http://www.linux-usb.org/usb.ids";

/// Somewhere the full usb.ids document can be read from.
pub trait UsbIdsSource {
    fn fetch(&self) -> Result<String>;

    fn describe(&self) -> String;
}

pub struct HttpSource {
    url: String,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(url: &str, timeout: Duration) -> Self {
        HttpSource {
            url: String::from(url),
            timeout,
        }
    }
}

impl UsbIdsSource for HttpSource {
    fn fetch(&self) -> Result<String> {
        info!("Downloading usb.ids from {}", self.url);
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::FetchFailed(e.to_string()))?;
        let response = client
            .get(&self.url)
            .send()
            .map_err(|e| Error::FetchFailed(format!("{}: {}", self.url, e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::FetchFailed(format!("{} returned {}", self.url, status)));
        }
        response
            .text()
            .map_err(|e| Error::FetchFailed(format!("{}: {}", self.url, e)))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileSource {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl UsbIdsSource for FileSource {
    fn fetch(&self) -> Result<String> {
        info!("Reading usb.ids from {:?}", self.path);
        std::fs::read_to_string(&self.path)
            .map_err(|e| Error::FetchFailed(format!("{}: {}", self.path.display(), e)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn test_file_source_reads_document() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "8086  Intel\n\t0a2b  Foo\n")?;

        let source = FileSource::new(file.path());
        assert_eq!(source.fetch()?, "8086  Intel\n\t0a2b  Foo\n");
        Ok(())
    }

    #[test]
    fn test_missing_file_fails_fetch() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let source = FileSource::new(dir.path().join("usb.ids"));
        match source.fetch() {
            Err(Error::FetchFailed(cause)) => {
                assert!(cause.contains("usb.ids"));
                Ok(())
            }
            other => Err(anyhow!("Expected a fetch failure, got {:?}", other)),
        }
    }

    #[test]
    fn test_error_status_fails_fetch() -> anyhow::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let url = format!("http://{}/usb.ids", listener.local_addr()?);
        let server = std::thread::spawn(move || -> std::io::Result<()> {
            let (mut stream, _) = listener.accept()?;
            let mut request: Vec<u8> = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(
                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            )?;
            Ok(())
        });

        let source = HttpSource::new(&url, Duration::from_secs(5));
        let result = source.fetch();
        server
            .join()
            .map_err(|_| anyhow!("Server thread panicked."))??;
        match result {
            Err(Error::FetchFailed(cause)) => {
                assert!(cause.contains("404"), "Status missing from {:?}", cause);
                Ok(())
            }
            other => Err(anyhow!("Expected a fetch failure, got {:?}", other)),
        }
    }

    #[test]
    fn test_unreachable_server_fails_fetch() -> anyhow::Result<()> {
        // Nothing listens on the discard port locally.
        let source = HttpSource::new("http://127.0.0.1:9/usb.ids", Duration::from_secs(5));
        assert_eq!(source.describe(), "http://127.0.0.1:9/usb.ids");
        match source.fetch() {
            Err(Error::FetchFailed(_)) => Ok(()),
            other => Err(anyhow!("Expected a fetch failure, got {:?}", other)),
        }
    }
}
