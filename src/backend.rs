use crate::error::{Error, Result};
use crate::status::STATUS_SIZE;
use log::{debug, info};
use snmp2::{SyncSession, Value};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::Path;
use std::time::{Duration, Instant};

/// A device byte-stream paired with its status back-channel.
pub trait Backend {
    /// Write `data` and flush it before returning.
    fn send_command(&mut self, data: &[u8]) -> Result<()>;

    /// Read one status frame into `buf`.
    ///
    /// Returns the number of bytes read. A timed-out read returns `Ok(0)`,
    /// a short read returns fewer than 32.
    fn read_status(&mut self, buf: &mut [u8; STATUS_SIZE], timeout: Duration) -> Result<usize>;
}

impl Backend for Box<dyn Backend> {
    fn send_command(&mut self, data: &[u8]) -> Result<()> {
        (**self).send_command(data)
    }

    fn read_status(&mut self, buf: &mut [u8; STATUS_SIZE], timeout: Duration) -> Result<usize> {
        (**self).read_status(buf, timeout)
    }
}

// Brother printer status as a 32-byte octet string
const STATUS_OID: &str = "1.3.6.1.4.1.2435.3.3.9.1.6.1.0";

// snmp2 waits forever without a timeout
const MIN_SNMP_TIMEOUT: Duration = Duration::from_millis(10);

fn snmp_timeout(timeout: Duration) -> Duration {
    timeout.max(MIN_SNMP_TIMEOUT)
}

pub struct NetworkBackend {
    stream: TcpStream,
    host: String,
}

impl NetworkBackend {
    pub fn new(host: &str) -> Result<Self> {
        // Default to the raw printing port
        let address = if host.contains(':') {
            host.to_string()
        } else {
            format!("{}:9100", host)
        };

        let stream = TcpStream::connect(&address)?;
        stream.set_nodelay(true)?;
        info!("Connected to {}", address);
        Ok(NetworkBackend {
            stream,
            host: host.to_string(),
        })
    }
}

impl Backend for NetworkBackend {
    fn send_command(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data)?;
        self.stream.flush()?;
        debug!("TCP write: {} bytes", data.len());
        Ok(())
    }

    fn read_status(&mut self, buf: &mut [u8; STATUS_SIZE], timeout: Duration) -> Result<usize> {
        // The raw port never answers; the status lives behind SNMP
        let oid = STATUS_OID
            .parse()
            .map_err(|e| Error::Snmp(format!("Invalid OID: {:?}", e)))?;

        let snmp_host = match self.host.find(':') {
            Some(pos) => &self.host[..pos],
            None => &self.host,
        };

        let snmp_addr = format!("{}:161", snmp_host);
        let mut session =
            SyncSession::new_v2c(snmp_addr, b"public", Some(snmp_timeout(timeout)), 0)?;

        let mut response = session
            .get(&oid)
            .map_err(|e| Error::Snmp(format!("{:?}", e)))?;

        match response.varbinds.next() {
            Some((_oid, Value::OctetString(data))) => {
                let n = data.len().min(STATUS_SIZE);
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(_) => Err(Error::Snmp(
                "Invalid SNMP response type: expected OctetString".to_string(),
            )),
            None => Ok(0),
        }
    }
}

pub struct UsbBackend {
    device: rusb::DeviceHandle<rusb::GlobalContext>,
    endpoint_in: u8,
    endpoint_out: u8,
    timeout: Duration,
}

impl UsbBackend {
    // device_specifier is in the form of vendor_id:product_id (e.g., "04f9:2028")
    pub fn new(device_specifier: &str) -> Result<Self> {
        let (vendor_id, product_id) = parse_usb_specifier(device_specifier)?;

        let devices = rusb::devices()?;
        let mut target_device = None;

        for device in devices.iter() {
            let device_desc = device.device_descriptor()?;
            if device_desc.vendor_id() == vendor_id && device_desc.product_id() == product_id {
                target_device = Some(device);
                break;
            }
        }

        let device = target_device
            .ok_or_else(|| Error::Device("Brother QL printer not found via USB".to_string()))?;
        let handle = device.open()?;

        if handle.kernel_driver_active(0)? {
            handle.detach_kernel_driver(0)?;
        }

        handle.set_active_configuration(1)?;

        let config_desc = device.config_descriptor(0)?;
        let mut printer_interface = None;
        let mut interface_number = 0;

        for interface in config_desc.interfaces() {
            for descriptor in interface.descriptors() {
                if descriptor.class_code() == 7 {
                    printer_interface = Some(descriptor);
                    interface_number = interface.number();
                    break;
                }
            }
            if printer_interface.is_some() {
                break;
            }
        }

        let interface_desc = printer_interface
            .ok_or_else(|| Error::Device("No printer interface found".to_string()))?;
        handle.claim_interface(interface_number)?;

        let mut endpoint_in = 0;
        let mut endpoint_out = 0;

        for endpoint_desc in interface_desc.endpoint_descriptors() {
            match endpoint_desc.direction() {
                rusb::Direction::In => endpoint_in = endpoint_desc.address(),
                rusb::Direction::Out => endpoint_out = endpoint_desc.address(),
            }
        }

        if endpoint_in == 0 || endpoint_out == 0 {
            return Err(Error::Device(
                "Could not find required USB endpoints".to_string(),
            ));
        }

        info!(
            "USB connection established: interface {}, endpoint IN 0x{:02x}, endpoint OUT 0x{:02x}",
            interface_number, endpoint_in, endpoint_out
        );

        Ok(UsbBackend {
            device: handle,
            endpoint_in,
            endpoint_out,
            timeout: Duration::from_secs(10),
        })
    }
}

fn parse_usb_specifier(device_specifier: &str) -> Result<(u16, u16)> {
    let (vendor_str, product_str) = device_specifier.split_once(':').ok_or_else(|| {
        Error::Device("USB device specifier must be in format vendor_id:product_id".to_string())
    })?;
    let parse = |s: &str| {
        u16::from_str_radix(s.trim_start_matches("0x"), 16)
            .map_err(|e| Error::Device(format!("Invalid USB id '{}': {}", s, e)))
    };
    Ok((parse(vendor_str)?, parse(product_str)?))
}

impl Backend for UsbBackend {
    fn send_command(&mut self, data: &[u8]) -> Result<()> {
        let bytes_written = self
            .device
            .write_bulk(self.endpoint_out, data, self.timeout)?;
        debug!(
            "USB write: {} bytes written out of {} bytes",
            bytes_written,
            data.len()
        );
        if bytes_written != data.len() {
            return Err(Error::Device(format!(
                "Incomplete USB write: {} of {} bytes",
                bytes_written,
                data.len()
            )));
        }
        Ok(())
    }

    fn read_status(&mut self, buf: &mut [u8; STATUS_SIZE], timeout: Duration) -> Result<usize> {
        match self.device.read_bulk(self.endpoint_in, buf, timeout) {
            Ok(n) => Ok(n),
            Err(rusb::Error::Timeout) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

/// A printer character device such as `/dev/usb/lp0`.
///
/// The back-channel is read from the same file. Each read first waits for
/// the device to become readable, so a silent printer ends the read when
/// the timeout passes instead of blocking.
pub struct DeviceFileBackend {
    file: File,
}

impl DeviceFileBackend {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        info!("Opened printer device {}", path.display());
        Ok(DeviceFileBackend { file })
    }

    /// Wait until the device has data or `deadline` passes.
    #[cfg(unix)]
    fn wait_readable(&self, deadline: Instant) -> Result<bool> {
        use std::os::unix::io::AsRawFd;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let millis = remaining.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
            let mut fds = libc::pollfd {
                fd: self.file.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            };

            let ready = unsafe { libc::poll(&mut fds, 1, millis) };
            if ready >= 0 {
                return Ok(ready > 0);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err.into());
            }
        }
    }

    #[cfg(not(unix))]
    fn wait_readable(&self, _deadline: Instant) -> Result<bool> {
        Ok(true)
    }
}

impl Backend for DeviceFileBackend {
    fn send_command(&mut self, data: &[u8]) -> Result<()> {
        self.file.write_all(data)?;
        self.file.flush()?;
        debug!("Device write: {} bytes", data.len());
        Ok(())
    }

    fn read_status(&mut self, buf: &mut [u8; STATUS_SIZE], timeout: Duration) -> Result<usize> {
        let deadline = Instant::now() + timeout;
        let mut total = 0;
        while total < STATUS_SIZE {
            if !self.wait_readable(deadline)? {
                debug!("Device read timed out after {} bytes", total);
                break;
            }
            match self.file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(total)
    }
}

/// Create a backend based on the host specifier
///
/// # Arguments
/// * `host` - `vid:pid` for USB, an absolute device path such as
///   `/dev/usb/lp0`, or a hostname for network printers
///
/// # Returns
/// * Backend implementation (UsbBackend, DeviceFileBackend or NetworkBackend)
pub fn from_host(host: &str) -> Result<Box<dyn Backend>> {
    fn is_usb_specifier(host: &str) -> bool {
        host.contains(':') && host.chars().all(|c| c.is_ascii_hexdigit() || c == ':')
    }

    if host.starts_with('/') {
        Ok(Box::new(DeviceFileBackend::new(host)?))
    } else if is_usb_specifier(host) {
        Ok(Box::new(UsbBackend::new(host)?))
    } else {
        Ok(Box::new(NetworkBackend::new(host)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_usb_specifier() {
        assert_eq!(parse_usb_specifier("04f9:2028").unwrap(), (0x04f9, 0x2028));
        assert_eq!(parse_usb_specifier("0x04f9:0x2028").unwrap(), (0x04f9, 0x2028));
    }

    #[test]
    fn test_parse_usb_specifier_rejects_garbage() {
        assert!(parse_usb_specifier("04f9").is_err());
        assert!(parse_usb_specifier("zz:2028").is_err());
    }

    #[test]
    fn test_device_file_round_trip() {
        let path = std::env::temp_dir().join(format!("qlprint-device-{}", std::process::id()));
        std::fs::write(&path, [0x80u8; 40]).unwrap();

        let mut backend = DeviceFileBackend::new(&path).unwrap();
        let mut buf = [0u8; STATUS_SIZE];
        assert_eq!(backend.read_status(&mut buf, Duration::ZERO).unwrap(), 32);
        assert_eq!(buf, [0x80u8; STATUS_SIZE]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_device_file_short_read() {
        let path = std::env::temp_dir().join(format!("qlprint-short-{}", std::process::id()));
        std::fs::write(&path, [0x80u8; 5]).unwrap();

        let mut backend = DeviceFileBackend::new(&path).unwrap();
        let mut buf = [0u8; STATUS_SIZE];
        assert_eq!(backend.read_status(&mut buf, Duration::ZERO).unwrap(), 5);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_snmp_timeout_is_never_zero() {
        assert_eq!(snmp_timeout(Duration::ZERO), MIN_SNMP_TIMEOUT);
        assert_eq!(snmp_timeout(Duration::from_secs(10)), Duration::from_secs(10));
    }

    #[cfg(unix)]
    fn make_fifo(name: &str) -> std::path::PathBuf {
        use std::os::unix::ffi::OsStrExt;

        let path = std::env::temp_dir().join(format!("qlprint-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        let c_path = std::ffi::CString::new(path.as_os_str().as_bytes()).unwrap();
        assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) }, 0);
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_device_file_silent_device_times_out() {
        let path = make_fifo("silent");
        let mut backend = DeviceFileBackend::new(&path).unwrap();
        let mut buf = [0u8; STATUS_SIZE];

        let start = Instant::now();
        let n = backend
            .read_status(&mut buf, Duration::from_millis(100))
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(n, 0);
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_secs(2));

        std::fs::remove_file(&path).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_device_file_partial_frame_times_out() {
        let path = make_fifo("partial");
        let mut backend = DeviceFileBackend::new(&path).unwrap();
        let mut writer = OpenOptions::new().write(true).open(&path).unwrap();
        writer.write_all(&[0x80u8; 12]).unwrap();

        let mut buf = [0u8; STATUS_SIZE];
        let n = backend
            .read_status(&mut buf, Duration::from_millis(100))
            .unwrap();
        assert_eq!(n, 12);
        assert_eq!(&buf[..12], &[0x80u8; 12]);

        writer.write_all(&[0x80u8; STATUS_SIZE]).unwrap();
        let n = backend
            .read_status(&mut buf, Duration::from_millis(100))
            .unwrap();
        assert_eq!(n, STATUS_SIZE);

        std::fs::remove_file(&path).unwrap();
    }
}
