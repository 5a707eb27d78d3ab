use std::io::{BufRead, BufReader, Write};
use std::time::Duration;

use crate::error::SerialError;
use crate::link::{RxLink, SerialLink, SplittableLink, TxLink};

/// A [`SerialLink`] backed by a real UART via the `serialport` crate.
pub struct SerialPortLink {
    reader: BufReader<Box<dyn serialport::SerialPort>>,
    writer: Box<dyn serialport::SerialPort>,
}

impl SerialPortLink {
    /// Opens `path` (e.g. `/dev/ttyUSB0`) at `baud_rate` with a generous
    /// default port timeout; per-call deadlines in [`SerialLink::read_line`]
    /// are still enforced on top via repeated short reads.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, SerialError> {
        let port = serialport::new(path, baud_rate)
            .timeout(Duration::from_millis(50))
            .open()
            .map_err(|e| SerialError::Io(std::io::Error::other(e)))?;
        let writer = port.try_clone().map_err(SerialError::Io)?;
        Ok(Self { reader: BufReader::new(port), writer })
    }
}

impl SerialLink for SerialPortLink {
    fn write_line(&mut self, line: &str) -> Result<(), SerialError> {
        write_line_to(&mut self.writer, line)
    }

    fn read_line(&mut self, timeout: Duration) -> Result<String, SerialError> {
        read_line_from(&mut self.reader, timeout)
    }
}

impl SplittableLink for SerialPortLink {
    type Rx = SerialPortRx;
    type Tx = SerialPortTx;

    fn split(self) -> Result<(Self::Rx, Self::Tx), SerialError> {
        Ok((SerialPortRx { reader: self.reader }, SerialPortTx { writer: self.writer }))
    }
}

pub struct SerialPortRx {
    reader: BufReader<Box<dyn serialport::SerialPort>>,
}

impl RxLink for SerialPortRx {
    fn read_line(&mut self, timeout: Duration) -> Result<String, SerialError> {
        read_line_from(&mut self.reader, timeout)
    }
}

pub struct SerialPortTx {
    writer: Box<dyn serialport::SerialPort>,
}

impl TxLink for SerialPortTx {
    fn write_line(&mut self, line: &str) -> Result<(), SerialError> {
        write_line_to(&mut self.writer, line)
    }
}

fn write_line_to(writer: &mut Box<dyn serialport::SerialPort>, line: &str) -> Result<(), SerialError> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn read_line_from(
    reader: &mut BufReader<Box<dyn serialport::SerialPort>>,
    timeout: Duration,
) -> Result<String, SerialError> {
    let deadline = std::time::Instant::now() + timeout;
    let mut buf = String::new();
    loop {
        buf.clear();
        match reader.read_line(&mut buf) {
            Ok(0) => return Err(SerialError::Timeout),
            Ok(_) => {
                let trimmed = buf.trim_end_matches(['\r', '\n']);
                if !trimmed.is_empty() {
                    return Ok(trimmed.to_string());
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                if std::time::Instant::now() >= deadline {
                    return Err(SerialError::Timeout);
                }
            }
            Err(e) => return Err(SerialError::Io(e)),
        }
        if std::time::Instant::now() >= deadline {
            return Err(SerialError::Timeout);
        }
    }
}
