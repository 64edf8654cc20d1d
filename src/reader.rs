use bytes::BytesMut;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_serial::SerialPortBuilderExt;
use tokio_util::codec::{Decoder, Framed};
use tracing::{info, warn};

use crate::settings::SerialSettings;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },
    #[error("Serial read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Line terminator emitted by the sensor node. The reference firmware ends
/// every line with a bare carriage return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTerminator {
    #[default]
    Cr,
    Lf,
    CrLf,
}

impl LineTerminator {
    fn split_byte(self) -> u8 {
        match self {
            LineTerminator::Cr => b'\r',
            LineTerminator::Lf | LineTerminator::CrLf => b'\n',
        }
    }
}

/// Splits the raw byte stream into terminator-stripped text lines.
///
/// Invalid UTF-8 is replaced, never dropped, so garbled boot output still
/// reaches the pipeline as a system message.
pub struct LineFramer {
    terminator: LineTerminator,
}

impl LineFramer {
    pub fn new(terminator: LineTerminator) -> Self {
        Self { terminator }
    }
}

impl Decoder for LineFramer {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, std::io::Error> {
        let split = self.terminator.split_byte();
        let Some(pos) = src.iter().position(|&b| b == split) else {
            return Ok(None);
        };
        let raw = src.split_to(pos + 1);
        let mut end = pos;
        if self.terminator == LineTerminator::CrLf && end > 0 && raw[end - 1] == b'\r' {
            end -= 1;
        }
        Ok(Some(String::from_utf8_lossy(&raw[..end]).into_owned()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, std::io::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        // Flush an unterminated trailing line when the stream ends.
        let raw = src.split_to(src.len());
        Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
    }
}

/// Open the configured serial port and forward each decoded line into the
/// pipeline channel. Runs until the channel closes.
pub async fn start_reader(
    settings: &SerialSettings,
    tx: mpsc::Sender<String>,
) -> Result<(), ReaderError> {
    let stream = tokio_serial::new(&settings.port, settings.baud)
        .open_native_async()
        .map_err(|source| ReaderError::Open {
            port: settings.port.clone(),
            source,
        })?;
    info!("Listening on serial port {} at {} baud", settings.port, settings.baud);

    let mut lines = Framed::new(stream, LineFramer::new(settings.terminator));
    while let Some(line) = lines.next().await {
        match line {
            Ok(line) => {
                if tx.send(line).await.is_err() {
                    info!("Reader channel closed");
                    break;
                }
            }
            Err(e) => {
                warn!("Failed to read line: {}", e);
            }
        }
    }

    Ok(())
}

/// Feed lines from stdin instead of a serial device, for simulation runs
/// and end-to-end tests.
pub async fn start_stdin_reader(tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(line).await.is_err() {
                    info!("Reader channel closed");
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(framer: &mut LineFramer, buf: &mut BytesMut) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(line) = framer.decode(buf).unwrap() {
            out.push(line);
        }
        out
    }

    #[test]
    fn test_cr_terminated_lines() {
        let mut framer = LineFramer::new(LineTerminator::Cr);
        let mut buf = BytesMut::from(&b"1.0,2.0,3.0\rALERT,ALERT,ALERT\r"[..]);
        assert_eq!(
            drain(&mut framer, &mut buf),
            vec!["1.0,2.0,3.0", "ALERT,ALERT,ALERT"]
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_line_waits_for_terminator() {
        let mut framer = LineFramer::new(LineTerminator::Cr);
        let mut buf = BytesMut::from(&b"1.0,2.0"[..]);
        assert_eq!(framer.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b",3.0\r");
        assert_eq!(framer.decode(&mut buf).unwrap().unwrap(), "1.0,2.0,3.0");
    }

    #[test]
    fn test_crlf_strips_both_bytes() {
        let mut framer = LineFramer::new(LineTerminator::CrLf);
        let mut buf = BytesMut::from(&b"hello\r\nworld\r\n"[..]);
        assert_eq!(drain(&mut framer, &mut buf), vec!["hello", "world"]);
    }

    #[test]
    fn test_eof_flushes_trailing_line() {
        let mut framer = LineFramer::new(LineTerminator::Cr);
        let mut buf = BytesMut::from(&b"last line"[..]);
        assert_eq!(framer.decode_eof(&mut buf).unwrap().unwrap(), "last line");
        assert_eq!(framer.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_empty_lines_are_preserved_for_the_classifier() {
        // The framer does not filter; empty-line handling belongs to the
        // classifier.
        let mut framer = LineFramer::new(LineTerminator::Cr);
        let mut buf = BytesMut::from(&b"\r\r"[..]);
        assert_eq!(drain(&mut framer, &mut buf), vec!["", ""]);
    }
}
