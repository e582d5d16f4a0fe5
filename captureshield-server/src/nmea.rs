//! Location from NMEA 0183 over UDP.
//!
//! GPS receivers and navigation gateways commonly broadcast NMEA sentences
//! on a UDP port. [`NmeaReceiver`] listens on that port and turns GGA and RMC
//! sentences into positions stamped with their time of arrival.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut gps = LocationBackend::nmea("0.0.0.0:10110".parse()?);
//! let watch = gps.watch_start()?;
//!
//! // In your main loop:
//! while let Some(sample) = gps.watch_poll(&watch) {
//!     handle(sample);
//! }
//! ```

use std::collections::VecDeque;
use std::io::{self, ErrorKind};
use std::net::SocketAddr;

use nmea_parser::gnss::GgaQualityIndicator;
use nmea_parser::{NmeaParser, ParsedMessage};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use captureshield_core::{
    LatLon, LocationError, LocationProvider, PermissionState, Position, WatchId,
};

use crate::now_ms;

/// Rough conversion of horizontal dilution of precision to meters
const HDOP_TO_METERS: f64 = 5.0;

const MAX_DATAGRAM: usize = 2048;

/// The server's location capability
pub enum LocationBackend {
    Nmea(NmeaReceiver),
    /// No location source configured
    Unavailable,
}

impl LocationBackend {
    pub fn nmea(addr: SocketAddr) -> Self {
        LocationBackend::Nmea(NmeaReceiver::new(addr))
    }
}

impl LocationProvider for LocationBackend {
    fn is_supported(&self) -> bool {
        matches!(self, LocationBackend::Nmea(_))
    }

    fn permission_state(&mut self) -> PermissionState {
        match self {
            // Nobody needs to consent to a UDP feed
            LocationBackend::Nmea(_) => PermissionState::Granted,
            LocationBackend::Unavailable => PermissionState::Prompt,
        }
    }

    fn request_permission(&mut self) -> Result<PermissionState, LocationError> {
        match self {
            LocationBackend::Nmea(_) => Ok(PermissionState::Granted),
            LocationBackend::Unavailable => Err(LocationError::Unavailable),
        }
    }

    fn watch_start(&mut self) -> Result<WatchId, LocationError> {
        match self {
            LocationBackend::Nmea(receiver) => receiver.start(),
            LocationBackend::Unavailable => Err(LocationError::Unavailable),
        }
    }

    fn watch_poll(&mut self, watch: &WatchId) -> Option<Result<Position, LocationError>> {
        match self {
            LocationBackend::Nmea(receiver) => receiver.poll(watch),
            LocationBackend::Unavailable => None,
        }
    }

    fn watch_stop(&mut self, watch: WatchId) {
        if let LocationBackend::Nmea(receiver) = self {
            receiver.stop(watch);
        }
    }
}

pub struct NmeaReceiver {
    addr: SocketAddr,
    socket: Option<UdpSocket>,
    watch: Option<WatchId>,
    next_watch: u32,
    parser: NmeaParser,
    pending: VecDeque<Result<Position, LocationError>>,
    buf: Vec<u8>,
}

impl NmeaReceiver {
    pub fn new(addr: SocketAddr) -> Self {
        NmeaReceiver {
            addr,
            socket: None,
            watch: None,
            next_watch: 1,
            parser: NmeaParser::new(),
            pending: VecDeque::new(),
            buf: vec![0u8; MAX_DATAGRAM],
        }
    }

    /// Bound address while watching
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// A port that cannot be bound leaves the receiver without any source,
    /// so it reports `Unavailable` rather than a transient failure.
    fn start(&mut self) -> Result<WatchId, LocationError> {
        if self.socket.is_none() {
            let socket = bind(self.addr).map_err(|e| {
                log::error!("Cannot listen for NMEA on {}: {}", self.addr, e);
                LocationError::Unavailable
            })?;
            log::info!("Listening for NMEA on {}", self.addr);
            self.socket = Some(socket);
        }

        let watch = WatchId(self.next_watch);
        self.next_watch += 1;
        self.watch = Some(watch);
        Ok(watch)
    }

    fn poll(&mut self, watch: &WatchId) -> Option<Result<Position, LocationError>> {
        if self.watch != Some(*watch) {
            return None;
        }
        if self.pending.is_empty() {
            self.receive();
        }
        self.pending.pop_front()
    }

    fn stop(&mut self, watch: WatchId) {
        if self.watch == Some(watch) {
            self.watch = None;
            self.socket = None;
            self.pending.clear();
        }
    }

    fn receive(&mut self) {
        let Some(socket) = &self.socket else {
            return;
        };

        loop {
            match socket.try_recv_from(&mut self.buf) {
                Ok((len, from)) => {
                    let now = now_ms();
                    let text = String::from_utf8_lossy(&self.buf[..len]);
                    log::trace!("{}: {:?}", from, text);
                    for line in text.lines() {
                        if let Some(sample) = parse_sentence(&mut self.parser, line.trim(), now) {
                            self.pending.push_back(sample);
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    log::warn!("NMEA receive error: {}", e);
                    self.pending
                        .push_back(Err(LocationError::PositionUnavailable(e.to_string())));
                    break;
                }
            }
        }
    }
}

fn bind(addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_nonblocking(true)?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

/// Turn one sentence into a location sample.
///
/// Sentences other than GGA and RMC yield `None`, as do malformed ones.
pub fn parse_sentence(
    parser: &mut NmeaParser,
    line: &str,
    now_ms: u64,
) -> Option<Result<Position, LocationError>> {
    if !line.starts_with('$') {
        return None;
    }

    let fix = match parser.parse_sentence(line) {
        Ok(ParsedMessage::Gga(gga)) => {
            if matches!(gga.quality, GgaQualityIndicator::Invalid) {
                None
            } else {
                gga.latitude.zip(gga.longitude).map(|(lat, lon)| (lat, lon, gga.hdop))
            }
        }
        Ok(ParsedMessage::Rmc(rmc)) => {
            if rmc.status_active == Some(true) {
                rmc.latitude.zip(rmc.longitude).map(|(lat, lon)| (lat, lon, None))
            } else {
                None
            }
        }
        Ok(_) => return None,
        Err(e) => {
            log::debug!("Ignoring sentence '{}': {:?}", line, e);
            return None;
        }
    };

    let Some((lat, lon, hdop)) = fix else {
        return Some(Err(LocationError::PositionUnavailable(
            "receiver has no fix".to_string(),
        )));
    };
    let coords = match LatLon::checked(lat, lon) {
        Ok(coords) => coords,
        Err(e) => {
            log::debug!("Ignoring sentence '{}': {}", line, e);
            return None;
        }
    };

    let position = Position::new(coords.latitude, coords.longitude, now_ms);
    Some(Ok(match hdop {
        Some(hdop) => position.with_accuracy(hdop * HDOP_TO_METERS),
        None => position,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";
    const GGA_NO_FIX: &str = "$GPGGA,123519,,,,,0,00,,,M,,M,,*6B";
    const RMC_VOID: &str = "$GPRMC,123519,V,,,,,,,230394,,*33";
    const GGA_LAB: &str = "$GPGGA,123520,3747.088,N,12225.734,W,1,09,1.2,10.0,M,-25.0,M,,*47";

    fn parse(line: &str) -> Option<Result<Position, LocationError>> {
        parse_sentence(&mut NmeaParser::new(), line, 1_000)
    }

    #[test]
    fn test_gga_fix() {
        let position = parse(GGA).unwrap().unwrap();
        assert!((position.latitude - 48.1173).abs() < 1e-6);
        assert!((position.longitude - 11.516_666_7).abs() < 1e-6);
        assert_eq!(position.timestamp, 1_000);
        assert!((position.accuracy.unwrap() - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_rmc_fix() {
        let position = parse(RMC).unwrap().unwrap();
        assert!((position.latitude - 48.1173).abs() < 1e-6);
        assert_eq!(position.accuracy, None);
    }

    #[test]
    fn test_sentences_without_fix_are_errors() {
        assert!(matches!(
            parse(GGA_NO_FIX),
            Some(Err(LocationError::PositionUnavailable(_)))
        ));
        assert!(matches!(
            parse(RMC_VOID),
            Some(Err(LocationError::PositionUnavailable(_)))
        ));
    }

    #[test]
    fn test_other_input_is_ignored() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("hello"), None);
        assert_eq!(parse("!AIVDM,1,1,,A,13u?etPv2;0n:dDPwUM1U1Cb069D,0*24"), None);
        // Corrupted checksum
        assert_eq!(
            parse("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*00"),
            None
        );
    }

    #[test]
    fn test_unavailable_backend() {
        let mut backend = LocationBackend::Unavailable;
        assert!(!backend.is_supported());
        assert_eq!(backend.watch_start(), Err(LocationError::Unavailable));
        assert_eq!(backend.watch_poll(&WatchId(1)), None);
    }

    #[tokio::test]
    async fn test_port_in_use_is_unavailable() {
        let occupied = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut backend = LocationBackend::nmea(occupied.local_addr().unwrap());

        assert_eq!(backend.watch_start(), Err(LocationError::Unavailable));
        assert_eq!(backend.watch_poll(&WatchId(1)), None);
    }

    #[tokio::test]
    async fn test_receives_fixes_over_udp() {
        let mut backend = LocationBackend::nmea("127.0.0.1:0".parse().unwrap());
        let watch = backend.watch_start().unwrap();
        let LocationBackend::Nmea(receiver) = &backend else {
            panic!("expected an NMEA backend");
        };
        let target = receiver.local_addr().unwrap();

        let sender = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let datagram = format!("{}\r\nnot nmea\r\n{}\r\n", GGA_LAB, RMC_VOID);
        sender.send_to(datagram.as_bytes(), target).unwrap();

        let mut samples = Vec::new();
        for _ in 0..100 {
            while let Some(sample) = backend.watch_poll(&watch) {
                samples.push(sample);
            }
            if samples.len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(samples.len(), 2);
        let position = samples[0].as_ref().unwrap();
        assert!((position.latitude - 37.7848).abs() < 1e-6);
        assert!((position.longitude + 122.4289).abs() < 1e-6);
        assert!(samples[1].is_err());

        backend.watch_stop(watch);
        assert_eq!(backend.watch_poll(&watch), None);
    }
}
