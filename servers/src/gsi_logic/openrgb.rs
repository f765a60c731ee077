//! # OpenRGB SDK client
//!
//! Speaks the OpenRGB network protocol (protocol version 0) over TCP. Only
//! what the bridge needs is implemented: announce a client name, enumerate
//! controllers, switch controllers that offer a "Direct" mode into custom
//! mode, and paint every LED of every controller one color.
//!
//! Every packet starts with a 16-byte header: the magic `ORGB`, then the
//! device index, packet id and payload size as little-endian `u32`s.

use async_trait::async_trait;
use bytes::{Buf, BufMut, BytesMut};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::gsi_logic::config::OpenRgbSettings;
use crate::gsi_logic::error::GsiError;
use crate::gsi_logic::model::Rgb;
use crate::gsi_logic::output::LightingDriver;

pub const MAGIC: &[u8; 4] = b"ORGB";
pub const HEADER_LEN: usize = 16;
const MAX_PAYLOAD: u32 = 16 * 1024 * 1024;

pub mod packet {
    pub const REQUEST_CONTROLLER_COUNT: u32 = 0;
    pub const REQUEST_CONTROLLER_DATA: u32 = 1;
    pub const SET_CLIENT_NAME: u32 = 50;
    pub const DEVICE_LIST_UPDATED: u32 = 100;
    pub const UPDATE_LEDS: u32 = 1050;
    pub const SET_CUSTOM_MODE: u32 = 1100;
}

#[derive(Debug, Error)]
pub enum OpenRgbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out after {0:?} waiting for the OpenRGB server")]
    Timeout(Duration),

    #[error("Bad packet magic {0:?}")]
    BadMagic([u8; 4]),

    #[error("Truncated {what}: need {need} bytes, {have} left")]
    Truncated {
        what: &'static str,
        need: usize,
        have: usize,
    },

    #[error("Packet payload of {0} bytes exceeds limit")]
    Oversized(u32),

    #[error("Not connected to the OpenRGB server")]
    NotConnected,
}

impl OpenRgbError {
    /// Errors after which the connection must be reopened. A bad header
    /// means the stream is out of sync.
    fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            OpenRgbError::Io(_)
                | OpenRgbError::Timeout(_)
                | OpenRgbError::NotConnected
                | OpenRgbError::BadMagic(_)
                | OpenRgbError::Oversized(_)
        )
    }
}

impl From<OpenRgbError> for GsiError {
    fn from(e: OpenRgbError) -> Self {
        GsiError::DeviceFault(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub device: u32,
    pub packet_id: u32,
    pub size: u32,
}

impl PacketHeader {
    pub fn decode(raw: &[u8; HEADER_LEN]) -> Result<Self, OpenRgbError> {
        let mut buf = &raw[..];
        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if &magic != MAGIC {
            return Err(OpenRgbError::BadMagic(magic));
        }
        Ok(PacketHeader {
            device: buf.get_u32_le(),
            packet_id: buf.get_u32_le(),
            size: buf.get_u32_le(),
        })
    }
}

pub fn encode_packet(device: u32, packet_id: u32, payload: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_slice(MAGIC);
    buf.put_u32_le(device);
    buf.put_u32_le(packet_id);
    buf.put_u32_le(payload.len() as u32);
    buf.put_slice(payload);
    buf
}

/// Payload of `UPDATE_LEDS`: total size, LED count, then one `r g b 0`
/// quadruple per LED.
pub fn encode_update_leds(color: Rgb, led_count: u16) -> BytesMut {
    let data_size = 4 + 2 + 4 * led_count as usize;
    let mut buf = BytesMut::with_capacity(data_size);
    buf.put_u32_le(data_size as u32);
    buf.put_u16_le(led_count);
    for _ in 0..led_count {
        buf.put_slice(&[color.r, color.g, color.b, 0]);
    }
    buf
}

/// What the bridge needs to know about one controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerInfo {
    pub name: String,
    pub modes: Vec<String>,
    pub led_count: u16,
}

impl ControllerInfo {
    pub fn has_direct_mode(&self) -> bool {
        self.modes.iter().any(|m| m.eq_ignore_ascii_case("direct"))
    }
}

/// Bounds-checked little-endian reader over a controller description.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn need(&self, n: usize, what: &'static str) -> Result<(), OpenRgbError> {
        if self.buf.remaining() < n {
            return Err(OpenRgbError::Truncated {
                what,
                need: n,
                have: self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, OpenRgbError> {
        self.need(2, what)?;
        Ok(self.buf.get_u16_le())
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, OpenRgbError> {
        self.need(4, what)?;
        Ok(self.buf.get_u32_le())
    }

    fn skip(&mut self, n: usize, what: &'static str) -> Result<(), OpenRgbError> {
        self.need(n, what)?;
        self.buf.advance(n);
        Ok(())
    }

    /// `u16` length (including the trailing NUL) followed by the bytes.
    fn string(&mut self, what: &'static str) -> Result<String, OpenRgbError> {
        let len = self.u16(what)? as usize;
        self.need(len, what)?;
        let raw = &self.buf[..len];
        let text = String::from_utf8_lossy(raw.strip_suffix(&[0]).unwrap_or(raw)).into_owned();
        self.buf.advance(len);
        Ok(text)
    }
}

/// Parses a `REQUEST_CONTROLLER_DATA` reply (protocol version 0).
pub fn parse_controller_data(data: &[u8]) -> Result<ControllerInfo, OpenRgbError> {
    let mut r = Reader { buf: data };

    r.u32("data size")?;
    r.u32("device type")?;
    let name = r.string("name")?;
    r.string("description")?;
    r.string("version")?;
    r.string("serial")?;
    r.string("location")?;

    let num_modes = r.u16("mode count")?;
    r.u32("active mode")?;
    let mut modes = Vec::with_capacity(num_modes as usize);
    for _ in 0..num_modes {
        modes.push(r.string("mode name")?);
        // value, flags, speed min/max, colors min/max, speed, direction, color mode
        r.skip(9 * 4, "mode body")?;
        let colors = r.u16("mode color count")? as usize;
        r.skip(colors * 4, "mode colors")?;
    }

    let num_zones = r.u16("zone count")?;
    for _ in 0..num_zones {
        r.string("zone name")?;
        // type, leds min, leds max, leds count
        r.skip(4 * 4, "zone body")?;
        let matrix_len = r.u16("zone matrix length")? as usize;
        r.skip(matrix_len, "zone matrix")?;
    }

    let led_count = r.u16("led count")?;
    for _ in 0..led_count {
        r.string("led name")?;
        r.u32("led value")?;
    }

    let colors = r.u16("color count")? as usize;
    r.skip(colors * 4, "colors")?;

    Ok(ControllerInfo {
        name,
        modes,
        led_count,
    })
}

#[derive(Debug)]
struct Controller {
    index: u32,
    info: ControllerInfo,
    custom_mode_set: bool,
}

async fn write_packet(
    stream: &mut TcpStream,
    limit: Duration,
    packet: &[u8],
) -> Result<(), OpenRgbError> {
    timeout(limit, stream.write_all(packet))
        .await
        .map_err(|_| OpenRgbError::Timeout(limit))??;
    Ok(())
}

/// Reads packets until one with `expected` id arrives; unsolicited packets
/// such as device-list notifications are skipped.
async fn read_reply(
    stream: &mut TcpStream,
    limit: Duration,
    expected: u32,
) -> Result<Vec<u8>, OpenRgbError> {
    loop {
        let mut raw = [0u8; HEADER_LEN];
        timeout(limit, stream.read_exact(&mut raw))
            .await
            .map_err(|_| OpenRgbError::Timeout(limit))??;
        let header = PacketHeader::decode(&raw)?;
        if header.size > MAX_PAYLOAD {
            return Err(OpenRgbError::Oversized(header.size));
        }

        let mut payload = vec![0u8; header.size as usize];
        timeout(limit, stream.read_exact(&mut payload))
            .await
            .map_err(|_| OpenRgbError::Timeout(limit))??;

        if header.packet_id == expected {
            return Ok(payload);
        }
        debug!(packet_id = header.packet_id, "Skipping unsolicited OpenRGB packet");
    }
}

pub struct OpenRgbClient {
    settings: OpenRgbSettings,
    stream: Option<TcpStream>,
    controllers: Vec<Controller>,
    /// Bytes the server pushed unasked, kept until a whole packet is in.
    inbound: BytesMut,
}

impl OpenRgbClient {
    /// Connects, announces the client name and enumerates controllers.
    pub async fn connect(settings: OpenRgbSettings) -> Result<Self, OpenRgbError> {
        let mut client = OpenRgbClient {
            settings,
            stream: None,
            controllers: Vec::new(),
            inbound: BytesMut::new(),
        };
        client.open().await?;
        Ok(client)
    }

    async fn open(&mut self) -> Result<(), OpenRgbError> {
        let limit = self.settings.timeout;
        let addr = (self.settings.host.as_str(), self.settings.port);
        let mut stream = timeout(limit, TcpStream::connect(addr))
            .await
            .map_err(|_| OpenRgbError::Timeout(limit))??;
        stream.set_nodelay(true)?;

        let mut name = self.settings.client_name.clone().into_bytes();
        name.push(0);
        write_packet(&mut stream, limit, &encode_packet(0, packet::SET_CLIENT_NAME, &name)).await?;

        write_packet(&mut stream, limit, &encode_packet(0, packet::REQUEST_CONTROLLER_COUNT, &[]))
            .await?;
        let reply = read_reply(&mut stream, limit, packet::REQUEST_CONTROLLER_COUNT).await?;
        let count = Reader { buf: &reply }.u32("controller count")?;

        let mut controllers = Vec::with_capacity(count as usize);
        for index in 0..count {
            write_packet(
                &mut stream,
                limit,
                &encode_packet(index, packet::REQUEST_CONTROLLER_DATA, &[]),
            )
            .await?;
            let data = read_reply(&mut stream, limit, packet::REQUEST_CONTROLLER_DATA).await?;
            let info = parse_controller_data(&data)?;
            debug!(index, name = %info.name, leds = info.led_count, modes = ?info.modes, "OpenRGB controller");
            controllers.push(Controller {
                index,
                info,
                custom_mode_set: false,
            });
        }

        info!(
            host = %self.settings.host,
            port = self.settings.port,
            controllers = controllers.len(),
            "Connected to OpenRGB"
        );
        self.stream = Some(stream);
        self.controllers = controllers;
        self.inbound.clear();
        Ok(())
    }

    async fn reopen(&mut self) -> Result<(), OpenRgbError> {
        self.stream = None;
        self.open().await
    }

    /// Reads whatever the server pushed since the last call without waiting.
    /// Returns true when a device-list notification was among it.
    fn drain_notifications(&mut self) -> Result<bool, OpenRgbError> {
        let stream = self.stream.as_ref().ok_or(OpenRgbError::NotConnected)?;
        let mut chunk = [0u8; 512];
        loop {
            match stream.try_read(&mut chunk) {
                Ok(0) => return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into()),
                Ok(n) => self.inbound.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }

        let mut list_changed = false;
        while self.inbound.len() >= HEADER_LEN {
            let mut raw = [0u8; HEADER_LEN];
            raw.copy_from_slice(&self.inbound[..HEADER_LEN]);
            let header = PacketHeader::decode(&raw)?;
            if header.size > MAX_PAYLOAD {
                return Err(OpenRgbError::Oversized(header.size));
            }
            let total = HEADER_LEN + header.size as usize;
            if self.inbound.len() < total {
                break;
            }
            self.inbound.advance(total);

            if header.packet_id == packet::DEVICE_LIST_UPDATED {
                list_changed = true;
            } else {
                debug!(packet_id = header.packet_id, "Skipping unsolicited OpenRGB packet");
            }
        }
        Ok(list_changed)
    }

    pub fn controllers(&self) -> impl Iterator<Item = &ControllerInfo> {
        self.controllers.iter().map(|c| &c.info)
    }

    async fn paint(&mut self, color: Rgb) -> Result<(), OpenRgbError> {
        let limit = self.settings.timeout;
        let stream = self.stream.as_mut().ok_or(OpenRgbError::NotConnected)?;

        for controller in self.controllers.iter_mut() {
            if controller.info.has_direct_mode() && !controller.custom_mode_set {
                write_packet(
                    stream,
                    limit,
                    &encode_packet(controller.index, packet::SET_CUSTOM_MODE, &[]),
                )
                .await?;
                controller.custom_mode_set = true;
            }
            if controller.info.led_count == 0 {
                continue;
            }
            let leds = encode_update_leds(color, controller.info.led_count);
            write_packet(
                stream,
                limit,
                &encode_packet(controller.index, packet::UPDATE_LEDS, &leds),
            )
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl LightingDriver for OpenRgbClient {
    /// Re-enumerates first when the server announced a device-list change.
    /// At most one reconnect per call.
    async fn set_all(&mut self, color: Rgb) -> Result<(), GsiError> {
        let mut reopened = false;
        match self.drain_notifications() {
            Ok(false) => {}
            Ok(true) => {
                info!("OpenRGB device list changed, re-enumerating");
                self.reopen().await?;
                reopened = true;
            }
            Err(e) => {
                warn!(error = %e, "OpenRGB connection lost, reconnecting");
                self.reopen().await?;
                reopened = true;
            }
        }

        match self.paint(color).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_connection_lost() && !reopened => {
                warn!(error = %e, "OpenRGB connection lost, reconnecting");
                self.reopen().await?;
                self.paint(color).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn device_names(&self) -> Vec<String> {
        self.controllers().map(|c| c.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    fn put_string(buf: &mut BytesMut, s: &str) {
        buf.put_u16_le(s.len() as u16 + 1);
        buf.put_slice(s.as_bytes());
        buf.put_u8(0);
    }

    /// Protocol-0 description of a keyboard-like controller with one matrix zone.
    fn controller_fixture(name: &str, modes: &[&str], leds: u16) -> Vec<u8> {
        let mut body = BytesMut::new();
        body.put_i32_le(5);
        put_string(&mut body, name);
        put_string(&mut body, "Test device");
        put_string(&mut body, "1.0");
        put_string(&mut body, "SN-1");
        put_string(&mut body, "HID: /dev/hidraw0");

        body.put_u16_le(modes.len() as u16);
        body.put_i32_le(0);
        for (i, mode) in modes.iter().enumerate() {
            put_string(&mut body, mode);
            for _ in 0..9 {
                body.put_u32_le(i as u32);
            }
            body.put_u16_le(2);
            body.put_u32_le(0x00ff_00ff);
            body.put_u32_le(0x0000_ff00);
        }

        body.put_u16_le(1);
        put_string(&mut body, "Keys");
        body.put_i32_le(2);
        body.put_u32_le(leds as u32);
        body.put_u32_le(leds as u32);
        body.put_u32_le(leds as u32);
        // 1x2 matrix: height, width, two entries
        body.put_u16_le(16);
        body.put_u32_le(1);
        body.put_u32_le(2);
        body.put_u32_le(0);
        body.put_u32_le(1);

        body.put_u16_le(leds);
        for i in 0..leds {
            put_string(&mut body, &format!("Key {}", i));
            body.put_u32_le(i as u32);
        }
        body.put_u16_le(leds);
        for _ in 0..leds {
            body.put_u32_le(0);
        }

        let mut data = BytesMut::new();
        data.put_u32_le(body.len() as u32 + 4);
        data.put_slice(&body);
        data.to_vec()
    }

    #[test]
    fn test_header_layout() {
        let packet = encode_packet(3, packet::UPDATE_LEDS, &[1, 2, 3]);
        assert_eq!(&packet[..4], b"ORGB");
        let mut raw = [0u8; HEADER_LEN];
        raw.copy_from_slice(&packet[..HEADER_LEN]);
        assert_eq!(
            PacketHeader::decode(&raw).unwrap(),
            PacketHeader { device: 3, packet_id: 1050, size: 3 }
        );
        assert_eq!(&packet[HEADER_LEN..], &[1, 2, 3]);
    }

    #[test]
    fn test_bad_magic() {
        let mut raw = [0u8; HEADER_LEN];
        raw[..4].copy_from_slice(b"HTTP");
        assert!(matches!(PacketHeader::decode(&raw), Err(OpenRgbError::BadMagic(_))));
    }

    #[test]
    fn test_update_leds_payload() {
        let payload = encode_update_leds(Rgb::new(145, 200, 66), 2);
        assert_eq!(
            payload.to_vec(),
            vec![14, 0, 0, 0, 2, 0, 145, 200, 66, 0, 145, 200, 66, 0]
        );
    }

    #[test]
    fn test_parse_controller_data() {
        let data = controller_fixture("Keyboard", &["Static", "Direct"], 3);
        let info = parse_controller_data(&data).unwrap();
        assert_eq!(info.name, "Keyboard");
        assert_eq!(info.modes, vec!["Static".to_string(), "Direct".to_string()]);
        assert_eq!(info.led_count, 3);
        assert!(info.has_direct_mode());

        let no_direct = parse_controller_data(&controller_fixture("Fan", &["Breathing"], 1)).unwrap();
        assert!(!no_direct.has_direct_mode());
    }

    #[test]
    fn test_truncated_controller_data() {
        let data = controller_fixture("Keyboard", &["Direct"], 3);
        for cut in [0, 10, data.len() / 2, data.len() - 1] {
            let result = parse_controller_data(&data[..cut]);
            assert!(matches!(result, Err(OpenRgbError::Truncated { .. })), "cut at {cut}");
        }
    }

    async fn read_packet(stream: &mut TcpStream) -> Option<(PacketHeader, Vec<u8>)> {
        let mut raw = [0u8; HEADER_LEN];
        stream.read_exact(&mut raw).await.ok()?;
        let header = PacketHeader::decode(&raw).ok()?;
        let mut payload = vec![0u8; header.size as usize];
        stream.read_exact(&mut payload).await.ok()?;
        Some((header, payload))
    }

    type Seen = (usize, PacketHeader, Vec<u8>);

    /// Serves one connection per entry of `connections`, in order, each with
    /// its own controller list. With `announce_change`, the first connection
    /// pushes a device-list notification right after enumeration.
    async fn spawn_fake_server(
        connections: Vec<Vec<Vec<u8>>>,
        announce_change: bool,
    ) -> (u16, mpsc::UnboundedReceiver<Seen>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (seen_tx, seen_rx) = mpsc::unbounded_channel::<Seen>();

        tokio::spawn(async move {
            for (conn, fixtures) in connections.into_iter().enumerate() {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                while let Some((header, payload)) = read_packet(&mut stream).await {
                    match header.packet_id {
                        packet::REQUEST_CONTROLLER_COUNT => {
                            stream
                                .write_all(&encode_packet(0, packet::DEVICE_LIST_UPDATED, &[]))
                                .await
                                .unwrap();
                            let count = (fixtures.len() as u32).to_le_bytes();
                            stream
                                .write_all(&encode_packet(0, packet::REQUEST_CONTROLLER_COUNT, &count))
                                .await
                                .unwrap();
                        }
                        packet::REQUEST_CONTROLLER_DATA => {
                            let data = &fixtures[header.device as usize];
                            stream
                                .write_all(&encode_packet(header.device, packet::REQUEST_CONTROLLER_DATA, data))
                                .await
                                .unwrap();
                            let last = header.device as usize + 1 == fixtures.len();
                            if announce_change && conn == 0 && last {
                                stream
                                    .write_all(&encode_packet(0, packet::DEVICE_LIST_UPDATED, &[]))
                                    .await
                                    .unwrap();
                            }
                        }
                        _ => {
                            let _ = seen_tx.send((conn, header, payload));
                        }
                    }
                }
            }
        });

        (port, seen_rx)
    }

    fn test_settings(port: u16) -> OpenRgbSettings {
        OpenRgbSettings {
            host: "127.0.0.1".to_string(),
            port,
            client_name: "bridge-test".to_string(),
            timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn test_client_against_fake_server() {
        let fixtures = vec![
            controller_fixture("Keyboard", &["Static", "Direct"], 2),
            controller_fixture("Fan", &["Rainbow"], 1),
        ];
        let (port, mut seen_rx) = spawn_fake_server(vec![fixtures], false).await;

        let mut client = OpenRgbClient::connect(test_settings(port)).await.unwrap();
        assert_eq!(client.device_names(), vec!["Keyboard".to_string(), "Fan".to_string()]);

        client.set_all(Rgb::new(0, 224, 245)).await.unwrap();
        client.set_all(Rgb::new(255, 0, 255)).await.unwrap();

        let (_, name, payload) = seen_rx.recv().await.unwrap();
        assert_eq!(name.packet_id, packet::SET_CLIENT_NAME);
        assert_eq!(payload, b"bridge-test\0".to_vec());

        let mut rest = Vec::new();
        for _ in 0..5 {
            let (_, header, payload) = seen_rx.recv().await.unwrap();
            rest.push((header.device, header.packet_id, payload));
        }
        assert_eq!(
            rest,
            vec![
                (0, packet::SET_CUSTOM_MODE, vec![]),
                (0, packet::UPDATE_LEDS, encode_update_leds(Rgb::new(0, 224, 245), 2).to_vec()),
                (1, packet::UPDATE_LEDS, encode_update_leds(Rgb::new(0, 224, 245), 1).to_vec()),
                (0, packet::UPDATE_LEDS, encode_update_leds(Rgb::new(255, 0, 255), 2).to_vec()),
                (1, packet::UPDATE_LEDS, encode_update_leds(Rgb::new(255, 0, 255), 1).to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn test_device_list_change_triggers_reenumeration() {
        let before = vec![
            controller_fixture("Keyboard", &["Direct"], 2),
            controller_fixture("Fan", &["Rainbow"], 1),
        ];
        let after = vec![controller_fixture("Fan", &["Rainbow"], 1)];
        let (port, mut seen_rx) = spawn_fake_server(vec![before, after], true).await;

        let mut client = OpenRgbClient::connect(test_settings(port)).await.unwrap();
        assert_eq!(client.device_names().len(), 2);

        // let the pushed notification land in the socket
        tokio::time::sleep(Duration::from_millis(100)).await;
        client.set_all(Rgb::new(255, 0, 0)).await.unwrap();
        assert_eq!(client.device_names(), vec!["Fan".to_string()]);

        let mut seen = Vec::new();
        for _ in 0..3 {
            let (conn, header, payload) = seen_rx.recv().await.unwrap();
            seen.push((conn, header.device, header.packet_id, payload));
        }
        assert_eq!(
            seen,
            vec![
                (0, 0, packet::SET_CLIENT_NAME, b"bridge-test\0".to_vec()),
                (1, 0, packet::SET_CLIENT_NAME, b"bridge-test\0".to_vec()),
                (1, 0, packet::UPDATE_LEDS, encode_update_leds(Rgb::new(255, 0, 0), 1).to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn test_connect_refused_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let settings = OpenRgbSettings {
            host: "127.0.0.1".to_string(),
            port,
            client_name: "bridge-test".to_string(),
            timeout: Duration::from_millis(500),
        };
        assert!(OpenRgbClient::connect(settings).await.is_err());
    }
}
