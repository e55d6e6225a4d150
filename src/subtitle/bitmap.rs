// Binary closed-caption bitmap stream
use super::{Bitmap, Format, Payload, Shown};
use crate::error::{Result, SubtrackError};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

pub const SYNC_WORD: u32 = 0x414d_4c55;
pub const HEADER_LEN: usize = 27;
pub const STORE_SLOTS: usize = 100;

/// Largest bitmap a packet may declare: one full-HD frame.
pub const MAX_PIXELS: usize = 1920 * 1088;

const PTS_PER_MS: i64 = 90;
const STALE_PTS: i64 = 10 * 90_000;

const OPAQUE_WHITE: u32 = 0xffff_ffff;
const OPAQUE_BLACK: u32 = 0xff00_0000;
const OPAQUE_BLUE: u32 = 0xff00_00ff;

/// Fixed big-endian packet header:
///
/// ```text
/// sync    u32   0x414d4c55 ("AMLU")
/// type    u8    ignored
/// pts     u32   90 kHz start
/// end     u32   90 kHz absolute end, 0 when unknown
/// origin  u32   ignored (x/y)
/// width   u16
/// height  u16
/// alpha   u16   palette selector
/// length  u32   payload bytes
/// ```
///
/// The payload that follows is 2-bit RLE, top field then bottom field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub pts: u32,
    /// Absolute end PTS; 0 when the stream did not say.
    pub end_pts: u32,
    pub width: u16,
    pub height: u16,
    pub alpha: u16,
    pub payload_len: u32,
}

impl PacketHeader {
    /// Read a header from the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(SubtrackError::Truncated {
                expected: HEADER_LEN,
                available: bytes.len(),
            });
        }

        let sync = be_u32(&bytes[0..4]);
        if sync != SYNC_WORD {
            return Err(SubtrackError::malformed(
                Format::Binary,
                format!("bad sync word {:#010x}", sync),
            ));
        }

        Ok(PacketHeader {
            pts: be_u32(&bytes[5..9]),
            end_pts: be_u32(&bytes[9..13]),
            width: be_u16(&bytes[17..19]),
            height: be_u16(&bytes[19..21]),
            alpha: be_u16(&bytes[21..23]),
            payload_len: be_u32(&bytes[23..27]),
        })
    }

    /// Reject dimensions no payload of this size can describe.
    pub fn check_dimensions(&self) -> Result<()> {
        let area = self.width as usize * self.height as usize;
        if area > MAX_PIXELS {
            return Err(SubtrackError::malformed(
                Format::Binary,
                format!("{}x{} bitmap exceeds {} pixels", self.width, self.height, MAX_PIXELS),
            ));
        }
        if area > 0 && self.payload_len == 0 {
            return Err(SubtrackError::malformed(
                Format::Binary,
                format!("{}x{} bitmap without payload", self.width, self.height),
            ));
        }
        Ok(())
    }

    pub fn packet_len(&self) -> usize {
        HEADER_LEN + self.payload_len as usize
    }
}

fn be_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

fn be_u16(b: &[u8]) -> u16 {
    u16::from_be_bytes([b[0], b[1]])
}

/// A stored packet with its bitmap already decoded.
#[derive(Debug, Clone)]
pub struct Packet {
    pub header: PacketHeader,
    pub bitmap: Arc<Bitmap>,
}

impl Packet {
    pub fn decode(header: PacketHeader, payload: &[u8]) -> Result<Self> {
        header.check_dimensions()?;

        let indices = decode_rle(payload, header.width, header.height);
        let palette = palette_for(header.alpha);
        let pixels = indices.iter().map(|&i| palette[i as usize & 3]).collect();

        Ok(Packet {
            header,
            bitmap: Arc::new(Bitmap {
                width: header.width,
                height: header.height,
                pixels,
            }),
        })
    }

    fn pts(&self) -> i64 {
        self.header.pts as i64
    }
}

/// Fixed-capacity ring of packets; the oldest is dropped when full.
#[derive(Debug, Default)]
pub struct PacketStore {
    packets: VecDeque<Packet>,
    read: usize,
}

impl PacketStore {
    pub fn new() -> Self {
        Self {
            packets: VecDeque::with_capacity(STORE_SLOTS),
            read: 0,
        }
    }

    pub fn push(&mut self, packet: Packet) {
        if self.packets.len() == STORE_SLOTS {
            self.packets.pop_front();
            self.read = self.read.saturating_sub(1);
        }
        self.packets.push_back(packet);
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Packet> {
        self.packets.get(index)
    }

    pub fn read_position(&self) -> usize {
        self.read
    }

    /// Move the read position to the packet that should be on screen at
    /// `pts` and return it.
    fn seek(&mut self, pts: i64) -> Option<&Packet> {
        if self.packets.is_empty() {
            return None;
        }
        self.read = self.read.min(self.packets.len() - 1);

        while self.read + 1 < self.packets.len() {
            let here = self.packets[self.read].pts();
            let next = self.packets[self.read + 1].pts();
            if next <= pts && next != here {
                self.read += 1;
            } else {
                break;
            }
        }

        // Discontinuity: the clock went backwards past the read position.
        if self.packets[self.read].pts() > pts {
            if let Some(i) = self.packets.iter().rposition(|p| p.pts() <= pts) {
                self.read = i;
            }
        }

        self.packets.get(self.read)
    }
}

#[derive(Debug, Default)]
pub struct BitmapDecoder {
    store: PacketStore,
}

impl BitmapDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &PacketStore {
        &self.store
    }

    /// Store every complete packet in `bytes` and return how many were added.
    ///
    /// Garbage between packets is skipped up to the next sync word. A trailing
    /// partial packet is reported as [`SubtrackError::Truncated`]; packets
    /// before it are kept.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut pos = 0;
        let mut stored = 0;

        while pos < bytes.len() {
            let rest = &bytes[pos..];
            let header = match PacketHeader::parse(rest) {
                Ok(header) => header,
                Err(SubtrackError::Truncated { .. }) if !rest.starts_with(&SYNC_WORD.to_be_bytes()) => {
                    // Too short to be a header and not one either.
                    match find_sync(rest, 1) {
                        Some(skip) => {
                            warn!("Skipping {} bytes before sync word", skip);
                            pos += skip;
                            continue;
                        }
                        None => {
                            warn!("Discarding {} trailing bytes without sync word", rest.len());
                            break;
                        }
                    }
                }
                Err(e @ SubtrackError::Truncated { .. }) => {
                    warn!("Stream ends inside a packet header");
                    return Err(e);
                }
                Err(_) => match find_sync(rest, 1) {
                    Some(skip) => {
                        warn!("Bad sync word, resynchronising after {} bytes", skip);
                        pos += skip;
                        continue;
                    }
                    None => {
                        warn!("Discarding {} trailing bytes without sync word", rest.len());
                        break;
                    }
                },
            };

            let needed = header.packet_len();
            if rest.len() < needed {
                warn!(
                    "Truncated packet at pts {}: {} of {} bytes",
                    header.pts,
                    rest.len(),
                    needed
                );
                return Err(SubtrackError::Truncated {
                    expected: needed,
                    available: rest.len(),
                });
            }

            let packet = match Packet::decode(header, &rest[HEADER_LEN..needed]) {
                Ok(packet) => packet,
                Err(e) => {
                    warn!("Skipping bitmap packet at pts {}: {}", header.pts, e);
                    pos += needed;
                    continue;
                }
            };
            debug!(
                "Stored bitmap packet pts={} end={} {}x{} alpha={:#06x}",
                header.pts, header.end_pts, header.width, header.height, header.alpha
            );
            self.store.push(packet);
            stored += 1;
            pos += needed;
        }

        Ok(stored)
    }

    /// Bitmap on screen at `ms`.
    ///
    /// `None` when nothing is stored, the next packet is not due yet, or the
    /// current one is more than ten seconds old. A packet whose end has
    /// passed yields an empty placeholder.
    pub fn query(&mut self, ms: i64) -> Option<Shown> {
        let pts = ms.saturating_mul(PTS_PER_MS);
        let packet = self.store.seek(pts)?;
        let start = packet.pts();
        let end = packet.header.end_pts as i64;

        if start > pts || pts > start + STALE_PTS {
            return None;
        }
        if end == 0 {
            return Some(Shown {
                payload: Payload::Bitmap(Arc::clone(&packet.bitmap)),
                begin: start / PTS_PER_MS,
                end: (start + STALE_PTS) / PTS_PER_MS,
            });
        }
        if pts > end {
            return Some(Shown::placeholder(ms, Format::Binary.placeholder_window()));
        }

        Some(Shown {
            payload: Payload::Bitmap(Arc::clone(&packet.bitmap)),
            begin: start / PTS_PER_MS,
            end: end / PTS_PER_MS,
        })
    }
}

fn find_sync(bytes: &[u8], from: usize) -> Option<usize> {
    let sync = SYNC_WORD.to_be_bytes();
    bytes
        .get(from..)?
        .windows(sync.len())
        .position(|w| w == sync)
        .map(|i| i + from)
}

/// Palette picked by the packet's alpha mask.
pub fn palette_for(alpha: u16) -> [u32; 4] {
    let mut pal = [0u32; 4];
    match alpha {
        0x0ff0 => {
            pal[2] = OPAQUE_WHITE;
            pal[1] = OPAQUE_BLUE;
        }
        0xfff0 | 0xf0ff => {
            pal[1] = OPAQUE_WHITE;
            pal[2] = OPAQUE_BLACK;
            pal[3] = OPAQUE_BLACK;
        }
        0xf0f0 => {
            pal[1] = OPAQUE_WHITE;
            pal[3] = OPAQUE_BLACK;
        }
        0xff00 => {
            pal[2] = OPAQUE_WHITE;
            pal[3] = OPAQUE_BLACK;
        }
        0x0fe0 => {
            pal[1] = OPAQUE_WHITE;
            pal[2] = OPAQUE_BLACK;
        }
        _ => {
            pal[1] = OPAQUE_WHITE;
            pal[3] = OPAQUE_BLACK;
        }
    }
    pal
}

struct NibbleReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> NibbleReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn nibble(&mut self) -> Option<u16> {
        let byte = *self.data.get(self.pos / 2)?;
        let nibble = if self.pos % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        self.pos += 1;
        Some(nibble as u16)
    }

    fn align(&mut self) {
        self.pos += self.pos % 2;
    }

    /// One variable-length code: 4, 8, 12 or 16 bits depending on how many
    /// leading zero bit pairs it has.
    fn code(&mut self) -> Option<u16> {
        let mut code = self.nibble()?;
        for threshold in [0x4, 0x10, 0x40] {
            if code >= threshold {
                return Some(code);
            }
            code = (code << 4) | self.nibble()?;
        }
        Some(code)
    }
}

/// Expand a 2-bit RLE payload to one palette index per pixel, row-major.
///
/// Rows come top field first (even rows), then bottom field (odd rows). Each
/// row starts on a byte boundary. Missing data leaves pixels at index 0.
pub fn decode_rle(payload: &[u8], width: u16, height: u16) -> Vec<u8> {
    let width = width as usize;
    let height = height as usize;
    let mut out = vec![0u8; width * height];
    if width == 0 {
        return out;
    }

    let mut reader = NibbleReader::new(payload);
    let rows = (0..height).step_by(2).chain((1..height).step_by(2));

    'rows: for row in rows {
        let line = &mut out[row * width..(row + 1) * width];
        let mut x = 0;
        while x < width {
            let Some(code) = reader.code() else {
                break 'rows;
            };
            let color = (code & 0x3) as u8;
            let run = match (code >> 2) as usize {
                0 => width - x,
                n => n.min(width - x),
            };
            line[x..x + run].fill(color);
            x += run;
        }
        reader.align();
    }

    out
}
