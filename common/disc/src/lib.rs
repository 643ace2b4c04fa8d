//! Abstract disc data model consumed by the CD block.
//!
//! This crate does not parse any on-disk image format (CUE/BIN, CHD, ISO, MDS/CCD); that is the
//! job of a disc image loader living outside the core. The loader's only contract with the core is
//! [`Disc`] plus [`BinaryReader`] per track.

pub mod cdtime;

use bincode::{Decode, Encode};
use std::fmt::Debug;
use thiserror::Error;
use xxhash_rust::xxh3::Xxh3;

/// The largest sector size the core understands (2448-byte raw P-W subcode sectors).
pub const MAX_SECTOR_SIZE: u32 = 2448;

/// FAD (Frame Address): a 0-based absolute sector index. FAD 150 (00:02:00) is the conventional
/// start of user data, matching the two-second Red Book lead-in.
pub type Fad = u32;

pub const FIRST_USER_DATA_FAD: Fad = 150;

#[derive(Debug, Error)]
pub enum DiscError {
    #[error("I/O error reading from disc: {0}")]
    Io(#[from] std::io::Error),
    #[error("FAD {fad} is outside every track on the disc")]
    FadOutOfRange { fad: Fad },
    #[error("No disc is currently loaded")]
    NoDisc,
}

pub type DiscResult<T> = Result<T, DiscError>;

/// Random-access byte source for one track's raw sector stream.
///
/// Implementations hide the on-disk container format entirely; the core only ever calls
/// [`read_sector`](BinaryReader::read_sector). `out` is always exactly the track's `sector_size`
/// bytes long.
pub trait BinaryReader: Debug + Send {
    fn read_sector(&mut self, relative_sector: u32, out: &mut [u8]) -> DiscResult<()>;
}

/// `[start_fad, end_fad]` inclusive sector range within a track (§3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct Index {
    pub start_fad: Fad,
    pub end_fad: Fad,
}

impl Index {
    #[must_use]
    pub fn contains(&self, fad: Fad) -> bool {
        (self.start_fad..=self.end_fad).contains(&fad)
    }
}

/// Red Book CONTROL nibble bit indicating a data (as opposed to 2-channel audio) track.
pub const CONTROL_DATA_TRACK_BIT: u8 = 0x04;

pub struct Track {
    pub number: u8,
    pub sector_size: u32,
    pub mode2: bool,
    pub control_adr: u8,
    pub start_fad: Fad,
    pub end_fad: Fad,
    pub indices: Vec<Index>,
    pub reader: Box<dyn BinaryReader>,
}

impl Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("number", &self.number)
            .field("sector_size", &self.sector_size)
            .field("mode2", &self.mode2)
            .field("control_adr", &self.control_adr)
            .field("start_fad", &self.start_fad)
            .field("end_fad", &self.end_fad)
            .field("indices", &self.indices)
            .finish_non_exhaustive()
    }
}

impl Track {
    #[must_use]
    pub fn is_audio(&self) -> bool {
        self.control_adr & CONTROL_DATA_TRACK_BIT == 0
    }

    #[must_use]
    pub fn contains(&self, fad: Fad) -> bool {
        (self.start_fad..=self.end_fad).contains(&fad)
    }

    pub fn read_sector(&mut self, fad: Fad, out: &mut [u8]) -> DiscResult<()> {
        let relative = fad - self.start_fad;
        self.reader.read_sector(relative, out)
    }

    /// Extracts the 2048-byte (or smaller, for already-reduced sector sizes) user data payload
    /// from a raw sector buffer, per this track's sector size.
    ///
    /// Full 2352-byte raw sectors carry a 12-byte sync pattern and a 4-byte header before user
    /// data; every smaller recognized size is already reduced to (at most) user data plus a
    /// subheader, so it is returned unchanged.
    #[must_use]
    pub fn user_data<'a>(&self, raw_sector: &'a [u8]) -> &'a [u8] {
        match self.sector_size {
            2352 | 2448 => &raw_sector[16..16 + 2048],
            _ => raw_sector,
        }
    }
}

/// A contiguous run of tracks sharing one lead-in/lead-out (§3.4).
#[derive(Debug)]
pub struct Session {
    pub number: u8,
    pub start_fad: Fad,
    pub end_fad: Fad,
    pub first_track: u8,
    pub last_track: u8,
    pub tracks: Vec<Track>,
}

/// One entry of a Red Book table of contents, as read back by `ReadTOC` (§3.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocEntry {
    pub track_number: u8,
    pub control_adr: u8,
    pub start_fad: Fad,
}

impl Session {
    #[must_use]
    pub fn toc(&self) -> Vec<TocEntry> {
        self.tracks
            .iter()
            .map(|track| TocEntry {
                track_number: track.number,
                control_adr: track.control_adr,
                start_fad: track.start_fad,
            })
            .collect()
    }

    #[must_use]
    pub fn track_containing(&self, fad: Fad) -> Option<&Track> {
        self.tracks.iter().find(|track| track.contains(fad))
    }

    #[must_use]
    pub fn track_containing_mut(&mut self, fad: Fad) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|track| track.contains(fad))
    }
}

/// The 256-byte user data header from sector 0 of the disc's first track (§6.4).
#[derive(Clone)]
pub struct DiscHeader {
    pub raw: Box<[u8; 256]>,
}

impl Debug for DiscHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscHeader").field("raw", &"<256 bytes>").finish()
    }
}

#[derive(Debug)]
pub struct Disc {
    pub sessions: Vec<Session>,
    pub header: Option<DiscHeader>,
}

impl Disc {
    #[must_use]
    pub fn track_containing(&self, fad: Fad) -> Option<&Track> {
        self.sessions.iter().find_map(|session| session.track_containing(fad))
    }

    pub fn track_containing_mut(&mut self, fad: Fad) -> Option<&mut Track> {
        self.sessions.iter_mut().find_map(|session| session.track_containing_mut(fad))
    }

    pub fn read_user_data(&mut self, fad: Fad, out: &mut [u8; 2048]) -> DiscResult<()> {
        let track = self.track_containing_mut(fad).ok_or(DiscError::FadOutOfRange { fad })?;
        let mut raw = vec![0u8; track.sector_size as usize];
        track.read_sector(fad, &mut raw)?;
        out.copy_from_slice(&track.user_data(&raw)[..2048]);
        Ok(())
    }

    /// Content hash used to bind a save state to the disc it was created against (§3.7, §8 SC-2).
    ///
    /// Computed as the XXH128 of every track's metadata (number, sector size, mode2 flag,
    /// control/ADR byte, start/end FAD) followed by the user data of every sector in that track,
    /// in session then track then FAD order.
    #[must_use]
    pub fn hash(&mut self) -> u128 {
        let mut hasher = Xxh3::new();

        for session in &self.sessions {
            for track in &session.tracks {
                hasher.update(&track.number.to_le_bytes());
                hasher.update(&track.sector_size.to_le_bytes());
                hasher.update(&[u8::from(track.mode2)]);
                hasher.update(&[track.control_adr]);
                hasher.update(&track.start_fad.to_le_bytes());
                hasher.update(&track.end_fad.to_le_bytes());
            }
        }

        for si in 0..self.sessions.len() {
            for ti in 0..self.sessions[si].tracks.len() {
                let (start_fad, end_fad, sector_size) = {
                    let track = &self.sessions[si].tracks[ti];
                    (track.start_fad, track.end_fad, track.sector_size)
                };

                let mut raw = vec![0u8; sector_size as usize];
                for fad in start_fad..=end_fad {
                    let track = &mut self.sessions[si].tracks[ti];
                    if track.read_sector(fad, &mut raw).is_err() {
                        continue;
                    }
                    hasher.update(track.user_data(&raw));
                }
            }
        }

        hasher.digest128()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct ZeroedReader {
        sector_size: u32,
    }

    impl BinaryReader for ZeroedReader {
        fn read_sector(&mut self, _relative_sector: u32, out: &mut [u8]) -> DiscResult<()> {
            assert_eq!(out.len(), self.sector_size as usize);
            out.fill(0);
            Ok(())
        }
    }

    fn single_track_disc(start_fad: Fad, end_fad: Fad, sector_size: u32) -> Disc {
        let track = Track {
            number: 1,
            sector_size,
            mode2: false,
            control_adr: CONTROL_DATA_TRACK_BIT,
            start_fad,
            end_fad,
            indices: vec![Index { start_fad, end_fad }],
            reader: Box::new(ZeroedReader { sector_size }),
        };
        let session = Session {
            number: 1,
            start_fad,
            end_fad,
            first_track: 1,
            last_track: 1,
            tracks: vec![track],
        };
        Disc { sessions: vec![session], header: None }
    }

    #[test]
    fn hash_is_deterministic_across_eject_reload() {
        let mut disc_a = single_track_disc(150, 170, 2352);
        let mut disc_b = single_track_disc(150, 170, 2352);
        assert_eq!(disc_a.hash(), disc_b.hash());
    }

    #[test]
    fn track_containing_respects_bounds() {
        let disc = single_track_disc(150, 170, 2352);
        assert!(disc.track_containing(149).is_none());
        assert!(disc.track_containing(150).is_some());
        assert!(disc.track_containing(170).is_some());
        assert!(disc.track_containing(171).is_none());
    }

    #[test]
    fn is_audio_reflects_control_bit() {
        let mut disc = single_track_disc(150, 170, 2352);
        assert!(!disc.sessions[0].tracks[0].is_audio());
        disc.sessions[0].tracks[0].control_adr = 0x00;
        assert!(disc.sessions[0].tracks[0].is_audio());
    }
}
