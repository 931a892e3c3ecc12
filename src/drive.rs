//! The Drive Descriptor (§3): geometry, role flags, the identify block, and (for CD
//! drives) the track table.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use crate::bus::ImageFile;

/// One entry of the two-entry CD track table (§3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Track {
    pub start: u32,
    pub length: u32,
    pub sector_size: u16,
    pub attr: u8,
    pub mode2: bool,
}

/// Hard disk geometry (§3 invariants).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geometry {
    pub cylinders: u16,
    pub heads: u16,
    pub spt: u16,
    pub total_sectors: u32,
}

/// A drive slot on a channel: absent, a hard disk, a CD-ROM, or a placeholder (an empty
/// tray that still claims ATAPI identity so the host OS enumerates it).
pub struct Drive {
    pub image: Option<Box<dyn ImageFile>>,
    pub geometry: Geometry,
    pub present: bool,
    pub placeholder: bool,
    pub cd: bool,
    /// Sense-ramp counter (0..3), mutated only by REQUEST SENSE and mount (§4.5).
    pub load_state: u8,
    pub identify: [u16; 256],
    /// `tracks[0]` is the data track, `tracks[1]` is the lead-out (§3).
    pub tracks: [Track; 2],
}

impl Drive {
    /// An absent drive slot: nothing mounted, no ATAPI identity.
    ///
    /// # Returns
    ///
    /// * `Self` - An absent drive descriptor.
    #[must_use]
    pub fn absent() -> Self {
        Self {
            image: None,
            geometry: Geometry::default(),
            present: false,
            placeholder: false,
            cd: false,
            load_state: 0,
            identify: [0; 256],
            tracks: [Track::default(); 2],
        }
    }

    /// A placeholder CD slot (empty tray, ATAPI identity only).
    ///
    /// # Returns
    ///
    /// * `Self` - A placeholder CD drive descriptor.
    #[must_use]
    pub fn placeholder_cd() -> Self {
        let mut drive = Self::absent();
        drive.placeholder = true;
        drive.cd = true;
        drive.load_state = 3;
        drive
    }

    /// The mounted image's size, or `0` if no image is mounted.
    ///
    /// # Returns
    ///
    /// * `u64` - The image's size in bytes.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.image.as_ref().map_or(0, |f| f.size())
    }

    /// The CD's data track.
    ///
    /// # Returns
    ///
    /// * `&Track` - `tracks[0]`.
    #[must_use]
    pub fn data_track(&self) -> &Track {
        &self.tracks[0]
    }

    /// The CD's lead-out pseudo-track.
    ///
    /// # Returns
    ///
    /// * `&Track` - `tracks[1]`.
    #[must_use]
    pub fn leadout_track(&self) -> &Track {
        &self.tracks[1]
    }
}

/// Builds the track table for a mounted CD image (§3): `tracks[0]` is the data track,
/// `tracks[1]` is the lead-out, starting where the data track ends.
///
/// # Arguments
///
/// * `sector_size` - The detected sector size in bytes (2048, 2336 or 2352).
/// * `mode2` - Whether the image is mode-2 formatted.
/// * `length_sectors` - The data track's length in sectors.
///
/// # Returns
///
/// * `[Track; 2]` - The data track and lead-out pseudo-track.
#[must_use]
pub fn build_tracks(sector_size: u16, mode2: bool, length_sectors: u32) -> [Track; 2] {
    let data = Track {
        start: 0,
        length: length_sectors,
        sector_size,
        attr: 0x40,
        mode2,
    };
    let leadout = Track {
        start: data.length,
        length: 0,
        sector_size: 0,
        attr: 0,
        mode2: false,
    };
    [data, leadout]
}

/// HDD geometry per §3's invariants: `heads = 16`; `spt = 63` for protocol versions
/// below 3, `256` at version 3; `cylinders` saturates at 65535 (images above ~137 GB).
///
/// # Arguments
///
/// * `file_size` - The mounted image's size in bytes.
/// * `v3` - Whether the channel is running protocol version 3 (selects `spt`).
///
/// # Returns
///
/// * `Geometry` - The derived HDD geometry.
#[must_use]
pub fn hdd_geometry(file_size: u64, v3: bool) -> Geometry {
    let spt: u16 = if v3 { 256 } else { 63 };
    let heads: u16 = 16;
    let total_sectors = (file_size / 512) as u32;
    let per_cylinder = u32::from(heads) * u32::from(spt);
    let cylinders = if per_cylinder == 0 {
        0
    } else {
        (total_sectors / per_cylinder).min(65535) as u16
    };

    Geometry {
        cylinders,
        heads,
        spt,
        total_sectors,
    }
}

/// Allocates a process-wide scratch buffer sized for the maximum transfer (32 sectors ×
/// 512 bytes), per §2/§5. Owned per-channel, never shared across channels.
///
/// # Returns
///
/// * `Vec<u8>` - A zeroed 16 KB scratch buffer.
#[must_use]
pub fn new_scratch_buffer() -> Vec<u8> {
    vec![0u8; 32 * 512]
}
