//! ISO-9660/High-Sierra detection (§4.7): probes a mounted image across the sector-size
//! and mode-2 combinations a CD image might be stored in, looking for a primary volume
//! descriptor at logical sector 16.

use crate::bus::ImageFile;

/// Sector-size/mode-2 combinations tried in order; the first that yields a recognizable
/// PVD wins. 2048 (cooked) is tried first as the common case.
const CANDIDATES: [(u16, bool); 4] = [(2048, false), (2352, false), (2336, true), (2352, true)];

/// Probes `image` for a readable primary volume descriptor, returning the sector size and
/// mode-2 flag of the first matching layout, or `None` if none of the four combinations
/// decode to a recognizable ISO-9660 or High Sierra PVD.
///
/// # Arguments
///
/// * `image` - The image file to probe.
///
/// # Returns
///
/// * `Option<(u16, bool)>` - The detected sector size and mode-2 flag, or `None`.
#[must_use]
pub fn check_iso_file(image: &mut dyn ImageFile) -> Option<(u16, bool)> {
    CANDIDATES
        .into_iter()
        .find(|&(sector_size, mode2)| can_read_pvd(image, sector_size, mode2))
}

/// Seeks to logical sector 16 (plus the sync/header prologue for raw sector formats) and
/// checks for an ISO-9660 (`CD001`) or High Sierra (`CDROM`) volume descriptor signature.
fn can_read_pvd(image: &mut dyn ImageFile, sector_size: u16, mode2: bool) -> bool {
    let mut offset = 16u64 * u64::from(sector_size);
    if sector_size == 2352 && !mode2 {
        offset += 16;
    }
    if mode2 {
        offset += 24;
    }

    if image.seek(offset).is_err() {
        return false;
    }

    let mut pvd = [0u8; 2048];
    if image.read(&mut pvd).is_err() {
        return false;
    }

    (pvd[0] == 1 && &pvd[1..6] == b"CD001" && pvd[6] == 1)
        || (pvd[8] == 1 && &pvd[9..14] == b"CDROM" && pvd[14] == 1)
}
