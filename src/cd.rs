//! Redbook/MSF constants and conversions shared between block I/O and ATAPI packet
//! buffer building (§4.4, §4.6).

/// Sectors per second of CD audio/data, per the Redbook spec.
pub const FRAMES_PER_SECOND: u32 = 75;
/// The 2-second pregap counted into every absolute MSF timecode.
pub const PREGAP_FRAMES: u32 = 150;

/// A minute:second:frame timecode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Msf {
    pub min: u8,
    pub sec: u8,
    pub frame: u8,
}

/// Converts an absolute frame count (LBA already offset by the 150-frame pregap) to MSF.
///
/// # Arguments
///
/// * `frames` - The absolute frame count.
///
/// # Returns
///
/// * `Msf` - The corresponding minute:second:frame timecode.
#[must_use]
pub fn frames_to_msf(frames: u32) -> Msf {
    let frame = frames % FRAMES_PER_SECOND;
    let total_seconds = frames / FRAMES_PER_SECOND;
    let sec = total_seconds % 60;
    let min = total_seconds / 60;
    Msf {
        min: min.min(u32::from(u8::MAX)) as u8,
        sec: sec as u8,
        frame: frame as u8,
    }
}

/// Converts an LBA (sector index from the start of user data, as stored in the track
/// table) to the MSF timecode reported to the host, which counts from the pregap.
///
/// # Arguments
///
/// * `lba` - The sector index from the start of user data.
///
/// # Returns
///
/// * `Msf` - The MSF timecode reported to the host.
#[must_use]
pub fn lba_to_msf(lba: u32) -> Msf {
    frames_to_msf(lba + PREGAP_FRAMES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lba_zero_is_two_second_pregap() {
        assert_eq!(lba_to_msf(0), Msf { min: 0, sec: 2, frame: 0 });
    }

    #[test]
    fn one_second_of_frames_rolls_into_seconds() {
        assert_eq!(frames_to_msf(75), Msf { min: 0, sec: 1, frame: 0 });
    }

    #[test]
    fn sixty_seconds_rolls_into_minutes() {
        assert_eq!(frames_to_msf(75 * 60), Msf { min: 1, sec: 0, frame: 0 });
    }
}
