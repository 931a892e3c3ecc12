//! Block I/O (§4.4): LBA-addressed multi-sector transfer for HDDs and sector-format-aware
//! reads for CDs. These are pure mechanical primitives — sticky failure tracking across a
//! multi-chunk transfer is the state machine's job ([`crate::channel`]).

use alloc::boxed::Box;

use crate::bus::ImageFile;

/// The hardware burst size (§2): the scratch buffer's capacity in 512-byte sectors.
pub const IO_MAX_SECTORS: u32 = 32;

/// HDD chunk-size rule (§4.4): a `sector_count` of zero or above [`IO_MAX_SECTORS`]
/// becomes `IO_MAX_SECTORS`; `1..=IO_MAX_SECTORS` passes through unchanged.
///
/// # Arguments
///
/// * `sector_count` - The requested sector count from the register snapshot.
///
/// # Returns
///
/// * `u32` - The clamped chunk size, in sectors.
#[must_use]
pub fn hdd_chunk(sector_count: u8) -> u32 {
    let cnt = u32::from(sector_count);
    if cnt == 0 || cnt > IO_MAX_SECTORS {
        IO_MAX_SECTORS
    } else {
        cnt
    }
}

/// Seeks `image` to an absolute byte offset. `None` (no image mounted) always fails.
///
/// # Arguments
///
/// * `image` - The mounted image, if any.
/// * `offset` - The absolute byte offset to seek to.
///
/// # Returns
///
/// * `bool` - Whether the seek succeeded.
pub fn seek(image: &mut Option<Box<dyn ImageFile>>, offset: u64) -> bool {
    match image.as_deref_mut() {
        Some(img) => img.seek(offset).is_ok(),
        None => false,
    }
}

/// Reads `buf.len()` bytes from the current position.
///
/// # Arguments
///
/// * `image` - The mounted image, if any.
/// * `buf` - The buffer to fill.
///
/// # Returns
///
/// * `bool` - Whether the read succeeded.
pub fn read(image: &mut Option<Box<dyn ImageFile>>, buf: &mut [u8]) -> bool {
    match image.as_deref_mut() {
        Some(img) => img.read(buf).is_ok(),
        None => false,
    }
}

/// Writes `buf` at the current position.
///
/// # Arguments
///
/// * `image` - The mounted image, if any.
/// * `buf` - The bytes to write.
///
/// # Returns
///
/// * `bool` - Whether the write succeeded.
pub fn write(image: &mut Option<Box<dyn ImageFile>>, buf: &[u8]) -> bool {
    match image.as_deref_mut() {
        Some(img) => img.write(buf).is_ok(),
        None => false,
    }
}

/// Reads `cnt` CD sectors starting at `*cursor` (an absolute byte offset), stripping the
/// sync/header/subheader/ECC prologue and epilogue for non-2048-byte sector images (§4.4).
/// Advances `*cursor` by exactly `cnt * sector_size` bytes regardless of success, so the
/// next call picks up where this one left off. A seek/read failure is sticky for the rest
/// of the call (via `*null`) and degrades to zero-fill rather than a partial read (§7).
///
/// # Arguments
///
/// * `image` - The mounted image, if any.
/// * `sector_size` - The detected sector size in bytes (2048, 2336 or 2352).
/// * `mode2` - Whether the image is mode-2 formatted, which changes the prologue size.
/// * `cnt` - The number of sectors to read.
/// * `cursor` - The absolute byte offset to read from; advanced in place.
/// * `null` - Sticky failure flag; set once a seek/read fails and never cleared here.
/// * `out` - The output buffer, `cnt * 2048` bytes of cooked sector data.
pub fn read_cd_sectors(
    image: &mut Option<Box<dyn ImageFile>>,
    sector_size: u16,
    mode2: bool,
    cnt: u32,
    cursor: &mut u64,
    null: &mut bool,
    out: &mut [u8],
) {
    let cnt = cnt as usize;

    if sector_size == 2048 {
        let len = cnt * 2048;
        if !*null {
            *null = !(seek(image, *cursor) && read(image, &mut out[..len]));
        }
        if *null {
            out[..len].fill(0);
        }
        *cursor += len as u64;
        return;
    }

    let pre = if mode2 { 24u64 } else { 16u64 };
    let stride = u64::from(sector_size);
    for i in 0..cnt {
        let dst = &mut out[i * 2048..(i + 1) * 2048];
        if !*null {
            *null = !(seek(image, *cursor + pre) && read(image, dst));
        }
        if *null {
            dst.fill(0);
        }
        *cursor += stride;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::vec;
    use alloc::vec::Vec;

    struct FakeImage {
        data: Vec<u8>,
        pos: usize,
    }

    impl ImageFile for FakeImage {
        fn seek(&mut self, offset: u64) -> Result<(), ()> {
            self.pos = offset as usize;
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<(), ()> {
            let end = self.pos + buf.len();
            if end > self.data.len() {
                return Err(());
            }
            buf.copy_from_slice(&self.data[self.pos..end]);
            self.pos = end;
            Ok(())
        }

        fn write(&mut self, buf: &[u8]) -> Result<(), ()> {
            let end = self.pos + buf.len();
            if end > self.data.len() {
                self.data.resize(end, 0);
            }
            self.data[self.pos..end].copy_from_slice(buf);
            self.pos = end;
            Ok(())
        }

        fn size(&self) -> u64 {
            self.data.len() as u64
        }

        fn name(&self) -> &str {
            "fake.img"
        }
    }

    #[test]
    fn hdd_chunk_clamps_zero_and_oversized_to_max() {
        assert_eq!(hdd_chunk(0), IO_MAX_SECTORS);
        assert_eq!(hdd_chunk(255), IO_MAX_SECTORS);
        assert_eq!(hdd_chunk(5), 5);
        assert_eq!(hdd_chunk(32), 32);
    }

    #[test]
    fn absent_image_always_fails_seek_and_read() {
        let mut image: Option<Box<dyn ImageFile>> = None;
        assert!(!seek(&mut image, 0));
        let mut buf = [0u8; 4];
        assert!(!read(&mut image, &mut buf));
    }

    #[test]
    fn read_cd_sectors_cooked_reads_straight_through() {
        let mut data = vec![0u8; 4096];
        data[2048] = 0xAB;
        let mut image: Option<Box<dyn ImageFile>> = Some(Box::new(FakeImage { data, pos: 0 }));
        let mut cursor = 2048u64;
        let mut null = false;
        let mut out = [0u8; 2048];
        read_cd_sectors(&mut image, 2048, false, 1, &mut cursor, &mut null, &mut out);
        assert!(!null);
        assert_eq!(out[0], 0xAB);
        assert_eq!(cursor, 4096);
    }

    #[test]
    fn read_cd_sectors_raw_strips_sync_header_for_each_sector() {
        let sector_size = 2352u64;
        let mut data = vec![0u8; (sector_size * 2) as usize];
        data[16] = 1; // sector 0 payload marker
        data[16 + 2352] = 2; // sector 1 payload marker
        let mut image: Option<Box<dyn ImageFile>> = Some(Box::new(FakeImage { data, pos: 0 }));
        let mut cursor = 0u64;
        let mut null = false;
        let mut out = [0u8; 4096];
        read_cd_sectors(&mut image, 2352, false, 2, &mut cursor, &mut null, &mut out);
        assert!(!null);
        assert_eq!(out[0], 1);
        assert_eq!(out[2048], 2);
        assert_eq!(cursor, sector_size * 2);
    }

    #[test]
    fn null_is_sticky_once_a_read_fails() {
        let mut image: Option<Box<dyn ImageFile>> = Some(Box::new(FakeImage { data: vec![0u8; 16], pos: 0 }));
        let mut cursor = 0u64;
        let mut null = true; // a previous chunk already failed
        let mut out = [0xFFu8; 2048];
        read_cd_sectors(&mut image, 2048, false, 1, &mut cursor, &mut null, &mut out);
        assert!(null);
        assert!(out.iter().all(|&b| b == 0));
    }
}
