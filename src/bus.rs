//! External collaborators (§6): the hardware register-window transport and the
//! image-file I/O layer. The core only calls these; it never implements them.

/// The capability/geometry configuration registers programmed by [`crate::mount`].
///
/// # Variants
///
/// * `IdentifyBlock` - Selects the 256-word identify block for transfer.
/// * `Cylinders` - The HDD cylinder count.
/// * `Heads` - The HDD head count.
/// * `SectorsPerTrack` - The HDD sectors-per-track count.
/// * `HeadsTimesSpt` - The precomputed `heads * spt` product (legacy layout convenience).
/// * `TotalSectors` - The HDD total sector count.
/// * `MountBits` - The packed present/cd/placeholder bits for the slot (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigRegister {
    IdentifyBlock = 0,
    Cylinders = 1,
    Heads = 2,
    SectorsPerTrack = 3,
    HeadsTimesSpt = 4,
    TotalSectors = 5,
    MountBits = 6,
}

/// The protocol version in effect for a channel, selecting the legacy vs. v3 register
/// layout (see [`ConfigRegister`] and [`RegisterWindow::write_cfg`]).
///
/// # Variants
///
/// * `V1` - The original layout.
/// * `V2` - Adds the ATAPI packet-size-limit register.
/// * `V3` - Adds the 256-sectors-per-track HDD geometry and wide mount-bits layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    V1,
    V2,
    V3,
}

/// The only transport between this core and the hardware front-end: a DMA-style
/// register window. `base` addresses a per-channel region; bulk data lives at
/// `base + 255` onward.
pub trait RegisterWindow {
    /// Writes the 3-word register snapshot at `base`.
    ///
    /// # Arguments
    ///
    /// * `base` - The channel's register-window base address.
    /// * `words` - The 3-word little-endian register snapshot to publish.
    fn send_regs(&mut self, base: u32, words: [u32; 3]);

    /// Reads the 3-word register snapshot at `base`.
    ///
    /// # Arguments
    ///
    /// * `base` - The channel's register-window base address.
    ///
    /// # Returns
    ///
    /// * `[u32; 3]` - The 3-word little-endian register snapshot.
    fn recv_regs(&mut self, base: u32) -> [u32; 3];

    /// Writes `words` starting at `base + 255`.
    ///
    /// # Arguments
    ///
    /// * `base` - The channel's register-window base address.
    /// * `words` - The data words to publish.
    fn send_data(&mut self, base: u32, words: &[u32]);

    /// Reads `words.len()` words starting at `base + 255`.
    ///
    /// # Arguments
    ///
    /// * `base` - The channel's register-window base address.
    /// * `words` - The buffer to fill.
    fn recv_data(&mut self, base: u32, words: &mut [u32]);

    /// Programs a geometry/identify configuration register.
    ///
    /// # Arguments
    ///
    /// * `base` - The channel's register-window base address.
    /// * `reg` - The configuration register to program.
    /// * `value` - The value to write.
    /// * `ver` - The protocol version in effect, which selects the register layout.
    fn write_cfg(&mut self, base: u32, reg: ConfigRegister, value: u32, ver: ProtocolVersion);

    /// Pulses the buffer-refill line after a 12-byte ATAPI packet has been received.
    ///
    /// # Arguments
    ///
    /// * `base` - The channel's register-window base address.
    fn reset_buf(&mut self, base: u32);
}

/// A host-side image file. Every method returns an error to mean "treat as absent" —
/// the core zero-fills rather than surfacing file I/O failures to the guest (§7).
pub trait ImageFile {
    /// Seeks to an absolute byte offset.
    ///
    /// # Arguments
    ///
    /// * `offset` - The absolute byte offset to seek to.
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the seek fails; the core treats this as "no media".
    fn seek(&mut self, offset: u64) -> Result<(), ()>;

    /// Seeks to the byte offset of sector `lba` at `sector_size` bytes per sector.
    ///
    /// # Arguments
    ///
    /// * `lba` - The sector index to seek to.
    /// * `sector_size` - The sector size in bytes.
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the seek fails.
    fn seek_lba(&mut self, lba: u64, sector_size: u32) -> Result<(), ()> {
        self.seek(lba * u64::from(sector_size))
    }

    /// Reads exactly `buf.len()` bytes from the current position.
    ///
    /// # Arguments
    ///
    /// * `buf` - The buffer to fill.
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the read fails; the core treats this as "no media".
    fn read(&mut self, buf: &mut [u8]) -> Result<(), ()>;

    /// Writes exactly `buf.len()` bytes at the current position.
    ///
    /// # Arguments
    ///
    /// * `buf` - The bytes to write.
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the write fails.
    fn write(&mut self, buf: &[u8]) -> Result<(), ()>;

    /// The file's size in bytes.
    ///
    /// # Returns
    ///
    /// * `u64` - The file's size in bytes.
    fn size(&self) -> u64;

    /// The file's leaf name, used to patch the identify block's model string.
    ///
    /// # Returns
    ///
    /// * `&str` - The file's leaf name.
    fn name(&self) -> &str;
}
