//! The register codec (§4.1): pack/unpack the 12-byte register window as three
//! little-endian 32-bit words.

use bit_field::BitField;

/// ATA status register bits.
pub mod status {
    pub const BSY: u8 = 0x80;
    pub const RDY: u8 = 0x40;
    pub const DF: u8 = 0x20;
    pub const SKC: u8 = 0x10;
    pub const DRQ: u8 = 0x08;
    pub const IRQ: u8 = 0x04;
    pub const IDX: u8 = 0x02;
    pub const ERR: u8 = 0x01;
}

/// ATA error register bits.
pub mod error {
    pub const BBK: u8 = 0x80;
    pub const UNC: u8 = 0x40;
    pub const MC: u8 = 0x20;
    pub const IDNF: u8 = 0x10;
    pub const MCR: u8 = 0x08;
    pub const ABRT: u8 = 0x04;
    pub const NTK0: u8 = 0x02;
    pub const NDAM: u8 = 0x01;
}

/// A request from the hardware dispatcher (§5).
///
/// # Variants
///
/// * `Nop` - Only meaningful when leaving RESET; advances RESET to IDLE.
/// * `Command` - A new command register snapshot is ready to be dispatched.
/// * `Data` - The hardware is ready to exchange the next chunk of a data phase.
/// * `Reset` - Preempts any state; publishes BSY and the slot's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Nop,
    Command,
    Data,
    Reset,
}

/// The task-file register snapshot exchanged with the hardware (§3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Regs {
    pub io_done: bool,
    pub features: u8,
    pub sector_count: u8,
    pub sector: u8,
    pub head: u8,
    pub drv: u8,
    pub lba: bool,
    pub cmd: u8,
    pub cylinder: u16,

    // ATAPI-only.
    pub pkt_size_limit: u32,
    pub pkt_io_size: u16,
    pub pkt_lba: u32,
    pub pkt_cnt: u32,

    pub io_size: u8,
    pub error: u8,
    pub status: u8,
}

impl Regs {
    /// Computes the 28-bit LBA from the current sector/cylinder/head fields.
    ///
    /// `lba28 = sector | (cylinder << 8) | ((head & 0xF) << 24)`.
    ///
    /// # Returns
    ///
    /// * `u32` - The 28-bit logical block address.
    #[must_use]
    pub fn lba28(&self) -> u32 {
        u32::from(self.sector) | (u32::from(self.cylinder) << 8) | (u32::from(self.head & 0xF) << 24)
    }

    /// Writes a 28-bit LBA back into the sector/cylinder/head fields.
    ///
    /// # Arguments
    ///
    /// * `lba` - The 28-bit logical block address to scatter across the registers.
    pub fn set_lba28(&mut self, lba: u32) {
        self.sector = (lba & 0xFF) as u8;
        self.cylinder = ((lba >> 8) & 0xFFFF) as u16;
        self.head = (self.head & !0xF) | ((lba >> 24) & 0xF) as u8;
    }
}

/// Decodes the 3-word register snapshot received from the hardware. `error`/`status`
/// are always cleared on receive (§4.1 **get_regs** contract).
///
/// # Arguments
///
/// * `words` - The 3-word little-endian register snapshot read from the hardware.
///
/// # Returns
///
/// * `Regs` - The decoded task-file registers.
#[must_use]
pub fn decode(words: [u32; 3]) -> Regs {
    Regs {
        io_done: words[0].get_bit(0),
        features: words[0].get_bits(8..16) as u8,
        sector_count: words[0].get_bits(16..24) as u8,
        sector: words[0].get_bits(24..32) as u8,
        cylinder: (words[1] & 0xFFFF) as u16,
        head: words[2].get_bits(16..20) as u8,
        drv: words[2].get_bits(20..21) as u8,
        lba: words[2].get_bit(22),
        cmd: words[2].get_bits(24..32) as u8,
        error: 0,
        status: 0,
        ..Regs::default()
    }
}

/// Encodes the 3-word register snapshot to publish to the hardware (§4.1 **set_regs**
/// contract). If neither BSY nor ERR is set, `status` is OR'd with SKC before encoding —
/// this mutates `regs.status` in place, matching the source's behavior of publishing the
/// seek-complete bit rather than computing it separately.
///
/// # Arguments
///
/// * `is_cd` - Whether the addressed slot is a CD-ROM, which selects the ATAPI word
///   layout (`pkt_io_size` in word2, the `0x80` tag in word0) over the HDD layout.
/// * `regs` - The register snapshot to encode; `status` is mutated in place.
///
/// # Returns
///
/// * `[u32; 3]` - The 3-word little-endian register snapshot to publish to the hardware.
#[must_use]
pub fn encode(is_cd: bool, regs: &mut Regs) -> [u32; 3] {
    if regs.status & (status::BSY | status::ERR) == 0 {
        regs.status |= status::SKC;
    }

    let mut w0: u32 = if is_cd { 0x80 } else { u32::from(regs.io_size) };
    w0.set_bits(8..16, u32::from(regs.error));
    w0.set_bits(16..24, u32::from(regs.sector_count));
    w0.set_bits(24..32, u32::from(regs.sector));

    let w1 = u32::from(regs.cylinder);

    let mut w2: u32 = if is_cd { u32::from(regs.pkt_io_size) } else { 0 };
    w2.set_bits(16..20, u32::from(regs.head));
    w2.set_bits(20..21, u32::from(regs.drv));
    w2.set_bits(21..24, if regs.lba { 7 } else { 5 });
    w2.set_bits(24..32, u32::from(regs.status));

    [w0, w1, w2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_extracts_exposed_fields() {
        let word0 = 1u32 | (0x55 << 8) | (0x10 << 16) | (0x20 << 24);
        let word1 = 0x0400u32;
        let word2 = (0x3 << 16) | (1 << 20) | (1 << 22) | (0xEC << 24);
        let regs = decode([word0, word1, word2]);

        assert!(regs.io_done);
        assert_eq!(regs.features, 0x55);
        assert_eq!(regs.sector_count, 0x10);
        assert_eq!(regs.sector, 0x20);
        assert_eq!(regs.cylinder, 0x0400);
        assert_eq!(regs.head, 0x3);
        assert_eq!(regs.drv, 1);
        assert!(regs.lba);
        assert_eq!(regs.cmd, 0xEC);
        assert_eq!(regs.error, 0);
        assert_eq!(regs.status, 0);
    }

    #[test]
    fn encode_adds_skc_unless_busy_or_error() {
        let mut regs = Regs {
            status: status::RDY | status::DRQ,
            ..Regs::default()
        };
        let _ = encode(false, &mut regs);
        assert_eq!(regs.status, status::RDY | status::DRQ | status::SKC);

        let mut regs = Regs {
            status: status::BSY,
            ..Regs::default()
        };
        let _ = encode(false, &mut regs);
        assert_eq!(regs.status, status::BSY);

        let mut regs = Regs {
            status: status::RDY | status::ERR,
            ..Regs::default()
        };
        let _ = encode(false, &mut regs);
        assert_eq!(regs.status, status::RDY | status::ERR);
    }

    #[test]
    fn round_trip_identity_on_exposed_fields() {
        let original = Regs {
            features: 0x11,
            sector_count: 0x22,
            sector: 0x33,
            cylinder: 0x4455,
            head: 0xA,
            drv: 1,
            lba: true,
            cmd: 0xEC,
            ..Regs::default()
        };

        let word0 = u32::from(original.io_done)
            | (u32::from(original.features) << 8)
            | (u32::from(original.sector_count) << 16)
            | (u32::from(original.sector) << 24);
        let word1 = u32::from(original.cylinder);
        let word2 = (u32::from(original.head) << 16)
            | (u32::from(original.drv) << 20)
            | (u32::from(original.lba) << 22)
            | (u32::from(original.cmd) << 24);

        let decoded = decode([word0, word1, word2]);
        assert_eq!(decoded.features, original.features);
        assert_eq!(decoded.sector_count, original.sector_count);
        assert_eq!(decoded.sector, original.sector);
        assert_eq!(decoded.cylinder, original.cylinder);
        assert_eq!(decoded.head, original.head);
        assert_eq!(decoded.drv, original.drv);
        assert_eq!(decoded.lba, original.lba);
        assert_eq!(decoded.cmd, original.cmd);
    }

    #[test]
    fn lba28_round_trips_through_accessors() {
        let mut regs = Regs::default();
        regs.set_lba28(0x0A_BCDE_F);
        assert_eq!(regs.lba28(), 0x0A_BCDE_F);
    }
}
