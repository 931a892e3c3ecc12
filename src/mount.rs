//! The mount operation (§6): the front door that binds (or clears) an image file to a
//! drive slot, derives its role (HDD/CD/placeholder), and programs the hardware's
//! geometry and identify config registers. This is the one place outside [`crate::channel`]
//! that touches [`crate::bus::RegisterWindow::write_cfg`].

use alloc::boxed::Box;

use crate::bus::{ConfigRegister, ImageFile, ProtocolVersion, RegisterWindow};
use crate::channel::Channel;
use crate::drive::{build_tracks, hdd_geometry, Geometry, Track};
use crate::identify::{build_cd, build_hdd, pack_words};
use crate::iso;

/// Binds `image` (or clears the slot, if `None`) to a drive on `channel`.
///
/// `drv_hint` selects master/slave and is honored only under [`ProtocolVersion::V3`] —
/// earlier protocol versions address a single drive per channel (slot 0). `channel_index`
/// is the IDE channel's own ordinal (0 = primary, 1 = secondary); only the secondary
/// channel's slot 0 carries CD-ROM placeholder semantics, matching a PC's conventional
/// primary-master-HDD / secondary-master-CDROM wiring.
///
/// # Arguments
///
/// * `channel` - The channel to mount onto.
/// * `channel_index` - The channel's own ordinal (0 = primary, 1 = secondary).
/// * `drv_hint` - The requested master/slave slot; honored only under [`ProtocolVersion::V3`].
/// * `base` - The channel's register-window base address.
/// * `image` - The image file to mount, or `None` to clear the slot.
/// * `ver` - The protocol version in effect, which selects the register layout and
///   whether ISO detection and dual-drive addressing apply.
/// * `window` - The hardware register-window transport to program.
pub fn mount(
    channel: &mut Channel,
    channel_index: u8,
    drv_hint: u8,
    base: u32,
    image: Option<Box<dyn ImageFile>>,
    ver: ProtocolVersion,
    window: &mut dyn RegisterWindow,
) {
    let drv = if ver == ProtocolVersion::V3 {
        usize::from(drv_hint & 1)
    } else {
        0
    };

    let mut image = image;
    let mut present = image.is_some();

    let iso_layout = if present && ver == ProtocolVersion::V3 && channel_index != 0 {
        image.as_deref_mut().and_then(iso::check_iso_file)
    } else {
        None
    };
    let mut cd = iso_layout.is_some();

    let was_placeholder = channel.drives[drv].placeholder;
    if ver == ProtocolVersion::V3 && was_placeholder && present && !cd {
        // A CD-only slot rejects a freshly hot-mounted image that doesn't parse as a
        // disc; keep reporting the empty tray rather than exposing a foreign image.
        image = None;
        present = false;
    }

    let mut placeholder = channel_index != 0 && drv == 0;
    if present && !cd {
        placeholder = false;
    } else if placeholder {
        cd = true;
    }

    {
        let slot = &mut channel.drives[drv];
        slot.image = image;
        slot.present = present;
        slot.cd = cd;
        slot.placeholder = placeholder;
        slot.load_state = if present { 1 } else { 3 };

        if cd {
            slot.geometry = Geometry::default();
            slot.tracks = match iso_layout {
                Some((sector_size, mode2)) => {
                    let file_size = slot.file_size();
                    let length = (file_size / u64::from(sector_size)) as u32;
                    build_tracks(sector_size, mode2, length)
                }
                None => {
                    let mut tracks = [Track::default(); 2];
                    tracks[0].attr = 0x40;
                    tracks
                }
            };
        } else {
            slot.tracks = [Track::default(); 2];
            slot.geometry = if present {
                hdd_geometry(slot.file_size(), ver == ProtocolVersion::V3)
            } else {
                Geometry::default()
            };
        }
    }

    write_cfg_mount_bits(channel, base, ver, window);

    if ver != ProtocolVersion::V3 && !channel.drives[0].present {
        window.write_cfg(base, ConfigRegister::MountBits, 0, ver);
        return;
    }

    // Identify blocks are rebuilt for both slots: the slot just mounted changed shape,
    // and the sibling slot's block must still be republished so the channel's pair of
    // identify buffers stay internally consistent after any single mount.
    for slot_drive in &mut channel.drives {
        let leaf_name = if slot_drive.present {
            slot_drive.image.as_deref().map_or("", ImageFile::name)
        } else {
            ""
        };
        slot_drive.identify = if slot_drive.cd {
            build_cd(leaf_name)
        } else {
            build_hdd(&slot_drive.geometry, leaf_name)
        };
    }

    if ver != ProtocolVersion::V3 {
        for word in pack_words(&channel.drives[0].identify) {
            window.write_cfg(base, ConfigRegister::IdentifyBlock, word, ver);
        }
    }

    let geometry = channel.drives[drv].geometry;
    window.write_cfg(base, ConfigRegister::Cylinders, u32::from(geometry.cylinders), ver);
    window.write_cfg(base, ConfigRegister::Heads, u32::from(geometry.heads), ver);
    window.write_cfg(base, ConfigRegister::SectorsPerTrack, u32::from(geometry.spt), ver);
    window.write_cfg(
        base,
        ConfigRegister::HeadsTimesSpt,
        u32::from(geometry.heads) * u32::from(geometry.spt),
        ver,
    );
    // Written as the geometry product, not the stored `total_sectors` field — a
    // deliberate quirk preserved from the source, which the two only agree on when the
    // drive's capacity divides evenly into whole cylinders.
    window.write_cfg(
        base,
        ConfigRegister::TotalSectors,
        u32::from(geometry.spt) * u32::from(geometry.heads) * u32::from(geometry.cylinders),
        ver,
    );

    window.write_cfg(base, ConfigRegister::MountBits, 0, ver);
}

fn write_cfg_mount_bits(channel: &Channel, base: u32, ver: ProtocolVersion, window: &mut dyn RegisterWindow) {
    let mut bits = 0u32;
    for (i, drive) in channel.drives.iter().enumerate() {
        if drive.present {
            bits |= 1 << (i * 2);
        }
        if drive.cd {
            bits |= 1 << (i * 2 + 1);
        }
    }
    window.write_cfg(base, ConfigRegister::MountBits, bits, ver);
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    struct FakeImage {
        data: Vec<u8>,
        pos: usize,
        name: alloc::string::String,
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
        fn write(&mut self, _buf: &[u8]) -> Result<(), ()> {
            Err(())
        }
        fn size(&self) -> u64 {
            self.data.len() as u64
        }
        fn name(&self) -> &str {
            &self.name
        }
    }

    struct FakeWindow {
        cfg_calls: Vec<(ConfigRegister, u32)>,
    }

    impl FakeWindow {
        fn new() -> Self {
            Self { cfg_calls: Vec::new() }
        }
    }

    impl RegisterWindow for FakeWindow {
        fn send_regs(&mut self, _base: u32, _words: [u32; 3]) {}
        fn recv_regs(&mut self, _base: u32) -> [u32; 3] {
            [0; 3]
        }
        fn send_data(&mut self, _base: u32, _words: &[u32]) {}
        fn recv_data(&mut self, _base: u32, _words: &mut [u32]) {}
        fn write_cfg(&mut self, _base: u32, reg: ConfigRegister, value: u32, _ver: ProtocolVersion) {
            self.cfg_calls.push((reg, value));
        }
        fn reset_buf(&mut self, _base: u32) {}
    }

    #[test]
    fn mounting_hdd_image_computes_geometry() {
        let mut channel = Channel::new();
        let mut window = FakeWindow::new();
        let image = FakeImage {
            data: alloc::vec![0u8; 1_048_576_000],
            pos: 0,
            name: "disk.img".into(),
        };

        mount(
            &mut channel,
            0,
            0,
            0,
            Some(Box::new(image)),
            ProtocolVersion::V3,
            &mut window,
        );

        let drive = &channel.drives[0];
        assert!(drive.present);
        assert!(!drive.cd);
        assert_eq!(drive.geometry.total_sectors, 2_048_000);
        assert_eq!(drive.geometry.heads, 16);
        assert_eq!(drive.geometry.cylinders, 2_031);
    }

    #[test]
    fn secondary_channel_slot_zero_is_cd_placeholder_when_empty() {
        let mut channel = Channel::new();
        let mut window = FakeWindow::new();

        mount(&mut channel, 1, 0, 0, None, ProtocolVersion::V3, &mut window);

        let drive = &channel.drives[0];
        assert!(!drive.present);
        assert!(drive.placeholder);
        assert!(drive.cd);
        assert_eq!(drive.load_state, 3);
    }

    #[test]
    fn mounting_iso_on_secondary_master_is_recognized_as_cd() {
        let mut channel = Channel::new();
        let mut window = FakeWindow::new();

        let mut data = alloc::vec![0u8; 16 * 2048 + 2048];
        let pvd = 16 * 2048;
        data[pvd] = 1;
        data[pvd + 1..pvd + 6].copy_from_slice(b"CD001");
        data[pvd + 6] = 1;
        let image = FakeImage { data, pos: 0, name: "game.iso".into() };

        mount(
            &mut channel,
            1,
            0,
            0,
            Some(Box::new(image)),
            ProtocolVersion::V3,
            &mut window,
        );

        let drive = &channel.drives[0];
        assert!(drive.present);
        assert!(drive.cd);
        assert_eq!(drive.tracks[0].sector_size, 2048);
        assert_eq!(drive.load_state, 1);
        // `placeholder` stays set alongside `present` for a recognized CD image on the
        // channel's CD slot (§3's documented exception) — it marks "this is the CD slot",
        // not "no media is loaded"; `present`/`cd` are what actually gate behavior.
        assert!(drive.placeholder);
    }
}
