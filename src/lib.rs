//! An emulated IDE (ATA/ATAPI) disk controller back-end: interprets task-file register
//! snapshots and data-phase events from a hardware front-end, serving ATA commands
//! against host-side hard disk images and ATAPI/SCSI-over-ATA packet commands against
//! CD-ROM images.
//!
//! The crate owns no hardware: [`bus::RegisterWindow`] and [`bus::ImageFile`] are the
//! only transports in or out, implemented by the embedding dispatcher.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod atapi;
pub mod block;
pub mod bus;
pub mod cd;
pub mod channel;
pub mod drive;
pub mod errors;
pub mod identify;
pub mod iso;
pub mod log;
pub mod mount;
pub mod regs;
pub mod wire;

use alloc::boxed::Box;

pub use bus::{ConfigRegister, ImageFile, ProtocolVersion, RegisterWindow};
pub use channel::{Channel, ChannelState};
pub use drive::Drive;
pub use errors::Error;
pub use log::Logger;
pub use regs::Request;

/// The two IDE channels (primary, secondary), the crate's single owned piece of state.
/// Constructed once by the embedder and threaded through by `&mut` (§3.1): no interrupt
/// handler, global, or lock lives inside this crate.
pub struct IdeController {
    pub channels: [Channel; 2],
}

impl IdeController {
    /// A freshly reset controller: both channels idle with both drive slots absent.
    ///
    /// # Returns
    ///
    /// * `Self` - A new controller.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: [Channel::new(), Channel::new()],
        }
    }

    /// Routes one hardware event to the addressed channel's state machine (§5).
    ///
    /// # Arguments
    ///
    /// * `channel_index` - The addressed channel's ordinal (0 = primary, 1 = secondary).
    /// * `req` - The request kind.
    /// * `base` - The channel's register-window base address.
    /// * `window` - The hardware register-window transport.
    /// * `logger` - The diagnostic logger for unsupported/unexpected commands.
    pub fn on_request(
        &mut self,
        channel_index: u8,
        req: Request,
        base: u32,
        window: &mut dyn RegisterWindow,
        logger: &dyn Logger,
    ) {
        self.channels[usize::from(channel_index & 1)].on_request(req, base, window, logger);
    }

    /// Mounts (or unmounts, if `image` is `None`) an image file on the given channel/slot
    /// (§6). `drv` is honored only under [`ProtocolVersion::V3`].
    ///
    /// # Arguments
    ///
    /// * `channel_index` - The addressed channel's ordinal (0 = primary, 1 = secondary).
    /// * `drv` - The requested master/slave slot.
    /// * `base` - The channel's register-window base address.
    /// * `image` - The image file to mount, or `None` to clear the slot.
    /// * `ver` - The protocol version in effect.
    /// * `window` - The hardware register-window transport to program.
    pub fn mount(
        &mut self,
        channel_index: u8,
        drv: u8,
        base: u32,
        image: Option<Box<dyn ImageFile>>,
        ver: ProtocolVersion,
        window: &mut dyn RegisterWindow,
    ) {
        let idx = usize::from(channel_index & 1);
        mount::mount(&mut self.channels[idx], channel_index, drv, base, image, ver, window);
    }
}

impl Default for IdeController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{ConfigRegister as Cfg, ProtocolVersion as Ver};

    struct FakeWindow;
    impl RegisterWindow for FakeWindow {
        fn send_regs(&mut self, _base: u32, _words: [u32; 3]) {}
        fn recv_regs(&mut self, _base: u32) -> [u32; 3] {
            [0; 3]
        }
        fn send_data(&mut self, _base: u32, _words: &[u32]) {}
        fn recv_data(&mut self, _base: u32, _words: &mut [u32]) {}
        fn write_cfg(&mut self, _base: u32, _reg: Cfg, _value: u32, _ver: Ver) {}
        fn reset_buf(&mut self, _base: u32) {}
    }

    #[test]
    fn new_controller_has_two_absent_channels() {
        let controller = IdeController::new();
        assert!(!controller.channels[0].drives[0].present);
        assert!(!controller.channels[1].drives[0].present);
    }

    #[test]
    fn unmounting_leaves_drive_absent() {
        let mut controller = IdeController::new();
        let mut window = FakeWindow;
        controller.mount(0, 0, 0, None, Ver::V3, &mut window);
        assert!(!controller.channels[0].drives[0].present);
    }
}
