//! The per-channel state machine (§4.2, §4.5, §4.6): dispatches hardware requests
//! (COMMAND, DATA, RESET, the idle poll) into ATA or ATAPI command handling, driving an
//! explicit suspension-point state machine instead of blocking or async/await.

use crate::atapi;
use crate::block;
use crate::bus::RegisterWindow;
use crate::drive::{new_scratch_buffer, Drive};
use crate::identify::pack_words;
use crate::log::Logger;
use crate::regs::{self, error, status, Regs, Request};
use crate::wire;
use crate::{ata_trace, atapi_trace};

/// A channel's current suspension point. Requests (§5) resume the state machine from
/// wherever it last yielded; there is no blocking wait anywhere in this crate.
///
/// # Variants
///
/// * `Idle` - No command in flight.
/// * `Reset` - RESET is asserted; waiting for the NOP that advances to `Idle`.
/// * `InitRw` - A read or write command was just accepted; the first chunk has not
///   yet been transferred.
/// * `WaitRd` - Waiting for the DATA request that pulls the next HDD read chunk.
/// * `WaitWr` - Waiting for the DATA request that pushes the next HDD write chunk.
/// * `WaitEnd` - The transfer is complete; waiting for the closing DATA request.
/// * `WaitPktCmd` - Waiting for the DATA request that delivers the 12-byte ATAPI packet.
/// * `WaitPktRd` - Waiting for the DATA request that pulls the next ATAPI read chunk.
/// * `WaitPktEnd` - Named in the register protocol but never reached by any transition
///   in this crate or in the hardware it was modeled on — packet reads always resolve
///   through `WaitPktRd`. Kept for fidelity to the protocol's state enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Reset,
    InitRw,
    WaitRd,
    WaitWr,
    WaitEnd,
    WaitPktCmd,
    WaitPktRd,
    WaitPktEnd,
}

/// One IDE channel: its register snapshot, up to two drive slots, and the scratch
/// buffer used for in-flight transfers. Channels share no mutable state (§5) — each
/// owns its buffer rather than drawing from a process-wide pool.
pub struct Channel {
    pub state: ChannelState,
    pub regs: Regs,
    pub drives: [Drive; 2],
    buffer: alloc::vec::Vec<u8>,
    prepcnt: u32,
    null: bool,
    cd_cursor: u64,
}

impl Channel {
    /// A freshly reset channel: both drive slots absent, idle state, a zeroed scratch
    /// buffer.
    ///
    /// # Returns
    ///
    /// * `Self` - A new, idle channel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ChannelState::Idle,
            regs: Regs::default(),
            drives: [Drive::absent(), Drive::absent()],
            buffer: new_scratch_buffer(),
            prepcnt: 0,
            null: false,
            cd_cursor: 0,
        }
    }

    /// Handles one hardware request against the current state (§5's `on_request`).
    ///
    /// # Arguments
    ///
    /// * `req` - The request kind, selecting which phase of the state machine runs.
    /// * `base` - The channel's register-window base address.
    /// * `window` - The hardware register-window transport.
    /// * `logger` - The diagnostic logger for unsupported/unexpected commands.
    pub fn on_request(
        &mut self,
        req: Request,
        base: u32,
        window: &mut dyn RegisterWindow,
        logger: &dyn Logger,
    ) {
        match req {
            Request::Nop => self.handle_nop(base, window),
            Request::Command => self.handle_command(base, window, logger),
            Request::Data => self.handle_data(base, window, logger),
            Request::Reset => self.handle_reset(base, window),
        }
    }

    fn publish(&mut self, base: u32, window: &mut dyn RegisterWindow) {
        let is_cd = self.drives[self.regs.drv as usize].cd;
        let words = regs::encode(is_cd, &mut self.regs);
        window.send_regs(base, words);
    }

    fn handle_nop(&mut self, base: u32, window: &mut dyn RegisterWindow) {
        if self.state == ChannelState::Reset {
            self.state = ChannelState::Idle;
            self.regs.status = status::RDY;
            self.publish(base, window);
        }
    }

    fn handle_reset(&mut self, base: u32, window: &mut dyn RegisterWindow) {
        let words = window.recv_regs(base);
        self.regs = regs::decode(words);
        self.regs.head = 0;
        self.regs.error = 0;
        self.regs.sector = 1;
        self.regs.sector_count = 1;

        let drive = &self.drives[self.regs.drv as usize];
        self.regs.cylinder = if !drive.present {
            0xFFFF
        } else if drive.cd {
            0xEB14
        } else {
            0x0000
        };
        if drive.placeholder {
            self.regs.cylinder = 0xEB14;
        }
        self.regs.status = status::BSY;
        self.publish(base, window);
        self.state = ChannelState::Reset;
    }

    fn handle_command(&mut self, base: u32, window: &mut dyn RegisterWindow, logger: &dyn Logger) {
        self.state = ChannelState::Idle;
        let words = window.recv_regs(base);
        self.regs = regs::decode(words);

        let drv = self.regs.drv as usize;
        let err = if self.drives[drv].cd {
            self.handle_cd_command(base, window, logger)
        } else if !self.drives[drv].present {
            true
        } else {
            self.handle_ata_command(base, window, logger)
        };

        if err {
            self.regs.status = status::RDY | status::ERR | status::IRQ;
            self.regs.error = error::ABRT;
            self.publish(base, window);
        }
    }

    fn handle_data(&mut self, base: u32, window: &mut dyn RegisterWindow, logger: &dyn Logger) {
        match self.state {
            ChannelState::WaitEnd => {
                self.state = ChannelState::Idle;
                self.regs.status = status::RDY;
                self.publish(base, window);
            }
            ChannelState::WaitRd => self.process_read(base, window),
            ChannelState::WaitWr => {
                self.process_write(window, base);
                if self.regs.sector_count != 0 {
                    self.prep_write(base, window);
                } else {
                    self.state = ChannelState::Idle;
                    self.regs.status = status::RDY;
                    self.publish(base, window);
                }
            }
            ChannelState::WaitPktCmd => self.process_pkt_cmd(base, window, logger),
            ChannelState::WaitPktRd => {
                if self.regs.pkt_cnt != 0 {
                    self.process_cd_read(base, window);
                } else {
                    self.state = ChannelState::Idle;
                    self.regs.sector_count = 3;
                    self.regs.status = status::RDY | status::IRQ;
                    self.regs.error = 0;
                    self.publish(base, window);
                }
            }
            ChannelState::Idle | ChannelState::Reset | ChannelState::InitRw | ChannelState::WaitPktEnd => {
                self.state = ChannelState::Idle;
                self.regs.status = status::RDY | status::ERR | status::IRQ;
                self.regs.error = error::ABRT;
                self.publish(base, window);
            }
        }
    }

    // --- ATA (HDD) command handling (§4.4) -----------------------------------------

    fn handle_ata_command(
        &mut self,
        base: u32,
        window: &mut dyn RegisterWindow,
        logger: &dyn Logger,
    ) -> bool {
        match self.regs.cmd {
            0xEC => {
                let drv = self.regs.drv;
                let words = pack_words(&self.drives[drv as usize].identify);
                window.send_data(base, &words);
                self.regs = Regs {
                    drv,
                    io_size: 1,
                    status: status::RDY | status::DRQ | status::IRQ,
                    ..Regs::default()
                };
                self.publish(base, window);
                self.state = ChannelState::WaitEnd;
                false
            }
            0x20 | 0x21 | 0xC4 => {
                if !self.regs.lba {
                    ata_trace!(logger, "unsupported non-LBA read");
                    return true;
                }
                self.state = ChannelState::InitRw;
                self.null = false;
                self.process_read(base, window);
                false
            }
            0x30 | 0x31 | 0xC5 => {
                if !self.regs.lba {
                    ata_trace!(logger, "unsupported non-LBA write");
                    return true;
                }
                self.state = ChannelState::InitRw;
                self.null = false;
                self.prep_write(base, window);
                false
            }
            0xC6 => {
                if self.regs.sector_count == 0 || u32::from(self.regs.sector_count) > block::IO_MAX_SECTORS {
                    return true;
                }
                self.regs.status = status::RDY;
                self.publish(base, window);
                false
            }
            0x08 => {
                ata_trace!(logger, "reset not supported on HDD path");
                true
            }
            _ => {
                ata_trace!(logger, "unsupported command {:#04x}", self.regs.cmd);
                true
            }
        }
    }

    fn process_read(&mut self, base: u32, window: &mut dyn RegisterWindow) {
        let lba = self.regs.lba28();
        let cnt = block::hdd_chunk(self.regs.sector_count);
        let drv = self.regs.drv as usize;
        let len = (cnt as usize) * 512;

        if !self.null {
            let image = &mut self.drives[drv].image;
            self.null = !(block::seek(image, u64::from(lba) * 512) && block::read(image, &mut self.buffer[..len]));
        }
        if self.null {
            self.buffer[..len].fill(0);
        }

        window.send_data(base, &wire::pack_le_words(&self.buffer[..len]));

        let new_lba = lba.wrapping_add(cnt);
        self.regs.sector_count = self.regs.sector_count.wrapping_sub(cnt as u8);
        self.regs.set_lba28(new_lba);

        self.state = if self.regs.sector_count != 0 {
            ChannelState::WaitRd
        } else {
            ChannelState::WaitEnd
        };
        self.regs.io_size = cnt as u8;
        self.regs.status = status::RDY | status::DRQ | status::IRQ;
        self.publish(base, window);
    }

    fn prep_write(&mut self, base: u32, window: &mut dyn RegisterWindow) {
        let cnt = block::hdd_chunk(self.regs.sector_count);
        self.prepcnt = cnt;
        self.regs.status = status::RDY | status::DRQ | status::IRQ;

        let lba = self.regs.lba28();
        let drv = self.regs.drv as usize;
        if !self.null {
            self.null = !block::seek(&mut self.drives[drv].image, u64::from(lba) * 512);
        }
        if self.state == ChannelState::InitRw {
            self.regs.status &= !status::IRQ;
        }

        self.state = ChannelState::WaitWr;
        self.regs.io_size = self.prepcnt as u8;
        self.publish(base, window);
    }

    fn process_write(&mut self, window: &mut dyn RegisterWindow, base: u32) {
        let len = (self.prepcnt as usize) * 512;
        let mut words = alloc::vec![0u32; len / 4];
        window.recv_data(base, &mut words);
        let bytes = wire::unpack_le_words(&words, len);
        self.buffer[..len].copy_from_slice(&bytes);

        let drv = self.regs.drv as usize;
        if !self.null {
            self.null = !block::write(&mut self.drives[drv].image, &self.buffer[..len]);
        }

        let lba = self.regs.lba28().wrapping_add(self.prepcnt);
        self.regs.sector_count = self.regs.sector_count.wrapping_sub(self.prepcnt as u8);
        self.regs.set_lba28(lba);
    }

    // --- ATAPI (CD) command handling (§4.5, §4.6) ----------------------------------

    fn handle_cd_command(
        &mut self,
        base: u32,
        window: &mut dyn RegisterWindow,
        logger: &dyn Logger,
    ) -> bool {
        match self.regs.cmd {
            0xA1 => {
                let drv = self.regs.drv;
                let words = pack_words(&self.drives[drv as usize].identify);
                window.send_data(base, &words);
                self.regs = Regs {
                    drv,
                    pkt_io_size: 256,
                    status: status::RDY | status::DRQ | status::IRQ,
                    ..Regs::default()
                };
                self.publish(base, window);
                self.state = ChannelState::WaitEnd;
                false
            }
            0xEC => {
                self.regs.sector = 1;
                self.regs.sector_count = 1;
                self.regs.cylinder = 0xEB14;
                self.regs.head = 0;
                self.regs.io_size = 0;
                true
            }
            0xA0 => {
                self.regs.pkt_size_limit = if self.regs.cylinder == 0 {
                    block::IO_MAX_SECTORS * 512
                } else {
                    u32::from(self.regs.cylinder)
                };
                self.regs.pkt_io_size = 6;
                self.regs.sector_count = 1;
                self.regs.status = status::RDY | status::DRQ;
                self.publish(base, window);
                self.state = ChannelState::WaitPktCmd;
                false
            }
            0x08 => {
                self.regs.sector = 1;
                self.regs.sector_count = 1;
                self.regs.cylinder = 0xEB14;
                self.regs.head = 0;
                self.regs.io_size = 0;
                self.regs.status = status::RDY;
                self.publish(base, window);
                false
            }
            0x00 => true,
            _ => {
                atapi_trace!(logger, "unsupported command {:#04x}", self.regs.cmd);
                true
            }
        }
    }

    fn process_pkt_cmd(&mut self, base: u32, window: &mut dyn RegisterWindow, logger: &dyn Logger) {
        let mut words = [0u32; 3];
        window.recv_data(base, &mut words);
        window.reset_buf(base);

        let cmdbuf = wire::unpack_le_words(&words, 12);
        self.regs.pkt_cnt = 0;
        let mut err = false;

        match cmdbuf[0] {
            0x28 => {
                self.regs.pkt_cnt = (u32::from(cmdbuf[7]) << 8) | u32::from(cmdbuf[8]);
                self.regs.pkt_lba = (u32::from(cmdbuf[2]) << 24)
                    | (u32::from(cmdbuf[3]) << 16)
                    | (u32::from(cmdbuf[4]) << 8)
                    | u32::from(cmdbuf[5]);

                if self.regs.pkt_cnt == 0 {
                    self.state = ChannelState::Idle;
                    self.regs.sector_count = 3;
                    self.regs.status = status::RDY | status::IRQ;
                    self.regs.error = 0;
                    self.publish(base, window);
                } else {
                    self.state = ChannelState::InitRw;
                    let drv = self.regs.drv as usize;
                    if self.drives[drv].load_state == 0 {
                        let sector_size = self.drives[drv].tracks[0].sector_size;
                        self.cd_cursor = u64::from(self.regs.pkt_lba) * u64::from(sector_size);
                        self.null = !block::seek(&mut self.drives[drv].image, self.cd_cursor);
                        self.process_cd_read(base, window);
                    } else {
                        self.cd_err_no_medium(base, window);
                    }
                }
            }
            0x25 => {
                let drv = self.regs.drv as usize;
                if self.drives[drv].load_state == 0 {
                    let size = self.drives[drv].file_size();
                    let data = atapi::read_capacity(size);
                    self.pkt_send(base, window, &data);
                } else {
                    self.cd_err_no_medium(base, window);
                }
            }
            0x5A => {
                let data = atapi::mode_sense(cmdbuf[2]);
                self.pkt_send(base, window, &data);
            }
            0x42 => {
                let drv = self.regs.drv as usize;
                let data = atapi::read_subchannel(&cmdbuf, &self.drives[drv].tracks);
                self.pkt_send(base, window, &data);
            }
            0x43 => {
                let drv = self.regs.drv as usize;
                let data = atapi::read_toc(&cmdbuf, &self.drives[drv].tracks);
                self.pkt_send(base, window, &data);
            }
            0x12 => {
                let data = atapi::inquiry(cmdbuf[4]);
                self.pkt_send(base, window, &data);
            }
            0x03 => {
                let drv = self.regs.drv as usize;
                let data = atapi::sense(&mut self.drives[drv].load_state);
                self.pkt_send(base, window, &data);
            }
            0x00 => {
                let drv = self.regs.drv as usize;
                if self.drives[drv].load_state == 0 {
                    self.state = ChannelState::Idle;
                    self.regs.sector_count = 3;
                    self.regs.status = status::RDY | status::IRQ;
                    self.regs.error = 0;
                    self.publish(base, window);
                } else {
                    self.cd_err_no_medium(base, window);
                }
            }
            op => {
                atapi_trace!(logger, "unsupported packet opcode {:#04x}", op);
                err = true;
            }
        }

        if err {
            self.state = ChannelState::Idle;
            self.regs.sector_count = 3;
            self.regs.status = status::RDY | status::ERR | status::IRQ;
            self.regs.error = error::ABRT;
            self.publish(base, window);
        }
    }

    fn cd_err_no_medium(&mut self, base: u32, window: &mut dyn RegisterWindow) {
        self.state = ChannelState::Idle;
        self.regs.sector_count = 3;
        self.regs.status = status::RDY | status::ERR | status::IRQ;
        self.regs.error = (2 << 4) | error::ABRT;
        self.publish(base, window);
    }

    fn process_cd_read(&mut self, base: u32, window: &mut dyn RegisterWindow) {
        let mut cnt = self.regs.pkt_cnt;
        if cnt * 4 > block::IO_MAX_SECTORS {
            cnt = block::IO_MAX_SECTORS / 4;
        }
        while cnt * 2048 > self.regs.pkt_size_limit {
            if cnt <= 1 {
                break;
            }
            cnt -= 1;
        }

        let drv = self.regs.drv as usize;
        let sector_size = self.drives[drv].tracks[0].sector_size;
        let mode2 = self.drives[drv].tracks[0].mode2;
        let len = (cnt as usize) * 2048;

        block::read_cd_sectors(
            &mut self.drives[drv].image,
            sector_size,
            mode2,
            cnt,
            &mut self.cd_cursor,
            &mut self.null,
            &mut self.buffer[..len],
        );

        self.regs.pkt_cnt -= cnt;
        let data = self.buffer[..len].to_vec();
        self.pkt_send(base, window, &data);
    }

    fn pkt_send(&mut self, base: u32, window: &mut dyn RegisterWindow, data: &[u8]) {
        window.send_data(base, &wire::pack_le_words(data));
        let size = data.len() as u16;
        self.regs.pkt_io_size = (size + 1) / 2;
        self.regs.cylinder = size;
        self.regs.sector_count = 2;
        self.regs.status = status::RDY | status::DRQ | status::IRQ;
        self.publish(base, window);
        self.state = ChannelState::WaitPktRd;
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{ConfigRegister, ProtocolVersion};
    use crate::identify::build_hdd;
    use crate::log::NullLogger;

    struct FakeWindow {
        regs: [u32; 3],
        data: alloc::vec::Vec<u32>,
        recv_queue: alloc::vec::Vec<u32>,
    }

    impl FakeWindow {
        fn new() -> Self {
            Self {
                regs: [0; 3],
                data: alloc::vec::Vec::new(),
                recv_queue: alloc::vec::Vec::new(),
            }
        }
    }

    impl RegisterWindow for FakeWindow {
        fn send_regs(&mut self, _base: u32, words: [u32; 3]) {
            self.regs = words;
        }
        fn recv_regs(&mut self, _base: u32) -> [u32; 3] {
            self.regs
        }
        fn send_data(&mut self, _base: u32, words: &[u32]) {
            self.data = words.to_vec();
        }
        fn recv_data(&mut self, _base: u32, words: &mut [u32]) {
            let n = words.len().min(self.recv_queue.len());
            words[..n].copy_from_slice(&self.recv_queue[..n]);
        }
        fn write_cfg(&mut self, _base: u32, _reg: ConfigRegister, _value: u32, _ver: ProtocolVersion) {}
        fn reset_buf(&mut self, _base: u32) {}
    }

    #[test]
    fn reset_then_nop_brings_channel_to_idle() {
        let mut channel = Channel::new();
        channel.drives[0] = Drive::absent();
        let mut window = FakeWindow::new();
        let logger = NullLogger;

        channel.on_request(Request::Reset, 0, &mut window, &logger);
        assert_eq!(channel.state, ChannelState::Reset);
        assert_eq!(channel.regs.cylinder, 0xFFFF);

        channel.on_request(Request::Nop, 0, &mut window, &logger);
        assert_eq!(channel.state, ChannelState::Idle);
        assert_eq!(channel.regs.status, status::RDY);
    }

    #[test]
    fn identify_command_on_absent_drive_fails() {
        let mut channel = Channel::new();
        let mut window = FakeWindow::new();
        let logger = NullLogger;
        window.regs = [0, 0, 0xEC << 24];
        channel.on_request(Request::Command, 0, &mut window, &logger);
        assert_eq!(channel.regs.status & status::ERR, status::ERR);
        assert_eq!(channel.regs.error, error::ABRT);
    }

    #[test]
    fn identify_command_on_present_hdd_sends_identify_block() {
        let mut channel = Channel::new();
        let mut drive = Drive::absent();
        drive.present = true;
        drive.identify = build_hdd(&crate::drive::Geometry { cylinders: 10, heads: 16, spt: 63, total_sectors: 1000 }, "disk.img");
        channel.drives[0] = drive;

        let mut window = FakeWindow::new();
        let logger = NullLogger;
        window.regs = [0, 0, 0xEC << 24];
        channel.on_request(Request::Command, 0, &mut window, &logger);

        assert_eq!(window.data.len(), 128);
        assert_eq!(channel.state, ChannelState::WaitEnd);
        assert_eq!(channel.regs.status & status::DRQ, status::DRQ);
    }
}
