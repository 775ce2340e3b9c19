//! Driver for the Xilinx AXI GPIO IP core.
//!
//! The core has up to two 32-bit channels, each with a data and a tristate
//! register, plus a three-register interrupt block: a global enable (GIER),
//! a per-channel enable (IP IER) and a toggle-on-write status register
//! (IP ISR). Interrupts fire on input transitions of an enabled channel.

use bitflags::bitflags;
use log::debug;

use crate::mapping::Registers;

/// Channel 1 data register.
pub const GPIO_DATA: usize = 0x0000;
/// Channel 1 tristate register. A set bit configures the pin as an input.
pub const GPIO_TRI: usize = 0x0004;
/// Channel 2 data register.
pub const GPIO2_DATA: usize = 0x0008;
/// Channel 2 tristate register.
pub const GPIO2_TRI: usize = 0x000C;
/// Global interrupt enable register. Only bit 31 is implemented.
pub const GIER: usize = 0x011C;
/// IP interrupt status register. Toggle-on-write: writing a set bit flips it.
pub const IP_ISR: usize = 0x0120;
/// IP interrupt enable register, one bit per channel.
pub const IP_IER: usize = 0x0128;

/// Master enable bit in GIER.
const GIER_ENABLE: u32 = 1 << 31;

bitflags! {
    /// Per-channel interrupt bits, as laid out in IP IER and IP ISR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Channels: u32 {
        const CH1 = 1 << 0;
        const CH2 = 1 << 1;
    }
}

/// One of the core's two GPIO channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    One,
    Two,
}

impl Channel {
    fn data_offset(self) -> usize {
        match self {
            Channel::One => GPIO_DATA,
            Channel::Two => GPIO2_DATA,
        }
    }

    fn tri_offset(self) -> usize {
        match self {
            Channel::One => GPIO_TRI,
            Channel::Two => GPIO2_TRI,
        }
    }

    /// The channel's bit in [`Channels`].
    pub fn interrupt(self) -> Channels {
        match self {
            Channel::One => Channels::CH1,
            Channel::Two => Channels::CH2,
        }
    }
}

/// AXI GPIO register block over any [`Registers`] implementation, usually a
/// [`Mapping`](crate::Mapping) of the core's UIO region.
pub struct AxiGpio<R> {
    regs: R,
}

impl<R: Registers> AxiGpio<R> {
    pub fn new(regs: R) -> AxiGpio<R> {
        AxiGpio { regs }
    }

    /// Returns the current value of a channel's data register.
    ///
    /// For pins configured as inputs this samples the pin state.
    pub fn read(&self, channel: Channel) -> u32 {
        self.regs.read32(channel.data_offset())
    }

    /// Drives a channel's output pins. Bits configured as inputs ignore this.
    pub fn write(&self, channel: Channel, value: u32) {
        self.regs.write32(channel.data_offset(), value)
    }

    /// Configures a channel's pin directions: a set bit makes the pin an
    /// input, a clear bit an output.
    pub fn set_direction(&self, channel: Channel, inputs: u32) {
        self.regs.write32(channel.tri_offset(), inputs)
    }

    /// Enables interrupt generation for `channels`, then the global enable.
    pub fn enable_interrupts(&self, channels: Channels) {
        debug!("enabling GPIO interrupts for {channels:?}");
        self.regs.modify32(IP_IER, |ier| ier | channels.bits());
        self.regs.write32(GIER, GIER_ENABLE);
    }

    /// Disables interrupt generation for `channels`. The global enable is
    /// cleared once no channel remains enabled.
    pub fn disable_interrupts(&self, channels: Channels) {
        debug!("disabling GPIO interrupts for {channels:?}");
        self.regs.modify32(IP_IER, |ier| ier & !channels.bits());
        if self.regs.read32(IP_IER) & Channels::all().bits() == 0 {
            self.regs.write32(GIER, 0);
        }
    }

    /// Channels with a latched, unacknowledged interrupt.
    pub fn pending(&self) -> Channels {
        Channels::from_bits_truncate(self.regs.read32(IP_ISR))
    }

    /// Acknowledges interrupts on `channels`, returning the ones that were
    /// actually pending.
    ///
    /// The ISR toggles on write, so only bits currently reading as pending
    /// are written back; acknowledging an idle channel must not raise a
    /// spurious interrupt.
    pub fn clear_pending(&self, channels: Channels) -> Channels {
        let acked = self.pending() & channels;
        if !acked.is_empty() {
            self.regs.write32(IP_ISR, acked.bits());
        }
        acked
    }

    /// Consumes the driver and returns the underlying register window.
    pub fn into_inner(self) -> R {
        self.regs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    const WORDS: usize = IP_IER / 4 + 1;

    /// In-memory register file with the hardware's ISR toggle-on-write
    /// behavior.
    struct FakeGpio {
        words: RefCell<[u32; WORDS]>,
    }

    impl FakeGpio {
        fn new() -> FakeGpio {
            FakeGpio {
                words: RefCell::new([0; WORDS]),
            }
        }

        /// Latches an interrupt the way the core does on an input edge.
        fn raise(&self, channels: Channels) {
            self.words.borrow_mut()[IP_ISR / 4] |= channels.bits();
        }

        fn word(&self, offset: usize) -> u32 {
            self.words.borrow()[offset / 4]
        }
    }

    impl Registers for &FakeGpio {
        fn read32(&self, offset: usize) -> u32 {
            self.words.borrow()[offset / 4]
        }

        fn write32(&self, offset: usize, value: u32) {
            let mut words = self.words.borrow_mut();
            if offset == IP_ISR {
                words[IP_ISR / 4] ^= value;
            } else {
                words[offset / 4] = value;
            }
        }
    }

    #[test]
    fn enable_sets_ier_then_gier() {
        let fake = FakeGpio::new();
        let gpio = AxiGpio::new(&fake);
        gpio.enable_interrupts(Channels::CH1);
        assert_eq!(fake.word(IP_IER), Channels::CH1.bits());
        assert_eq!(fake.word(GIER), 1 << 31);
    }

    #[test]
    fn disable_keeps_gier_while_a_channel_remains() {
        let fake = FakeGpio::new();
        let gpio = AxiGpio::new(&fake);
        gpio.enable_interrupts(Channels::CH1 | Channels::CH2);

        gpio.disable_interrupts(Channels::CH2);
        assert_eq!(fake.word(IP_IER), Channels::CH1.bits());
        assert_eq!(fake.word(GIER), 1 << 31);

        gpio.disable_interrupts(Channels::CH1);
        assert_eq!(fake.word(IP_IER), 0);
        assert_eq!(fake.word(GIER), 0);
    }

    #[test]
    fn ack_only_touches_pending_bits() {
        let fake = FakeGpio::new();
        let gpio = AxiGpio::new(&fake);
        fake.raise(Channels::CH1);

        let acked = gpio.clear_pending(Channels::all());
        assert_eq!(acked, Channels::CH1);
        // CH2 must not have been toggled on by the acknowledgement.
        assert_eq!(gpio.pending(), Channels::empty());
    }

    #[test]
    fn ack_of_an_idle_device_writes_nothing() {
        let fake = FakeGpio::new();
        let gpio = AxiGpio::new(&fake);
        assert_eq!(gpio.clear_pending(Channels::all()), Channels::empty());
        assert_eq!(fake.word(IP_ISR), 0);
    }

    #[test]
    fn ack_can_leave_other_channels_pending() {
        let fake = FakeGpio::new();
        let gpio = AxiGpio::new(&fake);
        fake.raise(Channels::CH1 | Channels::CH2);

        assert_eq!(gpio.clear_pending(Channels::CH1), Channels::CH1);
        assert_eq!(gpio.pending(), Channels::CH2);
    }

    #[test]
    fn data_and_direction_registers_are_per_channel() {
        let fake = FakeGpio::new();
        let gpio = AxiGpio::new(&fake);

        gpio.set_direction(Channel::One, u32::MAX);
        gpio.set_direction(Channel::Two, 0);
        gpio.write(Channel::Two, 0xA5A5_0000);

        assert_eq!(fake.word(GPIO_TRI), u32::MAX);
        assert_eq!(fake.word(GPIO2_TRI), 0);
        assert_eq!(fake.word(GPIO2_DATA), 0xA5A5_0000);
        assert_eq!(gpio.read(Channel::Two), 0xA5A5_0000);
        assert_eq!(gpio.read(Channel::One), 0);
    }

    #[test]
    fn channel_interrupt_bits_match_the_register_layout() {
        assert_eq!(Channel::One.interrupt().bits(), 1);
        assert_eq!(Channel::Two.interrupt().bits(), 2);
    }
}
