//! Selected-slave session
//!
//! A [`SlaveSession`] exists exactly while one slave's chip-select line is
//! asserted. Byte transfers are only reachable through it, and ending it
//! (explicitly or by drop) deasserts the line and waits out the slave's
//! deselect delay.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{ErrorType, SpiBus};
use synchro_hal::{ChipSelectPort, ShiftRegister};

use crate::error::SpiError;
use crate::master::SpiMaster;
use crate::slave::{SlaveDescriptor, SlaveId};

/// Longest block accepted by [`SlaveSession::write_bytes`] and
/// [`SlaveSession::read_bytes`] (8-bit count)
pub const MAX_BLOCK_LEN: usize = 255;

/// Byte sent while reading
const IDLE_BYTE: u8 = 0x00;

/// Guard for a selected slave
///
/// All transfers are full duplex and block until the hardware reports the
/// byte complete.
pub struct SlaveSession<'a, R, P, D>
where
    R: ShiftRegister,
    P: ChipSelectPort,
    D: DelayNs,
{
    master: &'a mut SpiMaster<R, P, D>,
    id: SlaveId,
    descriptor: SlaveDescriptor,
    active: bool,
}

impl<'a, R, P, D> SlaveSession<'a, R, P, D>
where
    R: ShiftRegister,
    P: ChipSelectPort,
    D: DelayNs,
{
    pub(crate) fn new(
        master: &'a mut SpiMaster<R, P, D>,
        id: SlaveId,
        descriptor: SlaveDescriptor,
    ) -> Self {
        Self {
            master,
            id,
            descriptor,
            active: true,
        }
    }

    /// Id of the selected slave
    pub fn id(&self) -> SlaveId {
        self.id
    }

    /// Descriptor the slave was selected with
    pub fn descriptor(&self) -> &SlaveDescriptor {
        &self.descriptor
    }

    /// Check that the chip-select line reads asserted
    pub fn is_asserted(&self) -> bool {
        self.master.port().is_set_low(self.descriptor.chip_select)
    }

    /// Send one byte and return the byte shifted in at the same time
    pub fn write_byte(&mut self, byte: u8) -> u8 {
        self.master.exchange(byte)
    }

    /// Like [`write_byte`](Self::write_byte) but polls the transfer-complete
    /// flag at most `max_polls` times, failing with [`SpiError::Timeout`] if
    /// none of them sees it set
    ///
    /// After a timeout the peripheral state is unknown; deselect and
    /// reinitialize before further use.
    pub fn write_byte_bounded(&mut self, byte: u8, max_polls: u32) -> Result<u8, SpiError> {
        self.master.exchange_bounded(byte, max_polls)
    }

    /// Send every byte of `data` in order, discarding what is shifted in
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), SpiError> {
        check_block(data.len())?;
        for &byte in data {
            self.master.exchange(byte);
        }
        Ok(())
    }

    /// Clock in one byte while sending zero
    pub fn read_byte(&mut self) -> u8 {
        self.master.exchange(IDLE_BYTE)
    }

    /// Fill `buf` with one [`read_byte`](Self::read_byte) per element
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), SpiError> {
        check_block(buf.len())?;
        for slot in buf.iter_mut() {
            *slot = self.master.exchange(IDLE_BYTE);
        }
        Ok(())
    }

    /// Deassert chip-select and wait out the deselect delay
    pub fn deselect(mut self) {
        self.end();
    }

    fn end(&mut self) {
        if self.active {
            self.active = false;
            self.master.finish(self.id, &self.descriptor);
        }
    }
}

impl<R, P, D> Drop for SlaveSession<'_, R, P, D>
where
    R: ShiftRegister,
    P: ChipSelectPort,
    D: DelayNs,
{
    fn drop(&mut self) {
        self.end();
    }
}

fn check_block(len: usize) -> Result<(), SpiError> {
    if len > MAX_BLOCK_LEN {
        Err(SpiError::BlockTooLong(len))
    } else {
        Ok(())
    }
}

// embedded-hal bus over the selected slave, for device drivers written
// against `SpiBus`. Buffers of any length are split into 255-byte blocks.

impl<R, P, D> ErrorType for SlaveSession<'_, R, P, D>
where
    R: ShiftRegister,
    P: ChipSelectPort,
    D: DelayNs,
{
    type Error = SpiError;
}

impl<R, P, D> SpiBus<u8> for SlaveSession<'_, R, P, D>
where
    R: ShiftRegister,
    P: ChipSelectPort,
    D: DelayNs,
{
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        for block in words.chunks_mut(MAX_BLOCK_LEN) {
            self.read_bytes(block)?;
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        for block in words.chunks(MAX_BLOCK_LEN) {
            self.write_bytes(block)?;
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        let len = read.len().max(write.len());
        for i in 0..len {
            let out = write.get(i).copied().unwrap_or(IDLE_BYTE);
            let received = self.write_byte(out);
            if let Some(slot) = read.get_mut(i) {
                *slot = received;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        for word in words.iter_mut() {
            *word = self.write_byte(*word);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        // Every exchange has completed by the time it returns
        Ok(())
    }
}
