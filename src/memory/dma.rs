use crate::memory::{ECHO_RAM_START, OAM_START};
use log::{debug, warn};

pub const DMA_TRANSFER_LENGTH: u16 = 0xa0;
pub const DMA_DURATION: usize = DMA_TRANSFER_LENGTH as usize * 4;

/// OAM DMA: copies 160 bytes from `XX00` into OAM, one byte every 4 cycles.
#[derive(Clone, Default)]
pub struct Dma {
    source: u16,
    elapsed: usize,
    active: bool,
}

impl Dma {
    pub fn start(&mut self, page: u8) -> bool {
        if self.active {
            warn!("DMA: Ignored start from page {:02x}, transfer already running", page);
            return false;
        }

        let mut source = (page as u16) << 8;
        // Pages above the echo area read back work RAM.
        if source >= ECHO_RAM_START {
            source -= 0x2000;
        }

        debug!("DMA: Started transfer from {:04x}", source);
        self.source = source;
        self.elapsed = 0;
        self.active = true;
        true
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advances one cycle and returns the `(source, destination)` pair to copy on this cycle.
    pub fn step(&mut self) -> Option<(u16, u16)> {
        if !self.active {
            return None;
        }

        let cycle = self.elapsed;
        self.elapsed += 1;
        if self.elapsed >= DMA_DURATION {
            self.active = false;
            debug!("DMA: Transfer from {:04x} finished", self.source);
        }

        if cycle % 4 == 0 {
            let index = (cycle / 4) as u16;
            Some((self.source + index, OAM_START + index))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_160_bytes_over_the_full_duration() {
        let mut dma = Dma::default();
        assert!(dma.start(0xc1));

        let copies: Vec<(u16, u16)> = (0..DMA_DURATION).filter_map(|_| dma.step()).collect();

        assert_eq!(copies.len(), 160);
        assert_eq!(copies[0], (0xc100, 0xfe00));
        assert_eq!(copies[159], (0xc19f, 0xfe9f));
        assert!(!dma.is_active());
        assert_eq!(dma.step(), None);
    }

    #[test]
    fn second_start_is_ignored() {
        let mut dma = Dma::default();
        dma.start(0xc0);
        dma.step();
        assert!(!dma.start(0xd0));
        assert_eq!(dma.step(), None);
        assert_eq!(dma.step(), None);
        assert_eq!(dma.step(), None);
        assert_eq!(dma.step(), Some((0xc001, 0xfe01)));
    }

    #[test]
    fn echo_pages_map_to_work_ram() {
        let mut dma = Dma::default();
        dma.start(0xfe);
        assert_eq!(dma.step(), Some((0xde00, 0xfe00)));
    }
}
