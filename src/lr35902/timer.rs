use crate::memory::mmu::Mmu;
use crate::memory::registers::{InterruptFlags, TimerControl};
use crate::memory::{DIV_REGISTER, INTERRUPT_FLAGS_REGISTER, TAC_REGISTER, TIMA_REGISTER, TMA_REGISTER};
use log::trace;

/// Cycles between TIMA overflowing and the TMA reload (plus interrupt).
pub const OVERFLOW_DELAY: u8 = 4;
/// Cycles after the reload during which TIMA ignores writes.
pub const RELOAD_GUARD: u8 = 4;
/// Counter value the boot ROM leaves behind (DIV reads 0xab).
pub const POST_BOOT_COUNTER: u16 = 0xabcc;

/// DIV/TIMA driven from a 16-bit counter that advances every T-cycle.
///
/// TIMA is clocked by the falling edge of `counter[bit] & TAC.enable`, where the bit is
/// picked by TAC's clock select. This reproduces the "glitch" increments caused by
/// resetting DIV or rewriting TAC while the selected bit is high.
#[derive(Clone, Default)]
pub struct Timer {
    counter: u16,
    latch: bool,
    overflow_countdown: u8,
    reload_guard: u8,
}

impl Timer {
    pub fn new() -> Timer {
        Timer::default()
    }

    pub fn with_counter(counter: u16) -> Timer {
        Timer {
            counter,
            ..Timer::default()
        }
    }

    #[inline]
    pub fn counter(&self) -> u16 {
        self.counter
    }

    pub fn tick(&mut self, memory: &mut [u8], cycles: usize) {
        for _ in 0..cycles {
            self.counter = self.counter.wrapping_add(1);
            memory[DIV_REGISTER as usize] = (self.counter >> 8) as u8;

            if self.reload_guard > 0 {
                self.reload_guard -= 1;
            }

            if self.overflow_countdown > 0 {
                self.overflow_countdown -= 1;
                if self.overflow_countdown == 0 {
                    memory[TIMA_REGISTER as usize] = memory[TMA_REGISTER as usize];
                    memory[INTERRUPT_FLAGS_REGISTER as usize] |= InterruptFlags::TIMER.bits();
                    self.reload_guard = RELOAD_GUARD;
                    trace!("Timer: Reloaded TIMA with {:02x}", memory[TMA_REGISTER as usize]);
                }
            }

            self.detect_edge(memory);
        }
    }

    pub fn reset_counter(&mut self, memory: &mut [u8]) {
        self.counter = 0;
        memory[DIV_REGISTER as usize] = 0;
        self.detect_edge(memory);
    }

    fn signal(&self, memory: &[u8]) -> bool {
        let control = TimerControl::from(memory[TAC_REGISTER as usize]);
        control.contains(TimerControl::ENABLED) && (self.counter >> control.counter_bit()) & 1 == 1
    }

    fn detect_edge(&mut self, memory: &mut [u8]) {
        let signal = self.signal(memory);
        if self.latch && !signal {
            self.increment(memory);
        }
        self.latch = signal;
    }

    fn increment(&mut self, memory: &mut [u8]) {
        let tima = memory[TIMA_REGISTER as usize];
        if tima == 0xff {
            // TIMA sits at 0 until the delayed reload kicks in.
            memory[TIMA_REGISTER as usize] = 0;
            self.overflow_countdown = OVERFLOW_DELAY;
        } else {
            memory[TIMA_REGISTER as usize] = tima + 1;
        }
    }

    pub(crate) fn on_div_write(mmu: &mut Mmu, _addr: u16, _data: u8) -> Option<u8> {
        let (timer, memory) = mmu.timer_parts();
        timer.reset_counter(memory);
        Some(0)
    }

    pub(crate) fn on_tima_write(mmu: &mut Mmu, _addr: u16, data: u8) -> Option<u8> {
        let (timer, _) = mmu.timer_parts();
        // TIMA is locked from the overflow until the reload guard runs out.
        if timer.overflow_countdown > 0 || timer.reload_guard > 0 {
            return None;
        }

        Some(data)
    }

    pub(crate) fn on_tma_write(mmu: &mut Mmu, _addr: u16, data: u8) -> Option<u8> {
        let (timer, memory) = mmu.timer_parts();
        if timer.reload_guard > 0 {
            memory[TIMA_REGISTER as usize] = data;
        }
        Some(data)
    }

    pub(crate) fn on_tac_write(mmu: &mut Mmu, _addr: u16, data: u8) -> Option<u8> {
        let value = data | 0b1111_1000;
        let (timer, memory) = mmu.timer_parts();
        memory[TAC_REGISTER as usize] = value;
        timer.detect_edge(memory);
        Some(value)
    }
}
