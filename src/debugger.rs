use std::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakpoint {
    /// Stops before the instruction at this address executes.
    Address(u16),
    /// Stops before any instruction with this (unprefixed) opcode executes.
    Opcode(u8),
    /// Stops after an instruction reads this address.
    Read(u16),
    /// Stops after an instruction writes this address.
    Write(u16),
}

/// Debug hooks handed to the device at construction time.
#[derive(Debug, Clone, Default)]
pub struct DebugConfig {
    pub breakpoints: Vec<Breakpoint>,
}

impl DebugConfig {
    pub fn new() -> DebugConfig {
        DebugConfig::default()
    }

    pub fn with_breakpoint(mut self, breakpoint: Breakpoint) -> DebugConfig {
        self.breakpoints.push(breakpoint);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    pub fn breaks_at(&self, address: u16) -> bool {
        self.breakpoints.contains(&Breakpoint::Address(address))
    }

    pub fn breaks_on_opcode(&self, opcode: u8) -> bool {
        self.breakpoints.contains(&Breakpoint::Opcode(opcode))
    }

    pub(crate) fn watchpoints(&self) -> Watchpoints {
        let mut watchpoints = Watchpoints::default();
        for breakpoint in &self.breakpoints {
            match *breakpoint {
                Breakpoint::Read(address) => watchpoints.reads.push(address),
                Breakpoint::Write(address) => watchpoints.writes.push(address),
                _ => {}
            }
        }
        watchpoints
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchHit {
    pub access: Access,
    pub address: u16,
    pub value: u8,
}

/// Why the device paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakEvent {
    Address(u16),
    Opcode { opcode: u8, address: u16 },
    Watch { hit: WatchHit, pc: u16 },
}

impl std::fmt::Display for BreakEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            BreakEvent::Address(address) => write!(f, "breakpoint at ${:04x}", address),
            BreakEvent::Opcode { opcode, address } => {
                write!(f, "opcode ${:02x} at ${:04x}", opcode, address)
            }
            BreakEvent::Watch { hit, pc } => {
                let access = match hit.access {
                    Access::Read => "read",
                    Access::Write => "write",
                };
                write!(f, "{} of ${:02x} at ${:04x} (pc ${:04x})", access, hit.value, hit.address, pc)
            }
        }
    }
}

/// Memory access watch list. Reads go through `&Mmu`, so the first hit is kept in a cell
/// until the device collects it.
#[derive(Clone, Default)]
pub struct Watchpoints {
    reads: Vec<u16>,
    writes: Vec<u16>,
    hit: Cell<Option<WatchHit>>,
}

impl Watchpoints {
    #[inline]
    pub fn note_read(&self, address: u16, value: u8) {
        if !self.reads.is_empty() && self.reads.contains(&address) {
            self.record(Access::Read, address, value);
        }
    }

    #[inline]
    pub fn note_write(&self, address: u16, value: u8) {
        if !self.writes.is_empty() && self.writes.contains(&address) {
            self.record(Access::Write, address, value);
        }
    }

    fn record(&self, access: Access, address: u16, value: u8) {
        if self.hit.get().is_none() {
            self.hit.set(Some(WatchHit { access, address, value }));
        }
    }

    pub fn take_hit(&self) -> Option<WatchHit> {
        self.hit.take()
    }
}
