//! Mock register bus for testing the drivers without hardware

use sentral_fusion::RegisterBus;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// Records operations performed on the mock bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Single register read and the value returned
    Read { device: u8, register: u8, value: u8 },
    /// Burst read starting at `register`
    ReadBlock {
        device: u8,
        register: u8,
        data: Vec<u8>,
    },
    /// Single register write
    Write { device: u8, register: u8, value: u8 },
}

/// Injected transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

#[derive(Debug, Default)]
struct MockState {
    /// Simulated register values (device, register) -> value
    registers: HashMap<(u8, u8), u8>,
    /// Values returned by successive single reads before falling back to
    /// `registers`
    read_sequences: HashMap<(u8, u8), VecDeque<u8>>,
    /// Buffers returned by successive burst reads before falling back to
    /// `registers`
    block_sequences: HashMap<(u8, u8), VecDeque<Vec<u8>>>,
    /// Operations log for verification
    operations: Vec<Operation>,
    fail_next_read: bool,
    fail_next_write: bool,
}

/// Scriptable register bus
///
/// Clones share state, so a test can keep one handle while a driver owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Rc<RefCell<MockState>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_register(&self, device: u8, register: u8, value: u8) {
        self.state
            .borrow_mut()
            .registers
            .insert((device, register), value);
    }

    /// Store `values` in consecutive registers starting at `register`
    pub fn set_registers(&self, device: u8, register: u8, values: &[u8]) {
        for (offset, value) in (0u8..).zip(values) {
            self.set_register(device, register + offset, *value);
        }
    }

    pub fn register(&self, device: u8, register: u8) -> u8 {
        self.state
            .borrow()
            .registers
            .get(&(device, register))
            .copied()
            .unwrap_or(0)
    }

    /// Script the values of the next single reads of a register
    pub fn queue_reads(&self, device: u8, register: u8, values: &[u8]) {
        self.state
            .borrow_mut()
            .read_sequences
            .entry((device, register))
            .or_default()
            .extend(values.iter().copied());
    }

    /// Script the contents of the next burst read starting at a register
    pub fn queue_block(&self, device: u8, register: u8, data: &[u8]) {
        self.state
            .borrow_mut()
            .block_sequences
            .entry((device, register))
            .or_default()
            .push_back(data.to_vec());
    }

    pub fn fail_next_read(&self) {
        self.state.borrow_mut().fail_next_read = true;
    }

    pub fn fail_next_write(&self) {
        self.state.borrow_mut().fail_next_write = true;
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.state.borrow().operations.clone()
    }

    pub fn clear_operations(&self) {
        self.state.borrow_mut().operations.clear();
    }

    /// `(register, value)` of every write to `device`, in order
    pub fn writes_to(&self, device: u8) -> Vec<(u8, u8)> {
        self.operations()
            .into_iter()
            .filter_map(|operation| match operation {
                Operation::Write {
                    device: d,
                    register,
                    value,
                } if d == device => Some((register, value)),
                _ => None,
            })
            .collect()
    }

    /// Number of single and burst reads of one register
    pub fn read_count(&self, device: u8, register: u8) -> usize {
        self.operations()
            .iter()
            .filter(|operation| match operation {
                Operation::Read {
                    device: d,
                    register: r,
                    ..
                }
                | Operation::ReadBlock {
                    device: d,
                    register: r,
                    ..
                } => *d == device && *r == register,
                Operation::Write { .. } => false,
            })
            .count()
    }
}

impl RegisterBus for MockBus {
    type Error = MockError;

    fn read_byte(&mut self, device: u8, register: u8) -> Result<u8, Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(MockError);
        }

        let queued = state
            .read_sequences
            .get_mut(&(device, register))
            .and_then(VecDeque::pop_front);
        let value = match queued {
            Some(value) => value,
            None => state
                .registers
                .get(&(device, register))
                .copied()
                .unwrap_or(0),
        };

        state.operations.push(Operation::Read {
            device,
            register,
            value,
        });
        Ok(value)
    }

    fn write_byte(&mut self, device: u8, register: u8, value: u8) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_next_write {
            state.fail_next_write = false;
            return Err(MockError);
        }

        state.registers.insert((device, register), value);
        state.operations.push(Operation::Write {
            device,
            register,
            value,
        });
        Ok(())
    }

    fn read_bytes(
        &mut self,
        device: u8,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(MockError);
        }

        let queued = state
            .block_sequences
            .get_mut(&(device, register))
            .and_then(VecDeque::pop_front);
        match queued {
            Some(data) => {
                let len = buffer.len().min(data.len());
                buffer[..len].copy_from_slice(&data[..len]);
            }
            None => {
                for (offset, byte) in (0u8..).zip(buffer.iter_mut()) {
                    *byte = state
                        .registers
                        .get(&(device, register.wrapping_add(offset)))
                        .copied()
                        .unwrap_or(0);
                }
            }
        }

        state.operations.push(Operation::ReadBlock {
            device,
            register,
            data: buffer.to_vec(),
        });
        Ok(())
    }
}

/// Delay provider that only records the requested time
#[derive(Debug, Default)]
pub struct MockDelay {
    pub total_ns: u64,
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}
