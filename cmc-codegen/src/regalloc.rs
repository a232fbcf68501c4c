//! Register Allocation
//!
//! The pool hands out the 18 scratch registers (t0-t7, s0-s7, t8, t9) on
//! demand. There is no spilling: running out of registers is fatal. The
//! scan is next-fit, resuming from the last register handed out, which keeps
//! the common balanced alloc/free pattern cheap.

use crate::asm::Reg;
use cmc_common::{CodegenError, Result};
use log::trace;

/// Fixed MIPS register file with free/busy state
#[derive(Debug, Clone)]
pub struct RegisterPool {
    /// Availability per hardware index; reserved registers stay `false`
    free: [bool; Reg::COUNT],

    /// How many allocatable registers are currently free
    n_free: usize,

    /// Index of the last successful allocation, where the next scan starts
    cursor: usize,
}

impl RegisterPool {
    /// Create a pool with every allocatable register free
    pub fn new() -> Self {
        let mut free = [false; Reg::COUNT];
        for slot in &mut free[Reg::FIRST_ALLOCATABLE..=Reg::LAST_ALLOCATABLE] {
            *slot = true;
        }

        Self {
            free,
            n_free: Reg::ALLOCATABLE_COUNT,
            cursor: Reg::FIRST_ALLOCATABLE,
        }
    }

    /// Allocate a free scratch register
    pub fn allocate(&mut self) -> Result<Reg> {
        if self.n_free == 0 {
            return Err(CodegenError::OutOfRegisters(Reg::ALLOCATABLE_COUNT));
        }

        let start = self.cursor;
        let mut i = start;
        loop {
            if self.free[i] {
                self.free[i] = false;
                self.n_free -= 1;
                self.cursor = i;
                let reg = Reg::ALL[i];
                trace!("Allocated {reg} ({} free)", self.n_free);
                return Ok(reg);
            }

            i = if i == Reg::LAST_ALLOCATABLE {
                Reg::FIRST_ALLOCATABLE
            } else {
                i + 1
            };

            if i == start {
                break;
            }
        }

        // n_free said otherwise; the flags are the source of truth
        Err(CodegenError::OutOfRegisters(Reg::ALLOCATABLE_COUNT))
    }

    /// Return a register to the pool
    ///
    /// Freeing a reserved register or a register that is already free is a
    /// logic error in the caller.
    pub fn free(&mut self, reg: Reg) -> Result<()> {
        if !reg.is_allocatable() {
            return Err(CodegenError::NotAllocatable(reg.name()));
        }
        if self.free[reg.index()] {
            return Err(CodegenError::DoubleFree(reg.name()));
        }

        self.free[reg.index()] = true;
        self.n_free += 1;
        trace!("Freed {reg} ({} free)", self.n_free);
        Ok(())
    }

    pub fn is_free(&self, reg: Reg) -> bool {
        self.free[reg.index()]
    }

    /// Number of allocatable registers currently free
    pub fn free_count(&self) -> usize {
        self.n_free
    }

    /// Number of allocatable registers currently handed out
    pub fn outstanding(&self) -> usize {
        self.busy().count()
    }

    /// Allocatable registers currently handed out, in index order
    pub fn busy(&self) -> impl Iterator<Item = Reg> + '_ {
        (Reg::FIRST_ALLOCATABLE..=Reg::LAST_ALLOCATABLE)
            .filter(|&i| !self.free[i])
            .map(|i| Reg::ALL[i])
    }

    /// Trace the busy/free state of the whole register file
    pub fn log_state(&self) {
        for reg in Reg::ALL {
            trace!("{reg} is {}", if self.is_free(reg) { "free" } else { "busy" });
        }
    }

    /// Reset the pool to its initial all-free state
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for RegisterPool {
    fn default() -> Self {
        Self::new()
    }
}
