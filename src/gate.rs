//! Interrupt gates.
//!
//! A `Gate` stands for the one interrupt source that may touch a `Fifo` from
//! the other execution context. The fifo never inspects it; it only brackets
//! every multi-field update with `suppress` and `restore`.

/// Suppress/restore primitive for one interrupt source.
///
/// # Safety
///
/// Between `suppress` and the matching `restore`, no other context that
/// operates on a `Fifo` guarded by this gate may run. For a per-line gate that
/// only holds when the fifo is shared between exactly one interrupt handler
/// (the suppressed line) and code that never runs at a higher priority than
/// it.
pub unsafe trait Gate {
    /// Enable state captured by `suppress`.
    type State;

    /// Keeps the interrupt source from being delivered and returns the state
    /// it was in.
    fn suppress(&self) -> Self::State;

    /// Returns the interrupt source to `state`.
    ///
    /// # Safety
    ///
    /// `state` must come from the most recent unmatched `suppress` on this
    /// gate.
    unsafe fn restore(&self, state: Self::State);

    /// Runs `f` with the interrupt source suppressed.
    ///
    /// The previous state is restored on every exit path, unwinding included,
    /// so calls nest.
    ///
    /// ```
    /// use irqfifo::{CriticalSection, Gate};
    ///
    /// let n = CriticalSection.with(|| CriticalSection.with(|| 1 + 1));
    /// assert_eq!(n, 2);
    /// ```
    #[inline]
    fn with<R, F>(&self, f: F) -> R
        where Self: Sized,
              F: FnOnce() -> R
    {
        let _cs = Suppressed::new(self);
        f()
    }
}

unsafe impl<'g, G: Gate> Gate for &'g G {
    type State = G::State;

    #[inline]
    fn suppress(&self) -> G::State {
        (**self).suppress()
    }

    #[inline]
    unsafe fn restore(&self, state: G::State) {
        (**self).restore(state)
    }
}

/// Scoped suppression, restored on drop.
pub(crate) struct Suppressed<'g, G: Gate> {
    gate: &'g G,
    state: Option<G::State>,
}

impl<'g, G: Gate> Suppressed<'g, G> {
    #[inline]
    pub(crate) fn new(gate: &'g G) -> Self {
        Suppressed {
            state: Some(gate.suppress()),
            gate,
        }
    }
}

impl<'g, G: Gate> Drop for Suppressed<'g, G> {
    #[inline]
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            unsafe { self.gate.restore(state) }
        }
    }
}

/// Gate backed by the global `critical-section` implementation.
///
/// Disables every interrupt rather than one line, which is always sufficient.
/// It is also the gate to use on a hosted target, where the `std`
/// implementation of `critical-section` serializes threads instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct CriticalSection;

unsafe impl Gate for CriticalSection {
    type State = critical_section::RestoreState;

    #[inline]
    fn suppress(&self) -> Self::State {
        // Released by the matching `restore`, and `Suppressed` keeps the pairs nested.
        unsafe { critical_section::acquire() }
    }

    #[inline]
    unsafe fn restore(&self, state: Self::State) {
        critical_section::release(state)
    }
}

#[cfg(feature = "cortex-m")]
pub use self::nvic::NvicLine;

#[cfg(feature = "cortex-m")]
mod nvic {
    use cortex_m::asm;
    use cortex_m::interrupt::InterruptNumber;
    use cortex_m::peripheral::NVIC;

    use super::Gate;

    /// Gate that masks a single NVIC line.
    ///
    /// Other interrupts keep running while a fifo operation is in progress.
    /// Only correct when the masked line is the sole interrupt context
    /// touching the fifo.
    ///
    /// `restore` unmasks the line only if it was enabled when `suppress`
    /// ran, so a line left disabled by the application stays disabled. This
    /// touches NVIC registers and is exercised on target only.
    ///
    /// ```no_run
    /// use cortex_m::interrupt::InterruptNumber;
    /// use irqfifo::{Fifo, Gate, NvicLine, Wrapping};
    ///
    /// #[derive(Clone, Copy)]
    /// enum Irq {
    ///     UsbCtrl = 5,
    /// }
    ///
    /// unsafe impl InterruptNumber for Irq {
    ///     fn number(self) -> u16 {
    ///         self as u16
    ///     }
    /// }
    ///
    /// let gate = unsafe { NvicLine::new(Irq::UsbCtrl) };
    /// assert_eq!(gate.irq().number(), 5);
    ///
    /// // line enabled before: unmasked again after the operation
    /// // line disabled before: left masked
    /// gate.with(|| ());
    ///
    /// let mut storage = [0u8; 64];
    /// let fifo: Fifo<_, Wrapping> = Fifo::new(&mut storage, gate).unwrap();
    /// fifo.write(0x42).unwrap();
    /// assert_eq!(fifo.read(), Ok(0x42));
    /// ```
    #[derive(Clone, Copy, Debug)]
    pub struct NvicLine<I: InterruptNumber> {
        irq: I,
    }

    impl<I: InterruptNumber> NvicLine<I> {
        /// Creates a gate for `irq`.
        ///
        /// # Safety
        ///
        /// Every fifo guarded by this gate must be shared only between the
        /// handler of `irq` and code running at lower priority.
        pub const unsafe fn new(irq: I) -> Self {
            NvicLine { irq }
        }

        /// The guarded interrupt line.
        pub fn irq(&self) -> I {
            self.irq
        }
    }

    unsafe impl<I: InterruptNumber> Gate for NvicLine<I> {
        /// Whether the line was enabled before suppression.
        type State = bool;

        #[inline]
        fn suppress(&self) -> bool {
            let enabled = NVIC::is_enabled(self.irq);
            NVIC::mask(self.irq);
            // the mask must be in effect before the shared state is touched
            asm::dsb();
            asm::isb();
            enabled
        }

        #[inline]
        unsafe fn restore(&self, enabled: bool) {
            if enabled {
                NVIC::unmask(self.irq);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::panic;

    /// Counts suppression depth; the state is the depth before suppressing.
    struct Depth(Cell<usize>);

    unsafe impl Gate for Depth {
        type State = usize;

        fn suppress(&self) -> usize {
            let prev = self.0.get();
            self.0.set(prev + 1);
            prev
        }

        unsafe fn restore(&self, prev: usize) {
            self.0.set(prev);
        }
    }

    #[test]
    fn with_nests() {
        let gate = Depth(Cell::new(0));
        gate.with(|| {
            assert_eq!(gate.0.get(), 1);
            gate.with(|| assert_eq!(gate.0.get(), 2));
            assert_eq!(gate.0.get(), 1);
        });
        assert_eq!(gate.0.get(), 0);
    }

    #[test]
    fn with_restores_on_unwind() {
        let gate = Depth(Cell::new(0));
        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            gate.with(|| panic!("boom"))
        }));
        assert!(result.is_err());
        assert_eq!(gate.0.get(), 0);
    }

    #[test]
    fn reference_forwards() {
        let gate = Depth(Cell::new(0));
        let by_ref = &gate;
        by_ref.with(|| assert_eq!(gate.0.get(), 1));
        assert_eq!(gate.0.get(), 0);
    }

    #[test]
    fn critical_section_nests() {
        let n = CriticalSection.with(|| CriticalSection.with(|| 7));
        assert_eq!(n, 7);
    }
}
