use std::sync::atomic::{AtomicBool, Ordering};

/// Single-flight guard: at most one holder at a time, extra callers are turned away.
#[derive(Debug, Default)]
pub struct SendGate {
    busy: AtomicBool,
}

impl SendGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Try to take the gate. `None` when another permit is outstanding.
    pub fn try_acquire(&self) -> Option<SendPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SendPermit { gate: self })
    }
}

/// Held while a send is in flight; releases the gate on drop.
#[derive(Debug)]
pub struct SendPermit<'a> {
    gate: &'a SendGate,
}

impl Drop for SendPermit<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_rejected_while_held() {
        let gate = SendGate::new();
        let permit = gate.try_acquire().expect("first acquire succeeds");
        assert!(gate.is_busy());
        assert!(gate.try_acquire().is_none());

        drop(permit);
        assert!(!gate.is_busy());
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn permit_releases_on_early_return() {
        fn fails(gate: &SendGate) -> Result<(), &'static str> {
            let _permit = gate.try_acquire().ok_or("busy")?;
            Err("dispatch failed")
        }

        let gate = SendGate::new();
        assert_eq!(fails(&gate), Err("dispatch failed"));
        assert!(!gate.is_busy());
    }
}
