// ============ Object References ============
// Objects live in the heap's slot arena; a GcRef is the slot index.

/// Non-owning reference to a heap object.
///
/// A `GcRef` stays valid only while the object it names is reachable from
/// a root at every collection. Holding one does not keep the object alive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub struct GcRef(pub(crate) u32);

impl GcRef {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for GcRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{:#06x}", self.0)
    }
}
