// Tadpole Garbage Collector
//
// Stop-the-world mark & sweep over a slot arena:
// - Every object is linked into one intrusive list through its header
//   (`GcHeader::next`); the sweep walks that list
// - Collection triggers on allocation once the live object count reaches
//   the threshold; the next threshold scales with what survived
// - Roots are supplied by the caller through the `GcRoots` trait, so the
//   heap never reaches back into the VM
// - Interned strings are weak: a swept string leaves the intern table

mod gc_id;
mod gc_kind;
mod gc_object;
mod string_interner;

pub use gc_id::GcRef;
pub use gc_kind::ObjType;
pub use gc_object::{GcHeader, GcObject};
pub use string_interner::StringInterner;

use gc_object::GcBox;
use log::{debug, log_enabled, trace, Level};

use crate::value::{Closure, Function, Native, Pair, TString, Upvalue, Value};
use crate::vm::vm_limits::{
    DEFAULT_GC_GROWTH_FACTOR, DEFAULT_GC_THRESHOLD_ALIGN, DEFAULT_GC_THRESHOLD_FLOOR,
    MAX_STRINGIFY_DEPTH,
};

/// Collector tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GcConfig {
    /// Lower bound of the collection threshold
    pub threshold_floor: usize,
    /// Next threshold = live objects after a collection * growth_factor
    pub growth_factor: usize,
    /// Thresholds are rounded up to a multiple of this
    pub threshold_align: usize,
    /// Automatic collection on allocation
    pub enabled: bool,
    /// Collect on every allocation (debugging aid)
    pub stress: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig {
            threshold_floor: DEFAULT_GC_THRESHOLD_FLOOR,
            growth_factor: DEFAULT_GC_GROWTH_FACTOR,
            threshold_align: DEFAULT_GC_THRESHOLD_ALIGN,
            enabled: true,
            stress: false,
        }
    }
}

/// Counters maintained across collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GcStats {
    pub collections: usize,
    pub objects_allocated: usize,
    pub objects_freed: usize,
    pub last_freed: usize,
    pub live_objects: usize,
    pub threshold: usize,
}

/// Source of root references for a collection.
///
/// Implementors call `Heap::mark_value` / `Heap::mark_object` for every
/// reference they hold; the heap traces everything reachable from there.
pub trait GcRoots {
    fn mark_roots(&self, heap: &mut Heap);
}

/// An empty root set. Collecting with it frees every object.
pub struct NoRoots;

impl GcRoots for NoRoots {
    fn mark_roots(&self, _heap: &mut Heap) {}
}

impl GcRoots for Vec<Value> {
    fn mark_roots(&self, heap: &mut Heap) {
        for value in self {
            heap.mark_value(*value);
        }
    }
}

impl<const N: usize> GcRoots for [Value; N] {
    fn mark_roots(&self, heap: &mut Heap) {
        for value in self {
            heap.mark_value(*value);
        }
    }
}

#[inline]
fn align_up(n: usize, align: usize) -> usize {
    if align <= 1 { n } else { n.div_ceil(align) * align }
}

/// Owner of every heap object.
pub struct Heap {
    slots: Vec<Option<GcBox>>,
    free_slots: Vec<u32>,
    /// Most recently appended object, head of the sweep list
    head: Option<GcRef>,
    strings: StringInterner,
    gray: Vec<GcRef>,
    children: Vec<GcRef>,
    object_count: usize,
    threshold: usize,
    config: GcConfig,
    stats: GcStats,
}

impl Heap {
    pub fn new(config: GcConfig) -> Self {
        let threshold = align_up(config.threshold_floor, config.threshold_align);
        Heap {
            slots: Vec::with_capacity(threshold),
            free_slots: Vec::new(),
            head: None,
            strings: StringInterner::new(),
            gray: Vec::new(),
            children: Vec::new(),
            object_count: 0,
            threshold,
            config,
            stats: GcStats {
                threshold,
                ..GcStats::default()
            },
        }
    }

    // ============ Allocation ============

    /// Reserve a slot for one new object, collecting first if the
    /// threshold has been reached.
    ///
    /// The reserved slot is not part of the object list and must be filled
    /// by `append_object` before the next allocation.
    pub fn allocate(&mut self, roots: &dyn GcRoots) -> GcRef {
        if self.should_collect() {
            self.collect(roots);
        }

        match self.free_slots.pop() {
            Some(index) => GcRef(index),
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(None);
                GcRef(index)
            }
        }
    }

    /// Link a freshly constructed object into the object list.
    pub fn append_object(&mut self, slot: GcRef, object: GcObject) {
        debug_assert!(self.slots[slot.index()].is_none(), "slot {slot} is occupied");

        let header = GcHeader::new(object.kind(), self.head);
        if log_enabled!(Level::Trace) {
            trace!("{slot} allocate {:?}", header.kind);
        }
        self.slots[slot.index()] = Some(GcBox { header, object });
        self.head = Some(slot);
        self.object_count += 1;
        self.stats.objects_allocated += 1;
        self.stats.live_objects = self.object_count;
    }

    /// `allocate` followed by `append_object`.
    pub fn alloc(&mut self, object: GcObject, roots: &dyn GcRoots) -> GcRef {
        let slot = self.allocate(roots);
        self.append_object(slot, object);
        slot
    }

    /// Return the string object for `s`, creating it on first use.
    pub fn intern(&mut self, s: &str, roots: &dyn GcRoots) -> GcRef {
        let hash = self.strings.hash_string(s);
        if let Some(found) = self.find_hashed(s, hash) {
            return found;
        }

        let r = self.alloc(GcObject::String(TString::new(s, hash)), roots);
        self.strings.insert(hash, r);
        r
    }

    /// Look up an interned string without allocating.
    pub fn find_interned(&self, s: &str) -> Option<GcRef> {
        self.find_hashed(s, self.strings.hash_string(s))
    }

    fn find_hashed(&self, s: &str, hash: u64) -> Option<GcRef> {
        let slots = &self.slots;
        self.strings.find(hash, |r| {
            matches!(
                slots[r.index()].as_ref().map(|b| &b.object),
                Some(GcObject::String(ts)) if ts.as_str() == s
            )
        })
    }

    // ============ Collection ============

    #[inline]
    pub fn should_collect(&self) -> bool {
        self.config.stress || (self.config.enabled && self.object_count >= self.threshold)
    }

    /// Run a full mark & sweep cycle. Returns the number of objects freed.
    pub fn collect(&mut self, roots: &dyn GcRoots) -> usize {
        let before = self.object_count;
        debug!("-- gc begin: {} objects, threshold {}", before, self.threshold);

        roots.mark_roots(self);
        self.trace_references();
        let freed = self.sweep();

        self.threshold = align_up(
            self.object_count
                .saturating_mul(self.config.growth_factor)
                .max(self.config.threshold_floor),
            self.config.threshold_align,
        );

        self.stats.collections += 1;
        self.stats.objects_freed += freed;
        self.stats.last_freed = freed;
        self.stats.live_objects = self.object_count;
        self.stats.threshold = self.threshold;

        debug!(
            "-- gc end: collected {} objects ({} -> {}), next at {}",
            freed, before, self.object_count, self.threshold
        );
        freed
    }

    pub fn mark_value(&mut self, value: Value) {
        if let Value::Object(r) = value {
            self.mark_object(r);
        }
    }

    pub fn mark_object(&mut self, r: GcRef) {
        let Some(gc_box) = self.slots.get_mut(r.index()).and_then(Option::as_mut) else {
            return;
        };
        if gc_box.header.marked {
            return;
        }
        gc_box.header.marked = true;
        if log_enabled!(Level::Trace) {
            trace!("{r} mark {:?}", gc_box.header.kind);
        }
        self.gray.push(r);
    }

    /// Drain the gray worklist, marking every object reachable from it
    fn trace_references(&mut self) {
        let mut children = std::mem::take(&mut self.children);
        while let Some(r) = self.gray.pop() {
            children.clear();
            self.get(r).for_each_reference(|child| children.push(child));
            for &child in &children {
                self.mark_object(child);
            }
        }
        self.children = children;
    }

    /// Walk the object list, freeing unmarked objects and clearing the mark
    /// on survivors
    fn sweep(&mut self) -> usize {
        let mut freed = 0;
        let mut previous: Option<GcRef> = None;
        let mut current = self.head;

        while let Some(r) = current {
            let header = self.header(r);
            current = header.next;

            if header.marked {
                self.header_mut(r).marked = false;
                previous = Some(r);
                continue;
            }

            match previous {
                Some(p) => self.header_mut(p).next = header.next,
                None => self.head = header.next,
            }
            self.release(r);
            freed += 1;
        }
        freed
    }

    fn release(&mut self, r: GcRef) {
        let Some(gc_box) = self.slots[r.index()].take() else {
            return;
        };
        if log_enabled!(Level::Trace) {
            trace!("{r} free {:?}", gc_box.header.kind);
        }
        if let GcObject::String(s) = &gc_box.object {
            self.strings.remove(s.hash(), r);
        }
        self.free_slots.push(r.0);
        self.object_count -= 1;
    }

    // ============ Configuration & Statistics ============

    pub fn object_count(&self) -> usize {
        self.object_count
    }

    pub fn interned_count(&self) -> usize {
        self.strings.len()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: usize) {
        self.threshold = threshold.max(1);
        self.stats.threshold = self.threshold;
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    pub fn stats(&self) -> GcStats {
        self.stats
    }

    // ============ Object Access ============

    /// True if `r` names a live object
    pub fn contains(&self, r: GcRef) -> bool {
        matches!(self.slots.get(r.index()), Some(Some(_)))
    }

    fn gc_box(&self, r: GcRef) -> &GcBox {
        match self.slots.get(r.index()) {
            Some(Some(gc_box)) => gc_box,
            _ => panic!("dangling reference {r}"),
        }
    }

    fn gc_box_mut(&mut self, r: GcRef) -> &mut GcBox {
        match self.slots.get_mut(r.index()) {
            Some(Some(gc_box)) => gc_box,
            _ => panic!("dangling reference {r}"),
        }
    }

    pub fn header(&self, r: GcRef) -> GcHeader {
        self.gc_box(r).header
    }

    fn header_mut(&mut self, r: GcRef) -> &mut GcHeader {
        &mut self.gc_box_mut(r).header
    }

    #[inline]
    pub fn get(&self, r: GcRef) -> &GcObject {
        &self.gc_box(r).object
    }

    #[inline]
    pub fn get_mut(&mut self, r: GcRef) -> &mut GcObject {
        &mut self.gc_box_mut(r).object
    }

    #[inline]
    pub fn kind(&self, r: GcRef) -> ObjType {
        self.gc_box(r).header.kind
    }

    pub fn string(&self, r: GcRef) -> &TString {
        match self.get(r) {
            GcObject::String(s) => s,
            other => unreachable!("{r} is a {:?}, not a string", other.kind()),
        }
    }

    pub fn as_str(&self, r: GcRef) -> &str {
        self.string(r).as_str()
    }

    pub fn function(&self, r: GcRef) -> &Function {
        match self.get(r) {
            GcObject::Function(f) => f,
            other => unreachable!("{r} is a {:?}, not a function", other.kind()),
        }
    }

    pub fn native(&self, r: GcRef) -> &Native {
        match self.get(r) {
            GcObject::Native(n) => n,
            other => unreachable!("{r} is a {:?}, not a native", other.kind()),
        }
    }

    pub fn closure(&self, r: GcRef) -> &Closure {
        match self.get(r) {
            GcObject::Closure(c) => c,
            other => unreachable!("{r} is a {:?}, not a closure", other.kind()),
        }
    }

    pub fn upvalue(&self, r: GcRef) -> &Upvalue {
        match self.get(r) {
            GcObject::Upvalue(u) => u,
            other => unreachable!("{r} is a {:?}, not an upvalue", other.kind()),
        }
    }

    pub fn upvalue_mut(&mut self, r: GcRef) -> &mut Upvalue {
        match self.get_mut(r) {
            GcObject::Upvalue(u) => u,
            other => unreachable!("{r} is a {:?}, not an upvalue", other.kind()),
        }
    }

    /// `None` if `r` is not a pair
    pub fn pair(&self, r: GcRef) -> Option<&Pair> {
        match self.get(r) {
            GcObject::Pair(p) => Some(p),
            _ => None,
        }
    }

    pub fn pair_mut(&mut self, r: GcRef) -> Option<&mut Pair> {
        match self.get_mut(r) {
            GcObject::Pair(p) => Some(p),
            _ => None,
        }
    }

    // ============ Display ============

    /// Printable form of an object
    pub fn stringify_object(&self, r: GcRef) -> String {
        let mut out = String::new();
        self.write_object(&mut out, r, 0);
        out
    }

    pub(crate) fn write_value(&self, out: &mut String, value: Value, depth: usize) {
        match value {
            Value::Object(r) => self.write_object(out, r, depth),
            other => other.write_primitive(out),
        }
    }

    fn write_object(&self, out: &mut String, r: GcRef, depth: usize) {
        match self.get(r) {
            GcObject::String(s) => out.push_str(s.as_str()),
            GcObject::Function(f) => self.write_function(out, f),
            GcObject::Native(n) => {
                out.push_str("<native fn ");
                out.push_str(&n.name);
                out.push('>');
            }
            GcObject::Upvalue(_) => out.push_str("<upvalue>"),
            GcObject::Closure(c) => self.write_function(out, self.function(c.function)),
            GcObject::Pair(p) => {
                if depth >= MAX_STRINGIFY_DEPTH {
                    out.push_str("(...)");
                    return;
                }
                out.push('(');
                self.write_value(out, p.first, depth + 1);
                out.push_str(", ");
                self.write_value(out, p.second, depth + 1);
                out.push(')');
            }
        }
    }

    fn write_function(&self, out: &mut String, function: &Function) {
        match function.name {
            Some(name) => {
                out.push_str("<fn ");
                out.push_str(self.as_str(name));
                out.push('>');
            }
            None => out.push_str("<script>"),
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(GcConfig::default())
    }
}
