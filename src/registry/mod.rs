//! The process-wide signature registry.
//!
//! Each capability set owns one [`Layout`]: the ordered list of its call
//! shapes, where a call shape's position is its slot index. The layout is
//! registered by the first dispatch table built for the capability set and
//! never changes afterwards. Every later table, for any concrete type, must
//! list the same call shapes in the same order.
//!
//! ```
//! use dynpoly::{prelude::*, registry};
//!
//! method! {
//!     pub struct Area: fn(&self) -> f64;
//!     pub struct Scale: fn(&mut self, f64);
//! }
//!
//! pub struct Shape;
//! impl Capability for Shape {}
//! impl Bind<f64> for Shape {
//!     fn bind(table: &mut TableBuilder<Self, f64>) {
//!         table
//!             .method::<Area>(|side, ()| side * side)
//!             .method_mut::<Scale>(|side, (by,)| *side *= by);
//!     }
//! }
//!
//! assert!(registry::layout::<Shape>().is_none());
//! assert_eq!(registry::slot_count::<Shape>(), 0);
//!
//! let _square: Poly<Shape> = Poly::new(2.0_f64);
//!
//! let layout = registry::layout::<Shape>().unwrap();
//! assert_eq!(registry::slot_count::<Shape>(), 2);
//! assert_eq!(layout.slot_of::<Area>(), Some(0));
//! assert_eq!(layout.slot_of::<Scale>(), Some(1));
//! ```

pub(crate) mod lock;

use alloc::boxed::Box;
use core::any::TypeId;

use dynpoly_internals::RawEntry;
use hashbrown::{HashMap, hash_map::Entry};
use indexmap::IndexMap;
use rootcause::Report;
use rustc_hash::FxBuildHasher;

use self::lock::GlobalLock;
use crate::{BindError, Capability, ReceiverKind};

static LAYOUTS: GlobalLock<HashMap<TypeId, &'static Layout, FxBuildHasher>> = GlobalLock::new();

/// Description of one slot of a [`Layout`].
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct MethodInfo {
    type_id: TypeId,
    name: &'static str,
    receiver: ReceiverKind,
}

impl MethodInfo {
    /// The [`TypeId`] of the call shape.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The type name of the call shape.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the call shape takes `&self` or `&mut self`.
    pub fn receiver(&self) -> ReceiverKind {
        self.receiver
    }
}

/// The ordered call shapes of one capability set.
#[derive(Clone, Debug)]
pub struct Layout {
    capability_name: &'static str,
    methods: IndexMap<TypeId, MethodInfo, FxBuildHasher>,
}

impl Layout {
    pub(crate) fn from_entries<'a>(
        capability_name: &'static str,
        entries: impl IntoIterator<Item = &'a RawEntry>,
    ) -> Self {
        let methods = entries
            .into_iter()
            .map(|entry| {
                let info = MethodInfo {
                    type_id: entry.method_type_id(),
                    name: entry.method_name(),
                    receiver: entry.receiver(),
                };
                (info.type_id, info)
            })
            .collect();

        Self {
            capability_name,
            methods,
        }
    }

    /// The name of the capability set, see [`Capability::name`].
    pub fn capability_name(&self) -> &'static str {
        self.capability_name
    }

    /// The number of slots.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if the capability set has no call shapes.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// The slot index of the call shape `M`, if it is part of the layout.
    pub fn slot_of<M: 'static>(&self) -> Option<usize> {
        self.slot_of_id(TypeId::of::<M>())
    }

    /// The slot index of the call shape with the given [`TypeId`], if it is
    /// part of the layout.
    pub fn slot_of_id(&self, method: TypeId) -> Option<usize> {
        self.methods.get_index_of(&method)
    }

    /// The type name of the call shape in `slot`.
    pub fn method_name(&self, slot: usize) -> Option<&'static str> {
        self.get(slot).map(MethodInfo::name)
    }

    /// The description of `slot`.
    pub fn get(&self, slot: usize) -> Option<&MethodInfo> {
        self.methods.get_index(slot).map(|(_, info)| info)
    }

    /// Iterates over the slots in order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &MethodInfo> + '_ {
        self.methods.values()
    }

    /// Checks that `candidate` has exactly the same slots as this layout.
    fn check(&self, candidate: &Layout) -> Result<(), Report<BindError>> {
        let slots = self.len().max(candidate.len());
        let mismatch = (0..slots).find(|&slot| {
            self.get(slot).map(MethodInfo::type_id) != candidate.get(slot).map(MethodInfo::type_id)
        });

        match mismatch {
            None => Ok(()),
            Some(slot) => {
                let registered = self.method_name(slot);
                let found = candidate.method_name(slot);
                warn_event!(
                    capability = self.capability_name,
                    slot,
                    ?registered,
                    ?found,
                    "dispatch table does not match the registered layout"
                );
                Err(Report::new(BindError::LayoutMismatch {
                    capability: self.capability_name,
                    slot,
                    registered,
                    found,
                }))
            }
        }
    }
}

/// The layout registered for the capability set `I`, or `None` if no dispatch
/// table has been built for it yet.
pub fn layout<I: Capability>() -> Option<&'static Layout> {
    LAYOUTS
        .read()
        .get()
        .and_then(|layouts| layouts.get(&TypeId::of::<I>()).copied())
}

/// The number of slots registered for the capability set `I`, or 0 if no
/// dispatch table has been built for it yet.
pub fn slot_count<I: Capability>() -> usize {
    layout::<I>().map_or(0, Layout::len)
}

/// Registers `candidate` as the layout of `I` unless one is registered
/// already, in which case `candidate` must match it.
pub(crate) fn register<I: Capability>(
    candidate: Layout,
) -> Result<&'static Layout, Report<BindError>> {
    if let Some(existing) = layout::<I>() {
        existing.check(&candidate)?;
        return Ok(existing);
    }

    let mut guard = LAYOUTS.write();
    let existing = match guard.get_or_default().entry(TypeId::of::<I>()) {
        Entry::Occupied(entry) => *entry.get(),
        Entry::Vacant(entry) => {
            debug_event!(
                capability = candidate.capability_name,
                slots = candidate.len(),
                "registered layout"
            );
            let layout: &'static Layout = Box::leak(Box::new(candidate));
            entry.insert(layout);
            return Ok(layout);
        }
    };
    drop(guard);

    existing.check(&candidate)?;
    Ok(existing)
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::{Exclusive, Method, Shared};

    struct First;
    impl Method for First {
        type Receiver = Shared;
        type Args<'a> = ();
        type Output = u32;
    }

    struct Second;
    impl Method for Second {
        type Receiver = Exclusive;
        type Args<'a> = (u32,);
        type Output = ();
    }

    fn first_then_second() -> Layout {
        let entries = [
            RawEntry::shared::<u32, First>(|value, ()| *value),
            RawEntry::exclusive::<u32, Second>(|value, (new,)| *value = new),
        ];
        Layout::from_entries("Pair", &entries)
    }

    #[test]
    fn test_layout_queries() {
        let layout = first_then_second();
        assert_eq!(layout.capability_name(), "Pair");
        assert_eq!(layout.len(), 2);
        assert!(!layout.is_empty());
        assert_eq!(layout.slot_of::<First>(), Some(0));
        assert_eq!(layout.slot_of::<Second>(), Some(1));
        assert_eq!(layout.slot_of::<u8>(), None);
        assert_eq!(layout.get(1).map(MethodInfo::receiver), Some(ReceiverKind::Exclusive));
        assert!(layout.method_name(0).is_some_and(|name| name.ends_with("First")));
        assert_eq!(layout.method_name(2), None);

        let ids: Vec<TypeId> = layout.iter().map(MethodInfo::type_id).collect();
        assert_eq!(ids, [TypeId::of::<First>(), TypeId::of::<Second>()]);
    }

    #[test]
    fn test_layout_check() {
        let layout = first_then_second();
        assert!(layout.check(&first_then_second()).is_ok());

        let swapped = Layout::from_entries(
            "Pair",
            &[
                RawEntry::exclusive::<u32, Second>(|value, (new,)| *value = new),
                RawEntry::shared::<u32, First>(|value, ()| *value),
            ],
        );
        let report = layout.check(&swapped).unwrap_err();
        assert!(matches!(
            report.current_context(),
            BindError::LayoutMismatch { slot: 0, .. }
        ));

        let first = RawEntry::shared::<u32, First>(|value, ()| *value);
        let shorter = Layout::from_entries("Pair", &[first]);
        let report = layout.check(&shorter).unwrap_err();
        assert!(matches!(
            report.current_context(),
            BindError::LayoutMismatch {
                slot: 1,
                found: None,
                ..
            }
        ));
    }

    struct Registered;
    impl Capability for Registered {}

    #[test]
    fn test_register_first_wins() {
        assert!(layout::<Registered>().is_none());
        assert_eq!(slot_count::<Registered>(), 0);

        let registered = register::<Registered>(first_then_second()).unwrap();
        assert_eq!(slot_count::<Registered>(), 2);
        assert!(core::ptr::eq(registered, layout::<Registered>().unwrap()));

        let again = register::<Registered>(first_then_second()).unwrap();
        assert!(core::ptr::eq(registered, again));

        let empty = Layout::from_entries("Pair", core::iter::empty());
        assert!(register::<Registered>(empty).is_err());
        assert_eq!(slot_count::<Registered>(), 2);
    }
}
