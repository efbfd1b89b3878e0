/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Identifiers for the objects tracked by the process model.
//!
//! There is no global or thread-local namespace: every id is handed out by an
//! [`IdSequence`] owned by the object responsible for that kind of id (the process
//! registry for processes, a profile for browsing and site instances, and so on).

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

macro_rules! namespace_id {
    ($id_name:ident, $display_prefix:literal) => {
        #[derive(
            Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
        )]
        pub struct $id_name(pub u64);

        impl $id_name {
            pub fn index(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $id_name {
            fn from(index: u64) -> Self {
                $id_name(index)
            }
        }

        impl fmt::Display for $id_name {
            fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "{}{}", $display_prefix, self.0)
            }
        }
    };
}

namespace_id! {ProcessId, "Process"}
namespace_id! {SiteInstanceId, "SiteInstance"}
namespace_id! {BrowsingInstanceId, "BrowsingInstance"}
namespace_id! {RenderHostId, "RenderHost"}
namespace_id! {RequestId, "Request"}

/// A monotonically increasing source of ids of one kind. Ids start at 1 and are never
/// reused for the lifetime of the sequence.
pub struct IdSequence<T> {
    next: AtomicU64,
    marker: PhantomData<fn() -> T>,
}

impl<T: From<u64>> IdSequence<T> {
    pub fn new() -> Self {
        IdSequence {
            next: AtomicU64::new(1),
            marker: PhantomData,
        }
    }

    pub fn next_id(&self) -> T {
        T::from(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl<T: From<u64>> Default for IdSequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for IdSequence<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("IdSequence")
            .field("next", &self.next.load(Ordering::Relaxed))
            .finish()
    }
}
