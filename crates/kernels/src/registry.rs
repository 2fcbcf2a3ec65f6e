// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Place-keyed kernel registry.
//!
//! Several kernels may implement the same operator for different places.
//! [`KernelRegistry::select`] picks, among the entries compatible with the
//! requested place, the one matching the most axes exactly. Equal scores
//! resolve to the entry registered first, so selection depends only on
//! registration order, which is fixed by [`crate::register_builtin_kernels`].

use crate::{Kernel, KernelError, KernelFactory, KernelOptions};
use model_ir::OpDesc;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tensor_core::Place;

/// One registered implementation.
#[derive(Clone)]
pub struct KernelEntry {
    pub op_type: String,
    pub place: Place,
    /// Implementation name, e.g. `"fc_x86"`.
    pub name: &'static str,
    pub factory: KernelFactory,
}

impl fmt::Debug for KernelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelEntry")
            .field("op_type", &self.op_type)
            .field("place", &self.place)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registered kernels, grouped by operator type in registration order.
#[derive(Debug, Default)]
pub struct KernelRegistry {
    entries: HashMap<String, Vec<KernelEntry>>,
    /// `(op_type, requested)` → index into `entries[op_type]`.
    cache: Mutex<HashMap<(String, Place), usize>>,
}

impl KernelRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in kernel.
    pub fn with_builtins() -> Result<Self, KernelError> {
        let mut registry = Self::new();
        crate::register_builtin_kernels(&mut registry)?;
        Ok(registry)
    }

    /// Adds a kernel. Fails if `(op_type, place)` is already taken.
    pub fn register(
        &mut self,
        op_type: &str,
        place: Place,
        name: &'static str,
        factory: KernelFactory,
    ) -> Result<(), KernelError> {
        let list = self.entries.entry(op_type.to_string()).or_default();
        if list.iter().any(|e| e.place == place) {
            return Err(KernelError::DuplicateRegistration {
                op_type: op_type.to_string(),
                place,
            });
        }
        list.push(KernelEntry {
            op_type: op_type.to_string(),
            place,
            name,
            factory,
        });
        // New entries can change earlier answers.
        self.cache
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::trace!(op_type, %place, name, "registered kernel");
        Ok(())
    }

    /// Picks the best entry for `op_type` at `requested`.
    ///
    /// # Errors
    /// [`KernelError::NoCompatibleKernel`] if no entry is compatible.
    pub fn select(&self, op_type: &str, requested: &Place) -> Result<&KernelEntry, KernelError> {
        let no_kernel = || KernelError::NoCompatibleKernel {
            op_type: op_type.to_string(),
            place: *requested,
        };
        let list = self.entries.get(op_type).ok_or_else(no_kernel)?;

        let key = (op_type.to_string(), *requested);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(&idx) = cache.get(&key) {
            return Ok(&list[idx]);
        }

        let mut best: Option<(usize, u8)> = None;
        for (idx, entry) in list.iter().enumerate() {
            if let Some(score) = entry.place.match_score(requested) {
                // Strictly greater: ties keep the earlier registration.
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((idx, score));
                }
            }
        }
        let (idx, score) = best.ok_or_else(no_kernel)?;
        cache.insert(key, idx);
        tracing::debug!(
            op_type,
            %requested,
            kernel = list[idx].name,
            score,
            "resolved kernel"
        );
        Ok(&list[idx])
    }

    /// Whether any entry for `op_type` can serve `requested`.
    pub fn has_kernel(&self, op_type: &str, requested: &Place) -> bool {
        self.entries
            .get(op_type)
            .is_some_and(|l| l.iter().any(|e| e.place.is_compatible_with(requested)))
    }

    /// Selects and instantiates a kernel for `op`.
    pub fn create(
        &self,
        op: &OpDesc,
        requested: &Place,
        options: &KernelOptions,
    ) -> Result<(Box<dyn Kernel>, &KernelEntry), KernelError> {
        let entry = self.select(&op.op_type, requested)?;
        let kernel = (entry.factory)(op, options)?;
        Ok((kernel, entry))
    }

    /// Entries for `op_type` in registration order.
    pub fn candidates(&self, op_type: &str) -> &[KernelEntry] {
        self.entries.get(op_type).map_or(&[], Vec::as_slice)
    }

    /// Registered operator types, sorted.
    pub fn op_types(&self) -> Vec<&str> {
        let mut ops: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ops.sort_unstable();
        ops
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
