//! # Type Scanner
//!
//! Enumerates the signal types and handler types declared across a set of
//! [`TypeUniverse`]s.
//!
//! The lazy iterators ([`TypeScanner::signal_types`],
//! [`TypeScanner::handler_types`]) walk universes in order. [`TypeScanner::scan`]
//! does the same work with rayon when parallel scanning is on; rayon's ordered
//! collect keeps the result identical to the sequential walk, so the
//! enumeration order is stable: universe order, then registration order.
//! A type registered in several universes is reported once, at its first
//! position. Handler registrations of the same type are merged there, so every
//! capability declared anywhere is kept.

use super::universe::{HandlerDescriptor, TypeUniverse};
use crate::signal::TypeKey;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Signal and handler types found by one scan.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub signals: Vec<TypeKey>,
    /// One descriptor per handler type, with capabilities merged across registrations.
    pub handlers: Vec<HandlerDescriptor>,
}

#[derive(Debug, Clone, Copy)]
pub struct TypeScanner<'u> {
    universes: &'u [TypeUniverse],
    parallel: bool,
}

impl<'u> TypeScanner<'u> {
    pub fn new(universes: &'u [TypeUniverse]) -> Self {
        Self {
            universes,
            parallel: true,
        }
    }

    #[must_use]
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Every declared signal type, lazily, duplicates included.
    pub fn signal_types(&self) -> impl Iterator<Item = TypeKey> + 'u {
        self.universes
            .iter()
            .flat_map(|universe| universe.signals().iter().copied())
    }

    /// Every registered type that implements at least one handler capability, lazily.
    pub fn handler_types(&self) -> impl Iterator<Item = &'u HandlerDescriptor> + 'u {
        self.universes
            .iter()
            .flat_map(|universe| universe.handlers().iter())
            .filter(|descriptor| descriptor.is_handler())
    }

    /// Collect signal and handler types, deduplicated by type.
    pub fn scan(&self) -> ScanResult {
        let (signals, handlers): (Vec<TypeKey>, Vec<&'u HandlerDescriptor>) = if self.parallel {
            let signals = self
                .universes
                .par_iter()
                .flat_map_iter(|universe| universe.signals().iter().copied())
                .collect();
            let handlers = self
                .universes
                .par_iter()
                .flat_map_iter(|universe| universe.handlers().iter())
                .filter(|descriptor| descriptor.is_handler())
                .collect();
            (signals, handlers)
        } else {
            (self.signal_types().collect(), self.handler_types().collect())
        };

        let mut seen = HashSet::new();
        let signals: Vec<TypeKey> = signals.into_iter().filter(|key| seen.insert(*key)).collect();

        let handlers = merge_handlers(handlers);

        debug!(
            universes = self.universes.len(),
            signals = signals.len(),
            handlers = handlers.len(),
            parallel = self.parallel,
            "Scanned type universes"
        );

        ScanResult { signals, handlers }
    }
}

fn merge_handlers(registrations: Vec<&HandlerDescriptor>) -> Vec<HandlerDescriptor> {
    let mut merged: Vec<HandlerDescriptor> = Vec::with_capacity(registrations.len());
    let mut positions: HashMap<TypeKey, usize> = HashMap::new();

    for descriptor in registrations {
        match positions.get(&descriptor.handler()) {
            Some(&position) => merged[position].merge(descriptor),
            None => {
                positions.insert(descriptor.handler(), merged.len());
                merged.push(descriptor.clone());
            }
        }
    }
    merged
}
