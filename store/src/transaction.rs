//! Read and write transaction handles.
//!
//! A write transaction is exclusive across the process; readers run
//! concurrently against a consistent view. Any thread may open either kind —
//! nothing here is thread-local.

use crate::environment::{Databases, Environment};
use std::sync::{RwLockReadGuard, RwLockWriteGuard};

/// Read access common to both transaction kinds.
pub trait Transaction {
    fn dbs(&self) -> &Databases;
}

pub struct ReadTransaction<'a> {
    guard: RwLockReadGuard<'a, Databases>,
}

pub struct WriteTransaction<'a> {
    guard: RwLockWriteGuard<'a, Databases>,
}

impl<'a> ReadTransaction<'a> {
    pub(crate) fn new(env: &'a Environment) -> Self {
        Self {
            guard: env.dbs.read().expect("store lock poisoned"),
        }
    }
}

impl<'a> WriteTransaction<'a> {
    pub(crate) fn new(env: &'a Environment) -> Self {
        Self {
            guard: env.dbs.write().expect("store lock poisoned"),
        }
    }

    pub fn dbs_mut(&mut self) -> &mut Databases {
        &mut self.guard
    }
}

impl Transaction for ReadTransaction<'_> {
    fn dbs(&self) -> &Databases {
        &self.guard
    }
}

impl Transaction for WriteTransaction<'_> {
    fn dbs(&self) -> &Databases {
        &self.guard
    }
}
