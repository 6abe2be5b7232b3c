//! Storage for resolved environment values and services.
//!
//! Entries live as long as the owning [Settings](crate::config::Settings)
//! and are never refreshed. The platform environment is static for the life
//! of a process, so the only way to re-resolve is clearing the cache or
//! switching caching off.

use crate::config::services::ServiceDescriptor;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

static CACHING_ENABLED: AtomicBool = AtomicBool::new(true);

/// Turns caching off for every resolver in the process.
pub fn disable_caching() {
    CACHING_ENABLED.store(false, Ordering::SeqCst);
}

pub fn enable_caching() {
    CACHING_ENABLED.store(true, Ordering::SeqCst);
}

pub fn is_caching_enabled() -> bool {
    CACHING_ENABLED.load(Ordering::SeqCst)
}

/// Separates the key spaces of environment variables and services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDomain {
    Env,
    Service,
}

impl CacheDomain {
    fn prefix(self) -> &'static str {
        match self {
            CacheDomain::Env => "env_",
            CacheDomain::Service => "service_",
        }
    }

    pub fn key(self, name: &str) -> String {
        format!("{}{}", self.prefix(), name)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum CacheEntry {
    Env(Arc<Value>),
    /// `None` records that the name resolved to no service.
    Service(Option<Arc<ServiceDescriptor>>),
}

#[derive(Debug, Default)]
pub(crate) struct Cache {
    entries: HashMap<String, CacheEntry>,
}

impl Cache {
    pub(crate) fn env(&self, name: &str) -> Option<Arc<Value>> {
        match self.entries.get(&CacheDomain::Env.key(name)) {
            Some(CacheEntry::Env(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub(crate) fn store_env(&mut self, name: &str, value: Arc<Value>) {
        self.entries
            .insert(CacheDomain::Env.key(name), CacheEntry::Env(value));
    }

    /// The outer `None` means "not cached", the inner one "cached as absent".
    #[allow(clippy::option_option)]
    pub(crate) fn service(&self, name: &str) -> Option<Option<Arc<ServiceDescriptor>>> {
        match self.entries.get(&CacheDomain::Service.key(name)) {
            Some(CacheEntry::Service(service)) => Some(service.clone()),
            _ => None,
        }
    }

    pub(crate) fn store_service(&mut self, name: &str, service: Option<Arc<ServiceDescriptor>>) {
        self.entries
            .insert(CacheDomain::Service.key(name), CacheEntry::Service(service));
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
