//! Process-wide cache of compiled expressions, keyed by expression text.
//!
//! The same selectors are compiled over and over by operations applied to
//! many views and by the converter's rule table.

use super::compiler::{compile, CompiledExpr};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, OnceLock};

const CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(512) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

static CACHE: OnceLock<Mutex<LruCache<String, Arc<CompiledExpr>>>> = OnceLock::new();

fn get_cache() -> &'static Mutex<LruCache<String, Arc<CompiledExpr>>> {
    CACHE.get_or_init(|| Mutex::new(LruCache::new(CACHE_CAPACITY)))
}

/// Compiled form of `xpath`, compiling and caching it on first use
pub fn get_or_compile(xpath: &str) -> Result<Arc<CompiledExpr>, String> {
    if let Ok(mut cache) = get_cache().lock() {
        if let Some(compiled) = cache.get(xpath) {
            return Ok(Arc::clone(compiled));
        }
    }

    // Compile outside the lock; failures are not cached
    let compiled = Arc::new(compile(xpath)?);
    if let Ok(mut cache) = get_cache().lock() {
        cache.put(xpath.to_string(), Arc::clone(&compiled));
    }
    Ok(compiled)
}
