//! Parametric cell factories with deduplicating caches.
//!
//! A [`CellFactory`] wraps a cell-construction function. Calls are keyed by
//! the canonicalized parameter map: equal parameters (modulo map ordering)
//! return the same cell identity, the result is auto-named and locked on
//! first publication, and the per-factory cache is a strict LRU whose
//! evictions are logged.

use arcstr::ArcStr;
use indexmap::IndexMap;
use laydb::CellId;

use crate::error::Result;
use crate::layout::{FactoryCache, KCLayout};
use crate::settings::{get_component_name, Value};

/// The parameter map of a factory call.
pub type Params = IndexMap<ArcStr, Value>;

/// The default cache capacity of a factory.
pub const DEFAULT_CACHE_SIZE: usize = 512;

/// The cell-construction function wrapped by a factory.
pub type BuildFn = Box<dyn Fn(&mut KCLayout, &Params) -> Result<CellId>>;

/// A parametric cell factory.
///
/// The factory owns its defaults and flags; the call cache lives in the
/// registry so that cached cells share the registry's lifetime.
pub struct CellFactory {
    name: ArcStr,
    defaults: Params,
    units: IndexMap<ArcStr, ArcStr>,
    set_name: bool,
    set_settings: bool,
    cache_size: usize,
    build: BuildFn,
}

impl CellFactory {
    /// Creates a factory around `build`.
    ///
    /// `name` doubles as the function identity for cache keying and as the
    /// name prefix of produced cells.
    pub fn new(
        name: impl Into<ArcStr>,
        build: impl Fn(&mut KCLayout, &Params) -> Result<CellId> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            defaults: Params::new(),
            units: IndexMap::new(),
            set_name: true,
            set_settings: true,
            cache_size: DEFAULT_CACHE_SIZE,
            build: Box::new(build),
        }
    }

    /// The name (and function identity) of the factory.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Declares a parameter default, builder-style.
    pub fn default_param(mut self, name: impl Into<ArcStr>, value: impl Into<Value>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    /// Declares the unit recorded for a parameter (e.g. `"dbu"`).
    pub fn unit(mut self, name: impl Into<ArcStr>, unit: impl Into<ArcStr>) -> Self {
        self.units.insert(name.into(), unit.into());
        self
    }

    /// Disables the automatic `{name}_{params}` renaming.
    pub fn keep_name(mut self) -> Self {
        self.set_name = false;
        self
    }

    /// Disables settings capture on produced cells.
    pub fn keep_settings(mut self) -> Self {
        self.set_settings = false;
        self
    }

    /// Overrides the cache capacity.
    pub fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = size.max(1);
        self
    }

    /// Calls the factory.
    ///
    /// Binds `args` over the declared defaults, canonicalizes, and consults
    /// the cache: a hit returns the cached cell identity; a miss invokes
    /// the build function, names and locks the result, and inserts it.
    pub fn call(
        &self,
        kcl: &mut KCLayout,
        args: impl IntoIterator<Item = (ArcStr, Value)>,
    ) -> Result<CellId> {
        let mut params = self.defaults.clone();
        for (key, value) in args {
            params.insert(key, value);
        }
        let key = cache_key(&params);

        if let Some(id) = self.cache_lookup(kcl, &key) {
            return Ok(id);
        }

        let mut id = (self.build)(kcl, &params)?;
        if kcl[id].locked() {
            id = kcl.copy_cell(id)?;
        }
        if self.set_name {
            kcl.rename_cell(id, get_component_name(&self.name, &params))?;
        }
        if self.set_settings {
            let cell = kcl.kcell_mut(id);
            cell.settings = params.clone();
            cell.settings_units = self
                .units
                .iter()
                .filter(|(k, _)| params.contains_key(k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            cell.function_name = Some(self.name.clone());
            self.publish_properties(kcl, id, &params);
        }
        kcl.lock(id);
        self.cache_insert(kcl, key, id);
        Ok(id)
    }

    /// Mirrors each setting as a `"key: value"` property on the backend
    /// cell, continuing after any property indices already in use.
    fn publish_properties(&self, kcl: &mut KCLayout, id: CellId, params: &Params) {
        let mut index = 0u32;
        let raw = kcl.layout();
        while raw.cell(id).property(index).is_some() {
            index += 1;
        }
        let rendered: Vec<(u32, String)> = params
            .iter()
            .enumerate()
            .map(|(i, (key, value))| (index + i as u32, format!("{key}: {value}")))
            .collect();
        for (i, text) in rendered {
            kcl.set_cell_property(id, i, text);
        }
    }

    fn cache_lookup(&self, kcl: &mut KCLayout, key: &[u8]) -> Option<CellId> {
        let cache = kcl.caches.get_mut(&self.name)?;
        // refresh recency on hit
        let id = cache.entries.shift_remove(key)?;
        cache.entries.insert(key.to_vec(), id);
        Some(id)
    }

    fn cache_insert(&self, kcl: &mut KCLayout, key: Vec<u8>, id: CellId) {
        let mut evicted = Vec::new();
        {
            let cache = kcl
                .caches
                .entry(self.name.clone())
                .or_insert_with(|| FactoryCache {
                    entries: IndexMap::new(),
                });
            cache.entries.insert(key, id);
            while cache.entries.len() > self.cache_size {
                let (_, old) = cache.entries.shift_remove_index(0).expect("non-empty");
                evicted.push(old);
            }
        }
        for old in evicted {
            tracing::warn!(
                cell = %kcl.kcell(old).name(),
                "cell was evicted from the factory cache; a repeated call will \
                 re-execute the factory function"
            );
        }
    }
}

fn cache_key(params: &Params) -> Vec<u8> {
    let canonical = Value::Map(params.clone()).canonical();
    serde_json::to_vec(&canonical.to_json()).expect("canonical params serialize")
}

#[cfg(test)]
mod tests {
    use super::*;
    use geometry::polygon::Polygon;
    use geometry::rect::Rect;

    fn straight_factory() -> CellFactory {
        CellFactory::new("straight", |kcl, params| {
            let length = match params.get("length") {
                Some(Value::Float(l)) => kcl.to_dbu(*l),
                Some(Value::Int(l)) => *l,
                _ => 10_000,
            };
            let width = match params.get("width") {
                Some(Value::Float(w)) => kcl.to_dbu(*w),
                Some(Value::Int(w)) => *w,
                _ => 500,
            };
            let layer = kcl.layer(1, 0);
            let cell = kcl.create_cell("straight", true)?;
            kcl.shapes_mut(cell, layer)?
                .polygons
                .push(Polygon::from_rect(Rect::from_sides(
                    0,
                    -width / 2,
                    length,
                    width / 2,
                )));
            kcl.kcell_mut(cell)
                .create_port(crate::port::Port::at("o1", 2, (0, 0), width, layer))?;
            kcl.kcell_mut(cell)
                .create_port(crate::port::Port::at("o2", 0, (length, 0), width, layer))?;
            Ok(cell)
        })
        .default_param("length", Value::Float(10.0))
        .default_param("width", Value::Float(0.5))
        .unit("length", "um")
        .unit("width", "um")
    }

    fn args(entries: &[(&str, Value)]) -> Vec<(ArcStr, Value)> {
        entries
            .iter()
            .map(|(k, v)| (ArcStr::from(*k), v.clone()))
            .collect()
    }

    #[test]
    fn equal_calls_return_the_same_cell() {
        let mut kcl = KCLayout::default();
        let factory = straight_factory();
        let a = factory
            .call(&mut kcl, args(&[("length", Value::Float(10.0))]))
            .unwrap();
        let b = factory
            .call(&mut kcl, args(&[("length", Value::Float(10.0))]))
            .unwrap();
        assert_eq!(a, b);
        let c = factory
            .call(&mut kcl, args(&[("length", Value::Float(20.0))]))
            .unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn argument_order_does_not_matter() {
        let mut kcl = KCLayout::default();
        let factory = straight_factory();
        let a = factory
            .call(
                &mut kcl,
                args(&[
                    ("length", Value::Float(12.0)),
                    ("width", Value::Float(1.0)),
                ]),
            )
            .unwrap();
        let b = factory
            .call(
                &mut kcl,
                args(&[
                    ("width", Value::Float(1.0)),
                    ("length", Value::Float(12.0)),
                ]),
            )
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn produced_cells_are_named_locked_and_published() {
        let mut kcl = KCLayout::default();
        let factory = straight_factory();
        let id = factory.call(&mut kcl, args(&[])).unwrap();
        let cell = &kcl[id];
        assert!(cell.name().starts_with("straight_"));
        assert!(cell.locked());
        assert_eq!(cell.settings().get("length"), Some(&Value::Float(10.0)));
        assert_eq!(cell.settings().get("width"), Some(&Value::Float(0.5)));
        assert_eq!(
            cell.settings_units().get("length").map(|s| s.as_str()),
            Some("um")
        );
        assert_eq!(cell.function_name().map(|s| s.as_str()), Some("straight"));
        // settings are mirrored as backend properties
        let prop = kcl.layout().cell(id).property(0).unwrap();
        assert_eq!(prop.as_str(), "length: 10");
    }

    #[test]
    fn lru_eviction_is_strict_and_warns() {
        let mut kcl = KCLayout::default();
        let factory = straight_factory().cache_size(2);
        let a = factory
            .call(&mut kcl, args(&[("length", Value::Float(1.0))]))
            .unwrap();
        let _b = factory
            .call(&mut kcl, args(&[("length", Value::Float(2.0))]))
            .unwrap();
        // touch `a` so `b` becomes least recently used
        let a_again = factory
            .call(&mut kcl, args(&[("length", Value::Float(1.0))]))
            .unwrap();
        assert_eq!(a, a_again);
        let _c = factory
            .call(&mut kcl, args(&[("length", Value::Float(3.0))]))
            .unwrap();
        // `a` stayed cached; `b` was evicted, so re-calling rebuilds a new cell
        let a_cached = factory
            .call(&mut kcl, args(&[("length", Value::Float(1.0))]))
            .unwrap();
        assert_eq!(a, a_cached);
        let b_rebuilt = factory
            .call(&mut kcl, args(&[("length", Value::Float(2.0))]))
            .unwrap();
        assert_ne!(_b, b_rebuilt);
    }

    #[test]
    fn locked_result_is_copied_before_publication() {
        let mut kcl = KCLayout::default();
        let prebuilt = kcl.create_cell("prebuilt", false).unwrap();
        kcl.lock(prebuilt);
        let factory = CellFactory::new("reuse", move |_, _| Ok(prebuilt));
        let id = factory.call(&mut kcl, args(&[])).unwrap();
        assert_ne!(id, prebuilt);
        assert!(kcl[id].locked());
    }
}
