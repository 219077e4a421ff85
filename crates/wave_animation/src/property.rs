//! Property descriptors
//!
//! A [`Property`] names one animatable field of a host type and carries the
//! accessor pair used to read and write it. Animations are bound to a
//! `(object identity, property key)` pair through a [`BindingKey`].

use std::fmt;

/// Opaque name of an animatable property
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyKey(&'static str);

impl PropertyKey {
    pub const fn new(name: &'static str) -> Self {
        PropertyKey(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Typed accessor pair for one property of `O`
///
/// ```rust
/// use wave_animation::Property;
///
/// struct Layer {
///     opacity: f64,
/// }
///
/// let opacity = Property::new("opacity", |layer: &Layer| layer.opacity, |layer, value| {
///     layer.opacity = value
/// });
/// let mut layer = Layer { opacity: 1.0 };
/// opacity.write(&mut layer, 0.5);
/// assert_eq!(opacity.read(&layer), 0.5);
/// ```
pub struct Property<O, T> {
    key: PropertyKey,
    get: fn(&O) -> T,
    set: fn(&mut O, T),
}

impl<O, T> Property<O, T> {
    pub const fn new(name: &'static str, get: fn(&O) -> T, set: fn(&mut O, T)) -> Self {
        Self {
            key: PropertyKey::new(name),
            get,
            set,
        }
    }

    pub fn key(&self) -> PropertyKey {
        self.key
    }

    pub fn read(&self, object: &O) -> T {
        (self.get)(object)
    }

    pub fn write(&self, object: &mut O, value: T) {
        (self.set)(object, value)
    }

    pub(crate) fn setter(&self) -> fn(&mut O, T) {
        self.set
    }
}

impl<O, T> Clone for Property<O, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O, T> Copy for Property<O, T> {}

impl<O, T> fmt::Debug for Property<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Property").field(&self.key).finish()
    }
}

/// Identity of an animated `(object, property)` pair
///
/// The object is identified by its allocation address, which is stable
/// while the object is alive. Bindings whose owner has been dropped are
/// pruned by the scheduler before the address can be reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindingKey {
    pub object: usize,
    pub key: PropertyKey,
}

impl BindingKey {
    pub fn new(object: usize, key: PropertyKey) -> Self {
        Self { object, key }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Host {
        width: f64,
    }

    #[test]
    fn test_accessors() {
        let width = Property::new("width", |h: &Host| h.width, |h, v| h.width = v);
        let mut host = Host { width: 10.0 };

        width.write(&mut host, 42.0);
        assert_eq!(width.read(&host), 42.0);
        assert_eq!(width.key().name(), "width");
        assert_eq!(width.key().to_string(), "width");
    }

    #[test]
    fn test_binding_keys_distinguish_objects() {
        let key = PropertyKey::new("x");
        assert_ne!(BindingKey::new(1, key), BindingKey::new(2, key));
        assert_eq!(BindingKey::new(1, key), BindingKey::new(1, key));
    }
}
