use crate::error::TypeError;
use crate::meta::ObjectMeta;

/// An object kind the store can hold.
///
/// The store is generic over `Resource` and only ever touches an object
/// through these accessors. `Default` is the zero-value constructor handed
/// to decoders, and `Clone` is the deep copy used at every boundary
/// crossing, so implementations must not share interior state between
/// clones.
///
/// The accessors are fallible because schemaless representations (see
/// [`crate::DynamicObject`]) can hold metadata that does not decode.
/// Typed structs implement them infallibly.
pub trait Resource: Clone + Default + Send + Sync + 'static {
    /// Read the identity metadata.
    fn meta(&self) -> Result<ObjectMeta, TypeError>;

    /// Replace the identity metadata.
    fn set_meta(&mut self, meta: ObjectMeta) -> Result<(), TypeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Widget {
        metadata: ObjectMeta,
        size: u32,
    }

    impl Resource for Widget {
        fn meta(&self) -> Result<ObjectMeta, TypeError> {
            Ok(self.metadata.clone())
        }

        fn set_meta(&mut self, meta: ObjectMeta) -> Result<(), TypeError> {
            self.metadata = meta;
            Ok(())
        }
    }

    #[test]
    fn typed_resource_roundtrips_metadata() {
        let mut w = Widget::default();
        w.set_meta(ObjectMeta::namespaced("ns", "w1")).unwrap();
        let meta = w.meta().unwrap();
        assert_eq!(meta.name, "w1");
        assert_eq!(meta.namespace, "ns");
        assert_eq!(w.size, 0);
    }

    #[test]
    fn clones_are_independent() {
        let mut a = Widget::default();
        a.set_meta(ObjectMeta::named("a")).unwrap();
        let mut b = a.clone();
        b.metadata.name = "b".into();
        assert_eq!(a.meta().unwrap().name, "a");
    }
}
