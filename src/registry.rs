//! By-name lookup of the collaborators a material may reference from its input block.

use crate::coordinate_system::LocalFrame;
use crate::error::{MaterialError, Result};
use crate::interfaces::{Function, Functor, UserObject};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A shared collaborator together with the name it was looked up by.
pub struct Named<T: ?Sized> {
    pub name: String,
    pub source: Arc<T>,
}

impl<T: ?Sized> Clone for Named<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            source: Arc::clone(&self.source),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Named<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Named({:?})", self.name)
    }
}

#[derive(Default, Clone)]
pub struct Registry {
    functions: HashMap<String, Arc<dyn Function>>,
    functors: HashMap<String, Arc<dyn Functor>>,
    user_objects: HashMap<String, Arc<dyn UserObject>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("functors", &self.functors.keys().collect::<Vec<_>>())
            .field("user_objects", &self.user_objects.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, name: &str, function: impl Function + 'static) -> &mut Self {
        self.functions.insert(name.to_string(), Arc::new(function));
        self
    }

    pub fn add_functor(&mut self, name: &str, functor: impl Functor + 'static) -> &mut Self {
        self.functors.insert(name.to_string(), Arc::new(functor));
        self
    }

    pub fn add_user_object(
        &mut self,
        name: &str,
        user_object: Arc<dyn UserObject>,
    ) -> &mut Self {
        self.user_objects.insert(name.to_string(), user_object);
        self
    }

    pub fn function(&self, name: &str) -> Result<Named<dyn Function>> {
        let source = self
            .functions
            .get(name)
            .ok_or_else(|| MaterialError::UnknownObject {
                kind: "function",
                name: name.to_string(),
            })?;
        Ok(Named {
            name: name.to_string(),
            source: Arc::clone(source),
        })
    }

    pub fn functor(&self, name: &str) -> Result<Named<dyn Functor>> {
        let source = self
            .functors
            .get(name)
            .ok_or_else(|| MaterialError::UnknownObject {
                kind: "functor",
                name: name.to_string(),
            })?;
        Ok(Named {
            name: name.to_string(),
            source: Arc::clone(source),
        })
    }

    pub fn user_object(&self, name: &str) -> Result<&dyn UserObject> {
        self.user_objects
            .get(name)
            .map(|uo| uo.as_ref())
            .ok_or_else(|| MaterialError::UnknownObject {
                kind: "user object",
                name: name.to_string(),
            })
    }

    pub fn local_frame(&self, name: &str) -> Result<&dyn LocalFrame> {
        let user_object = self.user_object(name)?;
        user_object
            .as_local_frame()
            .ok_or_else(|| MaterialError::WrongObjectKind {
                name: name.to_string(),
                expected: "local coordinate system",
                found: user_object.type_name().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate_system::CartesianLocalCoordinateSystem;
    use crate::interfaces::QpContext;
    use nalgebra::Point3;

    struct Counter;

    impl UserObject for Counter {
        fn type_name(&self) -> &'static str {
            "Counter"
        }
    }

    #[test]
    fn looks_up_collaborators_by_name() {
        let mut registry = Registry::new();
        registry
            .add_function("ramp", |t: f64, _p: &Point3<f64>| t)
            .add_functor("one", |_qp: &QpContext| 1.0)
            .add_user_object(
                "bedding",
                Arc::new(CartesianLocalCoordinateSystem::from_geological_angles([0.0; 3]).unwrap()),
            )
            .add_user_object("counter", Arc::new(Counter));

        let ramp = registry.function("ramp").unwrap();
        assert_eq!(ramp.name, "ramp");
        assert_eq!(ramp.source.value(2.0, &Point3::origin()), Ok(2.0));
        let qp = QpContext::new(0, 0, Point3::origin(), 0.0);
        assert_eq!(registry.functor("one").unwrap().source.value(&qp), Ok(1.0));
        assert!(registry.local_frame("bedding").is_ok());
        assert_eq!(format!("{:?}", ramp), "Named(\"ramp\")");
    }

    #[test]
    fn reports_missing_and_mistyped_objects() {
        let mut registry = Registry::new();
        registry.add_user_object("counter", Arc::new(Counter));
        assert!(matches!(
            registry.function("ramp"),
            Err(MaterialError::UnknownObject { kind: "function", .. })
        ));
        assert!(matches!(
            registry.local_frame("bedding"),
            Err(MaterialError::UnknownObject { .. })
        ));
        assert_eq!(
            registry.local_frame("counter").err(),
            Some(MaterialError::WrongObjectKind {
                name: "counter".into(),
                expected: "local coordinate system",
                found: "Counter".into(),
            })
        );
    }
}
