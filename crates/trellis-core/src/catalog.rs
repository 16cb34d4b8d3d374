//! Per-type member catalogs.
//!
//! A [`TypeCatalog`] lists what the engine may do with instances of one Rust
//! type: its constructors, its methods (setters are methods named
//! `set<Property>`), and optionally a map-insert capability. The type itself
//! declares nothing; catalogs are registered from the outside with typed
//! closures, and every parameter carries a [`ParamType`] descriptor so the
//! resolver can check compatibility before invoking anything.
//!
//! # Example
//!
//! ```
//! use trellis_core::catalog::TypeCatalog;
//!
//! #[derive(Default)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! let catalog = TypeCatalog::builder::<Point>("Point")
//!     .default_constructor()
//!     .constructor(|x: i32, y: i32| Point { x, y })
//!     .setter("X", |p: &mut Point, x: i32| p.x = x)
//!     .setter("Y", |p: &mut Point, y: i32| p.y = y)
//!     .build();
//!
//! assert_eq!(catalog.name(), "Point");
//! assert_eq!(catalog.methods_named("setX").len(), 1);
//! assert_eq!(catalog.constructors().len(), 2);
//! ```

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::marker::PhantomData;
use std::net::IpAddr;
use std::sync::Arc;

use http::Uri;
use thiserror::Error;

use crate::value::{HostPort, Object, TypeKey, Typed, Value, ValueKind};

/// Positional arguments of one invocation.
pub type Args = Vec<Option<Value>>;

type MethodFn = Arc<dyn Fn(&Object, Args) -> Result<Option<Value>, InvokeError> + Send + Sync>;
type ConstructorFn = Arc<dyn Fn(Args) -> Result<Object, InvokeError> + Send + Sync>;
type MapInsertFn = Arc<dyn Fn(&Object, String, Option<Value>) -> Result<(), InvokeError> + Send + Sync>;

/// Declared type of one callable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Any value, including absence (`Option<Value>`).
    Any,
    /// Any present value (`Value`).
    NonNull,
    /// A present value of one kind (`String`, `Uri`, `Typed<T>`).
    Value(ValueKind),
    /// A value of one kind, or absence (`Option<String>`, `Option<i32>`).
    Nullable(ValueKind),
    /// A primitive that can never be absent (`i32`, `i64`, `bool`).
    Primitive(ValueKind),
}

impl ParamType {
    /// The value kind the parameter is declared with, if any.
    pub const fn kind(self) -> Option<ValueKind> {
        match self {
            Self::Value(kind) | Self::Nullable(kind) | Self::Primitive(kind) => Some(kind),
            Self::Any | Self::NonNull => None,
        }
    }

    /// Whether an argument may be passed to this parameter.
    ///
    /// Primitive parameters also take narrower primitives (`int` into `long`).
    pub fn accepts(self, arg: Option<&Value>) -> bool {
        match (self, arg) {
            (Self::Any, _) | (Self::Nullable(_), None) => true,
            (_, None) => false,
            (Self::NonNull, Some(_)) => true,
            (Self::Value(kind) | Self::Nullable(kind), Some(value)) => value.kind() == kind,
            (Self::Primitive(kind), Some(value)) => widens(value.kind(), kind),
        }
    }

    /// The nullable form of this parameter type.
    #[must_use]
    pub const fn nullable(self) -> Self {
        match self {
            Self::Value(kind) | Self::Primitive(kind) => Self::Nullable(kind),
            Self::NonNull => Self::Any,
            other => other,
        }
    }
}

fn widens(from: ValueKind, to: ValueKind) -> bool {
    from == to || (from == ValueKind::Int && to == ValueKind::Long)
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Option<Value>"),
            Self::NonNull => f.write_str("Value"),
            Self::Value(kind) | Self::Primitive(kind) => write!(f, "{kind}"),
            Self::Nullable(kind) => write!(f, "Option<{kind}>"),
        }
    }
}

/// Failure of a single invocation.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// An argument did not fit its parameter.
    #[error("argument {index} does not fit parameter type {expected}")]
    Mismatch {
        /// Zero-based argument position.
        index: usize,
        /// The declared parameter type.
        expected: ParamType,
    },

    /// Wrong number of arguments.
    #[error("expected {expected} arguments, got {found}")]
    Arity {
        /// Declared arity.
        expected: usize,
        /// Supplied arity.
        found: usize,
    },

    /// The receiver is not of the catalog's type.
    #[error("receiver is a {found}, not a {expected}")]
    Receiver {
        /// The catalog type.
        expected: &'static str,
        /// The receiver type.
        found: &'static str,
    },

    /// The member body itself failed.
    #[error(transparent)]
    Target(Box<dyn StdError + Send + Sync>),
}

impl InvokeError {
    /// Whether this is resolution noise rather than a failure of the member body.
    pub fn is_mismatch(&self) -> bool {
        !matches!(self, Self::Target(_))
    }
}

/// A parameter type that can be extracted from an argument.
pub trait Param: Sized + 'static {
    /// The descriptor used during resolution.
    fn param_type() -> ParamType;

    /// Extracts the parameter, or `None` on mismatch.
    fn from_arg(arg: Option<Value>) -> Option<Self>;
}

macro_rules! impl_primitive_param {
    ($ty:ty, $kind:ident, |$v:ident| $extract:expr) => {
        impl Param for $ty {
            fn param_type() -> ParamType {
                ParamType::Primitive(ValueKind::$kind)
            }

            fn from_arg(arg: Option<Value>) -> Option<Self> {
                let $v = arg?;
                $extract
            }
        }
    };
}

impl_primitive_param!(i32, Int, |v| v.as_int());
impl_primitive_param!(i64, Long, |v| v.as_long());
impl_primitive_param!(bool, Bool, |v| v.as_bool());

macro_rules! impl_value_param {
    ($ty:ty, $variant:ident) => {
        impl Param for $ty {
            fn param_type() -> ParamType {
                ParamType::Value(ValueKind::$variant)
            }

            fn from_arg(arg: Option<Value>) -> Option<Self> {
                match arg? {
                    Value::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

impl_value_param!(String, Text);
impl_value_param!(Uri, Url);
impl_value_param!(IpAddr, Address);
impl_value_param!(HostPort, HostPort);

impl Param for Value {
    fn param_type() -> ParamType {
        ParamType::NonNull
    }

    fn from_arg(arg: Option<Value>) -> Option<Self> {
        arg
    }
}

impl<T: Any + Send> Param for Typed<T> {
    fn param_type() -> ParamType {
        ParamType::Value(ValueKind::Object(TypeKey::of::<T>()))
    }

    fn from_arg(arg: Option<Value>) -> Option<Self> {
        match arg? {
            Value::Object(object) => object.downcast::<T>().ok(),
            _ => None,
        }
    }
}

impl<P: Param> Param for Option<P> {
    fn param_type() -> ParamType {
        P::param_type().nullable()
    }

    fn from_arg(arg: Option<Value>) -> Option<Self> {
        match arg {
            None => Some(None),
            Some(value) => P::from_arg(Some(value)).map(Some),
        }
    }
}

/// A member return type.
pub trait IntoReturn {
    /// Converts into the value handed back to the engine.
    fn into_return(self) -> Result<Option<Value>, InvokeError>;
}

impl IntoReturn for () {
    fn into_return(self) -> Result<Option<Value>, InvokeError> {
        Ok(None)
    }
}

macro_rules! impl_value_return {
    ($($ty:ty),*) => {
        $(
            impl IntoReturn for $ty {
                fn into_return(self) -> Result<Option<Value>, InvokeError> {
                    Ok(Some(self.into()))
                }
            }
        )*
    };
}

impl_value_return!(i32, i64, bool, String, Uri, IpAddr, HostPort, Object, Value);

impl<T> IntoReturn for Typed<T> {
    fn into_return(self) -> Result<Option<Value>, InvokeError> {
        Ok(Some(self.into()))
    }
}

impl<T: Into<Value>> IntoReturn for Option<T> {
    fn into_return(self) -> Result<Option<Value>, InvokeError> {
        Ok(self.map(Into::into))
    }
}

impl<R, E> IntoReturn for Result<R, E>
where
    R: IntoReturn,
    E: StdError + Send + Sync + 'static,
{
    fn into_return(self) -> Result<Option<Value>, InvokeError> {
        self.map_err(|e| InvokeError::Target(Box::new(e)))?.into_return()
    }
}

/// A constructor return type: the instance itself or a fallible result.
pub trait IntoInstance<T> {
    /// Converts into the constructed instance.
    fn into_instance(self) -> Result<T, InvokeError>;
}

impl<T: Any + Send> IntoInstance<T> for T {
    fn into_instance(self) -> Result<T, InvokeError> {
        Ok(self)
    }
}

impl<T, E> IntoInstance<T> for Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn into_instance(self) -> Result<T, InvokeError> {
        self.map_err(|e| InvokeError::Target(Box::new(e)))
    }
}

/// A closure usable as a method of `T`.
///
/// Implemented for `Fn(&mut T, A1, .., An) -> R` with up to four [`Param`]
/// arguments and an [`IntoReturn`] result.
pub trait IntoMethod<T, Args>: Send + Sync + 'static {
    /// Parameter descriptors, in order.
    fn params() -> Vec<ParamType>;

    /// Erases the closure into an invoker.
    fn into_method(self) -> ErasedMethod;
}

/// A closure usable as a constructor of `T`.
pub trait IntoConstructor<T, Args>: Send + Sync + 'static {
    /// Parameter descriptors, in order.
    fn params() -> Vec<ParamType>;

    /// Erases the closure into a factory.
    fn into_constructor(self) -> ErasedConstructor;
}

/// Type-erased method body.
pub struct ErasedMethod(MethodFn);

/// Type-erased constructor body.
pub struct ErasedConstructor(ConstructorFn);

fn take<P: Param>(args: &mut std::vec::IntoIter<Option<Value>>, index: &mut usize) -> Result<P, InvokeError> {
    let position = *index;
    *index += 1;
    let arg = args.next().ok_or(InvokeError::Arity {
        expected: position + 1,
        found: position,
    })?;
    P::from_arg(arg).ok_or(InvokeError::Mismatch {
        index: position,
        expected: P::param_type(),
    })
}

macro_rules! impl_callables {
    ($($arg:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<T, F, R, $($arg,)*> IntoMethod<T, ($($arg,)*)> for F
        where
            T: Any + Send,
            F: Fn(&mut T, $($arg),*) -> R + Send + Sync + 'static,
            R: IntoReturn,
            $($arg: Param,)*
        {
            fn params() -> Vec<ParamType> {
                vec![$($arg::param_type()),*]
            }

            fn into_method(self) -> ErasedMethod {
                ErasedMethod(Arc::new(move |target: &Object, args: Args| {
                    let mut args = args.into_iter();
                    let mut index = 0;
                    $(let $arg = take::<$arg>(&mut args, &mut index)?;)*
                    let found = target.type_name();
                    target
                        .with_mut(|receiver: &mut T| (self)(receiver, $($arg),*))
                        .ok_or(InvokeError::Receiver {
                            expected: TypeKey::of::<T>().name(),
                            found,
                        })?
                        .into_return()
                }))
            }
        }

        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<T, F, R, $($arg,)*> IntoConstructor<T, ($($arg,)*)> for F
        where
            T: Any + Send,
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: IntoInstance<T>,
            $($arg: Param,)*
        {
            fn params() -> Vec<ParamType> {
                vec![$($arg::param_type()),*]
            }

            fn into_constructor(self) -> ErasedConstructor {
                ErasedConstructor(Arc::new(move |args: Args| {
                    let mut args = args.into_iter();
                    let mut index = 0;
                    $(let $arg = take::<$arg>(&mut args, &mut index)?;)*
                    (self)($($arg),*).into_instance().map(Object::new)
                }))
            }
        }
    };
}

impl_callables!();
impl_callables!(A1);
impl_callables!(A1, A2);
impl_callables!(A1, A2, A3);
impl_callables!(A1, A2, A3, A4);

fn check_arity(params: &[ParamType], args: &Args) -> Result<(), InvokeError> {
    if params.len() == args.len() {
        Ok(())
    } else {
        Err(InvokeError::Arity {
            expected: params.len(),
            found: args.len(),
        })
    }
}

fn accepts_all(params: &[ParamType], args: &[Option<Value>]) -> bool {
    params.len() == args.len()
        && params
            .iter()
            .zip(args)
            .all(|(param, arg)| param.accepts(arg.as_ref()))
}

/// A named method of a catalog type.
#[derive(Clone)]
pub struct Method {
    name: String,
    params: Vec<ParamType>,
    call: MethodFn,
}

impl Method {
    /// The method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter descriptors.
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Number of parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether every argument fits its parameter.
    pub fn accepts(&self, args: &[Option<Value>]) -> bool {
        accepts_all(&self.params, args)
    }

    /// Invokes the method on `target`.
    pub fn invoke(&self, target: &Object, args: Args) -> Result<Option<Value>, InvokeError> {
        check_arity(&self.params, &args)?;
        (self.call)(target, args)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A constructor of a catalog type.
#[derive(Clone)]
pub struct Constructor {
    params: Vec<ParamType>,
    build: ConstructorFn,
}

impl Constructor {
    /// Parameter descriptors.
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Number of parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether every argument fits its parameter.
    pub fn accepts(&self, args: &[Option<Value>]) -> bool {
        accepts_all(&self.params, args)
    }

    /// Builds a new instance.
    pub fn construct(&self, args: Args) -> Result<Object, InvokeError> {
        check_arity(&self.params, &args)?;
        (self.build)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Key/value insertion into a map-like type.
#[derive(Clone)]
pub struct MapInsert {
    insert: MapInsertFn,
}

impl MapInsert {
    /// Inserts `value` under `key` into `target`.
    pub fn insert(&self, target: &Object, key: String, value: Option<Value>) -> Result<(), InvokeError> {
        (self.insert)(target, key, value)
    }
}

impl fmt::Debug for MapInsert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MapInsert")
    }
}

/// The members of one type, in declaration order.
#[derive(Debug, Clone)]
pub struct TypeCatalog {
    key: TypeKey,
    name: String,
    constructors: Vec<Constructor>,
    methods: Vec<Method>,
    map_insert: Option<MapInsert>,
}

impl TypeCatalog {
    /// Starts a catalog for `T`, visible to scripts as `name`.
    pub fn builder<T: Any + Send>(name: impl Into<String>) -> CatalogBuilder<T> {
        CatalogBuilder {
            catalog: Self {
                key: TypeKey::of::<T>(),
                name: name.into(),
                constructors: Vec::new(),
                methods: Vec::new(),
                map_insert: None,
            },
            _marker: PhantomData,
        }
    }

    /// The described Rust type.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// The script-visible type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All constructors, in declaration order.
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// All methods, in declaration order.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Methods with the given name, in declaration order. The result
    /// borrows only the catalog.
    pub fn methods_named(&self, name: &str) -> Vec<&Method> {
        self.methods.iter().filter(|m| m.name == name).collect()
    }

    /// The map-insert capability, if the type has one.
    pub fn map_insert(&self) -> Option<&MapInsert> {
        self.map_insert.as_ref()
    }
}

/// Builder for [`TypeCatalog`].
pub struct CatalogBuilder<T> {
    catalog: TypeCatalog,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send> CatalogBuilder<T> {
    /// Adds a constructor.
    #[must_use]
    pub fn constructor<A, F: IntoConstructor<T, A>>(mut self, f: F) -> Self {
        self.catalog.constructors.push(Constructor {
            params: F::params(),
            build: f.into_constructor().0,
        });
        self
    }

    /// Adds a zero-argument constructor from `Default`.
    #[must_use]
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(T::default)
    }

    /// Adds a method.
    #[must_use]
    pub fn method<A, F: IntoMethod<T, A>>(mut self, name: impl Into<String>, f: F) -> Self {
        self.catalog.methods.push(Method {
            name: name.into(),
            params: F::params(),
            call: f.into_method().0,
        });
        self
    }

    /// Adds the accessor `set<property>`.
    #[must_use]
    pub fn setter<A, F: IntoMethod<T, A>>(self, property: &str, f: F) -> Self {
        self.method(format!("set{property}"), f)
    }

    /// Gives the type key/value insertion.
    #[must_use]
    pub fn map_insert<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut T, String, Option<Value>) + Send + Sync + 'static,
    {
        let insert: MapInsertFn = Arc::new(move |target: &Object, key, value| {
            let found = target.type_name();
            target
                .with_mut(|map: &mut T| f(map, key, value))
                .ok_or(InvokeError::Receiver {
                    expected: TypeKey::of::<T>().name(),
                    found,
                })
        });
        self.catalog.map_insert = Some(MapInsert { insert });
        self
    }

    /// Finishes the catalog.
    pub fn build(self) -> TypeCatalog {
        self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Lamp {
        watts: i64,
        label: Option<String>,
        on: bool,
    }

    #[derive(Debug)]
    struct Broken;

    impl fmt::Display for Broken {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("bulb blew")
        }
    }

    impl StdError for Broken {}

    fn lamp_catalog() -> TypeCatalog {
        TypeCatalog::builder::<Lamp>("Lamp")
            .default_constructor()
            .constructor(|watts: i64| Lamp {
                watts,
                ..Lamp::default()
            })
            .setter("Watts", |l: &mut Lamp, w: i64| l.watts = w)
            .setter("Label", |l: &mut Lamp, s: Option<String>| l.label = s)
            .method("toggle", |l: &mut Lamp| {
                l.on = !l.on;
                l.on
            })
            .method("fail", |_: &mut Lamp| -> Result<(), Broken> { Err(Broken) })
            .build()
    }

    #[test]
    fn test_param_accepts() {
        let int = Value::Int(1);
        let text = Value::from("x");
        assert!(ParamType::Primitive(ValueKind::Long).accepts(Some(&int)));
        assert!(!ParamType::Nullable(ValueKind::Long).accepts(Some(&int)));
        assert!(!ParamType::Primitive(ValueKind::Int).accepts(None));
        assert!(ParamType::Nullable(ValueKind::Text).accepts(None));
        assert!(ParamType::Any.accepts(None));
        assert!(!ParamType::NonNull.accepts(None));
        assert!(ParamType::Value(ValueKind::Text).accepts(Some(&text)));
        assert!(!ParamType::Value(ValueKind::Text).accepts(Some(&int)));
    }

    #[test]
    fn test_param_descriptors() {
        assert_eq!(i32::param_type(), ParamType::Primitive(ValueKind::Int));
        assert_eq!(
            Option::<i32>::param_type(),
            ParamType::Nullable(ValueKind::Int)
        );
        assert_eq!(String::param_type(), ParamType::Value(ValueKind::Text));
        assert_eq!(Option::<Value>::param_type(), ParamType::Any);
        assert_eq!(
            Typed::<Lamp>::param_type(),
            ParamType::Value(ValueKind::Object(TypeKey::of::<Lamp>()))
        );
    }

    #[test]
    fn test_methods_named_outlive_lookup_name() {
        let catalog = lamp_catalog();
        let found = {
            let name = format!("set{}", "Watts");
            catalog.methods_named(&name)
        };
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "setWatts");
        assert!(catalog.methods_named("setColour").is_empty());
    }

    #[test]
    fn test_method_invoke() {
        let catalog = lamp_catalog();
        let lamp = Object::new(Lamp::default());

        let setter = catalog.methods_named("setWatts")[0];
        assert_eq!(setter.params(), &[ParamType::Primitive(ValueKind::Long)]);
        setter.invoke(&lamp, vec![Some(Value::Int(60))]).unwrap();
        assert_eq!(lamp.with(|l: &Lamp| l.watts), Some(60));

        let toggle = catalog.methods_named("toggle")[0];
        let result = toggle.invoke(&lamp, Vec::new()).unwrap();
        assert_eq!(result, Some(Value::Bool(true)));
    }

    #[test]
    fn test_method_invoke_mismatch_is_noise() {
        let catalog = lamp_catalog();
        let lamp = Object::new(Lamp::default());
        let setter = catalog.methods_named("setWatts")[0];

        let err = setter.invoke(&lamp, vec![Some(Value::from("x"))]).unwrap_err();
        assert!(err.is_mismatch());
        let err = setter.invoke(&lamp, Vec::new()).unwrap_err();
        assert!(matches!(err, InvokeError::Arity { expected: 1, found: 0 }));
    }

    #[test]
    fn test_method_target_failure() {
        let catalog = lamp_catalog();
        let lamp = Object::new(Lamp::default());
        let fail = catalog.methods_named("fail")[0];

        let err = fail.invoke(&lamp, Vec::new()).unwrap_err();
        assert!(!err.is_mismatch());
        assert_eq!(err.to_string(), "bulb blew");
    }

    #[test]
    fn test_wrong_receiver() {
        let catalog = lamp_catalog();
        let other = Object::new(String::new());
        let toggle = catalog.methods_named("toggle")[0];
        let err = toggle.invoke(&other, Vec::new()).unwrap_err();
        assert!(matches!(err, InvokeError::Receiver { .. }));
    }

    #[test]
    fn test_constructors() {
        let catalog = lamp_catalog();
        assert_eq!(catalog.constructors()[0].arity(), 0);

        let ctor = &catalog.constructors()[1];
        assert!(ctor.accepts(&[Some(Value::Int(40))]));
        let lamp = ctor.construct(vec![Some(Value::Long(40))]).unwrap();
        assert_eq!(lamp.with(|l: &Lamp| l.watts), Some(40));
    }

    #[test]
    fn test_map_insert() {
        let catalog = TypeCatalog::builder::<Vec<(String, Option<Value>)>>("Pairs")
            .map_insert(|pairs, key, value| pairs.push((key, value)))
            .build();
        let pairs = Object::new(Vec::<(String, Option<Value>)>::new());

        catalog
            .map_insert()
            .unwrap()
            .insert(&pairs, "k".into(), Some(Value::from("v")))
            .unwrap();
        let len = pairs.with(|p: &Vec<(String, Option<Value>)>| p.len());
        assert_eq!(len, Some(1));
        assert!(lamp_catalog().map_insert().is_none());
    }
}
