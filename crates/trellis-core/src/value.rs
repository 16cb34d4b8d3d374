//! Runtime values and object handles.
//!
//! Every value the engine evaluates is a [`Value`]; absence of a value is
//! `Option::None`. Objects being configured are held behind [`Object`], a
//! shared handle to an instance of any `Send` type, or its typed view
//! [`Typed<T>`].

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use http::Uri;
use parking_lot::{Mutex, MutexGuard};

/// Identity of a Rust type, with a readable name for diagnostics.
#[derive(Debug, Clone, Copy, Eq)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// The key of `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_name(type_name::<T>()),
        }
    }

    /// The underlying `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The unqualified Rust type name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// `a::b::Point` -> `Point`, `a::Wrapper<b::C>` -> `Wrapper<b::C>`
fn short_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// The natural type of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Text.
    Text,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    Long,
    /// Boolean.
    Bool,
    /// Absolute URI.
    Url,
    /// Network address.
    Address,
    /// Network address plus port.
    HostPort,
    /// Object of a specific Rust type.
    Object(TypeKey),
}

impl ValueKind {
    /// Whether the kind has a primitive (non-nullable) parameter form.
    pub const fn has_primitive(self) -> bool {
        matches!(self, Self::Int | Self::Long | Self::Bool)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("String"),
            Self::Int => f.write_str("int"),
            Self::Long => f.write_str("long"),
            Self::Bool => f.write_str("boolean"),
            Self::Url => f.write_str("URL"),
            Self::Address => f.write_str("InetAddress"),
            Self::HostPort => f.write_str("InetAddrPort"),
            Self::Object(key) => write!(f, "{key}"),
        }
    }
}

/// A network address with a port. A missing address means "any interface".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostPort {
    address: Option<IpAddr>,
    port: u16,
}

impl HostPort {
    /// Creates a host/port pair.
    pub const fn new(address: Option<IpAddr>, port: u16) -> Self {
        Self { address, port }
    }

    /// The bound address, `None` for any interface.
    pub const fn address(&self) -> Option<IpAddr> {
        self.address
    }

    /// The port.
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// The socket address, using `0.0.0.0` for any interface.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(
            self.address.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            self.port,
        )
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}

/// A shared handle to an object of any registered type.
///
/// Cloning the handle shares the instance. The instance is locked only while
/// a member runs against it; member bodies must not lock their own receiver.
#[derive(Clone)]
pub struct Object {
    key: TypeKey,
    cell: Arc<Mutex<Box<dyn Any + Send>>>,
}

impl Object {
    /// Wraps a value in a new handle.
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            cell: Arc::new(Mutex::new(Box::new(value))),
        }
    }

    /// The key of the wrapped type.
    pub fn type_key(&self) -> TypeKey {
        self.key
    }

    /// The unqualified name of the wrapped type.
    pub fn type_name(&self) -> &'static str {
        self.key.name()
    }

    /// Whether the wrapped value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.key.id() == TypeId::of::<T>()
    }

    /// Whether both handles share the same instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Runs `f` with shared access to the value, if it is a `T`.
    pub fn with<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.cell.lock();
        guard.downcast_ref::<T>().map(f)
    }

    /// Runs `f` with exclusive access to the value, if it is a `T`.
    pub fn with_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.cell.lock();
        guard.downcast_mut::<T>().map(f)
    }

    /// Converts into a typed handle, giving the handle back on mismatch.
    pub fn downcast<T: Any + Send>(self) -> Result<Typed<T>, Self> {
        if self.is::<T>() {
            Ok(Typed {
                object: self,
                _marker: PhantomData,
            })
        } else {
            Err(self)
        }
    }

    /// Locks the instance for direct access.
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn Any + Send>> {
        self.cell.lock()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("type", &self.key.name())
            .field("at", &Arc::as_ptr(&self.cell))
            .finish()
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:p}", self.key.name(), Arc::as_ptr(&self.cell))
    }
}

/// An [`Object`] statically known to hold a `T`.
pub struct Typed<T> {
    object: Object,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send> Typed<T> {
    /// Wraps a value in a new typed handle.
    pub fn new(value: T) -> Self {
        Self {
            object: Object::new(value),
            _marker: PhantomData,
        }
    }

    /// Runs `f` with shared access to the value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.object.lock();
        match guard.downcast_ref::<T>() {
            Some(value) => f(value),
            None => unreachable!("typed handle holds a {}", self.object.type_name()),
        }
    }

    /// Runs `f` with exclusive access to the value.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.object.lock();
        let name = self.object.type_name();
        match guard.downcast_mut::<T>() {
            Some(value) => f(value),
            None => unreachable!("typed handle holds a {name}"),
        }
    }

    /// The untyped handle.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Converts into the untyped handle.
    pub fn into_object(self) -> Object {
        self.object
    }
}

impl<T> Clone for Typed<T> {
    fn clone(&self) -> Self {
        Self {
            object: self.object.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Typed").field(&self.object).finish()
    }
}

impl<T> From<Typed<T>> for Object {
    fn from(typed: Typed<T>) -> Self {
        typed.object
    }
}

/// A value produced by evaluating a script node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text.
    Text(String),
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// Boolean.
    Bool(bool),
    /// Absolute URI.
    Url(Uri),
    /// Network address.
    Address(IpAddr),
    /// Network address plus port.
    HostPort(HostPort),
    /// Object handle.
    Object(Object),
}

impl Value {
    /// The natural type of the value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Int(_) => ValueKind::Int,
            Self::Long(_) => ValueKind::Long,
            Self::Bool(_) => ValueKind::Bool,
            Self::Url(_) => ValueKind::Url,
            Self::Address(_) => ValueKind::Address,
            Self::HostPort(_) => ValueKind::HostPort,
            Self::Object(object) => ValueKind::Object(object.type_key()),
        }
    }

    /// The text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The integer, if this is an `Int`.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The integer, if this is a `Long` or an `Int`.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(n) => Some(*n),
            Self::Int(n) => Some(i64::from(*n)),
            _ => None,
        }
    }

    /// The boolean, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The object handle, if this is an `Object`.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Int(n) => write!(f, "{n}"),
            Self::Long(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Url(uri) => write!(f, "{uri}"),
            Self::Address(addr) => write!(f, "{addr}"),
            Self::HostPort(hp) => write!(f, "{hp}"),
            Self::Object(object) => write!(f, "{object}"),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Long(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Uri> for Value {
    fn from(uri: Uri) -> Self {
        Self::Url(uri)
    }
}

impl From<IpAddr> for Value {
    fn from(addr: IpAddr) -> Self {
        Self::Address(addr)
    }
}

impl From<HostPort> for Value {
    fn from(hp: HostPort) -> Self {
        Self::HostPort(hp)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Self::Object(object)
    }
}

impl<T> From<Typed<T>> for Value {
    fn from(typed: Typed<T>) -> Self {
        Self::Object(typed.object)
    }
}
