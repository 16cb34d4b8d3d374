//! Member resolution.
//!
//! Picks the concrete accessor, method or constructor a directive invokes.
//! Accessors go through four ordered tiers, first success wins:
//!
//! 1. [`Tier::Exact`]: the parameter is the argument's own kind in value form.
//! 2. [`Tier::Primitive`]: the parameter is the primitive form of that kind.
//! 3. [`Tier::Scan`]: every one-argument accessor of that name, in declaration
//!    order, whose parameter accepts the argument.
//! 4. [`Tier::Constructive`]: the last scanned accessor, with the argument
//!    converted to its parameter type.
//!
//! Calls and constructors are matched by arity and acceptance, in declaration
//! order. Candidates are checked against their parameter descriptors before
//! they run, so a rejected candidate has no side effects.

use std::fmt;

use tracing::trace;
use trellis_core::catalog::{Args, Method, ParamType};
use trellis_core::{ConfigureError, ConfigureResult, InvokeError, Object, TypeCatalog, TypeRegistry, Value, ValueKind};

use crate::coerce::{parse_host_port, parse_url};

/// The accessor tier that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Parameter is the argument's kind in value form.
    Exact,
    /// Parameter is the argument's primitive kind.
    Primitive,
    /// First compatible accessor in declaration order.
    Scan,
    /// Argument converted to the last scanned accessor's parameter.
    Constructive,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exact => "exact",
            Self::Primitive => "primitive",
            Self::Scan => "scan",
            Self::Constructive => "constructive",
        })
    }
}

/// An accessor chosen for one `Set`.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'c> {
    /// How the accessor was found.
    pub tier: Tier,
    /// The accessor that ran.
    pub method: &'c Method,
}

impl Resolved<'_> {
    /// Parameter descriptors of the chosen accessor.
    pub fn params(&self) -> &[ParamType] {
        self.method.params()
    }
}

/// Describes an argument list for error messages, e.g. `int, null`.
pub fn describe_args(args: &[Option<Value>]) -> String {
    if args.is_empty() {
        return String::new();
    }
    args.iter()
        .map(|arg| arg.as_ref().map_or_else(|| "null".to_string(), |v| v.kind().to_string()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolves and invokes members against one registry.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    registry: &'a TypeRegistry,
    constructive: bool,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver. `constructive` enables tier 4.
    pub fn new(registry: &'a TypeRegistry, constructive: bool) -> Self {
        Self {
            registry,
            constructive,
        }
    }

    /// Applies `set<property>(arg)` to `target`.
    ///
    /// # Errors
    ///
    /// `NoMatchingMember` once every tier is exhausted, or `Invocation` when
    /// the chosen accessor itself fails.
    pub fn set<'c>(
        &self,
        catalog: &'c TypeCatalog,
        target: &Object,
        property: &str,
        arg: Option<Value>,
    ) -> ConfigureResult<Resolved<'c>> {
        let member = format!("set{property}");
        let candidates: Vec<&'c Method> = catalog
            .methods_named(&member)
            .into_iter()
            .filter(|m| m.arity() == 1)
            .collect();
        let kind = arg.as_ref().map(Value::kind);
        let mut tried: Vec<&Method> = Vec::new();

        let exact = candidates.iter().copied().find(|m| match kind {
            Some(kind) => matches!(m.params()[0], ParamType::Value(k) | ParamType::Nullable(k) if k == kind),
            None => m.params()[0] == ParamType::Any,
        });
        if let Some(method) = exact {
            tried.push(method);
            if attempt(method, target, arg.as_ref(), Tier::Exact)? {
                return Ok(Resolved {
                    tier: Tier::Exact,
                    method,
                });
            }
        }

        let primitive = kind.filter(|k| k.has_primitive()).and_then(|kind| {
            candidates
                .iter()
                .copied()
                .find(|m| m.params()[0] == ParamType::Primitive(kind))
        });
        if let Some(method) = primitive {
            tried.push(method);
            if attempt(method, target, arg.as_ref(), Tier::Primitive)? {
                return Ok(Resolved {
                    tier: Tier::Primitive,
                    method,
                });
            }
        }

        let mut last = None;
        for &method in &candidates {
            last = Some(method);
            if tried.iter().any(|t| std::ptr::eq(*t, method)) {
                continue;
            }
            if !method.accepts(std::slice::from_ref(&arg)) {
                trace!(member = %member, param = %method.params()[0], tier = %Tier::Scan, "Candidate rejected");
                continue;
            }
            if attempt(method, target, arg.as_ref(), Tier::Scan)? {
                return Ok(Resolved {
                    tier: Tier::Scan,
                    method,
                });
            }
        }

        if self.constructive {
            if let (Some(method), Some(value)) = (last, arg.as_ref()) {
                if let Some(converted) = self.convert(method.params()[0], value)? {
                    match method.invoke(target, vec![Some(converted)]) {
                        Ok(_) => {
                            return Ok(Resolved {
                                tier: Tier::Constructive,
                                method,
                            })
                        }
                        Err(e) if e.is_mismatch() => {
                            trace!(member = %member, error = %e, tier = %Tier::Constructive, "Candidate rejected");
                        }
                        Err(e) => return Err(ConfigureError::invocation(member, e)),
                    }
                }
            }
        }

        Err(ConfigureError::no_matching_member(
            catalog.name(),
            member,
            describe_args(std::slice::from_ref(&arg)),
        ))
    }

    /// Builds a value of parameter type `param` from `value`, if possible.
    ///
    /// Only a misregistered catalog is an error; anything else that cannot
    /// be converted is `Ok(None)`.
    fn convert(&self, param: ParamType, value: &Value) -> ConfigureResult<Option<Value>> {
        let Some(target) = param.kind() else {
            return Ok(None);
        };
        if let ValueKind::Object(key) = target {
            let catalog = match self.registry.catalog_of(key) {
                Ok(catalog) => catalog,
                Err(ConfigureError::UnknownType { .. }) => return Ok(None),
                Err(e) => return Err(e),
            };
            let kind = value.kind();
            let Some(constructor) = catalog.constructors().iter().find(|c| {
                c.arity() == 1
                    && matches!(c.params()[0], ParamType::Value(k) | ParamType::Nullable(k) if k == kind)
            }) else {
                return Ok(None);
            };
            return Ok(match constructor.construct(vec![Some(value.clone())]) {
                Ok(object) => Some(Value::Object(object)),
                Err(e) => {
                    trace!(type_name = %catalog.name(), error = %e, "Conversion constructor failed");
                    None
                }
            });
        }

        let Some(text) = value.as_text() else {
            return Ok(None);
        };
        Ok(match target {
            ValueKind::Int => text.parse().ok().map(Value::Int),
            ValueKind::Long => text.parse().ok().map(Value::Long),
            ValueKind::Bool => Some(Value::Bool(text.eq_ignore_ascii_case("true"))),
            ValueKind::Url => parse_url(text).ok().map(Value::Url),
            ValueKind::HostPort => parse_host_port(text).ok().map(Value::HostPort),
            _ => None,
        })
    }

    /// Invokes the method `name` on `target` with positional `args`.
    ///
    /// # Errors
    ///
    /// `NoMatchingMember` when no method of that name and arity accepts the
    /// arguments, or `Invocation` when the chosen method fails.
    pub fn call(
        &self,
        catalog: &TypeCatalog,
        target: &Object,
        name: &str,
        args: Args,
    ) -> ConfigureResult<Option<Value>> {
        for method in catalog
            .methods_named(name)
            .into_iter()
            .filter(|m| m.arity() == args.len())
        {
            if !method.accepts(&args) {
                trace!(member = %name, params = ?method.params(), "Candidate rejected");
                continue;
            }
            match method.invoke(target, args.clone()) {
                Ok(result) => return Ok(result),
                Err(e) if e.is_mismatch() => {
                    trace!(member = %name, error = %e, "Candidate rejected");
                }
                Err(e) => return Err(ConfigureError::invocation(name, e)),
            }
        }
        Err(ConfigureError::no_matching_member(
            catalog.name(),
            name,
            describe_args(&args),
        ))
    }

    /// Constructs an instance of the catalog type from positional `args`.
    ///
    /// # Errors
    ///
    /// `NoMatchingMember` when no constructor of that arity accepts the
    /// arguments, or `Invocation` when the chosen constructor fails.
    pub fn construct(&self, catalog: &TypeCatalog, args: Args) -> ConfigureResult<Object> {
        for constructor in catalog.constructors().iter().filter(|c| c.arity() == args.len()) {
            if !constructor.accepts(&args) {
                trace!(type_name = %catalog.name(), params = ?constructor.params(), "Constructor rejected");
                continue;
            }
            match constructor.construct(args.clone()) {
                Ok(object) => return Ok(object),
                Err(e) if e.is_mismatch() => {
                    trace!(type_name = %catalog.name(), error = %e, "Constructor rejected");
                }
                Err(e) => return Err(ConfigureError::invocation(format!("new {}", catalog.name()), e)),
            }
        }
        Err(ConfigureError::no_matching_member(
            catalog.name(),
            "new",
            describe_args(&args),
        ))
    }

    /// Inserts `key` → `value` into a map-capable `target`.
    ///
    /// # Errors
    ///
    /// `NotAMap` when the type has no map-insert capability.
    pub fn put(&self, catalog: &TypeCatalog, target: &Object, key: String, value: Option<Value>) -> ConfigureResult<()> {
        let insert = catalog
            .map_insert()
            .ok_or_else(|| ConfigureError::not_a_map(catalog.name()))?;
        insert
            .insert(target, key, value)
            .map_err(|e: InvokeError| ConfigureError::invocation("put", e))
    }
}

/// Invokes a one-argument candidate. `Ok(false)` means it did not fit.
fn attempt(method: &Method, target: &Object, arg: Option<&Value>, tier: Tier) -> ConfigureResult<bool> {
    match method.invoke(target, vec![arg.cloned()]) {
        Ok(_) => Ok(true),
        Err(e) if e.is_mismatch() => {
            trace!(member = %method.name(), error = %e, tier = %tier, "Candidate rejected");
            Ok(false)
        }
        Err(e) => Err(ConfigureError::invocation(method.name(), e)),
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use trellis_core::fixtures::{self, Handler, Overloaded, Point, Server};
    use trellis_core::Typed;

    use super::*;

    fn setup() -> TypeRegistry {
        fixtures::registry()
    }

    #[test]
    fn test_primitive_tier() {
        let registry = setup();
        let catalog = registry.resolve("Point").unwrap();
        let point = Typed::new(Point::default());

        let resolved = Resolver::new(&registry, true)
            .set(&catalog, point.object(), "X", Some(Value::Int(3)))
            .unwrap();

        assert_eq!(resolved.tier, Tier::Primitive);
        assert_eq!(resolved.method.name(), "setX");
        assert_eq!(point.with(|p| p.x), 3);
    }

    #[test]
    fn test_resolved_borrows_only_the_catalog() {
        let registry = setup();
        let catalog = registry.resolve("Point").unwrap();
        let point = Typed::new(Point::default());
        let resolver = Resolver::new(&registry, true);

        let resolved = {
            let property = String::from("Y");
            resolver
                .set(&catalog, point.object(), &property, Some(Value::Int(4)))
                .unwrap()
        };

        assert_eq!(resolved.method.name(), "setY");
        assert_eq!(point.with(|p| p.y), 4);
    }

    #[test]
    fn test_exact_tier() {
        let registry = setup();
        let catalog = registry.resolve("Point").unwrap();
        let point = Typed::new(Point::default());

        let resolved = Resolver::new(&registry, true)
            .set(&catalog, point.object(), "Label", Some(Value::from("origin")))
            .unwrap();

        assert_eq!(resolved.tier, Tier::Exact);
        assert_eq!(point.with(|p| p.label.clone()), Some("origin".to_string()));
    }

    #[test]
    fn test_scan_tier_widens_int_to_long() {
        let registry = setup();
        let catalog = registry.resolve("Server").unwrap();
        let server = Typed::new(Server::default());

        let resolved = Resolver::new(&registry, true)
            .set(&catalog, server.object(), "Timeout", Some(Value::Int(30)))
            .unwrap();

        assert_eq!(resolved.tier, Tier::Scan);
        assert_eq!(server.with(|s| s.timeout), 30);
    }

    #[test]
    fn test_constructive_tier_parses_text() {
        let registry = setup();
        let catalog = registry.resolve("Server").unwrap();
        let server = Typed::new(Server::default());
        let resolver = Resolver::new(&registry, true);

        let resolved = resolver
            .set(&catalog, server.object(), "Port", Some(Value::from("8080")))
            .unwrap();
        assert_eq!(resolved.tier, Tier::Constructive);
        assert_eq!(server.with(|s| s.port), 8080);

        resolver
            .set(&catalog, server.object(), "Debug", Some(Value::from("TRUE")))
            .unwrap();
        assert!(server.with(|s| s.debug));
    }

    #[test]
    fn test_constructive_tier_uses_constructor() {
        let registry = setup();
        let catalog = registry.resolve("Server").unwrap();
        let server = Typed::new(Server::default());

        let resolved = Resolver::new(&registry, true)
            .set(&catalog, server.object(), "Handler", Some(Value::from("static")))
            .unwrap();

        assert_eq!(resolved.tier, Tier::Constructive);
        let names: Vec<String> = server.with(|s| s.handlers.iter().map(|h| h.with(|h: &Handler| h.name.clone())).collect());
        assert_eq!(names, vec!["static".to_string()]);
    }

    #[test]
    fn test_constructive_tier_disabled() {
        let registry = setup();
        let catalog = registry.resolve("Server").unwrap();
        let server = Typed::new(Server::default());

        let err = Resolver::new(&registry, false)
            .set(&catalog, server.object(), "Port", Some(Value::from("8080")))
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigureError::NoMatchingMember { ref member, ref arg_types, .. }
                if member == "setPort" && arg_types == "String"
        ));
        assert_eq!(server.with(|s| s.port), 0);
    }

    #[test]
    fn test_unparsable_text_exhausts_tiers() {
        let registry = setup();
        let catalog = registry.resolve("Server").unwrap();
        let server = Typed::new(Server::default());

        let err = Resolver::new(&registry, true)
            .set(&catalog, server.object(), "Port", Some(Value::from("eighty")))
            .unwrap_err();

        assert!(matches!(err, ConfigureError::NoMatchingMember { .. }));
    }

    #[test]
    fn test_absent_argument_on_primitive_setter() {
        let registry = setup();
        let catalog = registry.resolve("Point").unwrap();
        let point = Typed::new(Point::default());

        let err = Resolver::new(&registry, true)
            .set(&catalog, point.object(), "X", None)
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigureError::NoMatchingMember { ref arg_types, .. } if arg_types == "null"
        ));
    }

    #[test]
    fn test_address_has_no_constructive_form() {
        let registry = setup();
        let catalog = registry.resolve("Server").unwrap();
        let server = Typed::new(Server::default());
        let resolver = Resolver::new(&registry, true);

        assert!(resolver
            .set(&catalog, server.object(), "Host", Some(Value::from("127.0.0.1")))
            .is_err());

        let host: IpAddr = "127.0.0.1".parse().unwrap();
        resolver
            .set(&catalog, server.object(), "Host", Some(Value::Address(host)))
            .unwrap();
        assert_eq!(server.with(|s| s.host), Some(host));
    }

    #[test]
    fn test_call_declaration_order() {
        let registry = setup();
        let catalog = registry.resolve("Overloaded").unwrap();
        let target = Typed::new(Overloaded::default());
        let resolver = Resolver::new(&registry, true);

        resolver
            .call(&catalog, target.object(), "pick", vec![Some(Value::from("x"))])
            .unwrap();
        assert_eq!(target.with(|o| o.last), Some("pick(Value)"));

        resolver
            .call(&catalog, target.object(), "describe", vec![Some(Value::Int(1))])
            .unwrap();
        assert_eq!(target.with(|o| o.last), Some("describe(int)"));

        resolver
            .call(&catalog, target.object(), "describe", vec![Some(Value::from("1"))])
            .unwrap();
        assert_eq!(target.with(|o| o.last), Some("describe(String)"));
    }

    #[test]
    fn test_call_arity_mismatch() {
        let registry = setup();
        let catalog = registry.resolve("Point").unwrap();
        let point = Typed::new(Point::default());

        let err = Resolver::new(&registry, true)
            .call(&catalog, point.object(), "translate", vec![Some(Value::Int(1))])
            .unwrap_err();

        assert_eq!(err.to_string(), "no translate on Point accepts (int)");
    }

    #[test]
    fn test_call_target_failure_is_fatal() {
        let registry = setup();
        let catalog = registry.resolve("Server").unwrap();
        let server = Typed::new(Server::default());

        let err = Resolver::new(&registry, true)
            .call(&catalog, server.object(), "start", Vec::new())
            .unwrap_err();

        assert!(matches!(err, ConfigureError::Invocation { ref member, .. } if member == "start"));
    }

    #[test]
    fn test_construct() {
        let registry = setup();
        let catalog = registry.resolve("Point").unwrap();
        let resolver = Resolver::new(&registry, true);

        let point = resolver
            .construct(&catalog, vec![Some(Value::Int(1)), Some(Value::Int(2))])
            .unwrap();
        assert_eq!(point.with(|p: &Point| (p.x, p.y)), Some((1, 2)));

        let err = resolver
            .construct(&catalog, vec![Some(Value::from("1"))])
            .unwrap_err();
        assert_eq!(err.to_string(), "no new on Point accepts (String)");
    }

    #[test]
    fn test_put_requires_map() {
        let registry = setup();
        let catalog = registry.resolve("Point").unwrap();
        let point = Typed::new(Point::default());

        let err = Resolver::new(&registry, true)
            .put(&catalog, point.object(), "k".to_string(), Some(Value::from("v")))
            .unwrap_err();

        assert!(matches!(err, ConfigureError::NotAMap { ref type_name } if type_name == "Point"));
    }

    #[test]
    fn test_describe_args() {
        assert_eq!(describe_args(&[]), "");
        assert_eq!(
            describe_args(&[Some(Value::Int(1)), None, Some(Value::from("x"))]),
            "int, null, String"
        );
    }
}
