//! Conversion of evaluated values to declared types.
//!
//! A node's `type` attribute names one of a closed set of [`DeclaredType`]s.
//! Coercion is a pure function of the raw value and that type: values
//! already of the target kind pass through, everything else is stringified
//! and parsed.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use std::sync::OnceLock;

use http::Uri;
use regex::Regex;
use trellis_core::{ConfigureError, ConfigureResult, HostPort, Value, ValueKind};

/// The declared types a script may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    /// `String` or `text`.
    Text,
    /// `int` or `integer`.
    Int,
    /// `long`.
    Long,
    /// `boolean`.
    Bool,
    /// `URL` or `url`.
    Url,
    /// `InetAddress` or `address`.
    Address,
    /// `InetAddrPort` or `address-port`.
    HostPort,
}

impl DeclaredType {
    /// Parses a declared type name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigureError::UnknownType`] for names outside the set.
    pub fn parse(name: &str) -> ConfigureResult<Self> {
        match name {
            "String" | "text" => Ok(Self::Text),
            "int" | "integer" => Ok(Self::Int),
            "long" => Ok(Self::Long),
            "boolean" => Ok(Self::Bool),
            "URL" | "url" => Ok(Self::Url),
            "InetAddress" | "address" => Ok(Self::Address),
            "InetAddrPort" | "address-port" => Ok(Self::HostPort),
            other => Err(ConfigureError::unknown_type(other)),
        }
    }

    /// The canonical script spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "String",
            Self::Int => "int",
            Self::Long => "long",
            Self::Bool => "boolean",
            Self::Url => "URL",
            Self::Address => "InetAddress",
            Self::HostPort => "InetAddrPort",
        }
    }

    /// The kind of value coercion produces.
    pub const fn kind(self) -> ValueKind {
        match self {
            Self::Text => ValueKind::Text,
            Self::Int => ValueKind::Int,
            Self::Long => ValueKind::Long,
            Self::Bool => ValueKind::Bool,
            Self::Url => ValueKind::Url,
            Self::Address => ValueKind::Address,
            Self::HostPort => ValueKind::HostPort,
        }
    }

    /// The value an empty node of this type evaluates to.
    pub fn empty_value(self) -> Option<Value> {
        match self {
            Self::Text => Some(Value::Text(String::new())),
            Self::Bool => Some(Value::Bool(false)),
            _ => None,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coerces `value` to `target`.
///
/// # Errors
///
/// Returns `NumberFormat`, `InvalidUrl` or `UnresolvableHost` when the
/// stringified value cannot be parsed as the target.
pub fn coerce(value: Value, target: DeclaredType) -> ConfigureResult<Value> {
    if value.kind() == target.kind() {
        return Ok(value);
    }
    let text = value.to_string();
    match target {
        DeclaredType::Text => Ok(Value::Text(text)),
        DeclaredType::Int => parse_int(text.trim()).map(Value::Int),
        DeclaredType::Long => parse_long(text.trim()).map(Value::Long),
        DeclaredType::Bool => Ok(Value::Bool(parse_bool(&text))),
        DeclaredType::Url => parse_url(text.trim()).map(Value::Url),
        DeclaredType::Address => resolve_host(text.trim()).map(Value::Address),
        DeclaredType::HostPort => parse_host_port(text.trim()).map(Value::HostPort),
    }
}

/// Coerces `value` to the type named `type_name`.
///
/// # Errors
///
/// Returns `UnknownType` for an unknown name, otherwise as [`coerce`].
pub fn coerce_named(value: Value, type_name: &str) -> ConfigureResult<Value> {
    coerce(value, DeclaredType::parse(type_name)?)
}

/// Parses a 32-bit integer.
pub fn parse_int(text: &str) -> ConfigureResult<i32> {
    text.parse()
        .map_err(|e| ConfigureError::number_format(text, e))
}

/// Parses a 64-bit integer.
pub fn parse_long(text: &str) -> ConfigureResult<i64> {
    text.parse()
        .map_err(|e| ConfigureError::number_format(text, e))
}

/// Empty text is false; otherwise true iff the first character is `1`, `t` or `T`.
pub fn parse_bool(text: &str) -> bool {
    matches!(text.chars().next(), Some('1' | 't' | 'T'))
}

/// Parses an absolute URL.
pub fn parse_url(text: &str) -> ConfigureResult<Uri> {
    let uri: Uri = text
        .parse()
        .map_err(|e| ConfigureError::invalid_url(text, e))?;
    if uri.scheme().is_none() {
        return Err(ConfigureError::invalid_url(text, "missing scheme"));
    }
    Ok(uri)
}

fn hostname_regex() -> &'static Regex {
    static HOSTNAME: OnceLock<Regex> = OnceLock::new();
    HOSTNAME.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.?$",
        )
        .expect("valid regex")
    })
}

/// Resolves a literal IP address or host name.
///
/// Empty text is the loopback address.
pub fn resolve_host(host: &str) -> ConfigureResult<IpAddr> {
    if host.is_empty() {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    if let Ok(addr) = host.parse::<IpAddr>() {
        return Ok(addr);
    }
    if !hostname_regex().is_match(host) {
        return Err(ConfigureError::unresolvable_host(host, "not a valid host name"));
    }
    (host, 0)
        .to_socket_addrs()
        .map_err(|e| ConfigureError::unresolvable_host(host, e))?
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| ConfigureError::unresolvable_host(host, "no addresses found"))
}

/// Parses `host:port`, `:port` or a bare port.
///
/// A missing host means any interface. IPv6 hosts are written in brackets.
pub fn parse_host_port(text: &str) -> ConfigureResult<HostPort> {
    let (host, port) = match text.rsplit_once(':') {
        Some((host, port)) => (host, port),
        None => ("", text),
    };
    let port: u16 = port
        .trim()
        .parse()
        .map_err(|e| ConfigureError::number_format(port, e))?;

    let host = host.trim();
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    let address = if host.is_empty() {
        None
    } else {
        Some(resolve_host(host)?)
    };
    Ok(HostPort::new(address, port))
}

#[cfg(test)]
mod tests {
    use std::net::Ipv6Addr;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_declared_type_names() {
        for (name, expected) in [
            ("String", DeclaredType::Text),
            ("text", DeclaredType::Text),
            ("int", DeclaredType::Int),
            ("integer", DeclaredType::Int),
            ("long", DeclaredType::Long),
            ("boolean", DeclaredType::Bool),
            ("URL", DeclaredType::Url),
            ("url", DeclaredType::Url),
            ("InetAddress", DeclaredType::Address),
            ("address", DeclaredType::Address),
            ("InetAddrPort", DeclaredType::HostPort),
            ("address-port", DeclaredType::HostPort),
        ] {
            assert_eq!(DeclaredType::parse(name).unwrap(), expected, "{name}");
        }
    }

    #[test]
    fn test_unknown_declared_type() {
        let err = DeclaredType::parse("double").unwrap_err();
        assert!(matches!(err, ConfigureError::UnknownType { ref name } if name == "double"));
        assert!(coerce_named(Value::from("1"), "Integer").is_err());
    }

    #[test]
    fn test_int_round_trip() {
        let int = coerce_named(Value::from("42"), "int").unwrap();
        assert_eq!(int, Value::Int(42));
        assert_eq!(coerce_named(int, "String").unwrap(), Value::from("42"));
    }

    #[test]
    fn test_number_format() {
        let err = coerce(Value::from("forty"), DeclaredType::Int).unwrap_err();
        assert!(matches!(err, ConfigureError::NumberFormat { ref text, .. } if text == "forty"));
        assert!(coerce(Value::from("99999999999"), DeclaredType::Int).is_err());
        assert_eq!(
            coerce(Value::from("99999999999"), DeclaredType::Long).unwrap(),
            Value::Long(99_999_999_999)
        );
    }

    #[test]
    fn test_numeric_text_is_trimmed() {
        assert_eq!(coerce(Value::from(" 7 "), DeclaredType::Int).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_passthrough() {
        let uri: Uri = "http://example.com/".parse().unwrap();
        assert_eq!(
            coerce(Value::Url(uri.clone()), DeclaredType::Url).unwrap(),
            Value::Url(uri)
        );
        assert_eq!(coerce(Value::Bool(true), DeclaredType::Bool).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_long_from_int() {
        assert_eq!(coerce(Value::Int(5), DeclaredType::Long).unwrap(), Value::Long(5));
        assert_eq!(coerce(Value::Long(5), DeclaredType::Int).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_bool_rule() {
        assert!(parse_bool("true"));
        assert!(parse_bool("T"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("yes, really"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
        assert_eq!(coerce(Value::Int(1), DeclaredType::Bool).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_bool_reads_first_character_untrimmed() {
        assert_eq!(
            coerce(Value::from("\n   true\n"), DeclaredType::Bool).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            coerce(Value::from("true \n"), DeclaredType::Bool).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_url() {
        let value = coerce_named(Value::from("http://example.com:8080/path"), "URL").unwrap();
        match value {
            Value::Url(uri) => {
                assert_eq!(uri.scheme_str(), Some("http"));
                assert_eq!(uri.port_u16(), Some(8080));
            }
            other => panic!("expected URL, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_url() {
        let err = parse_url("/relative/only").unwrap_err();
        assert!(matches!(err, ConfigureError::InvalidUrl { .. }));
        assert!(parse_url("http://exa mple.com").is_err());
    }

    #[test]
    fn test_address_literal() {
        assert_eq!(
            resolve_host("10.0.0.1").unwrap(),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))
        );
        assert_eq!(resolve_host("::1").unwrap(), IpAddr::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(resolve_host("").unwrap(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_localhost_resolves() {
        assert!(resolve_host("localhost").unwrap().is_loopback());
    }

    #[test]
    fn test_unresolvable_host() {
        let err = resolve_host("not a host!").unwrap_err();
        assert!(matches!(err, ConfigureError::UnresolvableHost { .. }));
    }

    #[test]
    fn test_host_port() {
        let hp = parse_host_port("127.0.0.1:8080").unwrap();
        assert_eq!(hp.address(), Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert_eq!(hp.port(), 8080);

        assert_eq!(parse_host_port(":9090").unwrap(), HostPort::new(None, 9090));
        assert_eq!(parse_host_port("9090").unwrap(), HostPort::new(None, 9090));
        assert_eq!(
            parse_host_port("[::1]:443").unwrap(),
            HostPort::new(Some(IpAddr::V6(Ipv6Addr::LOCALHOST)), 443)
        );
    }

    #[test]
    fn test_host_port_failures() {
        assert!(matches!(
            parse_host_port("127.0.0.1:http").unwrap_err(),
            ConfigureError::NumberFormat { .. }
        ));
        assert!(matches!(
            parse_host_port("no such host!:80").unwrap_err(),
            ConfigureError::UnresolvableHost { .. }
        ));
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(DeclaredType::Text.empty_value(), Some(Value::from("")));
        assert_eq!(DeclaredType::Bool.empty_value(), Some(Value::Bool(false)));
        assert_eq!(DeclaredType::Int.empty_value(), None);
    }

    proptest! {
        #[test]
        fn prop_int_text_round_trip(n in any::<i32>()) {
            let value = coerce(Value::from(n.to_string()), DeclaredType::Int).unwrap();
            prop_assert_eq!(&value, &Value::Int(n));
            prop_assert_eq!(coerce(value, DeclaredType::Text).unwrap(), Value::from(n.to_string()));
        }

        #[test]
        fn prop_long_accepts_padding(n in any::<i64>(), pad in "[ \t]{0,3}") {
            let text = format!("{pad}{n}{pad}");
            prop_assert_eq!(coerce(Value::from(text), DeclaredType::Long).unwrap(), Value::Long(n));
        }

        #[test]
        fn prop_bool_first_character(s in "\\PC{0,8}") {
            let expected = matches!(s.chars().next(), Some('1' | 't' | 'T'));
            prop_assert_eq!(coerce(Value::from(s), DeclaredType::Bool).unwrap(), Value::Bool(expected));
        }

        #[test]
        fn prop_port_only(port in any::<u16>()) {
            prop_assert_eq!(parse_host_port(&port.to_string()).unwrap(), HostPort::new(None, port));
        }
    }
}
