//! Deterministic cache key fragments
//!
//! A fragment is the part of a cache key derived from call arguments:
//! positional values joined by `:`, then `:`, then name-sorted `name=value`
//! pairs joined by `:`. A call without arguments therefore yields
//! [`EMPTY_FRAGMENT`].
//!
//! Values are rendered through `Display`; they must have stable textual forms.
//! A `:` or `=` inside a rendered value can make two different calls collide.

use crate::cache::types::{ArgValue, CallArgs};
use crate::error::{CacheError, Result};
use std::collections::BTreeMap;

/// Fragment produced by a call without any key-relevant argument
pub const EMPTY_FRAGMENT: &str = ":";

/// Build the argument fragment for a call
///
/// ```
/// use query_cache::cache::{build_key, CallArgs};
///
/// let args = CallArgs::new().arg(10).arg(0).kwarg("used", false);
/// assert_eq!(build_key(&args), "10:0:used=false");
/// assert_eq!(build_key(&CallArgs::new()), ":");
/// ```
pub fn build_key(args: &CallArgs) -> String {
    let positional = args
        .positional()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(":");

    let named = args
        .named()
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(":");

    format!("{}:{}", positional, named)
}

/// Maps call arguments to an argument fragment
pub trait KeyBuilder: Send + Sync {
    fn build(&self, args: &CallArgs) -> Result<String>;
}

impl<F> KeyBuilder for F
where
    F: Fn(&CallArgs) -> Result<String> + Send + Sync,
{
    fn build(&self, args: &CallArgs) -> Result<String> {
        self(args)
    }
}

/// Key builder that uses every argument as passed, see [`build_key`]
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicKeyBuilder;

impl KeyBuilder for BasicKeyBuilder {
    fn build(&self, args: &CallArgs) -> Result<String> {
        Ok(build_key(args))
    }
}

/// A declared parameter of a cached operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    /// `None` for a required parameter
    pub default: Option<ArgValue>,
}

/// Statically declared parameter list of an operation
///
/// Parameters are listed in declaration order; positional arguments bind to
/// them in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<Parameter>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter without a default
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(Parameter {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Declare a parameter with a default value
    pub fn optional(mut self, name: impl Into<String>, default: impl std::fmt::Display) -> Self {
        self.params.push(Parameter {
            name: name.into(),
            default: Some(ArgValue::text(default)),
        });
        self
    }

    /// Declare a parameter that defaults to an absent value
    pub fn optional_null(mut self, name: impl Into<String>) -> Self {
        self.params.push(Parameter {
            name: name.into(),
            default: Some(ArgValue::Null),
        });
        self
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    /// Bind call arguments to declared parameters and fill in defaults
    pub fn bind(&self, args: &CallArgs) -> Result<BTreeMap<String, ArgValue>> {
        if args.positional().len() > self.params.len() {
            return Err(CacheError::InvalidArguments(format!(
                "takes {} positional arguments but {} were given",
                self.params.len(),
                args.positional().len()
            )));
        }

        let mut bound: BTreeMap<String, ArgValue> = self
            .params
            .iter()
            .zip(args.positional())
            .map(|(param, value)| (param.name.clone(), value.clone()))
            .collect();

        for (name, value) in args.named() {
            if !self.contains(name) {
                return Err(CacheError::InvalidArguments(format!(
                    "unexpected keyword argument `{}`",
                    name
                )));
            }
            if bound.insert(name.clone(), value.clone()).is_some() {
                return Err(CacheError::InvalidArguments(format!(
                    "multiple values for argument `{}`",
                    name
                )));
            }
        }

        for param in &self.params {
            if bound.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    bound.insert(param.name.clone(), default.clone());
                }
                None => {
                    return Err(CacheError::InvalidArguments(format!(
                        "missing required argument `{}`",
                        param.name
                    )));
                }
            }
        }

        Ok(bound)
    }
}

/// Factory returned by [`build_key_with_defaults`]
#[derive(Debug, Clone)]
pub struct DefaultsKeyFactory {
    names: Vec<String>,
}

/// Key builder over a chosen subset of parameters, with declared defaults filled in
///
/// Calls that differ only in whether a defaulted parameter was spelled out
/// produce the same fragment. Parameters outside the chosen subset, such as a
/// database session, never reach the key.
///
/// ```
/// use query_cache::cache::{build_key_with_defaults, CallArgs, KeyBuilder, Signature};
///
/// let signature = Signature::new()
///     .required("session")
///     .optional("limit", 10)
///     .optional("offset", 0);
/// let builder = build_key_with_defaults(["limit", "offset"])
///     .for_signature(signature)
///     .unwrap();
///
/// let short = CallArgs::new().kwarg("session", "s");
/// let long = CallArgs::new().kwarg("session", "s").kwarg("limit", 10).kwarg("offset", 0);
/// assert_eq!(builder.build(&short).unwrap(), builder.build(&long).unwrap());
/// ```
pub fn build_key_with_defaults<I, N>(names: I) -> DefaultsKeyFactory
where
    I: IntoIterator<Item = N>,
    N: Into<String>,
{
    DefaultsKeyFactory {
        names: names.into_iter().map(Into::into).collect(),
    }
}

impl DefaultsKeyFactory {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Bind the factory to an operation's signature
    ///
    /// Fails if a chosen name is not declared by the signature.
    pub fn for_signature(&self, signature: Signature) -> Result<DefaultsKeyBuilder> {
        if let Some(unknown) = self.names.iter().find(|n| !signature.contains(n)) {
            return Err(CacheError::InvalidArguments(format!(
                "parameter `{}` is not declared by the signature",
                unknown
            )));
        }

        Ok(DefaultsKeyBuilder {
            names: self.names.clone(),
            signature,
        })
    }
}

/// See [`build_key_with_defaults`]
#[derive(Debug, Clone)]
pub struct DefaultsKeyBuilder {
    names: Vec<String>,
    signature: Signature,
}

impl DefaultsKeyBuilder {
    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

impl KeyBuilder for DefaultsKeyBuilder {
    fn build(&self, args: &CallArgs) -> Result<String> {
        let mut bound = self.signature.bind(args)?;

        let selected = self
            .names
            .iter()
            .filter_map(|name| bound.remove(name))
            .filter(|value| !value.is_null())
            .fold(CallArgs::new(), CallArgs::arg_value);

        Ok(build_key(&selected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks_signature() -> Signature {
        Signature::new()
            .required("session")
            .optional("limit", 10)
            .optional("offset", 0)
            .optional("ignore_used", true)
    }

    #[test]
    fn test_build_key_positional_only() {
        let args = CallArgs::new().arg(42).arg("alice");
        assert_eq!(build_key(&args), "42:alice:");
    }

    #[test]
    fn test_build_key_named_only() {
        let args = CallArgs::new().kwarg("user_id", 42);
        assert_eq!(build_key(&args), ":user_id=42");
    }

    #[test]
    fn test_build_key_mixed() {
        let args = CallArgs::new().arg(1).kwarg("b", 2).kwarg("a", 3);
        assert_eq!(build_key(&args), "1:a=3:b=2");
    }

    #[test]
    fn test_build_key_empty_is_sentinel() {
        assert_eq!(build_key(&CallArgs::new()), EMPTY_FRAGMENT);
    }

    #[test]
    fn test_build_key_keyword_order_independent() {
        let first = CallArgs::new().kwarg("limit", 10).kwarg("offset", 20);
        let second = CallArgs::new().kwarg("offset", 20).kwarg("limit", 10);
        assert_eq!(build_key(&first), build_key(&second));
    }

    #[test]
    fn test_build_key_distinguishes_values() {
        let first = CallArgs::new().arg(1).arg(2);
        let second = CallArgs::new().arg(2).arg(1);
        assert_ne!(build_key(&first), build_key(&second));
    }

    #[test]
    fn test_closure_key_builder_skips_session() {
        let builder = |args: &CallArgs| -> Result<String> {
            let rest = args
                .positional()
                .iter()
                .skip(1)
                .cloned()
                .fold(CallArgs::new(), CallArgs::arg_value);
            Ok(build_key(&rest))
        };

        let args = CallArgs::new().arg("session").arg(42);
        assert_eq!(builder.build(&args).unwrap(), "42:");
    }

    #[test]
    fn test_defaults_fill_in_missing_parameters() {
        let builder = build_key_with_defaults(["limit", "offset"])
            .for_signature(tracks_signature())
            .unwrap();

        let short = CallArgs::new().kwarg("session", "s");
        let long = CallArgs::new()
            .kwarg("session", "s")
            .kwarg("limit", 10)
            .kwarg("offset", 0);
        let positional = CallArgs::new().arg("s").arg(10).arg(0);

        let expected = "10:0:";
        assert_eq!(builder.build(&short).unwrap(), expected);
        assert_eq!(builder.build(&long).unwrap(), expected);
        assert_eq!(builder.build(&positional).unwrap(), expected);
    }

    #[test]
    fn test_defaults_follow_requested_order() {
        let builder = build_key_with_defaults(["offset", "limit"])
            .for_signature(tracks_signature())
            .unwrap();

        let args = CallArgs::new().arg("s").arg(25);
        assert_eq!(builder.build(&args).unwrap(), "0:25:");
    }

    #[test]
    fn test_defaults_ignore_session_value() {
        let builder = build_key_with_defaults(["limit"])
            .for_signature(tracks_signature())
            .unwrap();

        let a = CallArgs::new().arg("session-1");
        let b = CallArgs::new().arg("session-2");
        assert_eq!(builder.build(&a).unwrap(), builder.build(&b).unwrap());
    }

    #[test]
    fn test_defaults_drop_null_values() {
        let signature = Signature::new()
            .required("session")
            .optional_null("cursor")
            .optional("limit", 10);
        let builder = build_key_with_defaults(["cursor", "limit"])
            .for_signature(signature)
            .unwrap();

        let args = CallArgs::new().arg("s");
        assert_eq!(builder.build(&args).unwrap(), "10:");

        let args = CallArgs::new().arg("s").kwarg("cursor", "abc");
        assert_eq!(builder.build(&args).unwrap(), "abc:10:");
    }

    #[test]
    fn test_defaults_without_names_yield_sentinel() {
        let builder = build_key_with_defaults(Vec::<String>::new())
            .for_signature(tracks_signature())
            .unwrap();

        let args = CallArgs::new().arg("s").arg(99);
        assert_eq!(builder.build(&args).unwrap(), EMPTY_FRAGMENT);
    }

    #[test]
    fn test_factory_rejects_undeclared_name() {
        let result = build_key_with_defaults(["page"]).for_signature(tracks_signature());
        assert!(matches!(result, Err(CacheError::InvalidArguments(_))));
    }

    #[test]
    fn test_bind_errors() {
        let signature = tracks_signature();

        let missing = CallArgs::new().kwarg("limit", 5);
        assert!(matches!(
            signature.bind(&missing),
            Err(CacheError::InvalidArguments(msg)) if msg.contains("session")
        ));

        let unexpected = CallArgs::new().arg("s").kwarg("page", 2);
        assert!(signature.bind(&unexpected).is_err());

        let duplicate = CallArgs::new().arg("s").arg(5).kwarg("limit", 5);
        assert!(matches!(
            signature.bind(&duplicate),
            Err(CacheError::InvalidArguments(msg)) if msg.contains("multiple values")
        ));

        let too_many = CallArgs::new().arg(1).arg(2).arg(3).arg(4).arg(5);
        assert!(signature.bind(&too_many).is_err());
    }
}
