//! Leaf-level syntax checks that can be attached to schema nodes.
//!
//! A [`Predicate`] wraps any function from a string value to a list of [`Errors`]. The
//! ready-made predicates in this module cover the naming conventions Kubernetes applies to
//! object names and labels.

// The DNS checks are adapted from Kubernetes.
// See apimachinery/pkg/util/validation/validation.go in the Kubernetes source

use std::{
    fmt::{Debug, Display},
    sync::{Arc, LazyLock},
};

use const_format::concatcp;
use regex::Regex;
use snafu::Snafu;

/// Minimal length required by RFC 1123 is 63. Up to 255 allowed, unsupported by k8s.
const RFC_1123_LABEL_MAX_LENGTH: usize = 63;
const RFC_1123_LABEL_FMT: &str = "[a-zA-Z0-9]([-a-zA-Z0-9]*[a-zA-Z0-9])?";
const RFC_1123_LABEL_ERROR_MSG: &str = "a RFC 1123 label must consist of alphanumeric characters or '-', and must start and end with an alphanumeric character";

const LOWERCASE_RFC_1123_LABEL_FMT: &str = "[a-z0-9]([-a-z0-9]*[a-z0-9])?";

/// This is a subdomain's max length in DNS (RFC 1123)
const RFC_1123_SUBDOMAIN_MAX_LENGTH: usize = 253;
const LOWERCASE_RFC_1123_SUBDOMAIN_FMT: &str = concatcp!(
    LOWERCASE_RFC_1123_LABEL_FMT,
    "(\\.",
    LOWERCASE_RFC_1123_LABEL_FMT,
    ")*"
);
const LOWERCASE_RFC_1123_SUBDOMAIN_ERROR_MSG: &str = "a lowercase RFC 1123 subdomain must consist of lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character";

const DOMAIN_MAX_LENGTH: usize = RFC_1123_SUBDOMAIN_MAX_LENGTH;
const RFC_1123_SUBDOMAIN_FMT: &str =
    concatcp!(RFC_1123_LABEL_FMT, "(\\.", RFC_1123_LABEL_FMT, ")*");
/// Same as [`RFC_1123_SUBDOMAIN_FMT`], but allows a trailing dot
const DOMAIN_FMT: &str = concatcp!(RFC_1123_SUBDOMAIN_FMT, "\\.?");
const DOMAIN_ERROR_MSG: &str = "a domain must consist of alphanumeric characters, '-' or '.', and must start with an alphanumeric character and end with an alphanumeric character or '.'";

// RFC 1035 section 2.3.1: labels start with a letter, unlike RFC 1123 labels.
const RFC_1035_LABEL_FMT: &str = "[a-z]([-a-z0-9]*[a-z0-9])?";
const RFC_1035_LABEL_ERROR_MSG: &str = "a DNS-1035 label must consist of lower case alphanumeric characters or '-', start with an alphabetic character, and end with an alphanumeric character";

// This is a label's max length in DNS (RFC 1035)
const RFC_1035_LABEL_MAX_LENGTH: usize = 63;

static DOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{DOMAIN_FMT}$")).expect("failed to compile domain regex")
});

static RFC_1123_LABEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{RFC_1123_LABEL_FMT}$")).expect("failed to compile RFC 1123 label regex")
});

static LOWERCASE_RFC_1123_SUBDOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{LOWERCASE_RFC_1123_SUBDOMAIN_FMT}$"))
        .expect("failed to compile lowercase RFC 1123 subdomain regex")
});

static RFC_1035_LABEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{RFC_1035_LABEL_FMT}$")).expect("failed to compile RFC 1035 label regex")
});

type Result<T = (), E = Errors> = std::result::Result<T, E>;

/// A collection of problems discovered by a single predicate.
#[derive(Debug)]
pub struct Errors(Vec<Error>);

impl Errors {
    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.0.iter()
    }
}

impl Display for Errors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

impl From<Error> for Errors {
    fn from(value: Error) -> Self {
        Self(vec![value])
    }
}

/// A single problem with a value.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(transparent)]
    Regex { source: RegexError },

    #[snafu(display("input is {length} bytes long but must be no more than {max_length}"))]
    TooLong { length: usize, max_length: usize },

    #[snafu(display("{message}"))]
    Custom { message: String },
}

#[derive(Debug)]
pub struct RegexError {
    /// The primary error message.
    msg: &'static str,

    /// The regex that the input must match.
    regex: &'static str,

    /// Examples of valid inputs (if non-empty).
    examples: &'static [&'static str],
}

impl Display for RegexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            msg,
            regex,
            examples,
        } = self;
        write!(f, "{msg} (")?;
        if !examples.is_empty() {
            for (i, example) in examples.iter().enumerate() {
                let prefix = match i {
                    0 => "e.g.",
                    _ => "or",
                };
                write!(f, "{prefix} {example:?}, ")?;
            }
        }
        write!(f, "regex used for validation is {regex:?})")
    }
}

impl std::error::Error for RegexError {}

type CheckFn = dyn Fn(&str) -> Result + Send + Sync;

/// A named check over string values.
///
/// Predicates are cheap to clone and can wrap plain functions as well as closures:
///
/// ```
/// use manifest_engine::predicate::{self, Predicate};
///
/// let no_spaces = Predicate::new("no-spaces", |value| {
///     if value.contains(' ') {
///         Err(predicate::Error::Custom { message: "must not contain spaces".into() }.into())
///     } else {
///         Ok(())
///     }
/// });
///
/// assert!(no_spaces.check("a-b").is_ok());
/// assert!(no_spaces.check("a b").is_err());
/// ```
#[derive(Clone)]
pub struct Predicate {
    name: &'static str,
    check: Arc<CheckFn>,
}

impl Predicate {
    pub fn new<F>(name: &'static str, check: F) -> Self
    where
        F: Fn(&str) -> Result + Send + Sync + 'static,
    {
        Self {
            name,
            check: Arc::new(check),
        }
    }

    /// Rejects values that are longer than `max_length` bytes.
    pub fn max_length(max_length: usize) -> Self {
        Self::new("max-length", move |value| {
            validate_str_length(value, max_length).map_err(Errors::from)
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn check(&self, value: &str) -> Result {
        (self.check)(value)
    }
}

impl Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Predicate").field(&self.name).finish()
    }
}

/// A predicate accepting RFC 1123 labels, see [`is_rfc_1123_label`].
pub fn rfc_1123_label() -> Predicate {
    Predicate::new("rfc-1123-label", is_rfc_1123_label)
}

/// A predicate accepting lowercase RFC 1123 subdomains (valid Kubernetes object names), see
/// [`is_lowercase_rfc_1123_subdomain`].
pub fn lowercase_rfc_1123_subdomain() -> Predicate {
    Predicate::new(
        "lowercase-rfc-1123-subdomain",
        is_lowercase_rfc_1123_subdomain,
    )
}

/// A predicate accepting RFC 1035 labels, see [`is_rfc_1035_label`].
pub fn rfc_1035_label() -> Predicate {
    Predicate::new("rfc-1035-label", is_rfc_1035_label)
}

/// A predicate accepting domain names, see [`is_domain`].
pub fn domain() -> Predicate {
    Predicate::new("domain", is_domain)
}

/// Returns [`Ok`] if `value`'s length fits within `max_length`.
fn validate_str_length(value: &str, max_length: usize) -> Result<(), Error> {
    if value.len() > max_length {
        TooLongSnafu {
            length: value.len(),
            max_length,
        }
        .fail()
    } else {
        Ok(())
    }
}

/// Returns [`Ok`] if `value` matches `regex`.
fn validate_str_regex(
    value: &str,
    regex: &'static Regex,
    error_msg: &'static str,
    examples: &'static [&'static str],
) -> Result<(), Error> {
    if regex.is_match(value) {
        Ok(())
    } else {
        Err(RegexError {
            msg: error_msg,
            regex: regex
                .as_str()
                // Clean up start/end-of-line markers
                .trim_start_matches('^')
                .trim_end_matches('$'),
            examples,
        }
        .into())
    }
}

/// Returns [`Ok`] if *all* validations are [`Ok`], otherwise returns all errors.
fn validate_all(validations: impl IntoIterator<Item = Result<(), Error>>) -> Result {
    let errors = validations
        .into_iter()
        .filter_map(Result::err)
        .collect::<Vec<_>>();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Errors(errors))
    }
}

pub fn is_domain(value: &str) -> Result {
    validate_all([
        validate_str_length(value, DOMAIN_MAX_LENGTH),
        validate_str_regex(
            value,
            &DOMAIN_REGEX,
            DOMAIN_ERROR_MSG,
            &[
                "example.com",
                "example.com.",
                "cluster.local",
                "cluster.local.",
            ],
        ),
    ])
}

/// Tests for a string that conforms to the definition of a label in DNS (RFC 1123).
/// Maximum label length supported by k8s is 63 characters (minimum required).
pub fn is_rfc_1123_label(value: &str) -> Result {
    validate_all([
        validate_str_length(value, RFC_1123_LABEL_MAX_LENGTH),
        validate_str_regex(
            value,
            &RFC_1123_LABEL_REGEX,
            RFC_1123_LABEL_ERROR_MSG,
            &["example-label", "1-label-1"],
        ),
    ])
}

/// Tests for a string that conforms to the definition of a subdomain in DNS (RFC 1123), using
/// lower case characters only. This is what Kubernetes expects of most object names.
pub fn is_lowercase_rfc_1123_subdomain(value: &str) -> Result {
    validate_all([
        validate_str_length(value, RFC_1123_SUBDOMAIN_MAX_LENGTH),
        validate_str_regex(
            value,
            &LOWERCASE_RFC_1123_SUBDOMAIN_REGEX,
            LOWERCASE_RFC_1123_SUBDOMAIN_ERROR_MSG,
            &["example.com", "spark-pi"],
        ),
    ])
}

/// Tests for a string that conforms to the definition of a label in DNS (RFC 1035).
pub fn is_rfc_1035_label(value: &str) -> Result {
    validate_all([
        validate_str_length(value, RFC_1035_LABEL_MAX_LENGTH),
        validate_str_regex(
            value,
            &RFC_1035_LABEL_REGEX,
            RFC_1035_LABEL_ERROR_MSG,
            &["my-name", "abc-123"],
        ),
    ])
}
