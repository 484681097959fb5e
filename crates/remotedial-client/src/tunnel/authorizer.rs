//! Connect authorization predicates.
//!
//! The connector never evaluates these itself. It hands the predicate to the
//! session, which asks it before opening a stream to `(proto, address)`.

/// Decides whether the remote side may open a stream to `address` over `proto`.
pub trait ConnectAuthorizer: Send + Sync {
    fn authorize(&self, proto: &str, address: &str) -> bool;
}

impl<F> ConnectAuthorizer for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn authorize(&self, proto: &str, address: &str) -> bool {
        self(proto, address)
    }
}

/// Permits every target.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ConnectAuthorizer for AllowAll {
    fn authorize(&self, _proto: &str, _address: &str) -> bool {
        true
    }
}

/// Rejects every target.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl ConnectAuthorizer for DenyAll {
    fn authorize(&self, _proto: &str, _address: &str) -> bool {
        false
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid allow pattern {0:?}: expected proto:host:port")]
pub struct InvalidPattern(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    proto: String,
    host: String,
    port: String,
}

fn segment_matches(pattern: &str, value: &str) -> bool {
    pattern == "*" || pattern.eq_ignore_ascii_case(value)
}

/// Permits targets matching any of a list of `proto:host:port` patterns.
///
/// Each segment may be `*`. `proto:*` is shorthand for `proto:*:*`.
/// IPv6 hosts keep their brackets, e.g. `tcp:[::1]:22`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    rules: Vec<Rule>,
}

impl AllowList {
    pub fn parse<I, S>(patterns: I) -> Result<Self, InvalidPattern>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .map(|p| Self::parse_rule(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    fn parse_rule(pattern: &str) -> Result<Rule, InvalidPattern> {
        let invalid = || InvalidPattern(pattern.to_string());
        let (proto, rest) = pattern.split_once(':').ok_or_else(invalid)?;
        let (host, port) = if rest == "*" {
            ("*", "*")
        } else {
            rest.rsplit_once(':').ok_or_else(invalid)?
        };
        if proto.is_empty() || host.is_empty() || port.is_empty() {
            return Err(invalid());
        }
        Ok(Rule {
            proto: proto.to_string(),
            host: host.to_string(),
            port: port.to_string(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl ConnectAuthorizer for AllowList {
    fn authorize(&self, proto: &str, address: &str) -> bool {
        let Some((host, port)) = address.rsplit_once(':') else {
            return false;
        };
        self.rules.iter().any(|r| {
            segment_matches(&r.proto, proto)
                && segment_matches(&r.host, host)
                && segment_matches(&r.port, port)
        })
    }
}
