//! Route matching logic.
//!
//! # Responsibilities
//! - Match the request path against a segment pattern
//! - Capture `{name}` segments and a trailing `{*rest}`
//! - Match the request method against a method set
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Leading/trailing slashes are not significant
//! - Empty method set = any method
//! - No regex to guarantee O(n) matching

use axum::http::Method;

/// Captured path parameters, stored in request extensions after routing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    CatchAll(String),
}

/// Compiled path pattern such as `/users/{id}/files/{*path}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = split(pattern)
            .map(|segment| {
                match segment
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                {
                    Some(name) => match name.strip_prefix('*') {
                        Some(rest) => Segment::CatchAll(rest.to_string()),
                        None => Segment::Param(name.to_string()),
                    },
                    None => Segment::Literal(segment.to_string()),
                }
            })
            .collect();
        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match `path`, returning the captures on success.
    pub fn captures(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = split(path).collect();
        let mut params = Vec::new();

        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::CatchAll(name) => {
                    params.push((name.clone(), parts.get(index..)?.join("/")));
                    return Some(PathParams(params));
                }
                Segment::Literal(literal) => {
                    if parts.get(index) != Some(&literal.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.push((name.clone(), (*parts.get(index)?).to_string()));
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(PathParams(params))
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Set of accepted methods; empty accepts any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodMatcher {
    methods: Vec<Method>,
}

impl MethodMatcher {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn add(&mut self, method: Method) {
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }
}
