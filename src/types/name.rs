/// A name composed of an optional namespace and a local part, e.g.
/// `{http://example.org}Station`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    namespace: Option<String>,
    local_part: String,
}

impl QualifiedName {
    pub fn new(namespace: impl Into<String>, local_part: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_part: local_part.into(),
        }
    }

    pub fn local(local_part: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_part: local_part.into(),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn local_part(&self) -> &str {
        &self.local_part
    }

    /// The prefix property references are qualified with when they belong to
    /// this name: `{namespace}local` or just `local`.
    pub fn prefix(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{{{}}}{}", ns, self.local_part),
            None => self.local_part.clone(),
        }
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

impl std::str::FromStr for QualifiedName {
    type Err = std::convert::Infallible;

    /// Parses the `{namespace}local` notation, anything else is a bare local part.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = value.strip_prefix('{') {
            if let Some((ns, local)) = rest.split_once('}') {
                return Ok(Self::new(ns, local));
            }
        }
        Ok(Self::local(value))
    }
}
