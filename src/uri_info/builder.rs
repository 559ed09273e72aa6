//! Mutable URI builder seeded from an existing URI.

use url::Url;

use super::UriError;

/// Builds absolute URIs one component at a time.
///
/// Components are kept in their encoded form; [`UriBuilder::segment`] and
/// [`UriBuilder::query_param`] encode their input, the other setters take text
/// that is already valid in that position.
///
/// ```rust
/// use repository_http::uri_info::UriBuilder;
/// use url::Url;
///
/// let base = Url::parse("http://localhost:8080/rest/").unwrap();
/// let uri = UriBuilder::from_url(&base)
///     .segment("my book")
///     .query_param("view", "full")
///     .build()
///     .unwrap();
///
/// assert_eq!(uri.as_str(), "http://localhost:8080/rest/my%20book?view=full");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriBuilder {
    scheme: String,
    user_info: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl UriBuilder {
    pub fn from_url(url: &Url) -> Self {
        let user_info = match (url.username(), url.password()) {
            ("", None) => None,
            (user, None) => Some(user.to_string()),
            (user, Some(password)) => Some(format!("{user}:{password}")),
        };

        Self {
            scheme: url.scheme().to_string(),
            user_info,
            host: url.host_str().map(str::to_string),
            port: url.port(),
            path: url.path().to_string(),
            query: url.query().map(str::to_string),
            fragment: url.fragment().map(str::to_string),
        }
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Set the host. Bare IPv6 addresses are bracketed.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        self.host = Some(if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host
        });
        self
    }

    /// Set the port; `None` drops any explicit port.
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn replace_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Append `path` to the current path with exactly one `/` between them.
    pub fn path(mut self, path: &str) -> Self {
        if path.is_empty() {
            return self;
        }
        match (self.path.ends_with('/'), path.starts_with('/')) {
            (true, true) => self.path.push_str(path.trim_start_matches('/')),
            (false, false) => {
                self.path.push('/');
                self.path.push_str(path);
            }
            _ => self.path.push_str(path),
        }
        self
    }

    /// Append a single segment, percent-encoding `/` and anything else reserved.
    pub fn segment(self, segment: &str) -> Self {
        let encoded = urlencoding::encode(segment);
        self.path(&encoded)
    }

    /// Append an encoded `name=value` pair to the query.
    pub fn query_param(mut self, name: &str, value: &str) -> Self {
        let pair = format!(
            "{}={}",
            urlencoding::encode(name),
            urlencoding::encode(value)
        );
        self.query = Some(match self.query.take() {
            Some(query) if !query.is_empty() => format!("{query}&{pair}"),
            _ => pair,
        });
        self
    }

    pub fn replace_query(mut self, query: Option<&str>) -> Self {
        self.query = query.map(str::to_string);
        self
    }

    pub fn fragment(mut self, fragment: Option<&str>) -> Self {
        self.fragment = fragment.map(str::to_string);
        self
    }

    pub fn current_scheme(&self) -> &str {
        &self.scheme
    }

    pub fn current_host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn current_port(&self) -> Option<u16> {
        self.port
    }

    /// Assemble and parse the URI.
    ///
    /// # Errors
    ///
    /// Returns [`UriError`] if the components do not form a valid absolute URI.
    pub fn build(&self) -> Result<Url, UriError> {
        let mut uri = format!("{}:", self.scheme);

        match &self.host {
            Some(host) => {
                uri.push_str("//");
                if let Some(user_info) = &self.user_info {
                    uri.push_str(user_info);
                    uri.push('@');
                }
                uri.push_str(host);
                if let Some(port) = self.port {
                    uri.push(':');
                    uri.push_str(&port.to_string());
                }
                if !self.path.is_empty() && !self.path.starts_with('/') {
                    uri.push('/');
                }
            }
            None if matches!(self.scheme.as_str(), "http" | "https") => {
                return Err(UriError::MissingHost(format!("{uri}{}", self.path)));
            }
            None => {}
        }

        uri.push_str(&self.path);
        if let Some(query) = &self.query {
            uri.push('?');
            uri.push_str(query);
        }
        if let Some(fragment) = &self.fragment {
            uri.push('#');
            uri.push_str(fragment);
        }

        Url::parse(&uri).map_err(|e| UriError::parse(uri, e))
    }
}
