//! HTTP-backed data source
//!
//! Fetches a JSON document from a URL rendered per request from a
//! Handlebars template over the [`DataSourceInput`]. With a cache TTL the
//! source is [`Cacheable`] and the rendered request (URL plus headers) is the
//! cache key.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error};

use super::{Cacheable, DataSource, DataSourceInput, DataSourceResult};
use crate::context::RequestContext;
use crate::error::DataSourceError;
use crate::template::TemplateEngine;

const URL_TEMPLATE: &str = "url";

/// Data source that GETs a JSON document over HTTP
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use tokensmith::datasource::HttpDataSource;
///
/// let source = HttpDataSource::builder(
///     "userinfo",
///     "https://directory.example.com/users/{{subject.subject}}",
/// )
/// .header("accept", "application/json")
/// .cache_ttl(Duration::from_secs(60))
/// .build()
/// .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct HttpDataSource {
    name: String,
    templates: TemplateEngine,
    header_names: Vec<String>,
    cache_ttl: Option<Duration>,
    client: reqwest::Client,
}

/// Builder for [`HttpDataSource`]
#[derive(Debug, Clone)]
pub struct HttpDataSourceBuilder {
    name: String,
    url: String,
    headers: Vec<(String, String)>,
    timeout: Duration,
    cache_ttl: Option<Duration>,
}

impl HttpDataSourceBuilder {
    /// Add a request header; the value is a template
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Per-request timeout (default: 5 seconds)
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cache results for `ttl`; zero caches forever
    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Compile the templates and build the HTTP client
    ///
    /// # Errors
    ///
    /// Returns [`DataSourceError::Configuration`] when a template does not
    /// compile or the HTTP client cannot be created.
    pub fn build(self) -> Result<HttpDataSource, DataSourceError> {
        let misconfigured = |message: String| DataSourceError::Configuration {
            source_name: self.name.clone(),
            message,
        };

        let mut templates = TemplateEngine::new();
        templates
            .register(URL_TEMPLATE, &self.url)
            .map_err(|e| misconfigured(e.to_string()))?;

        let mut header_names = Vec::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            templates
                .register(&header_template(name), value)
                .map_err(|e| misconfigured(e.to_string()))?;
            header_names.push(name.clone());
        }

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(format!("tokensmith/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| misconfigured(format!("failed to create HTTP client: {e}")))?;

        Ok(HttpDataSource {
            name: self.name,
            templates,
            header_names,
            cache_ttl: self.cache_ttl,
            client,
        })
    }
}

fn header_template(name: &str) -> String {
    format!("header:{name}")
}

impl HttpDataSource {
    /// Start building a source named `name` fetching `url_template`
    pub fn builder(
        name: impl Into<String>,
        url_template: impl Into<String>,
    ) -> HttpDataSourceBuilder {
        HttpDataSourceBuilder {
            name: name.into(),
            url: url_template.into(),
            headers: Vec::new(),
            timeout: Duration::from_secs(5),
            cache_ttl: None,
        }
    }

    fn render_request(
        &self,
        input: &DataSourceInput,
    ) -> Result<(String, Vec<(String, String)>), DataSourceError> {
        let url = self
            .templates
            .render(URL_TEMPLATE, input)
            .map_err(|e| DataSourceError::fetch(&self.name, e))?;

        let headers = self
            .header_names
            .iter()
            .map(|name| {
                self.templates
                    .render(&header_template(name), input)
                    .map(|value| (name.clone(), value))
                    .map_err(|e| DataSourceError::fetch(&self.name, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((url, headers))
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(
        &self,
        ctx: &RequestContext,
        input: &DataSourceInput,
    ) -> Result<DataSourceResult, DataSourceError> {
        let (url, headers) = self.render_request(input)?;
        debug!(data_source = %self.name, url = %url, "Fetching data source");

        let mut request = self.client.get(&url);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = ctx.run(request.send()).await?.map_err(|e| {
            error!(data_source = %self.name, url = %url, error = %e, "Data source request failed");
            DataSourceError::fetch(&self.name, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(
                data_source = %self.name,
                url = %url,
                status = %status,
                "Data source returned error status"
            );
            return Err(DataSourceError::fetch(
                &self.name,
                format!("unexpected status {status}"),
            ));
        }

        let body: serde_json::Value = ctx.run(response.json()).await?.map_err(|e| {
            error!(data_source = %self.name, url = %url, error = %e, "Invalid data source JSON");
            DataSourceError::fetch(&self.name, format!("invalid JSON body: {e}"))
        })?;

        Ok(DataSourceResult(body))
    }

    fn as_cacheable(&self) -> Option<&dyn Cacheable> {
        self.cache_ttl.is_some().then_some(self as &dyn Cacheable)
    }
}

impl Cacheable for HttpDataSource {
    fn cache_key(
        &self,
        _ctx: &RequestContext,
        input: &DataSourceInput,
    ) -> Result<String, DataSourceError> {
        let (url, headers) = self
            .render_request(input)
            .map_err(|e| DataSourceError::CacheKey {
                source_name: self.name.clone(),
                message: e.to_string(),
            })?;

        let mut key = url;
        for (name, value) in headers {
            key.push('\n');
            key.push_str(&name);
            key.push(':');
            key.push_str(&value);
        }
        Ok(key)
    }

    fn cache_ttl(&self) -> Duration {
        self.cache_ttl.unwrap_or_default()
    }
}
