//! Fixed-value data source

use async_trait::async_trait;
use serde_json::Value;

use super::{DataSource, DataSourceInput, DataSourceResult};
use crate::context::RequestContext;
use crate::error::DataSourceError;

/// Data source that always returns the same payload
#[derive(Debug, Clone)]
pub struct StaticDataSource {
    name: String,
    value: Value,
}

impl StaticDataSource {
    /// Create a source named `name` returning `value`
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[async_trait]
impl DataSource for StaticDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(
        &self,
        _ctx: &RequestContext,
        _input: &DataSourceInput,
    ) -> Result<DataSourceResult, DataSourceError> {
        Ok(DataSourceResult(self.value.clone()))
    }
}
