//! Scripted claim mapper
//!
//! A [`TemplateMapper`] holds a JSON document whose string leaves are
//! Handlebars templates. Every leaf is compiled once at construction. At
//! mapping time the declared data sources are fetched through the registry
//! and the leaves are rendered over:
//!
//! ```text
//! {
//!   "subject":     TrustResult,
//!   "actor":       TrustResult | null,
//!   "request":     RequestAttributes,
//!   "datasources": { "<name>": <fetched payload>, ... }
//! }
//! ```
//!
//! A leaf starting with `json:` is parsed as JSON after rendering, so a
//! template can produce numbers, booleans, arrays and objects:
//!
//! ```text
//! { "groups": "json:{{json datasources.directory.groups}}" }
//! ```

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::debug;

use super::{ClaimMapper, MapperInput};
use crate::claims::Claims;
use crate::context::RequestContext;
use crate::error::MapperError;
use crate::template::TemplateEngine;

const JSON_PREFIX: &str = "json:";

#[derive(Debug, Clone)]
enum Node {
    Literal(Value),
    Template { id: String, parse_json: bool },
    Array(Vec<Node>),
    Object(Vec<(String, Node)>),
}

/// Mapper that renders a JSON template over the request and enrichment data
#[derive(Debug, Clone)]
pub struct TemplateMapper {
    name: String,
    engine: TemplateEngine,
    root: Node,
    data_sources: Vec<String>,
}

impl TemplateMapper {
    /// Compile `template`, which must be a JSON object
    ///
    /// `data_sources` names the sources fetched before rendering; their
    /// payloads appear under `datasources.<name>`.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::NotAnObject`] when the template root is not an
    /// object, or [`MapperError::Evaluation`] when a leaf does not compile.
    pub fn new<I, S>(
        name: impl Into<String>,
        template: Value,
        data_sources: I,
    ) -> Result<Self, MapperError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if !template.is_object() {
            return Err(MapperError::NotAnObject { mapper: name });
        }

        let mut engine = TemplateEngine::new();
        let mut next_id = 0usize;
        let root = compile(&name, &mut engine, &mut next_id, template)?;

        Ok(Self {
            name,
            engine,
            root,
            data_sources: data_sources.into_iter().map(Into::into).collect(),
        })
    }

    /// Data sources fetched before rendering
    #[must_use]
    pub fn data_sources(&self) -> &[String] {
        &self.data_sources
    }

    fn render(&self, node: &Node, scope: &Value) -> Result<Value, MapperError> {
        match node {
            Node::Literal(value) => Ok(value.clone()),
            Node::Template { id, parse_json } => {
                let rendered = self
                    .engine
                    .render(id, scope)
                    .map_err(|e| MapperError::evaluation(&self.name, e))?;
                if *parse_json {
                    serde_json::from_str(&rendered).map_err(|e| {
                        MapperError::evaluation(
                            &self.name,
                            format!("rendered value is not valid JSON ({e}): {rendered}"),
                        )
                    })
                } else {
                    Ok(Value::String(rendered))
                }
            }
            Node::Array(items) => items
                .iter()
                .map(|item| self.render(item, scope))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Node::Object(fields) => {
                let mut object = Map::with_capacity(fields.len());
                for (key, field) in fields {
                    object.insert(key.clone(), self.render(field, scope)?);
                }
                Ok(Value::Object(object))
            }
        }
    }
}

fn compile(
    mapper: &str,
    engine: &mut TemplateEngine,
    next_id: &mut usize,
    value: Value,
) -> Result<Node, MapperError> {
    match value {
        Value::String(source) => {
            let (source, parse_json) = match source.strip_prefix(JSON_PREFIX) {
                Some(rest) => (rest.to_string(), true),
                None => (source, false),
            };
            let id = format!("{mapper}#{next_id}");
            *next_id += 1;
            engine
                .register(&id, &source)
                .map_err(|e| MapperError::evaluation(mapper, e))?;
            Ok(Node::Template { id, parse_json })
        }
        Value::Array(items) => items
            .into_iter()
            .map(|item| compile(mapper, engine, next_id, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Node::Array),
        Value::Object(fields) => fields
            .into_iter()
            .map(|(key, field)| Ok((key, compile(mapper, engine, next_id, field)?)))
            .collect::<Result<Vec<_>, MapperError>>()
            .map(Node::Object),
        literal => Ok(Node::Literal(literal)),
    }
}

#[async_trait]
impl ClaimMapper for TemplateMapper {
    fn name(&self) -> &str {
        &self.name
    }

    async fn map(
        &self,
        ctx: &RequestContext,
        input: &MapperInput<'_>,
    ) -> Result<Claims, MapperError> {
        let mut fetched = Map::with_capacity(self.data_sources.len());
        for source in &self.data_sources {
            let result = input
                .data_sources
                .fetch(ctx, source, input.data_source_input)
                .await
                .map_err(|source| MapperError::DataSource {
                    mapper: self.name.clone(),
                    source,
                })?;
            fetched.insert(source.clone(), result.into_value());
        }
        debug!(mapper = %self.name, data_sources = fetched.len(), "Rendering claim template");

        let scope = json!({
            "subject": input.subject,
            "actor": input.actor,
            "request": input.request_attributes,
            "datasources": fetched,
        });

        match self.render(&self.root, &scope)? {
            Value::Object(claims) => Ok(Claims::from(claims)),
            _ => Err(MapperError::NotAnObject {
                mapper: self.name.clone(),
            }),
        }
    }
}
