//! Application model of a hosted Gradio Space.
//!
//! A model is built once from the Space's source: every interface or event
//! binding found in document order becomes a callable function, numbered by
//! position, with the input schema reconstructed from its arguments.

/// Retrieval of application source.
pub mod fetch;

pub use fetch::{FetchError, HttpFetcher, LocalFetcher, SourceFetcher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analyzer::search::{narrow_call, pattern};
use crate::analyzer::{self, InvocationSchema, Node, SchemaBuilder, SearchableTree};
use crate::config::Settings;
use crate::error::Result;

/// Callee pattern for whole-application interfaces.
pub const INTERFACE_PATTERN: &str = "Interface";
/// Callee pattern for event bindings, used when no interface is found.
pub const EVENT_PATTERN: &str = "(click|submit)";
/// Source file analyzed when none is given.
pub const DEFAULT_SOURCE_PATH: &str = "app.py";

/// Static description of a Space: where to reach it and what it accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationModel {
    owner: String,
    application: String,
    endpoint: String,
    schemas: Vec<InvocationSchema>,
}

impl ApplicationModel {
    /// Fetch `path` from the Space and analyze it.
    pub fn build(
        owner: &str,
        application: &str,
        path: &str,
        fetcher: &dyn SourceFetcher,
        settings: &Settings,
    ) -> Result<Self> {
        let source = fetcher.fetch(owner, application, path)?;
        Ok(Self::from_source(owner, application, &source, settings)?)
    }

    /// Analyze already retrieved source text.
    pub fn from_source(
        owner: &str,
        application: &str,
        source: &str,
        settings: &Settings,
    ) -> analyzer::Result<Self> {
        let tree = SearchableTree::parse(source)?;
        let schemas = discover(&tree)?;
        Ok(Self {
            owner: owner.to_string(),
            application: application.to_string(),
            endpoint: endpoint_url(owner, application, &settings.ws_host),
            schemas,
        })
    }

    /// Model from explicit parts, for endpoints not hosted on Spaces.
    pub fn from_parts(
        owner: impl Into<String>,
        application: impl Into<String>,
        endpoint: impl Into<String>,
        schemas: Vec<InvocationSchema>,
    ) -> Self {
        Self {
            owner: owner.into(),
            application: application.into(),
            endpoint: endpoint.into(),
            schemas,
        }
    }

    /// Space owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Space name.
    pub fn application(&self) -> &str {
        &self.application
    }

    /// Queue WebSocket URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Discovered functions, indexed by `fn_index`.
    pub fn schemas(&self) -> &[InvocationSchema] {
        &self.schemas
    }

    /// Schema of one function.
    pub fn schema(&self, fn_index: usize) -> Option<&InvocationSchema> {
        self.schemas.get(fn_index)
    }
}

/// Queue endpoint of a hosted Space.
///
/// Underscores in either part become hyphens, matching the host names Spaces
/// are served under.
pub fn endpoint_url(owner: &str, application: &str, host: &str) -> String {
    format!(
        "wss://{}-{}.{}/queue/join",
        owner.replace('_', "-"),
        application.replace('_', "-"),
        host
    )
}

/// Discover every binding in `tree` and build its schema.
pub fn discover(tree: &SearchableTree) -> analyzer::Result<Vec<InvocationSchema>> {
    let mut binding_pattern = pattern(INTERFACE_PATTERN)?;
    let mut bindings = tree.find_calls_named(&binding_pattern);
    if bindings.is_empty() {
        debug!("no interface found, looking for event bindings");
        binding_pattern = pattern(EVENT_PATTERN)?;
        bindings = tree.find_calls_named(&binding_pattern);
    }

    let builder = SchemaBuilder::new(tree);
    let mut schemas = Vec::with_capacity(bindings.len());
    for (fn_index, binding) in bindings.into_iter().enumerate() {
        let schema = match narrow_call(binding, &binding_pattern) {
            Node::Expr(call @ analyzer::Expr::Call { func, .. }) => InvocationSchema {
                fn_index,
                trigger: func.to_string(),
                inputs: builder.build_schema(call)?,
            },
            other => InvocationSchema {
                fn_index,
                trigger: other.to_string(),
                inputs: Vec::new(),
            },
        };
        info!(
            fn_index,
            trigger = %schema.trigger,
            inputs = %serde_json::to_string(&schema.inputs).unwrap_or_default(),
            "discovered function"
        );
        schemas.push(schema);
    }
    Ok(schemas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_normalizes_underscores() {
        assert_eq!(
            endpoint_url("my_user", "cool_app", "hf.space"),
            "wss://my-user-cool-app.hf.space/queue/join"
        );
    }

    #[test]
    fn interfaces_take_precedence_over_events() {
        let source = r#"
import gradio as gr
btn.click(f, inputs=[gr.Number()])
demo = gr.Interface(fn=f, inputs="text", outputs="text")
"#;
        let model = ApplicationModel::from_source("o", "a", source, &Settings::builtin()).unwrap();
        assert_eq!(model.schemas().len(), 1);
        let schema = model.schema(0).unwrap();
        assert_eq!(schema.trigger, "gr.Interface");
        assert_eq!(schema.inputs[0].component_type, "text");
    }

    #[test]
    fn non_call_matches_keep_their_index() {
        let source = "handler = on_submit\nbtn.click(f, inputs=[gr.Slider()])\n";
        let model = ApplicationModel::from_source("o", "a", source, &Settings::builtin()).unwrap();
        assert_eq!(model.schemas().len(), 2);
        assert_eq!(model.schema(0).unwrap().trigger, "on_submit");
        assert!(model.schema(0).unwrap().inputs.is_empty());
        assert_eq!(model.schema(1).unwrap().inputs[0].component_type, "Slider");
    }
}
