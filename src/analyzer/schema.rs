//! Input schemas of event bindings.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ast::{Constant, Expr};
use super::component::{ComponentType, UNKNOWN_DATATYPE, expected_datatype};
use super::resolve::{ResolvedValue, Resolver};
use super::search::{Node, SearchableTree, keyword_argument, positional_argument};
use super::{AnalyzerError, Result};

/// One input slot of a remote function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// Component type name, `"Unknown"` outside the vocabulary.
    #[serde(rename = "type")]
    pub component_type: String,
    /// Payload datatype expected for this slot.
    pub expected_datatype: String,
    /// `default=` argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ResolvedValue>,
    /// `value=` argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ResolvedValue>,
    /// `label=` argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<ResolvedValue>,
    /// `placeholder=` argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<ResolvedValue>,
    /// `visible=` argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<ResolvedValue>,
    /// `choices=` argument, only for components that take one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<ResolvedValue>,
}

impl ComponentDescriptor {
    /// Descriptor with only a type, its datatype looked up in the table.
    pub fn of_type(component_type: impl Into<String>) -> Self {
        let component_type = component_type.into();
        let expected_datatype = expected_datatype(&component_type).to_string();
        Self {
            component_type,
            expected_datatype,
            default: None,
            value: None,
            label: None,
            placeholder: None,
            visible: None,
            choices: None,
        }
    }

    /// Descriptor for a literal written directly in an inputs list, such as
    /// the `"text"` shortcut.
    pub fn literal(value: &Constant) -> Self {
        let text = match value {
            Constant::Str(text) => text.clone(),
            other => other.to_string(),
        };
        let expected_datatype = ComponentType::from_shortcut(&text)
            .map_or(UNKNOWN_DATATYPE, ComponentType::expected_datatype)
            .to_string();
        Self {
            expected_datatype,
            ..Self::of_type(text)
        }
    }

    /// The vocabulary member this slot corresponds to.
    pub fn component(&self) -> Option<ComponentType> {
        ComponentType::from_name(&self.component_type)
            .or_else(|| ComponentType::from_shortcut(&self.component_type))
    }
}

/// Ordered inputs of one remote function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationSchema {
    /// Position of the binding in document order.
    pub fn_index: usize,
    /// Source rendering of the callee that registered the function.
    pub trigger: String,
    /// Input slots in positional order.
    pub inputs: Vec<ComponentDescriptor>,
}

impl InvocationSchema {
    /// Number of positional inputs.
    pub fn arity(&self) -> usize {
        self.inputs.len()
    }
}

/// Reconstructs input schemas from binding calls.
#[derive(Debug, Clone, Copy)]
pub struct SchemaBuilder<'a> {
    resolver: Resolver<'a>,
}

impl<'a> SchemaBuilder<'a> {
    /// Builder over `tree`.
    pub fn new(tree: &'a SearchableTree) -> Self {
        Self {
            resolver: Resolver::new(tree),
        }
    }

    /// Describe a component from its constructor expression.
    ///
    /// Keyword arguments are only read when `expr` is itself a call.
    pub fn describe_component(&self, expr: &'a Expr) -> Result<ComponentDescriptor> {
        let mut descriptor = ComponentDescriptor::of_type(self.resolver.component_type(expr)?);

        descriptor.default = self.keyword(expr, "default")?;
        descriptor.value = self.keyword(expr, "value")?;
        descriptor.label = self.keyword(expr, "label")?;
        descriptor.placeholder = self.keyword(expr, "placeholder")?;
        descriptor.visible = self.keyword(expr, "visible")?;
        if descriptor.component().is_some_and(ComponentType::has_choices) {
            descriptor.choices = self.keyword(expr, "choices")?;
        }
        Ok(descriptor)
    }

    /// Describe each element of an inputs list, in order.
    pub fn expand_input_list(&self, elements: &'a [Expr]) -> Result<Vec<ComponentDescriptor>> {
        elements
            .iter()
            .map(|element| match element {
                Expr::Name { id } => self.describe_component(self.resolver.binding_value(id)?),
                Expr::Constant { value } => Ok(ComponentDescriptor::literal(value)),
                Expr::Call { .. } => self.describe_component(element),
                other => Err(AnalyzerError::UnsupportedConstruct(format!(
                    "`{other}` in an inputs list"
                ))),
            })
            .collect()
    }

    /// Input schema of a binding call.
    ///
    /// Inputs come from the `inputs=` keyword. Only `Interface`, `click` and
    /// `submit`, whose signatures start with `fn, inputs`, fall back to the
    /// second positional argument.
    pub fn build_schema(&self, binding: &'a Expr) -> Result<Vec<ComponentDescriptor>> {
        let inputs = keyword_argument(binding, "inputs").or_else(|| {
            takes_positional_inputs(binding)
                .then(|| positional_argument(binding, 1))
                .flatten()
        });
        let Some(inputs) = inputs else {
            return Ok(Vec::new());
        };

        let inputs = match inputs {
            Expr::Name { id } => self.resolver.binding_value(id)?,
            other => other,
        };

        match inputs {
            Expr::Call { .. } => Ok(vec![self.describe_component(inputs)?]),
            Expr::List { elts } | Expr::Tuple { elts } => self.expand_input_list(elts),
            Expr::Constant {
                value: Constant::None,
            } => Ok(Vec::new()),
            Expr::Constant { value } => Ok(vec![ComponentDescriptor::literal(value)]),
            other => {
                debug!(inputs = %other, "inputs shape not understood, schema left empty");
                Ok(Vec::new())
            }
        }
    }

    fn keyword(&self, expr: &'a Expr, name: &str) -> Result<Option<ResolvedValue>> {
        keyword_argument(expr, name)
            .map(|value| self.resolver.resolve(Node::Expr(value), false))
            .transpose()
    }
}

/// Callees whose second positional parameter is `inputs`.
const POSITIONAL_INPUTS: &[&str] = &["Interface", "click", "submit"];

fn takes_positional_inputs(binding: &Expr) -> bool {
    match binding {
        Expr::Call { func, .. } => func
            .identifier()
            .is_some_and(|callee| POSITIONAL_INPUTS.contains(&callee)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::search::pattern;

    fn schema_of(source: &str) -> Result<Vec<ComponentDescriptor>> {
        let tree = SearchableTree::parse(source)?;
        let builder = SchemaBuilder::new(&tree);
        let binding = tree
            .find_first_call_named(&pattern("(click|submit)")?)
            .and_then(Node::as_expr)
            .expect("binding present");
        builder.build_schema(binding)
    }

    #[test]
    fn single_named_component() {
        let source = r#"
name = gr.Textbox(label="Name")
out = gr.Textbox()
btn.click(fn=f, inputs=name, outputs=out)
"#;
        let schema = schema_of(source).unwrap();
        assert_eq!(schema.len(), 1);
        assert_eq!(schema[0].component_type, "Textbox");
        assert_eq!(schema[0].expected_datatype, "string");
        assert_eq!(schema[0].label, Some(ResolvedValue::text("Name")));
        assert_eq!(schema[0].value, None);
    }

    #[test]
    fn list_inputs_keep_their_order() {
        let source = r#"
a = gr.Slider(0, 10, value=3)
b = gr.Dropdown(choices=["x", "y"], visible=False)
btn.click(f, [a, gr.Image(), b], None)
"#;
        let schema = schema_of(source).unwrap();
        let types: Vec<&str> = schema.iter().map(|d| d.component_type.as_str()).collect();
        assert_eq!(types, vec!["Slider", "Image", "Dropdown"]);
        assert_eq!(
            schema[0].value,
            Some(ResolvedValue::Literal(Constant::Int(3)))
        );
        assert_eq!(
            schema[2].choices,
            Some(ResolvedValue::List(vec![
                ResolvedValue::text("x"),
                ResolvedValue::text("y"),
            ]))
        );
        assert_eq!(
            schema[2].visible,
            Some(ResolvedValue::Literal(Constant::Bool(false)))
        );
    }

    #[test]
    fn choices_only_for_choice_components() {
        let source = "btn.click(f, inputs=[gr.Textbox(choices=['a'])])\n";
        let schema = schema_of(source).unwrap();
        assert_eq!(schema[0].choices, None);
    }

    #[test]
    fn literal_shortcuts_and_unknown_components() {
        let source = "btn.submit(f, inputs=['text', gr.Gallery()])\n";
        let schema = schema_of(source).unwrap();
        assert_eq!(schema[0].component_type, "text");
        assert_eq!(schema[0].expected_datatype, "string");
        assert_eq!(schema[1].component_type, "Unknown");
        assert_eq!(schema[1].expected_datatype, UNKNOWN_DATATYPE);
    }

    #[test]
    fn missing_or_none_inputs_give_an_empty_schema() {
        assert!(schema_of("btn.click(f)\n").unwrap().is_empty());
        assert!(schema_of("btn.click(f, inputs=None)\n").unwrap().is_empty());
    }

    #[test]
    fn positional_inputs_only_for_fn_inputs_signatures() {
        let source = "tabs = gr.TabbedInterface([io1, io2], ['Text', 'Image'])\n";
        let tree = SearchableTree::parse(source).unwrap();
        let binding = tree
            .find_first_call_named(&pattern("Interface").unwrap())
            .and_then(Node::as_expr)
            .expect("binding present");
        let builder = SchemaBuilder::new(&tree);
        assert!(builder.build_schema(binding).unwrap().is_empty());

        let source = "demo = gr.Interface(f, ['text', gr.Image()], 'text')\n";
        let tree = SearchableTree::parse(source).unwrap();
        let binding = tree
            .find_first_call_named(&pattern("Interface").unwrap())
            .and_then(Node::as_expr)
            .expect("binding present");
        let builder = SchemaBuilder::new(&tree);
        assert_eq!(builder.build_schema(binding).unwrap().len(), 2);
    }

    #[test]
    fn unsupported_list_elements_are_errors() {
        let source = "btn.click(f, inputs=[a + b])\n";
        assert!(matches!(
            schema_of(source),
            Err(AnalyzerError::UnsupportedConstruct(_))
        ));
    }

    #[test]
    fn serialized_descriptor_omits_absent_arguments() {
        let mut descriptor = ComponentDescriptor::of_type("Number");
        descriptor.label = Some(ResolvedValue::text("Age"));
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "Number",
                "expected_datatype": "number",
                "label": "Age",
            })
        );
    }
}
