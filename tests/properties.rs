use hfspaces::analyzer::ComponentType;
use hfspaces::space::endpoint_url;
use hfspaces::{ApplicationModel, Settings};
use proptest::prelude::*;

fn arb_component() -> impl Strategy<Value = ComponentType> {
    prop::sample::select(ComponentType::ALL.to_vec())
}

fn arb_label() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{0,12}"
}

proptest! {
    #[test]
    fn interface_schema_has_one_slot_per_input(
        inputs in prop::collection::vec((arb_component(), arb_label()), 0..8)
    ) {
        let elements: Vec<String> = inputs
            .iter()
            .map(|(component, label)| format!("gr.{}(label={label:?})", component.name()))
            .collect();
        let source = format!(
            "import gradio as gr\n\ndemo = gr.Interface(fn=run, inputs=[{}], outputs=\"text\")\ndemo.launch()\n",
            elements.join(", ")
        );

        let model = ApplicationModel::from_source("o", "a", &source, &Settings::builtin()).unwrap();
        prop_assert_eq!(model.schemas().len(), 1);
        let schema = &model.schemas()[0];
        prop_assert_eq!(schema.inputs.len(), inputs.len());
        for ((component, label), descriptor) in inputs.iter().zip(&schema.inputs) {
            prop_assert_eq!(descriptor.component_type.as_str(), component.name());
            prop_assert_eq!(descriptor.expected_datatype.as_str(), component.expected_datatype());
            prop_assert_eq!(
                descriptor.label.as_ref().and_then(|value| value.as_str()),
                Some(label.as_str())
            );
        }
    }

    #[test]
    fn endpoint_hosts_never_contain_underscores(
        owner in "[a-z_][a-z0-9_]{0,15}",
        application in "[a-z_][a-z0-9_]{0,15}",
    ) {
        let endpoint = endpoint_url(&owner, &application, "hf.space");
        let host = endpoint
            .strip_prefix("wss://")
            .and_then(|rest| rest.strip_suffix(".hf.space/queue/join"))
            .unwrap();
        prop_assert!(!host.contains('_'));
        prop_assert_eq!(host.len(), owner.len() + application.len() + 1);
    }
}
