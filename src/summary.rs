//! The serializable JSON summary of an analysis.
//!
//! The walk is stable: namespaces nest by dotted name, then elements,
//! mixins, behaviors (under `metadata.polymer.behaviors`), classes, and
//! top-level functions, each sorted by identifier. Source ranges are
//! package-root-relative, except inherited members, whose file is made
//! relative to the referring element's directory.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::analyzer::Analysis;
use crate::features::{Attribute, Event, Method, Privacy, Property, Slot};
use crate::resolve::{Class, Function, Namespace};
use crate::source::SourceRange;

pub const SCHEMA_VERSION: &str = "1.0.0";

static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^1\.\d+\.\d+$").unwrap());

#[derive(Debug, Error)]
#[error("summary failed schema validation: {}", .errors.join("; "))]
pub struct ValidationError {
    pub errors: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct AnalysisSummary {
    pub schema_version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<SummaryClass>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mixins: Vec<SummaryClass>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<SummaryClass>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<SummaryFunction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<SummaryNamespace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Default, Serialize)]
pub struct SummaryNamespace {
    pub name: String,
    pub description: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<SummaryClass>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mixins: Vec<SummaryClass>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<SummaryClass>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<SummaryFunction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<SummaryNamespace>,
    #[serde(rename = "sourceRange", skip_serializing_if = "Option::is_none")]
    pub source_range: Option<SourceRange>,
}

#[derive(Debug, Default, Serialize)]
pub struct SummaryClass {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagname: Option<String>,
    pub description: String,
    pub summary: String,
    pub path: String,
    pub properties: Vec<SummaryProperty>,
    pub methods: Vec<SummaryMethod>,
    pub attributes: Vec<SummaryAttribute>,
    pub events: Vec<SummaryEvent>,
    #[serde(rename = "slots")]
    pub slots: Vec<SummarySlot>,
    pub demos: Vec<SummaryDemo>,
    pub styling: SummaryStyling,
    pub privacy: Privacy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mixins: Vec<String>,
    pub metadata: serde_json::Value,
    #[serde(rename = "sourceRange", skip_serializing_if = "Option::is_none")]
    pub source_range: Option<SourceRange>,
}

#[derive(Debug, Default, Serialize)]
pub struct SummaryStyling {
    #[serde(rename = "cssVariables")]
    pub css_variables: Vec<serde_json::Value>,
    pub selectors: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Serialize)]
pub struct SummaryProperty {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    pub description: String,
    pub privacy: Privacy,
    #[serde(rename = "defaultValue", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(rename = "inheritedFrom", skip_serializing_if = "Option::is_none")]
    pub inherited_from: Option<String>,
    pub metadata: serde_json::Value,
    #[serde(rename = "sourceRange", skip_serializing_if = "Option::is_none")]
    pub source_range: Option<SourceRange>,
}

#[derive(Debug, Default, Serialize)]
pub struct SummaryMethod {
    pub name: String,
    pub description: String,
    pub privacy: Privacy,
    pub params: Vec<SummaryParam>,
    #[serde(rename = "return", skip_serializing_if = "Option::is_none")]
    pub return_: Option<SummaryReturn>,
    #[serde(rename = "inheritedFrom", skip_serializing_if = "Option::is_none")]
    pub inherited_from: Option<String>,
    pub metadata: serde_json::Value,
    #[serde(rename = "sourceRange", skip_serializing_if = "Option::is_none")]
    pub source_range: Option<SourceRange>,
}

#[derive(Debug, Default, Serialize)]
pub struct SummaryParam {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct SummaryReturn {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct SummaryAttribute {
    pub name: String,
    pub description: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(rename = "inheritedFrom", skip_serializing_if = "Option::is_none")]
    pub inherited_from: Option<String>,
    #[serde(rename = "sourceRange", skip_serializing_if = "Option::is_none")]
    pub source_range: Option<SourceRange>,
}

#[derive(Debug, Default, Serialize)]
pub struct SummaryEvent {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(rename = "inheritedFrom", skip_serializing_if = "Option::is_none")]
    pub inherited_from: Option<String>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Default, Serialize)]
pub struct SummarySlot {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SummaryDemo {
    pub url: String,
    pub description: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SummaryFunction {
    pub name: String,
    pub description: String,
    pub privacy: Privacy,
    pub params: Vec<SummaryParam>,
    #[serde(rename = "return", skip_serializing_if = "Option::is_none")]
    pub return_: Option<SummaryReturn>,
    #[serde(rename = "sourceRange", skip_serializing_if = "Option::is_none")]
    pub source_range: Option<SourceRange>,
}

/// `target` relative to the directory `base_dir` (both package-relative).
fn relative_to(base_dir: &str, target: &str) -> String {
    let base: Vec<&str> = if base_dir.is_empty() {
        Vec::new()
    } else {
        base_dir.split('/').collect()
    };
    let parts: Vec<&str> = target.split('/').collect();
    let common = base
        .iter()
        .zip(parts.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut out: Vec<String> = Vec::new();
    for _ in common..base.len() {
        out.push("..".to_string());
    }
    for part in &parts[common..] {
        out.push((*part).to_string());
    }
    out.join("/")
}

fn member_range(range: &SourceRange, inherited: bool, owner_dir: &str) -> Option<SourceRange> {
    if range.file.is_empty() {
        return None;
    }
    let mut range = range.clone();
    if inherited {
        range.file = relative_to(owner_dir, &range.file);
    }
    Some(range)
}

fn property_to_summary(property: &Property, owner_dir: &str) -> SummaryProperty {
    let mut polymer = serde_json::Map::new();
    if property.notify {
        polymer.insert("notify".to_string(), json!(true));
    }
    if property.read_only {
        polymer.insert("readOnly".to_string(), json!(true));
    }
    if property.reflect_to_attribute {
        polymer.insert("reflectToAttribute".to_string(), json!(true));
    }
    if let Some(observer) = &property.observer {
        polymer.insert("observer".to_string(), json!(observer));
    }
    SummaryProperty {
        name: property.name.clone(),
        type_: property.type_.clone(),
        description: property.description.clone(),
        privacy: property.privacy,
        default_value: property.default.clone(),
        inherited_from: property.inherited_from.clone(),
        metadata: json!({ "polymer": polymer }),
        source_range: member_range(
            &property.range,
            property.inherited_from.is_some(),
            owner_dir,
        ),
    }
}

fn method_to_summary(method: &Method, owner_dir: &str) -> SummaryMethod {
    SummaryMethod {
        name: method.name.clone(),
        description: method.description.clone(),
        privacy: method.privacy,
        params: method
            .params
            .iter()
            .map(|param| SummaryParam {
                name: param.name.clone(),
                type_: param.type_.clone(),
                description: param.description.clone(),
            })
            .collect(),
        return_: method.return_.as_ref().map(|ret| SummaryReturn {
            type_: ret.type_.clone(),
            desc: ret.description.clone(),
        }),
        inherited_from: method.inherited_from.clone(),
        metadata: json!({}),
        source_range: member_range(&method.range, method.inherited_from.is_some(), owner_dir),
    }
}

fn attribute_to_summary(attribute: &Attribute, owner_dir: &str) -> SummaryAttribute {
    SummaryAttribute {
        name: attribute.name.clone(),
        description: attribute.description.clone(),
        type_: attribute.type_.clone(),
        inherited_from: attribute.inherited_from.clone(),
        source_range: member_range(
            &attribute.range,
            attribute.inherited_from.is_some(),
            owner_dir,
        ),
    }
}

fn event_to_summary(event: &Event) -> SummaryEvent {
    SummaryEvent {
        name: event.name.clone(),
        description: event.description.clone(),
        type_: "CustomEvent".to_string(),
        inherited_from: event.inherited_from.clone(),
        metadata: json!({}),
    }
}

fn slot_to_summary(slot: &Slot) -> SummarySlot {
    SummarySlot {
        name: slot.name.clone().unwrap_or_default(),
        description: String::new(),
    }
}

fn class_to_summary(class: &Class, tagname: Option<&str>, path: &str) -> SummaryClass {
    let owner_dir = match path.rfind('/') {
        Some(index) => &path[..index],
        None => "",
    };
    SummaryClass {
        name: class.fully_qualified_name.clone(),
        tagname: tagname.map(str::to_string),
        description: class.description.clone(),
        summary: class.summary.clone(),
        path: path.to_string(),
        properties: class
            .properties
            .iter()
            .map(|property| property_to_summary(property, owner_dir))
            .collect(),
        methods: class
            .methods
            .iter()
            .map(|method| method_to_summary(method, owner_dir))
            .collect(),
        attributes: class
            .attributes
            .iter()
            .map(|attribute| attribute_to_summary(attribute, owner_dir))
            .collect(),
        events: class.events.iter().map(event_to_summary).collect(),
        slots: class.slots.iter().map(slot_to_summary).collect(),
        demos: class
            .demos
            .iter()
            .map(|demo| SummaryDemo {
                url: demo.url.clone(),
                description: demo.description.clone(),
            })
            .collect(),
        styling: SummaryStyling::default(),
        privacy: class.privacy,
        superclass: class.superclass.clone(),
        mixins: class.mixins.clone(),
        metadata: if class.behaviors.is_empty() {
            json!({})
        } else {
            json!({ "polymer": { "behaviors": class.behaviors } })
        },
        source_range: Some(class.range.clone()),
    }
}

fn function_to_summary(function: &Function) -> SummaryFunction {
    SummaryFunction {
        name: function.name.clone(),
        description: function.description.clone(),
        privacy: function.privacy,
        params: function
            .params
            .iter()
            .map(|param| SummaryParam {
                name: param.name.clone(),
                type_: param.type_.clone(),
                description: param.description.clone(),
            })
            .collect(),
        return_: function.return_.as_ref().map(|ret| SummaryReturn {
            type_: ret.type_.clone(),
            desc: ret.description.clone(),
        }),
        source_range: Some(function.range.clone()),
    }
}

/// A namespace tree under construction, flattened into `SummaryNamespace`
/// at the end.
#[derive(Default)]
struct NamespaceNode {
    namespace: SummaryNamespace,
    children: Vec<NamespaceNode>,
}

impl NamespaceNode {
    fn child_index(&self, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|child| child.namespace.name == name)
    }

    /// The deepest node whose dotted name prefixes `fqn`; `self` if none.
    fn owner_of(&mut self, fqn: &str) -> &mut NamespaceNode {
        let Some((head, rest)) = fqn.split_once('.') else {
            return self;
        };
        match self.child_index(head) {
            Some(index) => self.children[index].owner_of(rest),
            None => self,
        }
    }

    fn ensure(&mut self, dotted: &str) -> &mut NamespaceNode {
        let (head, rest) = match dotted.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (dotted, None),
        };
        let index = match self.child_index(head) {
            Some(index) => index,
            None => {
                self.children.push(NamespaceNode {
                    namespace: SummaryNamespace {
                        name: head.to_string(),
                        ..SummaryNamespace::default()
                    },
                    children: Vec::new(),
                });
                self.children.len() - 1
            }
        };
        let child = &mut self.children[index];
        match rest {
            Some(rest) => child.ensure(rest),
            None => child,
        }
    }

    fn into_namespace(self) -> SummaryNamespace {
        let mut namespace = self.namespace;
        namespace.namespaces = self
            .children
            .into_iter()
            .map(NamespaceNode::into_namespace)
            .collect();
        namespace.namespaces.sort_by(|a, b| a.name.cmp(&b.name));
        namespace
    }
}

/// Emits the schema-validated JSON summary of an analysis.
pub fn emit(analysis: &Analysis) -> Result<AnalysisSummary, ValidationError> {
    let mut root = NamespaceNode::default();
    let mut behaviors: Vec<SummaryClass> = Vec::new();
    let mut seen: rustc_hash::FxHashSet<String> = rustc_hash::FxHashSet::default();

    for document in analysis.documents() {
        if document.url.is_external() || document.scanned.is_inline {
            continue;
        }
        let path = document.url.to_string();

        for namespace in document.namespaces() {
            if !seen.insert(format!("namespace:{}", namespace.name)) {
                continue;
            }
            let node = root.ensure(&namespace.name);
            node.namespace.description = namespace.description.clone();
            node.namespace.summary = namespace.summary.clone();
            node.namespace.source_range = Some(namespace.range.clone());
        }

        for element in document.elements() {
            let identity = element
                .tag_name
                .clone()
                .or_else(|| element.class.fully_qualified_name.clone())
                .unwrap_or_else(|| path.clone());
            if !seen.insert(format!("element:{identity}")) {
                continue;
            }
            let summary = class_to_summary(&element.class, element.tag_name.as_deref(), &path);
            let owner = match &element.class.fully_qualified_name {
                Some(fqn) => root.owner_of(fqn),
                None => &mut root,
            };
            owner.namespace.elements.push(summary);
        }

        for mixin in document.mixins() {
            let Some(fqn) = mixin.class.fully_qualified_name.clone() else {
                continue;
            };
            if !seen.insert(format!("mixin:{fqn}")) {
                continue;
            }
            let summary = class_to_summary(&mixin.class, None, &path);
            root.owner_of(&fqn).namespace.mixins.push(summary);
        }

        for behavior in document.behaviors() {
            let Some(fqn) = behavior.class.fully_qualified_name.clone() else {
                continue;
            };
            if !seen.insert(format!("behavior:{fqn}")) {
                continue;
            }
            behaviors.push(class_to_summary(&behavior.class, None, &path));
        }

        for class in document.classes() {
            let Some(fqn) = class.fully_qualified_name.clone() else {
                continue;
            };
            if !seen.insert(format!("class:{fqn}")) {
                continue;
            }
            let summary = class_to_summary(class, None, &path);
            root.owner_of(&fqn).namespace.classes.push(summary);
        }

        for function in document.functions() {
            if !seen.insert(format!("function:{}", function.name)) {
                continue;
            }
            let summary = function_to_summary(function);
            root.owner_of(&function.name).namespace.functions.push(summary);
        }
    }

    let mut flattened = root.into_namespace();
    sort_namespace(&mut flattened);
    behaviors.sort_by(|a, b| a.name.cmp(&b.name));

    let summary = AnalysisSummary {
        schema_version: SCHEMA_VERSION.to_string(),
        elements: flattened.elements,
        mixins: flattened.mixins,
        classes: flattened.classes,
        functions: flattened.functions,
        namespaces: flattened.namespaces,
        metadata: if behaviors.is_empty() {
            None
        } else {
            Some(json!({
                "polymer": {
                    "behaviors": serde_json::to_value(&behaviors).unwrap_or_default(),
                }
            }))
        },
    };

    validate(&summary)?;
    Ok(summary)
}

fn sort_namespace(namespace: &mut SummaryNamespace) {
    namespace.elements.sort_by(|a, b| a.tagname.cmp(&b.tagname));
    namespace.mixins.sort_by(|a, b| a.name.cmp(&b.name));
    namespace.classes.sort_by(|a, b| a.name.cmp(&b.name));
    namespace.functions.sort_by(|a, b| a.name.cmp(&b.name));
    for child in &mut namespace.namespaces {
        sort_namespace(child);
    }
}

/// Structural validation of an emitted summary. Reports every mismatch at
/// once rather than stopping at the first.
pub fn validate(summary: &AnalysisSummary) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    if !VERSION_PATTERN.is_match(&summary.schema_version) {
        errors.push(format!(
            "schema_version `{}` does not match 1.x.x",
            summary.schema_version
        ));
    }
    validate_classes(&summary.elements, "elements", &mut errors);
    validate_classes(&summary.mixins, "mixins", &mut errors);
    validate_classes(&summary.classes, "classes", &mut errors);
    for namespace in &summary.namespaces {
        validate_namespace(namespace, &mut errors);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { errors })
    }
}

fn validate_namespace(namespace: &SummaryNamespace, errors: &mut Vec<String>) {
    if namespace.name.is_empty() {
        errors.push("namespace with an empty name".to_string());
    }
    validate_classes(
        &namespace.elements,
        &format!("namespace `{}` elements", namespace.name),
        errors,
    );
    validate_classes(
        &namespace.mixins,
        &format!("namespace `{}` mixins", namespace.name),
        errors,
    );
    validate_classes(
        &namespace.classes,
        &format!("namespace `{}` classes", namespace.name),
        errors,
    );
    for child in &namespace.namespaces {
        validate_namespace(child, errors);
    }
}

fn validate_classes(classes: &[SummaryClass], context: &str, errors: &mut Vec<String>) {
    for class in classes {
        let label = class
            .tagname
            .clone()
            .or_else(|| class.name.clone())
            .unwrap_or_else(|| "<anonymous>".to_string());
        if class.tagname.is_none() && class.name.is_none() {
            errors.push(format!("{context}: entry with neither tagname nor name"));
        }
        if class.path.is_empty() {
            errors.push(format!("{context}: `{label}` has an empty path"));
        }
        if let Some(range) = &class.source_range {
            if range.end < range.start {
                errors.push(format!("{context}: `{label}` has an inverted sourceRange"));
            }
        }
        for attribute in &class.attributes {
            if attribute.name.chars().any(|ch| ch.is_ascii_uppercase()) {
                errors.push(format!(
                    "{context}: `{label}` attribute `{}` is not lower-case",
                    attribute.name
                ));
            }
        }
        for property in &class.properties {
            if property.name.is_empty() {
                errors.push(format!("{context}: `{label}` has a property with no name"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{relative_to, validate, AnalysisSummary, SummaryAttribute, SummaryClass};

    #[test]
    fn relative_paths_step_out_of_the_base_directory() {
        assert_eq!(relative_to("a/b", "a/c/d.js"), "../c/d.js");
        assert_eq!(relative_to("a", "a/x.js"), "x.js");
        assert_eq!(relative_to("", "x.js"), "x.js");
        assert_eq!(relative_to("a/b", "lib.js"), "../../lib.js");
    }

    #[test]
    fn validation_enumerates_every_mismatch() {
        let summary = AnalysisSummary {
            schema_version: "2.0.0".to_string(),
            elements: vec![SummaryClass {
                tagname: Some("x-bad".to_string()),
                path: String::new(),
                attributes: vec![SummaryAttribute {
                    name: "notLower".to_string(),
                    ..SummaryAttribute::default()
                }],
                ..SummaryClass::default()
            }],
            ..AnalysisSummary::default()
        };
        let error = validate(&summary).unwrap_err();
        assert_eq!(error.errors.len(), 3);
        assert!(error.errors[0].contains("schema_version"));
        assert!(error.errors.iter().any(|e| e.contains("empty path")));
        assert!(error.errors.iter().any(|e| e.contains("not lower-case")));
    }

    #[test]
    fn valid_summary_passes() {
        let summary = AnalysisSummary {
            schema_version: super::SCHEMA_VERSION.to_string(),
            ..AnalysisSummary::default()
        };
        assert!(validate(&summary).is_ok());
    }
}
