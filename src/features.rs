//! The scanned-feature model.
//!
//! Scanners classify AST fragments into these types. They are deliberately
//! lightweight: cross-document references are plain names with ranges, and
//! nothing here knows about other documents. Resolution (see
//! [`crate::resolve`]) lifts them into features with inheritance flattened.

use serde::{Deserialize, Serialize};

use crate::jsdoc::Annotation;
use crate::parse::DocumentType;
use crate::scan::ScannedDocument;
use crate::source::{LocationOffset, SourceRange};
use crate::urls::PackageUrl;
use crate::warning::Warning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Import,
    InlineDocument,
    Class,
    Function,
    Namespace,
    Element,
    ElementMixin,
    Behavior,
    ElementReference,
    Attribute,
    Event,
    Property,
    Method,
    Slot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Public,
    Protected,
    Private,
}

impl Privacy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Protected => "protected",
            Privacy::Private => "private",
        }
    }
}

/// Privacy of a named member: explicit JSDoc wins, then the underscore
/// convention, then the caller-supplied default.
pub fn infer_privacy(name: &str, annotation: Option<&Annotation>, default_private: bool) -> Privacy {
    if let Some(annotation) = annotation {
        if annotation.has_tag("public") {
            return Privacy::Public;
        }
        if annotation.has_tag("private") {
            return Privacy::Private;
        }
        if annotation.has_tag("protected") {
            return Privacy::Protected;
        }
    }
    if name.starts_with("__") {
        Privacy::Private
    } else if name.starts_with('_') {
        Privacy::Protected
    } else if default_private {
        Privacy::Private
    } else {
        Privacy::Public
    }
}

/// Maps a property name to its attribute form: `fooBar` → `foo-bar`.
///
/// Names starting with an upper-case letter have no attribute form.
pub fn attribute_for_property(name: &str) -> Option<String> {
    if name.chars().next().is_some_and(char::is_uppercase) {
        return None;
    }
    let mut attribute = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_uppercase() {
            attribute.push('-');
            attribute.extend(ch.to_lowercase());
        } else {
            attribute.push(ch);
        }
    }
    Some(attribute)
}

/// The inverse conversion: `foo-bar` → `fooBar`.
pub fn property_for_attribute(name: &str) -> String {
    let mut property = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next {
            property.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            property.push(ch);
        }
    }
    property
}

// ---------------------------------------------------------------------------
// Members

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Property {
    pub name: String,
    pub type_: Option<String>,
    pub description: String,
    pub privacy: Privacy,
    pub default: Option<String>,
    /// Declared in the element's published-properties block (as opposed to
    /// discovered on the prototype).
    pub published: bool,
    pub notify: bool,
    pub read_only: bool,
    pub reflect_to_attribute: bool,
    pub observer: Option<String>,
    pub range: SourceRange,
    pub inherited_from: Option<String>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodParam {
    pub name: String,
    pub type_: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodReturn {
    pub type_: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Method {
    pub name: String,
    pub description: String,
    pub privacy: Privacy,
    pub params: Vec<MethodParam>,
    pub return_: Option<MethodReturn>,
    pub range: SourceRange,
    pub inherited_from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attribute {
    pub name: String,
    pub description: String,
    pub type_: Option<String>,
    pub range: SourceRange,
    pub inherited_from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Event {
    pub name: String,
    pub description: String,
    pub range: SourceRange,
    pub inherited_from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Slot {
    /// `None` for the unnamed default slot.
    pub name: Option<String>,
    /// The `dom-module` id the slot's template belongs to, when known.
    pub module: Option<String>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Demo {
    pub url: String,
    pub description: String,
}

/// A by-name reference to another class-like feature.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reference {
    pub name: String,
    pub range: SourceRange,
}

// ---------------------------------------------------------------------------
// Class-like features

/// The shared body of classes, elements, mixins, and behaviors.
#[derive(Debug, Clone, Default)]
pub struct ScannedClassLike {
    /// The binding name as written; may be dotted (`Ns.Inner`).
    pub name: Option<String>,
    /// Owning namespace from `@memberof`.
    pub namespace: Option<String>,
    pub description: String,
    pub summary: String,
    pub privacy: Privacy,
    pub properties: Vec<Property>,
    pub methods: Vec<Method>,
    pub static_methods: Vec<Method>,
    pub superclass: Option<Reference>,
    pub mixins: Vec<Reference>,
    pub events: Vec<Event>,
    pub demos: Vec<Demo>,
    pub range: SourceRange,
    pub warnings: Vec<Warning>,
}

impl ScannedClassLike {
    /// `Namespace.LocalName` when a `@memberof` namespace applies, the raw
    /// (possibly dotted) binding name otherwise.
    pub fn fully_qualified_name(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        match self.namespace.as_deref() {
            Some(namespace) => {
                let local = name.rsplit('.').next().unwrap_or(name);
                Some(format!("{namespace}.{local}"))
            }
            None => Some(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScannedClass {
    pub class: ScannedClassLike,
}

#[derive(Debug, Clone, Default)]
pub struct ScannedElement {
    pub class: ScannedClassLike,
    pub tag_name: Option<String>,
    pub behaviors: Vec<Reference>,
    /// Attributes declared via `static get observedAttributes()`.
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Default)]
pub struct ScannedMixin {
    pub class: ScannedClassLike,
}

#[derive(Debug, Clone, Default)]
pub struct ScannedBehavior {
    pub class: ScannedClassLike,
    /// Behaviors this behavior chains in, either via a `behaviors` property
    /// or by being declared as an array of references.
    pub behaviors: Vec<Reference>,
}

// ---------------------------------------------------------------------------
// Other features

#[derive(Debug, Clone, Default)]
pub struct ScannedFunction {
    pub name: String,
    pub namespace: Option<String>,
    pub description: String,
    pub privacy: Privacy,
    pub params: Vec<MethodParam>,
    pub return_: Option<MethodReturn>,
    pub range: SourceRange,
    pub warnings: Vec<Warning>,
}

impl ScannedFunction {
    pub fn fully_qualified_name(&self) -> String {
        match self.namespace.as_deref() {
            Some(namespace) => format!("{namespace}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScannedNamespace {
    pub name: String,
    pub description: String,
    pub summary: String,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// `<link rel="import" href="...">`
    HtmlImport,
    /// `<script src="...">`
    HtmlScript,
    /// `<link rel="stylesheet" href="...">`
    HtmlStyle,
}

#[derive(Debug, Clone)]
pub struct ScannedImport {
    pub kind: ImportKind,
    /// The href exactly as written.
    pub href: String,
    /// The canonical target, when the resolver accepted the href.
    pub url: Option<PackageUrl>,
    pub range: SourceRange,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone)]
pub struct ScannedInlineDocument {
    pub document_type: DocumentType,
    pub contents: String,
    pub offset: LocationOffset,
    pub range: SourceRange,
    /// Attached by the scan driver after recursively parsing and scanning
    /// the inline contents.
    pub document: Option<Box<ScannedDocument>>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributeUse {
    pub name: String,
    pub value: Option<String>,
    pub range: SourceRange,
}

/// A *use* of a custom element in markup (any hyphenated tag that is not
/// the element-module wrapper).
#[derive(Debug, Clone, Default)]
pub struct ScannedElementReference {
    pub tag_name: String,
    pub attributes: Vec<AttributeUse>,
    pub range: SourceRange,
}

// ---------------------------------------------------------------------------
// The sum

#[derive(Debug, Clone)]
pub enum ScannedFeature {
    Import(ScannedImport),
    InlineDocument(ScannedInlineDocument),
    Class(ScannedClass),
    Element(ScannedElement),
    ElementMixin(ScannedMixin),
    Behavior(ScannedBehavior),
    Function(ScannedFunction),
    Namespace(ScannedNamespace),
    ElementReference(ScannedElementReference),
    Property(Property),
    Method(Method),
    Attribute(Attribute),
    Event(Event),
    Slot(Slot),
}

impl ScannedFeature {
    pub fn kind(&self) -> FeatureKind {
        match self {
            ScannedFeature::Import(_) => FeatureKind::Import,
            ScannedFeature::InlineDocument(_) => FeatureKind::InlineDocument,
            ScannedFeature::Class(_) => FeatureKind::Class,
            ScannedFeature::Element(_) => FeatureKind::Element,
            ScannedFeature::ElementMixin(_) => FeatureKind::ElementMixin,
            ScannedFeature::Behavior(_) => FeatureKind::Behavior,
            ScannedFeature::Function(_) => FeatureKind::Function,
            ScannedFeature::Namespace(_) => FeatureKind::Namespace,
            ScannedFeature::ElementReference(_) => FeatureKind::ElementReference,
            ScannedFeature::Property(_) => FeatureKind::Property,
            ScannedFeature::Method(_) => FeatureKind::Method,
            ScannedFeature::Attribute(_) => FeatureKind::Attribute,
            ScannedFeature::Event(_) => FeatureKind::Event,
            ScannedFeature::Slot(_) => FeatureKind::Slot,
        }
    }

    pub fn range(&self) -> &SourceRange {
        match self {
            ScannedFeature::Import(f) => &f.range,
            ScannedFeature::InlineDocument(f) => &f.range,
            ScannedFeature::Class(f) => &f.class.range,
            ScannedFeature::Element(f) => &f.class.range,
            ScannedFeature::ElementMixin(f) => &f.class.range,
            ScannedFeature::Behavior(f) => &f.class.range,
            ScannedFeature::Function(f) => &f.range,
            ScannedFeature::Namespace(f) => &f.range,
            ScannedFeature::ElementReference(f) => &f.range,
            ScannedFeature::Property(f) => &f.range,
            ScannedFeature::Method(f) => &f.range,
            ScannedFeature::Attribute(f) => &f.range,
            ScannedFeature::Event(f) => &f.range,
            ScannedFeature::Slot(f) => &f.range,
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        match self {
            ScannedFeature::Import(f) => &f.warnings,
            ScannedFeature::InlineDocument(f) => &f.warnings,
            ScannedFeature::Class(f) => &f.class.warnings,
            ScannedFeature::Element(f) => &f.class.warnings,
            ScannedFeature::ElementMixin(f) => &f.class.warnings,
            ScannedFeature::Behavior(f) => &f.class.warnings,
            ScannedFeature::Function(f) => &f.warnings,
            ScannedFeature::Property(f) => &f.warnings,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::{attribute_for_property, infer_privacy, property_for_attribute, Privacy};
    use crate::jsdoc::Annotation;

    #[test_case("plain", Privacy::Public; "plain name is public")]
    #[test_case("_guarded", Privacy::Protected; "single underscore is protected")]
    #[test_case("__hidden", Privacy::Private; "double underscore is private")]
    fn underscore_convention(name: &str, expected: Privacy) {
        assert_eq!(infer_privacy(name, None, false), expected);
    }

    #[test]
    fn explicit_annotation_wins_over_convention() {
        let public = Annotation::parse("/** @public */");
        assert_eq!(infer_privacy("__hidden", Some(&public), true), Privacy::Public);
        let private = Annotation::parse("/** @private */");
        assert_eq!(infer_privacy("plain", Some(&private), false), Privacy::Private);
    }

    #[test]
    fn default_private_applies_only_without_other_signals() {
        assert_eq!(infer_privacy("plain", None, true), Privacy::Private);
        assert_eq!(infer_privacy("_guarded", None, true), Privacy::Protected);
    }

    #[test_case("fooBar", Some("foo-bar"))]
    #[test_case("foo", Some("foo"))]
    #[test_case("aBC", Some("a-b-c"))]
    #[test_case("UpperFirst", None)]
    fn property_to_attribute(name: &str, expected: Option<&str>) {
        assert_eq!(attribute_for_property(name).as_deref(), expected);
    }

    #[test_case("fooBar")]
    #[test_case("deeplyInheritedProperty")]
    #[test_case("a")]
    fn attribute_conversion_round_trips(name: &str) {
        let attribute = attribute_for_property(name).unwrap();
        assert_eq!(property_for_attribute(&attribute), name);
    }
}
