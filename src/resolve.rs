//! Resolution: lifting scanned features into features with cross-document
//! references materialized.
//!
//! A class-like feature's prototype chain is the ordered sequence
//! `[self, superclass?, ...mixins, ...behaviors]`. Flattening appends each
//! ancestor's members to the child, tagging them with the ancestor that
//! defined them; a child's own member shadows a same-named ancestor member.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::context::AnalysisContext;
use crate::features::{
    attribute_for_property, Attribute, Demo, Event, FeatureKind, ImportKind, Method, MethodParam,
    MethodReturn, Privacy, Property, Reference, ScannedBehavior, ScannedClass, ScannedClassLike,
    ScannedElement, ScannedElementReference, ScannedFeature, ScannedMixin, Slot,
};
use crate::parse::DocumentType;
use crate::scan::ScannedDocument;
use crate::source::SourceRange;
use crate::urls::PackageUrl;
use crate::warning::{Warning, WarningCode};

/// A class-like feature with its inheritance flattened.
#[derive(Debug, Clone, Default)]
pub struct Class {
    pub name: Option<String>,
    pub fully_qualified_name: Option<String>,
    pub description: String,
    pub summary: String,
    pub privacy: Privacy,
    /// Own and inherited properties; inherited ones carry `inherited_from`.
    pub properties: Vec<Property>,
    pub methods: Vec<Method>,
    pub static_methods: Vec<Method>,
    /// Derived from published public properties, plus any observed
    /// attributes declared by the element itself.
    pub attributes: Vec<Attribute>,
    pub events: Vec<Event>,
    pub slots: Vec<Slot>,
    pub superclass: Option<String>,
    pub mixins: Vec<String>,
    pub behaviors: Vec<String>,
    pub demos: Vec<Demo>,
    pub range: SourceRange,
    pub warnings: Vec<Warning>,
}

impl Class {
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|property| property.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|method| method.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub tag_name: Option<String>,
    pub class: Class,
}

#[derive(Debug, Clone)]
pub struct ElementMixin {
    pub class: Class,
}

#[derive(Debug, Clone)]
pub struct Behavior {
    pub class: Class,
}

#[derive(Debug, Clone)]
pub struct Function {
    /// Fully qualified (`Namespace.name`) where a namespace applies.
    pub name: String,
    pub description: String,
    pub privacy: Privacy,
    pub params: Vec<MethodParam>,
    pub return_: Option<MethodReturn>,
    pub range: SourceRange,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone)]
pub struct Namespace {
    pub name: String,
    pub description: String,
    pub summary: String,
    pub range: SourceRange,
}

#[derive(Debug, Clone)]
pub struct ResolvedImport {
    pub kind: ImportKind,
    pub href: String,
    pub url: Option<PackageUrl>,
    pub range: SourceRange,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone)]
pub struct InlineDocument {
    pub document_type: DocumentType,
    pub range: SourceRange,
}

/// A resolved feature. Payloads are shared: cloning a `Feature` is cheap
/// and feature identity is `Arc` identity.
#[derive(Debug, Clone)]
pub enum Feature {
    Import(Arc<ResolvedImport>),
    InlineDocument(Arc<InlineDocument>),
    Class(Arc<Class>),
    Element(Arc<Element>),
    ElementMixin(Arc<ElementMixin>),
    Behavior(Arc<Behavior>),
    Function(Arc<Function>),
    Namespace(Arc<Namespace>),
    ElementReference(Arc<ScannedElementReference>),
    Property(Arc<Property>),
    Method(Arc<Method>),
    Attribute(Arc<Attribute>),
    Event(Arc<Event>),
    Slot(Arc<Slot>),
}

impl Feature {
    pub fn kind(&self) -> FeatureKind {
        match self {
            Feature::Import(_) => FeatureKind::Import,
            Feature::InlineDocument(_) => FeatureKind::InlineDocument,
            Feature::Class(_) => FeatureKind::Class,
            Feature::Element(_) => FeatureKind::Element,
            Feature::ElementMixin(_) => FeatureKind::ElementMixin,
            Feature::Behavior(_) => FeatureKind::Behavior,
            Feature::Function(_) => FeatureKind::Function,
            Feature::Namespace(_) => FeatureKind::Namespace,
            Feature::ElementReference(_) => FeatureKind::ElementReference,
            Feature::Property(_) => FeatureKind::Property,
            Feature::Method(_) => FeatureKind::Method,
            Feature::Attribute(_) => FeatureKind::Attribute,
            Feature::Event(_) => FeatureKind::Event,
            Feature::Slot(_) => FeatureKind::Slot,
        }
    }

    /// The identifier used by feature queries.
    pub fn identifier(&self) -> Option<String> {
        match self {
            Feature::Element(element) => element
                .tag_name
                .clone()
                .or_else(|| element.class.fully_qualified_name.clone()),
            Feature::Class(class) => class.fully_qualified_name.clone(),
            Feature::ElementMixin(mixin) => mixin.class.fully_qualified_name.clone(),
            Feature::Behavior(behavior) => behavior.class.fully_qualified_name.clone(),
            Feature::Function(function) => Some(function.name.clone()),
            Feature::Namespace(namespace) => Some(namespace.name.clone()),
            Feature::ElementReference(reference) => Some(reference.tag_name.clone()),
            Feature::Property(property) => Some(property.name.clone()),
            Feature::Method(method) => Some(method.name.clone()),
            Feature::Attribute(attribute) => Some(attribute.name.clone()),
            Feature::Event(event) => Some(event.name.clone()),
            Feature::Slot(slot) => slot.name.clone(),
            Feature::Import(import) => import.url.as_ref().map(|url| url.to_string()),
            Feature::InlineDocument(_) => None,
        }
    }

    pub fn warnings(&self) -> Vec<Warning> {
        match self {
            Feature::Import(import) => import.warnings.clone(),
            Feature::Class(class) => class.warnings.clone(),
            Feature::Element(element) => element.class.warnings.clone(),
            Feature::ElementMixin(mixin) => mixin.class.warnings.clone(),
            Feature::Behavior(behavior) => behavior.class.warnings.clone(),
            Feature::Function(function) => function.warnings.clone(),
            Feature::Property(property) => property.warnings.clone(),
            _ => Vec::new(),
        }
    }
}

/// A resolved document: scanned features lifted, grouped by kind, created
/// exactly once per (snapshot, URL).
#[derive(Debug)]
pub struct Document {
    pub url: PackageUrl,
    pub scanned: Arc<ScannedDocument>,
    /// Resolved features in scan order.
    pub features: Vec<Feature>,
    pub imports: Vec<Arc<ResolvedImport>>,
    pub warnings: Vec<Warning>,
    by_kind: FxHashMap<FeatureKind, Vec<Feature>>,
}

impl Document {
    pub fn features_of_kind(&self, kind: FeatureKind) -> &[Feature] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn elements(&self) -> impl Iterator<Item = &Arc<Element>> {
        self.features.iter().filter_map(|feature| match feature {
            Feature::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn mixins(&self) -> impl Iterator<Item = &Arc<ElementMixin>> {
        self.features.iter().filter_map(|feature| match feature {
            Feature::ElementMixin(mixin) => Some(mixin),
            _ => None,
        })
    }

    pub fn behaviors(&self) -> impl Iterator<Item = &Arc<Behavior>> {
        self.features.iter().filter_map(|feature| match feature {
            Feature::Behavior(behavior) => Some(behavior),
            _ => None,
        })
    }

    pub fn classes(&self) -> impl Iterator<Item = &Arc<Class>> {
        self.features.iter().filter_map(|feature| match feature {
            Feature::Class(class) => Some(class),
            _ => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &Arc<Function>> {
        self.features.iter().filter_map(|feature| match feature {
            Feature::Function(function) => Some(function),
            _ => None,
        })
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &Arc<Namespace>> {
        self.features.iter().filter_map(|feature| match feature {
            Feature::Namespace(namespace) => Some(namespace),
            _ => None,
        })
    }

    /// Document warnings plus every feature's warnings.
    pub fn all_warnings(&self) -> Vec<Warning> {
        let mut out = self.warnings.clone();
        for feature in &self.features {
            out.extend(feature.warnings());
        }
        out
    }
}

// ---------------------------------------------------------------------------
// The feature index: class-likes visible from a document

#[derive(Clone, Copy)]
enum ClassLikeRef<'a> {
    Element(&'a ScannedElement),
    Mixin(&'a ScannedMixin),
    Behavior(&'a ScannedBehavior),
    Class(&'a ScannedClass),
}

struct FeatureIndex<'a> {
    class_likes: FxHashMap<String, ClassLikeRef<'a>>,
    slots_by_module: FxHashMap<String, Vec<Slot>>,
}

impl<'a> FeatureIndex<'a> {
    fn build(documents: &[&'a ScannedDocument]) -> FeatureIndex<'a> {
        let mut index = FeatureIndex {
            class_likes: FxHashMap::default(),
            slots_by_module: FxHashMap::default(),
        };
        for document in documents {
            for feature in document.all_features() {
                match feature {
                    ScannedFeature::Element(element) => {
                        index.insert_class_like(&element.class, ClassLikeRef::Element(element));
                    }
                    ScannedFeature::ElementMixin(mixin) => {
                        index.insert_class_like(&mixin.class, ClassLikeRef::Mixin(mixin));
                    }
                    ScannedFeature::Behavior(behavior) => {
                        index.insert_class_like(&behavior.class, ClassLikeRef::Behavior(behavior));
                    }
                    ScannedFeature::Class(class) => {
                        index.insert_class_like(&class.class, ClassLikeRef::Class(class));
                    }
                    ScannedFeature::Slot(slot) => {
                        if let Some(module) = &slot.module {
                            index
                                .slots_by_module
                                .entry(module.clone())
                                .or_default()
                                .push(slot.clone());
                        }
                    }
                    _ => {}
                }
            }
        }
        index
    }

    /// Indexes under both the raw binding name and the fully qualified
    /// name. Earlier documents win, so local declarations shadow imports.
    fn insert_class_like(&mut self, class_like: &'a ScannedClassLike, entry: ClassLikeRef<'a>) {
        let mut keys: Vec<String> = Vec::new();
        if let Some(name) = &class_like.name {
            keys.push(name.clone());
        }
        if let Some(fqn) = class_like.fully_qualified_name() {
            if !keys.contains(&fqn) {
                keys.push(fqn);
            }
        }
        for key in keys {
            self.class_likes.entry(key).or_insert(entry);
        }
    }

    fn lookup(&self, name: &str) -> Option<&ClassLikeRef<'a>> {
        self.class_likes.get(name)
    }

    fn slots_for(&self, module: &str) -> Vec<Slot> {
        self.slots_by_module.get(module).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Flattening

struct FeatureResolver<'a> {
    index: &'a FeatureIndex<'a>,
    memo: FxHashMap<String, Arc<Class>>,
    in_progress: FxHashSet<String>,
}

impl<'a> FeatureResolver<'a> {
    fn new(index: &'a FeatureIndex<'a>) -> Self {
        Self {
            index,
            memo: FxHashMap::default(),
            in_progress: FxHashSet::default(),
        }
    }

    fn flatten(&mut self, scanned: &ScannedClassLike, behaviors: &[Reference]) -> Class {
        let mut guards: Vec<String> = Vec::new();
        if let Some(name) = &scanned.name {
            if self.in_progress.insert(name.clone()) {
                guards.push(name.clone());
            }
        }
        if let Some(fqn) = scanned.fully_qualified_name() {
            if self.in_progress.insert(fqn.clone()) {
                guards.push(fqn);
            }
        }

        let mut class = own_class(scanned);
        class.behaviors = behaviors.iter().map(|reference| reference.name.clone()).collect();

        let chain: Vec<&Reference> = scanned
            .superclass
            .iter()
            .chain(scanned.mixins.iter())
            .chain(behaviors.iter())
            .collect();
        for reference in chain {
            match self.resolve_reference(reference) {
                Ok(ancestor) => inherit(&mut class, &ancestor),
                Err(warning) => class.warnings.push(warning),
            }
        }

        for guard in guards {
            self.in_progress.remove(&guard);
        }

        finalize(&mut class);
        class
    }

    fn resolve_reference(&mut self, reference: &Reference) -> Result<Arc<Class>, Warning> {
        let key = reference.name.as_str();
        if let Some(done) = self.memo.get(key) {
            return Ok(done.clone());
        }
        if self.in_progress.contains(key) {
            return Err(Warning::warning(
                WarningCode::CyclicInheritance,
                format!("`{key}` participates in its own prototype chain"),
                reference.range.clone(),
            ));
        }
        let Some(entry) = self.index.lookup(key) else {
            return Err(Warning::warning(
                WarningCode::CouldNotResolveReference,
                format!("could not resolve reference `{key}`"),
                reference.range.clone(),
            ));
        };
        let class = match entry {
            ClassLikeRef::Element(element) => {
                let behaviors = element.behaviors.clone();
                self.flatten(&element.class, &behaviors)
            }
            ClassLikeRef::Mixin(mixin) => self.flatten(&mixin.class, &[]),
            ClassLikeRef::Behavior(behavior) => {
                let chained = behavior.behaviors.clone();
                self.flatten(&behavior.class, &chained)
            }
            ClassLikeRef::Class(class) => self.flatten(&class.class, &[]),
        };
        let class = Arc::new(class);
        self.memo.insert(reference.name.clone(), class.clone());
        Ok(class)
    }
}

fn own_class(scanned: &ScannedClassLike) -> Class {
    Class {
        name: scanned.name.clone(),
        fully_qualified_name: scanned.fully_qualified_name(),
        description: scanned.description.clone(),
        summary: scanned.summary.clone(),
        privacy: scanned.privacy,
        properties: scanned.properties.clone(),
        methods: scanned.methods.clone(),
        static_methods: scanned.static_methods.clone(),
        attributes: Vec::new(),
        events: scanned.events.clone(),
        slots: Vec::new(),
        superclass: scanned
            .superclass
            .as_ref()
            .map(|reference| reference.name.clone()),
        mixins: scanned
            .mixins
            .iter()
            .map(|reference| reference.name.clone())
            .collect(),
        behaviors: Vec::new(),
        demos: scanned.demos.clone(),
        range: scanned.range.clone(),
        warnings: scanned.warnings.clone(),
    }
}

/// Appends the ancestor's members that the child does not shadow, keeping
/// the original definer in `inherited_from`.
fn inherit(child: &mut Class, ancestor: &Class) {
    let from = ancestor
        .fully_qualified_name
        .clone()
        .or_else(|| ancestor.name.clone());

    for property in &ancestor.properties {
        if child.properties.iter().any(|own| own.name == property.name) {
            continue;
        }
        let mut property = property.clone();
        property.inherited_from = property.inherited_from.take().or_else(|| from.clone());
        child.properties.push(property);
    }
    for method in &ancestor.methods {
        if child.methods.iter().any(|own| own.name == method.name) {
            continue;
        }
        let mut method = method.clone();
        method.inherited_from = method.inherited_from.take().or_else(|| from.clone());
        child.methods.push(method);
    }
    for event in &ancestor.events {
        if child.events.iter().any(|own| own.name == event.name) {
            continue;
        }
        let mut event = event.clone();
        event.inherited_from = event.inherited_from.take().or_else(|| from.clone());
        child.events.push(event);
    }
}

/// Derives attributes and change events from the flattened property list.
/// Only public published properties surface this way.
fn finalize(class: &mut Class) {
    let mut attributes: Vec<Attribute> = Vec::new();
    let mut events: Vec<Event> = Vec::new();
    for property in &class.properties {
        if !property.published || property.privacy != Privacy::Public {
            continue;
        }
        let Some(name) = attribute_for_property(&property.name) else {
            continue;
        };
        if class.attribute(&name).is_none() && !attributes.iter().any(|a| a.name == name) {
            attributes.push(Attribute {
                name: name.clone(),
                description: property.description.clone(),
                type_: property.type_.clone(),
                range: property.range.clone(),
                inherited_from: property.inherited_from.clone(),
            });
        }
        if property.notify {
            let event_name = format!("{name}-changed");
            if !class.events.iter().any(|e| e.name == event_name)
                && !events.iter().any(|e| e.name == event_name)
            {
                events.push(Event {
                    name: event_name,
                    description: format!(
                        "Fired when the `{}` property changes.",
                        property.name
                    ),
                    range: property.range.clone(),
                    inherited_from: property.inherited_from.clone(),
                });
            }
        }
    }
    class.attributes.extend(attributes);
    class.events.extend(events);
}

// ---------------------------------------------------------------------------
// Document resolution

/// Resolves a scanned document against everything reachable from it in the
/// snapshot.
pub(crate) fn resolve_document(
    context: &AnalysisContext,
    scanned: Arc<ScannedDocument>,
) -> Document {
    // The scanned closure: this document plus everything reachable through
    // the dependency graph, cycles tolerated via the visited set.
    let mut closure_docs: Vec<Arc<ScannedDocument>> = Vec::new();
    let mut visited: FxHashSet<PackageUrl> = FxHashSet::default();
    let mut queue: Vec<PackageUrl> = vec![scanned.url.clone()];
    while let Some(url) = queue.pop() {
        if !visited.insert(url.clone()) {
            continue;
        }
        if let Some(Ok(document)) = context.cache().scanned.peek(&url) {
            closure_docs.push(document);
        }
        let imports: Vec<PackageUrl> =
            context.cache().graph().imports_of(&url).cloned().collect();
        queue.extend(imports);
    }

    let borrowed: Vec<&ScannedDocument> = closure_docs.iter().map(Arc::as_ref).collect();
    let index = FeatureIndex::build(&borrowed);
    let mut resolver = FeatureResolver::new(&index);

    let mut features: Vec<Feature> = Vec::new();
    let mut imports: Vec<Arc<ResolvedImport>> = Vec::new();

    for feature in scanned.all_features() {
        match feature {
            ScannedFeature::Import(import) => {
                let mut warnings = import.warnings.clone();
                // A failed import target surfaces here, on the specific
                // import feature, never as a failure of this document.
                if let Some(target) = &import.url {
                    if let Some(failure) = context.cache().failed.get(target) {
                        warnings.push(Warning::warning(
                            failure.code,
                            failure.message.clone(),
                            import.range.clone(),
                        ));
                    }
                }
                let resolved = Arc::new(ResolvedImport {
                    kind: import.kind,
                    href: import.href.clone(),
                    url: import.url.clone(),
                    range: import.range.clone(),
                    warnings,
                });
                imports.push(resolved.clone());
                features.push(Feature::Import(resolved));
            }
            ScannedFeature::InlineDocument(inline) => {
                features.push(Feature::InlineDocument(Arc::new(InlineDocument {
                    document_type: inline.document_type,
                    range: inline.range.clone(),
                })));
            }
            ScannedFeature::Class(class) => {
                features.push(Feature::Class(Arc::new(
                    resolver.flatten(&class.class, &[]),
                )));
            }
            ScannedFeature::Element(element) => {
                let mut class = resolver.flatten(&element.class, &element.behaviors);
                let mut attributes = element.attributes.clone();
                attributes.retain(|observed| class.attribute(&observed.name).is_none());
                class.attributes.splice(0..0, attributes);
                if let Some(tag) = &element.tag_name {
                    class.slots = index.slots_for(tag);
                }
                features.push(Feature::Element(Arc::new(Element {
                    tag_name: element.tag_name.clone(),
                    class,
                })));
            }
            ScannedFeature::ElementMixin(mixin) => {
                features.push(Feature::ElementMixin(Arc::new(ElementMixin {
                    class: resolver.flatten(&mixin.class, &[]),
                })));
            }
            ScannedFeature::Behavior(behavior) => {
                features.push(Feature::Behavior(Arc::new(Behavior {
                    class: resolver.flatten(&behavior.class, &behavior.behaviors),
                })));
            }
            ScannedFeature::Function(function) => {
                features.push(Feature::Function(Arc::new(Function {
                    name: function.fully_qualified_name(),
                    description: function.description.clone(),
                    privacy: function.privacy,
                    params: function.params.clone(),
                    return_: function.return_.clone(),
                    range: function.range.clone(),
                    warnings: function.warnings.clone(),
                })));
            }
            ScannedFeature::Namespace(namespace) => {
                features.push(Feature::Namespace(Arc::new(Namespace {
                    name: namespace.name.clone(),
                    description: namespace.description.clone(),
                    summary: namespace.summary.clone(),
                    range: namespace.range.clone(),
                })));
            }
            ScannedFeature::ElementReference(reference) => {
                features.push(Feature::ElementReference(Arc::new(reference.clone())));
            }
            ScannedFeature::Property(property) => {
                features.push(Feature::Property(Arc::new(property.clone())));
            }
            ScannedFeature::Method(method) => {
                features.push(Feature::Method(Arc::new(method.clone())));
            }
            ScannedFeature::Attribute(attribute) => {
                features.push(Feature::Attribute(Arc::new(attribute.clone())));
            }
            ScannedFeature::Event(event) => {
                features.push(Feature::Event(Arc::new(event.clone())));
            }
            ScannedFeature::Slot(slot) => {
                features.push(Feature::Slot(Arc::new(slot.clone())));
            }
        }
    }

    let mut by_kind: FxHashMap<FeatureKind, Vec<Feature>> = FxHashMap::default();
    for feature in &features {
        by_kind.entry(feature.kind()).or_default().push(feature.clone());
    }
    // Members of resolved class-likes are queryable by kind as well.
    for feature in &features {
        let class = match feature {
            Feature::Element(element) => &element.class,
            Feature::ElementMixin(mixin) => &mixin.class,
            Feature::Behavior(behavior) => &behavior.class,
            Feature::Class(class) => class.as_ref(),
            _ => continue,
        };
        for property in &class.properties {
            by_kind
                .entry(FeatureKind::Property)
                .or_default()
                .push(Feature::Property(Arc::new(property.clone())));
        }
        for method in &class.methods {
            by_kind
                .entry(FeatureKind::Method)
                .or_default()
                .push(Feature::Method(Arc::new(method.clone())));
        }
        for attribute in &class.attributes {
            by_kind
                .entry(FeatureKind::Attribute)
                .or_default()
                .push(Feature::Attribute(Arc::new(attribute.clone())));
        }
        for event in &class.events {
            by_kind
                .entry(FeatureKind::Event)
                .or_default()
                .push(Feature::Event(Arc::new(event.clone())));
        }
    }

    let warnings: Vec<Warning> = scanned
        .all_warnings()
        .into_iter()
        .cloned()
        .collect();

    Document {
        url: scanned.url.clone(),
        scanned,
        features,
        imports,
        warnings,
        by_kind,
    }
}
