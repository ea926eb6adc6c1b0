//! Script scanners.
//!
//! Classification rules worth knowing:
//!
//! * A class recognized as the body of an annotated mixin function belongs
//!   to the mixin scanner; the class scanner never descends into function
//!   bodies, so the mixin path wins.
//! * A class registered with `customElements.define` is emitted as an
//!   element, not a plain class. A string-literal tag argument wins over a
//!   `ClassName.is` lookup.
//! * Mixins require an annotation on the enclosing binding; unannotated
//!   helper functions are ignored.

use rustc_hash::FxHashMap;

use crate::ast::js::{
    walk_expr, walk_stmt, ArrowBody, ClassDecl, Expr, MemberKind, ObjectLit, Param, Program, Stmt,
    Visitor,
};
use crate::features::{
    infer_privacy, Attribute, Demo, Event, Method, MethodParam, MethodReturn, Property, Reference,
    ScannedBehavior, ScannedClass, ScannedClassLike, ScannedElement, ScannedFeature,
    ScannedFunction, ScannedMixin, ScannedNamespace,
};
use crate::jsdoc::Annotation;
use crate::parse::{ParsedAst, ParsedDocument};
use crate::scan::{ScanContext, Scanner};
use crate::urls::PackageUrl;
use crate::warning::{Warning, WarningCode};

fn js_ast(document: &ParsedDocument) -> Option<&Program> {
    match &document.ast {
        ParsedAst::Js(program) => Some(program),
        _ => None,
    }
}

/// Superclass names that never resolve to a feature and should not warn.
const PLATFORM_CLASSES: &[&str] = &["HTMLElement", "Object", "Function", "Array", "EventTarget"];

// ---------------------------------------------------------------------------
// Shared extraction helpers

fn description_of(doc: Option<&Annotation>) -> String {
    doc.map(|annotation| annotation.description.clone())
        .unwrap_or_default()
}

fn summary_of(doc: Option<&Annotation>) -> String {
    doc.and_then(|annotation| annotation.tag("summary"))
        .and_then(|tag| tag.description.clone())
        .unwrap_or_default()
}

fn events_of(doc: Option<&Annotation>, url: &PackageUrl) -> Vec<Event> {
    let Some(doc) = doc else {
        return Vec::new();
    };
    doc.tags
        .iter()
        .filter(|tag| tag.title == "event" || tag.title == "fires")
        .filter_map(|tag| {
            Some(Event {
                name: tag.name.clone()?,
                description: tag.description.clone().unwrap_or_default(),
                range: crate::source::SourceRange::empty(url.as_str()),
                inherited_from: None,
            })
        })
        .collect()
}

fn demos_of(doc: Option<&Annotation>) -> Vec<Demo> {
    let Some(doc) = doc else {
        return Vec::new();
    };
    doc.tags_named("demo")
        .filter_map(|tag| {
            Some(Demo {
                url: tag.name.clone()?,
                description: tag.description.clone().unwrap_or_default(),
            })
        })
        .collect()
}

fn method_params(params: &[Param], doc: Option<&Annotation>) -> Vec<MethodParam> {
    params
        .iter()
        .map(|param| {
            let tag = doc.and_then(|annotation| {
                annotation
                    .tags_named("param")
                    .find(|tag| tag.name.as_deref() == Some(param.name.as_str()))
            });
            MethodParam {
                name: param.name.clone(),
                type_: tag.and_then(|tag| tag.type_.clone()),
                description: tag.and_then(|tag| tag.description.clone()),
            }
        })
        .collect()
}

fn method_return(doc: Option<&Annotation>) -> Option<MethodReturn> {
    let doc = doc?;
    let tag = doc.tag("returns").or_else(|| doc.tag("return"))?;
    Some(MethodReturn {
        type_: tag.type_.clone(),
        description: tag.description.clone(),
    })
}

/// Splits `extends Mixin2(Mixin1(Base))` into a superclass reference and the
/// applied mixins, outermost first. `param_filter` suppresses references to
/// a mixin function's own superclass parameter.
fn heritage(
    expr: &Expr,
    url: &PackageUrl,
    param_filter: &[String],
) -> (Option<Reference>, Vec<Reference>) {
    let mut mixins = Vec::new();
    let mut current = expr;
    loop {
        match current {
            Expr::Call(call) => {
                if let Some(name) = call.callee.dotted_name() {
                    mixins.push(Reference {
                        name,
                        range: call.callee.span().to_range(url),
                    });
                }
                match call.args.first() {
                    Some(arg) => current = arg,
                    None => return (None, mixins),
                }
            }
            _ => {
                let superclass = current.dotted_name().filter(|name| {
                    !PLATFORM_CLASSES.contains(&name.as_str())
                        && !param_filter.contains(name)
                });
                let reference = superclass.map(|name| Reference {
                    name,
                    range: current.span().to_range(url),
                });
                return (reference, mixins);
            }
        }
    }
}

/// Getters consumed structurally rather than surfaced as properties.
const STRUCTURAL_GETTERS: &[&str] = &[
    "is",
    "properties",
    "behaviors",
    "observedAttributes",
    "observers",
    "template",
];

fn class_like_from_class(
    decl: &ClassDecl,
    binding_name: Option<String>,
    doc: Option<&Annotation>,
    url: &PackageUrl,
    param_filter: &[String],
) -> ScannedClassLike {
    let name = binding_name.or_else(|| decl.name.clone());
    let namespace = doc
        .and_then(|annotation| annotation.tag_value("memberof"))
        .map(str::to_string);
    let local = name
        .as_deref()
        .map(|n| n.rsplit('.').next().unwrap_or(n))
        .unwrap_or("");

    let (superclass, mixins) = match &decl.superclass {
        Some(expr) => heritage(expr, url, param_filter),
        None => (None, Vec::new()),
    };

    let mut class_like = ScannedClassLike {
        name: name.clone(),
        namespace,
        description: description_of(doc),
        summary: summary_of(doc),
        privacy: infer_privacy(local, doc, false),
        superclass,
        mixins,
        events: events_of(doc, url),
        demos: demos_of(doc),
        range: decl.span.to_range(url),
        ..ScannedClassLike::default()
    };

    for member in &decl.members {
        let member_doc = member.doc.as_ref();
        match member.kind {
            MemberKind::Constructor => {}
            MemberKind::Getter | MemberKind::Setter => {
                if member.is_static && STRUCTURAL_GETTERS.contains(&member.name.as_str()) {
                    continue;
                }
                if class_like
                    .properties
                    .iter()
                    .any(|property| property.name == member.name)
                {
                    continue;
                }
                class_like.properties.push(Property {
                    name: member.name.clone(),
                    type_: member_doc.and_then(|d| {
                        d.tag("type")
                            .or_else(|| d.tag("returns"))
                            .and_then(|tag| tag.type_.clone())
                    }),
                    description: description_of(member_doc),
                    privacy: infer_privacy(&member.name, member_doc, false),
                    range: member.span.to_range(url),
                    ..Property::default()
                });
            }
            MemberKind::Method => {
                let method = Method {
                    name: member.name.clone(),
                    description: description_of(member_doc),
                    privacy: infer_privacy(&member.name, member_doc, false),
                    params: method_params(&member.params, member_doc),
                    return_: method_return(member_doc),
                    range: member.span.to_range(url),
                    inherited_from: None,
                };
                if member.is_static {
                    class_like.static_methods.push(method);
                } else {
                    class_like.methods.push(method);
                }
            }
            MemberKind::Field => {
                if member.is_static {
                    continue;
                }
                class_like.properties.push(Property {
                    name: member.name.clone(),
                    type_: member_doc.and_then(|d| d.tag("type").and_then(|t| t.type_.clone())),
                    description: description_of(member_doc),
                    privacy: infer_privacy(&member.name, member_doc, false),
                    default: member.value.as_ref().and_then(Expr::literal_text),
                    range: member.span.to_range(url),
                    ..Property::default()
                });
            }
        }
    }

    if let Some(object) = decl.static_getter_object("properties") {
        merge_published(&mut class_like.properties, published_properties(object, url));
    }

    class_like
}

/// Published properties from a `properties` object literal.
fn published_properties(object: &ObjectLit, url: &PackageUrl) -> Vec<Property> {
    let mut properties = Vec::new();
    for entry in &object.properties {
        if entry.is_method {
            continue;
        }
        let doc = entry.doc.as_ref();
        let mut property = Property {
            name: entry.key.clone(),
            description: description_of(doc),
            privacy: infer_privacy(&entry.key, doc, false),
            published: true,
            range: entry.span.to_range(url),
            ..Property::default()
        };
        match &entry.value {
            Expr::Ident(ident) => property.type_ = Some(ident.name.clone()),
            Expr::Object(config) => {
                property.type_ = config.property_value("type").and_then(Expr::dotted_name);
                property.default = config.property_value("value").and_then(Expr::literal_text);
                property.notify = bool_property(config, "notify");
                property.read_only = bool_property(config, "readOnly");
                property.reflect_to_attribute = bool_property(config, "reflectToAttribute");
                property.observer = config.property_value("observer").and_then(|value| {
                    value
                        .as_string()
                        .map(str::to_string)
                        .or_else(|| value.dotted_name())
                });
            }
            _ => {}
        }
        if let Some(tag) = doc.and_then(|d| d.tag("type")) {
            if let Some(type_) = &tag.type_ {
                property.type_ = Some(type_.clone());
            }
        }
        if crate::features::attribute_for_property(&property.name).is_none() {
            property.warnings.push(Warning::warning(
                WarningCode::InvalidPropertyName,
                format!(
                    "property `{}` has no attribute form: names must not start with an upper-case letter",
                    property.name
                ),
                property.range.clone(),
            ));
        }
        properties.push(property);
    }
    properties
}

fn bool_property(object: &ObjectLit, key: &str) -> bool {
    matches!(object.property_value(key), Some(Expr::Bool(lit)) if lit.value)
}

/// Merges published properties over prototype-discovered ones by name.
fn merge_published(existing: &mut Vec<Property>, published: Vec<Property>) {
    for property in published {
        match existing.iter_mut().find(|p| p.name == property.name) {
            Some(slot) => {
                let description = if property.description.is_empty() {
                    std::mem::take(&mut slot.description)
                } else {
                    property.description.clone()
                };
                *slot = Property {
                    description,
                    ..property
                };
            }
            None => existing.push(property),
        }
    }
}

/// References out of a `behaviors: [A.B, C.D]` style array.
fn references_from_array(expr: &Expr, url: &PackageUrl) -> Vec<Reference> {
    let Expr::Array(array) = expr else {
        return Vec::new();
    };
    array
        .items
        .iter()
        .filter_map(|item| {
            item.dotted_name().map(|name| Reference {
                name,
                range: item.span().to_range(url),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Class scanner (elements and plain classes)

/// Finds class declarations, class expressions in variable initializers and
/// assignments, and classes referenced by `customElements.define` calls.
pub struct ClassScanner;

struct ClassCandidate<'a> {
    decl: &'a ClassDecl,
    binding: Option<String>,
    doc: Option<&'a Annotation>,
}

enum TagRef<'a> {
    Literal(String),
    IsLookup(String),
    Unknown(&'a Expr),
}

enum ClassRef<'a> {
    Name(String),
    Inline(&'a ClassDecl),
}

struct Define<'a> {
    tag: TagRef<'a>,
    class: ClassRef<'a>,
}

struct ClassCollector<'a> {
    candidates: Vec<ClassCandidate<'a>>,
    defines: Vec<Define<'a>>,
}

impl<'a> Visitor<'a> for ClassCollector<'a> {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Class(decl) => {
                self.candidates.push(ClassCandidate {
                    decl,
                    binding: decl.name.clone(),
                    doc: decl.doc.as_ref(),
                });
            }
            Stmt::Var(var) => {
                for declarator in &var.declarators {
                    match &declarator.init {
                        Some(Expr::Class(decl)) => self.candidates.push(ClassCandidate {
                            decl,
                            binding: Some(declarator.name.clone()),
                            doc: var.doc.as_ref(),
                        }),
                        Some(init) => self.visit_expr(init),
                        None => {}
                    }
                }
            }
            Stmt::Expr(stmt_expr) => {
                if let Expr::Assign(assign) = &stmt_expr.expr {
                    if let (Some(target), Expr::Class(decl)) =
                        (assign.target.dotted_name(), assign.value.as_ref())
                    {
                        if assign.op == "=" {
                            self.candidates.push(ClassCandidate {
                                decl,
                                binding: Some(target),
                                doc: stmt_expr.doc.as_ref(),
                            });
                            return;
                        }
                    }
                }
                self.visit_expr(&stmt_expr.expr);
            }
            // Classes inside function bodies belong to the mixin scanner.
            Stmt::Function(_) => {}
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Call(call) => {
                if call.callee.dotted_name().as_deref() == Some("customElements.define") {
                    if let (Some(tag_arg), Some(class_arg)) = (call.args.first(), call.args.get(1))
                    {
                        let tag = match tag_arg {
                            Expr::String(lit) => TagRef::Literal(lit.value.clone()),
                            Expr::Member(member) if member.property == "is" => member
                                .object
                                .dotted_name()
                                .map(TagRef::IsLookup)
                                .unwrap_or(TagRef::Unknown(tag_arg)),
                            other => TagRef::Unknown(other),
                        };
                        let class = match class_arg {
                            Expr::Class(decl) => ClassRef::Inline(decl),
                            other => match other.dotted_name() {
                                Some(name) => ClassRef::Name(name),
                                None => return,
                            },
                        };
                        self.defines.push(Define { tag, class });
                        return;
                    }
                }
                walk_expr(self, expr);
            }
            // The mixin scanner owns classes inside function bodies.
            Expr::Function(_) | Expr::Arrow(_) | Expr::Class(_) => {}
            _ => walk_expr(self, expr),
        }
    }
}

impl Scanner for ClassScanner {
    fn scan(&self, document: &ParsedDocument, _context: &ScanContext) -> Vec<ScannedFeature> {
        let Some(program) = js_ast(document) else {
            return Vec::new();
        };
        let mut collector = ClassCollector {
            candidates: Vec::new(),
            defines: Vec::new(),
        };
        crate::ast::js::walk_program(&mut collector, program);

        let url = &document.url;
        let mut features = Vec::new();

        for candidate in &collector.candidates {
            let define = collector.defines.iter().find(|define| {
                let name = match &define.class {
                    ClassRef::Name(name) => name,
                    ClassRef::Inline(_) => return false,
                };
                Some(name.as_str()) == candidate.binding.as_deref()
                    || Some(name.as_str()) == candidate.decl.name.as_deref()
            });
            let annotated = candidate.doc.is_some_and(|doc| doc.has_tag("customElement"));
            if define.is_none() && !annotated {
                features.push(ScannedFeature::Class(ScannedClass {
                    class: class_like_from_class(
                        candidate.decl,
                        candidate.binding.clone(),
                        candidate.doc,
                        url,
                        &[],
                    ),
                }));
                continue;
            }
            features.push(ScannedFeature::Element(element_from_candidate(
                candidate, define, url,
            )));
        }

        // Elements defined with an inline class expression.
        for define in &collector.defines {
            let ClassRef::Inline(decl) = &define.class else {
                continue;
            };
            let candidate = ClassCandidate {
                decl,
                binding: decl.name.clone(),
                doc: decl.doc.as_ref(),
            };
            features.push(ScannedFeature::Element(element_from_candidate(
                &candidate,
                Some(define),
                url,
            )));
        }

        features
    }
}

fn element_from_candidate(
    candidate: &ClassCandidate,
    define: Option<&Define>,
    url: &PackageUrl,
) -> ScannedElement {
    let class =
        class_like_from_class(candidate.decl, candidate.binding.clone(), candidate.doc, url, &[]);

    let static_is = candidate
        .decl
        .static_getter_value("is")
        .and_then(Expr::as_string)
        .map(str::to_string);

    // A string-literal define argument wins over a `Class.is` lookup, which
    // in turn reads the static getter.
    let tag_name = match define.map(|d| &d.tag) {
        Some(TagRef::Literal(tag)) => Some(tag.clone()),
        Some(TagRef::IsLookup(_)) | Some(TagRef::Unknown(_)) | None => candidate
            .doc
            .and_then(|doc| doc.tag_value("customElement"))
            .map(str::to_string)
            .or(static_is),
    };

    let behaviors = candidate
        .decl
        .static_getter_value("behaviors")
        .map(|expr| references_from_array(expr, url))
        .unwrap_or_default();

    let attributes = candidate
        .decl
        .static_getter_value("observedAttributes")
        .and_then(|expr| match expr {
            Expr::Array(array) => Some(array),
            _ => None,
        })
        .map(|array| {
            array
                .items
                .iter()
                .filter_map(|item| {
                    item.as_string().map(|name| Attribute {
                        name: name.to_string(),
                        range: item.span().to_range(url),
                        ..Attribute::default()
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let mut element = ScannedElement {
        class,
        tag_name,
        behaviors,
        attributes,
    };
    if element.tag_name.is_none() {
        element.class.warnings.push(Warning::warning(
            WarningCode::AmbiguousName,
            "could not determine the element's tag name",
            element.class.range.clone(),
        ));
    }
    element
}

// ---------------------------------------------------------------------------
// Mixin scanner

/// Recognizes annotated mixin-producing functions in their several shapes.
pub struct MixinScanner;

fn mixin_annotated(doc: Option<&Annotation>) -> bool {
    doc.is_some_and(|d| d.has_tag("mixinFunction") || d.has_tag("polymerMixin"))
}

/// The parameter list and produced class of a mixin-shaped expression,
/// looking through helper-call wrappers.
fn mixin_function_parts(expr: &Expr) -> Option<(&[Param], Option<&ClassDecl>)> {
    match expr {
        Expr::Function(function) => Some((&function.params, class_in_body(&function.body))),
        Expr::Arrow(arrow) => match &arrow.body {
            ArrowBody::Expr(body) => match body.as_ref() {
                Expr::Class(decl) => Some((&arrow.params, Some(decl))),
                _ => Some((&arrow.params, None)),
            },
            ArrowBody::Block(body) => Some((&arrow.params, class_in_body(body))),
        },
        Expr::Call(call) => call.args.iter().find_map(mixin_function_parts),
        _ => None,
    }
}

fn class_in_body(body: &[Stmt]) -> Option<&ClassDecl> {
    body.iter().find_map(|stmt| match stmt {
        Stmt::Class(decl) => Some(decl),
        Stmt::Return(ret) => match ret.value.as_ref() {
            Some(Expr::Class(decl)) => Some(decl),
            _ => None,
        },
        _ => None,
    })
}

fn scan_mixin(
    binding: String,
    init: Option<&Expr>,
    doc: Option<&Annotation>,
    url: &PackageUrl,
    fallback_range: crate::source::SourceRange,
) -> ScannedMixin {
    let parts = init.and_then(mixin_function_parts);
    let class = match parts {
        Some((params, Some(decl))) => {
            let param_names: Vec<String> =
                params.iter().map(|param| param.name.clone()).collect();
            let mut class = class_like_from_class(decl, Some(binding), doc, url, &param_names);
            class.range = init
                .map(|expr| expr.span().to_range(url))
                .unwrap_or(fallback_range);
            class
        }
        _ => {
            // A plain binding with no function body still records an
            // empty-members mixin.
            ScannedClassLike {
                name: Some(binding.clone()),
                namespace: doc
                    .and_then(|d| d.tag_value("memberof"))
                    .map(str::to_string),
                description: description_of(doc),
                summary: summary_of(doc),
                privacy: infer_privacy(
                    binding.rsplit('.').next().unwrap_or(&binding),
                    doc,
                    false,
                ),
                range: fallback_range,
                ..ScannedClassLike::default()
            }
        }
    };
    ScannedMixin { class }
}

impl Scanner for MixinScanner {
    fn scan(&self, document: &ParsedDocument, _context: &ScanContext) -> Vec<ScannedFeature> {
        let Some(program) = js_ast(document) else {
            return Vec::new();
        };
        let url = &document.url;
        let mut features = Vec::new();
        scan_stmts_for_mixins(&program.statements, url, &mut features);
        features
    }
}

fn scan_stmts_for_mixins(stmts: &[Stmt], url: &PackageUrl, features: &mut Vec<ScannedFeature>) {
    for stmt in stmts {
        match stmt {
            Stmt::Function(function) => {
                if mixin_annotated(function.doc.as_ref()) {
                    if let Some(name) = &function.name {
                        let class = match class_in_body(&function.body) {
                            Some(decl) => {
                                let params: Vec<String> = function
                                    .params
                                    .iter()
                                    .map(|param| param.name.clone())
                                    .collect();
                                let mut class = class_like_from_class(
                                    decl,
                                    Some(name.clone()),
                                    function.doc.as_ref(),
                                    url,
                                    &params,
                                );
                                class.range = function.span.to_range(url);
                                class
                            }
                            None => ScannedClassLike {
                                name: Some(name.clone()),
                                description: description_of(function.doc.as_ref()),
                                range: function.span.to_range(url),
                                ..ScannedClassLike::default()
                            },
                        };
                        features.push(ScannedFeature::ElementMixin(ScannedMixin { class }));
                    }
                }
            }
            Stmt::Var(var) => {
                if mixin_annotated(var.doc.as_ref()) {
                    for declarator in &var.declarators {
                        features.push(ScannedFeature::ElementMixin(scan_mixin(
                            declarator.name.clone(),
                            declarator.init.as_ref(),
                            var.doc.as_ref(),
                            url,
                            var.span.to_range(url),
                        )));
                    }
                }
            }
            Stmt::Expr(stmt_expr) => {
                if mixin_annotated(stmt_expr.doc.as_ref()) {
                    if let Expr::Assign(assign) = &stmt_expr.expr {
                        if let Some(target) = assign.target.dotted_name() {
                            features.push(ScannedFeature::ElementMixin(scan_mixin(
                                target,
                                Some(assign.value.as_ref()),
                                stmt_expr.doc.as_ref(),
                                url,
                                stmt_expr.span.to_range(url),
                            )));
                        }
                    }
                }
            }
            Stmt::Block(block) => scan_stmts_for_mixins(&block.statements, url, features),
            Stmt::If(branch) => {
                scan_stmts_for_mixins(std::slice::from_ref(branch.then_branch.as_ref()), url, features);
                if let Some(alternate) = &branch.else_branch {
                    scan_stmts_for_mixins(std::slice::from_ref(alternate.as_ref()), url, features);
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Behavior scanner

/// Recognizes object literals bound to dotted names and annotated as
/// behaviors; merges same-name declarations.
pub struct BehaviorScanner;

fn class_like_from_object(
    name: String,
    doc: Option<&Annotation>,
    object: &ObjectLit,
    url: &PackageUrl,
) -> (ScannedClassLike, Vec<Reference>) {
    let local = name.rsplit('.').next().unwrap_or(&name).to_string();
    let mut class_like = ScannedClassLike {
        name: Some(name),
        namespace: doc
            .and_then(|d| d.tag_value("memberof"))
            .map(str::to_string),
        description: description_of(doc),
        summary: summary_of(doc),
        privacy: infer_privacy(&local, doc, false),
        events: events_of(doc, url),
        demos: demos_of(doc),
        range: object.span.to_range(url),
        ..ScannedClassLike::default()
    };

    let mut behaviors = Vec::new();
    for entry in &object.properties {
        match entry.key.as_str() {
            "properties" => {
                let config = match &entry.value {
                    Expr::Object(config) => Some(config),
                    // Getter-style `properties` blocks return the object
                    // from the function body.
                    Expr::Function(function) => function.body.iter().find_map(|stmt| match stmt {
                        Stmt::Return(ret) => match ret.value.as_ref() {
                            Some(Expr::Object(config)) => Some(config),
                            _ => None,
                        },
                        _ => None,
                    }),
                    _ => None,
                };
                if let Some(config) = config {
                    merge_published(
                        &mut class_like.properties,
                        published_properties(config, url),
                    );
                }
            }
            "behaviors" => behaviors = references_from_array(&entry.value, url),
            "observers" | "listeners" | "hostAttributes" | "is" => {}
            _ => {
                if entry.is_method {
                    if let Expr::Function(function) = &entry.value {
                        class_like.methods.push(Method {
                            name: entry.key.clone(),
                            description: description_of(entry.doc.as_ref()),
                            privacy: infer_privacy(&entry.key, entry.doc.as_ref(), false),
                            params: method_params(&function.params, entry.doc.as_ref()),
                            return_: method_return(entry.doc.as_ref()),
                            range: entry.span.to_range(url),
                            inherited_from: None,
                        });
                    }
                } else {
                    class_like.properties.push(Property {
                        name: entry.key.clone(),
                        description: description_of(entry.doc.as_ref()),
                        privacy: infer_privacy(&entry.key, entry.doc.as_ref(), false),
                        default: entry.value.literal_text(),
                        range: entry.span.to_range(url),
                        ..Property::default()
                    });
                }
            }
        }
    }

    (class_like, behaviors)
}

impl Scanner for BehaviorScanner {
    fn scan(&self, document: &ParsedDocument, _context: &ScanContext) -> Vec<ScannedFeature> {
        let Some(program) = js_ast(document) else {
            return Vec::new();
        };
        let url = &document.url;
        let mut found: Vec<ScannedBehavior> = Vec::new();
        scan_stmts_for_behaviors(&program.statements, url, &mut found);

        // Merge same-name behaviors: the last declaration supplies position
        // and wins field-level conflicts; members union.
        let mut order: Vec<String> = Vec::new();
        let mut merged: FxHashMap<String, ScannedBehavior> = FxHashMap::default();
        for behavior in found {
            let Some(name) = behavior.class.name.clone() else {
                continue;
            };
            match merged.remove(&name) {
                Some(previous) => {
                    merged.insert(name, merge_behaviors(previous, behavior));
                }
                None => {
                    order.push(name.clone());
                    merged.insert(name, behavior);
                }
            }
        }

        order
            .into_iter()
            .filter_map(|name| merged.remove(&name))
            .map(ScannedFeature::Behavior)
            .collect()
    }
}

fn scan_stmts_for_behaviors(stmts: &[Stmt], url: &PackageUrl, found: &mut Vec<ScannedBehavior>) {
    for stmt in stmts {
        match stmt {
            Stmt::Expr(stmt_expr) => {
                let Some(doc) = stmt_expr.doc.as_ref() else {
                    continue;
                };
                if !doc.has_tag("polymerBehavior") {
                    continue;
                }
                let Expr::Assign(assign) = &stmt_expr.expr else {
                    continue;
                };
                let Some(binding) = assign.target.dotted_name() else {
                    continue;
                };
                found.push(behavior_from_value(
                    binding,
                    assign.value.as_ref(),
                    Some(doc),
                    url,
                ));
            }
            Stmt::Var(var) => {
                let Some(doc) = var.doc.as_ref() else {
                    continue;
                };
                if !doc.has_tag("polymerBehavior") {
                    continue;
                }
                for declarator in &var.declarators {
                    if let Some(init) = &declarator.init {
                        found.push(behavior_from_value(
                            declarator.name.clone(),
                            init,
                            Some(doc),
                            url,
                        ));
                    }
                }
            }
            Stmt::Block(block) => scan_stmts_for_behaviors(&block.statements, url, found),
            _ => {}
        }
    }
}

fn behavior_from_value(
    binding: String,
    value: &Expr,
    doc: Option<&Annotation>,
    url: &PackageUrl,
) -> ScannedBehavior {
    // `@polymerBehavior Published.Name` renames the behavior, covering the
    // `FooBehaviorImpl` convention.
    let name = doc
        .and_then(|d| d.tag_value("polymerBehavior"))
        .map(str::to_string)
        .unwrap_or(binding);

    match value {
        Expr::Object(object) => {
            let (class, behaviors) = class_like_from_object(name, doc, object, url);
            ScannedBehavior { class, behaviors }
        }
        Expr::Array(_) => {
            // An array of references is a composition of chained behaviors.
            let behaviors = references_from_array(value, url);
            let class = ScannedClassLike {
                name: Some(name),
                description: description_of(doc),
                summary: summary_of(doc),
                range: value.span().to_range(url),
                ..ScannedClassLike::default()
            };
            ScannedBehavior { class, behaviors }
        }
        other => {
            let mut class = ScannedClassLike {
                name: Some(name),
                description: description_of(doc),
                range: other.span().to_range(url),
                ..ScannedClassLike::default()
            };
            class.warnings.push(Warning::warning(
                WarningCode::InvalidBehaviorShape,
                "a behavior must be an object literal or an array of behavior references",
                class.range.clone(),
            ));
            ScannedBehavior {
                class,
                behaviors: Vec::new(),
            }
        }
    }
}

fn merge_behaviors(first: ScannedBehavior, second: ScannedBehavior) -> ScannedBehavior {
    let name = second.class.name.clone().or(first.class.name.clone());
    let mut class = second.class;

    if first.class.description.len() > class.description.len() {
        class.description = first.class.description;
    }
    if class.summary.is_empty() {
        class.summary = first.class.summary;
    }
    for event in first.class.events {
        if !class.events.iter().any(|existing| existing.name == event.name) {
            class.events.push(event);
        }
    }
    class.demos.extend(first.class.demos);
    for property in first.class.properties {
        if !class
            .properties
            .iter()
            .any(|existing| existing.name == property.name)
        {
            class.properties.push(property);
        }
    }
    for method in first.class.methods {
        if !class.methods.iter().any(|existing| existing.name == method.name) {
            class.methods.push(method);
        }
    }
    class.warnings.extend(first.class.warnings);

    let mut behaviors = second.behaviors;
    for reference in first.behaviors {
        if !behaviors.iter().any(|existing| existing.name == reference.name) {
            behaviors.push(reference);
        }
    }
    // A behavior chaining itself would recurse forever at resolve time.
    behaviors.retain(|reference| Some(&reference.name) != name.as_ref());

    ScannedBehavior { class, behaviors }
}

// ---------------------------------------------------------------------------
// Function scanner

/// Finds function declarations and function-typed bindings carrying a
/// `@memberof` annotation.
pub struct FunctionScanner;

fn is_function_expr(expr: &Expr) -> bool {
    matches!(expr, Expr::Function(_) | Expr::Arrow(_))
}

impl Scanner for FunctionScanner {
    fn scan(&self, document: &ParsedDocument, _context: &ScanContext) -> Vec<ScannedFeature> {
        let Some(program) = js_ast(document) else {
            return Vec::new();
        };
        let url = &document.url;
        let mut features = Vec::new();
        for stmt in &program.statements {
            match stmt {
                Stmt::Function(function) => {
                    let Some(doc) = function.doc.as_ref() else {
                        continue;
                    };
                    let (Some(namespace), Some(name)) =
                        (doc.tag_value("memberof"), function.name.as_deref())
                    else {
                        continue;
                    };
                    features.push(scanned_function(
                        name,
                        namespace,
                        &function.params,
                        doc,
                        function.span.to_range(url),
                    ));
                }
                Stmt::Var(var) => {
                    let Some(doc) = var.doc.as_ref() else {
                        continue;
                    };
                    let Some(namespace) = doc.tag_value("memberof") else {
                        continue;
                    };
                    for declarator in &var.declarators {
                        let Some(init) = &declarator.init else {
                            continue;
                        };
                        if let Some(params) = function_params(init) {
                            features.push(scanned_function(
                                &declarator.name,
                                namespace,
                                params,
                                doc,
                                var.span.to_range(url),
                            ));
                        }
                    }
                }
                Stmt::Expr(stmt_expr) => {
                    let Some(doc) = stmt_expr.doc.as_ref() else {
                        continue;
                    };
                    let Some(namespace) = doc.tag_value("memberof") else {
                        continue;
                    };
                    let Expr::Assign(assign) = &stmt_expr.expr else {
                        continue;
                    };
                    if !is_function_expr(&assign.value) {
                        continue;
                    }
                    let Some(target) = assign.target.dotted_name() else {
                        continue;
                    };
                    let name = target.rsplit('.').next().unwrap_or(&target).to_string();
                    if let Some(params) = function_params(&assign.value) {
                        features.push(scanned_function(
                            &name,
                            namespace,
                            params,
                            doc,
                            stmt_expr.span.to_range(url),
                        ));
                    }
                }
                _ => {}
            }
        }
        features
    }
}

fn function_params(expr: &Expr) -> Option<&[Param]> {
    match expr {
        Expr::Function(function) => Some(&function.params),
        Expr::Arrow(arrow) => Some(&arrow.params),
        _ => None,
    }
}

fn scanned_function(
    name: &str,
    namespace: &str,
    params: &[Param],
    doc: &Annotation,
    range: crate::source::SourceRange,
) -> ScannedFeature {
    ScannedFeature::Function(ScannedFunction {
        name: name.to_string(),
        namespace: Some(namespace.to_string()),
        description: doc.description.clone(),
        privacy: infer_privacy(name, Some(doc), false),
        params: method_params(params, Some(doc)),
        return_: method_return(Some(doc)),
        range,
        warnings: Vec::new(),
    })
}

// ---------------------------------------------------------------------------
// Namespace scanner

/// Finds object literals annotated as namespaces, plus `@memberof`-annotated
/// value bindings, which surface as namespace properties.
pub struct NamespaceScanner;

impl Scanner for NamespaceScanner {
    fn scan(&self, document: &ParsedDocument, _context: &ScanContext) -> Vec<ScannedFeature> {
        let Some(program) = js_ast(document) else {
            return Vec::new();
        };
        let url = &document.url;
        let mut features = Vec::new();
        for stmt in &program.statements {
            let (doc, binding, init) = match stmt {
                Stmt::Var(var) => {
                    let Some(declarator) = var.declarators.first() else {
                        continue;
                    };
                    (
                        var.doc.as_ref(),
                        Some(declarator.name.clone()),
                        declarator.init.as_ref(),
                    )
                }
                Stmt::Expr(stmt_expr) => match &stmt_expr.expr {
                    Expr::Assign(assign) => (
                        stmt_expr.doc.as_ref(),
                        assign.target.dotted_name(),
                        Some(assign.value.as_ref()),
                    ),
                    _ => continue,
                },
                _ => continue,
            };
            let Some(doc) = doc else {
                continue;
            };
            let Some(binding) = binding else {
                continue;
            };

            if doc.has_tag("namespace") {
                let name = doc
                    .tag_value("namespace")
                    .map(str::to_string)
                    .unwrap_or(binding);
                features.push(ScannedFeature::Namespace(ScannedNamespace {
                    name,
                    description: doc.description.clone(),
                    summary: summary_of(Some(doc)),
                    range: stmt.span().to_range(url),
                }));
                continue;
            }

            // A `@memberof` value binding (not a function) is a namespace
            // property.
            if let Some(namespace) = doc.tag_value("memberof") {
                let Some(init) = init else {
                    continue;
                };
                if is_function_expr(init) {
                    continue;
                }
                let local = binding.rsplit('.').next().unwrap_or(&binding).to_string();
                features.push(ScannedFeature::Property(Property {
                    name: format!("{namespace}.{local}"),
                    type_: doc.tag("type").and_then(|tag| tag.type_.clone()),
                    description: doc.description.clone(),
                    privacy: infer_privacy(&local, Some(doc), false),
                    default: init.literal_text(),
                    range: stmt.span().to_range(url),
                    ..Property::default()
                }));
            }
        }
        features
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use crate::features::{FeatureKind, Privacy, ScannedFeature};
    use crate::parse::DocumentType;
    use crate::scan::test_util::scan_source;

    fn scan_js(source: &str) -> crate::scan::ScannedDocument {
        scan_source("test.js", DocumentType::Js, source)
    }

    fn class_names(scanned: &crate::scan::ScannedDocument) -> Vec<String> {
        scanned
            .features
            .iter()
            .filter_map(|feature| match feature {
                ScannedFeature::Class(class) => class.class.name.clone(),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn class_scanner_names_every_binding_form() {
        let scanned = scan_js(
            "class Declaration {}\nvar VarDeclaration = class {};\nAssignment = class {};\nNamespace.AlsoAssignment = class {};\nDeclared.AnotherAssignment = class {};",
        );
        assert_eq!(
            class_names(&scanned),
            [
                "Declaration",
                "VarDeclaration",
                "Assignment",
                "Namespace.AlsoAssignment",
                "Declared.AnotherAssignment"
            ]
        );
    }

    #[test]
    fn define_with_string_literal_beats_static_is() {
        let scanned = scan_js(
            "class XFoo extends HTMLElement {\n  static get is() { return 'x-ignored'; }\n}\ncustomElements.define('x-foo', XFoo);",
        );
        let elements: Vec<_> = scanned
            .features
            .iter()
            .filter_map(|feature| match feature {
                ScannedFeature::Element(element) => Some(element),
                _ => None,
            })
            .collect();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].tag_name.as_deref(), Some("x-foo"));
    }

    #[test]
    fn define_with_is_lookup_reads_the_static_getter() {
        let scanned = scan_js(
            "class XBar extends HTMLElement {\n  static get is() { return 'x-bar'; }\n}\ncustomElements.define(XBar.is, XBar);",
        );
        let ScannedFeature::Element(element) = &scanned.features[0] else {
            panic!("expected an element");
        };
        assert_eq!(element.tag_name.as_deref(), Some("x-bar"));
    }

    #[test_case(
        "/**\n * @mixinFunction\n */\nfunction TestMixin(superclass) {\n  return class extends superclass {\n    static get properties() { return { foo: { type: String } }; }\n  };\n}"
        ; "function declaration"
    )]
    #[test_case(
        "/**\n * @mixinFunction\n */\nconst TestMixin = (s) => class extends s {\n  static get properties() { return { foo: { type: String } }; }\n};"
        ; "arrow expression"
    )]
    #[test_case(
        "/**\n * @mixinFunction\n */\nconst TestMixin = function(s) {\n  return class extends s {\n    static get properties() { return { foo: { type: String } }; }\n  };\n};"
        ; "function expression"
    )]
    #[test_case(
        "/**\n * @mixinFunction\n */\nPolymer.TestMixin = Polymer.woohoo(function TestMixin(base) {\n  /** @polymerMixinClass */\n  class TestMixin extends base {\n    static get properties() { return { foo: { type: String } }; }\n  }\n  return TestMixin;\n});"
        ; "wrapped function"
    )]
    fn mixin_forms_emit_one_mixin_and_no_class(source: &str) {
        let scanned = scan_js(source);
        let mixins: Vec<_> = scanned
            .features
            .iter()
            .filter_map(|feature| match feature {
                ScannedFeature::ElementMixin(mixin) => Some(mixin),
                _ => None,
            })
            .collect();
        assert_eq!(mixins.len(), 1, "exactly one mixin expected");
        assert!(class_names(&scanned).is_empty(), "no plain class expected");
        let properties = &mixins[0].class.properties;
        assert_eq!(properties.len(), 1);
        assert_eq!(properties[0].name, "foo");
        assert!(properties[0].published);
        // The mixin's superclass parameter is not a reference.
        assert!(mixins[0].class.superclass.is_none());
    }

    #[test]
    fn observed_attributes_are_recorded_on_the_element() {
        let scanned = scan_js(
            "class XObs extends HTMLElement {\n  static get observedAttributes() { return ['alpha', 'beta-gamma']; }\n}\ncustomElements.define('x-obs', XObs);",
        );
        let ScannedFeature::Element(element) = &scanned.features[0] else {
            panic!("expected an element");
        };
        let names: Vec<_> = element
            .attributes
            .iter()
            .map(|attribute| attribute.name.as_str())
            .collect();
        assert_eq!(names, ["alpha", "beta-gamma"]);
        // The structural getter is consumed, not surfaced as a property.
        assert!(element.class.properties.is_empty());
    }

    #[test]
    fn unannotated_mixin_helpers_are_ignored() {
        let scanned = scan_js(
            "function NotAMixin(superclass) {\n  return class extends superclass {};\n}",
        );
        assert!(scanned.features.is_empty());
    }

    #[test]
    fn plain_binding_mixin_yields_empty_members() {
        let scanned = scan_js("/** @mixinFunction */\nlet LazyMixin;");
        let ScannedFeature::ElementMixin(mixin) = &scanned.features[0] else {
            panic!("expected a mixin");
        };
        assert_eq!(mixin.class.name.as_deref(), Some("LazyMixin"));
        assert!(mixin.class.properties.is_empty());
        assert!(mixin.class.methods.is_empty());
    }

    #[test]
    fn classification_is_unduplicated_and_ordered() {
        let scanned = scan_js(
            "class Element extends HTMLElement {}\ncustomElements.define('vanilla-element', Element);\n/** @customElement annotated-element */\nclass AnnotatedElement extends HTMLElement {}\n/** @mixinFunction */\nfunction Mixin(s) { return class extends s {}; }\n/**\n * @polymer\n * @mixinFunction\n */\nfunction AnnotatedMixin(s) { return class extends s {}; }",
        );
        let kinds: Vec<FeatureKind> = scanned.features.iter().map(ScannedFeature::kind).collect();
        assert_eq!(
            kinds,
            [
                FeatureKind::Element,
                FeatureKind::Element,
                FeatureKind::ElementMixin,
                FeatureKind::ElementMixin
            ]
        );
        let names: Vec<_> = scanned
            .features
            .iter()
            .filter_map(|feature| match feature {
                ScannedFeature::Element(element) => element.class.name.clone(),
                ScannedFeature::ElementMixin(mixin) => mixin.class.name.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(
            names,
            ["Element", "AnnotatedElement", "Mixin", "AnnotatedMixin"]
        );
    }

    #[test]
    fn behaviors_merge_same_name_declarations() {
        let scanned = scan_js(
            "/**\n * Short.\n * @polymerBehavior My.Behavior\n */\nMy.Behavior = {\n  properties: { alpha: { type: String } },\n  doWork() {}\n};\n/**\n * A much longer description wins.\n * @polymerBehavior My.Behavior\n */\nMy.Behavior = {\n  properties: { beta: { type: Number, notify: true } }\n};",
        );
        let behaviors: Vec<_> = scanned
            .features
            .iter()
            .filter_map(|feature| match feature {
                ScannedFeature::Behavior(behavior) => Some(behavior),
                _ => None,
            })
            .collect();
        assert_eq!(behaviors.len(), 1);
        let behavior = behaviors[0];
        assert_eq!(behavior.class.description, "A much longer description wins.");
        let mut property_names: Vec<_> = behavior
            .class
            .properties
            .iter()
            .map(|property| property.name.as_str())
            .collect();
        property_names.sort_unstable();
        assert_eq!(property_names, ["alpha", "beta"]);
        assert_eq!(behavior.class.methods.len(), 1);
    }

    #[test]
    fn behavior_array_is_a_composition() {
        let scanned = scan_js(
            "/** @polymerBehavior Combo.Behavior */\nCombo.Behavior = [Combo.First, Combo.Second];",
        );
        let ScannedFeature::Behavior(behavior) = &scanned.features[0] else {
            panic!("expected a behavior");
        };
        let names: Vec<_> = behavior
            .behaviors
            .iter()
            .map(|reference| reference.name.as_str())
            .collect();
        assert_eq!(names, ["Combo.First", "Combo.Second"]);
        assert!(behavior.class.properties.is_empty());
    }

    #[test]
    fn behavior_self_reference_is_filtered() {
        let scanned = scan_js(
            "/** @polymerBehavior Loop.Behavior */\nLoop.BehaviorImpl = {\n  behaviors: [Loop.Behavior, Other.Behavior]\n};",
        );
        let ScannedFeature::Behavior(behavior) = &scanned.features[0] else {
            panic!("expected a behavior");
        };
        assert_eq!(behavior.class.name.as_deref(), Some("Loop.Behavior"));
        let names: Vec<_> = behavior
            .behaviors
            .iter()
            .map(|reference| reference.name.as_str())
            .collect();
        assert_eq!(names, ["Other.Behavior"]);
    }

    #[test]
    fn functions_require_memberof() {
        let scanned = scan_js(
            "/**\n * Computes things.\n * @memberof Utils\n * @param {number} count how many\n * @returns {string} the result\n */\nfunction compute(count) { return '' + count; }\nfunction ignored() {}",
        );
        let functions: Vec<_> = scanned
            .features
            .iter()
            .filter_map(|feature| match feature {
                ScannedFeature::Function(function) => Some(function),
                _ => None,
            })
            .collect();
        assert_eq!(functions.len(), 1);
        let function = functions[0];
        assert_eq!(function.fully_qualified_name(), "Utils.compute");
        assert_eq!(function.params[0].type_.as_deref(), Some("number"));
        assert_eq!(
            function.return_.as_ref().unwrap().type_.as_deref(),
            Some("string")
        );
    }

    #[test]
    fn namespaces_and_namespace_properties() {
        let scanned = scan_js(
            "/**\n * The utilities namespace.\n * @namespace\n */\nUtils = {};\n/**\n * @memberof Utils\n * @type {number}\n */\nUtils.version = 3;",
        );
        let ScannedFeature::Namespace(namespace) = &scanned.features[0] else {
            panic!("expected a namespace");
        };
        assert_eq!(namespace.name, "Utils");
        let ScannedFeature::Property(property) = &scanned.features[1] else {
            panic!("expected a namespace property");
        };
        assert_eq!(property.name, "Utils.version");
        assert_eq!(property.type_.as_deref(), Some("number"));
        assert_eq!(property.default.as_deref(), Some("3"));
        assert_eq!(property.privacy, Privacy::Public);
    }

    #[test]
    fn published_property_metadata_is_extracted() {
        let scanned = scan_js(
            "/** @customElement x-props */\nclass XProps extends HTMLElement {\n  static get properties() {\n    return {\n      /** The title. */\n      title: { type: String, value: 'untitled', notify: true, reflectToAttribute: true },\n      _hidden: { type: Boolean, value: false, readOnly: true, observer: '_hiddenChanged' },\n      items: { type: Array, value: [] }\n    };\n  }\n}",
        );
        let ScannedFeature::Element(element) = &scanned.features[0] else {
            panic!("expected an element");
        };
        let properties = &element.class.properties;
        assert_eq!(properties.len(), 3);
        let title = &properties[0];
        assert_eq!(title.type_.as_deref(), Some("String"));
        assert_eq!(title.default.as_deref(), Some("\"untitled\""));
        assert!(title.notify);
        assert!(title.reflect_to_attribute);
        assert_eq!(title.description, "The title.");
        let hidden = &properties[1];
        assert_eq!(hidden.privacy, Privacy::Protected);
        assert!(hidden.read_only);
        assert_eq!(hidden.observer.as_deref(), Some("_hiddenChanged"));
        let items = &properties[2];
        assert_eq!(items.default.as_deref(), Some("[]"));
    }
}
