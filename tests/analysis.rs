//! End-to-end analysis tests over an in-memory package.

use std::sync::Arc;

use textwrap::dedent;

use amalgam::analyzer::{Analyzer, AnalyzerOptions, FeatureQuery};
use amalgam::error::{AnalysisError, CancelToken};
use amalgam::features::{FeatureKind, Privacy};
use amalgam::loader::MemoryLoader;
use amalgam::warning::WarningCode;

fn analyzer_for(files: &[(&str, &str)]) -> Analyzer {
    let loader = Arc::new(MemoryLoader::new());
    loader.write_files(files.iter().map(|(url, contents)| (*url, dedent(contents))));
    Analyzer::new(AnalyzerOptions::new(loader))
}

fn analyzer_with_loader(files: &[(&str, &str)]) -> (Analyzer, Arc<MemoryLoader>) {
    let loader = Arc::new(MemoryLoader::new());
    loader.write_files(files.iter().map(|(url, contents)| (*url, dedent(contents))));
    (Analyzer::new(AnalyzerOptions::new(loader.clone())), loader)
}

const BEHAVIORS_HTML: &str = r#"
    <script>
    /**
     * The deepest behavior.
     * @polymerBehavior MyNamespace.SubBehavior
     */
    MyNamespace.SubBehavior = {
      properties: {
        deeplyInheritedProperty: { type: Array, value: [], notify: true }
      }
    };

    /**
     * @polymerBehavior MyNamespace.SimpleBehavior
     */
    MyNamespace.SimpleBehavior = {
      behaviors: [MyNamespace.SubBehavior],
      properties: {
        inheritPlease: { type: String }
      }
    };
    </script>
"#;

const ELEMENT_HTML: &str = r#"
    <link rel="import" href="behaviors.html">
    <dom-module id="my-element">
      <template>
        <slot name="content"></slot>
      </template>
    </dom-module>
    <script>
    /**
     * An element with deep behavior inheritance.
     * @customElement
     */
    class MyElement extends HTMLElement {
      static get behaviors() {
        return [MyNamespace.SimpleBehavior];
      }
      static get properties() {
        return {
          localProperty: { type: Boolean, value: true },
          _protectedProperty: { type: String, value: 'do cool stuff with me!' },
          __privateProperty: { type: String }
        };
      }
    }
    customElements.define('my-element', MyElement);
    </script>
"#;

#[test]
fn element_inherits_through_chained_behaviors() {
    let analyzer = analyzer_for(&[
        ("element.html", ELEMENT_HTML),
        ("behaviors.html", BEHAVIORS_HTML),
    ]);
    let analysis = analyzer.analyze(["element.html"], None).unwrap();
    let document = analysis.get_document("element.html").unwrap();

    let element = document.elements().next().expect("element resolved");
    assert_eq!(element.tag_name.as_deref(), Some("my-element"));
    let class = &element.class;

    let inherited = class.property("inheritPlease").expect("inherited property");
    assert_eq!(
        inherited.inherited_from.as_deref(),
        Some("MyNamespace.SimpleBehavior")
    );

    let deep = class
        .property("deeplyInheritedProperty")
        .expect("deeply inherited property");
    assert_eq!(
        deep.inherited_from.as_deref(),
        Some("MyNamespace.SubBehavior")
    );
    assert_eq!(deep.default.as_deref(), Some("[]"));
    assert!(deep.notify);

    let local = class.property("localProperty").expect("own property");
    assert_eq!(local.inherited_from, None);
    assert_eq!(local.default.as_deref(), Some("true"));
    assert_eq!(local.type_.as_deref(), Some("Boolean"));

    let protected = class.property("_protectedProperty").unwrap();
    assert_eq!(protected.privacy, Privacy::Protected);
    assert_eq!(
        protected.default.as_deref(),
        Some("\"do cool stuff with me!\"")
    );
    assert_eq!(
        class.property("__privateProperty").unwrap().privacy,
        Privacy::Private
    );

    // Attributes and change events mirror the public published properties
    // only.
    let attribute_names: Vec<&str> = class
        .attributes
        .iter()
        .map(|attribute| attribute.name.as_str())
        .collect();
    assert!(attribute_names.contains(&"local-property"));
    assert!(attribute_names.contains(&"inherit-please"));
    assert!(attribute_names.contains(&"deeply-inherited-property"));
    assert!(!attribute_names.iter().any(|name| name.contains("protected")));
    assert!(!attribute_names.iter().any(|name| name.contains("private")));

    let event_names: Vec<&str> = class.events.iter().map(|event| event.name.as_str()).collect();
    assert_eq!(event_names, ["deeply-inherited-property-changed"]);

    // The template's slot attaches through the dom-module id.
    assert_eq!(class.slots.len(), 1);
    assert_eq!(class.slots[0].name.as_deref(), Some("content"));
}

#[test]
fn subclass_inherits_and_overrides_superclass_methods() {
    let analyzer = analyzer_for(&[(
        "classes.js",
        r#"
        class Base {
          baseMethod() {}
          overriddenMethod() {}
        }

        class Subclass extends Base {
          overriddenMethod() {}
          subMethod() {}
        }
        "#,
    )]);
    let analysis = analyzer.analyze(["classes.js"], None).unwrap();
    let document = analysis.get_document("classes.js").unwrap();

    let subclass = document
        .classes()
        .find(|class| class.name.as_deref() == Some("Subclass"))
        .expect("Subclass resolved");

    let base_method = subclass.method("baseMethod").expect("inherited method");
    assert_eq!(base_method.inherited_from.as_deref(), Some("Base"));

    let overridden = subclass.method("overriddenMethod").expect("own override");
    assert_eq!(overridden.inherited_from, None);
    assert_eq!(subclass.method("subMethod").unwrap().inherited_from, None);
    assert_eq!(subclass.methods.len(), 3);
}

#[test]
fn cyclic_imports_scan_to_completion_without_warnings() {
    let analyzer = analyzer_for(&[
        (
            "a.html",
            "<link rel=\"import\" href=\"b.html\">\n<script>class A extends HTMLElement {}</script>\n",
        ),
        (
            "b.html",
            "<link rel=\"import\" href=\"a.html\">\n<script>class B extends HTMLElement {}</script>\n",
        ),
    ]);
    let analysis = analyzer.analyze(["a.html"], None).unwrap();

    for url in ["a.html", "b.html"] {
        let document = analysis.get_document(url).unwrap();
        assert_eq!(document.imports.len(), 1);
        assert!(
            document.imports[0].warnings.is_empty(),
            "no warnings expected on {url} imports"
        );
    }
}

#[test]
fn repeated_get_document_returns_the_same_document() {
    let analyzer = analyzer_for(&[("a.js", "class A {}\n")]);
    let analysis = analyzer.analyze(["a.js"], None).unwrap();
    let first = analysis.get_document("a.js").unwrap();
    let second = analysis.get_document("a.js").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn files_changed_invalidates_importers_but_not_bystanders() {
    let (analyzer, loader) = analyzer_with_loader(&[
        ("app.html", "<link rel=\"import\" href=\"mid.html\">\n"),
        ("mid.html", "<link rel=\"import\" href=\"leaf.html\">\n"),
        ("leaf.html", "<script>var leaf = 1;</script>\n"),
        ("island.html", "<script>var island = 1;</script>\n"),
    ]);
    let before = analyzer
        .analyze(["app.html", "island.html"], None)
        .unwrap();
    let app_before = before.get_document("app.html").unwrap();
    let island_before = before.get_document("island.html").unwrap();

    loader.write_file("leaf.html", "<script>var leaf = 2;</script>\n");
    analyzer.files_changed(["leaf.html"]);

    let after = analyzer
        .analyze(["app.html", "island.html"], None)
        .unwrap();
    let app_after = after.get_document("app.html").unwrap();
    let island_after = after.get_document("island.html").unwrap();

    assert!(
        !Arc::ptr_eq(&app_before, &app_after),
        "transitive importers get fresh documents"
    );
    assert!(
        Arc::ptr_eq(&island_before, &island_after),
        "unrelated documents are untouched"
    );
}

#[test]
fn an_empty_invalidation_is_a_no_op_fork() {
    let analyzer = analyzer_for(&[("a.js", "class A {}\n")]);
    let before = analyzer.analyze(["a.js"], None).unwrap();
    let doc_before = before.get_document("a.js").unwrap();

    analyzer.files_changed(Vec::<String>::new());
    let after = analyzer.analyze(["a.js"], None).unwrap();
    let doc_after = after.get_document("a.js").unwrap();

    assert!(after.generation() > before.generation());
    assert!(Arc::ptr_eq(&doc_before, &doc_after));
}

#[test]
fn cancellation_is_isolated_from_concurrent_analyses() {
    let analyzer = analyzer_for(&[(
        "vanilla-elements.js",
        "class VanillaElement extends HTMLElement {}\ncustomElements.define('vanilla-element', VanillaElement);\n",
    )]);
    let cancelled = CancelToken::new();
    cancelled.cancel();

    std::thread::scope(|scope| {
        let doomed = scope.spawn(|| {
            analyzer.analyze(["vanilla-elements.js"], Some(&cancelled))
        });
        let healthy = scope.spawn(|| analyzer.analyze(["vanilla-elements.js"], None));

        let doomed = doomed.join().expect("thread join");
        assert!(matches!(doomed, Err(AnalysisError::Cancelled)));

        let healthy = healthy.join().expect("thread join");
        let analysis = healthy.expect("non-cancelled analysis succeeds");
        assert!(analysis.get_document("vanilla-elements.js").is_ok());
    });

    // The analyzer remains usable afterwards.
    let analysis = analyzer.analyze(["vanilla-elements.js"], None).unwrap();
    let document = analysis.get_document("vanilla-elements.js").unwrap();
    assert_eq!(document.elements().count(), 1);
}

#[test]
fn unreachable_roots_surface_unable_to_load_warnings() {
    let analyzer = analyzer_for(&[]);
    let analysis = analyzer.analyze(["missing.html"], None).unwrap();
    let warning = analysis.get_document("missing.html").unwrap_err();
    assert_eq!(warning.code, WarningCode::UnableToLoad);
}

#[test]
fn parse_failures_fail_the_document_but_not_its_importer() {
    let analyzer = analyzer_for(&[
        (
            "importer.html",
            "<script src=\"broken.js\"></script>\n<script>class Fine {}</script>\n",
        ),
        ("broken.js", "class {\n"),
    ]);
    let analysis = analyzer.analyze(["importer.html"], None).unwrap();

    // The broken document itself fails with its parse warning...
    let warning = analysis.get_document("broken.js").unwrap_err();
    assert_eq!(warning.code, WarningCode::ParseError);

    // ...while the importer resolves, carrying the failure on its import
    // feature.
    let importer = analysis.get_document("importer.html").unwrap();
    assert_eq!(importer.imports.len(), 1);
    let import_warnings = &importer.imports[0].warnings;
    assert_eq!(import_warnings.len(), 1);
    assert_eq!(import_warnings[0].code, WarningCode::ParseError);
    assert_eq!(import_warnings[0].range.file, "importer.html");
}

#[test]
fn feature_queries_traverse_the_import_closure() {
    let analyzer = analyzer_for(&[
        ("root.html", "<link rel=\"import\" href=\"dep.html\">\n"),
        (
            "dep.html",
            "<script>\nclass XDep extends HTMLElement {}\ncustomElements.define('x-dep', XDep);\n</script>\n",
        ),
        (
            "bower_components/ext/ext.html",
            "<script>\nclass XExt extends HTMLElement {}\ncustomElements.define('x-ext', XExt);\n</script>\n",
        ),
    ]);
    let analysis = analyzer.analyze(["root.html"], None).unwrap();

    let local_only = analysis.get_features(
        "root.html",
        &FeatureQuery::of_kind(FeatureKind::Element),
    );
    assert!(local_only.is_empty(), "root itself declares no elements");

    let imported = analysis.get_features(
        "root.html",
        &FeatureQuery::of_kind(FeatureKind::Element).imported(),
    );
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].identifier().as_deref(), Some("x-dep"));

    let by_id = analysis.get_features(
        "root.html",
        &FeatureQuery::of_kind(FeatureKind::Element)
            .with_id("x-dep")
            .imported(),
    );
    assert_eq!(by_id.len(), 1);
}

#[test]
fn external_packages_are_skipped_unless_requested() {
    let analyzer = analyzer_for(&[
        (
            "root.html",
            "<link rel=\"import\" href=\"bower_components/ext/ext.html\">\n",
        ),
        (
            "bower_components/ext/ext.html",
            "<script>\nclass XExt extends HTMLElement {}\ncustomElements.define('x-ext', XExt);\n</script>\n",
        ),
    ]);
    let analysis = analyzer.analyze(["root.html"], None).unwrap();

    let internal = analysis.get_features(
        "root.html",
        &FeatureQuery::of_kind(FeatureKind::Element).imported(),
    );
    assert!(internal.is_empty());

    let external = analysis.get_features(
        "root.html",
        &FeatureQuery::of_kind(FeatureKind::Element)
            .imported()
            .external_packages(),
    );
    assert_eq!(external.len(), 1);
    assert_eq!(external[0].identifier().as_deref(), Some("x-ext"));
}

#[test]
fn lazy_edges_pull_in_implicit_imports() {
    let loader = Arc::new(MemoryLoader::new());
    loader.write_files([
        ("root.html", "<script>var root = 1;</script>\n".to_string()),
        (
            "implicit.html",
            "<script>\nclass XImplicit extends HTMLElement {}\ncustomElements.define('x-implicit', XImplicit);\n</script>\n"
                .to_string(),
        ),
    ]);
    let analyzer = Analyzer::new(AnalyzerOptions::new(loader).with_lazy_edges([(
        "root.html".to_string(),
        vec!["implicit.html".to_string()],
    )]));

    let analysis = analyzer.analyze(["root.html"], None).unwrap();
    // The implicit target is scanned and resolvable even though no import
    // feature exists for it.
    let document = analysis.get_document("implicit.html").unwrap();
    assert_eq!(document.elements().count(), 1);
    let root = analysis.get_document("root.html").unwrap();
    assert!(root.imports.is_empty());
}

#[test]
fn analyze_returns_the_same_snapshot_when_fully_cached() {
    let analyzer = analyzer_for(&[("a.js", "class A {}\n")]);
    let first = analyzer.analyze(["a.js"], None).unwrap();
    let second = analyzer.analyze(["a.js"], None).unwrap();
    assert_eq!(first.generation(), second.generation());
}

#[test]
fn clear_caches_forgets_everything() {
    let (analyzer, loader) = analyzer_with_loader(&[("a.js", "class A {}\n")]);
    let before = analyzer.analyze(["a.js"], None).unwrap();
    let doc_before = before.get_document("a.js").unwrap();

    loader.write_file("a.js", "class A {}\nclass B {}\n");
    analyzer.clear_caches();

    let after = analyzer.analyze(["a.js"], None).unwrap();
    let doc_after = after.get_document("a.js").unwrap();
    assert!(!Arc::ptr_eq(&doc_before, &doc_after));
    assert_eq!(doc_after.classes().count(), 2);
}
