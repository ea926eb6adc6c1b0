//! Tests for the emitted JSON summary surface.

use std::sync::Arc;

use textwrap::dedent;

use amalgam::analyzer::{Analyzer, AnalyzerOptions};
use amalgam::loader::MemoryLoader;
use amalgam::summary;

fn analyze(files: &[(&str, &str)], entries: &[&str]) -> amalgam::Analysis {
    let loader = Arc::new(MemoryLoader::new());
    loader.write_files(files.iter().map(|(url, contents)| (*url, dedent(contents))));
    let analyzer = Analyzer::new(AnalyzerOptions::new(loader));
    analyzer.analyze(entries, None).expect("analysis succeeds")
}

#[test]
fn summary_nests_features_under_their_namespaces() {
    let analysis = analyze(
        &[(
            "app.js",
            r#"
            /**
             * Application helpers.
             * @namespace
             */
            App = {};

            /**
             * @mixinFunction
             * @memberof App
             */
            App.ToggleMixin = (base) => class extends base {
              static get properties() {
                return { toggled: { type: Boolean, value: false } };
              }
            };

            /**
             * Greets.
             * @memberof App
             * @param {string} name who to greet
             * @returns {string} the greeting
             */
            function greet(name) { return 'hi ' + name; }

            /** @customElement x-plain */
            class XPlain extends HTMLElement {}
            "#,
        )],
        &["app.js"],
    );

    let emitted = summary::emit(&analysis).expect("summary validates");
    assert_eq!(emitted.schema_version, "1.0.0");

    // Top-level element, namespaced mixin and function.
    assert_eq!(emitted.elements.len(), 1);
    assert_eq!(emitted.elements[0].tagname.as_deref(), Some("x-plain"));

    assert_eq!(emitted.namespaces.len(), 1);
    let app = &emitted.namespaces[0];
    assert_eq!(app.name, "App");
    assert_eq!(app.description, "Application helpers.");
    assert_eq!(app.mixins.len(), 1);
    assert_eq!(app.mixins[0].name.as_deref(), Some("App.ToggleMixin"));
    assert_eq!(app.functions.len(), 1);
    assert_eq!(app.functions[0].name, "App.greet");
    assert_eq!(app.functions[0].params[0].type_.as_deref(), Some("string"));

    // The mixin's published property also surfaces as an attribute.
    let mixin = &app.mixins[0];
    assert_eq!(mixin.properties[0].name, "toggled");
    assert_eq!(mixin.attributes[0].name, "toggled");
}

#[test]
fn behaviors_land_under_polymer_metadata() {
    let analysis = analyze(
        &[(
            "behavior.js",
            r#"
            /**
             * A reusable behavior.
             * @polymerBehavior Shared.NiftyBehavior
             */
            Shared.NiftyBehavior = {
              properties: {
                nifty: { type: Boolean, value: true, notify: true }
              }
            };
            "#,
        )],
        &["behavior.js"],
    );

    let emitted = summary::emit(&analysis).expect("summary validates");
    let value = serde_json::to_value(&emitted).unwrap();
    let behaviors = value
        .pointer("/metadata/polymer/behaviors")
        .and_then(|v| v.as_array())
        .expect("behaviors recorded under metadata.polymer");
    assert_eq!(behaviors.len(), 1);
    assert_eq!(behaviors[0]["name"], "Shared.NiftyBehavior");
    assert_eq!(behaviors[0]["properties"][0]["name"], "nifty");
    assert_eq!(
        behaviors[0]["properties"][0]["metadata"]["polymer"]["notify"],
        true
    );
    assert_eq!(behaviors[0]["events"][0]["name"], "nifty-changed");
}

#[test]
fn inherited_member_ranges_are_relative_to_the_elements_directory() {
    let analysis = analyze(
        &[
            (
                "app/element.html",
                r#"
                <link rel="import" href="../shared/base.html">
                <script>
                /** @customElement */
                class DerivedElement extends SharedBase {
                  static get properties() {
                    return { own: { type: String } };
                  }
                }
                customElements.define('derived-element', DerivedElement);
                </script>
                "#,
            ),
            (
                "shared/base.html",
                r#"
                <script>
                class SharedBase extends HTMLElement {
                  sharedMethod() {}
                }
                </script>
                "#,
            ),
        ],
        &["app/element.html"],
    );

    let emitted = summary::emit(&analysis).expect("summary validates");
    let element = emitted
        .elements
        .iter()
        .find(|element| element.tagname.as_deref() == Some("derived-element"))
        .expect("derived element emitted");
    assert_eq!(element.path, "app/element.html");

    let inherited = element
        .methods
        .iter()
        .find(|method| method.name == "sharedMethod")
        .expect("inherited method emitted");
    assert_eq!(inherited.inherited_from.as_deref(), Some("SharedBase"));
    let range = inherited.source_range.as_ref().expect("range kept");
    assert_eq!(range.file, "../shared/base.html");

    // Own members keep package-relative files.
    let own = element
        .properties
        .iter()
        .find(|property| property.name == "own")
        .expect("own property emitted");
    assert_eq!(
        own.source_range.as_ref().unwrap().file,
        "app/element.html"
    );
}

#[test]
fn external_package_documents_are_not_emitted() {
    let analysis = analyze(
        &[
            (
                "root.html",
                "<link rel=\"import\" href=\"bower_components/dep/dep.html\">\n",
            ),
            (
                "bower_components/dep/dep.html",
                "<script>\nclass XDep extends HTMLElement {}\ncustomElements.define('x-dep', XDep);\n</script>\n",
            ),
        ],
        &["root.html"],
    );

    // Resolve the external document so it is present in the snapshot, then
    // confirm the summary still excludes it.
    let _ = analysis.get_document("bower_components/dep/dep.html");
    let emitted = summary::emit(&analysis).expect("summary validates");
    assert!(emitted.elements.is_empty());
}

#[test]
fn emitted_json_uses_the_schema_key_names() {
    let analysis = analyze(
        &[(
            "el.js",
            r#"
            /** @customElement x-el */
            class XEl extends HTMLElement {
              static get properties() {
                return { fooBar: { type: String, value: 'x', notify: true } };
              }
            }
            "#,
        )],
        &["el.js"],
    );

    let emitted = summary::emit(&analysis).expect("summary validates");
    let value = serde_json::to_value(&emitted).unwrap();

    assert_eq!(value["schema_version"], "1.0.0");
    let element = &value["elements"][0];
    assert_eq!(element["tagname"], "x-el");
    assert_eq!(element["path"], "el.js");
    assert!(element["sourceRange"]["file"].is_string());
    assert!(element["sourceRange"]["start"]["line"].is_number());

    let property = &element["properties"][0];
    assert_eq!(property["name"], "fooBar");
    assert_eq!(property["defaultValue"], "\"x\"");
    assert!(property.get("inheritedFrom").is_none());

    let attribute = &element["attributes"][0];
    assert_eq!(attribute["name"], "foo-bar");

    let event = &element["events"][0];
    assert_eq!(event["name"], "foo-bar-changed");
    assert_eq!(event["type"], "CustomEvent");
}
