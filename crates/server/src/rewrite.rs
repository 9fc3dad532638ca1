//! Serve-time HTML transformation.
//!
//! Link-bearing attributes are rewritten so every target points back into
//! the cache namespace, and a service-worker registration script is
//! injected as the first child of the document so runtime fetches get
//! intercepted too. The stored body is never touched; rewriting happens
//! on every HTML response served, which lets the policy here evolve
//! without re-caching anything.

use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::RefCell;
use std::rc::Rc;
use url::Url;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Registration stub injected into every served HTML page. The worker
/// itself is served from /service-worker.js.
pub const REGISTRATION_SCRIPT: &str = r#"
if ('serviceWorker' in navigator) {
    window.addEventListener('load', function() {
        navigator.serviceWorker.register('../service-worker.js').then(function(registration) {
            console.log('Service worker registered with scope: ', registration.scope);
        }, function(err) {
            console.log('Service worker registration failed: ', err);
        });
    });
}
"#;

/// Attributes rewritten per tag.
fn link_attrs(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" | "link" => &["href"],
        "script" | "img" => &["src"],
        "meta" => &["content"],
        _ => &[],
    }
}

/// Rewrite an HTML body so its links point into the cache.
///
/// `resource_url` is the page's own source URL, used to absolutize
/// relative references. `scheme` and `host` name the cache instance as
/// the client reached it.
pub fn rewrite_html(
    body: &[u8],
    resource_url: &Url,
    scheme: &str,
    host: &str,
) -> std::io::Result<Vec<u8>> {
    let mut input = body;
    let dom = parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut input)?;

    inject_registration_script(&dom.document);
    visit(&dom.document, resource_url, scheme, host);

    let mut out = Vec::new();
    let document: SerializableHandle = dom.document.clone().into();
    serialize(
        &mut out,
        &document,
        SerializeOpts {
            traversal_scope: TraversalScope::ChildrenOnly(None),
            ..SerializeOpts::default()
        },
    )?;
    Ok(out)
}

/// Translate one attribute value into its cached-URL form.
fn translate_link(
    value: &str,
    base: &Url,
    scheme: &str,
    host: &str,
) -> Result<String, url::ParseError> {
    let absolute = base.join(value)?;
    Ok(format!(
        "{scheme}://{host}/c/{}",
        knox_core::encoder::encode(absolute.as_str())
    ))
}

fn visit(node: &Handle, base: &Url, scheme: &str, host: &str) {
    if let NodeData::Element { name, attrs, .. } = &node.data {
        let wanted = link_attrs(name.local.as_ref());
        if !wanted.is_empty() {
            for attr in attrs.borrow_mut().iter_mut() {
                if !wanted.contains(&attr.name.local.as_ref()) {
                    continue;
                }
                match translate_link(attr.value.as_ref(), base, scheme, host) {
                    Ok(translated) => attr.value = translated.as_str().into(),
                    // One unparseable value must not fail the response.
                    Err(e) => tracing::debug!(
                        value = %attr.value,
                        error = %e,
                        "leaving attribute unrewritten"
                    ),
                }
            }
        }
    }
    for child in node.children.borrow().iter() {
        visit(child, base, scheme, host);
    }
}

/// Insert the registration `<script>` as the first child of the document.
fn inject_registration_script(document: &Handle) {
    let script = Node::new(NodeData::Element {
        name: QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from("script"),
        ),
        attrs: RefCell::new(Vec::new()),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    });
    let text = Node::new(NodeData::Text {
        contents: RefCell::new(REGISTRATION_SCRIPT.into()),
    });
    text.parent.set(Some(Rc::downgrade(&script)));
    script.children.borrow_mut().push(text);
    script.parent.set(Some(Rc::downgrade(document)));
    document.children.borrow_mut().insert(0, script);
}
