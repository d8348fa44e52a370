use std::sync::{Arc, Mutex};

use plate_core::dom::{DomElement, DomEvent, DomEventKind, parse_dom, render_document};
use plate_core::{
    Coords, Document, Editor, Node, Op, PluginRegistry, PosAtCoords, PositionResolver, Rect,
    Transaction,
};
use pretty_assertions::assert_eq;

struct NoHits;

impl PositionResolver for NoHits {
    fn pos_at_coords(&self, _doc: &Document, _coords: Coords) -> Option<PosAtCoords> {
        None
    }
}

#[test]
fn renders_paragraphs_into_editor_root() {
    let registry = PluginRegistry::core();
    let doc = Document::new(vec![Node::paragraph("a < b"), Node::paragraph("c")]);

    assert_eq!(
        render_document(&registry, &doc).to_html(),
        "<div class=\"plate-editor\"><p>a &lt; b</p><p>c</p></div>"
    );
}

#[test]
fn parse_dom_collapses_whitespace_in_paragraphs() {
    let registry = PluginRegistry::core();
    let root = DomElement::new("div")
        .child(DomElement::new("p").text("  spaced \n  out "))
        .child(DomElement::new("blockquote").text("quoted"));

    assert_eq!(
        parse_dom(&registry, &root),
        Document::new(vec![Node::paragraph("spaced out"), Node::paragraph("quoted")])
    );
}

#[test]
fn dispatch_notifies_observers_then_applies() {
    let editor = Editor::with_registry(PluginRegistry::core());
    let mut view = plate_core::EditorView::new(editor, NoHits);
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = seen.clone();
        view.observe_dispatch(move |tx| seen.lock().unwrap().push(tx.meta.source.clone()));
    }

    let tx = Transaction::new(vec![Op::InsertText {
        path: vec![0, 0],
        offset: 0,
        text: "hi".into(),
    }])
    .source("test");
    view.dispatch(tx).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![Some("test".to_string())]);
    assert_eq!(
        view.doc(),
        &Document::new(vec![Node::paragraph("hi")])
    );
}

#[test]
fn dispatch_event_runs_listeners_of_matching_kind() {
    let mut view = plate_core::EditorView::new(Editor::with_registry(PluginRegistry::core()), NoHits);
    let button = DomElement::new("button").on(DomEventKind::Click, |view, _event| {
        let tx = Transaction::new(vec![Op::InsertText {
            path: vec![0, 0],
            offset: 0,
            text: "clicked".into(),
        }]);
        view.dispatch(tx).unwrap();
    });

    let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert_eq!(view.dispatch_event(&button, &DomEvent::change("x", rect)), 0);
    assert_eq!(view.dispatch_event(&button, &DomEvent::click(rect)), 1);
    assert_eq!(view.doc(), &Document::new(vec![Node::paragraph("clicked")]));
}
