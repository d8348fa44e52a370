mod common;

use std::sync::{Arc, Mutex};

use plate_code_block::{
    CodeBlockAttrs, KIND, LANGUAGE_ATTR, LANGUAGE_CHANGE_SOURCE, language_at,
};
use plate_core::dom::{DomElement, DomEvent};
use plate_core::{
    AttrPatch, EditorView, ElementNode, Node, Op, Point, Rect, Selection, Transaction,
};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{FixedResolver, Harness, code_block};

const RECT: Rect = Rect {
    top: 40.0,
    left: 12.0,
    width: 80.0,
    height: 20.0,
};

fn tagged_code_block(language: &str, text: &str) -> Node {
    let mut attrs = CodeBlockAttrs::new(language).to_attrs();
    attrs.insert("id".into(), json!("snippet-1"));
    Node::element(KIND, attrs, text)
}

fn setup(
    harness: &Harness,
    resolver: FixedResolver,
) -> (EditorView, Arc<Mutex<Vec<Transaction>>>) {
    let editor = harness.editor(
        vec![
            Node::paragraph("intro"),
            tagged_code_block("python", "print(1)\nprint(2)"),
        ],
        Point::new(vec![0, 0], 0),
    );
    let mut view = EditorView::new(editor, resolver);
    let dispatched = Arc::new(Mutex::new(Vec::new()));
    {
        let dispatched = dispatched.clone();
        view.observe_dispatch(move |tx| dispatched.lock().unwrap().push(tx.clone()));
    }
    (view, dispatched)
}

fn control(view: &EditorView, block: usize, tag: &str) -> DomElement {
    let root = view.render();
    let block = root.elements().nth(block).unwrap();
    block.find_by_tag(tag).unwrap().clone()
}

fn block(view: &EditorView, ix: usize) -> ElementNode {
    view.doc().element(&[ix]).unwrap().clone()
}

#[test]
fn language_change_sets_only_language() {
    let harness = Harness::default();
    let (mut view, dispatched) = setup(&harness, FixedResolver::inside(1));
    let before = block(&view, 1);

    let select = control(&view, 1, "select");
    assert_eq!(
        view.dispatch_event(&select, &DomEvent::change("ruby", RECT)),
        1
    );

    let dispatched = dispatched.lock().unwrap();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(
        dispatched[0].ops,
        vec![Op::SetNodeAttrs {
            path: vec![1],
            patch: AttrPatch::set(LANGUAGE_ATTR, "ruby"),
        }]
    );
    assert_eq!(dispatched[0].meta.source.as_deref(), Some(LANGUAGE_CHANGE_SOURCE));

    let after = block(&view, 1);
    assert_eq!(after.attr_str(LANGUAGE_ATTR), Some("ruby"));
    assert_eq!(after.attrs.get("id"), before.attrs.get("id"));
    assert_eq!(after.children, before.children);
    assert_eq!(view.doc().children[0], Node::paragraph("intro"));
}

#[test]
fn language_change_to_none_stores_empty_string() {
    let harness = Harness::default();
    let (mut view, _) = setup(&harness, FixedResolver::inside(1));

    let select = control(&view, 1, "select");
    view.dispatch_event(&select, &DomEvent::change("", RECT));

    assert_eq!(language_at(view.doc(), &[1]).as_deref(), Some(""));
}

#[test]
fn language_change_without_position_dispatches_nothing() {
    let harness = Harness::default();
    let (mut view, dispatched) = setup(&harness, FixedResolver::nowhere());
    let doc_before = view.doc().clone();

    let select = control(&view, 1, "select");
    view.dispatch_event(&select, &DomEvent::change("ruby", RECT));

    assert!(dispatched.lock().unwrap().is_empty());
    assert_eq!(view.doc(), &doc_before);
}

#[test]
fn language_change_outside_code_block_dispatches_nothing() {
    let harness = Harness::default();
    let (mut view, dispatched) = setup(&harness, FixedResolver::inside(0));

    let select = control(&view, 1, "select");
    view.dispatch_event(&select, &DomEvent::change("ruby", RECT));

    assert!(dispatched.lock().unwrap().is_empty());
}

#[test]
fn copy_writes_whole_block_once_despite_partial_selection() {
    let harness = Harness::default();
    let (mut view, dispatched) = setup(&harness, FixedResolver::inside(1));
    view.editor_mut().set_selection(Selection {
        anchor: Point::new(vec![1, 0], 2),
        focus: Point::new(vec![1, 0], 5),
    });

    let button = control(&view, 1, "button");
    view.dispatch_event(&button, &DomEvent::click(RECT));

    assert_eq!(
        *harness.clipboard.writes.lock().unwrap(),
        vec!["print(1)\nprint(2)".to_string()]
    );
    assert_eq!(
        *harness.notifier.toasts.lock().unwrap(),
        vec!["Copied to clipboard".to_string()]
    );
    assert!(dispatched.lock().unwrap().is_empty());
}

#[test]
fn copy_reads_the_block_as_it_is_now() {
    let harness = Harness::default();
    let (mut view, _) = setup(&harness, FixedResolver::inside(1));
    let button = control(&view, 1, "button");

    view.dispatch(Transaction::new(vec![Op::InsertText {
        path: vec![1, 0],
        offset: 0,
        text: "# edited\n".into(),
    }]))
    .unwrap();
    view.dispatch_event(&button, &DomEvent::click(RECT));

    assert_eq!(
        *harness.clipboard.writes.lock().unwrap(),
        vec!["# edited\nprint(1)\nprint(2)".to_string()]
    );
}

#[test]
fn copy_without_position_writes_nothing() {
    let harness = Harness::default();
    let (mut view, _) = setup(&harness, FixedResolver::nowhere());

    let button = control(&view, 1, "button");
    view.dispatch_event(&button, &DomEvent::click(RECT));

    assert!(harness.clipboard.writes.lock().unwrap().is_empty());
    assert!(harness.notifier.toasts.lock().unwrap().is_empty());
}

#[test]
fn copy_resolves_from_caret_when_hit_test_has_no_node() {
    let harness = Harness::default();
    let resolver = FixedResolver(Some(plate_core::PosAtCoords {
        point: Point::new(vec![1, 0], 3),
        inside: None,
    }));
    let (mut view, _) = setup(&harness, resolver);

    let button = control(&view, 1, "button");
    view.dispatch_event(&button, &DomEvent::click(RECT));

    assert_eq!(harness.clipboard.writes.lock().unwrap().len(), 1);
}

#[test]
fn copy_without_notifier_is_silent() {
    let clipboard = Arc::new(common::RecordingClipboard::default());
    let plugin = plate_code_block::CodeBlockPlugin::new(Default::default(), clipboard.clone());
    let registry = plate_core::PluginRegistry::with_plugins([
        Box::new(plugin) as Box<dyn plate_core::PlatePlugin>
    ])
    .unwrap();
    let editor = plate_core::Editor::new(
        plate_core::Document::new(vec![code_block("bash", "ls")]),
        Selection::collapsed(Point::new(vec![0, 0], 0)),
        registry,
    );
    let mut view = EditorView::new(editor, FixedResolver::inside(0));

    let button = control(&view, 0, "button");
    view.dispatch_event(&button, &DomEvent::click(RECT));

    assert_eq!(*clipboard.writes.lock().unwrap(), vec!["ls".to_string()]);
}
