#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use plate_code_block::{
    Clipboard, CodeBlockAttrs, CodeBlockOptions, CodeBlockPlugin, KIND, Notifier,
};
use plate_core::{
    Coords, Document, Editor, Node, PlatePlugin, PluginRegistry, Point, PosAtCoords,
    PositionResolver, Selection,
};

#[derive(Default)]
pub struct RecordingClipboard {
    pub writes: Mutex<Vec<String>>,
}

impl Clipboard for RecordingClipboard {
    fn write_text(&self, text: &str) {
        self.writes.lock().unwrap().push(text.to_string());
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub toasts: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn show_toast(&self, message: &str) {
        self.toasts.lock().unwrap().push(message.to_string());
    }
}

/// Answers every hit test with the same position.
pub struct FixedResolver(pub Option<PosAtCoords>);

impl FixedResolver {
    pub fn inside(block: usize) -> Self {
        Self(Some(PosAtCoords {
            point: Point::new(vec![block, 0], 0),
            inside: Some(vec![block]),
        }))
    }

    pub fn nowhere() -> Self {
        Self(None)
    }
}

impl PositionResolver for FixedResolver {
    fn pos_at_coords(&self, _doc: &Document, _coords: Coords) -> Option<PosAtCoords> {
        self.0.clone()
    }
}

pub struct Harness {
    pub plugin: CodeBlockPlugin,
    pub clipboard: Arc<RecordingClipboard>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(options: CodeBlockOptions) -> Self {
        let clipboard = Arc::new(RecordingClipboard::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let plugin = CodeBlockPlugin::new(options, clipboard.clone()).with_notifier(notifier.clone());
        Self {
            plugin,
            clipboard,
            notifier,
        }
    }

    pub fn registry(&self) -> PluginRegistry {
        PluginRegistry::with_plugins([Box::new(self.plugin.clone()) as Box<dyn PlatePlugin>])
            .unwrap()
    }

    pub fn editor(&self, children: Vec<Node>, caret: Point) -> Editor {
        Editor::new(
            Document::new(children),
            Selection::collapsed(caret),
            self.registry(),
        )
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(CodeBlockOptions::default())
    }
}

pub fn code_block(language: &str, text: &str) -> Node {
    Node::element(KIND, CodeBlockAttrs::new(language).to_attrs(), text)
}
