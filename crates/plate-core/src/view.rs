use crate::core::{ApplyError, Document, Editor, Point};
use crate::dom::{DomElement, DomEvent, render_document};
use crate::ops::{Path, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coords {
    pub top: f32,
    pub left: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(top: f32, left: f32, width: f32, height: f32) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Coords {
        Coords {
            top: self.top,
            left: self.left,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosAtCoords {
    pub point: Point,
    pub inside: Option<Path>,
}

pub trait PositionResolver: Send + Sync {
    fn pos_at_coords(&self, doc: &Document, coords: Coords) -> Option<PosAtCoords>;
}

type DispatchObserver = Box<dyn Fn(&Transaction) + Send + Sync>;

pub struct EditorView {
    editor: Editor,
    resolver: Box<dyn PositionResolver>,
    observers: Vec<DispatchObserver>,
}

impl EditorView {
    pub fn new(editor: Editor, resolver: impl PositionResolver + 'static) -> Self {
        Self {
            editor,
            resolver: Box::new(resolver),
            observers: Vec::new(),
        }
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    pub fn doc(&self) -> &Document {
        self.editor.doc()
    }

    pub fn observe_dispatch(&mut self, observer: impl Fn(&Transaction) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn pos_at_coords(&self, coords: Coords) -> Option<PosAtCoords> {
        self.resolver.pos_at_coords(self.editor.doc(), coords)
    }

    pub fn dispatch(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        for observer in &self.observers {
            observer(&tx);
        }
        self.editor.apply(tx)
    }

    pub fn render(&self) -> DomElement {
        render_document(self.editor.registry(), self.editor.doc())
    }

    pub fn dispatch_event(&mut self, element: &DomElement, event: &DomEvent) -> usize {
        let listeners: Vec<_> = element.listeners(event.kind).cloned().collect();
        for listener in &listeners {
            listener(self, event);
        }
        listeners.len()
    }
}
