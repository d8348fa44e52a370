use plate_core::dom::{DomElement, DomEvent, DomEventKind, DomSpec, ParseRule};
use plate_core::{Attrs, EditorView, ElementNode};

use crate::attrs::{CodeBlockAttrs, LANGUAGE_ATTR};
use crate::handlers;
use crate::{CodeBlockPlugin, KIND};

pub const CONTAINER_CLASS: &str = "code-block";
pub const LANGUAGE_DATA_ATTR: &str = "data-language";

pub fn dom_spec(plugin: &CodeBlockPlugin) -> DomSpec {
    let plugin = plugin.clone();
    DomSpec::new(KIND, move |node| to_dom(&plugin, node))
        .parse_rule(ParseRule::tag("pre").preserve_whitespace())
        .parse_rule(
            ParseRule::class(CONTAINER_CLASS)
                .preserve_whitespace()
                .content_element("code")
                .get_attrs(attrs_from_dom),
        )
}

/// Reads `data-language` verbatim. A missing attribute leaves `language` to the node default.
pub fn attrs_from_dom(el: &DomElement) -> Attrs {
    el.get_attr(LANGUAGE_DATA_ATTR)
        .map(|language| CodeBlockAttrs::new(language).to_attrs())
        .unwrap_or_default()
}

pub fn to_dom(plugin: &CodeBlockPlugin, node: &ElementNode) -> DomElement {
    let language = node.attr_str(LANGUAGE_ATTR).unwrap_or_default();

    let select = plugin.languages().options().fold(
        DomElement::new("select").on(DomEventKind::Change, handlers::handle_language_change),
        |select, (value, label)| {
            let option = DomElement::new("option").attr("value", value).text(label);
            let option = if value == language {
                option.attr("selected", "selected")
            } else {
                option
            };
            select.child(option)
        },
    );

    let copy_handler = {
        let plugin = plugin.clone();
        move |view: &mut EditorView, event: &DomEvent| handlers::handle_copy(view, event, &plugin)
    };
    let button = DomElement::new("button")
        .attr("type", "button")
        .text(plugin.options().dictionary.copy.as_str())
        .on(DomEventKind::Click, copy_handler);

    DomElement::new("div")
        .class(CONTAINER_CLASS)
        .attr(LANGUAGE_DATA_ATTR, language)
        .child(
            DomElement::new("div")
                .attr("contenteditable", "false")
                .child(select)
                .child(button),
        )
        .child(
            DomElement::new("pre")
                .child(DomElement::new("code").attr("spellcheck", "false").hole()),
        )
}
