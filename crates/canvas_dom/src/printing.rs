use indextree::NodeId;

use crate::document::DomTree;
use crate::node::NodeKind;

fn escape(text: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for char_val in text.chars() {
        match char_val {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(char_val),
        }
    }
    out
}

fn write_node(tree: &DomTree, id: NodeId, out: &mut String) {
    let Some(data) = tree.data(id) else {
        return;
    };
    match &data.kind {
        NodeKind::Document => write_children(tree, id, out),
        NodeKind::Text { text } => out.push_str(&escape(text, false)),
        NodeKind::Element { tag } => {
            out.push('<');
            out.push_str(tag);
            // Attribute order is insertion order, matching what the host persists.
            for (name, value) in &data.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape(value, true));
                out.push('"');
            }
            out.push('>');
            write_children(tree, id, out);
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn write_children(tree: &DomTree, id: NodeId, out: &mut String) {
    for child in id.children(&tree.arena) {
        write_node(tree, child, out);
    }
}

pub(crate) fn outer_html(tree: &DomTree, id: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, id, &mut out);
    out
}

pub(crate) fn inner_html(tree: &DomTree, id: NodeId) -> String {
    let mut out = String::new();
    write_children(tree, id, &mut out);
    out
}
