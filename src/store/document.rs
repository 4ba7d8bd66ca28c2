//! Per-node document (`node.xml`)
//!
//! Converts one node's properties and content into an XML document and back.
//! Large attachments (images, embedded files) are written as sibling files in
//! the node directory and referenced by name from the document.

use crate::error::StorageError;
use crate::store::cache::StorageCache;
use crate::store::write_atomic;
use crate::sync::OffsetRange;
use crate::tree::{AnchorKind, AnchoredObject, Justification, NodeContent, NodeProperties, TreeNode};
use crate::types::NodeId;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::path::Path;

/// Output of rendering one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNode {
    pub document: Vec<u8>,
    /// Attachment file names referenced by the document
    pub attachments: Vec<String>,
}

/// Node-to-document conversion capability.
///
/// Implementations write attachments into `attachment_dir` and return the
/// document bytes; the caller decides where the document goes.
pub trait NodeRenderer {
    fn render(
        &self,
        node: &TreeNode,
        attachment_dir: &Path,
        cache: &mut StorageCache,
        range: OffsetRange,
    ) -> Result<RenderedNode, StorageError>;
}

/// Default renderer producing the `cherrytree`-rooted XML document
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlNodeRenderer;

impl NodeRenderer for XmlNodeRenderer {
    fn render(
        &self,
        node: &TreeNode,
        attachment_dir: &Path,
        cache: &mut StorageCache,
        range: OffsetRange,
    ) -> Result<RenderedNode, StorageError> {
        let names = cache.attachment_names(node).to_vec();
        let (text, kept) = node.content.window_parts(range);

        let mut attachments = Vec::new();
        for (index, _) in &kept {
            let anchor = &node.content.anchors[*index];
            if let (Some(name), Some(payload)) = (&names[*index], anchor.kind.attachment_payload()) {
                let path = attachment_dir.join(name);
                // Content-addressed: an existing file already holds these bytes.
                if !path.exists() {
                    write_atomic(&path, payload)?;
                }
                if !attachments.contains(name) {
                    attachments.push(name.clone());
                }
            }
        }

        let doc_path = attachment_dir.join(crate::types::NODE_XML);
        let mut writer = Writer::new(Vec::new());
        emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)), &doc_path)?;
        emit(&mut writer, Event::Start(BytesStart::new("cherrytree")), &doc_path)?;
        emit(&mut writer, Event::Start(node_element(node.id, &node.properties)), &doc_path)?;

        emit(&mut writer, Event::Start(BytesStart::new("rich_text")), &doc_path)?;
        emit(&mut writer, Event::Text(BytesText::new(&text)), &doc_path)?;
        emit(&mut writer, Event::End(BytesEnd::new("rich_text")), &doc_path)?;

        for (index, offset) in &kept {
            let anchor = &node.content.anchors[*index];
            let offset = offset.to_string();
            let justification = anchor.justification.as_str();
            match &anchor.kind {
                AnchorKind::Image { link, .. } => {
                    let mut elem = BytesStart::new("encoded_png");
                    elem.push_attribute(("char_offset", offset.as_str()));
                    elem.push_attribute(("justification", justification));
                    elem.push_attribute(("link", link.as_str()));
                    elem.push_attribute(("file", names[*index].as_deref().unwrap_or_default()));
                    emit(&mut writer, Event::Empty(elem), &doc_path)?;
                }
                AnchorKind::EmbeddedFile {
                    file_name, time, ..
                } => {
                    let time = time.to_string();
                    let mut elem = BytesStart::new("encoded_file");
                    elem.push_attribute(("char_offset", offset.as_str()));
                    elem.push_attribute(("justification", justification));
                    elem.push_attribute(("filename", file_name.as_str()));
                    elem.push_attribute(("time", time.as_str()));
                    elem.push_attribute(("file", names[*index].as_deref().unwrap_or_default()));
                    emit(&mut writer, Event::Empty(elem), &doc_path)?;
                }
                AnchorKind::CodeBox {
                    text,
                    syntax,
                    width,
                    height,
                    width_in_pixels,
                    highlight_brackets,
                    show_line_numbers,
                } => {
                    let width = width.to_string();
                    let height = height.to_string();
                    let mut elem = BytesStart::new("codebox");
                    elem.push_attribute(("char_offset", offset.as_str()));
                    elem.push_attribute(("justification", justification));
                    elem.push_attribute(("syntax_highlighting", syntax.as_str()));
                    elem.push_attribute(("width", width.as_str()));
                    elem.push_attribute(("height", height.as_str()));
                    elem.push_attribute(("width_in_pixels", flag(*width_in_pixels)));
                    elem.push_attribute(("highlight_brackets", flag(*highlight_brackets)));
                    elem.push_attribute(("show_line_numbers", flag(*show_line_numbers)));
                    emit(&mut writer, Event::Start(elem), &doc_path)?;
                    emit(&mut writer, Event::Text(BytesText::new(text)), &doc_path)?;
                    emit(&mut writer, Event::End(BytesEnd::new("codebox")), &doc_path)?;
                }
            }
        }

        emit(&mut writer, Event::End(BytesEnd::new("node")), &doc_path)?;
        emit(&mut writer, Event::End(BytesEnd::new("cherrytree")), &doc_path)?;

        Ok(RenderedNode {
            document: writer.into_inner(),
            attachments,
        })
    }
}

fn node_element(id: NodeId, props: &NodeProperties) -> BytesStart<'static> {
    let mut elem = BytesStart::new("node");
    let attrs: [(&str, String); 9] = [
        ("unique_id", id.to_string()),
        ("name", props.name.clone()),
        ("prog_lang", props.syntax.clone()),
        ("tags", props.tags.clone()),
        ("readonly", flag(props.is_read_only).to_string()),
        ("is_bold", flag(props.is_bold).to_string()),
        ("custom_icon_id", props.custom_icon_id.to_string()),
        ("ts_creation", props.ts_creation.to_string()),
        ("ts_lastsave", props.ts_lastsave.to_string()),
    ];
    for (key, value) in &attrs {
        elem.push_attribute((*key, value.as_str()));
    }
    // Absent means no color; an empty value is kept as given
    if let Some(foreground) = &props.foreground {
        elem.push_attribute(("foreground", foreground.as_str()));
    }
    elem
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>, path: &Path) -> Result<(), StorageError> {
    writer
        .write_event(event)
        .map_err(|e| StorageError::xml(path, e))
}

/// A node read back from its directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNode {
    pub id: NodeId,
    pub properties: NodeProperties,
    pub content: NodeContent,
}

/// Read `node.xml` from `node_dir`, loading attachments from the same directory
pub fn read_node_document(node_dir: &Path) -> Result<ParsedNode, StorageError> {
    let path = node_dir.join(crate::types::NODE_XML);
    let bytes = std::fs::read(&path).map_err(|source| StorageError::Read {
        path: path.clone(),
        source,
    })?;
    parse_node_document(&bytes, node_dir)
}

enum TextTarget {
    RichText,
    CodeBox(HashMap<String, String>),
}

/// Parse a node document; `node_dir` is where referenced attachments live
pub fn parse_node_document(bytes: &[u8], node_dir: &Path) -> Result<ParsedNode, StorageError> {
    let path = node_dir.join(crate::types::NODE_XML);
    let xml = std::str::from_utf8(bytes).map_err(|e| StorageError::xml(&path, e))?;
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut header: Option<(NodeId, NodeProperties)> = None;
    let mut content = NodeContent::default();
    let mut target: Option<TextTarget> = None;
    let mut buffer = String::new();

    loop {
        match reader.read_event().map_err(|e| StorageError::xml(&path, e))? {
            Event::Start(e) => match e.name().as_ref() {
                b"node" => header = Some(parse_header(&attributes(&e, &path)?, &path)?),
                b"rich_text" => {
                    buffer.clear();
                    target = Some(TextTarget::RichText);
                }
                b"codebox" => {
                    buffer.clear();
                    target = Some(TextTarget::CodeBox(attributes(&e, &path)?));
                }
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"node" => header = Some(parse_header(&attributes(&e, &path)?, &path)?),
                b"encoded_png" | b"encoded_file" => {
                    let attrs = attributes(&e, &path)?;
                    let is_image = e.name().as_ref() == b"encoded_png";
                    content.anchors.push(parse_attachment(&attrs, is_image, node_dir)?);
                }
                b"codebox" => content
                    .anchors
                    .push(codebox_anchor(&attributes(&e, &path)?, String::new())),
                _ => {}
            },
            Event::Text(t) => {
                if target.is_some() {
                    let text = t.unescape().map_err(|e| StorageError::xml(&path, e))?;
                    buffer.push_str(&text);
                }
            }
            Event::CData(c) => {
                if target.is_some() {
                    buffer.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => match (e.name().as_ref(), target.take()) {
                (b"rich_text", Some(TextTarget::RichText)) => {
                    content.text = std::mem::take(&mut buffer);
                }
                (b"codebox", Some(TextTarget::CodeBox(attrs))) => {
                    content
                        .anchors
                        .push(codebox_anchor(&attrs, std::mem::take(&mut buffer)));
                }
                (_, other) => target = other,
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let (id, properties) =
        header.ok_or_else(|| StorageError::malformed(&path, "missing <node> element"))?;
    Ok(ParsedNode {
        id,
        properties,
        content,
    })
}

fn attributes(e: &BytesStart<'_>, path: &Path) -> Result<HashMap<String, String>, StorageError> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| StorageError::xml(path, err))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| StorageError::xml(path, err))?
            .into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

fn text_attr(attrs: &HashMap<String, String>, key: &str) -> String {
    attrs.get(key).cloned().unwrap_or_default()
}

fn num_attr<N: std::str::FromStr + Default>(attrs: &HashMap<String, String>, key: &str) -> N {
    attrs
        .get(key)
        .and_then(|value| value.parse().ok())
        .unwrap_or_default()
}

fn bool_attr(attrs: &HashMap<String, String>, key: &str) -> bool {
    matches!(attrs.get(key).map(String::as_str), Some("1") | Some("true"))
}

fn parse_header(
    attrs: &HashMap<String, String>,
    path: &Path,
) -> Result<(NodeId, NodeProperties), StorageError> {
    let raw_id = attrs
        .get("unique_id")
        .ok_or_else(|| StorageError::malformed(path, "node without unique_id"))?;
    let id = raw_id
        .parse()
        .map_err(|_| StorageError::InvalidNodeId(raw_id.clone()))?;
    let properties = NodeProperties {
        name: text_attr(attrs, "name"),
        syntax: text_attr(attrs, "prog_lang"),
        tags: text_attr(attrs, "tags"),
        is_read_only: bool_attr(attrs, "readonly"),
        is_bold: bool_attr(attrs, "is_bold"),
        foreground: attrs.get("foreground").cloned(),
        custom_icon_id: num_attr(attrs, "custom_icon_id"),
        ts_creation: num_attr(attrs, "ts_creation"),
        ts_lastsave: num_attr(attrs, "ts_lastsave"),
    };
    Ok((id, properties))
}

fn parse_attachment(
    attrs: &HashMap<String, String>,
    is_image: bool,
    node_dir: &Path,
) -> Result<AnchoredObject, StorageError> {
    let file = text_attr(attrs, "file");
    if file.is_empty() || file.contains(['/', '\\']) || file == ".." {
        return Err(StorageError::malformed(
            node_dir,
            format!("invalid attachment reference '{}'", file),
        ));
    }
    let path = node_dir.join(&file);
    let data = std::fs::read(&path).map_err(|source| StorageError::Read { path, source })?;
    let kind = if is_image {
        AnchorKind::Image {
            png: data,
            link: text_attr(attrs, "link"),
        }
    } else {
        AnchorKind::EmbeddedFile {
            file_name: text_attr(attrs, "filename"),
            data,
            time: num_attr(attrs, "time"),
        }
    };
    Ok(AnchoredObject {
        char_offset: num_attr(attrs, "char_offset"),
        justification: Justification::parse(&text_attr(attrs, "justification")),
        kind,
    })
}

fn codebox_anchor(attrs: &HashMap<String, String>, text: String) -> AnchoredObject {
    AnchoredObject {
        char_offset: num_attr(attrs, "char_offset"),
        justification: Justification::parse(&text_attr(attrs, "justification")),
        kind: AnchorKind::CodeBox {
            text,
            syntax: text_attr(attrs, "syntax_highlighting"),
            width: num_attr(attrs, "width"),
            height: num_attr(attrs, "height"),
            width_in_pixels: bool_attr(attrs, "width_in_pixels"),
            highlight_brackets: bool_attr(attrs, "highlight_brackets"),
            show_line_numbers: bool_attr(attrs, "show_line_numbers"),
        },
    }
}
