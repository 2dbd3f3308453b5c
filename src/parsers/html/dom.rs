use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::parse_document;
use html5ever::tendril::{format_tendril, TendrilSink};
use html5ever::tree_builder::create_element;
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: String) -> RcDom {
    let s: String;

    if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
        let (string, _, _) = encoding.decode(data);
        s = string.to_string();
    } else {
        s = String::from_utf8_lossy(data).to_string();
    }

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
        .unwrap()
}

/// 查找指定路径的DOM节点
pub fn find_nodes(node: &Handle, node_names: Vec<&str>) -> Vec<Handle> {
    assert!(!node_names.is_empty());

    let mut found_nodes = Vec::new();
    let node_name = node_names[0];

    if node_names.len() == 1 {
        if let NodeData::Element { ref name, .. } = node.data {
            if &*name.local == node_name {
                found_nodes.push(node.clone());
            }
        }

        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names.clone()));
        }
    } else if let NodeData::Element { ref name, .. } = node.data {
        if &*name.local == node_name {
            let mut new_node_names = node_names;
            new_node_names.remove(0);
            found_nodes.append(&mut find_nodes(node, new_node_names));
        } else {
            for child_node in node.children.borrow().iter() {
                found_nodes.append(&mut find_nodes(child_node, node_names.clone()));
            }
        }
    } else {
        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names.clone()));
        }
    }

    found_nodes
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    let matching_children = children.iter().find(|child| match child.data {
        NodeData::Element { ref name, .. } => &*name.local == node_name,
        _ => false,
    });
    matching_children.cloned()
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => {
            for attr in attrs.borrow().iter() {
                if &*attr.name.local == attr_name {
                    return Some(attr.value.to_string());
                }
            }
            None
        }
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取父节点
///
/// 父指针是弱引用单元，读取后必须放回，否则节点会与树脱钩。
/// 已脱离文档树的节点返回 `None`。
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak_parent = child.parent.take();
    let parent = weak_parent.as_ref().and_then(|weak| weak.upgrade());
    child.parent.set(weak_parent);
    parent
}

/// 设置节点属性
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let mut i = 0;
        let mut found_existing_attr: bool = false;

        while i < attrs_mut.len() {
            if &attrs_mut[i].name.local == attr_name {
                found_existing_attr = true;

                if let Some(attr_value) = attr_value.clone() {
                    let _ = &attrs_mut[i].value.clear();
                    let _ = &attrs_mut[i].value.push_slice(attr_value.as_str());
                } else {
                    // Remove attr completely if attr_value is not defined
                    attrs_mut.remove(i);
                    continue;
                }
            }

            i += 1;
        }

        if !found_existing_attr {
            // Add new attribute (since originally the target node didn't have it)
            if let Some(attr_value) = attr_value.clone() {
                let name = LocalName::from(attr_name);

                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), name),
                    value: format_tendril!("{}", attr_value),
                });
            }
        }
    };
}

/// 检查元素是否携带指定 class
pub fn has_class(node: &Handle, class_name: &str) -> bool {
    match get_node_attr(node, "class") {
        Some(value) => value.split_whitespace().any(|class| class == class_name),
        None => false,
    }
}

/// 获取文本节点内容
pub fn get_node_text(node: &Handle) -> Option<String> {
    match node.data {
        NodeData::Text { ref contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// 覆写文本节点内容
pub fn set_node_text(node: &Handle, text: &str) {
    if let NodeData::Text { ref contents } = node.data {
        let mut contents_mut = contents.borrow_mut();
        contents_mut.clear();
        contents_mut.push_slice(text);
    }
}

/// 获取 template 元素的内容片段
pub fn get_template_contents(node: &Handle) -> Option<Handle> {
    match node.data {
        NodeData::Element {
            ref template_contents,
            ..
        } => template_contents.borrow().clone(),
        _ => None,
    }
}

/// 创建元素节点
pub fn create_dom_element(dom: &RcDom, tag_name: &str, attributes: &[(&str, &str)]) -> Handle {
    let attrs = attributes
        .iter()
        .map(|(attr_name, attr_value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*attr_name)),
            value: format_tendril!("{}", attr_value),
        })
        .collect();

    create_element(
        dom,
        QualName::new(None, ns!(), LocalName::from(tag_name)),
        attrs,
    )
}

/// 创建文本节点
pub fn create_text_node(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(format_tendril!("{}", text)),
    })
}

/// 创建带单个文本子节点的元素
pub fn create_element_with_text(
    dom: &RcDom,
    tag_name: &str,
    attributes: &[(&str, &str)],
    text: &str,
) -> Handle {
    let element = create_dom_element(dom, tag_name, attributes);
    append_child(&element, &create_text_node(text));
    element
}

/// 把子节点追加到父节点末尾
pub fn append_child(parent: &Handle, child: &Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child.clone());
}

/// 用一组节点原位替换某个子节点
///
/// 整个替换是父节点子列表上的一次拼接，被替换节点随即脱离文档树。
/// 节点已无父节点或不在父节点子列表中时返回 `false`。
pub fn replace_node_with(node: &Handle, replacements: &[Handle]) -> bool {
    let parent = match get_parent_node(node) {
        Some(parent) => parent,
        None => return false,
    };

    let mut children = parent.children.borrow_mut();
    let index = match children.iter().position(|child| Rc::ptr_eq(child, node)) {
        Some(index) => index,
        None => return false,
    };

    children.splice(index..=index, replacements.iter().cloned());
    drop(children);

    for replacement in replacements {
        replacement.parent.set(Some(Rc::downgrade(&parent)));
    }
    node.parent.set(None);

    true
}

/// 把元素替换为其子节点
///
/// 元素没有父节点时不做任何事并返回 `false`。
pub fn unwrap_element(element: &Handle) -> bool {
    if get_parent_node(element).is_none() {
        return false;
    }

    let former_children: Vec<Handle> = element.children.borrow_mut().drain(..).collect();
    replace_node_with(element, &former_children)
}

/// 合并相邻文本子节点并移除空文本节点
///
/// 只处理直接子节点，不递归。
pub fn normalize_text_children(parent: &Handle) {
    let mut children = parent.children.borrow_mut();
    let mut i = 0;

    while i < children.len() {
        let is_empty_text = match children[i].data {
            NodeData::Text { ref contents } => contents.borrow().is_empty(),
            _ => false,
        };
        if is_empty_text {
            let removed = children.remove(i);
            removed.parent.set(None);
            continue;
        }

        let current_is_text = matches!(children[i].data, NodeData::Text { .. });
        if current_is_text && i + 1 < children.len() {
            let following_text = match children[i + 1].data {
                NodeData::Text { ref contents } => Some(contents.borrow().to_string()),
                _ => None,
            };

            if let Some(tail) = following_text {
                if let NodeData::Text { ref contents } = children[i].data {
                    contents.borrow_mut().push_slice(&tail);
                }
                let merged = children.remove(i + 1);
                merged.parent.set(None);
                continue;
            }
        }

        i += 1;
    }
}
