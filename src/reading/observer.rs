//! DOM 变更观察模块
//!
//! 提供带变更通知的文档包装和观察器实例：
//! - `ObservedDocument`: 持有 DOM 的句柄，所有结构修改经由它发出变更记录
//! - `MutationObserver`: 按实例管理连接状态和记录队列
//! - `SuppressGuard`: 在引擎自身写入期间暂停观察的 RAII 守卫
//!
//! 断开状态下发生的变更不会补投递，重新连接后队列从空开始。

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::debug;

use crate::parsers::html::dom::{
    append_child, find_nodes, get_parent_node, has_class, html_to_dom, normalize_text_children,
    replace_node_with,
};

// ====== 变更记录 ======

/// 一次结构变更记录
///
/// `target` 是发生变更的父节点，`added` 是新挂入其下的节点。
#[derive(Clone)]
pub struct MutationRecord {
    pub target: Handle,
    pub added: Vec<Handle>,
}

// ====== 观察器 ======

struct ObserverInner {
    connected: Cell<bool>,
    records: RefCell<Vec<MutationRecord>>,
}

/// 变更观察器
///
/// 每个实例独立维护连接状态和待处理记录，
/// 互不影响，随文档一起创建、一起销毁。
pub struct MutationObserver {
    inner: Rc<ObserverInner>,
}

impl MutationObserver {
    fn new() -> Self {
        Self {
            inner: Rc::new(ObserverInner {
                connected: Cell::new(false),
                records: RefCell::new(Vec::new()),
            }),
        }
    }

    /// 开始接收变更记录
    pub fn connect(&self) {
        self.inner.connected.set(true);
    }

    /// 停止接收变更记录
    ///
    /// 断开期间的变更直接丢弃，已入队的记录保留。
    pub fn disconnect(&self) {
        self.inner.connected.set(false);
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.get()
    }

    /// 取走全部待处理记录，队列随之清空
    pub fn take_records(&self) -> Vec<MutationRecord> {
        std::mem::take(&mut *self.inner.records.borrow_mut())
    }

    /// 当前待处理记录数
    pub fn pending_records(&self) -> usize {
        self.inner.records.borrow().len()
    }
}

// ====== 观察器注册表 ======

#[derive(Default)]
struct ObserverRegistry {
    observers: RefCell<Vec<Weak<ObserverInner>>>,
}

impl ObserverRegistry {
    fn register(&self, inner: &Rc<ObserverInner>) {
        self.observers.borrow_mut().push(Rc::downgrade(inner));
    }

    fn alive_count(&self) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter(|weak| weak.upgrade().is_some())
            .count()
    }

    fn notify(&self, record: MutationRecord) {
        let mut observers = self.observers.borrow_mut();
        observers.retain(|weak| weak.upgrade().is_some());

        for weak in observers.iter() {
            if let Some(observer) = weak.upgrade() {
                if observer.connected.get() {
                    observer.records.borrow_mut().push(record.clone());
                }
                // 断开状态的观察器不入队，记录直接丢弃
            }
        }
    }
}

// ====== 被观察文档 ======

struct DocumentInner {
    dom: RcDom,
    registry: ObserverRegistry,
}

/// 带变更通知的文档
///
/// 克隆得到的是同一份文档的另一个句柄。结构修改必须经由这里的
/// 方法进行，直接操作底层 DOM 不会产生变更记录。
#[derive(Clone)]
pub struct ObservedDocument {
    inner: Rc<DocumentInner>,
}

impl ObservedDocument {
    pub fn new(dom: RcDom) -> Self {
        Self {
            inner: Rc::new(DocumentInner {
                dom,
                registry: ObserverRegistry::default(),
            }),
        }
    }

    /// 从 HTML 字节解析并包装
    pub fn from_html(data: &[u8], encoding: &str) -> Self {
        Self::new(html_to_dom(data, encoding.to_string()))
    }

    /// 底层 DOM
    pub fn dom(&self) -> &RcDom {
        &self.inner.dom
    }

    /// 文档根节点
    pub fn document(&self) -> Handle {
        self.inner.dom.document.clone()
    }

    /// 创建并注册一个观察器（初始为断开状态）
    pub fn create_observer(&self) -> MutationObserver {
        let observer = MutationObserver::new();
        self.inner.registry.register(&observer.inner);
        observer
    }

    /// 当前存活的观察器数量
    pub fn observer_count(&self) -> usize {
        self.inner.registry.alive_count()
    }

    /// 追加子节点并发出变更记录
    pub fn append_child(&self, parent: &Handle, child: &Handle) {
        append_child(parent, child);
        self.notify(parent, vec![child.clone()]);
    }

    /// 解析 HTML 片段并追加到指定节点下
    ///
    /// 整个片段合并为一条变更记录，返回实际挂入的节点数。
    pub fn append_html_fragment(&self, parent: &Handle, html: &str) -> usize {
        let fragment_dom = html_to_dom(html.as_bytes(), "utf-8".to_string());
        let body_nodes = find_nodes(&fragment_dom.document, vec!["html", "body"]);

        let mut added: Vec<Handle> = Vec::new();
        if let Some(fragment_body) = body_nodes.first() {
            let children: Vec<Handle> = fragment_body.children.borrow_mut().drain(..).collect();
            for child in &children {
                append_child(parent, child);
            }
            added = children;
        }

        let count = added.len();
        if count > 0 {
            self.notify(parent, added);
        }
        count
    }

    /// 用一组节点替换某个节点并发出变更记录
    ///
    /// 节点已脱离文档树时不做任何事并返回 `false`。
    pub fn replace_with(&self, node: &Handle, replacements: &[Handle]) -> bool {
        let parent = match get_parent_node(node) {
            Some(parent) => parent,
            None => return false,
        };

        if !replace_node_with(node, replacements) {
            return false;
        }

        self.notify(&parent, replacements.to_vec());
        true
    }

    /// 把元素替换为其子节点并合并周围的文本节点
    ///
    /// 元素没有父节点时不做任何事并返回 `false`。
    pub fn unwrap_node(&self, element: &Handle) -> bool {
        let parent = match get_parent_node(element) {
            Some(parent) => parent,
            None => return false,
        };

        let promoted: Vec<Handle> = element.children.borrow_mut().drain(..).collect();
        if !replace_node_with(element, &promoted) {
            return false;
        }

        normalize_text_children(&parent);
        self.notify(&parent, promoted);
        true
    }

    /// 展开子树内所有携带指定 class 的元素
    ///
    /// 这是各种标记元素统一的摘除路径，返回实际展开的元素数。
    pub fn unwrap_all_with_class(&self, scope: &Handle, class_name: &str) -> usize {
        let mut marked: Vec<Handle> = Vec::new();
        collect_elements_with_class(scope, class_name, &mut marked);

        let mut unwrapped = 0;
        for element in &marked {
            if self.unwrap_node(element) {
                unwrapped += 1;
            }
        }

        if unwrapped > 0 {
            debug!("展开 {} 个 .{} 标记元素", unwrapped, class_name);
        }
        unwrapped
    }

    fn notify(&self, target: &Handle, added: Vec<Handle>) {
        self.inner.registry.notify(MutationRecord {
            target: target.clone(),
            added,
        });
    }
}

/// 递归收集携带指定 class 的元素
fn collect_elements_with_class(node: &Handle, class_name: &str, out: &mut Vec<Handle>) {
    if matches!(node.data, NodeData::Element { .. }) && has_class(node, class_name) {
        out.push(node.clone());
    }

    for child in node.children.borrow().iter() {
        collect_elements_with_class(child, class_name, out);
    }
}

// ====== 观察暂停守卫 ======

/// 观察暂停守卫
///
/// 构造时断开观察器，析构时恢复到构造前的连接状态。
/// 引擎写入 DOM 前先持有守卫，自身的修改就不会变成待处理记录。
pub struct SuppressGuard<'a> {
    observer: &'a MutationObserver,
    was_connected: bool,
}

impl<'a> SuppressGuard<'a> {
    pub fn new(observer: &'a MutationObserver) -> Self {
        let was_connected = observer.is_connected();
        observer.disconnect();
        Self {
            observer,
            was_connected,
        }
    }
}

impl Drop for SuppressGuard<'_> {
    fn drop(&mut self) {
        if self.was_connected {
            self.observer.connect();
        }
    }
}
